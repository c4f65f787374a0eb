//! # Lazurite device
//!
//! Impersonates a Zigbee end device through a serial-attached ZNP. The
//! join procedure configures the device and waits for the coordinator's
//! network to accept it; the dispatcher then answers cluster reads, obeys
//! on/off commands and emits periodic attribute reports.

mod cluster;
mod dispatch;
mod error;
mod identity;
mod join;
mod link;

pub use cluster::{
    attribute_report, default_response, read_attributes_response, AttributeProvider, BasicCluster,
    OnOffCluster,
};
pub use dispatch::{Dispatcher, Endpoint, LED_ENDPOINT, SWITCH_ENDPOINT};
pub use error::Error;
pub use identity::Identity;
pub use join::{JoinProcedure, JoinState, NetworkParameters, SEARCHING_MAX};
pub use link::Znp;
