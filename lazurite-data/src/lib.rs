//! # Lazurite data
//!
//! Wire formats used when a host impersonates a Zigbee end device through a
//! serial-attached Z-Stack network processor (ZNP). Contains the ZNP
//! monitor/test link frames and payloads, and the slice of the Zigbee
//! Cluster Library (ZCL) an end device needs to answer a coordinator.

#![warn(missing_docs)]

#[macro_use]
extern crate bitflags;

#[macro_use]
mod utils;

pub mod cluster_library;
pub mod error;
pub mod pack;
pub mod znp;

pub use error::Error;
