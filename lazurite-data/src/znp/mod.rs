//! # ZNP monitor and test interface
//!
//! The network processor speaks a framed command/response protocol over its
//! UART. Commands are grouped in subsystems; the ones an end device uses are
//! covered here. The command identifier travels high byte first, while the
//! multi-byte fields inside payloads are little-endian unless noted.

use core::convert::TryFrom;

use crate::Error;

pub mod af;
pub mod frame;
pub mod sys;
pub mod zb;
pub mod zdo;

pub use frame::LinkFrame;

extended_enum!(
    /// Command identifiers consumed or produced by an end device
    CommandIdentifier, u16,
    /// Boot notification sent by the device after any reset
    SysResetIndication => 0x4180,
    /// Write a configuration parameter to the non-volatile store
    WriteConfiguration => 0x2605,
    /// Acknowledgement for `WriteConfiguration`
    WriteConfigurationResponse => 0x6605,
    /// Reset the device, clearing its network state
    SystemReset => 0x4609,
    /// Register an application endpoint
    Register => 0x2400,
    /// Acknowledgement for `Register`
    RegisterResponse => 0x6400,
    /// Send an application data frame
    DataRequest => 0x2401,
    /// Acknowledgement for `DataRequest`
    DataRequestResponse => 0x6401,
    /// Transmit status for a previously sent data frame
    DataConfirm => 0x4480,
    /// Incoming application data frame
    IncomingMessage => 0x4481,
    /// Start the network-join procedure
    StartupFromApplication => 0x2540,
    /// Acknowledgement for `StartupFromApplication`
    StartupFromApplicationResponse => 0x6540,
    /// Asynchronous device network-state change
    StateChangeIndication => 0x45c0,
);
