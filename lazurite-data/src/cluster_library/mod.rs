//! # Cluster Library (ZCL)
//!
//! The attribute and command model carried inside application messages.
//! Only the general commands an end device answers are modelled.

use core::convert::TryFrom;

use crate::Error;

mod attribute;
pub mod basic;
pub mod commands;
mod frame;
pub mod on_off;

pub use attribute::{AttributeDataType, AttributeValue};
pub use commands::{Command, GeneralCommandIdentifier};
pub use frame::{ClusterLibraryHeader, Direction, FrameControl, FrameType};

/// 16-bit attribute identifier
pub type AttributeIdentifier = u16;

extended_enum!(
    /// Cluster library status codes
    ClusterLibraryStatus, u8,
    /// Operation was successful.
    Success => 0x00,
    /// Operation was not successful.
    Failure => 0x01,
    /// The command appears to contain the wrong fields or misses some. Command not carried out.
    MalformedCommand => 0x80,
    /// The specified cluster command is not supported on the device. Command not carried out.
    UnsupportedClusterCommand => 0x81,
    /// The specified general ZCL command is not supported on the device.
    UnsupportedGeneralCommand => 0x82,
    /// At least one field of the command contains an incorrect value.
    InvalidField => 0x85,
    /// The specified attribute does not exist on the device.
    UnsupportedAttribute => 0x86,
    /// Out of range error, or set to a reserved value. Attribute keeps its old value.
    InvalidValue => 0x87,
    /// Attempt to write a read only attribute.
    ReadOnly => 0x88,
    /// The data type given for an attribute is incorrect. Command not carried out.
    InvalidDataType => 0x8d,
    /// The exchange was aborted due to excessive response time.
    Timeout => 0x94,
    /// An operation was unsuccessful due to a software failure.
    SoftwareFailure => 0xc1,
    /// The cluster is not supported.
    UnsupportedCluster => 0xc3,
);
