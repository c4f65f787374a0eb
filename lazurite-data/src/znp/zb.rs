//! # Simple API configuration payloads
//!
//! Parameters written to the device's non-volatile store before startup.
//! Values are opaque byte strings to the write operation; the device
//! interprets them.

use core::convert::TryFrom;

use crate::pack::Pack;
use crate::Error;

extended_enum!(
    /// Non-volatile configuration parameters written during setup
    ConfigurationParameter, u8,
    /// Startup behaviour flags, see the `STARTUP_*` constants
    StartupOption => 0x03,
    /// Data request poll interval in milliseconds, 32 bits
    PollRate => 0x35,
    /// PAN identifier filter, 0xffff accepts any PAN
    PanIdentifier => 0x83,
    /// Channel mask, 32 bits, bit N enables channel N
    ChannelList => 0x84,
    /// Role the device takes in the network
    LogicalType => 0x87,
);

extended_enum!(
    /// Logical device types for the `LogicalType` parameter
    LogicalType, u8,
    /// Network coordinator
    Coordinator => 0x00,
    /// Router
    Router => 0x01,
    /// Sleepy end device
    EndDevice => 0x02,
);

/// Startup option flag, clear network state on restart
pub const STARTUP_CLEAR_STATE: u8 = 0x02;

/// Startup option flag, clear configuration on restart
pub const STARTUP_CLEAR_CONFIG: u8 = 0x01;

/// Channel mask with a single channel enabled
pub fn channel_mask(channel: u8) -> u32 {
    1u32 << (channel & 0x1f)
}

/// Configuration write request
#[derive(Clone, Debug, PartialEq)]
pub struct WriteConfiguration {
    /// Parameter to write
    pub parameter: ConfigurationParameter,
    /// Raw value bytes
    pub value: Vec<u8>,
}

impl WriteConfiguration {
    /// Create a write request for one parameter
    pub fn new(parameter: ConfigurationParameter, value: &[u8]) -> Self {
        Self {
            parameter,
            value: value.to_vec(),
        }
    }
}

impl Pack<WriteConfiguration, Error> for WriteConfiguration {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if self.value.len() > 0xff {
            return Err(Error::InvalidValue);
        }
        if data.len() < 2 + self.value.len() {
            return Err(Error::NotEnoughSpace);
        }
        data[0] = u8::from(self.parameter);
        data[1] = self.value.len() as u8;
        data[2..2 + self.value.len()].copy_from_slice(&self.value);
        Ok(2 + self.value.len())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() < 2 {
            return Err(Error::WrongNumberOfBytes);
        }
        let parameter = ConfigurationParameter::try_from(data[0])?;
        let length = data[1] as usize;
        if data.len() < 2 + length {
            return Err(Error::WrongNumberOfBytes);
        }
        Ok((
            Self {
                parameter,
                value: data[2..2 + length].to_vec(),
            },
            2 + length,
        ))
    }
}
