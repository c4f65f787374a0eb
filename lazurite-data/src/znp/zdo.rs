//! # ZDO subsystem payloads
//!
//! Network startup and the asynchronous state-change indications the device
//! emits while it looks for, joins and authenticates with a network.

use core::convert::TryFrom;

use crate::pack::PackFixed;
use crate::Error;

use byteorder::{ByteOrder, LittleEndian};

extended_enum!(
    /// Device network state reported by state-change indications
    DeviceState, u8,
    /// Initialised, will not start automatically
    Hold => 0x00,
    /// Initialised, not connected to anything
    Initialized => 0x01,
    /// Discovering PANs to join
    Searching => 0x02,
    /// Joining a PAN
    Joining => 0x03,
    /// Rejoining a PAN
    Rejoining => 0x04,
    /// Joined but not yet authenticated by the trust centre
    EndDeviceUnauthenticated => 0x05,
    /// Joined and operating as an end device
    EndDevice => 0x06,
    /// Joined and operating as a router
    Router => 0x07,
    /// Starting as a coordinator
    CoordinatorStarting => 0x08,
    /// Operating as a coordinator
    Coordinator => 0x09,
    /// The device has lost its parent
    Orphan => 0x0a,
);

extended_enum!(
    /// Status carried in the startup response
    StartupStatus, u8,
    /// The previous network state was restored
    RestoredState => 0x00,
    /// New network state, a join or rejoin will follow
    NewState => 0x01,
    /// Startup has not begun
    NotStarted => 0x02,
);

/// Network startup request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StartupFromApplication {
    /// Delay before startup begins, milliseconds
    pub delay: u16,
}

impl PackFixed<StartupFromApplication, Error> for StartupFromApplication {
    fn pack(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() != 2 {
            return Err(Error::WrongNumberOfBytes);
        }
        LittleEndian::write_u16(data, self.delay);
        Ok(())
    }

    fn unpack(data: &[u8]) -> Result<Self, Error> {
        if data.len() != 2 {
            return Err(Error::WrongNumberOfBytes);
        }
        Ok(Self {
            delay: LittleEndian::read_u16(data),
        })
    }
}

/// Asynchronous device state change
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateChange {
    /// New device state, raw; not every firmware value is named
    pub state: u8,
}

impl StateChange {
    /// The named device state, when the raw value is one
    pub fn device_state(&self) -> Option<DeviceState> {
        DeviceState::try_from(self.state).ok()
    }
}

impl PackFixed<StateChange, Error> for StateChange {
    fn pack(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() != 1 {
            return Err(Error::WrongNumberOfBytes);
        }
        data[0] = self.state;
        Ok(())
    }

    fn unpack(data: &[u8]) -> Result<Self, Error> {
        if data.len() != 1 {
            return Err(Error::WrongNumberOfBytes);
        }
        Ok(Self { state: data[0] })
    }
}
