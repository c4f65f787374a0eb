use std::io;

use lazurite_data::znp::zb::ConfigurationParameter;

/// Errors
#[derive(Debug)]
pub enum Error {
    /// Wire format error
    Data(lazurite_data::Error),
    /// Serial transport error
    Io(io::Error),
    /// The device rejected a configuration write
    ConfigurationRejected(ConfigurationParameter),
    /// The device rejected an endpoint registration
    EndpointRejected(u8),
    /// Too many "searching" notifications while joining; the coordinator
    /// is not accepting joins or is offline
    CoordinatorUnreachable,
}

impl From<lazurite_data::Error> for Error {
    fn from(error: lazurite_data::Error) -> Self {
        Self::Data(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}
