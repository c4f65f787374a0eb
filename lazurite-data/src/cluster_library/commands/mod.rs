//! # Cluster library general commands

mod attributes;
mod default_response;

use core::convert::TryFrom;

use crate::pack::Pack;
use crate::Error;

pub use attributes::{
    AttributeStatus, ReadAttributes, ReadAttributesResponse, ReportAttributes,
};
pub use default_response::DefaultResponse;

extended_enum!(
    /// Cluster library general command identifiers
    GeneralCommandIdentifier, u8,
    ReadAttributes => 0x00,
    ReadAttributesResponse => 0x01,
    WriteAttributes => 0x02,
    WriteAttributesUndivided => 0x03,
    WriteAttributesResponse => 0x04,
    WriteAttributesNoResponse => 0x05,
    ConfigureReporting => 0x06,
    ConfigureReportingResponse => 0x07,
    ReadReportingConfiguration => 0x08,
    ReadReportingConfigurationResponse => 0x09,
    ReportAttributes => 0x0a,
    DefaultResponse => 0x0b,
    DiscoverAttributes => 0x0c,
    DiscoverAttributesResponse => 0x0d,
);

/// General commands consumed or produced by the device
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Request for attribute values
    ReadAttributes(ReadAttributes),
    /// Answer to a read-attributes request
    ReadAttributesResponse(ReadAttributesResponse),
    /// Unsolicited attribute report
    ReportAttributes(ReportAttributes),
    /// Acknowledgement of a cluster-specific command
    DefaultResponse(DefaultResponse),
}

impl Command {
    /// Pack the command body, giving bytes used and the command identifier
    pub fn pack(&self, data: &mut [u8]) -> Result<(usize, GeneralCommandIdentifier), Error> {
        match self {
            Command::ReadAttributes(cmd) => {
                let used = cmd.pack(data)?;
                Ok((used, GeneralCommandIdentifier::ReadAttributes))
            }
            Command::ReadAttributesResponse(cmd) => {
                let used = cmd.pack(data)?;
                Ok((used, GeneralCommandIdentifier::ReadAttributesResponse))
            }
            Command::ReportAttributes(cmd) => {
                let used = cmd.pack(data)?;
                Ok((used, GeneralCommandIdentifier::ReportAttributes))
            }
            Command::DefaultResponse(cmd) => {
                let used = cmd.pack(data)?;
                Ok((used, GeneralCommandIdentifier::DefaultResponse))
            }
        }
    }

    /// Unpack a command body for the given identifier
    pub fn unpack(data: &[u8], command: GeneralCommandIdentifier) -> Result<(Self, usize), Error> {
        match command {
            GeneralCommandIdentifier::ReadAttributes => {
                let (cmd, used) = ReadAttributes::unpack(data)?;
                Ok((Command::ReadAttributes(cmd), used))
            }
            GeneralCommandIdentifier::ReadAttributesResponse => {
                let (cmd, used) = ReadAttributesResponse::unpack(data)?;
                Ok((Command::ReadAttributesResponse(cmd), used))
            }
            GeneralCommandIdentifier::ReportAttributes => {
                let (cmd, used) = ReportAttributes::unpack(data)?;
                Ok((Command::ReportAttributes(cmd), used))
            }
            GeneralCommandIdentifier::DefaultResponse => {
                let (cmd, used) = DefaultResponse::unpack(data)?;
                Ok((Command::DefaultResponse(cmd), used))
            }
            _ => Err(Error::UnknownGeneralCommand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_read_attributes_command() {
        let data = [0x00, 0x00, 0x07, 0x00];

        let (command, used) =
            Command::unpack(&data, GeneralCommandIdentifier::ReadAttributes).unwrap();

        assert_eq!(used, 4);
        match command {
            Command::ReadAttributes(request) => {
                assert_eq!(request.attributes, [0x0000, 0x0007]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn pack_default_response_command() {
        let mut buffer = [0u8; 4];

        let command = Command::DefaultResponse(DefaultResponse {
            command: 0x01,
            status: crate::cluster_library::ClusterLibraryStatus::Success,
        });
        let (used, identifier) = command.pack(&mut buffer).unwrap();

        assert_eq!(used, 2);
        assert_eq!(identifier, GeneralCommandIdentifier::DefaultResponse);
        assert_eq!(buffer[..used], [0x01, 0x00]);
    }

    #[test]
    fn unpack_unhandled_command() {
        assert_eq!(
            Command::unpack(&[], GeneralCommandIdentifier::DiscoverAttributes),
            Err(Error::UnknownGeneralCommand)
        );
    }
}
