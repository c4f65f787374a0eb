use core::convert::TryFrom;

use crate::cluster_library::{
    AttributeDataType, AttributeIdentifier, AttributeValue, ClusterLibraryStatus,
};
use crate::pack::Pack;
use crate::Error;

use byteorder::{ByteOrder, LittleEndian};

/// Request for one or more attribute values
#[derive(Clone, Debug, PartialEq)]
pub struct ReadAttributes {
    /// Requested attribute identifiers, in request order
    pub attributes: Vec<AttributeIdentifier>,
}

impl Pack<ReadAttributes, Error> for ReadAttributes {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < self.attributes.len() * 2 {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut offset = 0;
        for attribute in self.attributes.iter() {
            LittleEndian::write_u16(&mut data[offset..offset + 2], *attribute);
            offset += 2;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() % 2 != 0 {
            return Err(Error::WrongNumberOfBytes);
        }
        let num_attributes = data.len() / 2;
        let mut attributes: Vec<AttributeIdentifier> = Vec::with_capacity(num_attributes);
        let mut offset = 0;
        for _ in 0..num_attributes {
            attributes.push(LittleEndian::read_u16(&data[offset..offset + 2]));
            offset += 2;
        }
        Ok((Self { attributes }, offset))
    }
}

/// One attribute record in a response or report
///
/// Packs as `identifier, status, data type, value` on success and as
/// `identifier, status` otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeStatus {
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
    /// Outcome for this attribute
    pub status: ClusterLibraryStatus,
    /// Value, present only on success
    pub value: Option<AttributeValue>,
}

impl AttributeStatus {
    /// A successful record carrying a value
    pub fn success(identifier: AttributeIdentifier, value: AttributeValue) -> Self {
        Self {
            identifier,
            status: ClusterLibraryStatus::Success,
            value: Some(value),
        }
    }

    /// A record for an attribute the device does not have
    pub fn unsupported(identifier: AttributeIdentifier) -> Self {
        Self {
            identifier,
            status: ClusterLibraryStatus::UnsupportedAttribute,
            value: None,
        }
    }
}

impl Pack<AttributeStatus, Error> for AttributeStatus {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 3 {
            return Err(Error::WrongNumberOfBytes);
        }
        LittleEndian::write_u16(&mut data[0..2], self.identifier);
        data[2] = u8::from(self.status);
        let used = if let Some(value) = &self.value {
            if data.len() < 4 {
                return Err(Error::WrongNumberOfBytes);
            }
            data[3] = u8::from(value.data_type());
            value.pack(&mut data[4..])? + 4
        } else {
            3
        };
        Ok(used)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() < 3 {
            return Err(Error::WrongNumberOfBytes);
        }
        let identifier = LittleEndian::read_u16(&data[0..2]);
        let status = ClusterLibraryStatus::try_from(data[2])?;
        if status != ClusterLibraryStatus::Success {
            return Ok((
                Self {
                    identifier,
                    status,
                    value: None,
                },
                3,
            ));
        }
        if data.len() < 4 {
            return Err(Error::WrongNumberOfBytes);
        }
        let data_type = AttributeDataType::try_from(data[3])?;
        let (value, used) = AttributeValue::unpack(&data[4..], data_type)?;
        Ok((
            Self {
                identifier,
                status,
                value: Some(value),
            },
            used + 4,
        ))
    }
}

/// Answer to a read-attributes request
#[derive(Clone, Debug, PartialEq)]
pub struct ReadAttributesResponse {
    /// One record per requested attribute, in request order
    pub attributes: Vec<AttributeStatus>,
}

impl Pack<ReadAttributesResponse, Error> for ReadAttributesResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut offset = 0;
        for attribute in self.attributes.iter() {
            offset += attribute.pack(&mut data[offset..])?;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut offset = 0;
        let mut attributes: Vec<AttributeStatus> = Vec::new();
        loop {
            if offset == data.len() {
                break;
            }
            let (attribute_status, used) = AttributeStatus::unpack(&data[offset..])?;
            attributes.push(attribute_status);
            offset += used;
        }
        Ok((Self { attributes }, offset))
    }
}

/// Unsolicited attribute report, same record layout as a read response
#[derive(Clone, Debug, PartialEq)]
pub struct ReportAttributes {
    /// One record per reported attribute
    pub attributes: Vec<AttributeStatus>,
}

impl Pack<ReportAttributes, Error> for ReportAttributes {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut offset = 0;
        for attribute in self.attributes.iter() {
            offset += attribute.pack(&mut data[offset..])?;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let (response, used) = ReadAttributesResponse::unpack(data)?;
        Ok((
            Self {
                attributes: response.attributes,
            },
            used,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_read_attributes() {
        // Manufacturer name and model identifier
        let data = [0x04, 0x00, 0x05, 0x00];

        let (cmd, used) = ReadAttributes::unpack(&data).unwrap();

        assert_eq!(used, 4);
        assert_eq!(cmd.attributes, [0x0004, 0x0005]);
    }

    #[test]
    fn unpack_read_attributes_odd_length() {
        let data = [0x04, 0x00, 0x05];

        assert_eq!(
            ReadAttributes::unpack(&data),
            Err(Error::WrongNumberOfBytes)
        );
    }

    #[test]
    fn pack_attribute_status_success() {
        let mut buffer = [0u8; 8];

        let status = AttributeStatus::success(0x0000, AttributeValue::Boolean(0x01));
        let used = status.pack(&mut buffer).unwrap();

        assert_eq!(used, 5);
        assert_eq!(buffer[..used], [0x00, 0x00, 0x00, 0x10, 0x01]);
    }

    #[test]
    fn pack_attribute_status_unsupported() {
        let mut buffer = [0u8; 8];

        let status = AttributeStatus::unsupported(0x4000);
        let used = status.pack(&mut buffer).unwrap();

        assert_eq!(used, 3);
        assert_eq!(buffer[..used], [0x00, 0x40, 0x86]);
    }

    #[test]
    fn pack_read_attributes_response() {
        let mut buffer = [0u8; 32];

        let response = ReadAttributesResponse {
            attributes: vec![
                AttributeStatus::success(
                    0x0005,
                    AttributeValue::CharacterString("ZNP-Test".to_string()),
                ),
                AttributeStatus::unsupported(0x0006),
            ],
        };
        let used = response.pack(&mut buffer).unwrap();

        assert_eq!(used, 16);
        assert_eq!(buffer[..4], [0x05, 0x00, 0x00, 0x42]);
        assert_eq!(buffer[4], 0x08);
        assert_eq!(&buffer[5..13], b"ZNP-Test");
        assert_eq!(buffer[13..16], [0x06, 0x00, 0x86]);
    }

    #[test]
    fn attribute_status_round_trip() {
        let mut buffer = [0u8; 8];

        let status = AttributeStatus::success(0x0007, AttributeValue::Enumeration8(0x03));
        let used = status.pack(&mut buffer).unwrap();

        let (decoded, consumed) = AttributeStatus::unpack(&buffer[..used]).unwrap();
        assert_eq!(consumed, used);
        assert_eq!(decoded, status);
    }
}
