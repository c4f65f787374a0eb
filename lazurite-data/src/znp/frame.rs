//! # ZNP link frame
//!
//! Frames on the UART are `0xFE | length | command | payload | FCS`. The
//! command identifier travels high byte first and the FCS is the XOR of
//! every byte between the start marker and the FCS itself.

use crate::pack::Pack;
use crate::Error;

use byteorder::{BigEndian, ByteOrder};

/// Start of frame marker
pub const START_OF_FRAME: u8 = 0xfe;

/// Largest payload the single length byte can describe
pub const PAYLOAD_MAX: usize = 255;

/// Framing bytes around the payload, start marker included
pub const FRAME_OVERHEAD: usize = 5;

/// Running XOR over the length byte, both command bytes and the payload
pub fn checksum(length: u8, command: u16, payload: &[u8]) -> u8 {
    let mut fcs = length ^ (command >> 8) as u8 ^ (command & 0x00ff) as u8;
    for byte in payload.iter() {
        fcs ^= *byte;
    }
    fcs
}

/// One link frame
///
/// A frame that failed its checksum on receipt is delivered with `fcs_ok`
/// cleared rather than discarded; the caller decides the policy.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkFrame {
    /// Command identifier
    pub command: u16,
    /// Payload bytes
    pub payload: Vec<u8>,
    /// Whether the received checksum matched the computed one
    pub fcs_ok: bool,
}

impl LinkFrame {
    /// Create a frame for transmission
    pub fn new(command: u16, payload: &[u8]) -> Result<Self, Error> {
        if payload.len() > PAYLOAD_MAX {
            return Err(Error::PayloadTooLong);
        }
        Ok(Self {
            command,
            payload: payload.to_vec(),
            fcs_ok: true,
        })
    }
}

impl Pack<LinkFrame, Error> for LinkFrame {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if self.payload.len() > PAYLOAD_MAX {
            return Err(Error::PayloadTooLong);
        }
        let length = self.payload.len();
        if data.len() < length + FRAME_OVERHEAD {
            return Err(Error::NotEnoughSpace);
        }
        data[0] = START_OF_FRAME;
        data[1] = length as u8;
        BigEndian::write_u16(&mut data[2..4], self.command);
        data[4..4 + length].copy_from_slice(&self.payload);
        data[4 + length] = checksum(length as u8, self.command, &self.payload);
        Ok(length + FRAME_OVERHEAD)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() < FRAME_OVERHEAD {
            return Err(Error::WrongNumberOfBytes);
        }
        if data[0] != START_OF_FRAME {
            return Err(Error::InvalidValue);
        }
        let length = data[1] as usize;
        if data.len() < length + FRAME_OVERHEAD {
            return Err(Error::WrongNumberOfBytes);
        }
        let command = BigEndian::read_u16(&data[2..4]);
        let payload = data[4..4 + length].to_vec();
        let fcs_ok = data[4 + length] == checksum(length as u8, command, &payload);
        Ok((
            Self {
                command,
                payload,
                fcs_ok,
            },
            length + FRAME_OVERHEAD,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_empty_payload() {
        let mut buffer = [0u8; 16];

        let frame = LinkFrame::new(0x4609, &[]).unwrap();
        let used = frame.pack(&mut buffer).unwrap();

        assert_eq!(used, 5);
        assert_eq!(buffer[..used], [0xfe, 0x00, 0x46, 0x09, 0x4f]);
    }

    #[test]
    fn pack_with_payload() {
        let mut buffer = [0u8; 16];

        let frame = LinkFrame::new(0x2605, &[0x87, 0x01, 0x02]).unwrap();
        let used = frame.pack(&mut buffer).unwrap();

        assert_eq!(used, 8);
        assert_eq!(
            buffer[..used],
            [0xfe, 0x03, 0x26, 0x05, 0x87, 0x01, 0x02, 0xa4]
        );
    }

    #[test]
    fn round_trip() {
        let mut buffer = [0u8; 300];

        let payload = (0u16..255).map(|v| v as u8).collect::<Vec<u8>>();
        let frame = LinkFrame::new(0x4481, &payload).unwrap();
        let used = frame.pack(&mut buffer).unwrap();
        assert_eq!(used, 260);

        let (decoded, consumed) = LinkFrame::unpack(&buffer[..used]).unwrap();
        assert_eq!(consumed, used);
        assert_eq!(decoded.command, 0x4481);
        assert_eq!(decoded.payload, payload);
        assert!(decoded.fcs_ok);
    }

    #[test]
    fn payload_too_long() {
        let payload = [0u8; 256];
        assert_eq!(
            LinkFrame::new(0x2401, &payload),
            Err(Error::PayloadTooLong)
        );
    }

    #[test]
    fn checksum_sensitivity() {
        let mut buffer = [0u8; 16];

        let frame = LinkFrame::new(0x6605, &[0x00, 0x55, 0xaa]).unwrap();
        let used = frame.pack(&mut buffer).unwrap();

        // Any single-bit flip after the length byte must show up in the
        // checksum check. A flipped length byte changes the structure and
        // may fail to decode at all.
        for index in 2..used {
            for bit in 0..8 {
                let mut mangled = buffer;
                mangled[index] ^= 1 << bit;
                let (decoded, _) = LinkFrame::unpack(&mangled[..used]).unwrap();
                assert!(!decoded.fcs_ok, "flip at byte {} bit {}", index, bit);
            }
        }
        for bit in 0..8 {
            let mut mangled = buffer;
            mangled[1] ^= 1 << bit;
            match LinkFrame::unpack(&mangled[..used]) {
                Ok((decoded, _)) => assert!(!decoded.fcs_ok),
                Err(error) => assert_eq!(error, Error::WrongNumberOfBytes),
            }
        }
    }
}
