//! # AF subsystem payloads
//!
//! Endpoint registration and application data transfer. Addresses, cluster
//! and profile identifiers are little-endian on the wire and plain host
//! values in the API.

use core::convert::TryFrom;

use crate::pack::{Pack, PackFixed};
use crate::Error;

use byteorder::{ByteOrder, LittleEndian};

/// Cluster slots in an endpoint registration
pub const CLUSTERS_MAX: usize = 16;

/// Network address of the coordinator
pub const COORDINATOR_ADDRESS: u16 = 0x0000;

/// Default radius for outgoing data requests
pub const RADIUS_DEFAULT: u8 = 0x10;

bitflags! {
    /// Transmit options for an outgoing data request
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct TransmitOptions: u8 {
        /// Match any profile identifier at the destination
        const WILDCARD_PROFILE = 0x02;
        /// Request an APS acknowledgement
        const ACKNOWLEDGE = 0x10;
        /// Discover a route before sending
        const DISCOVER_ROUTE = 0x20;
        /// Protect the frame with APS security
        const SECURITY = 0x40;
        /// Skip routing, send direct
        const SKIP_ROUTING = 0x80;
    }
}

extended_enum!(
    /// Latency requirement given at endpoint registration
    LatencyRequirement, u8,
    /// No latency requirement
    NoLatency => 0x00,
    /// Fast beacons
    FastBeacons => 0x01,
    /// Slow beacons
    SlowBeacons => 0x02,
);

/// Endpoint registration request
///
/// Registers one application endpoint with its profile, device identifier
/// and cluster lists.
#[derive(Clone, Debug, PartialEq)]
pub struct Register {
    /// Endpoint number
    pub endpoint: u8,
    /// Application profile identifier
    pub profile: u16,
    /// Device identifier within the profile
    pub device: u16,
    /// Device version
    pub device_version: u8,
    /// Latency requirement
    pub latency: LatencyRequirement,
    input_cluster_count: u8,
    input_clusters: [u16; CLUSTERS_MAX],
    output_cluster_count: u8,
    output_clusters: [u16; CLUSTERS_MAX],
}

impl Register {
    /// Create a registration; cluster lists are truncated to
    /// `CLUSTERS_MAX` entries
    pub fn new(
        endpoint: u8,
        profile: u16,
        device: u16,
        device_version: u8,
        input_clusters: &[u16],
        output_clusters: &[u16],
    ) -> Self {
        let icc = input_clusters.len().min(CLUSTERS_MAX);
        let occ = output_clusters.len().min(CLUSTERS_MAX);
        let mut ic = [0u16; CLUSTERS_MAX];
        ic[..icc].copy_from_slice(&input_clusters[..icc]);
        let mut oc = [0u16; CLUSTERS_MAX];
        oc[..occ].copy_from_slice(&output_clusters[..occ]);
        Self {
            endpoint,
            profile,
            device,
            device_version,
            latency: LatencyRequirement::NoLatency,
            input_cluster_count: icc as u8,
            input_clusters: ic,
            output_cluster_count: occ as u8,
            output_clusters: oc,
        }
    }

    /// Server clusters implemented by the endpoint
    pub fn input_clusters(&self) -> &[u16] {
        &self.input_clusters[..self.input_cluster_count as usize]
    }

    /// Client clusters implemented by the endpoint
    pub fn output_clusters(&self) -> &[u16] {
        &self.output_clusters[..self.output_cluster_count as usize]
    }
}

impl Pack<Register, Error> for Register {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let size = 9
            + (self.input_cluster_count as usize) * 2
            + (self.output_cluster_count as usize) * 2;
        if data.len() < size {
            return Err(Error::NotEnoughSpace);
        }
        data[0] = self.endpoint;
        LittleEndian::write_u16(&mut data[1..3], self.profile);
        LittleEndian::write_u16(&mut data[3..5], self.device);
        data[5] = self.device_version;
        data[6] = u8::from(self.latency);
        data[7] = self.input_cluster_count;
        let mut offset = 8;
        for cluster in self.input_clusters() {
            LittleEndian::write_u16(&mut data[offset..offset + 2], *cluster);
            offset += 2;
        }
        data[offset] = self.output_cluster_count;
        offset += 1;
        for cluster in self.output_clusters() {
            LittleEndian::write_u16(&mut data[offset..offset + 2], *cluster);
            offset += 2;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() < 9 {
            return Err(Error::WrongNumberOfBytes);
        }
        let endpoint = data[0];
        let profile = LittleEndian::read_u16(&data[1..3]);
        let device = LittleEndian::read_u16(&data[3..5]);
        let device_version = data[5];
        let latency = LatencyRequirement::try_from(data[6])?;
        let input_cluster_count = data[7];
        if input_cluster_count as usize > CLUSTERS_MAX {
            return Err(Error::InvalidValue);
        }
        let mut offset = 8;
        if data.len() < offset + (input_cluster_count as usize) * 2 + 1 {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut input_clusters = [0u16; CLUSTERS_MAX];
        for cluster in input_clusters[..input_cluster_count as usize].iter_mut() {
            *cluster = LittleEndian::read_u16(&data[offset..offset + 2]);
            offset += 2;
        }
        let output_cluster_count = data[offset];
        offset += 1;
        if output_cluster_count as usize > CLUSTERS_MAX {
            return Err(Error::InvalidValue);
        }
        if data.len() < offset + (output_cluster_count as usize) * 2 {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut output_clusters = [0u16; CLUSTERS_MAX];
        for cluster in output_clusters[..output_cluster_count as usize].iter_mut() {
            *cluster = LittleEndian::read_u16(&data[offset..offset + 2]);
            offset += 2;
        }
        Ok((
            Self {
                endpoint,
                profile,
                device,
                device_version,
                latency,
                input_cluster_count,
                input_clusters,
                output_cluster_count,
                output_clusters,
            },
            offset,
        ))
    }
}

/// Incoming application message indication
///
/// The firmware appends a few bytes after the declared payload; anything
/// past the payload length is ignored.
#[derive(Clone, Debug, PartialEq)]
pub struct IncomingMessage {
    /// Group identifier, zero for unicast
    pub group: u16,
    /// Cluster identifier
    pub cluster: u16,
    /// Network address of the sender
    pub source_address: u16,
    /// Endpoint of the sender
    pub source_endpoint: u8,
    /// Endpoint addressed on this device
    pub destination_endpoint: u8,
    /// Whether the message was a broadcast
    pub was_broadcast: bool,
    /// Link quality seen by the receiving radio
    pub link_quality: u8,
    /// Whether APS security was used
    pub secure: bool,
    /// Device timestamp of reception
    pub timestamp: u32,
    /// Application transaction sequence number
    pub transaction_sequence: u8,
    /// Cluster library payload
    pub payload: Vec<u8>,
}

impl Pack<IncomingMessage, Error> for IncomingMessage {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if self.payload.len() > 0xff {
            return Err(Error::InvalidValue);
        }
        if data.len() < 17 + self.payload.len() {
            return Err(Error::NotEnoughSpace);
        }
        LittleEndian::write_u16(&mut data[0..2], self.group);
        LittleEndian::write_u16(&mut data[2..4], self.cluster);
        LittleEndian::write_u16(&mut data[4..6], self.source_address);
        data[6] = self.source_endpoint;
        data[7] = self.destination_endpoint;
        data[8] = self.was_broadcast as u8;
        data[9] = self.link_quality;
        data[10] = self.secure as u8;
        LittleEndian::write_u32(&mut data[11..15], self.timestamp);
        data[15] = self.transaction_sequence;
        data[16] = self.payload.len() as u8;
        data[17..17 + self.payload.len()].copy_from_slice(&self.payload);
        Ok(17 + self.payload.len())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() < 17 {
            return Err(Error::WrongNumberOfBytes);
        }
        let length = data[16] as usize;
        if data.len() < 17 + length {
            return Err(Error::WrongNumberOfBytes);
        }
        Ok((
            Self {
                group: LittleEndian::read_u16(&data[0..2]),
                cluster: LittleEndian::read_u16(&data[2..4]),
                source_address: LittleEndian::read_u16(&data[4..6]),
                source_endpoint: data[6],
                destination_endpoint: data[7],
                was_broadcast: data[8] != 0,
                link_quality: data[9],
                secure: data[10] != 0,
                timestamp: LittleEndian::read_u32(&data[11..15]),
                transaction_sequence: data[15],
                payload: data[17..17 + length].to_vec(),
            },
            17 + length,
        ))
    }
}

/// Outgoing application data request
#[derive(Clone, Debug, PartialEq)]
pub struct DataRequest {
    /// Network address of the destination
    pub destination_address: u16,
    /// Endpoint at the destination
    pub destination_endpoint: u8,
    /// Endpoint on this device the data originates from
    pub source_endpoint: u8,
    /// Cluster identifier
    pub cluster: u16,
    /// Application transaction sequence number
    pub transaction_sequence: u8,
    /// Transmit options
    pub options: TransmitOptions,
    /// Maximum hops the frame may take
    pub radius: u8,
    /// Cluster library payload
    pub payload: Vec<u8>,
}

impl DataRequest {
    /// A reply envelope for an incoming message; the sender becomes the
    /// destination and the cluster and transaction sequence are preserved
    pub fn reply_to(message: &IncomingMessage, payload: Vec<u8>) -> Self {
        Self {
            destination_address: message.source_address,
            destination_endpoint: message.source_endpoint,
            source_endpoint: message.destination_endpoint,
            cluster: message.cluster,
            transaction_sequence: message.transaction_sequence,
            options: TransmitOptions::empty(),
            radius: RADIUS_DEFAULT,
            payload,
        }
    }
}

impl Pack<DataRequest, Error> for DataRequest {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if self.payload.len() > 0xff {
            return Err(Error::InvalidValue);
        }
        if data.len() < 10 + self.payload.len() {
            return Err(Error::NotEnoughSpace);
        }
        LittleEndian::write_u16(&mut data[0..2], self.destination_address);
        data[2] = self.destination_endpoint;
        data[3] = self.source_endpoint;
        LittleEndian::write_u16(&mut data[4..6], self.cluster);
        data[6] = self.transaction_sequence;
        data[7] = self.options.bits();
        data[8] = self.radius;
        data[9] = self.payload.len() as u8;
        data[10..10 + self.payload.len()].copy_from_slice(&self.payload);
        Ok(10 + self.payload.len())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() < 10 {
            return Err(Error::WrongNumberOfBytes);
        }
        let length = data[9] as usize;
        if data.len() < 10 + length {
            return Err(Error::WrongNumberOfBytes);
        }
        Ok((
            Self {
                destination_address: LittleEndian::read_u16(&data[0..2]),
                destination_endpoint: data[2],
                source_endpoint: data[3],
                cluster: LittleEndian::read_u16(&data[4..6]),
                transaction_sequence: data[6],
                options: TransmitOptions::from_bits_truncate(data[7]),
                radius: data[8],
                payload: data[10..10 + length].to_vec(),
            },
            10 + length,
        ))
    }
}

/// Transmit status for a previously sent data frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataConfirm {
    /// Transmit status, zero for success
    pub status: u8,
    /// Endpoint the data originated from
    pub endpoint: u8,
    /// Application transaction sequence number
    pub transaction: u8,
}

impl PackFixed<DataConfirm, Error> for DataConfirm {
    fn pack(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() != 3 {
            return Err(Error::WrongNumberOfBytes);
        }
        data[0] = self.status;
        data[1] = self.endpoint;
        data[2] = self.transaction;
        Ok(())
    }

    fn unpack(data: &[u8]) -> Result<Self, Error> {
        if data.len() != 3 {
            return Err(Error::WrongNumberOfBytes);
        }
        Ok(Self {
            status: data[0],
            endpoint: data[1],
            transaction: data[2],
        })
    }
}
