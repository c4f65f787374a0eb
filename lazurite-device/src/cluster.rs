//! Cluster providers and device-side ZCL construction.
//!
//! A provider snapshots its values when constructed. Build one immediately
//! before answering a read or emitting a report so current state is served.

use lazurite_data::cluster_library::commands::{
    AttributeStatus, DefaultResponse, ReadAttributesResponse, ReportAttributes,
};
use lazurite_data::cluster_library::{
    basic, on_off, AttributeValue, ClusterLibraryHeader, ClusterLibraryStatus, Direction,
    FrameControl, FrameType, GeneralCommandIdentifier,
};
use lazurite_data::pack::Pack;

use crate::{Error, Identity};

/// Version of the cluster library the device implements
const LIBRARY_VERSION: u8 = 0x08;

/// Source of attribute values for one cluster
pub trait AttributeProvider {
    /// Cluster identifier served
    fn cluster(&self) -> u16;

    /// Attributes covered by unsolicited reports
    fn supported_attributes(&self) -> &'static [u16];

    /// Produce the record for one requested attribute
    fn attribute(&self, identifier: u16) -> AttributeStatus;
}

const BASIC_ATTRIBUTES: [u16; 5] = [
    basic::ATTR_LIBRARY_VERSION,
    basic::ATTR_MANUFACTURER_NAME,
    basic::ATTR_MODEL_IDENTIFIER,
    basic::ATTR_POWER_SOURCE,
    basic::ATTR_SOFTWARE_BUILD_IDENTIFIER,
];

/// Device identity, battery powered, as the basic cluster reports it
pub struct BasicCluster<'a> {
    identity: &'a Identity,
}

impl<'a> BasicCluster<'a> {
    /// Provider over the given identity
    pub fn new(identity: &'a Identity) -> Self {
        Self { identity }
    }
}

impl AttributeProvider for BasicCluster<'_> {
    fn cluster(&self) -> u16 {
        basic::CLUSTER
    }

    fn supported_attributes(&self) -> &'static [u16] {
        &BASIC_ATTRIBUTES
    }

    fn attribute(&self, identifier: u16) -> AttributeStatus {
        let value = match identifier {
            basic::ATTR_LIBRARY_VERSION => Some(AttributeValue::Enumeration8(LIBRARY_VERSION)),
            basic::ATTR_MANUFACTURER_NAME => Some(AttributeValue::CharacterString(
                self.identity.manufacturer.clone(),
            )),
            basic::ATTR_MODEL_IDENTIFIER => {
                Some(AttributeValue::CharacterString(self.identity.model.clone()))
            }
            basic::ATTR_POWER_SOURCE => Some(AttributeValue::Enumeration8(
                basic::PowerSource::Battery.into(),
            )),
            basic::ATTR_SOFTWARE_BUILD_IDENTIFIER => Some(AttributeValue::CharacterString(
                self.identity.software_build.clone(),
            )),
            _ => None,
        };
        match value {
            Some(value) => AttributeStatus::success(identifier, value),
            None => AttributeStatus::unsupported(identifier),
        }
    }
}

const ON_OFF_ATTRIBUTES: [u16; 1] = [on_off::ATTR_ON_OFF];

/// Snapshot of one endpoint's on/off state
pub struct OnOffCluster {
    state: bool,
}

impl OnOffCluster {
    /// Provider over the state at this moment
    pub fn new(state: bool) -> Self {
        Self { state }
    }
}

impl AttributeProvider for OnOffCluster {
    fn cluster(&self) -> u16 {
        on_off::CLUSTER
    }

    fn supported_attributes(&self) -> &'static [u16] {
        &ON_OFF_ATTRIBUTES
    }

    fn attribute(&self, identifier: u16) -> AttributeStatus {
        match identifier {
            on_off::ATTR_ON_OFF => {
                AttributeStatus::success(identifier, AttributeValue::from(self.state))
            }
            _ => AttributeStatus::unsupported(identifier),
        }
    }
}

// Frame control for unsolicited server-to-client messages, packs as 0x18
fn notification_control() -> FrameControl {
    FrameControl {
        frame_type: FrameType::Global,
        manufacturer_specific: false,
        direction: Direction::ToClient,
        disable_default_response: true,
    }
}

/// Build the ZCL payload answering a read-attributes request.
///
/// The request's frame control has its direction bit flipped and the
/// transaction sequence is preserved; records appear in request order.
pub fn read_attributes_response(
    request: &ClusterLibraryHeader,
    attributes: &[u16],
    provider: &dyn AttributeProvider,
    data: &mut [u8],
) -> Result<usize, Error> {
    let mut control = request.control;
    control.direction = control.direction.flip();
    let header = ClusterLibraryHeader {
        control,
        manufacturer: None,
        transaction_sequence: request.transaction_sequence,
        command: GeneralCommandIdentifier::ReadAttributesResponse.into(),
    };
    let mut offset = header.pack(data)?;
    let response = ReadAttributesResponse {
        attributes: attributes
            .iter()
            .map(|&identifier| provider.attribute(identifier))
            .collect(),
    };
    offset += response.pack(&mut data[offset..])?;
    Ok(offset)
}

/// Build the ZCL payload acknowledging a cluster-specific command
pub fn default_response(
    request: &ClusterLibraryHeader,
    status: ClusterLibraryStatus,
    data: &mut [u8],
) -> Result<usize, Error> {
    let header = ClusterLibraryHeader {
        control: notification_control(),
        manufacturer: None,
        transaction_sequence: request.transaction_sequence,
        command: GeneralCommandIdentifier::DefaultResponse.into(),
    };
    let mut offset = header.pack(data)?;
    let response = DefaultResponse {
        command: request.command,
        status,
    };
    offset += response.pack(&mut data[offset..])?;
    Ok(offset)
}

/// Build an unsolicited report covering the provider's full supported set
pub fn attribute_report(
    provider: &dyn AttributeProvider,
    sequence: u8,
    data: &mut [u8],
) -> Result<usize, Error> {
    let header = ClusterLibraryHeader {
        control: notification_control(),
        manufacturer: None,
        transaction_sequence: sequence,
        command: GeneralCommandIdentifier::ReportAttributes.into(),
    };
    let mut offset = header.pack(data)?;
    let report = ReportAttributes {
        attributes: provider
            .supported_attributes()
            .iter()
            .map(|&identifier| provider.attribute(identifier))
            .collect(),
    };
    offset += report.pack(&mut data[offset..])?;
    Ok(offset)
}
