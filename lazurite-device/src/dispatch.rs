//! Steady-state dispatch loop.
//!
//! Runs after the join procedure reaches its terminal success. Each
//! iteration first drains any pending frame, then polls the coarse timers.
//! A frame arriving exactly at a timer boundary is therefore processed
//! before the timer fires.

use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use lazurite_data::cluster_library::commands::ReadAttributes;
use lazurite_data::cluster_library::{
    basic, on_off, ClusterLibraryHeader, ClusterLibraryStatus, FrameType,
    GeneralCommandIdentifier,
};
use lazurite_data::pack::{Pack, PackFixed};
use lazurite_data::znp::af::{
    DataConfirm, DataRequest, IncomingMessage, Register, TransmitOptions, COORDINATOR_ADDRESS,
    RADIUS_DEFAULT,
};
use lazurite_data::znp::{CommandIdentifier, LinkFrame};

use crate::cluster::{self, BasicCluster, OnOffCluster};
use crate::link::Znp;
use crate::{Error, Identity};

/// Endpoint carrying the simulated wall switch
pub const SWITCH_ENDPOINT: u8 = 0x01;

/// Endpoint carrying the simulated lamp
pub const LED_ENDPOINT: u8 = 0x02;

/// Home Automation profile identifier
const PROFILE_HOME_AUTOMATION: u16 = 0x0104;

/// On/Off device identifier within the profile
const DEVICE_ON_OFF: u16 = 0x0000;

/// Device version reported at registration
const DEVICE_VERSION: u8 = 0x01;

/// Interval between periodic reports for the lamp endpoint, seconds
const REPORT_INTERVAL: u64 = 10;

/// Interval between simulated lamp toggles, seconds
const LED_TOGGLE_INTERVAL: u64 = 7;

/// Interval between simulated switch toggles, seconds
const SWITCH_TOGGLE_INTERVAL: u64 = 12;

/// One application endpoint and its runtime state
pub struct Endpoint {
    /// Endpoint number
    pub endpoint: u8,
    /// Current on/off value
    pub on_off: bool,
}

// Coarse parity timer. Compares (now / interval) % 2 with the last seen
// value; a change is the edge. Fires at most once per interval when polled
// often enough, and does not promise alignment to wall-clock boundaries.
struct EdgeTimer {
    interval: u64,
    parity: u64,
}

impl EdgeTimer {
    fn new(interval: u64, now: u64) -> Self {
        Self {
            interval,
            parity: (now / interval) % 2,
        }
    }

    fn fired(&mut self, now: u64) -> bool {
        let parity = (now / self.interval) % 2;
        if parity != self.parity {
            self.parity = parity;
            true
        } else {
            false
        }
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Routes incoming application messages and runs the simulated device
pub struct Dispatcher {
    identity: Identity,
    endpoints: Vec<Endpoint>,
    report_sequence: u8,
    report_timer: EdgeTimer,
    led_timer: EdgeTimer,
    switch_timer: EdgeTimer,
}

impl Dispatcher {
    /// A dispatcher for the standard two-endpoint device, both outputs off.
    /// `now` is the current unix time, used to seed the timers.
    pub fn new(identity: Identity, now: u64) -> Self {
        Self {
            identity,
            endpoints: vec![
                Endpoint {
                    endpoint: SWITCH_ENDPOINT,
                    on_off: false,
                },
                Endpoint {
                    endpoint: LED_ENDPOINT,
                    on_off: false,
                },
            ],
            report_sequence: 0,
            report_timer: EdgeTimer::new(REPORT_INTERVAL, now),
            led_timer: EdgeTimer::new(LED_TOGGLE_INTERVAL, now),
            switch_timer: EdgeTimer::new(SWITCH_TOGGLE_INTERVAL, now),
        }
    }

    /// Registration descriptors for every endpoint. Both expose the basic
    /// and on/off clusters as servers and report on/off as a client.
    pub fn registrations(&self) -> Vec<Register> {
        self.endpoints
            .iter()
            .map(|endpoint| {
                Register::new(
                    endpoint.endpoint,
                    PROFILE_HOME_AUTOMATION,
                    DEVICE_ON_OFF,
                    DEVICE_VERSION,
                    &[basic::CLUSTER, on_off::CLUSTER],
                    &[on_off::CLUSTER],
                )
            })
            .collect()
    }

    /// Current on/off value for an endpoint
    pub fn on_off(&self, endpoint: u8) -> Option<bool> {
        self.endpoints
            .iter()
            .find(|entry| entry.endpoint == endpoint)
            .map(|entry| entry.on_off)
    }

    fn set_on_off(&mut self, endpoint: u8, state: bool) {
        if let Some(entry) = self
            .endpoints
            .iter_mut()
            .find(|entry| entry.endpoint == endpoint)
        {
            entry.on_off = state;
        }
    }

    /// Run the steady-state loop; returns only on a transport error
    pub fn run<P: Read + Write>(&mut self, znp: &mut Znp<P>) -> Result<(), Error> {
        log::info!("Entering the dispatch loop");
        loop {
            if let Some(frame) = znp.poll_frame()? {
                self.handle_frame(znp, &frame)?;
            }
            self.update(znp, unix_seconds())?;
        }
    }

    /// Classify and route one inbound frame
    pub fn handle_frame<P: Read + Write>(
        &mut self,
        znp: &mut Znp<P>,
        frame: &LinkFrame,
    ) -> Result<(), Error> {
        if frame.command == CommandIdentifier::DataConfirm {
            match DataConfirm::unpack(&frame.payload) {
                Ok(confirm) => log::info!(
                    "Transmit status {} for transaction {} on endpoint {}",
                    confirm.status,
                    confirm.transaction,
                    confirm.endpoint
                ),
                Err(error) => log::warn!("Malformed data confirm: {:?}", error),
            }
            return Ok(());
        }
        if frame.command != CommandIdentifier::IncomingMessage {
            log::info!("Unexpected frame 0x{:04x} dropped", frame.command);
            return Ok(());
        }
        match IncomingMessage::unpack(&frame.payload) {
            Ok((message, _)) => self.handle_incoming(znp, &message),
            Err(error) => {
                log::warn!("Malformed incoming message: {:?}", error);
                Ok(())
            }
        }
    }

    /// Route one application message by destination endpoint and cluster,
    /// replying to the sender when a responder exists
    pub fn handle_incoming<P: Read + Write>(
        &mut self,
        znp: &mut Znp<P>,
        message: &IncomingMessage,
    ) -> Result<(), Error> {
        let (header, header_size) = match ClusterLibraryHeader::unpack(&message.payload) {
            Ok(parsed) => parsed,
            Err(error) => {
                log::warn!("Undecodable cluster library payload: {:?}", error);
                return Ok(());
            }
        };
        log::info!(
            "Incoming command 0x{:02x} for endpoint {} cluster 0x{:04x}",
            header.command,
            message.destination_endpoint,
            message.cluster
        );
        let mut data = [0u8; 128];
        let reply = if header.control.frame_type == FrameType::Local {
            self.cluster_command(&header, message, &mut data)?
        } else if header.command == GeneralCommandIdentifier::ReadAttributes {
            self.read_attributes(&header, &message.payload[header_size..], message, &mut data)?
        } else {
            log::info!("Unsupported general command 0x{:02x}", header.command);
            None
        };
        if let Some(used) = reply {
            let request = DataRequest::reply_to(message, data[..used].to_vec());
            if !znp.send_data(&request)? {
                log::warn!("Reply data request was not acknowledged");
            }
        }
        Ok(())
    }

    // Cluster-specific command; only the on/off cluster takes these
    fn cluster_command(
        &mut self,
        header: &ClusterLibraryHeader,
        message: &IncomingMessage,
        data: &mut [u8],
    ) -> Result<Option<usize>, Error> {
        if message.cluster != on_off::CLUSTER {
            log::info!(
                "No cluster-specific commands on cluster 0x{:04x}",
                message.cluster
            );
            return Ok(None);
        }
        let current = match self.on_off(message.destination_endpoint) {
            Some(state) => state,
            None => {
                log::info!("No endpoint {} on this device", message.destination_endpoint);
                return Ok(None);
            }
        };
        let status = match header.command {
            on_off::CMD_OFF => {
                self.set_on_off(message.destination_endpoint, false);
                ClusterLibraryStatus::Success
            }
            on_off::CMD_ON => {
                self.set_on_off(message.destination_endpoint, true);
                ClusterLibraryStatus::Success
            }
            on_off::CMD_TOGGLE => {
                self.set_on_off(message.destination_endpoint, !current);
                ClusterLibraryStatus::Success
            }
            _ => ClusterLibraryStatus::UnsupportedClusterCommand,
        };
        if status == ClusterLibraryStatus::Success {
            if let Some(state) = self.on_off(message.destination_endpoint) {
                log::info!(
                    "Endpoint {} set to {}",
                    message.destination_endpoint,
                    if state { "on" } else { "off" }
                );
            }
        }
        let used = cluster::default_response(header, status, data)?;
        Ok(Some(used))
    }

    // Global read-attributes; pick the provider for the cluster/endpoint
    fn read_attributes(
        &self,
        header: &ClusterLibraryHeader,
        body: &[u8],
        message: &IncomingMessage,
        data: &mut [u8],
    ) -> Result<Option<usize>, Error> {
        let (request, _) = match ReadAttributes::unpack(body) {
            Ok(parsed) => parsed,
            Err(error) => {
                log::warn!("Malformed read-attributes request: {:?}", error);
                return Ok(None);
            }
        };
        let used = if message.cluster == basic::CLUSTER {
            let provider = BasicCluster::new(&self.identity);
            cluster::read_attributes_response(header, &request.attributes, &provider, data)?
        } else if message.cluster == on_off::CLUSTER {
            match self.on_off(message.destination_endpoint) {
                Some(state) => {
                    let provider = OnOffCluster::new(state);
                    cluster::read_attributes_response(
                        header,
                        &request.attributes,
                        &provider,
                        data,
                    )?
                }
                None => {
                    log::info!("No endpoint {} on this device", message.destination_endpoint);
                    return Ok(None);
                }
            }
        } else {
            log::info!("Unsupported cluster 0x{:04x}, cannot respond", message.cluster);
            return Ok(None);
        };
        Ok(Some(used))
    }

    /// Poll the coarse timers; fires the periodic report and the simulated
    /// state changes on their interval boundaries
    pub fn update<P: Read + Write>(&mut self, znp: &mut Znp<P>, now: u64) -> Result<(), Error> {
        if self.report_timer.fired(now) {
            log::info!("Periodic report for endpoint {}", LED_ENDPOINT);
            self.report(znp, LED_ENDPOINT)?;
        }
        if self.led_timer.fired(now) {
            if let Some(state) = self.on_off(LED_ENDPOINT) {
                self.set_on_off(LED_ENDPOINT, !state);
                log::info!("Lamp changed to {}", if state { "off" } else { "on" });
            }
        }
        if self.switch_timer.fired(now) {
            if let Some(state) = self.on_off(SWITCH_ENDPOINT) {
                self.set_on_off(SWITCH_ENDPOINT, !state);
                log::info!("Switch changed to {}", if state { "off" } else { "on" });
                // The switch reports each change as it happens
                self.report(znp, SWITCH_ENDPOINT)?;
            }
        }
        Ok(())
    }

    // Unsolicited on/off report for one endpoint, sent to the coordinator
    fn report<P: Read + Write>(&mut self, znp: &mut Znp<P>, endpoint: u8) -> Result<(), Error> {
        let state = match self.on_off(endpoint) {
            Some(state) => state,
            None => return Ok(()),
        };
        let provider = OnOffCluster::new(state);
        let mut data = [0u8; 32];
        let sequence = self.report_sequence;
        self.report_sequence = self.report_sequence.wrapping_add(1);
        let used = cluster::attribute_report(&provider, sequence, &mut data)?;
        let request = DataRequest {
            destination_address: COORDINATOR_ADDRESS,
            destination_endpoint: 0x01,
            source_endpoint: endpoint,
            cluster: on_off::CLUSTER,
            transaction_sequence: sequence,
            options: TransmitOptions::empty(),
            radius: RADIUS_DEFAULT,
            payload: data[..used].to_vec(),
        };
        if !znp.send_data(&request)? {
            log::warn!("Report for endpoint {} was not acknowledged", endpoint);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct FakePort {
        rx: Vec<u8>,
        position: usize,
        tx: Vec<u8>,
    }

    impl FakePort {
        fn new() -> Self {
            Self {
                rx: Vec::new(),
                position: 0,
                tx: Vec::new(),
            }
        }

        fn queue_frame(&mut self, command: u16, payload: &[u8]) {
            let frame = LinkFrame::new(command, payload).unwrap();
            let mut buffer = [0u8; 300];
            let used = frame.pack(&mut buffer).unwrap();
            self.rx.extend_from_slice(&buffer[..used]);
        }
    }

    impl Read for FakePort {
        fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
            if self.position >= self.rx.len() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
            }
            let available = &self.rx[self.position..];
            let count = available.len().min(buffer.len());
            buffer[..count].copy_from_slice(&available[..count]);
            self.position += count;
            Ok(count)
        }
    }

    impl Write for FakePort {
        fn write(&mut self, buffer: &[u8]) -> io::Result<usize> {
            self.tx.extend_from_slice(buffer);
            Ok(buffer.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn on_command(endpoint: u8, command: u8) -> IncomingMessage {
        IncomingMessage {
            group: 0x0000,
            cluster: on_off::CLUSTER,
            source_address: 0x0000,
            source_endpoint: 0x01,
            destination_endpoint: endpoint,
            was_broadcast: false,
            link_quality: 0x50,
            secure: false,
            timestamp: 0,
            transaction_sequence: 0x21,
            payload: vec![0x01, 0x43, command],
        }
    }

    fn read_request(endpoint: u8, cluster: u16, attributes: &[u16]) -> IncomingMessage {
        let mut payload = vec![0x00, 0x2b, 0x00];
        for attribute in attributes {
            payload.extend_from_slice(&attribute.to_le_bytes());
        }
        IncomingMessage {
            group: 0x0000,
            cluster,
            source_address: 0x0000,
            source_endpoint: 0x01,
            destination_endpoint: endpoint,
            was_broadcast: false,
            link_quality: 0x50,
            secure: false,
            timestamp: 0,
            transaction_sequence: 0x2b,
            payload,
        }
    }

    fn acknowledged_znp() -> Znp<FakePort> {
        let mut port = FakePort::new();
        port.queue_frame(0x6401, &[0x00]);
        Znp::new(port)
    }

    #[test]
    fn endpoint_isolation() {
        let mut znp = acknowledged_znp();
        let mut dispatcher = Dispatcher::new(Identity::default(), 0);

        dispatcher
            .handle_incoming(&mut znp, &on_command(SWITCH_ENDPOINT, on_off::CMD_ON))
            .unwrap();

        assert_eq!(dispatcher.on_off(SWITCH_ENDPOINT), Some(true));
        assert_eq!(dispatcher.on_off(LED_ENDPOINT), Some(false));

        let mut znp = acknowledged_znp();
        dispatcher
            .handle_incoming(&mut znp, &on_command(LED_ENDPOINT, on_off::CMD_ON))
            .unwrap();
        let mut znp = acknowledged_znp();
        dispatcher
            .handle_incoming(&mut znp, &on_command(SWITCH_ENDPOINT, on_off::CMD_OFF))
            .unwrap();

        assert_eq!(dispatcher.on_off(SWITCH_ENDPOINT), Some(false));
        assert_eq!(dispatcher.on_off(LED_ENDPOINT), Some(true));
    }

    #[test]
    fn command_reply_envelope() {
        let mut znp = acknowledged_znp();
        let mut dispatcher = Dispatcher::new(Identity::default(), 0);

        dispatcher
            .handle_incoming(&mut znp, &on_command(LED_ENDPOINT, on_off::CMD_ON))
            .unwrap();

        let port = znp.into_inner();
        let (frame, _) = LinkFrame::unpack(&port.tx).unwrap();
        assert_eq!(frame.command, 0x2401);
        let (request, _) = DataRequest::unpack(&frame.payload).unwrap();
        assert_eq!(request.destination_address, 0x0000);
        assert_eq!(request.destination_endpoint, 0x01);
        assert_eq!(request.source_endpoint, LED_ENDPOINT);
        assert_eq!(request.cluster, on_off::CLUSTER);
        assert_eq!(request.transaction_sequence, 0x21);
        // Default response echoing the "on" command with success
        assert_eq!(request.payload, [0x18, 0x43, 0x0b, 0x01, 0x00]);
    }

    #[test]
    fn read_attributes_reply() {
        let mut znp = acknowledged_znp();
        let mut dispatcher = Dispatcher::new(Identity::default(), 0);

        dispatcher
            .handle_incoming(
                &mut znp,
                &read_request(SWITCH_ENDPOINT, on_off::CLUSTER, &[on_off::ATTR_ON_OFF]),
            )
            .unwrap();

        let port = znp.into_inner();
        let (frame, _) = LinkFrame::unpack(&port.tx).unwrap();
        let (request, _) = DataRequest::unpack(&frame.payload).unwrap();
        assert_eq!(
            request.payload,
            [0x08, 0x2b, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00]
        );
    }

    #[test]
    fn unknown_cluster_is_dropped_without_reply() {
        let mut znp = Znp::new(FakePort::new());
        let mut dispatcher = Dispatcher::new(Identity::default(), 0);

        dispatcher
            .handle_incoming(&mut znp, &read_request(SWITCH_ENDPOINT, 0x0019, &[0x0000]))
            .unwrap();

        let port = znp.into_inner();
        assert!(port.tx.is_empty());
    }

    #[test]
    fn unknown_endpoint_is_dropped_without_reply() {
        let mut znp = Znp::new(FakePort::new());
        let mut dispatcher = Dispatcher::new(Identity::default(), 0);

        dispatcher
            .handle_incoming(
                &mut znp,
                &read_request(0x07, on_off::CLUSTER, &[on_off::ATTR_ON_OFF]),
            )
            .unwrap();

        let port = znp.into_inner();
        assert!(port.tx.is_empty());
    }

    #[test]
    fn data_confirm_is_informational() {
        let mut znp = Znp::new(FakePort::new());
        let mut dispatcher = Dispatcher::new(Identity::default(), 0);

        let frame = LinkFrame {
            command: 0x4480,
            payload: vec![0x00, 0x02, 0x11],
            fcs_ok: true,
        };
        dispatcher.handle_frame(&mut znp, &frame).unwrap();

        let port = znp.into_inner();
        assert!(port.tx.is_empty());
    }

    #[test]
    fn edge_trigger_fires_once_per_crossing() {
        let mut timer = EdgeTimer::new(10, 5);
        assert!(!timer.fired(6));
        assert!(!timer.fired(9));
        assert!(timer.fired(10));
        assert!(!timer.fired(10));
        assert!(!timer.fired(13));
        assert!(!timer.fired(19));
        assert!(timer.fired(20));
        assert!(!timer.fired(25));
        // A crossing observed late still fires exactly once
        assert!(timer.fired(31));
        assert!(!timer.fired(33));
    }

    #[test]
    fn switch_toggle_emits_a_report() {
        let mut port = FakePort::new();
        port.queue_frame(0x6401, &[0x00]); // periodic report ack
        port.queue_frame(0x6401, &[0x00]); // switch report ack
        let mut znp = Znp::new(port);
        let mut dispatcher = Dispatcher::new(Identity::default(), 0);

        // 93 / 10, 93 / 7 and 93 / 12 are all odd, so every timer sees an
        // edge on the same poll
        dispatcher.update(&mut znp, 93).unwrap();

        assert_eq!(dispatcher.on_off(SWITCH_ENDPOINT), Some(true));
        assert_eq!(dispatcher.on_off(LED_ENDPOINT), Some(true));

        let port = znp.into_inner();
        let (first, used) = LinkFrame::unpack(&port.tx).unwrap();
        let (second, _) = LinkFrame::unpack(&port.tx[used..]).unwrap();
        assert_eq!(first.command, 0x2401);
        assert_eq!(second.command, 0x2401);
        let (report, _) = DataRequest::unpack(&second.payload).unwrap();
        assert_eq!(report.source_endpoint, SWITCH_ENDPOINT);
        assert_eq!(report.destination_address, COORDINATOR_ADDRESS);
        // Switch toggled before its report was built, so it reports "on"
        assert_eq!(report.payload[3..], [0x00, 0x00, 0x00, 0x10, 0x01]);
    }

    #[test]
    fn registrations_cover_both_endpoints() {
        let dispatcher = Dispatcher::new(Identity::default(), 0);
        let registrations = dispatcher.registrations();

        assert_eq!(registrations.len(), 2);
        assert_eq!(registrations[0].endpoint, SWITCH_ENDPOINT);
        assert_eq!(registrations[1].endpoint, LED_ENDPOINT);
        assert_eq!(
            registrations[0].input_clusters(),
            [basic::CLUSTER, on_off::CLUSTER]
        );
        assert_eq!(registrations[0].output_clusters(), [on_off::CLUSTER]);
    }
}
