//! Network join procedure.
//!
//! One-shot: configure the device, reset it to clear stale network state,
//! register the application endpoints, then start the network and wait for
//! the device to come up as an end device. Once joined the procedure is
//! never reentered; a restart begins from scratch.

use std::io::{Read, Write};

use lazurite_data::pack::PackFixed;
use lazurite_data::znp::af::Register;
use lazurite_data::znp::zb::{self, ConfigurationParameter, LogicalType};
use lazurite_data::znp::zdo::{DeviceState, StartupStatus, StateChange};
use lazurite_data::znp::{sys, CommandIdentifier, LinkFrame};

use crate::link::Znp;
use crate::Error;

/// Maximum number of "searching" notifications tolerated before giving up
pub const SEARCHING_MAX: u8 = 20;

/// Join procedure states
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JoinState {
    /// Waiting for the reset indication that shows the device is alive
    AwaitingDeviceReady,
    /// Writing the non-volatile configuration
    Configuring,
    /// Waiting for the reset that clears old network state
    AwaitingResetConfirm,
    /// Registering the application endpoints
    RegisteringEndpoints,
    /// Startup issued, waiting for the network to accept the device
    AwaitingNetworkJoin {
        /// Number of "searching" notifications seen so far
        searching: u8,
    },
    /// The device operates as an end device on the coordinator's network
    Joined,
    /// The procedure failed
    Failed,
}

/// Network parameters written during configuration
#[derive(Clone, Debug)]
pub struct NetworkParameters {
    /// PAN identifier filter; 0xffff tolerates whatever PAN is found
    pub pan_identifier: u16,
    /// Radio channel to scan
    pub channel: u8,
    /// Data request poll interval in milliseconds
    pub poll_rate: u32,
}

impl Default for NetworkParameters {
    fn default() -> Self {
        Self {
            pan_identifier: 0xffff,
            channel: 16,
            poll_rate: 15_000,
        }
    }
}

/// Drives the join handshake to a terminal state
pub struct JoinProcedure {
    state: JoinState,
}

impl JoinProcedure {
    /// A procedure waiting for the device to announce itself
    pub fn new() -> Self {
        Self {
            state: JoinState::AwaitingDeviceReady,
        }
    }

    /// Current state
    pub fn state(&self) -> JoinState {
        self.state
    }

    /// Configure the device and register its endpoints; afterwards the
    /// device is ready for `join`. Any rejected write is fatal.
    pub fn prepare<P: Read + Write>(
        &mut self,
        znp: &mut Znp<P>,
        parameters: &NetworkParameters,
        endpoints: &[Register],
    ) -> Result<(), Error> {
        match self.prepare_inner(znp, parameters, endpoints) {
            Ok(()) => Ok(()),
            Err(error) => {
                self.state = JoinState::Failed;
                Err(error)
            }
        }
    }

    /// Start the network and wait until the device joins or the retry
    /// bound is exceeded
    pub fn join<P: Read + Write>(&mut self, znp: &mut Znp<P>) -> Result<(), Error> {
        match self.join_inner(znp) {
            Ok(()) => Ok(()),
            Err(error) => {
                self.state = JoinState::Failed;
                Err(error)
            }
        }
    }

    /// `prepare` followed by `join`, for non-interactive use
    pub fn run<P: Read + Write>(
        &mut self,
        znp: &mut Znp<P>,
        parameters: &NetworkParameters,
        endpoints: &[Register],
    ) -> Result<(), Error> {
        self.prepare(znp, parameters, endpoints)?;
        self.join(znp)
    }

    fn prepare_inner<P: Read + Write>(
        &mut self,
        znp: &mut Znp<P>,
        parameters: &NetworkParameters,
        endpoints: &[Register],
    ) -> Result<(), Error> {
        log::info!("Waiting for the device reset indication");
        loop {
            let frame = znp.next_frame()?;
            if self.device_ready(&frame) {
                break;
            }
        }

        self.configure(znp, parameters)?;

        self.state = JoinState::AwaitingResetConfirm;
        log::info!("Resetting to clear network state");
        let frame = znp.reset()?;
        if frame.command == CommandIdentifier::SysResetIndication {
            log::info!("Reset complete");
        } else {
            log::info!(
                "Expected a reset indication, continuing on 0x{:04x}",
                frame.command
            );
        }

        self.state = JoinState::RegisteringEndpoints;
        for registration in endpoints {
            log::info!("Registering endpoint {}", registration.endpoint);
            if !znp.register_endpoint(registration)? {
                return Err(Error::EndpointRejected(registration.endpoint));
            }
        }
        Ok(())
    }

    fn join_inner<P: Read + Write>(&mut self, znp: &mut Znp<P>) -> Result<(), Error> {
        log::info!("Starting the network");
        let mut frame = znp.startup_from_application(0)?;
        self.state = JoinState::AwaitingNetworkJoin { searching: 0 };
        loop {
            if self.network_frame(&frame)? {
                break;
            }
            frame = znp.next_frame()?;
        }
        self.state = JoinState::Joined;
        Ok(())
    }

    /// Handle one frame while waiting for the device; true once the reset
    /// indication arrives
    pub fn device_ready(&mut self, frame: &LinkFrame) -> bool {
        if frame.command == CommandIdentifier::SysResetIndication {
            match sys::ResetIndication::unpack(&frame.payload) {
                Ok(indication) => log::info!(
                    "Device ready, reset by {:?}, firmware {}.{}",
                    indication.reason,
                    indication.major_release,
                    indication.minor_release
                ),
                Err(_) => log::info!("Device ready"),
            }
            self.state = JoinState::Configuring;
            true
        } else {
            log::debug!(
                "Ignoring frame 0x{:04x} while waiting for the device",
                frame.command
            );
            false
        }
    }

    fn configure<P: Read + Write>(
        &mut self,
        znp: &mut Znp<P>,
        parameters: &NetworkParameters,
    ) -> Result<(), Error> {
        self.state = JoinState::Configuring;
        let logical_type = [u8::from(LogicalType::EndDevice)];
        let pan_identifier = parameters.pan_identifier.to_le_bytes();
        let channel_list = zb::channel_mask(parameters.channel).to_le_bytes();
        let startup_option = [zb::STARTUP_CLEAR_STATE];
        let poll_rate = parameters.poll_rate.to_le_bytes();
        let writes: [(ConfigurationParameter, &[u8]); 5] = [
            (ConfigurationParameter::LogicalType, &logical_type),
            (ConfigurationParameter::PanIdentifier, &pan_identifier),
            (ConfigurationParameter::ChannelList, &channel_list),
            (ConfigurationParameter::StartupOption, &startup_option),
            (ConfigurationParameter::PollRate, &poll_rate),
        ];
        for (parameter, value) in writes {
            log::info!("Writing configuration {:?}", parameter);
            if !znp.write_configuration(parameter, value)? {
                return Err(Error::ConfigurationRejected(parameter));
            }
        }
        Ok(())
    }

    /// Handle one frame while waiting for the network join; true once the
    /// device reports the operational end device state
    pub fn network_frame(&mut self, frame: &LinkFrame) -> Result<bool, Error> {
        let searching = match self.state {
            JoinState::AwaitingNetworkJoin { searching } => searching,
            _ => {
                log::debug!("Not waiting for a join, dropping 0x{:04x}", frame.command);
                return Ok(false);
            }
        };
        if frame.command == CommandIdentifier::StartupFromApplicationResponse {
            // Informational; the state change indications carry the progress
            match frame.payload.first() {
                Some(&status) => match StartupStatus::try_from(status) {
                    Ok(status) => log::info!("Startup response, {:?}", status),
                    Err(_) => log::info!("Startup response, status code {}", status),
                },
                None => log::warn!("Startup response without a status"),
            }
            return Ok(false);
        }
        if frame.command == CommandIdentifier::StateChangeIndication {
            let change = match StateChange::unpack(&frame.payload) {
                Ok(change) => change,
                Err(error) => {
                    log::warn!("Malformed state change: {:?}", error);
                    return Ok(false);
                }
            };
            match change.device_state() {
                Some(DeviceState::Searching) => {
                    let searching = searching + 1;
                    if searching > SEARCHING_MAX {
                        log::error!(
                            "Still searching after {} notifications; the coordinator is not accepting joins or is offline",
                            searching
                        );
                        self.state = JoinState::Failed;
                        return Err(Error::CoordinatorUnreachable);
                    }
                    self.state = JoinState::AwaitingNetworkJoin { searching };
                    log::debug!("Searching for a network ({})", searching);
                }
                Some(DeviceState::EndDevice) => {
                    log::info!("Joined the coordinator's network");
                    return Ok(true);
                }
                Some(state) => log::info!("Device state {:?}", state),
                None => log::info!("Device state {}", change.state),
            }
            return Ok(false);
        }
        log::debug!("Ignoring frame 0x{:04x} while joining", frame.command);
        Ok(false)
    }
}

impl Default for JoinProcedure {
    fn default() -> Self {
        Self::new()
    }
}
