use std::fs;
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{Local, SecondsFormat};
use clap::{App, AppSettings, Arg};

use serialport::prelude::*;

use serde_derive::Deserialize;

use lazurite_device::{Dispatcher, Identity, JoinProcedure, NetworkParameters, Znp};

#[derive(Debug, Deserialize)]
struct Config {
    manufacturer: Option<String>,
    model: Option<String>,
    software_build: Option<String>,
    channel: Option<u8>,
    pan_identifier: Option<u16>,
    poll_rate: Option<u32>,
    read_timeout_ms: Option<u64>,
}

fn read_config(file_path: &str) -> Option<Config> {
    match fs::read(file_path) {
        Ok(bytes) => match toml::from_str::<Config>(&String::from_utf8_lossy(bytes.as_slice())) {
            Ok(config) => Some(config),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

fn pause(message: &str) {
    println!("{}", message);
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
}

fn timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn main() {
    env_logger::init();
    let matches = App::new("ZNP end device emulator")
        .about("Joins a coordinator's network through a ZNP and behaves as a two-endpoint on/off device")
        .setting(AppSettings::DisableVersion)
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .help("Path to configuration file")
                .use_delimiter(false)
                .required(false)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("skip-setup")
                .long("skip-setup")
                .help("Skip configuration and join, go straight to the dispatch loop"),
        )
        .arg(
            Arg::with_name("port")
                .help("The device path to a serial port")
                .use_delimiter(false)
                .required(true),
        )
        .get_matches();

    let port_name = matches.value_of("port").unwrap();

    let mut identity = Identity::default();
    let mut parameters = NetworkParameters::default();
    let mut read_timeout = Duration::from_millis(250);
    if let Some(file_path) = matches.value_of("config") {
        if let Some(config) = read_config(file_path) {
            if let Some(manufacturer) = config.manufacturer {
                identity.manufacturer = manufacturer;
            }
            if let Some(model) = config.model {
                identity.model = model;
            }
            if let Some(software_build) = config.software_build {
                identity.software_build = software_build;
            }
            if let Some(channel) = config.channel {
                parameters.channel = channel;
            }
            if let Some(pan_identifier) = config.pan_identifier {
                parameters.pan_identifier = pan_identifier;
            }
            if let Some(poll_rate) = config.poll_rate {
                parameters.poll_rate = poll_rate;
            }
            if let Some(timeout) = config.read_timeout_ms {
                read_timeout = Duration::from_millis(timeout);
            }
        }
    }

    let mut settings: SerialPortSettings = Default::default();
    settings.baud_rate = 115_200;
    settings.timeout = read_timeout;

    let port = match serialport::open_with_settings(&port_name, &settings) {
        Ok(port) => port,
        Err(error) => {
            eprintln!("Failed to open \"{}\". Error: {}", port_name, error);
            ::std::process::exit(1);
        }
    };
    println!("{} Driving the ZNP on {}", timestamp(), port_name);

    let mut znp = Znp::new(port);
    let mut dispatcher = Dispatcher::new(identity, unix_seconds());

    if !matches.is_present("skip-setup") {
        let mut procedure = JoinProcedure::new();
        pause("Reset or power-up the ZNP, then hit return. Waiting for the reset indication.");
        if let Err(error) = procedure.prepare(&mut znp, &parameters, &dispatcher.registrations()) {
            eprintln!("Device setup failed: {:?}", error);
            ::std::process::exit(1);
        }
        pause("Make sure the coordinator is accepting joins, then hit return.");
        if let Err(error) = procedure.join(&mut znp) {
            eprintln!("Network join failed: {:?}", error);
            ::std::process::exit(1);
        }
        println!("{} Joined the coordinator's network", timestamp());
    }

    if let Err(error) = dispatcher.run(&mut znp) {
        eprintln!("Dispatch failed: {:?}", error);
        ::std::process::exit(1);
    }
}
