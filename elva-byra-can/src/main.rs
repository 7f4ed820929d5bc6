//! The byra-can bridge reads a weight report from a serial-attached scale and republishes it on a
//! CAN bus, followed by an "unloaded" status frame for the factory side.
//!
//! ## Run
//! A single transfer, then exit. Exit code is 0 on success, 2 if the transfer failed & 1 if the
//! serial device or CAN interface couldn't be set up.
//!
//! ```bash
//! elva-byra-can # Reads settings from `~/.config/byra/can.toml` if present.
//!
//! elva-byra-can --device /dev/ttyUSB0 --interface can0
//!
//! elva-byra-can --help
//! ```
//!
//! ## Watch
//! Long lived process, keeps transferring readings until `retry` transfers in a row have failed.
//!
//! ```bash
//! elva-byra-can --watch
//! ```
//!
//! ## Example config
//! ```toml
//! # ~/.config/byra/can.toml
//! device_path = "/dev/serial/by-id/usb-FTDI_USB__-__Serial-if00-port0"
//! can_interface = "can0"
//! backoff = 3
//! retry = 3
//! output_file = "/var/log/byra/transfers.jsonl"
//!```

use clap::Parser;
use cli_config::ServiceConfig;
use elva_byra_can_lib::bridge::{Transfer, WeightBridge};
use elva_byra_can_lib::can_channel::CanChannel;
use elva_byra_can_lib::error::InitError;
use elva_byra_can_lib::output_writer::write_transfer;
use elva_byra_can_lib::serial_channel::SerialChannel;
use elva_byra_can_lib::service::{self, ServiceError};
use log::{error, info, warn};
use simple_logger::SimpleLogger;
use std::error::Error;
use std::fs::OpenOptions;
use std::process::ExitCode;

mod cli_config;
mod init;

use crate::cli_config::Args;
use crate::init::load_settings;

const EXIT_FATAL: u8 = 1;
const EXIT_TRANSFER_FAILED: u8 = 2;

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = SimpleLogger::new()
        .with_level(match args.verbose {
            true => log::LevelFilter::Debug,
            false => log::LevelFilter::Warn,
        })
        .init()
    {
        eprintln!("Failed to set up logging {:?}", e);
    }

    let settings = match load_settings(&args) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    info!(
        "Starting byra-can, device={} interface={}",
        settings.device_path, settings.can_interface
    );

    match args.watch {
        true => watch(&settings),
        false => transfer_once(&settings),
    }
}

fn transfer_once(settings: &ServiceConfig) -> ExitCode {
    let serial = match SerialChannel::open(&settings.serial_config()) {
        Ok(s) => s,
        Err(e) => return fatal(e),
    };
    let can = match CanChannel::open(&settings.can_interface) {
        Ok(c) => c,
        Err(e) => return fatal(e),
    };
    let mut bridge = WeightBridge::new(can);

    match bridge.read_and_forward(serial) {
        Ok(transfer) => {
            record(settings, &transfer);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Weight transfer failed: {}", e);
            ExitCode::from(EXIT_TRANSFER_FAILED)
        }
    }
}

fn watch(settings: &ServiceConfig) -> ExitCode {
    let can = match CanChannel::open(&settings.can_interface) {
        Ok(c) => c,
        Err(e) => return fatal(e),
    };
    let mut bridge = WeightBridge::new(can);
    let serial_config = settings.serial_config();

    match service::run(
        &mut bridge,
        &settings.retry_policy(),
        || SerialChannel::open(&serial_config),
        |transfer| record(settings, transfer),
    ) {
        ServiceError::Open(e) => fatal(e),
        e @ ServiceError::RetryLimit { .. } => {
            error!("{}", e);
            ExitCode::from(EXIT_TRANSFER_FAILED)
        }
    }
}

fn fatal(e: InitError) -> ExitCode {
    error!("{}", e);
    ExitCode::from(EXIT_FATAL)
}

/// Appends the transfer to `output_file`, if one is configured. Failing to do so doesn't undo
/// the transfer, so it's only logged.
fn record(settings: &ServiceConfig, transfer: &Transfer) {
    let Some(path) = settings.output_file.as_deref() else {
        return;
    };

    if let Err(e) = append_transfer(path, transfer) {
        warn!("Failed to record transfer to {} {:?}", path, e);
    }
}

fn append_transfer(path: &str, transfer: &Transfer) -> Result<(), Box<dyn Error>> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    write_transfer(transfer, &mut file)
}
