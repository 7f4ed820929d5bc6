use std::{env, error::Error};

use config::Config;
use log::debug;

use crate::cli_config::{Args, ServiceConfig};

pub const DEFAULT_DEVICE_PATH: &str = "/dev/serial/by-id/usb-FTDI_USB__-__Serial-if00-port0";
pub const DEFAULT_CAN_INTERFACE: &str = "can0";

/// Reads settings from given config path or `~/.config/byra/can.toml` if it exists, then applies
/// device & interface overrides from the command line. Only an explicitly given settings file
/// has to exist.
pub fn load_settings(args: &Args) -> Result<ServiceConfig, Box<dyn Error>> {
    let (settings_file, required) = match args.settings_path.clone() {
        Some(file_path) => (Some(file_path), true),
        None => (
            env::var("HOME")
                .ok()
                .map(|home| format!("{home}/.config/byra/can.toml")),
            false,
        ),
    };

    let mut builder = Config::builder()
        .set_default("device_path", DEFAULT_DEVICE_PATH)?
        .set_default("can_interface", DEFAULT_CAN_INTERFACE)?
        .set_default("backoff", 3_i64)?
        .set_default("retry", 3_i64)?;

    if let Some(settings) = settings_file {
        debug!("Trying to read settings from {}", settings);
        builder = builder.add_source(config::File::with_name(&settings).required(required));
    }

    let settings = builder
        .set_override_option("device_path", args.device.clone())?
        .set_override_option("can_interface", args.interface.clone())?
        .build()?
        .try_deserialize::<ServiceConfig>()?;

    Ok(settings)
}
