use clap::Parser;
use elva_byra_can_lib::serial_channel::SerialConfig;
use elva_byra_can_lib::service::RetryPolicy;
use std::time::Duration;

#[derive(serde::Deserialize, Debug, Clone)]
pub struct ServiceConfig {
    /// Serial device the scale is attached to, see `ls /dev/serial/by-id/`.
    pub device_path: String,

    /// CAN interface the frames are sent on (can0).
    pub can_interface: String,

    /// Gives up on a serial read after this many seconds, waits (practically) forever if unset.
    pub read_timeout_secs: Option<u64>,

    /// Seconds between two transfers in watch mode.
    pub backoff: u64,

    /// Retry limit, watch mode exits after this many failed transfers in a row.
    pub retry: u8,

    /// Every completed transfer is appended to this file as a JSON line, nothing is written if
    /// this setting is unset.
    pub output_file: Option<String>,
}

impl ServiceConfig {
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig::new(&self.device_path)
            .with_read_timeout(self.read_timeout_secs.map(Duration::from_secs))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::from_secs(self.backoff),
            retry: self.retry,
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Target configuration file, tries to read `~/.config/byra/can.toml` by default
    #[arg(short, long)]
    pub settings_path: Option<String>,

    /// Serial device, overrides `device_path` from the settings file
    #[arg(short, long)]
    pub device: Option<String>,

    /// CAN interface, overrides `can_interface` from the settings file
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Keep transferring readings instead of exiting after the first one
    #[arg(short, long, default_value_t = false)]
    pub watch: bool,

    /// Toggles verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
