//! Owns the serial line to the scale. The line is configured once on open (9600 8N1, no flow
//! control) and then read one frame at a time.
//!
//! The port runs in raw, non-canonical mode: `serialport` applies `cfmakeraw` when opening the
//! device, so echo, signal characters, line buffering & output processing are all off and a read
//! returns whatever bytes the OS has delivered.

use log::debug;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::{
    io::{self, Read},
    time::Duration,
};

use crate::error::InitError;

/// The scale only talks 9600 baud.
pub const BAUD_RATE: u32 = 9600;

/// Stand-in for "block forever", `serialport` always polls with a timeout.
pub const BLOCKING_READ_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24);

/// Anything the bridge can pull a scale frame from.
pub trait FrameSource {
    /// One blocking read, returns how many bytes landed in `buf`.
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Line settings for the scale, immutable once applied.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    device_path: String,
    read_timeout: Duration,
}

impl SerialConfig {
    pub fn new(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
            read_timeout: BLOCKING_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout.unwrap_or(BLOCKING_READ_TIMEOUT);
        self
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    fn builder(&self) -> serialport::SerialPortBuilder {
        serialport::new(&self.device_path, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.read_timeout)
    }
}

pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialChannel {
    /// Opens & configures the device, then drops anything already sitting in the input buffer.
    pub fn open(config: &SerialConfig) -> Result<Self, InitError> {
        let path = config.device_path().to_string();

        debug!("Opening serial device {}", path);

        let port = config
            .builder()
            .open()
            .map_err(|e| open_error(&path, e))?;
        let mut channel = Self { port, path };

        channel.flush_input()?;

        Ok(channel)
    }

    /// Discards buffered, unread input so the first frame isn't stale.
    pub fn flush_input(&mut self) -> Result<(), InitError> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| InitError::Config {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }
}

impl FrameSource for SerialChannel {
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        debug!("Closing serial device {}", self.path);
    }
}

/// Missing device & permission problems are open failures, anything else the port rejected
/// happened while applying line attributes.
fn open_error(path: &str, e: serialport::Error) -> InitError {
    let path = path.to_string();

    match e.kind() {
        serialport::ErrorKind::NoDevice => InitError::DeviceOpen {
            path,
            source: io::Error::new(io::ErrorKind::NotFound, e.description),
        },
        serialport::ErrorKind::Io(kind)
            if matches!(
                kind,
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
            ) =>
        {
            InitError::DeviceOpen {
                path,
                source: io::Error::new(kind, e.description),
            }
        }
        _ => InitError::Config {
            path,
            reason: e.to_string(),
        },
    }
}
