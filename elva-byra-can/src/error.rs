//! Errors that prevent the bridge from starting at all. Anything raised here is fatal, the
//! process can't do its job without both the serial line and the CAN socket.

use std::{fmt::Display, io};

#[derive(Debug)]
pub enum InitError {
    /// The serial device is missing or we lack permission to open it.
    DeviceOpen { path: String, source: io::Error },

    /// Line attributes could not be applied to the opened serial device.
    Config { path: String, reason: String },

    /// The interface is unknown, or a raw CAN socket could not be created & bound to it.
    Can { interface: String, source: io::Error },
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::DeviceOpen { source, .. } | InitError::Can { source, .. } => Some(source),
            InitError::Config { .. } => None,
        }
    }
}

impl Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitError::DeviceOpen { path, source } => {
                write!(f, "failed to open serial device {path}: {source}")
            }
            InitError::Config { path, reason } => {
                write!(f, "failed to configure serial device {path}: {reason}")
            }
            InitError::Can { interface, source } => {
                write!(f, "failed to open CAN socket on {interface}: {source}")
            }
        }
    }
}
