//! Owns the CAN socket and the two frame shapes the bridge puts on the bus.
//!
//! Requires the interface to be up first:
//!   sudo ip link set can0 up type can bitrate 500000

use log::{debug, info};
use socketcan::{CanDataFrame, CanSocket, EmbeddedFrame, Socket, StandardId};
use std::{fmt::Display, io};

use crate::error::InitError;

/// Frame carrying the weight in `data[0]`.
pub const WEIGHT_FRAME_ID: u16 = 0x031;

/// Factory-side identifier that receives the status frame.
pub const CAN_ID_FACTORY: u16 = 0x034;

/// Status code meaning the scale has been unloaded.
pub const UNLOADED_STATUS: u8 = 0x82;

/// Data bytes in a classic CAN frame.
pub const CLASSIC_DATA_LEN: usize = 8;

/// A classic, standard-id CAN frame. Bytes past `len` are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanMessage {
    id: u16,
    len: u8,
    data: [u8; CLASSIC_DATA_LEN],
}

impl CanMessage {
    pub fn weight(weight: u8) -> Self {
        Self {
            id: WEIGHT_FRAME_ID,
            len: 1,
            data: [weight, 0, 0, 0, 0, 0, 0, 0],
        }
    }

    /// Status frame for the factory, status code in `data[2]`, leading bytes zeroed.
    pub fn unloaded_status() -> Self {
        Self {
            id: CAN_ID_FACTORY,
            len: 3,
            data: [0, 0, UNLOADED_STATUS, 0, 0, 0, 0, 0],
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    /// Count of valid data bytes.
    pub fn dlc(&self) -> usize {
        self.len as usize
    }

    /// The valid data bytes.
    pub fn data(&self) -> &[u8] {
        &self.data[..self.dlc()]
    }

    /// The whole 8-byte buffer, including padding.
    pub fn raw_data(&self) -> &[u8; CLASSIC_DATA_LEN] {
        &self.data
    }
}

impl Display for CanMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:03X} [{}]", self.id, self.len)?;

        for b in self.data() {
            write!(f, " {b:02X}")?;
        }

        Ok(())
    }
}

/// A frame the bus did not accept in full.
#[derive(Debug)]
pub struct CanSendError {
    id: u16,
    source: io::Error,
}

impl CanSendError {
    pub fn new(id: u16, source: io::Error) -> Self {
        Self { id, source }
    }

    pub fn id(&self) -> u16 {
        self.id
    }
}

impl std::error::Error for CanSendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl Display for CanSendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to send CAN frame 0x{:03X}: {}", self.id, self.source)
    }
}

/// Anything the bridge can push a frame onto.
pub trait CanSender {
    fn send(&mut self, frame: &CanMessage) -> Result<(), CanSendError>;
}

/// Raw SocketCAN socket bound to a single interface. Closed on drop.
pub struct CanChannel {
    socket: CanSocket,
    interface: String,
}

impl CanChannel {
    /// Resolves `interface` to its kernel index & opens a raw socket bound to it.
    pub fn open(interface: &str) -> Result<Self, InitError> {
        let socket = CanSocket::open(interface).map_err(|source| InitError::Can {
            interface: interface.to_string(),
            source,
        })?;

        info!("CAN socket bound to {}", interface);

        Ok(Self {
            socket,
            interface: interface.to_string(),
        })
    }
}

/// Builds the frame that is actually written, carrying only the valid data bytes.
fn to_frame(frame: &CanMessage) -> Result<CanDataFrame, CanSendError> {
    let invalid = || {
        CanSendError::new(
            frame.id(),
            io::Error::new(io::ErrorKind::InvalidInput, "invalid classic frame"),
        )
    };
    let id = StandardId::new(frame.id()).ok_or_else(invalid)?;

    CanDataFrame::new(id, frame.data()).ok_or_else(invalid)
}

impl CanSender for CanChannel {
    fn send(&mut self, frame: &CanMessage) -> Result<(), CanSendError> {
        let out = to_frame(frame)?;

        self.socket
            .write_frame(&out)
            .map_err(|e| CanSendError::new(frame.id(), e))?;

        debug!("{} <- {}", self.interface, frame);

        Ok(())
    }
}

impl Drop for CanChannel {
    fn drop(&mut self) {
        debug!("Closing CAN socket on {}", self.interface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socketcan::Frame;

    #[test]
    fn weight_frame_layout() {
        let frame = CanMessage::weight(42);

        assert_eq!(frame.id(), 0x031);
        assert_eq!(frame.data(), &[42]);
        assert_eq!(frame.raw_data(), &[42, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn status_frame_has_zeroed_leading_bytes() {
        let frame = CanMessage::unloaded_status();

        assert_eq!(frame.id(), 0x034);
        assert_eq!(frame.dlc(), 3);
        assert_eq!(frame.data(), &[0, 0, 0x82]);
    }

    #[test]
    fn weight_goes_out_as_one_byte_frame() {
        let out = to_frame(&CanMessage::weight(42)).unwrap();

        assert_eq!(Frame::raw_id(&out), 0x031);
        assert!(!EmbeddedFrame::is_extended(&out));
        assert_eq!(EmbeddedFrame::dlc(&out), 1);
        assert_eq!(EmbeddedFrame::data(&out), &[42]);
    }

    #[test]
    fn status_goes_out_as_three_byte_frame() {
        let out = to_frame(&CanMessage::unloaded_status()).unwrap();

        assert_eq!(Frame::raw_id(&out), 0x034);
        assert!(!EmbeddedFrame::is_extended(&out));
        assert_eq!(EmbeddedFrame::dlc(&out), 3);
        assert_eq!(EmbeddedFrame::data(&out), &[0, 0, UNLOADED_STATUS]);
    }

    #[test]
    fn display_shows_id_and_valid_bytes() {
        assert_eq!(CanMessage::unloaded_status().to_string(), "0x034 [3] 00 00 82");
    }

    #[test]
    fn opening_unknown_interface_fails() {
        let err = CanChannel::open("elva-byra-none").err().unwrap();

        assert!(matches!(
            err,
            InitError::Can { ref interface, .. } if interface == "elva-byra-none"
        ));
    }
}
