//! The read, parse & transmit cycle. Each call to [WeightBridge::read_and_forward] makes exactly one
//! transfer attempt: it reads a single frame from the scale, and if it carries a weight, sends the
//! weight frame followed by the unloaded status frame.

use log::{debug, info, warn};
use std::{fmt::Display, io};

use crate::can_channel::{CanMessage, CanSendError, CanSender};
use crate::scale_frame::{FrameError, ScaleFrame, MAX_FRAME_LEN};
use crate::serial_channel::FrameSource;

/// Outcome of a completed transfer. The two sends aren't transactional: the weight frame is on
/// the bus, the status frame may not be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub weight: u8,
    pub status_delivered: bool,
}

/// Reasons a single transfer attempt was abandoned. None of these are fatal to the process.
#[derive(Debug)]
pub enum CycleError {
    Read(io::Error),
    FormatMismatch(FrameError),
    ShortFrame(FrameError),
    Parse(FrameError),
    Send(CanSendError),
}

impl From<FrameError> for CycleError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::NotAWeightReport { .. } => CycleError::FormatMismatch(e),
            FrameError::TooShort { .. } => CycleError::ShortFrame(e),
            FrameError::NotADigit { .. } => CycleError::Parse(e),
        }
    }
}

impl std::error::Error for CycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CycleError::Read(e) => Some(e),
            CycleError::FormatMismatch(e) | CycleError::ShortFrame(e) | CycleError::Parse(e) => {
                Some(e)
            }
            CycleError::Send(e) => Some(e),
        }
    }
}

impl Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleError::Read(e) => write!(f, "serial read failed: {e}"),
            CycleError::FormatMismatch(e) => write!(f, "unexpected scale frame: {e}"),
            CycleError::ShortFrame(e) => write!(f, "incomplete scale frame: {e}"),
            CycleError::Parse(e) => write!(f, "unreadable weight: {e}"),
            CycleError::Send(e) => write!(f, "weight not delivered: {e}"),
        }
    }
}

pub struct WeightBridge<C: CanSender> {
    can: C,
}

impl<C: CanSender> WeightBridge<C> {
    pub fn new(can: C) -> Self {
        Self { can }
    }

    /// Runs one transfer. `serial` is consumed and closed before this returns, whatever the
    /// outcome.
    pub fn read_and_forward<S: FrameSource>(
        &mut self,
        mut serial: S,
    ) -> Result<Transfer, CycleError> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = serial.read_frame(&mut buf).map_err(CycleError::Read)?;
        let raw = &buf[..n.min(MAX_FRAME_LEN)];

        debug!("scale frame n={} raw={:?}", raw.len(), String::from_utf8_lossy(raw));

        let weight = ScaleFrame::parse(raw)?.weight()?;

        info!("weight={}", weight);

        let weight_frame = CanMessage::weight(weight);
        self.can.send(&weight_frame).map_err(CycleError::Send)?;
        info!("Sent weight frame {}", weight_frame);

        let status_frame = CanMessage::unloaded_status();
        let status_delivered = match self.can.send(&status_frame) {
            Ok(_) => {
                info!("Sent unloaded status frame {}", status_frame);
                true
            }
            Err(e) => {
                warn!("Unloaded status frame not delivered: {}", e);
                false
            }
        };

        drop(serial);

        Ok(Transfer {
            weight,
            status_delivered,
        })
    }

    pub fn can(&self) -> &C {
        &self.can
    }

    pub fn into_inner(self) -> C {
        self.can
    }
}
