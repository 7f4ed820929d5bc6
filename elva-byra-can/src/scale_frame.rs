//! Parsing of the text line the scale sends over serial. A weight report looks like
//! `G` followed by padding, with the tens & units digits of the weight at offsets 9 and 10.
//! The bytes come straight from a read call and are never NUL-terminated, so every access is
//! bounds-checked.

use std::fmt::Display;

/// Largest frame accepted from a single read.
pub const MAX_FRAME_LEN: usize = 64;

/// Tag that marks a weight report line.
pub const WEIGHT_TAG: u8 = b'G';

const TENS_OFFSET: usize = 9;
const UNITS_OFFSET: usize = 10;

/// Shortest frame that still carries both digits.
pub const MIN_FRAME_LEN: usize = UNITS_OFFSET + 1;

#[derive(Debug, PartialEq, Eq)]
pub enum FrameError {
    /// First byte is not the weight tag (or nothing was read).
    NotAWeightReport { first: Option<u8> },

    /// Tagged correctly, but too short to hold the weight digits.
    TooShort { len: usize },

    /// A byte where a decimal digit was expected.
    NotADigit { offset: usize, byte: u8 },
}

impl std::error::Error for FrameError {}

impl Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::NotAWeightReport { first: Some(b) } => {
                write!(f, "not a weight report, first byte=0x{b:02X}")
            }
            FrameError::NotAWeightReport { first: None } => write!(f, "empty frame"),
            FrameError::TooShort { len } => {
                write!(f, "frame too short: {len} bytes, need {MIN_FRAME_LEN}")
            }
            FrameError::NotADigit { offset, byte } => {
                write!(f, "expected digit at offset {offset}, got 0x{byte:02X}")
            }
        }
    }
}

/// A frame that passed tag & length validation.
#[derive(Debug)]
pub struct ScaleFrame<'a> {
    bytes: &'a [u8],
}

impl<'a> ScaleFrame<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FrameError> {
        match bytes.first() {
            Some(&WEIGHT_TAG) => {}
            first => return Err(FrameError::NotAWeightReport { first: first.copied() }),
        }

        if bytes.len() < MIN_FRAME_LEN {
            return Err(FrameError::TooShort { len: bytes.len() });
        }

        Ok(Self { bytes })
    }

    /// Weight in the scale's unit, `10 * tens + units`.
    pub fn weight(&self) -> Result<u8, FrameError> {
        let tens = self.digit(TENS_OFFSET)?;
        let units = self.digit(UNITS_OFFSET)?;

        Ok(10 * tens + units)
    }

    fn digit(&self, offset: usize) -> Result<u8, FrameError> {
        // parse() guarantees both offsets exist
        let byte = self.bytes[offset];

        match byte {
            b'0'..=b'9' => Ok(byte - b'0'),
            _ => Err(FrameError::NotADigit { offset, byte }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_two_digit_weight() {
        let frame = ScaleFrame::parse(b"G........42").unwrap();

        assert_eq!(frame.weight(), Ok(42));
    }

    #[test]
    fn ignores_trailing_bytes() {
        let frame = ScaleFrame::parse(b"G  +     07 kg\r\n").unwrap();

        assert_eq!(frame.weight(), Ok(7));
    }

    #[test]
    fn weight_matches_formula_for_every_digit_pair() {
        for tens in b'0'..=b'9' {
            for units in b'0'..=b'9' {
                let mut raw = *b"G........00";
                raw[9] = tens;
                raw[10] = units;

                let expected = 10 * (tens - b'0') + (units - b'0');
                assert_eq!(ScaleFrame::parse(&raw).unwrap().weight(), Ok(expected));
            }
        }
    }

    #[test]
    fn rejects_untagged_frame() {
        assert_eq!(
            ScaleFrame::parse(b"XAAAAAAAAAA").unwrap_err(),
            FrameError::NotAWeightReport { first: Some(b'X') }
        );
    }

    #[test]
    fn rejects_empty_frame() {
        assert_eq!(
            ScaleFrame::parse(b"").unwrap_err(),
            FrameError::NotAWeightReport { first: None }
        );
    }

    #[test]
    fn rejects_short_frame() {
        assert_eq!(
            ScaleFrame::parse(b"G12345").unwrap_err(),
            FrameError::TooShort { len: 6 }
        );
    }

    #[test]
    fn rejects_non_digit_weight() {
        let frame = ScaleFrame::parse(b"G........4?").unwrap();

        assert_eq!(
            frame.weight(),
            Err(FrameError::NotADigit {
                offset: 10,
                byte: b'?'
            })
        );
    }
}
