//! Records completed transfers as JSON lines, one per transfer, on any [Write] (typically an
//! append-mode file).

use chrono::{DateTime, Utc};
use std::error::Error;
use std::io::Write;

use crate::bridge::Transfer;

/// Appends a record of the given transfer to `writer`, stamped with the current time.
pub fn write_transfer(transfer: &Transfer, writer: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let sample = Sample {
        datetime: Utc::now(),
        weight: transfer.weight,
        status_delivered: transfer.status_delivered,
    };

    writeln!(writer, "{}", serde_json::to_string(&sample)?)?;
    writer.flush()?;

    Ok(())
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct Sample {
    /// Time the transfer completed
    pub datetime: DateTime<Utc>,

    /// Weight put on the bus
    pub weight: u8,

    /// Whether the unloaded status frame made it out as well
    pub status_delivered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_json_line_per_transfer() {
        let mut out = Vec::new();

        write_transfer(
            &Transfer {
                weight: 42,
                status_delivered: true,
            },
            &mut out,
        )
        .unwrap();
        write_transfer(
            &Transfer {
                weight: 7,
                status_delivered: false,
            },
            &mut out,
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Sample> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].weight, 42);
        assert!(lines[0].status_delivered);
        assert_eq!(lines[1].weight, 7);
        assert!(!lines[1].status_delivered);
    }
}
