//! Data frame decoding.
//!
//! Data frame layout:
//!
//! ```text
//!  0     kind (0x51 live, 0x59 historical)
//!  1     year - 2000
//!  2     month
//!  3     day
//!  4     hour
//!  5     minute
//!  6..8  unused
//!  8..10 current, little endian, in units of 0.07A
//!  10    sum of bytes 0..10, mod 256
//! ```
//!
//! The date fields are not range checked.

use core::fmt;

use crate::{DecodeError, RawFrame};

/// Scale of the raw current sample.
pub const AMPS_PER_COUNT: f64 = 0.07;

const KIND_LIVE: u8 = 0x51;
const KIND_HISTORICAL: u8 = 0x59;

/// Which class of data frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Live,
    Historical,
}

impl FrameKind {
    pub fn from_id(id: u8) -> Option<FrameKind> {
        match id {
            KIND_LIVE => Some(FrameKind::Live),
            KIND_HISTORICAL => Some(FrameKind::Historical),
            _ => None,
        }
    }
}

/// A single decoded data frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    /// The current sample as sent.
    pub raw_current: u16,
    pub amperes: f64,
    pub is_live: bool,
    pub raw: RawFrame,
}

impl Reading {
    /// Decode a data frame.
    ///
    /// A checksum failure still decodes the frame, and the reading is returned inside of the
    /// error, so the caller can decide whether to trust it.
    pub fn decode(frame: &RawFrame) -> Result<Reading, DecodeError> {
        let b = frame.bytes();

        let kind = FrameKind::from_id(b[0]).ok_or(DecodeError::UnknownFrameKind(b[0]))?;

        let raw_current = u16::from_le_bytes([b[8], b[9]]);
        let reading = Reading {
            year: b[1] as u16 + 2000,
            month: b[2],
            day: b[3],
            hour: b[4],
            minute: b[5],
            raw_current,
            amperes: raw_current as f64 * AMPS_PER_COUNT,
            is_live: kind == FrameKind::Live,
            raw: *frame,
        };

        let expected = frame.checksum();
        let found = frame.sent_checksum();
        if expected != found {
            return Err(DecodeError::ChecksumMismatch {
                expected,
                found,
                reading,
            });
        }

        Ok(reading)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02} {:.2}A {} - {}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.amperes,
            if self.is_live { "live" } else { "db" },
            self.raw,
        )
    }
}
