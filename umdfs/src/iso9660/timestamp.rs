use std::fmt;

use crate::error::DecodeError;
use crate::io_util::{read_bytes, read_i8, read_slice};


/// The 17-byte date and time of the volume descriptor (ISO9660 § 8.4.26.1): sixteen ASCII digits and a
/// signed time zone byte.
///
/// "Not specified" is written as all `'0'` digits with offset 0. Some mastering tools write NUL bytes
/// instead of digits; they are kept and rendered verbatim.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DigitTimestamp {
    pub year: [u8; 4],
    pub month: [u8; 2],
    pub day: [u8; 2],

    pub hour: [u8; 2],
    pub minute: [u8; 2],
    pub second: [u8; 2],

    /// Hundredths of a second.
    pub centisecond: [u8; 2],

    /// Time zone in quarter hours east of GMT.
    pub gmt_offset_15min: i8,
}
impl DigitTimestamp {
    pub const SIZE: usize = 17;

    pub fn decode(buf: &[u8], offset: usize) -> Result<Self, DecodeError> {
        let raw = read_slice(buf, offset, Self::SIZE)?;
        if let Some(bad_index) = raw[..16].iter().position(|b| !b.is_ascii()) {
            return Err(DecodeError::MalformedTimestamp { offset: offset + bad_index });
        }

        Ok(Self {
            year: read_bytes(raw, 0)?,
            month: read_bytes(raw, 4)?,
            day: read_bytes(raw, 6)?,
            hour: read_bytes(raw, 8)?,
            minute: read_bytes(raw, 10)?,
            second: read_bytes(raw, 12)?,
            centisecond: read_bytes(raw, 14)?,
            gmt_offset_15min: read_i8(raw, 16)?,
        })
    }

    /// Whether this is the "not specified" value.
    pub fn is_unset(&self) -> bool {
        let digits = self.year.iter()
            .chain(&self.month)
            .chain(&self.day)
            .chain(&self.hour)
            .chain(&self.minute)
            .chain(&self.second)
            .chain(&self.centisecond);
        self.gmt_offset_15min == 0 && digits.into_iter().all(|&b| b == b'0' || b == 0x00)
    }
}
impl fmt::Display for DigitTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_digits(f: &mut fmt::Formatter<'_>, digits: &[u8]) -> fmt::Result {
            for &b in digits {
                write!(f, "{}", char::from(b))?;
            }
            Ok(())
        }

        write_digits(f, &self.year)?;
        write!(f, "-")?;
        write_digits(f, &self.month)?;
        write!(f, "-")?;
        write_digits(f, &self.day)?;
        write!(f, " ")?;
        write_digits(f, &self.hour)?;
        write!(f, ":")?;
        write_digits(f, &self.minute)?;
        write!(f, ":")?;
        write_digits(f, &self.second)?;
        write!(f, ".")?;
        write_digits(f, &self.centisecond)?;
        write!(f, " ({})", self.gmt_offset_15min)
    }
}
#[cfg(feature = "serde")]
impl serde::Serialize for DigitTimestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}


/// The 7-byte recording date and time of a directory record (ISO9660 § 9.1.5).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BinaryTimestamp {
    /// 106 is 2006.
    pub year_since_1900: u8,

    pub month: u8,
    pub day: u8,

    pub hour: u8,
    pub minute: u8,
    pub second: u8,

    /// Time zone in quarter hours east of GMT.
    pub gmt_offset_15min: i8,
}
impl BinaryTimestamp {
    pub const SIZE: usize = 7;

    pub fn from_bytes(bytes: [u8; 7]) -> Self {
        Self {
            year_since_1900: bytes[0],
            month: bytes[1],
            day: bytes[2],
            hour: bytes[3],
            minute: bytes[4],
            second: bytes[5],
            gmt_offset_15min: i8::from_ne_bytes([bytes[6]]),
        }
    }
}
impl fmt::Display for BinaryTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f, "{:04}-{:02}-{:02} {:02}:{:02}:{:02} ({})",
            1900 + u16::from(self.year_since_1900), self.month, self.day,
            self.hour, self.minute, self.second, self.gmt_offset_15min,
        )
    }
}
