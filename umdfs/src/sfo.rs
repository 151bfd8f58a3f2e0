//! Decoding of PSF files (usually named `PARAM.SFO`), the key-value metadata tables of PSP software.
//!
//! Layout:
//!
//! | offset | size          | content                               |
//! |--------|---------------|---------------------------------------|
//! | 0x00   | 4             | signature `\0PSF`                     |
//! | 0x04   | 1             | major version                         |
//! | 0x05   | 3             | minor version (24-bit little endian)  |
//! | 0x08   | 4             | key table offset                      |
//! | 0x0C   | 4             | data table offset                     |
//! | 0x10   | 4             | number of entries                     |
//! | 0x14   | 16 * entries  | index table                           |
//!
//! Keys are NUL-terminated strings in the key table. Their lengths are not stored; each key extends
//! up to the start of the next key (or the data table, for the last one).


use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use from_to_repr::from_to_other;
use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::io_util::{read_bytes, read_u16_le, read_u24_le, read_u32_le, read_u8};


/// The signature at the start of every SFO file.
pub const SFO_SIGNATURE: [u8; 4] = *b"\0PSF";

const HEADER_SIZE: usize = 0x14;
const INDEX_ENTRY_SIZE: usize = 0x10;


/// How the value of an entry is stored.
#[derive(Clone, Copy, Debug)]
#[from_to_other(base_type = u16, derive_compare = "as_int")]
pub enum SfoDataFormat {
    /// UTF-8 text without a terminating NUL byte.
    Utf8NoTerminator = 0x0004,

    /// NUL-terminated UTF-8 text.
    Utf8 = 0x0204,

    /// Unsigned 32-bit little-endian integer.
    Int32 = 0x0404,

    Other(u16),
}


/// An entry of the index table.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SfoIndexEntry {
    /// Offset of the key, relative to the key table.
    pub key_offset: u16,

    pub data_format: SfoDataFormat,

    /// The number of bytes used by the value.
    pub data_length: u32,

    /// The number of bytes reserved for the value.
    pub data_max_length: u32,

    /// Offset of the value, relative to the data table.
    pub data_offset: u32,
}
impl SfoIndexEntry {
    fn decode(buf: &[u8], offset: usize) -> Result<Self, DecodeError> {
        Ok(Self {
            key_offset: read_u16_le(buf, offset)?,
            data_format: SfoDataFormat::from_base_type(read_u16_le(buf, offset + 0x02)?),
            data_length: read_u32_le(buf, offset + 0x04)?,
            data_max_length: read_u32_le(buf, offset + 0x08)?,
            data_offset: read_u32_le(buf, offset + 0x0C)?,
        })
    }
}


#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum SfoValue {
    Text(String),
    Integer(u32),
}
impl fmt::Display for SfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => write!(f, "{}", t),
            Self::Integer(i) => write!(f, "{}", i),
        }
    }
}


/// The key-value pairs of an SFO file, in the order in which they are stored.
#[derive(Clone, Default)]
pub struct SfoFields {
    entries: Vec<(String, SfoValue)>,
    key_to_index: HashMap<String, usize>,
}
impl SfoFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&SfoValue> {
        self.key_to_index.get(key)
            .map(|&i| &self.entries[i].1)
    }

    /// Inserts a value, replacing the value of an existing key in place.
    ///
    /// Returns the replaced value, if any.
    pub fn insert(&mut self, key: String, value: SfoValue) -> Option<SfoValue> {
        if let Some(&i) = self.key_to_index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[i].1, value));
        }
        self.key_to_index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SfoValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
impl fmt::Debug for SfoFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter())
            .finish()
    }
}
// the index is derived from the entries
impl PartialEq for SfoFields {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}
impl Eq for SfoFields {}
impl Hash for SfoFields {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.hash(state);
    }
}
#[cfg(feature = "serde")]
impl serde::Serialize for SfoFields {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
#[cfg(feature = "serde")]
impl<'d> serde::Deserialize<'d> for SfoFields {
    fn deserialize<D: serde::Deserializer<'d>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;
        impl<'d> serde::de::Visitor<'d> for FieldsVisitor {
            type Value = SfoFields;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "a map of SFO keys to values")
            }

            fn visit_map<A: serde::de::MapAccess<'d>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                use serde::de::Error as _;

                let mut fields = SfoFields::new();
                while let Some((key, value)) = map.next_entry::<String, SfoValue>()? {
                    if fields.get(&key).is_some() {
                        return Err(A::Error::custom(format!("duplicate SFO key {:?}", key)));
                    }
                    fields.insert(key, value);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}


/// A decoded SFO file.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SfoDocument {
    pub major_version: u8,
    pub minor_version: u32,
    pub key_table_offset: u32,
    pub data_table_offset: u32,
    pub entry_count: u32,
    pub index: Vec<SfoIndexEntry>,
    pub fields: SfoFields,
}
impl SfoDocument {
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < SFO_SIGNATURE.len() {
            return Err(DecodeError::MalformedSfo { reason: "shorter than the signature" });
        }
        let signature: [u8; 4] = read_bytes(buf, 0)?;
        if signature != SFO_SIGNATURE {
            return Err(DecodeError::BadSignature { found: signature });
        }
        if buf.len() < HEADER_SIZE {
            return Err(DecodeError::MalformedSfo { reason: "header is truncated" });
        }

        let major_version = read_u8(buf, 0x04)?;
        let minor_version = read_u24_le(buf, 0x05)?;
        let key_table_offset = read_u32_le(buf, 0x08)?;
        let data_table_offset = read_u32_le(buf, 0x0C)?;
        let entry_count = read_u32_le(buf, 0x10)?;
        debug!(
            "SFO version {}.{}, {} entries, key table at {:#X}, data table at {:#X}",
            major_version, minor_version, entry_count, key_table_offset, data_table_offset,
        );

        let index_end = usize::try_from(entry_count).ok()
            .and_then(|count| count.checked_mul(INDEX_ENTRY_SIZE))
            .and_then(|size| size.checked_add(HEADER_SIZE));
        match index_end {
            Some(end) if end <= buf.len() => {},
            _ => return Err(DecodeError::MalformedSfo { reason: "index table exceeds the buffer" }),
        }

        let mut index = Vec::with_capacity(entry_count as usize);
        for i in 0..(entry_count as usize) {
            index.push(SfoIndexEntry::decode(buf, HEADER_SIZE + i * INDEX_ENTRY_SIZE)?);
        }

        let key_table_offset_usize = key_table_offset as usize;
        let data_table_offset_usize = data_table_offset as usize;
        let mut fields = SfoFields::new();
        for (i, entry) in index.iter().enumerate() {
            let key_start = key_table_offset_usize.checked_add(entry.key_offset.into());
            let key_end = match index.get(i + 1) {
                Some(next) => key_table_offset_usize.checked_add(next.key_offset.into()),
                None => Some(data_table_offset_usize),
            };
            let key_bytes = match (key_start, key_end) {
                (Some(start), Some(end)) if start <= end && end <= buf.len() => &buf[start..end],
                _ => return Err(DecodeError::MalformedSfo { reason: "key lies outside the buffer" }),
            };
            let key = decode_text(key_bytes, "key is not valid UTF-8")?;

            let value_start = data_table_offset_usize.checked_add(entry.data_offset as usize);
            let value_end = value_start.and_then(|s| s.checked_add(entry.data_length as usize));
            let value_bytes = match (value_start, value_end) {
                (Some(start), Some(end)) if end <= buf.len() => &buf[start..end],
                _ => return Err(DecodeError::MalformedSfo { reason: "value lies outside the buffer" }),
            };
            let value = match entry.data_format {
                SfoDataFormat::Int32 => {
                    let int_bytes: [u8; 4] = value_bytes.try_into()
                        .map_err(|_| DecodeError::MalformedSfo { reason: "integer value is not 4 bytes long" })?;
                    SfoValue::Integer(u32::from_le_bytes(int_bytes))
                },
                SfoDataFormat::Utf8|SfoDataFormat::Utf8NoTerminator => {
                    SfoValue::Text(decode_text(value_bytes, "text value is not valid UTF-8")?)
                },
                SfoDataFormat::Other(format) => {
                    return Err(DecodeError::UnknownSfoFormat { key_offset: entry.key_offset, format });
                },
            };

            debug!("SFO entry {:?} = {:?}", key, value);
            if let Some(previous) = fields.insert(key.clone(), value) {
                warn!("SFO key {:?} occurs more than once; replacing value {:?}", key, previous);
            }
        }

        Ok(Self {
            major_version,
            minor_version,
            key_table_offset,
            data_table_offset,
            entry_count,
            index,
            fields,
        })
    }

    /// The version in `major.minor` notation.
    pub fn version(&self) -> String {
        format!("{}.{}", self.major_version, self.minor_version)
    }
}


fn decode_text(bytes: &[u8], reason: &'static str) -> Result<String, DecodeError> {
    let end = bytes.iter()
        .rposition(|&b| b != 0x00)
        .map(|i| i + 1)
        .unwrap_or(0);
    std::str::from_utf8(&bytes[..end])
        .map(|s| s.to_owned())
        .map_err(|_| DecodeError::MalformedSfo { reason })
}
