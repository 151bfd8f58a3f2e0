use bitflags::bitflags;

use crate::error::DecodeError;
use crate::io_util::{read_bytes, read_u8, ReadEndian};
use crate::iso9660::{BinaryTimestamp, EndianPair};


bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize))]
    pub struct FileFlags : u8 {
        /// Hidden entry.
        const EXISTENCE = 0x01;

        /// The record describes a directory; its extent holds further records.
        const DIRECTORY = 0x02;

        /// Associated file (metadata belonging to the file of the same name).
        const ASSOCIATED_FILE = 0x04;

        /// Record format is specified in the extended attribute record.
        const RECORD = 0x08;

        /// Permissions are specified in the extended attribute record.
        const PROTECTION = 0x10;

        /// The file continues in the extent named by the next record.
        const MULTI_EXTENT = 0x80;
    }
}


/// A directory record (ISO9660 § 9.1), one of the variable-length entries making up a directory's
/// extent.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DirectoryRecord {
    /// Size of the whole record in bytes, including padding and system use area.
    pub length: u8,

    pub extended_attribute_record_length: u8,

    /// First logical block of the data.
    pub extent_location: EndianPair<u32>, // u32 LE + u32 BE

    /// Size of the data in bytes.
    pub data_length: EndianPair<u32>, // u32 LE + u32 BE

    pub recording_timestamp: BinaryTimestamp, // 7 bytes

    pub file_flags: FileFlags,

    /// Both interleave fields are zero on UMDs.
    pub interleave_unit_size: u8,
    pub interleave_gap_size: u8,

    pub volume_sequence_number: EndianPair<u16>,

    /// The file identifier as ASCII.
    ///
    /// Directories begin with two pseudo-entries whose identifier is a single byte: 0x00 for the
    /// directory itself and 0x01 for its parent. Both are kept verbatim here (as U+0000 and
    /// U+0001) so that [`is_pseudo_entry`](Self::is_pseudo_entry) can recognize them.
    pub name: String,

    /// Whatever follows the identifier and its padding byte; on UMDs this is usually the CD-ROM XA
    /// extension.
    pub system_use: Vec<u8>,
}
impl DirectoryRecord {
    /// The size of the fixed part preceding the file identifier.
    pub const HEADER_SIZE: usize = 33;

    /// The size of the record embedded into the primary volume descriptor.
    pub const ROOT_RECORD_SIZE: usize = 34;

    /// The smallest valid value of `length` for a file identifier of `name_length` bytes.
    pub fn minimum_length(name_length: usize) -> usize {
        let padding = if name_length % 2 == 0 { 1 } else { 0 };
        Self::HEADER_SIZE + name_length + padding
    }

    /// Decodes the directory record starting at `offset` within `sector`.
    ///
    /// Returns `Ok(None)` if the length byte is zero, which marks the padding at the end of a
    /// sector. The record must lie entirely within `sector`; `sector_number` is only used for error
    /// reporting.
    pub fn decode(sector: &[u8], offset: usize, sector_number: u64) -> Result<Option<Self>, DecodeError> {
        let malformed = |reason| DecodeError::MalformedDirectoryEntry {
            sector: sector_number,
            offset,
            reason,
        };

        let length = read_u8(sector, offset)?;
        if length == 0 {
            return Ok(None);
        }
        let record_end = offset + usize::from(length);
        if offset + Self::HEADER_SIZE > sector.len() {
            return Err(malformed("fixed header crosses the sector boundary"));
        }
        if record_end > sector.len() {
            return Err(malformed("record length crosses the sector boundary"));
        }

        let record = &sector[offset..record_end];
        let name_length = usize::from(record.get(32).copied().unwrap_or(0));
        if Self::HEADER_SIZE + name_length > sector.len() - offset {
            return Err(malformed("file identifier crosses the sector boundary"));
        }
        if usize::from(length) < Self::minimum_length(name_length) {
            return Err(malformed("record length too small for file identifier"));
        }

        let mut pos = 1;
        let extended_attribute_record_length = read_u8(record, pos)?;
        pos += 1;
        let extent_location = EndianPair::read(record, &mut pos)?;
        let data_length = EndianPair::read(record, &mut pos)?;
        let recording_timestamp = BinaryTimestamp::from_bytes(read_bytes(record, pos)?);
        pos += BinaryTimestamp::SIZE;
        let file_flags = FileFlags::from_bits_retain(read_u8(record, pos)?);
        let interleave_unit_size = read_u8(record, pos + 1)?;
        let interleave_gap_size = read_u8(record, pos + 2)?;
        pos += 3;
        let volume_sequence_number = EndianPair::read(record, &mut pos)?;
        pos += 1; // file identifier length

        let name_bytes = &record[pos..pos + name_length];
        if !name_bytes.is_ascii() {
            return Err(malformed("file identifier is not ASCII"));
        }
        let name: String = name_bytes.iter().map(|&b| char::from(b)).collect();
        pos = Self::minimum_length(name_length);

        let system_use = record[pos..].to_vec();

        Ok(Some(Self {
            length,
            extended_attribute_record_length,
            extent_location,
            data_length,
            recording_timestamp,
            file_flags,
            interleave_unit_size,
            interleave_gap_size,
            volume_sequence_number,
            name,
            system_use,
        }))
    }

    pub fn is_directory(&self) -> bool {
        self.file_flags.contains(FileFlags::DIRECTORY)
    }

    /// Whether this is the record describing the directory itself (identifier 0x00).
    pub fn is_self_entry(&self) -> bool {
        self.name == "\u{0}"
    }

    /// Whether this is the record describing the parent directory (identifier 0x01).
    pub fn is_parent_entry(&self) -> bool {
        self.name == "\u{1}"
    }

    pub fn is_pseudo_entry(&self) -> bool {
        self.is_self_entry() || self.is_parent_entry()
    }

    /// The logical block number of the first block of data.
    pub fn extent(&self) -> u32 {
        self.extent_location.little_endian
    }

    /// The number of data bytes.
    pub fn size(&self) -> u32 {
        self.data_length.little_endian
    }
}
impl<T: ReadEndian> EndianPair<T> {
    /// Reads a little-endian copy followed by a big-endian copy.
    pub(crate) fn read(buf: &[u8], pos: &mut usize) -> Result<Self, DecodeError> {
        let little_endian = T::read_le(buf, pos)?;
        let big_endian = T::read_be(buf, pos)?;
        Ok(Self {
            little_endian,
            big_endian,
        })
    }
}
