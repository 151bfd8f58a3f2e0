//! Decoding ISO9660 file systems as found on UMD images.
//!
//! The entry point is [`VolumeDescriptor::find`], which locates the Primary Volume Descriptor. The
//! path table ([`PathTable`]) and the directory hierarchy ([`walk_tree`]) are then read using the
//! locations it provides.


mod directory;
mod path_table;
mod timestamp;
mod walk;


use std::io::{self, Read, Seek};

use from_to_repr::from_to_other;
use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::io_util::{
    ensure_in_source, read_block_into, read_bytes, read_fixed_ascii, read_decimal_datetime,
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u8, read_slice,
};

pub use crate::iso9660::directory::{DirectoryRecord, FileFlags};
pub use crate::iso9660::path_table::{PathTable, PathTableEntry};
pub use crate::iso9660::timestamp::{BinaryTimestamp, DigitTimestamp};
pub use crate::iso9660::walk::{ExtentPolicy, WalkEntry, WalkOptions, read_directory, walk_tree};


/// Logical sector size of UMD media.
///
/// ISO9660 allows other sizes; they are rejected when decoding the volume descriptor.
pub const BYTES_PER_LOGICAL_SECTOR: u64 = 2048;

/// The offset of the area containing the volume descriptors.
///
/// Logical sectors 0 to 15 contain the System Area (ISO9660 § 6.2.1).
pub const DATA_AREA_OFFSET: u64 = 16 * BYTES_PER_LOGICAL_SECTOR;

/// How many sectors are inspected for a Primary Volume Descriptor before giving up.
pub const MAX_DESCRIPTOR_SECTORS: u64 = 32;

/// The value of the ISO9660 standard identifier at offset 1 of every volume descriptor.
const ISO9660_IDENTIFIER_VALUE: [u8; 5] = *b"CD001";

const SECTOR_SIZE: usize = BYTES_PER_LOGICAL_SECTOR as usize;


/// The first byte of every volume descriptor.
#[derive(Clone, Copy, Debug)]
#[from_to_other(base_type = u8, derive_compare = "as_int")]
pub enum DescriptorType {
    BootRecord = 0x00,
    PrimaryVolumeDescriptor = 0x01,
    SupplementaryOrEnhancedVolumeDescriptor = 0x02,
    VolumePartitionDescriptor = 0x03,
    SetTerminator = 0xFF,
    Other(u8),
}


/// A field recorded twice, first little-endian then big-endian (ISO9660 § 7.2.3 and § 7.3.3).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EndianPair<T> {
    pub little_endian: T,
    pub big_endian: T,
}
impl<T: Copy + Eq + Into<u32>> EndianPair<T> {
    /// Returns the value if both copies agree.
    pub fn consistent(&self, field: &'static str) -> Result<T, DecodeError> {
        if self.little_endian == self.big_endian {
            Ok(self.little_endian)
        } else {
            Err(DecodeError::EndianMismatch {
                field,
                little_endian: self.little_endian.into(),
                big_endian: self.big_endian.into(),
            })
        }
    }
}


/// The decoded Primary Volume Descriptor (ISO9660 § 8.4).
///
/// Offsets (`type_l_path_table_offset` and friends, `root_directory.extent_location`) are
/// logical block numbers; multiply by `block_size` to obtain byte offsets.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct VolumeDescriptor {
    /// The logical sector from which this descriptor was read.
    pub sector: u64,

    /// `PSP GAME` on game discs.
    pub system_identifier: String,

    pub volume_identifier: String,

    /// Volume space size in logical blocks.
    pub volume_space_size: u32,

    pub volume_set_size: u16,
    pub volume_sequence_number: u16,

    /// Size, in bytes, of a logical block. Always 2048.
    pub block_size: u16,

    /// Size of the path table in bytes.
    pub path_table_size: u32,

    /// Block of the path table with little-endian fields.
    pub type_l_path_table_offset: u32,

    /// Block of the second copy of the type L path table, or 0 if there is none.
    pub optional_type_l_path_table_offset: u32,

    /// Block of the path table with big-endian fields.
    pub type_m_path_table_offset: u32,
    pub optional_type_m_path_table_offset: u32,

    pub root_directory: DirectoryRecord, // 34 bytes at 0x9C

    pub volume_set_identifier: String,
    pub publisher_identifier: String,
    pub data_preparer_identifier: String,
    pub application_identifier: String,

    pub volume_creation_timestamp: DigitTimestamp,
    pub volume_modification_timestamp: DigitTimestamp,
    pub volume_expiration_timestamp: DigitTimestamp,
    pub volume_effective_timestamp: DigitTimestamp,
}
impl VolumeDescriptor {
    /// Scans the volume descriptor set for the Primary Volume Descriptor.
    ///
    /// Starts at [`DATA_AREA_OFFSET`] and inspects at most [`MAX_DESCRIPTOR_SECTORS`] sectors.
    /// Reaching the set terminator, the end of the image or the scan limit without encountering a
    /// primary descriptor yields [`DecodeError::PvdNotFound`].
    pub fn find<R: Read + Seek>(reader: &mut R) -> Result<Self, DecodeError> {
        let first_sector = DATA_AREA_OFFSET / BYTES_PER_LOGICAL_SECTOR;
        let mut sector_buf = vec![0u8; SECTOR_SIZE];

        for i in 0..MAX_DESCRIPTOR_SECTORS {
            let sector = first_sector + i;
            let bytes_read = read_block_into(reader, BYTES_PER_LOGICAL_SECTOR, sector, &mut sector_buf)?;
            if bytes_read < SECTOR_SIZE {
                debug!("image ends within volume descriptor sector {}", sector);
                return Err(DecodeError::PvdNotFound { sectors_scanned: i });
            }

            let descriptor_type = DescriptorType::from_base_type(sector_buf[0]);
            debug!("sector {} holds volume descriptor {:?}", sector, descriptor_type);
            match descriptor_type {
                DescriptorType::PrimaryVolumeDescriptor => {
                    return Self::decode(&sector_buf, sector);
                },
                DescriptorType::SetTerminator => {
                    return Err(DecodeError::PvdNotFound { sectors_scanned: i + 1 });
                },
                _ => {},
            }
        }

        Err(DecodeError::PvdNotFound { sectors_scanned: MAX_DESCRIPTOR_SECTORS })
    }

    /// Decodes a Primary Volume Descriptor from the contents of its sector.
    pub fn decode(sector_buf: &[u8], sector: u64) -> Result<Self, DecodeError> {
        let identifier: [u8; 5] = read_bytes(sector_buf, 1)?;
        if identifier != ISO9660_IDENTIFIER_VALUE {
            warn!("primary volume descriptor in sector {} has standard identifier {:?}", sector, identifier);
        }
        let version = read_u8(sector_buf, 6)?;
        if version != 1 {
            warn!("primary volume descriptor in sector {} has version {}", sector, version);
        }

        let volume_space_size = EndianPair {
            little_endian: read_u32_le(sector_buf, 0x50)?,
            big_endian: read_u32_be(sector_buf, 0x54)?,
        }.consistent("volume_space_size")?;
        let volume_set_size = read_u16_le(sector_buf, 0x78)?;
        let volume_sequence_number = read_u16_le(sector_buf, 0x7C)?;
        let block_size = EndianPair {
            little_endian: read_u16_le(sector_buf, 0x80)?,
            big_endian: read_u16_be(sector_buf, 0x82)?,
        }.consistent("block_size")?;
        if u64::from(block_size) != BYTES_PER_LOGICAL_SECTOR {
            return Err(DecodeError::UnsupportedBlockSize { block_size });
        }
        let path_table_size = EndianPair {
            little_endian: read_u32_le(sector_buf, 0x84)?,
            big_endian: read_u32_be(sector_buf, 0x88)?,
        }.consistent("path_table_size")?;

        let root_record_bytes = read_slice(sector_buf, 0x9C, DirectoryRecord::ROOT_RECORD_SIZE)?;
        let root_directory = DirectoryRecord::decode(root_record_bytes, 0, sector)?
            .ok_or(DecodeError::MalformedDirectoryEntry {
                sector,
                offset: 0x9C,
                reason: "root directory record is empty",
            })?;

        Ok(Self {
            sector,
            system_identifier: read_fixed_ascii(sector_buf, 0x08, 32)?,
            volume_identifier: read_fixed_ascii(sector_buf, 0x28, 32)?,
            volume_space_size,
            volume_set_size,
            volume_sequence_number,
            block_size,
            path_table_size,
            type_l_path_table_offset: read_u32_le(sector_buf, 0x8C)?,
            optional_type_l_path_table_offset: read_u32_le(sector_buf, 0x90)?,
            type_m_path_table_offset: read_u32_be(sector_buf, 0x94)?,
            optional_type_m_path_table_offset: read_u32_be(sector_buf, 0x98)?,
            root_directory,
            volume_set_identifier: read_fixed_ascii(sector_buf, 0xBE, 0x80)?,
            publisher_identifier: read_fixed_ascii(sector_buf, 0x13E, 0x80)?,
            data_preparer_identifier: read_fixed_ascii(sector_buf, 0x1BE, 0x80)?,
            application_identifier: read_fixed_ascii(sector_buf, 0x23E, 0x80)?,
            volume_creation_timestamp: read_decimal_datetime(sector_buf, 0x32D)?,
            volume_modification_timestamp: read_decimal_datetime(sector_buf, 0x33E)?,
            volume_expiration_timestamp: read_decimal_datetime(sector_buf, 0x34F)?,
            volume_effective_timestamp: read_decimal_datetime(sector_buf, 0x360)?,
        })
    }

    pub fn block_bytes(&self) -> u64 {
        u64::from(self.block_size)
    }

    /// The total size of the volume in bytes, according to the descriptor.
    pub fn volume_bytes(&self) -> u64 {
        u64::from(self.volume_space_size) * self.block_bytes()
    }
}


/// Reads the data of a file, i.e. `data_length` bytes starting at block `extent_location`.
///
/// Fails with [`DecodeError::OutOfBounds`] if the file extends past the end of the image. If the
/// image shrinks while reading, fails with an I/O error of kind [`io::ErrorKind::UnexpectedEof`].
pub fn read_file_data<R: Read + Seek>(
    reader: &mut R,
    block_size: u64,
    record: &DirectoryRecord,
) -> Result<Vec<u8>, DecodeError> {
    let start = u64::from(record.extent()).checked_mul(block_size)
        .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
    ensure_in_source(reader, start, record.size().into())?;
    let length = usize::try_from(record.size())
        .map_err(|_| io::Error::from(io::ErrorKind::OutOfMemory))?;
    let mut data = vec![0u8; length];
    let bytes_read = read_block_into(reader, block_size, record.extent().into(), &mut data)?;
    if bytes_read < length {
        debug!(
            "file {:?} at extent {} needs {} bytes but only {} are available",
            record.name, record.extent(), length, bytes_read,
        );
        return Err(DecodeError::Io(io::ErrorKind::UnexpectedEof.into()));
    }
    Ok(data)
}
