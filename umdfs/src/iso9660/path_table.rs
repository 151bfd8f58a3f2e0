use std::io::{Read, Seek};

use tracing::debug;

use crate::error::DecodeError;
use crate::io_util::{ensure_in_source, read_block_into, read_fixed_ascii, read_u16_le, read_u32_le, read_u8};
use crate::iso9660::VolumeDescriptor;


/// An entry in the Type L (little-endian) path table.
///
/// See ISO9660 § 9.4.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PathTableEntry {
    // directory_identifier_length: u8,

    pub extended_attribute_record_length: u8,

    /// The logical block number of the directory's extent.
    pub extent_location: u32,

    /// The 1-based index of the parent directory in the path table.
    pub parent_directory_number: u16,

    /// The directory identifier. Empty for the root directory.
    pub name: String,
}
impl PathTableEntry {
    pub const HEADER_SIZE: usize = 8;

    /// The number of bytes this entry occupies on disk, including the padding byte.
    pub fn padded_size(name_length: usize) -> usize {
        let unpadded = Self::HEADER_SIZE + name_length;
        unpadded + (unpadded % 2)
    }
}


/// The flat list of all directories of a volume.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct PathTable {
    pub entries: Vec<PathTableEntry>,
}
impl PathTable {
    /// Decodes the first `declared_size` bytes of `buf` as a sequence of path table entries.
    ///
    /// The last entry must end exactly at `declared_size`.
    pub fn decode(buf: &[u8], declared_size: usize) -> Result<Self, DecodeError> {
        let table = buf.get(..declared_size)
            .ok_or(DecodeError::OutOfBounds { offset: 0, length: declared_size, available: buf.len() })?;

        let mut entries = Vec::new();
        let mut cursor = 0;
        while cursor < declared_size {
            let misaligned = DecodeError::PathTableMisaligned { cursor, declared_size };
            if cursor + PathTableEntry::HEADER_SIZE > declared_size {
                return Err(misaligned);
            }
            let name_length = usize::from(read_u8(table, cursor)?);
            let entry_size = PathTableEntry::padded_size(name_length);
            if cursor + entry_size > declared_size {
                return Err(misaligned);
            }

            let entry = PathTableEntry {
                extended_attribute_record_length: read_u8(table, cursor + 1)?,
                extent_location: read_u32_le(table, cursor + 2)?,
                parent_directory_number: read_u16_le(table, cursor + 6)?,
                name: read_fixed_ascii(table, cursor + PathTableEntry::HEADER_SIZE, name_length)?,
            };
            debug!(
                "path table entry {} at {}: {:?} (extent {}, parent {})",
                entries.len() + 1, cursor, entry.name, entry.extent_location, entry.parent_directory_number,
            );
            entries.push(entry);
            cursor += entry_size;
        }

        Ok(Self {
            entries,
        })
    }

    /// Reads and decodes the Type L path table referenced by the volume descriptor.
    pub fn read<R: Read + Seek>(reader: &mut R, pvd: &VolumeDescriptor) -> Result<Self, DecodeError> {
        let declared_size = pvd.path_table_size as usize;
        let start = u64::from(pvd.type_l_path_table_offset) * pvd.block_bytes();
        let to_usize = |v: u64| usize::try_from(v).unwrap_or(usize::MAX);
        if start + u64::from(pvd.path_table_size) > pvd.volume_bytes() {
            return Err(DecodeError::OutOfBounds {
                offset: to_usize(start),
                length: declared_size,
                available: to_usize(pvd.volume_bytes()),
            });
        }

        ensure_in_source(reader, start, pvd.path_table_size.into())?;

        let mut buf = vec![0u8; declared_size];
        let bytes_read = read_block_into(
            reader,
            pvd.block_bytes(),
            pvd.type_l_path_table_offset.into(),
            &mut buf,
        )?;
        if bytes_read < declared_size {
            return Err(DecodeError::OutOfBounds {
                offset: to_usize(start),
                length: declared_size,
                available: bytes_read,
            });
        }

        Self::decode(&buf, declared_size)
    }

    /// Resolves the absolute path of every entry, in table order.
    ///
    /// The root directory is `/`; other directories are named like the paths produced by
    /// [`walk_tree`](crate::iso9660::walk_tree). Each parent must precede its children.
    pub fn directory_paths(&self) -> Result<Vec<String>, DecodeError> {
        let mut paths: Vec<String> = Vec::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            if index == 0 {
                // the root is its own parent
                paths.push("/".to_owned());
                continue;
            }

            let parent = usize::from(entry.parent_directory_number);
            if parent == 0 || parent > index {
                return Err(DecodeError::BadPathTableParent {
                    index: index + 1,
                    parent: entry.parent_directory_number,
                });
            }
            let parent_path = &paths[parent - 1];
            let path = if parent_path == "/" {
                format!("/{}", entry.name)
            } else {
                format!("{}/{}", parent_path, entry.name)
            };
            paths.push(path);
        }
        Ok(paths)
    }
}
