use std::collections::BTreeSet;
use std::io::{Read, Seek};

use tracing::debug;

use crate::error::DecodeError;
use crate::io_util::read_block_into;
use crate::iso9660::{DirectoryRecord, VolumeDescriptor};


/// How much of a directory's extent is read.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ExtentPolicy {
    /// Read all `ceil(data_length / block_size)` sectors of the extent.
    #[default]
    FullExtent,

    /// Only read the first sector of every directory.
    ///
    /// Entries beyond the first sector of large directories are silently missed. This matches the
    /// listings produced by older dumping tools.
    FirstSectorOnly,
}


/// Options for [`walk_tree`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct WalkOptions {
    /// The deepest directory nesting level that is still descended into. The root is at level 0.
    pub max_depth: usize,

    pub extent_policy: ExtentPolicy,
}
impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: 32,
            extent_policy: ExtentPolicy::default(),
        }
    }
}


/// A file or directory found during the walk.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct WalkEntry {
    /// The absolute path, e.g. `/PSP_GAME/PARAM.SFO;1`.
    pub path: String,

    /// The nesting level; entries of the root directory are at level 1.
    pub depth: usize,

    pub record: DirectoryRecord,
}


/// Reads the records of a single directory, without the self and parent pseudo-entries.
///
/// Each sector is scanned from its start until a zero length byte or the end of the sector; records
/// never span sectors.
pub fn read_directory<R: Read + Seek>(
    reader: &mut R,
    block_size: u64,
    directory: &DirectoryRecord,
    extent_policy: ExtentPolicy,
) -> Result<Vec<DirectoryRecord>, DecodeError> {
    let sector_size = match u16::try_from(block_size) {
        Ok(0) | Err(_) => return Err(DecodeError::UnsupportedBlockSize {
            block_size: u16::try_from(block_size).unwrap_or(u16::MAX),
        }),
        Ok(bs) => usize::from(bs),
    };
    let sector_count = match extent_policy {
        ExtentPolicy::FullExtent => u64::from(directory.size()).div_ceil(block_size),
        ExtentPolicy::FirstSectorOnly => 1,
    };

    let mut records = Vec::new();
    let mut sector = vec![0u8; sector_size];
    for sector_index in 0..sector_count {
        let sector_number = u64::from(directory.extent()) + sector_index;
        let bytes_read = read_block_into(reader, block_size, sector_number, &mut sector)?;
        if bytes_read < sector_size {
            return Err(DecodeError::TruncatedDirectory {
                extent_location: directory.extent(),
                sector_index: sector_index as u32,
            });
        }

        let mut offset = 0;
        while offset < sector_size {
            let record = match DirectoryRecord::decode(&sector, offset, sector_number)? {
                Some(r) => r,
                None => break, // padding up to the end of the sector
            };
            offset += usize::from(record.length);

            if record.is_pseudo_entry() {
                continue;
            }
            debug!(
                "sector {}: {:?} (extent {}, {} bytes, flags {:?})",
                sector_number, record.name, record.extent(), record.size(), record.file_flags,
            );
            records.push(record);
        }
    }
    Ok(records)
}


/// Walks the directory hierarchy below the root directory, returning every file and directory in
/// pre-order.
///
/// Names are kept as stored, including any `;1` version suffix.
pub fn walk_tree<R: Read + Seek>(
    reader: &mut R,
    pvd: &VolumeDescriptor,
    options: &WalkOptions,
) -> Result<Vec<WalkEntry>, DecodeError> {
    let mut visited = BTreeSet::new();
    visited.insert(pvd.root_directory.extent());
    walk_directory(reader, pvd.block_bytes(), &pvd.root_directory, "", 0, options, &mut visited)
}

fn walk_directory<R: Read + Seek>(
    reader: &mut R,
    block_size: u64,
    directory: &DirectoryRecord,
    path: &str,
    depth: usize,
    options: &WalkOptions,
    visited: &mut BTreeSet<u32>,
) -> Result<Vec<WalkEntry>, DecodeError> {
    if depth > options.max_depth {
        return Err(DecodeError::DirectoryTooDeep {
            path: path.to_owned(),
            max_depth: options.max_depth,
        });
    }
    debug!("walking directory {:?} at extent {}", path, directory.extent());

    let records = read_directory(reader, block_size, directory, options.extent_policy)?;
    let mut entries = Vec::with_capacity(records.len());
    for record in records {
        let child_path = format!("{}/{}", path, record.name);
        if record.is_directory() {
            if !visited.insert(record.extent()) {
                return Err(DecodeError::DirectoryCycle {
                    path: child_path,
                    extent_location: record.extent(),
                });
            }

            let subtree = walk_directory(
                reader,
                block_size,
                &record,
                &child_path,
                depth + 1,
                options,
                visited,
            )?;
            entries.push(WalkEntry {
                path: child_path,
                depth: depth + 1,
                record,
            });
            entries.extend(subtree);
        } else {
            entries.push(WalkEntry {
                path: child_path,
                depth: depth + 1,
                record,
            });
        }
    }
    Ok(entries)
}
