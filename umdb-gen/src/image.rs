use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, warn};
use umdfs::iso9660::{read_file_data, walk_tree, PathTable, VolumeDescriptor, WalkEntry, WalkOptions};

use crate::error::Error;
use crate::hashes::{hash_image, ImageHashes};


/// An opened UMD image with its directory hierarchy already decoded.
pub struct IsoImage<R> {
    reader: R,
    size: u64,
    pvd: VolumeDescriptor,
    path_table: Option<PathTable>,
    entries: Vec<WalkEntry>,
    file_path_to_entry: BTreeMap<String, usize>,
}
impl<R: Read + Seek> IsoImage<R> {
    pub fn open(mut reader: R, options: &WalkOptions) -> Result<Self, Error> {
        let size = reader.seek(SeekFrom::End(0))?;
        let pvd = VolumeDescriptor::find(&mut reader)?;
        debug!("found primary volume descriptor in sector {}: {:?}", pvd.sector, pvd.volume_identifier);
        if pvd.volume_bytes() > size {
            warn!("image is {} bytes long but the volume claims {} bytes", size, pvd.volume_bytes());
        }

        // the walk decides the tree; the path table is only compared against it
        let path_table = match PathTable::read(&mut reader, &pvd) {
            Ok(pt) => Some(pt),
            Err(e) => {
                warn!("ignoring path table: {}", e);
                None
            },
        };
        let entries = walk_tree(&mut reader, &pvd, options)?;

        let mut file_path_to_entry = BTreeMap::new();
        for (index, entry) in entries.iter().enumerate() {
            if !entry.record.is_directory() {
                file_path_to_entry.insert(entry.path.clone(), index);
            }
        }

        Ok(Self {
            reader,
            size,
            pvd,
            path_table,
            entries,
            file_path_to_entry,
        })
    }

    pub fn read_file(&mut self, file_path: &str) -> Result<Vec<u8>, Error> {
        let index = *self.file_path_to_entry
            .get(file_path)
            .ok_or_else(|| Error::FileNotFound(file_path.to_owned()))?;
        let record = &self.entries[index].record;
        Ok(read_file_data(&mut self.reader, self.pvd.block_bytes(), record)?)
    }

    /// Hashes the whole image file.
    pub fn hash_image(&mut self) -> Result<ImageHashes, Error> {
        Ok(hash_image(&mut self.reader)?)
    }
}
impl<R> IsoImage<R> {
    /// The size of the image file in bytes.
    pub fn size(&self) -> u64 { self.size }

    pub fn pvd(&self) -> &VolumeDescriptor { &self.pvd }

    /// The path table, unless it failed to decode.
    pub fn path_table(&self) -> Option<&PathTable> { self.path_table.as_ref() }

    /// All files and directories in walk order.
    pub fn entries(&self) -> &[WalkEntry] { &self.entries }

    /// The files (not directories) in walk order.
    pub fn list_files(&self) -> Vec<&WalkEntry> {
        self.entries.iter()
            .filter(|e| !e.record.is_directory())
            .collect()
    }

    /// Compares the directories listed in the path table with those found by the walk.
    ///
    /// Returns the number of disagreements, each of which is also logged. A path table that failed
    /// to decode counts as one disagreement.
    pub fn cross_check(&self) -> usize {
        let Some(path_table) = &self.path_table else {
            warn!("no path table to compare against");
            return 1;
        };
        let table_paths = match path_table.directory_paths() {
            Ok(tp) => tp,
            Err(e) => {
                warn!("cannot resolve path table: {}", e);
                return 1;
            },
        };

        let table_dirs: BTreeMap<&str, u32> = table_paths.iter()
            .zip(path_table.entries.iter())
            .skip(1) // root
            .map(|(path, entry)| (path.as_str(), entry.extent_location))
            .collect();
        let walked_dirs: BTreeMap<&str, u32> = self.entries.iter()
            .filter(|e| e.record.is_directory())
            .map(|e| (e.path.as_str(), e.record.extent()))
            .collect();

        let all_paths: BTreeSet<&str> = table_dirs.keys().chain(walked_dirs.keys()).copied().collect();
        let mut disagreements = 0;
        for path in all_paths {
            match (table_dirs.get(path), walked_dirs.get(path)) {
                (Some(t), Some(w)) if t != w => {
                    warn!("directory {:?} is at extent {} in the path table but at {} in the hierarchy", path, t, w);
                    disagreements += 1;
                },
                (Some(_), None) => {
                    warn!("directory {:?} is only listed in the path table", path);
                    disagreements += 1;
                },
                (None, Some(_)) => {
                    warn!("directory {:?} is missing from the path table", path);
                    disagreements += 1;
                },
                _ => {},
            }
        }
        disagreements
    }
}
impl<R> fmt::Debug for IsoImage<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsoImage")
            .field("reader", &"[removed]")
            .field("size", &self.size)
            .field("pvd", &self.pvd)
            .field("path_table", &self.path_table)
            .field("entries", &self.entries)
            .field("file_path_to_entry", &self.file_path_to_entry)
            .finish()
    }
}
