use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use umdfs::iso9660::{DigitTimestamp, VolumeDescriptor};
use umdfs::sfo::{SfoDocument, SfoFields};
use umdfs::umd_data::{UmdData, UMD_DATA_FILE_NAME};

use crate::error::Error;
use crate::hashes::{sha1_hex, ImageHashes};
use crate::image::IsoImage;


/// The submission report for one image.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub size: u64,
    pub hashes: ImageHashes,
    pub pvd: PvdReport,
    pub path_table: Vec<PathTableReport>,

    /// The SHA-1 of every file, by path.
    pub tree: BTreeMap<String, String>,
    pub sfo_info: BTreeMap<String, SfoReport>,
    pub umd_data: Option<UmdData>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PvdReport {
    pub system_id: String,
    pub volume_id: String,
    pub volume_space_size: u32,
    pub block_size: u16,
    pub volume_set_id: String,
    pub publisher: String,
    pub preparer: String,
    pub application_id: String,
    pub creation_date: DigitTimestamp,
    pub modification_date: DigitTimestamp,
    pub expiration_date: DigitTimestamp,
    pub effective_date: DigitTimestamp,
}
impl From<&VolumeDescriptor> for PvdReport {
    fn from(pvd: &VolumeDescriptor) -> Self {
        Self {
            system_id: pvd.system_identifier.clone(),
            volume_id: pvd.volume_identifier.clone(),
            volume_space_size: pvd.volume_space_size,
            block_size: pvd.block_size,
            volume_set_id: pvd.volume_set_identifier.clone(),
            publisher: pvd.publisher_identifier.clone(),
            preparer: pvd.data_preparer_identifier.clone(),
            application_id: pvd.application_identifier.clone(),
            creation_date: pvd.volume_creation_timestamp,
            modification_date: pvd.volume_modification_timestamp,
            expiration_date: pvd.volume_expiration_timestamp,
            effective_date: pvd.volume_effective_timestamp,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PathTableReport {
    pub name: String,
    pub extent_location: u32,
    pub parent: u16,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SfoReport {
    pub version: String,
    pub fields: SfoFields,
}
impl From<SfoDocument> for SfoReport {
    fn from(document: SfoDocument) -> Self {
        Self {
            version: document.version(),
            fields: document.fields,
        }
    }
}


/// Removes an ISO9660 version suffix such as `;1` from a file name.
pub fn strip_version(name: &str) -> &str {
    match name.rsplit_once(';') {
        Some((base, version)) if !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()) => base,
        _ => name,
    }
}

pub fn is_sfo_name(name: &str) -> bool {
    strip_version(name).ends_with(".SFO")
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}


/// Decodes everything the report needs from the image.
///
/// Every file is read once to hash it. An SFO or UMD_DATA.BIN that fails to decode is logged and
/// left out of the report; failing to read a file at all aborts.
pub fn build_report<R: Read + Seek>(image: &mut IsoImage<R>) -> Result<Report, Error> {
    let disagreements = image.cross_check();
    if disagreements > 0 {
        warn!("path table and directory hierarchy disagree in {} places", disagreements);
    }

    let path_table: Vec<PathTableReport> = image.path_table()
        .map(|pt| pt.entries.iter()
            .map(|e| PathTableReport {
                name: e.name.clone(),
                extent_location: e.extent_location,
                parent: e.parent_directory_number,
            })
            .collect()
        )
        .unwrap_or_default();

    let hashes = image.hash_image()?;
    debug!("image SHA-1 is {}", hashes.sha1);

    let files: Vec<String> = image.list_files().into_iter()
        .map(|e| e.path.clone())
        .collect();

    let mut tree = BTreeMap::new();
    let mut sfo_info = BTreeMap::new();
    let mut umd_data = None;
    for path in files {
        let raw = image.read_file(&path)?;
        let name = strip_version(file_name(&path));
        if name == UMD_DATA_FILE_NAME {
            match UmdData::parse(&raw) {
                Ok(ud) => {
                    info!("{}: product {}", path, ud.id);
                    umd_data = Some(ud);
                },
                Err(e) => warn!("skipping {}: {}", path, e),
            }
        } else if is_sfo_name(name) {
            match SfoDocument::decode(&raw) {
                Ok(document) => {
                    debug!("{}: {} SFO fields", path, document.fields.len());
                    sfo_info.insert(path.clone(), SfoReport::from(document));
                },
                Err(e) => warn!("skipping {}: {}", path, e),
            }
        }
        tree.insert(path, sha1_hex(&raw));
    }

    Ok(Report {
        size: image.size(),
        hashes,
        pvd: PvdReport::from(image.pvd()),
        path_table,
        tree,
        sfo_info,
        umd_data,
    })
}


/// Writes the report as JSON. An existing file at `path` is never replaced.
pub fn write_report(report: &Report, path: &Path) -> Result<(), Error> {
    let file = File::create_new(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => Error::OutputExists(path.to_owned()),
            _ => Error::Io(e),
        })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}
