//! Digests of the whole image and of single files, as lowercase hex strings.


use std::io::{self, Read, Seek, SeekFrom};

use crc::{Crc, CRC_32_ISO_HDLC};
use md5::Md5;
use serde::Serialize;
use sha1::{Digest, Sha1};
use sha2::Sha256;


/// The CRC-32 of zlib and PKZIP.
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// How much of the image is read at once.
const CHUNK_SIZE: usize = 0x10000;


#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ImageHashes {
    pub crc32: String,
    pub sha1: String,
    pub md5: String,
    pub sha256: String,
}


fn to_hex(bytes: &[u8]) -> String {
    bytes.iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Hashes everything from the start of `reader` to its end.
pub fn hash_image<R: Read + Seek>(reader: &mut R) -> Result<ImageHashes, io::Error> {
    reader.seek(SeekFrom::Start(0))?;

    let mut crc32 = CRC32.digest();
    let mut sha1 = Sha1::new();
    let mut md5 = Md5::new();
    let mut sha256 = Sha256::new();

    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let piece = &chunk[..bytes_read];
        crc32.update(piece);
        sha1.update(piece);
        md5.update(piece);
        sha256.update(piece);
    }

    Ok(ImageHashes {
        crc32: format!("{:08x}", crc32.finalize()),
        sha1: to_hex(&sha1.finalize()),
        md5: to_hex(&md5.finalize()),
        sha256: to_hex(&sha256.finalize()),
    })
}

/// The SHA-1 of a file's contents.
pub fn sha1_hex(data: &[u8]) -> String {
    to_hex(&Sha1::digest(data))
}
