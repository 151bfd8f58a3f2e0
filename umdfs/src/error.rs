use std::fmt;


/// Everything that can go wrong while decoding an image or one of the files on it.
///
/// All variants are terminal for the decode operation that produced them; nothing in this crate
/// retries or substitutes default values.
#[derive(Debug)]
pub enum DecodeError {
    Io(std::io::Error),
    OutOfBounds { offset: usize, length: usize, available: usize },
    NonAsciiText { offset: usize },
    MalformedTimestamp { offset: usize },
    PvdNotFound { sectors_scanned: u64 },
    EndianMismatch { field: &'static str, little_endian: u32, big_endian: u32 },
    UnsupportedBlockSize { block_size: u16 },
    PathTableMisaligned { cursor: usize, declared_size: usize },
    BadPathTableParent { index: usize, parent: u16 },
    TruncatedDirectory { extent_location: u32, sector_index: u32 },
    MalformedDirectoryEntry { sector: u64, offset: usize, reason: &'static str },
    DirectoryTooDeep { path: String, max_depth: usize },
    DirectoryCycle { path: String, extent_location: u32 },
    BadSignature { found: [u8; 4] },
    MalformedSfo { reason: &'static str },
    UnknownSfoFormat { key_offset: u16, format: u16 },
    MalformedUmdData,
}
impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)
                => write!(f, "I/O error: {}", e),
            Self::OutOfBounds { offset, length, available }
                => write!(f, "reading {} bytes at offset {} exceeds the {} available bytes", length, offset, available),
            Self::NonAsciiText { offset }
                => write!(f, "non-ASCII byte in text field at offset {}", offset),
            Self::MalformedTimestamp { offset }
                => write!(f, "malformed decimal timestamp at offset {}", offset),
            Self::PvdNotFound { sectors_scanned }
                => write!(f, "no primary volume descriptor found after scanning {} sectors", sectors_scanned),
            Self::EndianMismatch { field, little_endian, big_endian }
                => write!(f, "both-endian field {} disagrees: {} (little endian) vs. {} (big endian)", field, little_endian, big_endian),
            Self::UnsupportedBlockSize { block_size }
                => write!(f, "unsupported logical block size {}", block_size),
            Self::PathTableMisaligned { cursor, declared_size }
                => write!(f, "path table cursor {} does not land on declared size {}", cursor, declared_size),
            Self::BadPathTableParent { index, parent }
                => write!(f, "path table entry {} refers to invalid parent {}", index, parent),
            Self::TruncatedDirectory { extent_location, sector_index }
                => write!(f, "directory at extent {} is truncated in sector {}", extent_location, sector_index),
            Self::MalformedDirectoryEntry { sector, offset, reason }
                => write!(f, "malformed directory record in sector {} at offset {}: {}", sector, offset, reason),
            Self::DirectoryTooDeep { path, max_depth }
                => write!(f, "directory {:?} is nested deeper than {} levels", path, max_depth),
            Self::DirectoryCycle { path, extent_location }
                => write!(f, "directory {:?} revisits extent {}", path, extent_location),
            Self::BadSignature { found }
                => write!(f, "bad SFO signature {:02X?}", found),
            Self::MalformedSfo { reason }
                => write!(f, "malformed SFO: {}", reason),
            Self::UnknownSfoFormat { key_offset, format }
                => write!(f, "unknown SFO data format {:#06X} for key at offset {}", format, key_offset),
            Self::MalformedUmdData
                => write!(f, "malformed UMD_DATA.BIN"),
        }
    }
}
impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
impl From<std::io::Error> for DecodeError {
    fn from(value: std::io::Error) -> Self { Self::Io(value) }
}
