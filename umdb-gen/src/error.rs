use std::fmt;
use std::path::PathBuf;

use umdfs::DecodeError;


#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Decode(DecodeError),
    Json(serde_json::Error),
    OutputExists(PathBuf),
    FileNotFound(String),
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)
                => write!(f, "I/O error: {}", e),
            Self::Decode(e)
                => write!(f, "decoding error: {}", e),
            Self::Json(e)
                => write!(f, "JSON error: {}", e),
            Self::OutputExists(pb)
                => write!(f, "output file {:?} already exists", pb),
            Self::FileNotFound(path)
                => write!(f, "file {:?} not found in image", path),
        }
    }
}
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Decode(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::OutputExists(_) => None,
            Self::FileNotFound(_) => None,
        }
    }
}
impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self { Self::Io(value) }
}
impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self { Self::Decode(value) }
}
impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self { Self::Json(value) }
}
