//! Decoding of `UMD_DATA.BIN`, the small identification file in the root of every UMD.
//!
//! The file contains ASCII text of the form `ULJM-05001|0123456789ABCDEF|0001|G`, usually followed
//! by NUL padding.


use tracing::debug;

use crate::error::DecodeError;


/// The name of the file on the disc, without version suffix.
pub const UMD_DATA_FILE_NAME: &str = "UMD_DATA.BIN";


#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct UmdData {
    /// The product code, e.g. `ULJM-05001`.
    pub id: String,

    pub key: String,
    pub unknown: String,

    /// The content type; `G` for games, `V` for video.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
}
impl UmdData {
    /// Decodes the contents of `UMD_DATA.BIN`.
    ///
    /// Fields after the fourth are ignored. NUL bytes are stripped from the end of the fourth field.
    pub fn parse(raw: &[u8]) -> Result<Self, DecodeError> {
        let end = raw.iter()
            .rposition(|&b| b != 0x00)
            .map(|i| i + 1)
            .unwrap_or(0);
        if let Some(offset) = raw[..end].iter().position(|b| !b.is_ascii()) {
            return Err(DecodeError::NonAsciiText { offset });
        }
        let text: String = raw[..end].iter().map(|&b| char::from(b)).collect();

        let mut fields = text.split('|');
        let (Some(id), Some(key), Some(unknown), Some(kind)) = (fields.next(), fields.next(), fields.next(), fields.next()) else {
            return Err(DecodeError::MalformedUmdData);
        };
        let data = Self {
            id: id.to_owned(),
            key: key.to_owned(),
            unknown: unknown.to_owned(),
            kind: kind.trim_end_matches('\0').to_owned(),
        };
        debug!("UMD data: {:?}", data);
        Ok(data)
    }
}
