mod error;
pub mod io_util;
pub mod iso9660;
pub mod sfo;
pub mod umd_data;


pub use crate::error::DecodeError;
