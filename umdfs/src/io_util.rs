//! Bounds-checked decoding of fixed-offset fields from byte buffers.
//!
//! Every read validates `offset + length` against the buffer first and fails with
//! [`DecodeError::OutOfBounds`] instead of panicking or zero-filling.


use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;

use crate::error::DecodeError;
use crate::iso9660::DigitTimestamp;


fn checked_range(buf: &[u8], offset: usize, length: usize) -> Result<Range<usize>, DecodeError> {
    match offset.checked_add(length) {
        Some(end) if end <= buf.len() => Ok(offset..end),
        _ => Err(DecodeError::OutOfBounds { offset, length, available: buf.len() }),
    }
}


pub fn read_slice(buf: &[u8], offset: usize, length: usize) -> Result<&[u8], DecodeError> {
    let range = checked_range(buf, offset, length)?;
    Ok(&buf[range])
}

pub fn read_bytes<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], DecodeError> {
    let mut ret = [0u8; N];
    ret.copy_from_slice(read_slice(buf, offset, N)?);
    Ok(ret)
}

pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8, DecodeError> {
    let [b] = read_bytes::<1>(buf, offset)?;
    Ok(b)
}

pub fn read_i8(buf: &[u8], offset: usize) -> Result<i8, DecodeError> {
    // byte order doesn't matter for single-byte values
    Ok(i8::from_ne_bytes(read_bytes::<1>(buf, offset)?))
}


/// Integers that can be decoded in either byte order from a cursor position.
///
/// The cursor is only advanced if the read succeeds.
pub(crate) trait ReadEndian : Sized {
    fn read_be(buf: &[u8], pos: &mut usize) -> Result<Self, DecodeError>;
    fn read_le(buf: &[u8], pos: &mut usize) -> Result<Self, DecodeError>;
}
macro_rules! impl_read_endian {
    ($type:ty) => {
        impl ReadEndian for $type {
            fn read_be(buf: &[u8], pos: &mut usize) -> Result<Self, DecodeError> {
                let size = ::std::mem::size_of::<$type>();
                let val = <$type>::from_be_bytes(read_bytes(buf, *pos)?);
                *pos += size;
                Ok(val)
            }
            fn read_le(buf: &[u8], pos: &mut usize) -> Result<Self, DecodeError> {
                let size = ::std::mem::size_of::<$type>();
                let val = <$type>::from_le_bytes(read_bytes(buf, *pos)?);
                *pos += size;
                Ok(val)
            }
        }
    };
}
impl_read_endian!(u16);
impl_read_endian!(u32);

pub fn read_u16_le(buf: &[u8], offset: usize) -> Result<u16, DecodeError> {
    let mut pos = offset;
    u16::read_le(buf, &mut pos)
}

pub fn read_u16_be(buf: &[u8], offset: usize) -> Result<u16, DecodeError> {
    let mut pos = offset;
    u16::read_be(buf, &mut pos)
}

pub fn read_u32_le(buf: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let mut pos = offset;
    u32::read_le(buf, &mut pos)
}

pub fn read_u32_be(buf: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let mut pos = offset;
    u32::read_be(buf, &mut pos)
}

/// Reads a 24-bit little-endian value, as used by the SFO minor version.
pub fn read_u24_le(buf: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let [b0, b1, b2] = read_bytes::<3>(buf, offset)?;
    Ok(u32::from_le_bytes([b0, b1, b2, 0x00]))
}


/// Decodes a fixed-width ASCII field, dropping the trailing NUL and space padding.
pub fn read_fixed_ascii(buf: &[u8], offset: usize, length: usize) -> Result<String, DecodeError> {
    let field = read_slice(buf, offset, length)?;
    if let Some(bad_index) = field.iter().position(|b| !b.is_ascii()) {
        return Err(DecodeError::NonAsciiText { offset: offset + bad_index });
    }
    let end = field.iter()
        .rposition(|&b| b != 0x00 && b != b' ')
        .map(|i| i + 1)
        .unwrap_or(0);
    Ok(field[..end].iter().map(|&b| char::from(b)).collect())
}

/// Decodes the 17-byte decimal date-time structure used in volume descriptors.
pub fn read_decimal_datetime(buf: &[u8], offset: usize) -> Result<DigitTimestamp, DecodeError> {
    DigitTimestamp::decode(buf, offset)
}


/// Fails with [`DecodeError::OutOfBounds`] unless `length` bytes at byte `offset` exist in the source.
///
/// Lets callers refuse lengths taken from the image before allocating buffers for them.
pub(crate) fn ensure_in_source<S: Seek>(source: &mut S, offset: u64, length: u64) -> Result<(), DecodeError> {
    let available = source.seek(SeekFrom::End(0))?;
    let to_usize = |v: u64| usize::try_from(v).unwrap_or(usize::MAX);
    match offset.checked_add(length) {
        Some(end) if end <= available => Ok(()),
        _ => Err(DecodeError::OutOfBounds {
            offset: to_usize(offset),
            length: to_usize(length),
            available: to_usize(available),
        }),
    }
}

/// Seeks to `block` and fills `output` completely.
///
/// Returns the number of bytes obtained, which is smaller than `output.len()` only if the source
/// ended early.
pub(crate) fn read_block_into<R: Read + Seek>(
    reader: &mut R,
    block_size: u64,
    block: u64,
    output: &mut [u8],
) -> Result<usize, io::Error> {
    let start = block.checked_mul(block_size)
        .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
    reader.seek(SeekFrom::Start(start))?;

    let mut total_bytes_read = 0;
    while total_bytes_read < output.len() {
        let bytes_read_this_time = match reader.read(&mut output[total_bytes_read..]) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if bytes_read_this_time == 0 {
            // EOF
            break;
        }
        total_bytes_read += bytes_read_this_time;
    }
    Ok(total_bytes_read)
}
