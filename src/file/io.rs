//! Low-level little-endian read and write helpers.
//!
//! Everything in ECMA-335 is little-endian. The [`CilIO`] trait abstracts over the primitive
//! types so that the same bounds-checked routines serve every field width found in PE
//! headers, metadata tables and method bodies. The write side operates on growable byte
//! buffers (for building new images) and on fixed slices (for patching header fields in place).
//!
//! # Examples
//!
//! ```rust
//! use autofish::file::io::{read_le_at, write_le_at};
//!
//! let mut data = vec![0u8; 8];
//! let mut offset = 2;
//! write_le_at(&mut data, &mut offset, 0x1234_5678_u32)?;
//!
//! let mut offset = 2;
//! assert_eq!(read_le_at::<u32>(&data, &mut offset)?, 0x1234_5678);
//! assert_eq!(offset, 6);
//! # Ok::<(), autofish::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait implemented by every primitive that can be read from or written to a metadata buffer.
pub trait CilIO: Sized {
    /// Byte array representation of the type
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]> + AsRef<[u8]>;

    /// Build the value from its little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Produce the little-endian bytes of the value
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty),*) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Read a value at the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is too short.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Read a value at `offset` and advance `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would exceed `data`.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Read an index column that is either 2 or 4 bytes wide.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would exceed `data`.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    if is_large {
        read_le_at::<u32>(data, offset)
    } else {
        Ok(u32::from(read_le_at::<u16>(data, offset)?))
    }
}

/// Overwrite a value in place at `offset` and advance `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the write would exceed `data`.
pub fn write_le_at<T: CilIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    let bytes = bytes.as_ref();
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;

    Ok(())
}

/// Append a value to a growable buffer.
pub fn push_le<T: CilIO>(buffer: &mut Vec<u8>, value: T) {
    buffer.extend_from_slice(value.to_le_bytes().as_ref());
}

/// Append an index column that is either 2 or 4 bytes wide.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a 2-byte column cannot hold `value`.
pub fn push_le_dyn(buffer: &mut Vec<u8>, value: u32, is_large: bool) -> Result<()> {
    if is_large {
        push_le(buffer, value);
    } else {
        let narrow = u16::try_from(value)
            .map_err(|_| malformed_error!("Value 0x{:X} does not fit a 2-byte column", value))?;
        push_le(buffer, narrow);
    }

    Ok(())
}

/// Append a compressed unsigned integer (ECMA-335 II.23.2).
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for values above `0x1FFF_FFFF`.
pub fn push_compressed_uint(buffer: &mut Vec<u8>, value: u32) -> Result<()> {
    #[allow(clippy::cast_possible_truncation)]
    match value {
        0..=0x7F => buffer.push(value as u8),
        0x80..=0x3FFF => {
            buffer.push(((value >> 8) as u8) | 0x80);
            buffer.push(value as u8);
        }
        0x4000..=0x1FFF_FFFF => {
            buffer.push(((value >> 24) as u8) | 0xC0);
            buffer.push((value >> 16) as u8);
            buffer.push((value >> 8) as u8);
            buffer.push(value as u8);
        }
        _ => return Err(malformed_error!("Value too large for compression - {}", value)),
    }

    Ok(())
}

/// Round `value` up to the next multiple of `alignment` (which must be a power of two).
#[must_use]
pub fn align_up(value: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return value;
    }
    (value + alignment - 1) & !(alignment - 1)
}

/// Pad a buffer with zeroes until its length is a multiple of `alignment`.
pub fn pad_to(buffer: &mut Vec<u8>, alignment: usize) {
    let target = align_up(buffer.len(), alignment);
    buffer.resize(target, 0);
}
