//! Big-endian, bounds-checked reading and writing of primitive values.
//!
//! Every structure this crate touches was laid out by a big-endian PowerPC toolchain: the XEX2
//! header chain, the XDBF resource directory and the guest's own globals. This module provides
//! the [`crate::file::io::ByteIO`] trait and a handful of free functions that convert between
//! those big-endian byte sequences and host-order integers without ever reading past the end of
//! a buffer.
//!
//! # Key Components
//!
//! - [`crate::file::io::ByteIO`] - Trait implemented by all integer types we decode
//! - [`crate::file::io::read_be`] / [`crate::file::io::read_be_at`] - Big-endian reads
//! - [`crate::file::io::write_be`] / [`crate::file::io::write_be_at`] - Big-endian writes
//!
//! # Examples
//!
//! ```rust,ignore
//! use xenon_host::file::io::{read_be_at, write_be};
//!
//! let data = [0x00, 0x01, 0x86, 0xA0, 0xFF, 0xFF];
//! let mut offset = 0;
//! let entry: u32 = read_be_at(&data, &mut offset)?;
//! assert_eq!(entry, 100_000);
//! assert_eq!(offset, 4);
//!
//! let mut out = [0u8; 2];
//! write_be(&mut out, 0x1234u16)?;
//! assert_eq!(out, [0x12, 0x34]);
//! # Ok::<(), xenon_host::Error>(())
//! ```
//!
//! # Error Handling
//!
//! All functions return [`crate::Error::OutOfBounds`] if the buffer is too short for the
//! requested value.

use crate::Result;

/// Trait for implementing type-specific safe binary data reading and writing operations.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size byte
/// array required for that type (e.g. `[u8; 4]` for `u32`).
pub trait ByteIO: Sized + Copy {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;
    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_byte_io {
    ($($ty:ty),*) => {
        $(
            impl ByteIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_byte_io!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Safely reads a value of type `T` in big-endian byte order from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Safely reads a value of type `T` in big-endian byte order at `offset`, advancing `offset`
/// by the size of `T`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = take::<T>(data, *offset)?;
    *offset += std::mem::size_of::<T>();
    Ok(T::from_be_bytes(bytes))
}

/// Writes `value` in big-endian byte order at the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is too short.
pub fn write_be<T: ByteIO>(data: &mut [u8], value: T) -> Result<()> {
    let mut offset = 0_usize;
    write_be_at(data, &mut offset, value)
}

/// Writes `value` in big-endian byte order at `offset`, advancing `offset` by the size of `T`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is too short.
pub fn write_be_at<T: ByteIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let size = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(size) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    data[*offset..end].copy_from_slice(value.to_be_bytes().as_ref());
    *offset = end;
    Ok(())
}

fn take<T: ByteIO>(data: &[u8], offset: usize) -> Result<T::Bytes> {
    let size = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(size) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    match T::Bytes::try_from(&data[offset..end]) {
        Ok(bytes) => Ok(bytes),
        Err(_) => Err(out_of_bounds_error!()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn test_read_be_u8() {
        let result = read_be::<u8>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x01);
    }

    #[test]
    fn test_read_be_u16() {
        let result = read_be::<u16>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0102);
    }

    #[test]
    fn test_read_be_u32() {
        let result = read_be::<u32>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0102_0304);
    }

    #[test]
    fn test_read_be_u64() {
        let result = read_be::<u64>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_read_be_entry_point_swap() {
        let stored = [0x00, 0x01, 0x86, 0xA0];
        assert_eq!(read_be::<u32>(&stored).unwrap(), 100_000);
    }

    #[test]
    fn test_read_be_at_sequence() {
        let mut offset = 0;
        let first = read_be_at::<u16>(&TEST_BUFFER, &mut offset).unwrap();
        let second = read_be_at::<u32>(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(first, 0x0102);
        assert_eq!(second, 0x0304_0506);
        assert_eq!(offset, 6);
    }

    #[test]
    fn test_read_be_out_of_bounds() {
        let mut offset = 6;
        let result = read_be_at::<u32>(&TEST_BUFFER, &mut offset);
        assert!(matches!(result, Err(Error::OutOfBounds { .. })));
        assert_eq!(offset, 6);

        let mut offset = usize::MAX;
        assert!(read_be_at::<u8>(&TEST_BUFFER, &mut offset).is_err());
    }

    #[test]
    fn test_write_be_roundtrip_offsets() {
        let mut data = [0u8; 6];
        let mut offset = 0;
        write_be_at(&mut data, &mut offset, 0xAABBu16).unwrap();
        write_be_at(&mut data, &mut offset, 0x1122_3344u32).unwrap();
        assert_eq!(data, [0xAA, 0xBB, 0x11, 0x22, 0x33, 0x44]);
        assert_eq!(offset, 6);

        assert!(write_be(&mut data[5..], 0u16).is_err());
    }
}
