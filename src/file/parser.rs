//! Cursor-based parser over big-endian binary structures.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a small cursor over a byte
//! slice used for decoding the XEX2 header chain and the XDBF resource directory. All reads are
//! bounds-checked and return [`crate::Error::OutOfBounds`] instead of panicking when a header
//! field claims more data than the buffer holds.
//!
//! # Key Components
//!
//! - [`crate::file::parser::Parser::seek`] - Move to a specific position
//! - [`crate::file::parser::Parser::advance_by`] - Skip bytes
//! - [`crate::file::parser::Parser::read_be`] - Read big-endian primitives
//! - [`crate::file::parser::Parser::read_bytes`] - Borrow a sub-slice of the input
//!
//! # Usage Examples
//!
//! ```rust
//! use xenon_host::Parser;
//!
//! let data = [0x58, 0x45, 0x58, 0x32, 0x00, 0x00, 0x00, 0x01];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_bytes(4)?, b"XEX2");
//! assert_eq!(parser.read_be::<u32>()?, 1);
//! assert!(!parser.has_more_data());
//! # Ok::<(), xenon_host::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, ByteIO},
    Result,
};

/// A binary data parser for reading big-endian container structures.
///
/// `Parser` maintains an internal position cursor and provides bounds checking to prevent
/// buffer overruns when reading malformed or truncated data.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of bytes left between the cursor and the end of the buffer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the current position to the specified index.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xenon_host::Parser;
    /// let data = [0x01, 0x02, 0x03, 0x04];
    /// let mut parser = Parser::new(&data);
    ///
    /// parser.seek(2)?;
    /// assert_eq!(parser.read_be::<u16>()?, 0x0304);
    /// assert!(parser.seek(4).is_err());
    /// # Ok::<(), xenon_host::Error>(())
    /// ```
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Read a type `T` from the current position in big-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_be<T: ByteIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Borrow the next `len` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(len)?;
        Ok(&self.data[start..self.position])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_sequential_reads() {
        let data = [0x00, 0x00, 0x10, 0x00, 0xAB, 0xCD, 0x01];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_be::<u32>().unwrap(), 0x1000);
        assert_eq!(parser.read_be::<u16>().unwrap(), 0xABCD);
        assert_eq!(parser.remaining(), 1);
        assert_eq!(parser.read_be::<u8>().unwrap(), 0x01);
        assert!(!parser.has_more_data());
        assert!(matches!(
            parser.read_be::<u8>(),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_read_bytes_borrows_input() {
        let data = *b"XDBF\x00\x01";
        let mut parser = Parser::new(&data);

        let magic = parser.read_bytes(4).unwrap();
        assert_eq!(magic, b"XDBF");
        assert_eq!(parser.pos(), 4);
        assert!(parser.read_bytes(3).is_err());
        assert_eq!(parser.pos(), 4);
    }

    #[test]
    fn test_advance_by_overflow() {
        let data = [0u8; 4];
        let mut parser = Parser::new(&data);

        assert!(parser.advance_by(usize::MAX).is_err());
        parser.advance_by(4).unwrap();
        assert_eq!(parser.remaining(), 0);
        assert!(parser.advance_by(1).is_err());
    }

    #[test]
    fn test_empty_input() {
        let parser = Parser::new(&[]);
        assert!(parser.is_empty());
        assert_eq!(parser.len(), 0);
        assert!(!parser.has_more_data());
    }
}
