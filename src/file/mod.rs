//! Input file abstraction for module images.
//!
//! This module provides the read side of the loader: a [`crate::file::File`] wrapping either a
//! memory-mapped file on disk or an owned in-memory buffer, plus the low-level
//! [`crate::file::parser::Parser`] and [`crate::file::io`] helpers that decode big-endian
//! header fields from it.
//!
//! # Key Components
//!
//! - [`crate::file::File`] - Module bytes, independent of where they came from
//! - [`crate::file::Backend`] - Trait for different data sources (disk files, memory buffers)
//! - [`crate::file::parser::Parser`] - Cursor over the header chain
//! - [`crate::file::io`] - Endian-aware primitive reads and writes
//!
//! # Examples
//!
//! ```rust,no_run
//! use xenon_host::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("default.xex"))?;
//! println!("Module is {} bytes", file.len());
//! assert_eq!(file.data_slice(0, 4)?, b"XEX2");
//! # Ok::<(), xenon_host::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{Error, Result};
use memory::Memory;
use physical::Physical;

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of module data, allowing for both in-memory and on-disk
/// representations.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    /// * `offset` - The offset to start the slice from.
    /// * `len` - The length of the slice.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is invalid.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// Raw module bytes loaded from disk or memory.
///
/// `File` is the temporary buffer the loader parses; it is dropped once the image has been
/// expanded into guest memory.
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
}

impl File {
    /// Loads a module from the given path.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be opened and
    /// [`crate::Error::Empty`] if it has no content.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Wraps a module that is already loaded into memory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Empty`] if the buffer is empty.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Error::Empty);
        }

        Ok(File {
            data: Box::new(data),
        })
    }

    /// Returns the total size of the loaded file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the file has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Returns the raw bytes of the whole file.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the file.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }
}
