//! XEX2 executable container.
//!
//! XEX2 wraps a title's PE image for the console: a big-endian header with a directory of
//! optional headers, a security info block describing where the image goes in guest memory, and
//! a payload that is optionally compressed. This module parses the container into a
//! [`crate::xex::Xex2Module`]; placing the image into guest memory is the job of
//! [`crate::loader::ModuleLoader`].
//!
//! # Key Components
//!
//! - [`crate::xex::Xex2Module`] - Parsed view of a whole module file
//! - [`crate::xex::Xex2Header`] - Fixed header and optional-header directory
//! - [`crate::xex::SecurityInfo`] - Image size and load address
//! - [`crate::xex::FileFormatInfo`] - Payload encryption and compression
//! - [`crate::xex::ResourceInfo`] - Embedded resource table
//! - [`crate::xex::compression`] - Payload decoder
//!
//! # Examples
//!
//! ```rust,no_run
//! use xenon_host::{File, xex::Xex2Module};
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("default.xex"))?;
//! let module = Xex2Module::parse(file.data())?;
//!
//! println!("entry point: {:#010X}", module.entry_point.unwrap_or_default());
//! println!("image: {:#010X} bytes at {:#010X}", module.security.image_size, module.security.load_address);
//! # Ok::<(), xenon_host::Error>(())
//! ```

pub mod compression;

mod header;
mod info;

pub use header::{
    header_key, ModuleFlags, OptionalHeader, OptionalHeaderValue, Xex2Header, XEX2_HEADER_SIZE,
    XEX2_MAGIC,
};
pub use info::{
    BasicBlock, CompressionFormat, CompressionType, EncryptionType, FileFormatInfo, ResourceInfo,
    SecurityInfo, SECURITY_INFO_MIN_SIZE,
};

use crate::Result;

/// A parsed XEX2 module, borrowing the file it was read from.
#[derive(Clone, Debug)]
pub struct Xex2Module<'a> {
    data: &'a [u8],
    /// Fixed header and optional-header directory
    pub header: Xex2Header,
    /// Image placement
    pub security: SecurityInfo,
    /// Payload encoding
    pub file_format: FileFormatInfo,
    /// Guest address execution starts at, if the module has one
    pub entry_point: Option<u32>,
    /// Embedded resources, in table order
    pub resources: Vec<ResourceInfo>,
}

impl<'a> Xex2Module<'a> {
    /// Parses the headers of a module.
    ///
    /// The payload is not touched; see [`crate::xex::Xex2Module::payload`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotSupported`] for files that aren't XEX2,
    /// [`crate::Error::Malformed`] if the file-format info is missing or inconsistent, and
    /// [`crate::Error::OutOfBounds`] if any header reaches past the end of `data`.
    pub fn parse(data: &'a [u8]) -> Result<Xex2Module<'a>> {
        let header = Xex2Header::parse(data)?;
        let security = SecurityInfo::parse(data, header.security_offset as usize)?;

        let file_format = match Self::block(&header, data, header_key::FILE_FORMAT_INFO)? {
            Some(block) => FileFormatInfo::parse(block)?,
            None => return Err(malformed_error!("Module has no file format info")),
        };

        let entry_point = match header.find(header_key::ENTRY_POINT) {
            Some(entry) => match entry.resolve(data)? {
                OptionalHeaderValue::Inline(value) => Some(value),
                OptionalHeaderValue::Data(_) => None,
            },
            None => None,
        };

        let resources = match Self::block(&header, data, header_key::RESOURCE_INFO)? {
            Some(block) => ResourceInfo::parse_table(block)?,
            None => Vec::new(),
        };

        Ok(Xex2Module {
            data,
            header,
            security,
            file_format,
            entry_point,
            resources,
        })
    }

    fn block(header: &Xex2Header, data: &'a [u8], key: u32) -> Result<Option<&'a [u8]>> {
        let Some(entry) = header.find(key) else {
            return Ok(None);
        };

        match entry.resolve(data)? {
            OptionalHeaderValue::Data(block) => Ok(Some(block)),
            OptionalHeaderValue::Inline(_) => Ok(None),
        }
    }

    /// Looks up an optional header and resolves it against the module bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the header's block does not fit in the file.
    pub fn optional_header(&self, key: u32) -> Result<Option<OptionalHeaderValue<'a>>> {
        match self.header.find(key) {
            Some(entry) => entry.resolve(self.data).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the payload, everything after the headers.
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        // Header parsing guarantees header_size <= data.len()
        &self.data[self.header.header_size as usize..]
    }

    /// Returns the raw module bytes.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}
