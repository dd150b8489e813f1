//! XEX2 fixed header and optional-header directory.
//!
//! ```text
//! +0x00  magic            "XEX2"
//! +0x04  module flags     ModuleFlags
//! +0x08  header size      file offset of the image payload
//! +0x0C  reserved
//! +0x10  security offset  file offset of the security info
//! +0x14  header count     number of optional header entries
//! +0x18  entries          (key: u32, value: u32) * count
//! ```
//!
//! The low byte of an optional header key describes its value: `0x00` means the value is stored
//! inline, `0xFF` means it is the file offset of a block that starts with its own size, and any
//! other value `n` means it is the file offset of a block of `n * 4` bytes.

use bitflags::bitflags;

use crate::{
    file::{io::read_be, parser::Parser},
    Error, Result,
};

/// The four bytes every XEX2 module starts with.
pub const XEX2_MAGIC: [u8; 4] = *b"XEX2";

/// Size of the fixed part of the header, before the optional-header directory.
pub const XEX2_HEADER_SIZE: usize = 0x18;

/// Optional header keys the loader and its callers look up.
pub mod header_key {
    /// Embedded resource directory table (size-prefixed block).
    pub const RESOURCE_INFO: u32 = 0x0000_02FF;
    /// Encryption and compression descriptor (size-prefixed block).
    pub const FILE_FORMAT_INFO: u32 = 0x0000_03FF;
    /// Guest address of the module's original base (inline).
    pub const ORIGINAL_BASE_ADDRESS: u32 = 0x0001_0001;
    /// Guest address execution starts at (inline).
    pub const ENTRY_POINT: u32 = 0x0001_0100;
    /// Guest address the image expects to be loaded at (inline).
    pub const IMAGE_BASE_ADDRESS: u32 = 0x0001_0201;
    /// Import library table (size-prefixed block).
    pub const IMPORT_LIBRARIES: u32 = 0x0001_03FF;
    /// Name of the PE file the module was built from (size-prefixed block).
    pub const ORIGINAL_PE_NAME: u32 = 0x0001_83FF;
    /// Stack size of the main thread (inline).
    pub const DEFAULT_STACK_SIZE: u32 = 0x0002_0200;
    /// Title and media identifiers (six dwords).
    pub const EXECUTION_INFO: u32 = 0x0004_0006;
}

bitflags! {
    /// Module flags stored at offset 4 of the header.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ModuleFlags: u32 {
        /// Title module
        const TITLE = 0x0000_0001;
        /// Exports to title
        const EXPORTS_TO_TITLE = 0x0000_0002;
        /// System debugger
        const SYSTEM_DEBUGGER = 0x0000_0004;
        /// DLL module
        const DLL_MODULE = 0x0000_0008;
        /// Module patch
        const MODULE_PATCH = 0x0000_0010;
        /// Full patch
        const PATCH_FULL = 0x0000_0020;
        /// Delta patch
        const PATCH_DELTA = 0x0000_0040;
        /// User mode
        const USER_MODE = 0x0000_0080;
    }
}

/// A single `(key, value)` entry of the optional-header directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptionalHeader {
    /// Header identifier, see [`header_key`].
    pub key: u32,
    /// Inline value or file offset, depending on the key's low byte.
    pub value: u32,
}

/// Resolved contents of an optional header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionalHeaderValue<'a> {
    /// Value stored directly in the directory entry.
    Inline(u32),
    /// Block of the module file the entry points at.
    Data(&'a [u8]),
}

impl OptionalHeader {
    /// Resolves this entry against the module bytes it was read from.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the referenced block is not fully contained in
    /// `data`.
    pub fn resolve<'a>(&self, data: &'a [u8]) -> Result<OptionalHeaderValue<'a>> {
        let offset = self.value as usize;
        let len = match self.key & 0xFF {
            0x00 => return Ok(OptionalHeaderValue::Inline(self.value)),
            0xFF => read_be::<u32>(data.get(offset..).unwrap_or_default())? as usize,
            dwords => dwords as usize * 4,
        };

        match offset.checked_add(len) {
            Some(end) if end <= data.len() => Ok(OptionalHeaderValue::Data(&data[offset..end])),
            _ => Err(out_of_bounds_error!()),
        }
    }
}

/// The fixed XEX2 header together with its optional-header directory.
#[derive(Clone, Debug)]
pub struct Xex2Header {
    /// Module flags
    pub module_flags: ModuleFlags,
    /// File offset of the image payload; everything before it is headers
    pub header_size: u32,
    /// File offset of the security info
    pub security_offset: u32,
    /// Optional-header directory, in file order
    pub optional_headers: Vec<OptionalHeader>,
}

impl Xex2Header {
    /// Parses the fixed header and the optional-header directory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotSupported`] if the magic isn't `XEX2`,
    /// [`crate::Error::OutOfBounds`] if the directory runs past the end of `data`, and
    /// [`crate::Error::Malformed`] if the header size points outside of the file.
    pub fn parse(data: &[u8]) -> Result<Xex2Header> {
        let mut parser = Parser::new(data);

        if parser.read_bytes(XEX2_MAGIC.len())? != XEX2_MAGIC {
            return Err(Error::NotSupported);
        }

        let module_flags = ModuleFlags::from_bits_retain(parser.read_be::<u32>()?);
        let header_size = parser.read_be::<u32>()?;
        let _reserved = parser.read_be::<u32>()?;
        let security_offset = parser.read_be::<u32>()?;
        let header_count = parser.read_be::<u32>()? as usize;

        if header_count > parser.remaining() / 8 {
            return Err(out_of_bounds_error!());
        }

        let mut optional_headers = Vec::with_capacity(header_count);
        for _ in 0..header_count {
            optional_headers.push(OptionalHeader {
                key: parser.read_be::<u32>()?,
                value: parser.read_be::<u32>()?,
            });
        }

        if (header_size as usize) < parser.pos() || header_size as usize > data.len() {
            return Err(malformed_error!(
                "Header size 0x{:X} is outside of the module (0x{:X} bytes)",
                header_size,
                data.len()
            ));
        }

        Ok(Xex2Header {
            module_flags,
            header_size,
            security_offset,
            optional_headers,
        })
    }

    /// Returns the first directory entry with the given key.
    #[must_use]
    pub fn find(&self, key: u32) -> Option<&OptionalHeader> {
        self.optional_headers.iter().find(|header| header.key == key)
    }
}
