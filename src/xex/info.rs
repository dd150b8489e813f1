//! Typed views of the XEX2 header blocks the loader needs.
//!
//! - [`SecurityInfo`] - image size and load address, found at the header's security offset
//! - [`FileFormatInfo`] - encryption and compression of the payload (`0x000003FF`)
//! - [`ResourceInfo`] - embedded resource table (`0x000002FF`)

use std::borrow::Cow;

use strum::{Display, EnumCount, EnumIter, FromRepr};

use crate::{file::parser::Parser, Error, Result};

/// Length of the RSA signature inside the security info.
const RSA_SIGNATURE_SIZE: usize = 0x100;

/// Bytes of the security info that have to be present for [`SecurityInfo::parse`].
pub const SECURITY_INFO_MIN_SIZE: usize = 0x114;

/// Image placement fields of the security info.
///
/// ```text
/// +0x000  header size
/// +0x004  image size
/// +0x008  RSA signature (256 bytes)
/// +0x108  unknown
/// +0x10C  image flags
/// +0x110  load address
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecurityInfo {
    /// Size of the security info block
    pub header_size: u32,
    /// Size of the decoded image in guest memory
    pub image_size: u32,
    /// Image flags
    pub image_flags: u32,
    /// Guest address the decoded image is placed at
    pub load_address: u32,
}

impl SecurityInfo {
    /// Reads the security info located at `offset` in the module.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the block does not fit in `data`.
    pub fn parse(data: &[u8], offset: usize) -> Result<SecurityInfo> {
        match offset.checked_add(SECURITY_INFO_MIN_SIZE) {
            Some(end) if end <= data.len() => {}
            _ => return Err(out_of_bounds_error!()),
        }

        let mut parser = Parser::new(data);
        parser.seek(offset)?;

        let header_size = parser.read_be::<u32>()?;
        let image_size = parser.read_be::<u32>()?;
        parser.advance_by(RSA_SIGNATURE_SIZE)?;
        let _unknown = parser.read_be::<u32>()?;
        let image_flags = parser.read_be::<u32>()?;
        let load_address = parser.read_be::<u32>()?;

        Ok(SecurityInfo {
            header_size,
            image_size,
            image_flags,
            load_address,
        })
    }
}

/// Payload encryption of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, FromRepr)]
#[repr(u16)]
pub enum EncryptionType {
    /// Plain payload
    None = 0,
    /// AES encrypted with the title key
    Normal = 1,
}

/// Payload compression of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, FromRepr, EnumIter, EnumCount)]
#[repr(u16)]
pub enum CompressionType {
    /// Payload is the image, byte for byte
    None = 0,
    /// Payload is a run of data blocks, each followed by implicit zero bytes
    Basic = 1,
    /// LZX compressed
    Normal = 2,
    /// Delta patch against a base image
    Delta = 3,
}

/// One block of a `BASIC` compressed payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BasicBlock {
    /// Bytes copied from the payload
    pub data_size: u32,
    /// Zero bytes appended after the copied data
    pub zero_size: u32,
}

/// Payload encoding the [`crate::xex::compression::decode`] function can expand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionFormat<'a> {
    /// Payload is copied as is
    None,
    /// Payload is expanded block by block
    Basic(&'a [BasicBlock]),
}

/// The file-format info block.
///
/// ```text
/// +0x00  info size
/// +0x04  encryption type (u16)
/// +0x06  compression type (u16)
/// +0x08  BASIC only: (data size: u32, zero size: u32) * (info size / 8 - 1)
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileFormatInfo {
    /// Raw encryption type
    pub encryption_type: u16,
    /// Raw compression type
    pub compression_type: u16,
    /// Block table, empty unless the compression type is `BASIC`
    pub blocks: Vec<BasicBlock>,
}

impl FileFormatInfo {
    /// Parses the block referenced by the `FILE_FORMAT_INFO` optional header.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the declared size is too small to hold the fixed
    /// fields, or [`crate::Error::OutOfBounds`] if the block table runs past `data`.
    pub fn parse(data: &[u8]) -> Result<FileFormatInfo> {
        let mut parser = Parser::new(data);

        let info_size = parser.read_be::<u32>()? as usize;
        if info_size < 8 {
            return Err(malformed_error!(
                "File format info size {} is too small",
                info_size
            ));
        }

        let encryption_type = parser.read_be::<u16>()?;
        let compression_type = parser.read_be::<u16>()?;

        let mut blocks = Vec::new();
        if compression_type == CompressionType::Basic as u16 {
            let count = info_size / 8 - 1;
            if count > parser.remaining() / 8 {
                return Err(out_of_bounds_error!());
            }

            blocks.reserve_exact(count);
            for _ in 0..count {
                blocks.push(BasicBlock {
                    data_size: parser.read_be::<u32>()?,
                    zero_size: parser.read_be::<u32>()?,
                });
            }
        }

        Ok(FileFormatInfo {
            encryption_type,
            compression_type,
            blocks,
        })
    }

    /// Returns the encryption type, `None` for values this crate does not know.
    #[must_use]
    pub fn encryption(&self) -> Option<EncryptionType> {
        EncryptionType::from_repr(self.encryption_type)
    }

    /// Returns the compression type, `None` for values this crate does not know.
    #[must_use]
    pub fn compression(&self) -> Option<CompressionType> {
        CompressionType::from_repr(self.compression_type)
    }

    /// Returns the payload encoding, if it is one the decoder can expand.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnsupportedCompression`] for LZX, delta and unknown compression
    /// types.
    pub fn format(&self) -> Result<CompressionFormat<'_>> {
        match self.compression() {
            Some(CompressionType::None) => Ok(CompressionFormat::None),
            Some(CompressionType::Basic) => Ok(CompressionFormat::Basic(&self.blocks)),
            Some(CompressionType::Normal | CompressionType::Delta) | None => {
                Err(Error::UnsupportedCompression(self.compression_type))
            }
        }
    }
}

/// One entry of the resource info table.
///
/// ```text
/// +0x00  name    (8 bytes, NUL padded)
/// +0x08  offset  guest address of the resource
/// +0x0C  size
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceInfo {
    /// Raw resource name
    pub resource_id: [u8; 8],
    /// Guest address of the resource data
    pub offset: u32,
    /// Size of the resource data
    pub size_of_data: u32,
}

impl ResourceInfo {
    /// Size of a single table entry.
    pub const SIZE: usize = 16;

    /// Parses every entry of the block referenced by the `RESOURCE_INFO` optional header.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the declared size is smaller than its own size
    /// field and [`crate::Error::OutOfBounds`] if the entries run past `data`.
    pub fn parse_table(data: &[u8]) -> Result<Vec<ResourceInfo>> {
        let mut parser = Parser::new(data);

        let size_of_header = parser.read_be::<u32>()? as usize;
        if size_of_header < 4 {
            return Err(malformed_error!(
                "Resource info size {} is too small",
                size_of_header
            ));
        }

        let count = (size_of_header - 4) / Self::SIZE;
        if count > parser.remaining() / Self::SIZE {
            return Err(out_of_bounds_error!());
        }

        let mut resources = Vec::with_capacity(count);
        for _ in 0..count {
            let mut resource_id = [0u8; 8];
            resource_id.copy_from_slice(parser.read_bytes(8)?);

            resources.push(ResourceInfo {
                resource_id,
                offset: parser.read_be::<u32>()?,
                size_of_data: parser.read_be::<u32>()?,
            });
        }

        Ok(resources)
    }

    /// The resource name without its NUL padding.
    #[must_use]
    pub fn name(&self) -> Cow<'_, str> {
        let len = self
            .resource_id
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.resource_id.len());
        String::from_utf8_lossy(&self.resource_id[..len])
    }
}
