//! XDBF title resource directory.
//!
//! Titles embed their metadata (localized strings, achievement definitions, icons) as an XDBF
//! blob inside the image. After loading, the blob sits in guest memory and
//! [`crate::xdbf::XdbfView`] reads it in place without copying.
//!
//! # Layout
//!
//! All fields are big-endian.
//!
//! ```text
//! header       signature "XDBF", version, entry table length, entry count,
//!              free table length, free count                      (6 * u32)
//! entry table  (namespace: u16, id: u64, offset: u32, length: u32) * entry table length
//! free table   (offset: u32, length: u32) * free table length
//! content      entry offsets are relative to the start of this area
//! ```
//!
//! Entries live in one of three namespaces: metadata blocks keyed by a four character tag
//! (`XACH`, `XSTC`, ...), images keyed by image id, and string tables keyed by language.
//!
//! # Examples
//!
//! ```rust
//! use xenon_host::xdbf::{Language, XdbfView};
//!
//! // A view over anything that isn't an XDBF blob is empty
//! let view = XdbfView::new(&[0u8; 16]);
//! assert!(view.is_empty());
//! assert!(view.lookup("XACH").is_none());
//! assert!(view.title(Language::English).is_none());
//! ```

mod achievements;

pub use achievements::{Achievement, ACHIEVEMENT_TAG};

use strum::{Display, EnumCount, EnumIter, FromRepr};
use tracing::debug;

use crate::{file::parser::Parser, Result};

/// `XDBF`
pub const XDBF_SIGNATURE: u32 = 0x5844_4246;
/// `XSTR`, magic of a string table block.
pub const STRING_TABLE_SIGNATURE: u32 = 0x5853_5452;
/// String id of the title name in every string table.
pub const TITLE_STRING_ID: u16 = 0x8000;

const HEADER_SIZE: usize = 24;
const ENTRY_SIZE: usize = 18;
const FREE_ENTRY_SIZE: usize = 8;
/// magic, version, size, count
const BLOCK_HEADER_SIZE: usize = 14;

/// Entry namespaces of an XDBF directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, FromRepr)]
#[repr(u16)]
pub enum Namespace {
    /// Metadata blocks, keyed by tag
    Metadata = 1,
    /// Images, keyed by image id
    Image = 2,
    /// String tables, keyed by language
    StringTable = 3,
}

/// Languages a title can carry string tables for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, FromRepr, EnumIter, EnumCount)]
#[repr(u32)]
pub enum Language {
    /// English
    English = 1,
    /// Japanese
    Japanese = 2,
    /// German
    German = 3,
    /// French
    French = 4,
    /// Spanish
    Spanish = 5,
    /// Italian
    Italian = 6,
    /// Korean
    Korean = 7,
    /// Traditional Chinese
    TChinese = 8,
    /// Portuguese
    Portuguese = 9,
    /// Simplified Chinese
    SChinese = 10,
    /// Polish
    Polish = 11,
    /// Russian
    Russian = 12,
}

/// A single entry of the directory's entry table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XdbfEntry {
    /// Raw namespace, see [`Namespace`]
    pub namespace: u16,
    /// Resource id within the namespace
    pub id: u64,
    /// Offset relative to the content area
    pub offset: u32,
    /// Length in bytes
    pub length: u32,
}

impl XdbfEntry {
    fn parse(data: &[u8]) -> Result<XdbfEntry> {
        let mut parser = Parser::new(data);

        Ok(XdbfEntry {
            namespace: parser.read_be::<u16>()?,
            id: parser.read_be::<u64>()?,
            offset: parser.read_be::<u32>()?,
            length: parser.read_be::<u32>()?,
        })
    }
}

/// Read-only view over an XDBF directory in guest memory.
///
/// Construction never fails. If the region is too small, doesn't carry the `XDBF` signature or
/// has inconsistent table sizes, the view is empty and every lookup returns `None`. Entries
/// pointing outside of the region are skipped the same way.
#[derive(Clone, Copy, Debug, Default)]
pub struct XdbfView<'a> {
    /// Used part of the entry table
    entries: &'a [u8],
    /// Content area
    content: &'a [u8],
}

impl<'a> XdbfView<'a> {
    /// Wraps the directory stored in `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> XdbfView<'a> {
        match Self::parse(data) {
            Ok(view) => view,
            Err(error) => {
                debug!("not a usable resource directory ({} bytes): {error}", data.len());
                Self::empty()
            }
        }
    }

    /// A view without any entries.
    #[must_use]
    pub const fn empty() -> XdbfView<'a> {
        XdbfView {
            entries: &[],
            content: &[],
        }
    }

    fn parse(data: &'a [u8]) -> Result<XdbfView<'a>> {
        let mut parser = Parser::new(data);

        let signature = parser.read_be::<u32>()?;
        if signature != XDBF_SIGNATURE {
            return Err(malformed_error!("Invalid signature 0x{:08X}", signature));
        }

        let _version = parser.read_be::<u32>()?;
        let entry_table_length = parser.read_be::<u32>()? as usize;
        let entry_count = parser.read_be::<u32>()? as usize;
        let free_table_length = parser.read_be::<u32>()? as usize;
        let _free_count = parser.read_be::<u32>()?;

        if entry_count > entry_table_length {
            return Err(malformed_error!(
                "{} entries in a table of {}",
                entry_count,
                entry_table_length
            ));
        }

        let content_start = entry_table_length
            .checked_mul(ENTRY_SIZE)
            .and_then(|entries| {
                free_table_length
                    .checked_mul(FREE_ENTRY_SIZE)
                    .and_then(|free| entries.checked_add(free))
            })
            .and_then(|tables| tables.checked_add(HEADER_SIZE))
            .ok_or(out_of_bounds_error!())?;

        if content_start > data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(XdbfView {
            entries: &data[HEADER_SIZE..HEADER_SIZE + entry_count * ENTRY_SIZE],
            content: &data[content_start..],
        })
    }

    /// Returns `true` if the view has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of used entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() / ENTRY_SIZE
    }

    /// Iterates over the used entries of the entry table.
    pub fn entries(&self) -> impl Iterator<Item = XdbfEntry> + 'a {
        self.entries
            .chunks_exact(ENTRY_SIZE)
            .filter_map(|chunk| XdbfEntry::parse(chunk).ok())
    }

    /// Returns the data of the entry `id` in `namespace`.
    #[must_use]
    pub fn resource(&self, namespace: Namespace, id: u64) -> Option<&'a [u8]> {
        let content = self.content;
        let entry = self
            .entries()
            .find(|entry| entry.namespace == namespace as u16 && entry.id == id)?;

        let start = entry.offset as usize;
        let end = start.checked_add(entry.length as usize)?;
        content.get(start..end)
    }

    /// Returns the metadata block with the given tag, e.g. `"XACH"` or `"XSTC"`.
    ///
    /// The tag is interpreted as a big-endian integer id; tags longer than eight bytes never
    /// match.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&'a [u8]> {
        if name.len() > 8 {
            return None;
        }

        let id = name
            .bytes()
            .fold(0u64, |id, byte| (id << 8) | u64::from(byte));
        self.resource(Namespace::Metadata, id)
    }

    /// Returns the image with the given id.
    #[must_use]
    pub fn image(&self, id: u64) -> Option<&'a [u8]> {
        self.resource(Namespace::Image, id)
    }

    /// Returns string `id` from the string table of `language`.
    #[must_use]
    pub fn string(&self, language: Language, id: u16) -> Option<&'a str> {
        let table = self.resource(Namespace::StringTable, language as u64)?;
        find_string(table, id).ok().flatten()
    }

    /// Returns the title name in `language`.
    #[must_use]
    pub fn title(&self, language: Language) -> Option<&'a str> {
        self.string(language, TITLE_STRING_ID)
    }

    /// Returns the language the title falls back to, from the `XSTC` block.
    #[must_use]
    pub fn default_language(&self) -> Option<Language> {
        let block = self.lookup("XSTC")?;
        let mut parser = Parser::new(block);
        parser.advance_by(12).ok()?;
        Language::from_repr(parser.read_be::<u32>().ok()?)
    }
}

fn find_string(table: &[u8], id: u16) -> Result<Option<&str>> {
    let mut parser = Parser::new(table);

    let signature = parser.read_be::<u32>()?;
    if signature != STRING_TABLE_SIGNATURE {
        return Err(malformed_error!("Invalid string table signature 0x{:08X}", signature));
    }
    parser.advance_by(BLOCK_HEADER_SIZE - 6)?;
    let count = parser.read_be::<u16>()?;

    for _ in 0..count {
        let string_id = parser.read_be::<u16>()?;
        let length = parser.read_be::<u16>()?;
        let bytes = parser.read_bytes(length as usize)?;

        if string_id == id {
            return match std::str::from_utf8(bytes) {
                Ok(value) => Ok(Some(value)),
                Err(_) => Err(malformed_error!("String 0x{:04X} is not valid UTF-8", id)),
            };
        }
    }

    Ok(None)
}
