//! Achievement definitions (`XACH` block).
//!
//! ```text
//! header   magic "XACH", version, size (3 * u32), count (u16)
//! entries  id: u16, name id: u16, unlocked description id: u16, locked description id: u16,
//!          image id: u32, gamerscore: u16, padding: u16, flags: u32, unknown: 16 bytes
//! ```
//!
//! Names and descriptions are ids into the string table of the requested language, icons are
//! ids into the image namespace.

use crate::{file::parser::Parser, Result};

use super::{Language, XdbfView, BLOCK_HEADER_SIZE};

/// Metadata tag of the achievement block.
pub const ACHIEVEMENT_TAG: &str = "XACH";

const ACHIEVEMENT_ENTRY_SIZE: usize = 36;
const ACHIEVEMENT_UNKNOWN_SIZE: usize = 16;

/// An achievement, with its strings resolved for one language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Achievement<'a> {
    /// Achievement id
    pub id: u16,
    /// Display name
    pub name: Option<&'a str>,
    /// Description shown once unlocked
    pub unlocked_description: Option<&'a str>,
    /// Description shown while locked
    pub locked_description: Option<&'a str>,
    /// Image id of the icon
    pub image_id: u32,
    /// Icon data
    pub image: Option<&'a [u8]>,
    /// Gamerscore awarded
    pub gamerscore: u16,
    /// Raw flags
    pub flags: u32,
}

#[derive(Clone, Copy)]
struct AchievementRecord {
    id: u16,
    name_id: u16,
    unlocked_description_id: u16,
    locked_description_id: u16,
    image_id: u32,
    gamerscore: u16,
    flags: u32,
}

impl AchievementRecord {
    fn parse(parser: &mut Parser<'_>) -> Result<AchievementRecord> {
        let id = parser.read_be::<u16>()?;
        let name_id = parser.read_be::<u16>()?;
        let unlocked_description_id = parser.read_be::<u16>()?;
        let locked_description_id = parser.read_be::<u16>()?;
        let image_id = parser.read_be::<u32>()?;
        let gamerscore = parser.read_be::<u16>()?;
        let _padding = parser.read_be::<u16>()?;
        let flags = parser.read_be::<u32>()?;

        parser.advance_by(ACHIEVEMENT_UNKNOWN_SIZE)?;

        Ok(AchievementRecord {
            id,
            name_id,
            unlocked_description_id,
            locked_description_id,
            image_id,
            gamerscore,
            flags,
        })
    }
}

fn parse_records(block: &[u8]) -> Result<Vec<AchievementRecord>> {
    let mut parser = Parser::new(block);
    parser.advance_by(BLOCK_HEADER_SIZE - 2)?;
    let count = parser.read_be::<u16>()? as usize;

    if count > parser.remaining() / ACHIEVEMENT_ENTRY_SIZE {
        return Err(out_of_bounds_error!());
    }

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(AchievementRecord::parse(&mut parser)?);
    }

    Ok(records)
}

impl<'a> XdbfView<'a> {
    fn resolve(&self, record: AchievementRecord, language: Language) -> Achievement<'a> {
        Achievement {
            id: record.id,
            name: self.string(language, record.name_id),
            unlocked_description: self.string(language, record.unlocked_description_id),
            locked_description: self.string(language, record.locked_description_id),
            image_id: record.image_id,
            image: self.image(u64::from(record.image_id)),
            gamerscore: record.gamerscore,
            flags: record.flags,
        }
    }

    /// Returns every achievement of the title, with strings in `language`.
    ///
    /// A missing or truncated `XACH` block yields no achievements.
    #[must_use]
    pub fn achievements(&self, language: Language) -> Vec<Achievement<'a>> {
        let Some(records) = self
            .lookup(ACHIEVEMENT_TAG)
            .and_then(|block| parse_records(block).ok())
        else {
            return Vec::new();
        };

        records
            .into_iter()
            .map(|record| self.resolve(record, language))
            .collect()
    }

    /// Returns the achievement with the given id, with strings in `language`.
    #[must_use]
    pub fn achievement(&self, id: u16, language: Language) -> Option<Achievement<'a>> {
        let records = parse_records(self.lookup(ACHIEVEMENT_TAG)?).ok()?;
        records
            .into_iter()
            .find(|record| record.id == id)
            .map(|record| self.resolve(record, language))
    }
}
