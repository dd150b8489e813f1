use crate::xdbf::{Language, Namespace, STRING_TABLE_SIGNATURE, XDBF_SIGNATURE};

/// Raw achievement record for [`XdbfBuilder::with_achievements`].
#[derive(Clone, Copy)]
pub struct AchievementDef {
    pub id: u16,
    pub name_id: u16,
    pub unlocked_description_id: u16,
    pub locked_description_id: u16,
    pub image_id: u32,
    pub gamerscore: u16,
    pub flags: u32,
}

/// Assembles an XDBF directory.
///
/// Entries are laid out in insertion order. The entry table gets one spare slot and the free
/// table a single empty entry, so table lengths and used counts differ like in real blobs.
#[derive(Default)]
pub struct XdbfBuilder {
    entries: Vec<(u16, u64, Vec<u8>)>,
}

fn tag(name: &str) -> u64 {
    name.bytes().fold(0u64, |id, byte| (id << 8) | u64::from(byte))
}

fn block_header(magic: &str, size: usize) -> Vec<u8> {
    let mut header = Vec::new();
    header.extend_from_slice(&(tag(magic) as u32).to_be_bytes());
    header.extend_from_slice(&1u32.to_be_bytes());
    header.extend_from_slice(&(size as u32).to_be_bytes());
    header
}

impl XdbfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, namespace: Namespace, id: u64, data: &[u8]) -> Self {
        self.entries.push((namespace as u16, id, data.to_vec()));
        self
    }

    pub fn with_metadata(self, name: &str, data: &[u8]) -> Self {
        self.with_entry(Namespace::Metadata, tag(name), data)
    }

    pub fn with_image(self, id: u64, data: &[u8]) -> Self {
        self.with_entry(Namespace::Image, id, data)
    }

    pub fn with_strings(self, language: Language, strings: &[(u16, &str)]) -> Self {
        let body: usize = strings.iter().map(|(_, value)| 4 + value.len()).sum();

        let mut table = Vec::new();
        table.extend_from_slice(&STRING_TABLE_SIGNATURE.to_be_bytes());
        table.extend_from_slice(&1u32.to_be_bytes());
        table.extend_from_slice(&((14 + body) as u32).to_be_bytes());
        table.extend_from_slice(&(strings.len() as u16).to_be_bytes());
        for (id, value) in strings {
            table.extend_from_slice(&id.to_be_bytes());
            table.extend_from_slice(&(value.len() as u16).to_be_bytes());
            table.extend_from_slice(value.as_bytes());
        }

        self.with_entry(Namespace::StringTable, language as u64, &table)
    }

    pub fn with_default_language(self, language: Language) -> Self {
        let mut block = block_header("XSTC", 16);
        block.extend_from_slice(&(language as u32).to_be_bytes());
        self.with_metadata("XSTC", &block)
    }

    pub fn with_achievements(self, achievements: &[AchievementDef]) -> Self {
        let mut block = block_header("XACH", 14 + 36 * achievements.len());
        block.extend_from_slice(&(achievements.len() as u16).to_be_bytes());
        for achievement in achievements {
            block.extend_from_slice(&achievement.id.to_be_bytes());
            block.extend_from_slice(&achievement.name_id.to_be_bytes());
            block.extend_from_slice(&achievement.unlocked_description_id.to_be_bytes());
            block.extend_from_slice(&achievement.locked_description_id.to_be_bytes());
            block.extend_from_slice(&achievement.image_id.to_be_bytes());
            block.extend_from_slice(&achievement.gamerscore.to_be_bytes());
            block.extend_from_slice(&0u16.to_be_bytes());
            block.extend_from_slice(&achievement.flags.to_be_bytes());
            block.extend_from_slice(&[0u8; 16]);
        }
        self.with_metadata("XACH", &block)
    }

    pub fn build(self) -> Vec<u8> {
        let entry_table_length = self.entries.len() + 1;
        let free_table_length = 1;

        let mut data = Vec::new();
        data.extend_from_slice(&XDBF_SIGNATURE.to_be_bytes());
        data.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        data.extend_from_slice(&(entry_table_length as u32).to_be_bytes());
        data.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        data.extend_from_slice(&(free_table_length as u32).to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());

        let mut content = Vec::new();
        for (namespace, id, bytes) in &self.entries {
            data.extend_from_slice(&namespace.to_be_bytes());
            data.extend_from_slice(&id.to_be_bytes());
            data.extend_from_slice(&(content.len() as u32).to_be_bytes());
            data.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            content.extend_from_slice(bytes);
        }
        // Spare entry slot and the empty free table entry
        data.extend_from_slice(&[0u8; 18]);
        data.extend_from_slice(&[0u8; 8]);

        data.extend_from_slice(&content);
        data
    }
}
