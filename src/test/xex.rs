use crate::xex::{header_key, CompressionType, EncryptionType, ModuleFlags, XEX2_HEADER_SIZE};

/// Security info blocks are padded to this size.
const SECURITY_INFO_SIZE: usize = 0x180;

/// Assembles a XEX2 module.
///
/// Layout: fixed header, optional-header directory, file-format info, resource info, security
/// info, payload. Every offset is derived at [`XexBuilder::build`] time.
pub struct XexBuilder {
    flags: ModuleFlags,
    entry_point: Option<u32>,
    load_address: u32,
    image_size: Option<u32>,
    encryption_type: u16,
    compression_type: u16,
    blocks: Vec<(u32, u32)>,
    payload: Vec<u8>,
    resources: Vec<([u8; 8], u32, u32)>,
    inline_headers: Vec<(u32, u32)>,
    file_format: bool,
}

impl Default for XexBuilder {
    fn default() -> Self {
        XexBuilder {
            flags: ModuleFlags::TITLE,
            entry_point: None,
            load_address: 0x1_0000,
            image_size: None,
            encryption_type: EncryptionType::None as u16,
            compression_type: CompressionType::None as u16,
            blocks: Vec::new(),
            payload: Vec::new(),
            resources: Vec::new(),
            inline_headers: Vec::new(),
            file_format: true,
        }
    }
}

impl XexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flags(mut self, flags: ModuleFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_entry_point(mut self, entry_point: u32) -> Self {
        self.entry_point = Some(entry_point);
        self
    }

    pub fn with_load_address(mut self, load_address: u32) -> Self {
        self.load_address = load_address;
        self
    }

    /// Overrides the image size that is otherwise derived from the payload.
    pub fn with_image_size(mut self, image_size: u32) -> Self {
        self.image_size = Some(image_size);
        self
    }

    /// Stores `image` uncompressed.
    pub fn with_raw(mut self, image: &[u8]) -> Self {
        self.compression_type = CompressionType::None as u16;
        self.blocks.clear();
        self.payload = image.to_vec();
        self
    }

    /// Stores `payload` with a `BASIC` block table of `(data_size, zero_size)` pairs.
    pub fn with_basic(mut self, blocks: &[(u32, u32)], payload: &[u8]) -> Self {
        self.compression_type = CompressionType::Basic as u16;
        self.blocks = blocks.to_vec();
        self.payload = payload.to_vec();
        self
    }

    /// Overrides the raw compression type, keeping the payload.
    pub fn with_compression(mut self, compression_type: u16) -> Self {
        self.compression_type = compression_type;
        self
    }

    pub fn with_encryption(mut self, encryption_type: u16) -> Self {
        self.encryption_type = encryption_type;
        self
    }

    pub fn with_resource(mut self, name: &str, offset: u32, size: u32) -> Self {
        let mut id = [0u8; 8];
        for (slot, byte) in id.iter_mut().zip(name.bytes()) {
            *slot = byte;
        }
        self.resources.push((id, offset, size));
        self
    }

    /// Adds an optional header with an inline value.
    pub fn with_header(mut self, key: u32, value: u32) -> Self {
        self.inline_headers.push((key, value));
        self
    }

    pub fn without_file_format(mut self) -> Self {
        self.file_format = false;
        self
    }

    fn derived_image_size(&self) -> u32 {
        if self.compression_type == CompressionType::Basic as u16 {
            self.blocks.iter().map(|(data, zero)| data + zero).sum()
        } else {
            self.payload.len() as u32
        }
    }

    pub fn build(self) -> Vec<u8> {
        let image_size = self.image_size.unwrap_or_else(|| self.derived_image_size());

        let mut file_format = Vec::new();
        if self.file_format {
            let info_size = 8 + 8 * self.blocks.len() as u32;
            file_format.extend_from_slice(&info_size.to_be_bytes());
            file_format.extend_from_slice(&self.encryption_type.to_be_bytes());
            file_format.extend_from_slice(&self.compression_type.to_be_bytes());
            for (data_size, zero_size) in &self.blocks {
                file_format.extend_from_slice(&data_size.to_be_bytes());
                file_format.extend_from_slice(&zero_size.to_be_bytes());
            }
        }

        let mut resource_info = Vec::new();
        if !self.resources.is_empty() {
            let size = 4 + 16 * self.resources.len() as u32;
            resource_info.extend_from_slice(&size.to_be_bytes());
            for (id, offset, size) in &self.resources {
                resource_info.extend_from_slice(id);
                resource_info.extend_from_slice(&offset.to_be_bytes());
                resource_info.extend_from_slice(&size.to_be_bytes());
            }
        }

        let header_count = usize::from(self.file_format)
            + usize::from(!resource_info.is_empty())
            + usize::from(self.entry_point.is_some())
            + self.inline_headers.len();

        let file_format_offset = XEX2_HEADER_SIZE + header_count * 8;
        let resource_offset = file_format_offset + file_format.len();
        let security_offset = resource_offset + resource_info.len();
        let header_size = security_offset + SECURITY_INFO_SIZE;

        let mut entries = Vec::new();
        if !resource_info.is_empty() {
            entries.push((header_key::RESOURCE_INFO, resource_offset as u32));
        }
        if self.file_format {
            entries.push((header_key::FILE_FORMAT_INFO, file_format_offset as u32));
        }
        if let Some(entry_point) = self.entry_point {
            entries.push((header_key::ENTRY_POINT, entry_point));
        }
        entries.extend_from_slice(&self.inline_headers);

        let mut data = Vec::with_capacity(header_size + self.payload.len());
        data.extend_from_slice(b"XEX2");
        data.extend_from_slice(&self.flags.bits().to_be_bytes());
        data.extend_from_slice(&(header_size as u32).to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&(security_offset as u32).to_be_bytes());
        data.extend_from_slice(&(entries.len() as u32).to_be_bytes());
        for (key, value) in &entries {
            data.extend_from_slice(&key.to_be_bytes());
            data.extend_from_slice(&value.to_be_bytes());
        }
        data.extend_from_slice(&file_format);
        data.extend_from_slice(&resource_info);

        let mut security = vec![0u8; SECURITY_INFO_SIZE];
        security[0x000..0x004].copy_from_slice(&(SECURITY_INFO_SIZE as u32).to_be_bytes());
        security[0x004..0x008].copy_from_slice(&image_size.to_be_bytes());
        security[0x110..0x114].copy_from_slice(&self.load_address.to_be_bytes());
        data.extend_from_slice(&security);

        data.extend_from_slice(&self.payload);
        data
    }
}
