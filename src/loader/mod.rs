//! Module loader placing XEX2 images into guest memory.
//!
//! The loader is the last startup step before guest code runs. It reads the module file into a
//! temporary buffer, parses the container with [`crate::xex::Xex2Module`], expands the payload
//! straight into the image range of [`crate::GuestMemory`] and hands back what the execution
//! layer needs: the entry point and a view over the embedded resource directory.
//!
//! # Loading Process
//!
//! 1. **Read**: the file is memory mapped (or taken from a buffer) for the duration of the load
//! 2. **Parse**: header, security info and the optional headers the loader depends on
//! 3. **Validate**: encrypted payloads and compression types other than `NONE`/`BASIC` are
//!    rejected before guest memory is touched
//! 4. **Decode**: the payload is expanded into `[load_address, load_address + image_size)`
//! 5. **Resources**: the first resource table entry is wrapped into an [`crate::xdbf::XdbfView`]
//!    borrowing the freshly written guest memory
//!
//! Every failure is reported as an [`crate::Error`]; the process is expected to abort startup.
//!
//! # Examples
//!
//! ```rust,no_run
//! use xenon_host::{GuestMemory, GuestMemoryConfig, LoaderConfig, ModuleLoader};
//! use xenon_host::xdbf::Language;
//!
//! let mut memory = GuestMemory::new(&GuestMemoryConfig::default(), &[])?;
//! let loader = ModuleLoader::with_config(LoaderConfig::new().with_required_resources());
//! let module = loader.load("default.xex", &mut memory)?;
//!
//! println!("entry point: {:#010X}", module.entry_point);
//! if let Some(title) = module.resources.title(Language::English) {
//!     println!("title: {title}");
//! }
//! # Ok::<(), xenon_host::Error>(())
//! ```

use std::path::Path;

use tracing::{debug, info, warn};

use crate::{
    file::File,
    memory::GuestMemory,
    xdbf::XdbfView,
    xex::{compression, EncryptionType, ModuleFlags, ResourceInfo, Xex2Module},
    Error, Result,
};

/// Configuration for [`ModuleLoader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Whether a module without an entry point is rejected.
    ///
    /// When `true` (default) the load fails with [`crate::Error::Malformed`]. When `false` the
    /// entry point is reported as `0`, which suits library modules that are only inspected.
    pub require_entry_point: bool,

    /// Whether a module without a resource table is rejected.
    ///
    /// When `false` (default) a missing table yields an empty [`crate::xdbf::XdbfView`].
    pub require_resources: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            require_entry_point: true,
            require_resources: false,
        }
    }
}

impl LoaderConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects modules that don't carry a resource table.
    #[must_use]
    pub fn with_required_resources(mut self) -> Self {
        self.require_resources = true;
        self
    }

    /// Accepts modules without an entry point.
    #[must_use]
    pub fn without_required_entry_point(mut self) -> Self {
        self.require_entry_point = false;
        self
    }
}

/// A module placed in guest memory.
///
/// Borrows the [`crate::GuestMemory`] it was loaded into through its resource view, so the
/// image can't be modified while the view is alive.
#[derive(Clone, Copy, Debug)]
pub struct LoadedModule<'m> {
    /// Guest address execution starts at
    pub entry_point: u32,
    /// Guest address of the first image byte
    pub load_address: u32,
    /// Size of the image in guest memory
    pub image_size: u32,
    /// Module flags from the header
    pub flags: ModuleFlags,
    /// Resource table entry the view was built from
    pub resource: Option<ResourceInfo>,
    /// Title resource directory, empty if the module has none
    pub resources: XdbfView<'m>,
}

/// Loads XEX2 modules into guest memory.
#[derive(Clone, Debug, Default)]
pub struct ModuleLoader {
    config: LoaderConfig,
}

impl ModuleLoader {
    /// Creates a loader with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader with the given configuration.
    #[must_use]
    pub fn with_config(config: LoaderConfig) -> Self {
        ModuleLoader { config }
    }

    /// Returns the loader's configuration.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loads the module at `path` into `memory`.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::FileError`] / [`crate::Error::Empty`] if the file can't be read or is empty
    /// - [`crate::Error::NotSupported`] if it isn't an XEX2 module
    /// - [`crate::Error::UnsupportedEncryption`] / [`crate::Error::UnsupportedCompression`] for
    ///   payloads that can't be decoded
    /// - [`crate::Error::Corrupt`] if the payload doesn't produce exactly `image_size` bytes
    /// - [`crate::Error::OutOfBounds`] / [`crate::Error::Malformed`] for inconsistent headers or
    ///   images that don't fit into guest memory
    pub fn load<'m>(
        &self,
        path: impl AsRef<Path>,
        memory: &'m mut GuestMemory,
    ) -> Result<LoadedModule<'m>> {
        let path = path.as_ref();
        debug!("loading module {}", path.display());

        let file = File::from_file(path)?;
        self.load_file(&file, memory)
    }

    /// Loads a module that is already in host memory.
    ///
    /// # Errors
    ///
    /// Same as [`ModuleLoader::load`], minus the I/O errors.
    pub fn load_bytes<'m>(
        &self,
        data: Vec<u8>,
        memory: &'m mut GuestMemory,
    ) -> Result<LoadedModule<'m>> {
        let file = File::from_mem(data)?;
        self.load_file(&file, memory)
    }

    fn load_file<'m>(&self, file: &File, memory: &'m mut GuestMemory) -> Result<LoadedModule<'m>> {
        let module = Xex2Module::parse(file.data())?;
        let load_address = module.security.load_address;
        let image_size = module.security.image_size;

        debug!(
            "module flags {:?}, {} optional headers, payload at 0x{:X}",
            module.header.module_flags,
            module.header.optional_headers.len(),
            module.header.header_size
        );

        if module.file_format.encryption() != Some(EncryptionType::None) {
            return Err(Error::UnsupportedEncryption(
                module.file_format.encryption_type,
            ));
        }
        let format = module.file_format.format()?;

        let entry_point = match module.entry_point {
            Some(entry_point) => entry_point,
            None if self.config.require_entry_point => {
                return Err(malformed_error!("Module has no entry point"));
            }
            None => {
                warn!("module has no entry point");
                0
            }
        };

        let resource = module.resources.first().copied();
        if resource.is_none() && self.config.require_resources {
            return Err(malformed_error!("Module has no resource info"));
        }
        if let Some(info) = resource {
            memory.slice(info.offset, info.size_of_data as usize)?;
        }

        let destination = memory.slice_mut(load_address, image_size as usize)?;
        compression::decode(format, module.payload(), destination)?;
        info!(
            "loaded {} byte image at {load_address:#010X}, entry point {entry_point:#010X}",
            image_size
        );

        let memory: &'m GuestMemory = memory;
        let resources = match resource {
            Some(info) => {
                let region = memory.slice(info.offset, info.size_of_data as usize)?;
                let view = XdbfView::new(region);
                debug!(
                    "resource {} at {:#010X}, {} entries",
                    info.name(),
                    info.offset,
                    view.len()
                );
                view
            }
            None => {
                debug!("module has no resource info");
                XdbfView::empty()
            }
        };

        Ok(LoadedModule {
            entry_point,
            load_address,
            image_size,
            flags: module.header.module_flags,
            resource,
            resources,
        })
    }
}
