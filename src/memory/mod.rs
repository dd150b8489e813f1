//! Emulated guest address space.
//!
//! The recompiled guest code was translated ahead of time under the assumption of a flat 32-bit
//! address space starting at zero. [`GuestMemory`] reproduces that space on the host: it reserves
//! one contiguous block the size of the whole guest range, so every guest address `a` lives at
//! `base + a` and pointer arithmetic done by recompiled code yields the same relative results as
//! on the console.
//!
//! # Layout
//!
//! ```text
//! base                                                           base + size
//! | guard (PROT_NONE) |              guest read/write memory              |
//! 0x0000_0000         0x0000_1000                               0xFFFF_FFFF
//! ```
//!
//! The first page is made inaccessible so that guest null and near-null dereferences fault
//! instead of corrupting host state, matching the console's behavior.
//!
//! # Translation
//!
//! - [`GuestMemory::translate`] is the zero-overhead path used by generated code and host
//!   functions. It is a plain `base + address`; only debug builds check the bound.
//! - [`GuestMemory::try_translate`], [`GuestMemory::slice`], [`GuestMemory::slice_mut`],
//!   [`GuestMemory::read_be`] and [`GuestMemory::write_be`] are bounds-checked and refuse to touch
//!   the guard region.
//!
//! # Example
//!
//! ```rust
//! use xenon_host::{GuestMemory, GuestMemoryConfig};
//!
//! let config = GuestMemoryConfig::new().with_size(0x10_0000);
//! let mut memory = GuestMemory::new(&config, &[])?;
//!
//! memory.write_be::<u32>(0x8000, 0xDEAD_BEEF)?;
//! assert_eq!(memory.slice(0x8000, 4)?, &[0xDE, 0xAD, 0xBE, 0xEF]);
//! assert_eq!(memory.translate(0x8000), unsafe { memory.base().add(0x8000) });
//! # Ok::<(), xenon_host::Error>(())
//! ```

mod functions;

pub use functions::{FunctionMapping, FunctionTable, HostFunction};

use memmap2::{MmapMut, MmapOptions};
use region::Protection;
use tracing::{debug, info};

use crate::{
    file::io::{read_be, write_be, ByteIO},
    Error, Result,
};

/// Size of the full guest address space (4 GiB).
pub const GUEST_MEMORY_SIZE: usize = 0x1_0000_0000;

/// Size of the inaccessible region at guest address zero.
pub const GUARD_PAGE_SIZE: usize = 0x1000;

/// Configuration for reserving a [`GuestMemory`].
///
/// The defaults describe the console: a 4 GiB space with a single protected 4 KiB page at
/// address zero. A smaller size is useful for tools and tests that never touch high guest
/// addresses.
///
/// # Example
///
/// ```rust
/// use xenon_host::GuestMemoryConfig;
///
/// let config = GuestMemoryConfig::new()
///     .with_size(0x100_0000)
///     .with_guard_size(0x1_0000);
/// assert_eq!(config.size, 0x100_0000);
/// ```
#[derive(Clone, Debug)]
pub struct GuestMemoryConfig {
    /// Total size of the reserved block in bytes.
    pub size: usize,
    /// Bytes at the start of the block that are made inaccessible. Rounded up to the host page
    /// size.
    pub guard_size: usize,
}

impl Default for GuestMemoryConfig {
    fn default() -> Self {
        Self {
            size: GUEST_MEMORY_SIZE,
            guard_size: GUARD_PAGE_SIZE,
        }
    }
}

impl GuestMemoryConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the reserved size.
    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Overrides the size of the protected region at address zero.
    #[must_use]
    pub fn with_guard_size(mut self, guard_size: usize) -> Self {
        self.guard_size = guard_size;
        self
    }
}

/// The reserved host block standing in for the guest's flat 32-bit address space.
///
/// A `GuestMemory` is created once during startup, before any guest code runs, and lives until
/// shutdown. It also owns the [`FunctionTable`] of host redirects installed at construction.
pub struct GuestMemory {
    /// Start of the reservation; stays valid for as long as `block` is alive.
    base: *mut u8,
    /// Size of the reservation in bytes.
    size: usize,
    /// Size of the inaccessible region at `base`.
    guard_size: usize,
    /// Host redirects keyed by guest address.
    functions: FunctionTable,
    /// Owns the mapping; dropping it releases the whole block. Never dereferenced directly
    /// because it covers the guard region.
    _block: MmapMut,
}

// The block is never moved, resized or unmapped while a `GuestMemory` exists, and all mutation
// through safe methods requires `&mut self`.
unsafe impl Send for GuestMemory {}
unsafe impl Sync for GuestMemory {}

impl GuestMemory {
    /// Reserves the guest address space and installs the host function redirects.
    ///
    /// The block is mapped read/write, then its first `config.guard_size` bytes (rounded up to
    /// the host page size) are made inaccessible. `mappings` is walked once, in order, up to its
    /// first sentinel; see [`FunctionTable::install`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Reservation`] if the configuration is unusable, the host cannot
    /// provide the address range, or the guard region cannot be protected. Callers are expected
    /// to abort startup.
    pub fn new(config: &GuestMemoryConfig, mappings: &[FunctionMapping]) -> Result<GuestMemory> {
        let page_size = region::page::size();
        let guard_size = config
            .guard_size
            .max(GUARD_PAGE_SIZE)
            .checked_next_multiple_of(page_size)
            .ok_or_else(|| {
                Error::Reservation(format!(
                    "guard size {:#x} overflows when rounded to the host page size",
                    config.guard_size
                ))
            })?;

        if config.size > GUEST_MEMORY_SIZE {
            return Err(Error::Reservation(format!(
                "size {:#x} exceeds the 32-bit guest range",
                config.size
            )));
        }
        if config.size % page_size != 0 {
            return Err(Error::Reservation(format!(
                "size {:#x} is not a multiple of the host page size {:#x}",
                config.size, page_size
            )));
        }
        if config.size <= guard_size {
            return Err(Error::Reservation(format!(
                "size {:#x} leaves no room after the {:#x} byte guard",
                config.size, guard_size
            )));
        }

        let mut block = MmapOptions::new()
            .len(config.size)
            .map_anon()
            .map_err(|error| {
                Error::Reservation(format!("mmap of {:#x} bytes failed: {error}", config.size))
            })?;
        let base = block.as_mut_ptr();

        unsafe { region::protect(base.cast_const(), guard_size, Protection::NONE) }.map_err(
            |error| Error::Reservation(format!("protecting the guard region failed: {error}")),
        )?;

        info!(
            "reserved {:#x} bytes of guest memory at {:p} ({:#x} byte guard)",
            config.size, base, guard_size
        );

        let mut functions = FunctionTable::new();
        let installed = functions.install(mappings);
        debug!("installed {installed} host function redirects");

        Ok(GuestMemory {
            base,
            size: config.size,
            guard_size,
            functions,
            _block: block,
        })
    }

    /// Host address of guest address zero.
    #[must_use]
    pub fn base(&self) -> *mut u8 {
        self.base
    }

    /// Size of the reserved block in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Size of the inaccessible region at guest address zero.
    #[must_use]
    pub fn guard_size(&self) -> usize {
        self.guard_size
    }

    /// Translates a guest address into a host pointer: `base + address`.
    ///
    /// This never fails and performs no bounds check in release builds. With the default 4 GiB
    /// reservation every `u32` is in range; with a smaller reservation keeping `address` below
    /// [`GuestMemory::size`] is the caller's job. Dereferencing the result is only sound outside
    /// the guard region.
    #[inline]
    #[must_use]
    pub fn translate(&self, address: u32) -> *mut u8 {
        debug_assert!(
            (address as usize) < self.size,
            "guest address {address:#010X} outside of the {:#x} byte reservation",
            self.size
        );
        self.base.wrapping_add(address as usize)
    }

    /// Bounds-checked [`GuestMemory::translate`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if `address` lies in the guard region or past the
    /// end of the reservation.
    pub fn try_translate(&self, address: u32) -> Result<*mut u8> {
        self.check(address, 1)?;
        Ok(self.translate(address))
    }

    /// Maps a host pointer back to its guest address, if it lies inside the reservation.
    #[must_use]
    pub fn guest_address(&self, host: *const u8) -> Option<u32> {
        let offset = (host as usize).checked_sub(self.base as usize)?;
        if offset >= self.size {
            return None;
        }
        u32::try_from(offset).ok()
    }

    /// Borrows `len` bytes of guest memory starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the range touches the guard region or leaves the
    /// reservation.
    pub fn slice(&self, address: u32, len: usize) -> Result<&[u8]> {
        self.check(address, len)?;
        Ok(unsafe { std::slice::from_raw_parts(self.translate(address).cast_const(), len) })
    }

    /// Mutably borrows `len` bytes of guest memory starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the range touches the guard region or leaves the
    /// reservation.
    pub fn slice_mut(&mut self, address: u32, len: usize) -> Result<&mut [u8]> {
        self.check(address, len)?;
        Ok(unsafe { std::slice::from_raw_parts_mut(self.translate(address), len) })
    }

    /// Reads a big-endian value of type `T` from guest memory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] for addresses in the guard region or past the end.
    pub fn read_be<T: ByteIO>(&self, address: u32) -> Result<T> {
        read_be(self.slice(address, std::mem::size_of::<T>())?)
    }

    /// Writes `value` to guest memory in big-endian byte order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] for addresses in the guard region or past the end.
    pub fn write_be<T: ByteIO>(&mut self, address: u32, value: T) -> Result<()> {
        write_be(self.slice_mut(address, std::mem::size_of::<T>())?, value)
    }

    /// Registers a host function for `guest`.
    ///
    /// Only valid during startup, before guest code runs. The first redirect registered for an
    /// address wins; see [`FunctionTable::insert`].
    pub fn insert_function(&mut self, guest: u32, host: HostFunction) -> bool {
        self.functions.insert(guest, host)
    }

    /// Returns the host function that replaces the guest code at `guest`, if any.
    #[inline]
    #[must_use]
    pub fn function(&self, guest: u32) -> Option<HostFunction> {
        self.functions.get(guest)
    }

    /// The installed host function redirects.
    #[must_use]
    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    fn check(&self, address: u32, len: usize) -> Result<()> {
        let start = address as usize;
        if start < self.guard_size {
            return Err(out_of_bounds_error!());
        }

        match start.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(out_of_bounds_error!()),
        }
    }
}

impl std::fmt::Debug for GuestMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestMemory")
            .field("base", &self.base)
            .field("size", &format_args!("{:#x}", self.size))
            .field("guard_size", &format_args!("{:#x}", self.guard_size))
            .field("functions", &self.functions.len())
            .finish()
    }
}
