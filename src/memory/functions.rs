//! Guest-address to host-function redirects.
//!
//! Recompiled guest code calls other guest functions by address. Some of those addresses must
//! not run the recompiled body at all: kernel and runtime library imports have no guest body,
//! and the host may want to replace specific guest functions with hand-written ones. The
//! [`FunctionTable`] records these redirects; the execution layer consults it through
//! [`crate::GuestMemory::function`].
//!
//! The recompiler emits the redirects as a static [`FunctionMapping`] slice terminated by
//! [`FunctionMapping::SENTINEL`]. It is walked exactly once, in order, when the address space is
//! created. When two entries name the same guest address the first one is kept.
//!
//! # Example
//!
//! ```rust
//! use std::ffi::c_void;
//! use xenon_host::{FunctionMapping, FunctionTable};
//!
//! unsafe extern "C" fn nt_close(_ctx: *mut c_void, _base: *mut u8) {}
//!
//! static MAPPINGS: &[FunctionMapping] = &[
//!     FunctionMapping::new(0x8200_1000, nt_close),
//!     FunctionMapping::SENTINEL,
//! ];
//!
//! let mut table = FunctionTable::new();
//! assert_eq!(table.install(MAPPINGS), 1);
//! assert!(table.get(0x8200_1000).is_some());
//! ```

use std::{collections::HashMap, ffi::c_void};

use tracing::{debug, trace};

/// Signature of a host function standing in for guest code.
///
/// The first argument is the execution layer's CPU context, the second is the base of the guest
/// address space. Both are opaque to this crate.
pub type HostFunction = unsafe extern "C" fn(ctx: *mut c_void, base: *mut u8);

/// A single guest-address to host-function redirect.
#[derive(Clone, Copy, Debug)]
pub struct FunctionMapping {
    /// Guest code address being redirected. `0` terminates a table.
    pub guest: u32,
    /// Host implementation, `None` for entries the recompiler left unimplemented.
    pub host: Option<HostFunction>,
}

impl FunctionMapping {
    /// Terminating entry of a static mapping table.
    pub const SENTINEL: FunctionMapping = FunctionMapping {
        guest: 0,
        host: None,
    };

    /// Creates a mapping from `guest` to `host`.
    #[must_use]
    pub const fn new(guest: u32, host: HostFunction) -> Self {
        FunctionMapping {
            guest,
            host: Some(host),
        }
    }

    /// Creates a placeholder for a guest address without a host implementation.
    ///
    /// Unimplemented entries are skipped at install time.
    #[must_use]
    pub const fn unimplemented(guest: u32) -> Self {
        FunctionMapping { guest, host: None }
    }

    /// Returns `true` for the table terminator.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        self.guest == 0
    }
}

/// Registry of installed redirects, keyed by guest address.
#[derive(Debug, Default)]
pub struct FunctionTable {
    entries: HashMap<u32, HostFunction>,
}

impl FunctionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `host` for `guest`.
    ///
    /// Returns `true` if the redirect was installed, `false` if `guest` already had one. The
    /// existing redirect is left untouched, so repeating an insert is harmless.
    pub fn insert(&mut self, guest: u32, host: HostFunction) -> bool {
        match self.entries.entry(guest) {
            std::collections::hash_map::Entry::Occupied(_) => {
                debug!("redirect for {guest:#010X} already installed, keeping the first");
                false
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                trace!("installed redirect for {guest:#010X}");
                slot.insert(host);
                true
            }
        }
    }

    /// Walks `mappings` up to the first sentinel and installs every implemented entry.
    ///
    /// Returns the number of redirects that were newly installed.
    pub fn install(&mut self, mappings: &[FunctionMapping]) -> usize {
        let mut installed = 0;
        for mapping in mappings.iter().take_while(|mapping| !mapping.is_sentinel()) {
            if let Some(host) = mapping.host {
                if self.insert(mapping.guest, host) {
                    installed += 1;
                }
            }
        }
        installed
    }

    /// Returns the host function redirected from `guest`, if any.
    #[must_use]
    pub fn get(&self, guest: u32) -> Option<HostFunction> {
        self.entries.get(&guest).copied()
    }

    /// Number of installed redirects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    static CALLED: AtomicU32 = AtomicU32::new(0);

    unsafe extern "C" fn first(_ctx: *mut c_void, _base: *mut u8) {
        CALLED.store(1, Ordering::SeqCst);
    }

    unsafe extern "C" fn second(_ctx: *mut c_void, _base: *mut u8) {
        CALLED.store(2, Ordering::SeqCst);
    }

    #[test]
    fn test_first_registration_wins() {
        let mappings = [
            FunctionMapping::new(0x8200_0000, first),
            FunctionMapping::new(0x8200_0000, second),
            FunctionMapping::SENTINEL,
        ];

        let mut table = FunctionTable::new();
        assert_eq!(table.install(&mappings), 1);
        assert_eq!(table.len(), 1);

        let host = table.get(0x8200_0000).unwrap();
        unsafe { host(std::ptr::null_mut(), std::ptr::null_mut()) };
        assert_eq!(CALLED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_install_stops_at_sentinel() {
        let mappings = [
            FunctionMapping::new(0x8200_0010, first),
            FunctionMapping::SENTINEL,
            FunctionMapping::new(0x8200_0020, second),
        ];

        let mut table = FunctionTable::new();
        assert_eq!(table.install(&mappings), 1);
        assert!(table.get(0x8200_0010).is_some());
        assert!(table.get(0x8200_0020).is_none());
    }

    #[test]
    fn test_unimplemented_entries_are_skipped() {
        let mappings = [
            FunctionMapping::unimplemented(0x8200_0030),
            FunctionMapping::new(0x8200_0030, second),
            FunctionMapping::SENTINEL,
        ];

        let mut table = FunctionTable::new();
        assert_eq!(table.install(&mappings), 1);
        assert!(table.get(0x8200_0030).is_some());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut table = FunctionTable::new();
        assert!(table.is_empty());
        assert!(table.insert(0x8200_0040, first));
        assert!(!table.insert(0x8200_0040, first));
        assert!(!table.insert(0x8200_0040, second));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sentinel_only_table() {
        let mut table = FunctionTable::new();
        assert_eq!(table.install(&[FunctionMapping::SENTINEL]), 0);
        assert_eq!(table.install(&[]), 0);
        assert!(table.is_empty());
    }
}
