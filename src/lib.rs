// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'memory/mod.rs' reserves and protects the guest address space and hands out raw pointers
// - 'file/physical.rs' uses mmap to map a file into memory

//! # xenon-host
//!
//! Runtime core for hosting statically recompiled Xbox 360 titles. Recompiled PowerPC code runs
//! natively on the host CPU, but it still expects the console's world around it: a flat 32-bit
//! big-endian address space, its executable image loaded at the address it was linked for, and
//! the title metadata embedded in that image. This crate provides exactly that:
//!
//! - **Guest address space** - a 4 GiB reservation standing in for the console's memory, with a
//!   protected first page and `guest address -> host pointer` translation
//! - **Function redirects** - a table replacing specific guest addresses with host functions
//! - **XEX2 loader** - parses the console's executable container and expands the image into
//!   guest memory
//! - **XDBF resources** - read-only access to the title's strings, achievements and images
//!
//! Everything here runs once, at process startup, before the first guest instruction. Window,
//! audio and input handling, kernel imports and the recompiled code itself live elsewhere and
//! consume this crate through [`GuestMemory::translate`], [`LoadedModule::entry_point`] and
//! [`xdbf::XdbfView`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::ffi::c_void;
//! use xenon_host::prelude::*;
//!
//! unsafe extern "C" fn xam_show_message_box(_ctx: *mut c_void, _base: *mut u8) {}
//!
//! static MAPPINGS: &[FunctionMapping] = &[
//!     FunctionMapping::new(0x8262_F4B8, xam_show_message_box),
//!     FunctionMapping::SENTINEL,
//! ];
//!
//! let mut memory = GuestMemory::new(&GuestMemoryConfig::default(), MAPPINGS)?;
//! let module = ModuleLoader::new().load("game/default.xex", &mut memory)?;
//!
//! println!("entry point {:#010X}", module.entry_point);
//! for achievement in module.resources.achievements(Language::English) {
//!     println!("{:>3}G {}", achievement.gamerscore, achievement.name.unwrap_or("?"));
//! }
//! # Ok::<(), xenon_host::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result). Every error is fatal for startup; the
//! variants tell a host what to report before it exits:
//!
//! ```rust,no_run
//! use xenon_host::{Error, GuestMemory, GuestMemoryConfig, ModuleLoader};
//!
//! let mut memory = GuestMemory::new(&GuestMemoryConfig::default(), &[])?;
//! match ModuleLoader::new().load("game/default.xex", &mut memory) {
//!     Ok(module) => println!("loaded, entry point {:#010X}", module.entry_point),
//!     Err(Error::FileError(e)) => println!("can't read the module: {}", e),
//!     Err(Error::UnsupportedCompression(kind)) => println!("compression {} not supported", kind),
//!     Err(e) => println!("invalid module: {}", e),
//! }
//! # Ok::<(), xenon_host::Error>(())
//! ```
//!
//! ## Logging
//!
//! The crate reports startup milestones through [`tracing`]. It never installs a subscriber; that
//! is up to the host binary.
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench --bench decode
//!
//! # Fuzz the container parser and decoder
//! cargo +nightly fuzz run xex --release
//! ```

#[cfg(not(target_pointer_width = "64"))]
compile_error!("the guest address space needs a 64-bit host");

#[macro_use]
pub(crate) mod error;

/// Module file access and big-endian parsing primitives.
pub mod file;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// ```rust,no_run
/// use xenon_host::prelude::*;
///
/// let mut memory = GuestMemory::new(&GuestMemoryConfig::default(), &[])?;
/// let module = ModuleLoader::new().load("default.xex", &mut memory)?;
/// let title = module.resources.title(Language::English);
/// # Ok::<(), xenon_host::Error>(())
/// ```
pub mod prelude;

/// Emulated guest address space and host function redirects.
pub mod memory;

/// XEX2 executable container parsing and payload decoding.
pub mod xex;

/// Placement of XEX2 modules into guest memory.
pub mod loader;

/// XDBF title resource directory.
pub mod xdbf;

/// `xenon-host` Result type.
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `xenon-host` Error type.
///
/// The main error type for all operations in this crate. See [`Error`] for the individual
/// variants.
pub use error::Error;

/// Module bytes from disk or memory, and the cursor used to parse them.
pub use file::{parser::Parser, File};

/// The guest address space and its configuration.
///
/// # Example
///
/// ```rust
/// use xenon_host::{GuestMemory, GuestMemoryConfig};
///
/// let config = GuestMemoryConfig::new().with_size(0x10_0000);
/// let mut memory = GuestMemory::new(&config, &[])?;
///
/// memory.write_be::<u32>(0x8000, 0x1234_5678)?;
/// assert_eq!(memory.read_be::<u32>(0x8000)?, 0x1234_5678);
/// assert!(memory.read_be::<u32>(0x0).is_err());
/// # Ok::<(), xenon_host::Error>(())
/// ```
pub use memory::{
    FunctionMapping, FunctionTable, GuestMemory, GuestMemoryConfig, HostFunction,
    GUARD_PAGE_SIZE, GUEST_MEMORY_SIZE,
};

/// Module loading.
pub use loader::{LoadedModule, LoaderConfig, ModuleLoader};

/// Title resource directory view.
pub use xdbf::XdbfView;
