//! Most commonly used types, for glob imports.

pub use crate::{
    loader::{LoadedModule, LoaderConfig, ModuleLoader},
    memory::{FunctionMapping, GuestMemory, GuestMemoryConfig, HostFunction},
    xdbf::{Achievement, Language, XdbfView},
    xex::{ModuleFlags, Xex2Module},
    Error, Result,
};
