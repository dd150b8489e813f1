use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Everything in this crate runs once, during process startup, against a build-produced input.
/// The variants therefore separate *why* startup failed (host environment, I/O, unsupported
/// format, corrupt data) so that a host can decide how loudly to report it before aborting.
///
/// # Error Categories
///
/// ## Host Environment
/// - [`Error::Reservation`] - The guest address space could not be reserved or protected
///
/// ## File Access
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Empty`] - Empty input provided
///
/// ## Container Parsing
/// - [`Error::OutOfBounds`] - A header field points outside of the buffer
/// - [`Error::Malformed`] - Corrupted or invalid header structure
/// - [`Error::NotSupported`] - The input is not a XEX2 module
/// - [`Error::UnsupportedCompression`] - The payload uses a compression scheme we can't expand
/// - [`Error::UnsupportedEncryption`] - The payload is still encrypted
/// - [`Error::Corrupt`] - The decoded image does not match its declared size
///
/// # Examples
///
/// ```rust,no_run
/// use xenon_host::{Error, GuestMemory, GuestMemoryConfig, ModuleLoader};
/// use std::path::Path;
///
/// let mut memory = GuestMemory::new(&GuestMemoryConfig::default(), &[])?;
/// match ModuleLoader::new().load(Path::new("default.xex"), &mut memory) {
///     Ok(module) => println!("Entry point: 0x{:08X}", module.entry_point),
///     Err(Error::UnsupportedCompression(kind)) => eprintln!("Unsupported compression {kind}"),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed module: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Failed to load module: {}", e),
/// }
/// # Ok::<(), xenon_host::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted.
    ///
    /// Raised both for header reads past the end of the module buffer and for guest
    /// ranges that leave the reserved block or touch its protected first page.
    #[error("Out of Bound access would have occurred! - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// This file type is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// The module payload uses a compression type this loader cannot expand.
    ///
    /// Only `NONE` and `BASIC` are supported; LZX (`NORMAL`), `DELTA` and unknown values end
    /// up here with the raw type value.
    #[error("Unsupported compression type - {0}")]
    UnsupportedCompression(u16),

    /// The module payload is encrypted.
    #[error("Unsupported encryption type - {0}")]
    UnsupportedEncryption(u16),

    /// The decoded image size disagrees with the size declared by the module.
    #[error("Corrupt image - expected {expected} bytes, produced {actual}")]
    Corrupt {
        /// Byte count the image or block table requires
        expected: usize,
        /// Byte count the block table produces or the payload holds
        actual: usize,
    },

    /// The guest address space could not be reserved or its guard page could not be
    /// protected.
    #[error("Failed to reserve guest memory - {0}")]
    Reservation(String),
}
