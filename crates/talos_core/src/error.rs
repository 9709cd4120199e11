//! Core error types for the talos recovery engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Offset is out of bounds for the device
    #[error("Offset {offset} is out of bounds (device size: {size})")]
    OutOfBounds { offset: u64, size: u64 },

    /// The MFT root directory record could not be read after the geometry
    /// was resolved. This is the only fatal condition in a rebuild.
    #[error("Can't read \"root directory\" in MFT")]
    RootDirectory,
}

pub type Result<T> = std::result::Result<T, CoreError>;
