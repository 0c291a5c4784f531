//! Error types for the Galaxy3D tiling library
//!
//! This module defines the error types shared by the tile grid, the
//! per-thread workers and the scene frame loop, plus the `engine_err!` /
//! `engine_bail!` helpers that log an error at the point it is raised.

use std::fmt;

/// Result type for Galaxy3D operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (device, submission, recording, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (command buffer, fence, tile, etc.)
    InvalidResource(String),

    /// Initialization failed (thread pool, command pools, sync objects)
    InitializationFailed(String),

    /// Scene configuration rejected before anything was built
    InvalidConfiguration(String),

    /// A position falls outside the scene's tiled area
    OutOfBounds(String),

    /// Waiting on the GPU exceeded the configured limit
    Timeout(String),

    /// The device was lost; the scene cannot continue
    DeviceLost,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::OutOfBounds(msg) => write!(f, "Out of bounds: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::DeviceLost => write!(f, "Device lost"),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR message and build an `Error::BackendError` with the same text
///
/// # Example
///
/// ```no_run
/// # use galaxy_3d_tiling::engine_err;
/// # let e = ();
/// let err = engine_err!("galaxy3d::Scene", "Failed to submit frame: {:?}", e);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::galaxy3d::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return early with `Error::BackendError`
///
/// # Example
///
/// ```no_run
/// # use galaxy_3d_tiling::engine_bail;
/// # fn f() -> galaxy_3d_tiling::galaxy3d::Result<()> {
/// engine_bail!("galaxy3d::Scene", "No primary command buffer recorded");
/// # }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
