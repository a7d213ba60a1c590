//! Error types for `hfsnav-core`.
//!
//! All fallible operations in the core library return [`CoreResult<T>`],
//! which is an alias for `Result<T, CoreError>`. Failures reported by the
//! access engine arrive as [`EngineError`] and are folded into
//! [`CoreError::Engine`], except a missing entry which becomes
//! [`CoreError::NotFound`].

use std::path::PathBuf;

use crate::engine::EngineError;

/// Unified error type for all core operations.
///
/// Each variant captures just enough context for the caller to display
/// a meaningful message or take corrective action. Nothing in the core is
/// fatal; the caller decides how to present every variant.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An operation was attempted after the volume session was closed.
    #[error("volume is closed")]
    VolumeClosed,

    /// The session is currently lent to a background transfer.
    #[error("volume is busy with a background transfer")]
    SessionBusy,

    /// A listing or attribute lookup hit a path that no longer exists.
    #[error("no such item: {0}")]
    NotFound(String),

    /// The request itself is unusable (e.g. a container without any
    /// openable partition).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A volume name or four-character code is invalid.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// A move or copy into the source's own subtree.
    #[error("cannot drop {source_path} into {destination}")]
    InvalidDrop {
        /// The source path that contains the destination.
        source_path: String,
        /// The rejected destination directory.
        destination: String,
    },

    /// The access engine failed to read or write the volume.
    #[error("volume I/O failure: {0}")]
    Engine(EngineError),

    /// A host-side item selected for import does not exist.
    #[error("host item not found: {0}")]
    HostNotFound(PathBuf),

    /// Failed to parse a TOML configuration file.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// The user cancelled an interactive operation.
    #[error("operation cancelled")]
    Cancelled,

    /// A host I/O error that doesn't fit a more specific variant.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<EngineError> for CoreError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(path) => CoreError::NotFound(path),
            other => CoreError::Engine(other),
        }
    }
}

/// Convenience alias used throughout `hfsnav-core`.
pub type CoreResult<T> = Result<T, CoreError>;
