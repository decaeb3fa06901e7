//! Error types for the watcher crate

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced or relayed by the watcher
#[derive(Debug, Error)]
pub enum WatchError {
    /// Opaque error from the notification provider, relayed untouched
    #[error("notification provider error: {0}")]
    Provider(#[from] notify::Error),

    /// The dedup worker thread could not be started
    #[error("failed to spawn dedup loop: {0}")]
    Spawn(#[source] io::Error),

    /// The log path has no file name or no parent directory
    #[error("invalid log path {}: {reason}", .path.display())]
    InvalidTarget { path: PathBuf, reason: &'static str },
}

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;
