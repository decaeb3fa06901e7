//! Log file watching for logtail
//!
//! This crate provides:
//! - Raw change streams for a directory (`notify`-backed or in-process)
//! - Per-file write deduplication with a fixed-size output queue
//! - Relaying of provider errors to the consumer
//!
//! ```no_run
//! use std::path::Path;
//! use tail_watcher::{watch_log_file, DedupConfig};
//!
//! let (dir_watcher, dedup) = watch_log_file(Path::new("/var/log/app/0.log"), &DedupConfig::default())?;
//! for event in dedup.events().iter().take(10) {
//!     println!("{}", event);
//! }
//! dir_watcher.close();
//! let (remaining, _errors) = dedup.drain();
//! # Ok::<(), tail_watcher::WatchError>(())
//! ```

pub mod config;
pub mod dedup;
pub mod error;
pub mod source;

// Re-exports
pub use config::DedupConfig;
pub use dedup::{DedupEvents, DedupPolicy, Decision, EVENT_QUEUE_CAPACITY};
pub use error::{Result, WatchError};
pub use source::{raw_channel, DirWatcher, RawSender, RawSource, RAW_QUEUE_CAPACITY};
pub use tail_core::{FsEvent, Op};

use std::path::Path;

/// Watch the directory containing `log_path` and deduplicate events for it
///
/// The caller owns the returned [`DirWatcher`]; closing it ends the stream.
pub fn watch_log_file(log_path: &Path, config: &DedupConfig) -> Result<(DirWatcher, DedupEvents)> {
    let file_name = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| WatchError::InvalidTarget {
            path: log_path.to_path_buf(),
            reason: "no UTF-8 file name",
        })?;

    let dir = match log_path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => {
            return Err(WatchError::InvalidTarget {
                path: log_path.to_path_buf(),
                reason: "no parent directory",
            })
        }
    };

    let (dir_watcher, source) = DirWatcher::open(dir)?;
    let dedup = DedupEvents::spawn_with_config(file_name, source, config)?;
    Ok((dir_watcher, dedup))
}
