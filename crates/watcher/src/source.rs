//! Raw notification sources
//!
//! A [`RawSource`] is the receiving half of two streams: change events for a
//! directory and provider errors. Whoever holds the sending half owns the
//! source's lifetime; once it is dropped both streams disconnect, which is
//! the only shutdown signal the dedup loop listens for.

use crate::error::{Result, WatchError};
use crossbeam_channel::{bounded, Receiver, Sender};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tail_core::{FsEvent, Op};
use tracing::{debug, trace};

/// Capacity of each raw stream
///
/// Once full, the provider waits for the dedup loop instead of buffering
/// without limit.
pub const RAW_QUEUE_CAPACITY: usize = 1024;

/// Receiving half of a raw notification stream
#[derive(Debug)]
pub struct RawSource {
    pub(crate) events: Receiver<FsEvent>,
    pub(crate) errors: Receiver<WatchError>,
}

/// Sending half of a raw notification stream
///
/// Dropping it (or calling [`RawSender::close`]) closes the paired
/// [`RawSource`].
#[derive(Debug, Clone)]
pub struct RawSender {
    events: Sender<FsEvent>,
    errors: Sender<WatchError>,
}

/// Create an in-process raw source
///
/// Used by [`DirWatcher`] and by embedders that already have their own
/// notification provider.
pub fn raw_channel() -> (RawSender, RawSource) {
    let (event_tx, event_rx) = bounded(RAW_QUEUE_CAPACITY);
    let (error_tx, error_rx) = bounded(RAW_QUEUE_CAPACITY);
    (
        RawSender {
            events: event_tx,
            errors: error_tx,
        },
        RawSource {
            events: event_rx,
            errors: error_rx,
        },
    )
}

impl RawSender {
    /// Publish a change event, waiting while the stream is full.
    /// Returns false once the source has been dropped.
    pub fn send_event(&self, event: FsEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Publish a provider error, waiting while the stream is full.
    /// Returns false once the source has been dropped.
    pub fn send_error(&self, error: WatchError) -> bool {
        self.errors.send(error).is_ok()
    }

    /// Number of events not yet taken by the dedup loop
    pub fn backlog(&self) -> usize {
        self.events.len()
    }

    /// Close both streams
    pub fn close(self) {}
}

/// Non-recursive `notify` watcher on one directory
pub struct DirWatcher {
    dir: PathBuf,
    watcher: RecommendedWatcher,
}

impl DirWatcher {
    /// Start watching `dir` and return the raw stream of its changes
    pub fn open(dir: &Path) -> Result<(Self, RawSource)> {
        let (tx, source) = raw_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for fs_event in translate(event) {
                    if !tx.send_event(fs_event) {
                        return;
                    }
                }
            }
            Err(err) => {
                tx.send_error(err.into());
            }
        })?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        debug!("Watching {}", dir.display());

        Ok((
            Self {
                dir: dir.to_path_buf(),
                watcher,
            },
            source,
        ))
    }

    /// Directory being watched
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stop watching and close the raw source
    ///
    /// The streams disconnect once the provider has released its callback,
    /// which may happen shortly after this returns.
    pub fn close(mut self) {
        if let Err(e) = self.watcher.unwatch(&self.dir) {
            // The directory may already be gone
            trace!("unwatch {} failed: {}", self.dir.display(), e);
        }
        debug!("Closed watcher on {}", self.dir.display());
    }
}

impl std::fmt::Debug for DirWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirWatcher").field("dir", &self.dir).finish()
    }
}

/// Translate a provider event into zero or more change events, one per path
pub fn translate(event: Event) -> Vec<FsEvent> {
    match classify(&event.kind) {
        Some(op) => event
            .paths
            .into_iter()
            .map(|path| FsEvent::new(path, op))
            .collect(),
        None => Vec::new(),
    }
}

fn classify(kind: &EventKind) -> Option<Op> {
    match kind {
        EventKind::Access(_) => None,
        EventKind::Create(_) => Some(Op::Create),
        EventKind::Remove(_) => Some(Op::Remove),
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            Some(Op::Write)
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(Op::AttributeChange),
        // A file moved in under a name behaves like a fresh file
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(Op::Create),
        // Already reported through its From and To halves
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => None,
        EventKind::Modify(ModifyKind::Name(_)) => Some(Op::Rename),
        // Unclassified changes are forwarded rather than dropped
        _ => Some(Op::AttributeChange),
    }
}
