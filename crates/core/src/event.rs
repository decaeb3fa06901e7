//! Filesystem change events

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single filesystem change notification
///
/// Immutable once produced: stages downstream of the provider either forward
/// an event as-is, drop it, or manufacture a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub op: Op,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, op: Op) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }

    /// Base name of the changed path, if it has one
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// True if the base name of the changed path equals `name`
    pub fn is_named(&self, name: &str) -> bool {
        self.path.file_name().is_some_and(|base| base == name)
    }
}

impl fmt::Display for FsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.op, self.path)
    }
}

/// Type of filesystem change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    /// File created, or moved in under its name
    Create,
    /// File contents modified
    Write,
    /// File deleted
    Remove,
    /// File moved away from its name
    Rename,
    /// Permissions, timestamps or other metadata changed
    AttributeChange,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Create => "CREATE",
            Op::Write => "WRITE",
            Op::Remove => "REMOVE",
            Op::Rename => "RENAME",
            Op::AttributeChange => "CHMOD",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
