//! Dedup configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default minimum spacing between two forwarded writes
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Configuration for the dedup loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Minimum time between two forwarded Write events, in milliseconds
    pub debounce_ms: u64,
}

impl DedupConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}
