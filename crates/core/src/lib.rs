//! Shared types for logtail
//!
//! This crate provides:
//! - The filesystem change event passed between watcher stages
//! - A lock-guarded container identity map used by log consumers

pub mod container_map;
pub mod event;

// Re-exports
pub use container_map::{ContainerMap, ContainerMapError};
pub use event::{FsEvent, Op};
