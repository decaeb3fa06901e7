//! Container identity map guarded by a read/write lock
//!
//! Maps a container ID to the `(pod UID, container name)` pair it belongs to.
//! Log consumers use it to find which container owns a log file before
//! running liveness checks.

use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

/// Lookup failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerMapError {
    #[error("container {container_name} not in container map for pod {pod_uid}")]
    RefNotFound {
        pod_uid: String,
        container_name: String,
    },

    #[error("container id {0} not in container map")]
    IdNotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ContainerRef {
    pod_uid: String,
    container_name: String,
}

/// Thread-safe `container ID -> (pod UID, container name)` map
///
/// Every operation takes the lock once, so compound operations such as
/// [`ContainerMap::remove_by_container_ref`] are atomic.
#[derive(Debug, Default)]
pub struct ContainerMap {
    entries: RwLock<HashMap<String, ContainerRef>>,
}

impl ContainerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the mapping for `container_id`
    pub fn add(&self, pod_uid: &str, container_name: &str, container_id: &str) {
        self.entries.write().insert(
            container_id.to_string(),
            ContainerRef {
                pod_uid: pod_uid.to_string(),
                container_name: container_name.to_string(),
            },
        );
    }

    pub fn remove_by_container_id(&self, container_id: &str) {
        self.entries.write().remove(container_id);
    }

    /// Remove the entry for `(pod_uid, container_name)` if there is one
    pub fn remove_by_container_ref(&self, pod_uid: &str, container_name: &str) {
        let mut entries = self.entries.write();
        if let Some(id) = find_id(&entries, pod_uid, container_name) {
            entries.remove(&id);
        }
    }

    /// Look up the container ID registered for `(pod_uid, container_name)`
    pub fn container_id(
        &self,
        pod_uid: &str,
        container_name: &str,
    ) -> Result<String, ContainerMapError> {
        find_id(&self.entries.read(), pod_uid, container_name).ok_or_else(|| {
            ContainerMapError::RefNotFound {
                pod_uid: pod_uid.to_string(),
                container_name: container_name.to_string(),
            }
        })
    }

    /// Look up the `(pod UID, container name)` pair for `container_id`
    pub fn container_ref(&self, container_id: &str) -> Result<(String, String), ContainerMapError> {
        self.entries
            .read()
            .get(container_id)
            .map(|r| (r.pod_uid.clone(), r.container_name.clone()))
            .ok_or_else(|| ContainerMapError::IdNotFound(container_id.to_string()))
    }

    /// Call `visitor(pod_uid, container_name, container_id)` for every entry
    ///
    /// Holds the write lock for the whole walk. The visitor must not call
    /// back into this map.
    pub fn visit<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &str, &str),
    {
        let entries = self.entries.write();
        for (id, r) in entries.iter() {
            visitor(&r.pod_uid, &r.container_name, id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn find_id(
    entries: &HashMap<String, ContainerRef>,
    pod_uid: &str,
    container_name: &str,
) -> Option<String> {
    entries
        .iter()
        .find(|(_, r)| r.pod_uid == pod_uid && r.container_name == container_name)
        .map(|(id, _)| id.clone())
}
