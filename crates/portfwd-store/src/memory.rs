//! In-process storage area for tests and ephemeral runs.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::area::{StorageArea, StorageChange, CHANGE_CAPACITY};
use portfwd_core::Result;

/// Non-persistent key-value storage area.
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            items: RwLock::new(HashMap::new()),
            changes,
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageArea for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let old_value = self
            .items
            .write()
            .insert(key.to_string(), value.to_string());
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
            old_value,
            new_value: Some(value.to_string()),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let store = MemoryStorage::new();
        assert_eq!(store.get("config").unwrap(), None);

        store.set("config", "x").unwrap();
        assert_eq!(store.get("config").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_subscribe_sees_only_later_changes() {
        let store = MemoryStorage::new();
        store.set("config", "before").unwrap();

        let mut changes = store.subscribe();
        assert!(changes.try_recv().is_err());

        store.set("config", "after").unwrap();
        let change = changes.try_recv().unwrap();
        assert_eq!(change.old_value.as_deref(), Some("before"));
        assert_eq!(change.new_value.as_deref(), Some("after"));
    }
}
