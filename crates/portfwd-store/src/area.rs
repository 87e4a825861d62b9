//! Storage area contract shared by every backend.

use tokio::sync::broadcast;

use portfwd_core::Result;

/// Key under which the UI configuration blob is stored.
pub const CONFIG_KEY: &str = "config";

/// Capacity of the change notification channel.
pub(crate) const CHANGE_CAPACITY: usize = 64;

/// A single key change, sent after every successful `set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// A persistent string key-value store owned by the host.
///
/// Calls are blocking; async callers go through `spawn_blocking`.
pub trait StorageArea: Send + Sync {
    /// Read a value. `None` if the key was never set.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Create or overwrite a value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Subscribe to changes made after this call.
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}
