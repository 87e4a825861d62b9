//! portfwd Store — local key-value storage areas with change notifications.

pub mod area;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use area::{StorageArea, StorageChange, CONFIG_KEY};
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
