//! Database schema SQL.

/// Single key-value table backing a storage area.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;
