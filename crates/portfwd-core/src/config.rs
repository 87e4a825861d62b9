//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default HTTP port for the UI surface.
pub const DEFAULT_PORT: u16 = 3030;
/// Default bind host for the UI surface.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Paths to all portfwd data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Local key-value storage (`data/storage/`).
    pub storage: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            storage: root.join("storage"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.storage)?;
        Ok(())
    }
}

/// Top-level portfwd configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfwdConfig {
    /// Host the UI surface binds to.
    pub host: String,
    /// HTTP port for the UI surface.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
}

impl PortfwdConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let host = std::env::var("PORTFWD_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            host,
            port,
            data_paths,
        })
    }

    /// Socket address string for the UI surface.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
