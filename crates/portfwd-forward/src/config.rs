//! Forward list parsed from the stored configuration blob.

use serde::{Deserialize, Serialize};

use portfwd_core::{Error, Result};

/// The forward list: `{"Forwards": [{"Enabled", "Local", "Remote"}]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardConfig {
    #[serde(rename = "Forwards", alias = "forwards", default)]
    pub forwards: Vec<ForwardRule>,
}

/// One local → remote forward.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRule {
    #[serde(rename = "Enabled", alias = "enabled", default)]
    pub enabled: bool,
    #[serde(rename = "Local", alias = "local", default)]
    pub local: String,
    #[serde(rename = "Remote", alias = "remote", default)]
    pub remote: String,
}

impl ForwardConfig {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Config(format!("Invalid forward list: {}", e)))
    }

    /// Enabled rules with their position in the full list.
    pub fn enabled(&self) -> impl Iterator<Item = (usize, &ForwardRule)> {
        self.forwards.iter().enumerate().filter(|(_, f)| f.enabled)
    }
}

impl ForwardRule {
    /// Address to bind. `:port` listens on all interfaces.
    pub fn listen_addr(&self) -> String {
        with_default_host(&self.local, "0.0.0.0")
    }

    /// Address to dial. `:port` dials the local host.
    pub fn dial_addr(&self) -> String {
        with_default_host(&self.remote, "127.0.0.1")
    }
}

fn with_default_host(addr: &str, host: &str) -> String {
    let addr = addr.trim();
    if addr.starts_with(':') {
        format!("{}{}", host, addr)
    } else {
        addr.to_string()
    }
}
