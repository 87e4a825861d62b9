//! UI port message types — matching the front-end port names.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Request issued by the UI on one of its outbound ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "port", content = "value", rename_all = "camelCase")]
pub enum UiRequest {
    /// `saveConfig`: persist the configuration blob.
    SaveConfig(String),
    /// `loadConfig`: read the configuration blob back into `loadedConfig`.
    LoadConfig,
}

/// Message delivered to one of the UI's inbound ports.
///
/// Serializes as `{"port": "<name>", "value": <payload>}` with tuple payloads
/// encoded as arrays, e.g. `{"port": "countUpdate", "value": [0, 3, 10]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "port", content = "value", rename_all = "camelCase")]
pub enum UiMessage {
    LoadedConfig(String),
    ListenError(i64, String),
    ConnectError(i64, String),
    CountUpdate(i64, i64, i64),
}

impl UiMessage {
    /// Name of the inbound port this message targets.
    pub fn port(&self) -> &'static str {
        match self {
            Self::LoadedConfig(_) => "loadedConfig",
            Self::ListenError(..) => "listenError",
            Self::ConnectError(..) => "connectError",
            Self::CountUpdate(..) => "countUpdate",
        }
    }
}

/// Sending half of the UI request queue.
pub type UiRequestSender = mpsc::UnboundedSender<UiRequest>;
/// Receiving half of the UI request queue, drained by `Bridge::run`.
pub type UiRequestReceiver = mpsc::UnboundedReceiver<UiRequest>;

/// Create the UI request queue.
pub fn request_channel() -> (UiRequestSender, UiRequestReceiver) {
    mpsc::unbounded_channel()
}
