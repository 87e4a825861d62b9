//! Inbound UI ports.

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::types::UiMessage;

/// The UI application's inbound ports.
///
/// Implementors only provide `emit`; each named port wraps its payload.
pub trait UiPorts: Send + Sync {
    fn emit(&self, message: UiMessage);

    fn loaded_config(&self, config: String) {
        self.emit(UiMessage::LoadedConfig(config));
    }

    fn listen_error(&self, index: i64, message: String) {
        self.emit(UiMessage::ListenError(index, message));
    }

    fn connect_error(&self, index: i64, message: String) {
        self.emit(UiMessage::ConnectError(index, message));
    }

    fn count_update(&self, index: i64, current: i64, total: i64) {
        self.emit(UiMessage::CountUpdate(index, current, total));
    }
}

/// Single consumer, e.g. an embedded UI or a test.
impl UiPorts for mpsc::UnboundedSender<UiMessage> {
    fn emit(&self, message: UiMessage) {
        let port = message.port();
        if self.send(message).is_err() {
            debug!("UI detached, dropping {} message", port);
        }
    }
}

/// Fan-out to every connected UI; nobody listening is not an error.
impl UiPorts for broadcast::Sender<UiMessage> {
    fn emit(&self, message: UiMessage) {
        let port = message.port();
        if self.send(message).is_err() {
            debug!("No UI subscribers, dropping {} message", port);
        }
    }
}
