//! Shared application state.

use std::sync::Arc;

use parking_lot::Mutex;
use portfwd_bridge::{request_channel, UiMessage, UiRequestReceiver, UiRequestSender};
use portfwd_core::{runtime_channel, PortfwdConfig, RuntimeReceiver};
use portfwd_forward::Forwarder;
use portfwd_store::StorageArea;
use tokio::sync::broadcast;

/// Buffered inbound port messages per connected UI.
const UI_CAPACITY: usize = 256;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: PortfwdConfig,
    pub storage: Arc<dyn StorageArea>,
    pub forwarder: Arc<Forwarder>,
    /// UI outbound ports (`saveConfig`, `loadConfig`), drained by the bridge.
    pub requests: UiRequestSender,
    /// UI inbound ports, fanned out to every event stream.
    pub ui: broadcast::Sender<UiMessage>,
    request_rx: Mutex<Option<UiRequestReceiver>>,
    runtime_rx: Mutex<Option<RuntimeReceiver>>,
}

impl AppState {
    pub fn new(config: PortfwdConfig, storage: Arc<dyn StorageArea>) -> Self {
        let (requests, request_rx) = request_channel();
        let (runtime_tx, runtime_rx) = runtime_channel();
        let (ui, _) = broadcast::channel(UI_CAPACITY);

        let forwarder = Arc::new(Forwarder::new(storage.clone(), runtime_tx));

        Self {
            config,
            storage,
            forwarder,
            requests,
            ui,
            request_rx: Mutex::new(Some(request_rx)),
            runtime_rx: Mutex::new(Some(runtime_rx)),
        }
    }

    /// Take both bridge queues (can only be called once, by the bridge task).
    pub fn take_bridge_queues(&self) -> Option<(UiRequestReceiver, RuntimeReceiver)> {
        let requests = self.request_rx.lock().take()?;
        let runtime = self.runtime_rx.lock().take()?;
        Some((requests, runtime))
    }
}
