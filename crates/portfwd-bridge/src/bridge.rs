//! Bridge — relays UI config requests to storage and runtime events to the UI.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::ports::UiPorts;
use crate::types::{UiRequest, UiRequestReceiver};
use portfwd_core::{Error, Result, RuntimeEvent, RuntimeReceiver};
use portfwd_store::{StorageArea, CONFIG_KEY};

/// Adapter between the UI application and the host.
///
/// Holds no state of its own: storage owns the configuration, the UI owns
/// whatever it does with relayed events.
pub struct Bridge {
    storage: Arc<dyn StorageArea>,
    ports: Arc<dyn UiPorts>,
}

impl Bridge {
    pub fn new(storage: Arc<dyn StorageArea>, ports: Arc<dyn UiPorts>) -> Self {
        Self { storage, ports }
    }

    // ---------------------------------------------------------------
    // Config relay
    // ---------------------------------------------------------------

    /// `saveConfig`: store the blob under `"config"`.
    pub async fn on_save_config(&self, config: String) -> Result<()> {
        let storage = self.storage.clone();
        let len = config.len();
        tokio::task::spawn_blocking(move || storage.set(CONFIG_KEY, &config))
            .await
            .map_err(|e| Error::Internal(format!("Storage task failed: {}", e)))??;
        debug!("Config saved ({} bytes)", len);
        Ok(())
    }

    /// `loadConfig`: read `"config"` and send it to `loadedConfig`.
    ///
    /// A key that was never written is sent as the empty string.
    pub async fn on_load_config(&self) -> Result<()> {
        let storage = self.storage.clone();
        let stored = tokio::task::spawn_blocking(move || storage.get(CONFIG_KEY))
            .await
            .map_err(|e| Error::Internal(format!("Storage task failed: {}", e)))??;
        self.ports.loaded_config(stored.unwrap_or_default());
        Ok(())
    }

    /// Dispatch one UI request.
    pub async fn handle_request(&self, request: UiRequest) -> Result<()> {
        match request {
            UiRequest::SaveConfig(config) => self.on_save_config(config).await,
            UiRequest::LoadConfig => self.on_load_config().await,
        }
    }

    // ---------------------------------------------------------------
    // Event relay
    // ---------------------------------------------------------------

    /// Relay one raw runtime message. Unrecognized tags are ignored.
    pub fn on_runtime_message(&self, message: &Value) -> Result<()> {
        match RuntimeEvent::from_message(message)? {
            Some(event) => self.relay(event),
            None => debug!("Ignoring runtime message without a known type"),
        }
        Ok(())
    }

    /// Relay an already decoded runtime event.
    pub fn relay(&self, event: RuntimeEvent) {
        match event {
            RuntimeEvent::ListenError { index, message } => {
                self.ports.listen_error(index, message)
            }
            RuntimeEvent::ConnectError { index, message } => {
                self.ports.connect_error(index, message)
            }
            RuntimeEvent::ConnectionCount {
                index,
                current,
                total,
            } => self.ports.count_update(index, current, total),
        }
    }

    // ---------------------------------------------------------------
    // Loop
    // ---------------------------------------------------------------

    /// Drain UI requests and runtime messages until both queues close.
    pub async fn run(self, mut requests: UiRequestReceiver, mut runtime: RuntimeReceiver) {
        info!("Bridge started");
        let mut requests_open = true;
        let mut runtime_open = true;

        while requests_open || runtime_open {
            tokio::select! {
                request = requests.recv(), if requests_open => match request {
                    Some(request) => {
                        if let Err(e) = self.handle_request(request).await {
                            error!("UI request failed: {}", e);
                        }
                    }
                    None => requests_open = false,
                },
                message = runtime.recv(), if runtime_open => match message {
                    Some(message) => {
                        if let Err(e) = self.on_runtime_message(&message) {
                            warn!("Dropping runtime message: {}", e);
                        }
                    }
                    None => runtime_open = false,
                },
            }
        }

        info!("Bridge stopped");
    }
}
