//! Background tasks — the config watcher and the UI bridge.

use std::sync::Arc;

use portfwd_bridge::Bridge;
use tracing::{error, info};

use crate::state::AppState;

/// Start the forwarder watch loop and the bridge loop.
pub fn start_background_tasks(state: Arc<AppState>) {
    let (requests, runtime) = match state.take_bridge_queues() {
        Some(queues) => queues,
        None => {
            error!("Background tasks already started");
            return;
        }
    };

    let forwarder = state.forwarder.clone();
    tokio::spawn(async move {
        info!("Config watcher started");
        forwarder.watch().await;
        info!("Config watcher stopped");
    });

    let bridge = Bridge::new(state.storage.clone(), Arc::new(state.ui.clone()));
    tokio::spawn(bridge.run(requests, runtime));
}
