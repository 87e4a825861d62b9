//! Forwarder — owns one generation of listeners and pipes at a time.
//!
//! Every `reset` tears the current generation down and starts a new one from
//! whatever configuration is stored. `watch` resets on every config change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ForwardConfig;
use crate::counter::Counter;
use portfwd_core::{Error, Result, RuntimeEvent, RuntimeSender};
use portfwd_store::{StorageArea, CONFIG_KEY};

/// Snapshot of the running generation.
#[derive(Debug, Clone, Serialize)]
pub struct ForwarderStatus {
    pub generation: u64,
    pub listeners: usize,
    pub connections: i64,
}

/// Listeners, counters and the shutdown signal of one generation.
struct Session {
    shutdown: watch::Sender<bool>,
    listeners: Vec<JoinHandle<()>>,
    counters: Vec<Arc<Counter>>,
}

impl Session {
    fn empty() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            listeners: Vec::new(),
            counters: Vec::new(),
        }
    }

    /// Stop accepting, close every pipe, silence counters. Returns once all
    /// listening sockets are released.
    async fn close(self) {
        for counter in &self.counters {
            counter.cancel();
        }
        self.shutdown.send_replace(true);
        for handle in self.listeners {
            let _ = handle.await;
        }
    }
}

pub struct Forwarder {
    storage: Arc<dyn StorageArea>,
    events: RuntimeSender,
    session: Mutex<Session>,
    generation: AtomicU64,
}

impl Forwarder {
    pub fn new(storage: Arc<dyn StorageArea>, events: RuntimeSender) -> Self {
        Self {
            storage,
            events,
            session: Mutex::new(Session::empty()),
            generation: AtomicU64::new(0),
        }
    }

    /// Tear down every forward and start the enabled ones from storage.
    ///
    /// When this returns, each enabled forward is either listening or has
    /// reported a `listenError`.
    pub async fn reset(&self) {
        let mut session = self.session.lock().await;
        let previous = std::mem::replace(&mut *session, Session::empty());
        previous.close().await;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Forwarder reset: generation {}", generation);

        let config = match self.load_config().await {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!("No forward configuration stored");
                return;
            }
            Err(e) => {
                debug!("Not forwarding: {}", e);
                return;
            }
        };

        for (index, rule) in config.enabled() {
            let index = index as i64;
            let listener = match TcpListener::bind(rule.listen_addr()).await {
                Ok(listener) => listener,
                Err(e) => {
                    warn!("Forward {}: listen on {} failed: {}", index, rule.local, e);
                    RuntimeEvent::ListenError {
                        index,
                        message: e.to_string(),
                    }
                    .send(&self.events);
                    continue;
                }
            };

            let counter = Arc::new(Counter::new(index, self.events.clone()));
            let handle = tokio::spawn(serve(
                index,
                listener,
                rule.dial_addr(),
                counter.clone(),
                self.events.clone(),
                session.shutdown.subscribe(),
            ));
            session.counters.push(counter);
            session.listeners.push(handle);
        }
    }

    /// Stop every forward without starting new ones.
    pub async fn shutdown(&self) {
        let mut session = self.session.lock().await;
        let previous = std::mem::replace(&mut *session, Session::empty());
        previous.close().await;
        info!("Forwarder stopped");
    }

    /// Reset now and after every change of the stored configuration.
    ///
    /// Returns when the storage change stream closes.
    pub async fn watch(&self) {
        let mut changes = self.storage.subscribe();
        self.reset().await;

        loop {
            match changes.recv().await {
                Ok(change) if change.key == CONFIG_KEY => self.reset().await,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Missed {} storage changes", missed);
                    self.reset().await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    pub async fn status(&self) -> ForwarderStatus {
        let session = self.session.lock().await;
        ForwarderStatus {
            generation: self.generation.load(Ordering::SeqCst),
            listeners: session.listeners.iter().filter(|h| !h.is_finished()).count(),
            connections: session.counters.iter().map(|c| c.current()).sum(),
        }
    }

    async fn load_config(&self) -> Result<Option<ForwardConfig>> {
        let storage = self.storage.clone();
        let raw = tokio::task::spawn_blocking(move || storage.get(CONFIG_KEY))
            .await
            .map_err(|e| Error::Internal(format!("Storage task failed: {}", e)))??;
        raw.map(|raw| ForwardConfig::parse(&raw)).transpose()
    }
}

/// Accept loop for one forward. Ends on accept failure or shutdown.
async fn serve(
    index: i64,
    listener: TcpListener,
    remote: String,
    counter: Arc<Counter>,
    events: RuntimeSender,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("Forward {} serving {} -> {}", index, addr, remote);
    }

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = signalled(&mut shutdown) => break,
        };

        let (client, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                debug!("Accept failed on forward {}: {}", index, e);
                break;
            }
        };
        debug!("Forward {}: new connection from {}", index, peer);

        let upstream = tokio::select! {
            dialed = TcpStream::connect(&remote) => dialed,
            _ = signalled(&mut shutdown) => break,
        };

        let upstream = match upstream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Forward {}: dial {} failed: {}", index, remote, e);
                RuntimeEvent::ConnectError {
                    index,
                    message: e.to_string(),
                }
                .send(&events);
                drop(client);
                continue;
            }
        };

        let (client_read, client_write) = client.into_split();
        let (upstream_read, upstream_write) = upstream.into_split();
        let (closed, _) = watch::channel(false);
        let closed = Arc::new(closed);

        tokio::spawn(pipe(
            client_read,
            upstream_write,
            counter.clone(),
            closed.clone(),
            shutdown.clone(),
        ));
        tokio::spawn(pipe(
            upstream_read,
            client_write,
            counter.clone(),
            closed,
            shutdown.clone(),
        ));
    }

    debug!("Forward {} no longer accepting", index);
}

/// Resolves once the flag is set or its sender is gone.
async fn signalled(flag: &mut watch::Receiver<bool>) {
    let _ = flag.wait_for(|set| *set).await;
}

/// Copy one direction. When either direction ends, both are closed.
async fn pipe(
    mut from: OwnedReadHalf,
    mut to: OwnedWriteHalf,
    counter: Arc<Counter>,
    closed: Arc<watch::Sender<bool>>,
    mut shutdown: watch::Receiver<bool>,
) {
    counter.inc();
    let mut peer_closed = closed.subscribe();

    tokio::select! {
        copied = tokio::io::copy(&mut from, &mut to) => {
            if let Err(e) = copied {
                debug!("Pipe error: {}", e);
            }
        }
        _ = signalled(&mut peer_closed) => {}
        _ = signalled(&mut shutdown) => {}
    }

    let _ = to.shutdown().await;
    closed.send_replace(true);
    drop(from);
    drop(to);
    counter.dec();
}
