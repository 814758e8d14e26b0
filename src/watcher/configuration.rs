//! The configuration watcher actor.
//!
//! A single task owns the aggregation state and processes snapshots one
//! batch at a time: accept, coalesce, merge, compile, swap, notify.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::dynamic::{AggregatorState, DynamicModel, ProviderSnapshot};
use crate::observability::metrics;
use crate::provider::SnapshotPublisher;
use crate::routing::{CompileError, RouterFactory, TableSwapController};
use crate::watcher::throttle::{Coalescer, Throttle};

/// Callback invoked with every accepted merged configuration.
pub type Listener = Box<dyn Fn(&DynamicModel) + Send + Sync>;

/// Errors surfaced by the watcher.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("initial configuration could not be applied: {0}")]
    Bootstrap(String),

    #[error("configuration watcher stopped before applying a configuration")]
    Stopped,

    #[error("configuration watcher task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Lifecycle of the watcher as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherStatus {
    /// No configuration applied yet.
    Waiting,
    /// A table is live.
    Serving { generation: u64 },
    /// The first configuration failed; the watcher has exited.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct WatcherSettings {
    /// Minimum interval between two rebuilds.
    pub throttle: Duration,
    /// Entrypoints given to routers that declare none.
    pub default_entrypoints: Vec<String>,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            throttle: Duration::from_secs(2),
            default_entrypoints: Vec::new(),
        }
    }
}

pub struct ConfigurationWatcher {
    settings: WatcherSettings,
    factory: RouterFactory,
    tables: Arc<TableSwapController>,
    tx: mpsc::UnboundedSender<ProviderSnapshot>,
    rx: mpsc::UnboundedReceiver<ProviderSnapshot>,
    listeners: Vec<Listener>,
    shutdown: Option<broadcast::Receiver<()>>,
}

impl ConfigurationWatcher {
    pub fn new(settings: WatcherSettings, factory: RouterFactory, tables: Arc<TableSwapController>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            settings,
            factory,
            tables,
            tx,
            rx,
            listeners: Vec::new(),
            shutdown: None,
        }
    }

    /// Handle for providers. Publishers must be taken before `start`.
    pub fn publisher(&self) -> SnapshotPublisher {
        SnapshotPublisher::new(self.tx.clone())
    }

    /// Register a listener; listeners run in registration order.
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(&DynamicModel) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Stop the loop when the shutdown broadcast fires.
    pub fn with_shutdown(mut self, shutdown: broadcast::Receiver<()>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Spawn the processing loop.
    pub fn start(self) -> WatcherHandle {
        let Self {
            settings,
            factory,
            tables,
            tx,
            rx,
            listeners,
            shutdown,
        } = self;
        // Only provider-held publishers keep the channel open from here on.
        drop(tx);

        let (status_tx, status_rx) = watch::channel(WatcherStatus::Waiting);
        let reconciler = Reconciler {
            state: AggregatorState::new(),
            last_published: None,
            default_entrypoints: settings.default_entrypoints,
            factory,
            tables,
            listeners,
        };

        tracing::info!(
            throttle_ms = settings.throttle.as_millis() as u64,
            "Configuration watcher started"
        );

        let task = tokio::spawn(run(
            rx,
            reconciler,
            Throttle::new(settings.throttle),
            status_tx,
            shutdown,
        ));

        WatcherHandle {
            status: status_rx,
            task,
        }
    }
}

impl std::fmt::Debug for ConfigurationWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationWatcher")
            .field("settings", &self.settings)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Handle to a running watcher.
#[derive(Debug)]
pub struct WatcherHandle {
    status: watch::Receiver<WatcherStatus>,
    task: JoinHandle<Result<(), WatcherError>>,
}

impl WatcherHandle {
    pub fn status(&self) -> WatcherStatus {
        self.status.borrow().clone()
    }

    /// Wait until the first configuration is applied or has failed.
    pub async fn bootstrapped(&self) -> Result<u64, WatcherError> {
        let mut status = self.status.clone();
        let settled = status
            .wait_for(|s| !matches!(s, WatcherStatus::Waiting))
            .await
            .map_err(|_| WatcherError::Stopped)?
            .clone();

        match settled {
            WatcherStatus::Serving { generation } => Ok(generation),
            WatcherStatus::Failed(reason) => Err(WatcherError::Bootstrap(reason)),
            WatcherStatus::Waiting => Err(WatcherError::Stopped),
        }
    }

    /// Wait for the loop to exit.
    pub async fn join(self) -> Result<(), WatcherError> {
        self.task.await?
    }
}

enum Outcome {
    Unchanged,
    Published { generation: u64 },
}

struct Reconciler {
    state: AggregatorState,
    last_published: Option<DynamicModel>,
    default_entrypoints: Vec<String>,
    factory: RouterFactory,
    tables: Arc<TableSwapController>,
    listeners: Vec<Listener>,
}

impl Reconciler {
    fn has_published(&self) -> bool {
        self.last_published.is_some()
    }

    async fn apply(&mut self, batch: Vec<(String, DynamicModel)>) -> Result<Outcome, CompileError> {
        for (provider, model) in batch {
            self.state.update(provider, model);
        }

        let merged = self.state.merge(&self.default_entrypoints);
        if self.last_published.as_ref() == Some(&merged) {
            tracing::debug!("Merged configuration unchanged, skipping rebuild");
            return Ok(Outcome::Unchanged);
        }

        let table = self.factory.build(&merged).await?;
        let routes = table.route_count();
        let generation = self.tables.swap(table);

        tracing::info!(
            generation,
            providers = self.state.len(),
            routers = merged.routers.len(),
            services = merged.services.len(),
            middlewares = merged.middlewares.len(),
            routes,
            "Routing table updated"
        );

        for listener in &self.listeners {
            listener(&merged);
        }
        self.last_published = Some(merged);

        Ok(Outcome::Published { generation })
    }
}

fn accept(snapshot: ProviderSnapshot, coalescer: &mut Coalescer) {
    metrics::record_snapshot(&snapshot.provider);
    tracing::debug!(provider = %snapshot.provider, "Snapshot received");

    let ProviderSnapshot { provider, config } = snapshot;
    match config {
        Some(model) if !model.is_empty() => {
            if coalescer.push(provider.clone(), model) {
                tracing::debug!(provider = %provider, "Superseded pending configuration");
            }
        }
        _ => {
            tracing::info!(provider = %provider, "Skipping empty configuration");
        }
    }
}

async fn wait_shutdown(shutdown: &mut Option<broadcast::Receiver<()>>) {
    match shutdown {
        Some(rx) => {
            let _ = rx.recv().await;
        }
        None => std::future::pending().await,
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<ProviderSnapshot>,
    mut reconciler: Reconciler,
    mut throttle: Throttle,
    status: watch::Sender<WatcherStatus>,
    mut shutdown: Option<broadcast::Receiver<()>>,
) -> Result<(), WatcherError> {
    let mut coalescer = Coalescer::new();
    let mut closed = false;

    loop {
        if !coalescer.is_empty() && throttle.is_ready(Instant::now()) {
            while let Ok(snapshot) = rx.try_recv() {
                accept(snapshot, &mut coalescer);
            }

            tracing::debug!(providers = coalescer.len(), "Applying coalesced snapshots");
            match reconciler.apply(coalescer.take()).await {
                Ok(Outcome::Published { generation }) => {
                    metrics::record_reload("success");
                    status.send_replace(WatcherStatus::Serving { generation });
                }
                Ok(Outcome::Unchanged) => metrics::record_reload("skipped"),
                Err(e) if reconciler.has_published() => {
                    metrics::record_reload("failure");
                    tracing::error!(error = %e, "Configuration rejected, keeping the current routing table");
                }
                Err(e) => {
                    metrics::record_reload("failure");
                    tracing::error!(error = %e, "Initial configuration rejected");
                    status.send_replace(WatcherStatus::Failed(e.to_string()));
                    return Err(WatcherError::Bootstrap(e.to_string()));
                }
            }

            throttle.mark(Instant::now());
            continue;
        }

        if closed && coalescer.is_empty() {
            tracing::info!("All providers stopped, configuration watcher exiting");
            return Ok(());
        }

        let deadline = throttle.deadline().unwrap_or_else(Instant::now);
        tokio::select! {
            _ = wait_shutdown(&mut shutdown) => {
                tracing::info!("Configuration watcher stopping");
                return Ok(());
            }
            received = rx.recv(), if !closed => match received {
                Some(snapshot) => accept(snapshot, &mut coalescer),
                None => closed = true,
            },
            _ = sleep_until(deadline), if !coalescer.is_empty() => {}
        }
    }
}
