//! Startup orchestration.
//!
//! # Responsibilities
//! - Wire the middleware registry, router factory, watcher and providers
//! - Wait for the first routing table
//! - Bind entrypoints and the operator API
//!
//! # Design Decisions
//! - Fail fast: a first configuration that does not compile aborts startup
//! - Listeners start last (traffic only when ready)
//! - Bound addresses are reported back, so port 0 works

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::api::{self, ApiState};
use crate::config::GatewayConfig;
use crate::dynamic::DynamicModel;
use crate::http::{build_client, EntrypointServer};
use crate::lifecycle::shutdown::Shutdown;
use crate::middleware::MiddlewareRegistry;
use crate::provider::{FileProvider, ProviderError, SnapshotPublisher};
use crate::routing::{RouterFactory, TableSwapController};
use crate::watcher::{ConfigurationWatcher, WatcherError, WatcherHandle, WatcherSettings, WatcherStatus};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind '{name}' on {address}: {source}")]
    Bind {
        name: String,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Watcher(#[from] WatcherError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A configured, not yet started gateway.
pub struct Gateway {
    config: GatewayConfig,
    tables: Arc<TableSwapController>,
    watcher: ConfigurationWatcher,
    api: Option<ApiState>,
}

impl Gateway {
    pub fn new(config: GatewayConfig, registry: MiddlewareRegistry) -> Self {
        let tables = Arc::new(TableSwapController::new());
        let factory = RouterFactory::new(
            Arc::new(registry),
            config.entrypoint_names(),
            build_client(config.timeouts.connect()),
        );
        let settings = WatcherSettings {
            throttle: config.providers.throttle(),
            default_entrypoints: config.effective_default_entrypoints(),
        };
        let mut watcher = ConfigurationWatcher::new(settings, factory, tables.clone());

        let api = config
            .api
            .enabled
            .then(|| ApiState::new(tables.clone(), &config.api.api_key));
        if let Some(api) = &api {
            watcher.add_listener(api.listener());
        }

        Self {
            config,
            tables,
            watcher,
            api,
        }
    }

    /// Publisher for providers running outside the gateway.
    pub fn publisher(&self) -> SnapshotPublisher {
        self.watcher.publisher()
    }

    pub fn tables(&self) -> Arc<TableSwapController> {
        self.tables.clone()
    }

    /// Register an extra listener, called after the built-in ones.
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(&DynamicModel) + Send + Sync + 'static,
    {
        self.watcher.add_listener(listener);
    }

    /// Start providers and the watcher, wait for the first table, then bind.
    pub async fn start(self, shutdown: &Shutdown) -> Result<RunningGateway, StartupError> {
        let Self {
            config,
            tables,
            watcher,
            api,
        } = self;

        let file_watcher = match &config.providers.file {
            Some(file) => FileProvider::new(&file.path)
                .with_watch(file.watch)
                .provide(watcher.publisher())?,
            None => None,
        };

        let watcher = watcher.with_shutdown(shutdown.subscribe()).start();
        tracing::info!("Waiting for initial configuration");
        let generation = watcher.bootstrapped().await?;
        tracing::info!(generation, "Initial configuration applied");

        let mut entrypoints = BTreeMap::new();
        let mut servers = Vec::new();
        for entrypoint in &config.entrypoints {
            let listener = bind(&entrypoint.name, &entrypoint.address).await?;
            let addr = listener.local_addr()?;
            let server = EntrypointServer::new(&entrypoint.name, tables.clone(), config.timeouts.request());
            servers.push(tokio::spawn(server.run(listener, shutdown.signal())));
            entrypoints.insert(entrypoint.name.clone(), addr);
        }

        let api_addr = match api {
            Some(state) => {
                let listener = bind("api", &config.api.bind_address).await?;
                let addr = listener.local_addr()?;
                servers.push(tokio::spawn(api::serve(listener, state, shutdown.signal())));
                Some(addr)
            }
            None => None,
        };

        Ok(RunningGateway {
            entrypoints,
            api_addr,
            watcher,
            servers,
            _file_watcher: file_watcher,
        })
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("entrypoints", &self.config.entrypoint_names())
            .field("api", &self.api.is_some())
            .finish()
    }
}

async fn bind(name: &str, address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            name: name.to_string(),
            address: address.to_string(),
            source,
        })
}

/// A gateway serving traffic.
pub struct RunningGateway {
    entrypoints: BTreeMap<String, SocketAddr>,
    api_addr: Option<SocketAddr>,
    watcher: WatcherHandle,
    servers: Vec<JoinHandle<Result<(), std::io::Error>>>,
    _file_watcher: Option<RecommendedWatcher>,
}

impl RunningGateway {
    /// Bound address of an entrypoint.
    pub fn entrypoint_addr(&self, name: &str) -> Option<SocketAddr> {
        self.entrypoints.get(name).copied()
    }

    pub fn api_addr(&self) -> Option<SocketAddr> {
        self.api_addr
    }

    pub fn watcher_status(&self) -> WatcherStatus {
        self.watcher.status()
    }

    /// Wait until every listener has stopped.
    pub async fn wait(self) -> Result<(), StartupError> {
        for server in self.servers {
            server.await??;
        }
        self.watcher.join().await?;
        tracing::info!("Gateway stopped");
        Ok(())
    }
}
