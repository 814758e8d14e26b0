//! Configuration providers.
//!
//! # Data Flow
//! ```text
//! Provider (file, ...)
//!     → SnapshotPublisher::publish(name, model)
//!     → unbounded channel
//!     → ConfigurationWatcher (single consumer)
//! ```
//!
//! # Design Decisions
//! - Publishing never blocks; the watcher throttles
//! - Publishing "nothing" is legal and never deletes earlier state
//! - Providers only see the publisher, never the watcher itself

pub mod file;

use std::path::PathBuf;

use tokio::sync::mpsc;
use thiserror::Error;

use crate::dynamic::{DynamicModel, ProviderSnapshot, SchemaError};

pub use file::FileProvider;

/// Errors raised by providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },

    #[error("file watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("configuration watcher is no longer running")]
    WatcherGone,
}

/// Handle providers use to post snapshots to the watcher.
#[derive(Debug, Clone)]
pub struct SnapshotPublisher {
    tx: mpsc::UnboundedSender<ProviderSnapshot>,
}

impl SnapshotPublisher {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ProviderSnapshot>) -> Self {
        Self { tx }
    }

    /// Post a provider's complete current configuration.
    pub fn publish(&self, provider: impl Into<String>, config: Option<DynamicModel>) -> Result<(), ProviderError> {
        self.tx
            .send(ProviderSnapshot::new(provider, config))
            .map_err(|_| ProviderError::WatcherGone)
    }

    /// True once the watcher has stopped consuming.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
