//! File provider: one TOML or JSON document, optionally watched for changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::dynamic::{parse_document, DocumentFormat, DynamicModel};
use crate::provider::{ProviderError, SnapshotPublisher};

/// Name this provider publishes under.
pub const PROVIDER_NAME: &str = "file";

#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
    watch: bool,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            watch: false,
        }
    }

    /// Re-publish whenever the file changes.
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document once.
    pub fn load(&self) -> Result<DynamicModel, ProviderError> {
        load_file(&self.path)
    }

    /// Publish the current document, then start watching if enabled.
    ///
    /// A failed initial load is returned to the caller. Later parse failures
    /// are logged and nothing is published for them. The returned watcher
    /// must be kept alive for updates to flow.
    pub fn provide(&self, publisher: SnapshotPublisher) -> Result<Option<RecommendedWatcher>, ProviderError> {
        let model = self.load()?;
        publisher.publish(PROVIDER_NAME, Some(model))?;
        tracing::info!(path = ?self.path, "File provider loaded configuration");

        if !self.watch {
            return Ok(None);
        }

        // Editors often save by renaming a temp file over the document, which
        // would orphan a watch on the file itself. Watch the directory instead.
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(|name| name.to_os_string());
        let path = self.path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_document = event
                        .paths
                        .iter()
                        .any(|changed| changed.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_document && (event.kind.is_modify() || event.kind.is_create()) {
                        tracing::info!(path = ?path, "Dynamic configuration change detected");
                        match load_file(&path) {
                            Ok(model) => {
                                if publisher.publish(PROVIDER_NAME, Some(model)).is_err() {
                                    tracing::warn!("Configuration watcher gone, dropping file update");
                                }
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload dynamic configuration, keeping current one");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "File watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, directory = ?directory, "File provider watching for changes");
        Ok(Some(watcher))
    }
}

fn load_file(path: &Path) -> Result<DynamicModel, ProviderError> {
    let content = std::fs::read_to_string(path).map_err(|source| ProviderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&content, DocumentFormat::from_path(path)).map_err(|source| ProviderError::Schema {
        path: path.to_path_buf(),
        source,
    })
}
