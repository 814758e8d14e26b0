//! Configuration schema definitions.
//!
//! This module defines the static configuration of the gateway: listeners,
//! providers and ambient settings. Routing itself is dynamic and lives in
//! provider documents, see [`crate::dynamic`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Named listeners routers are mounted on.
    pub entrypoints: Vec<EntrypointConfig>,

    /// Entrypoints given to routers that declare none. Empty means all.
    pub default_entrypoints: Vec<String>,

    /// Dynamic configuration sources.
    pub providers: ProvidersConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator API settings.
    pub api: ApiConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            entrypoints: vec![EntrypointConfig {
                name: "web".to_string(),
                address: "0.0.0.0:8080".to_string(),
            }],
            default_entrypoints: Vec::new(),
            providers: ProvidersConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn entrypoint_names(&self) -> Vec<String> {
        self.entrypoints.iter().map(|e| e.name.clone()).collect()
    }

    /// Defaults actually applied to routers without entrypoints.
    pub fn effective_default_entrypoints(&self) -> Vec<String> {
        if self.default_entrypoints.is_empty() {
            self.entrypoint_names()
        } else {
            self.default_entrypoints.clone()
        }
    }
}

/// A named listener.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EntrypointConfig {
    /// Name routers refer to.
    pub name: String,

    /// Bind address (e.g., "0.0.0.0:8080").
    pub address: String,
}

/// Provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvidersConfig {
    /// Minimum interval between two routing-table rebuilds, in milliseconds.
    pub throttle_ms: u64,

    /// File provider, disabled when absent.
    pub file: Option<FileProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 2000,
            file: None,
        }
    }
}

impl ProvidersConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

/// File provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileProviderConfig {
    /// TOML or JSON dynamic configuration document.
    pub path: PathBuf,

    /// Reload when the file changes.
    #[serde(default)]
    pub watch: bool,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Operator API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Enable the API listener.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// API bind address.
    pub bind_address: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
