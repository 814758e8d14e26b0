//! Dynamic configuration value types.
//!
//! These mirror the persisted document: routers, middlewares and services,
//! each identified by name. All types reject unknown fields when deserialized.

use serde::{Deserialize, Serialize};

/// Free-form middleware options, validated by the middleware's own factory.
pub type MiddlewareOptions = serde_json::Map<String, serde_json::Value>;

/// A routing rule bound to entrypoints, a middleware chain and a service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouterDef {
    /// Router name, unique within one model.
    pub name: String,

    /// Rule expression, e.g. `PathPrefix('/api')`.
    pub rule: String,

    /// Entrypoints the router is mounted on. Empty means the defaults.
    #[serde(default)]
    pub entrypoints: Vec<String>,

    /// Middleware names, applied in listed order.
    #[serde(default)]
    pub middlewares: Vec<String>,

    /// Name of the target service.
    pub service: String,

    /// Explicit priority (higher = tried first).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl RouterDef {
    pub fn new(name: impl Into<String>, rule: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule: rule.into(),
            entrypoints: Vec::new(),
            middlewares: Vec::new(),
            service: service.into(),
            priority: None,
        }
    }

    pub fn with_entrypoints<I, S>(mut self, entrypoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entrypoints = entrypoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_middlewares<I, S>(mut self, middlewares: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middlewares = middlewares.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// A named middleware instance of a registered type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MiddlewareDef {
    pub name: String,

    /// Registered middleware type, e.g. `headers`.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub options: MiddlewareOptions,
}

impl MiddlewareDef {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, options: MiddlewareOptions) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            options,
        }
    }
}

/// A load-balancing target set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDef {
    pub name: String,

    #[serde(default)]
    pub servers: Vec<ServerDef>,
}

impl ServiceDef {
    pub fn new(name: impl Into<String>, servers: Vec<ServerDef>) -> Self {
        Self {
            name: name.into(),
            servers,
        }
    }
}

/// Upstream protocol of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn scheme(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

/// TLS settings for an `https` server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct TlsOptions {
    /// SNI / verification name, defaults to the server host.
    pub server_name: Option<String>,
    pub insecure_skip_verify: bool,
}

/// A single backend server of a service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerDef {
    pub host: String,
    pub port: u16,

    #[serde(default)]
    pub protocol: Protocol,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_options: Option<TlsOptions>,
}

impl ServerDef {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: Protocol::Http,
            tls_options: None,
        }
    }
}

/// One complete dynamic configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct DynamicModel {
    pub routers: Vec<RouterDef>,
    pub middlewares: Vec<MiddlewareDef>,
    pub services: Vec<ServiceDef>,
}

impl DynamicModel {
    /// True when the model declares nothing at all.
    pub fn is_empty(&self) -> bool {
        self.routers.is_empty() && self.middlewares.is_empty() && self.services.is_empty()
    }

    pub fn router(&self, name: &str) -> Option<&RouterDef> {
        self.routers.iter().find(|r| r.name == name)
    }

    pub fn middleware(&self, name: &str) -> Option<&MiddlewareDef> {
        self.middlewares.iter().find(|m| m.name == name)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDef> {
        self.services.iter().find(|s| s.name == name)
    }
}

/// A configuration published by one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSnapshot {
    pub provider: String,
    pub config: Option<DynamicModel>,
}

impl ProviderSnapshot {
    pub fn new(provider: impl Into<String>, config: Option<DynamicModel>) -> Self {
        Self {
            provider: provider.into(),
            config,
        }
    }

    /// A snapshot without configuration, or with an empty one.
    pub fn is_empty(&self) -> bool {
        self.config.as_ref().map_or(true, DynamicModel::is_empty)
    }
}
