//! Persisted form of a dynamic configuration document.
//!
//! ```toml
//! [[http.routers]]
//! name = "api"
//! rule = "PathPrefix('/api')"
//! service = "backend"
//!
//! [[http.services]]
//! name = "backend"
//! servers = [{ host = "10.0.0.5", port = 8080 }]
//! ```
//!
//! Documents are closed: unknown keys at any level are rejected.
//! Middleware `options` are the one open map, left to the middleware factory.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dynamic::model::DynamicModel;

/// Top-level document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct DynamicDocument {
    #[serde(default)]
    http: DynamicModel,
}

/// Serialization format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Toml,
        }
    }
}

/// Errors raised while reading a document against the schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// TOML document did not match the schema.
    #[error("Invalid TOML document: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON document did not match the schema.
    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a document into the model it declares.
pub fn parse_document(content: &str, format: DocumentFormat) -> Result<DynamicModel, SchemaError> {
    let document: DynamicDocument = match format {
        DocumentFormat::Toml => toml::from_str(content)?,
        DocumentFormat::Json => serde_json::from_str(content)?,
    };
    Ok(document.http)
}
