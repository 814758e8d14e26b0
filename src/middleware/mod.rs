//! Middleware subsystem.
//!
//! # Data Flow
//! ```text
//! MiddlewareDef {name, type, options}
//!     → registry.rs (type → factory, creation may be async and may fail)
//!     → Arc<dyn Middleware>
//!     → chain.rs (declared order, then the service handler)
//!
//! Request:
//!     middleware[0] → middleware[1] → ... → ServiceHandler::forward
//! ```
//!
//! # Design Decisions
//! - Factories are registered once at startup; unknown types are typed errors
//! - Each factory validates its own options and rejects unknown keys
//! - Instances are immutable and shared by every router that references them

pub mod access_log;
pub mod chain;
pub mod headers;
pub mod rate_limit;
pub mod registry;
pub mod strip_prefix;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use chain::{MiddlewareChain, Next};
pub use registry::{MiddlewareContext, MiddlewareFactory, MiddlewareFuture, MiddlewareRegistry};

/// A request/response processing step.
pub trait Middleware: Send + Sync + std::fmt::Debug {
    /// Process the request, usually by delegating to `next`.
    fn handle<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response<Body>>;
}

/// Errors raised while creating a middleware.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    /// No factory is registered for the type.
    #[error("middleware '{name}' has unknown type '{kind}'")]
    UnknownType { name: String, kind: String },

    /// Options did not deserialize.
    #[error("invalid options for middleware '{name}': {source}")]
    InvalidOptions {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Options deserialized but are not acceptable.
    #[error("invalid configuration for middleware '{name}': {reason}")]
    Invalid { name: String, reason: String },

    /// The factory failed to produce an instance (e.g. a remote dependency).
    #[error("middleware '{name}' could not be created: {reason}")]
    Creation { name: String, reason: String },
}

/// Deserialize a middleware's options into its typed form.
pub fn parse_options<T: DeserializeOwned>(context: &MiddlewareContext) -> Result<T, MiddlewareError> {
    serde_json::from_value(serde_json::Value::Object(context.options.clone())).map_err(|source| {
        MiddlewareError::InvalidOptions {
            name: context.name.clone(),
            source,
        }
    })
}
