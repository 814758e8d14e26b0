//! Dynamic configuration subsystem.
//!
//! # Data Flow
//! ```text
//! provider document (TOML/JSON)
//!     → schema.rs (closed `http.{routers,middlewares,services}` form)
//!     → model.rs (DynamicModel, one per provider snapshot)
//!     → merge.rs (AggregatorState → qualified, merged DynamicModel)
//!     → validation.rs (semantic checks before compilation)
//!     → routing::factory (compiled table)
//! ```
//!
//! # Design Decisions
//! - Model types are plain values; equality is structural
//! - Merge is a pure function of the aggregator state and cannot fail
//! - Every name is qualified with its provider, so providers never collide

pub mod merge;
pub mod model;
pub mod schema;
pub mod validation;

pub use merge::{merge_configurations, qualify, AggregatorState, PROVIDER_SEPARATOR};
pub use model::{
    DynamicModel, MiddlewareDef, MiddlewareOptions, Protocol, ProviderSnapshot, RouterDef,
    ServerDef, ServiceDef, TlsOptions,
};
pub use schema::{parse_document, DocumentFormat, SchemaError};
pub use validation::{validate_model, ModelError};
