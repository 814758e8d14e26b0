//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → lifecycle::startup (entrypoints, providers, API)
//! ```
//!
//! # Design Decisions
//! - Static config is immutable once loaded; routing changes arrive through providers
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ApiConfig, EntrypointConfig, FileProviderConfig, GatewayConfig, LogFormat, ObservabilityConfig,
    ProvidersConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
