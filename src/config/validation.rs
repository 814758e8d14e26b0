//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (default entrypoints exist)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one entrypoint is required")]
    NoEntrypoints,

    #[error("entrypoint with an empty name")]
    EmptyEntrypointName,

    #[error("duplicate entrypoint '{0}'")]
    DuplicateEntrypoint(String),

    #[error("entrypoint '{name}' has invalid address '{address}'")]
    InvalidAddress { name: String, address: String },

    #[error("default entrypoint '{0}' is not declared")]
    UnknownDefaultEntrypoint(String),

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("api is enabled but api_key is empty")]
    EmptyApiKey,

    #[error("invalid api bind address '{0}'")]
    InvalidApiAddress(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.entrypoints.is_empty() {
        errors.push(ValidationError::NoEntrypoints);
    }

    let mut names = HashSet::new();
    for entrypoint in &config.entrypoints {
        if entrypoint.name.is_empty() {
            errors.push(ValidationError::EmptyEntrypointName);
        } else if !names.insert(entrypoint.name.as_str()) {
            errors.push(ValidationError::DuplicateEntrypoint(entrypoint.name.clone()));
        }
        if entrypoint.address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                name: entrypoint.name.clone(),
                address: entrypoint.address.clone(),
            });
        }
    }

    for name in &config.default_entrypoints {
        if !names.contains(name.as_str()) {
            errors.push(ValidationError::UnknownDefaultEntrypoint(name.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if config.api.enabled {
        if config.api.api_key.is_empty() {
            errors.push(ValidationError::EmptyApiKey);
        }
        if config.api.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidApiAddress(config.api.bind_address.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
