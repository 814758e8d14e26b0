//! Semantic validation of a dynamic model.
//!
//! # Responsibilities
//! - Names are non-empty and unique per kind
//! - Rules are non-empty (grammar is checked by the rule parser)
//! - Services have at least one well-formed server
//! - Middleware types are registered
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Reference resolution (router → service/middleware) is left to the
//!   routing factory, which reports it with the router involved

use std::collections::HashSet;

use thiserror::Error;

use crate::dynamic::model::DynamicModel;

/// A single semantic problem in a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("{kind} with an empty name")]
    EmptyName { kind: &'static str },

    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    #[error("router '{router}' has an empty rule")]
    EmptyRule { router: String },

    #[error("service '{service}' declares no servers")]
    NoServers { service: String },

    #[error("service '{service}' has an invalid server host '{host}'")]
    InvalidHost { service: String, host: String },

    #[error("service '{service}' has a server on port 0")]
    InvalidPort { service: String },

    #[error("middleware '{middleware}' has unregistered type '{kind}'")]
    UnknownMiddlewareType { middleware: String, kind: String },
}

/// Validate a model. `is_registered` tells whether a middleware type exists.
pub fn validate_model<F>(model: &DynamicModel, is_registered: F) -> Result<(), Vec<ModelError>>
where
    F: Fn(&str) -> bool,
{
    let mut errors = Vec::new();

    check_names("router", model.routers.iter().map(|r| r.name.as_str()), &mut errors);
    check_names("middleware", model.middlewares.iter().map(|m| m.name.as_str()), &mut errors);
    check_names("service", model.services.iter().map(|s| s.name.as_str()), &mut errors);

    for router in &model.routers {
        if router.rule.trim().is_empty() {
            errors.push(ModelError::EmptyRule {
                router: router.name.clone(),
            });
        }
    }

    for middleware in &model.middlewares {
        if !is_registered(&middleware.kind) {
            errors.push(ModelError::UnknownMiddlewareType {
                middleware: middleware.name.clone(),
                kind: middleware.kind.clone(),
            });
        }
    }

    for service in &model.services {
        if service.servers.is_empty() {
            errors.push(ModelError::NoServers {
                service: service.name.clone(),
            });
        }
        for server in &service.servers {
            if url::Host::parse(&server.host).is_err() {
                errors.push(ModelError::InvalidHost {
                    service: service.name.clone(),
                    host: server.host.clone(),
                });
            }
            if server.port == 0 {
                errors.push(ModelError::InvalidPort {
                    service: service.name.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_names<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ModelError>,
) {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            errors.push(ModelError::EmptyName { kind });
        } else if !seen.insert(name) {
            errors.push(ModelError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::model::{MiddlewareDef, RouterDef, ServerDef, ServiceDef};

    fn valid_model() -> DynamicModel {
        DynamicModel {
            routers: vec![RouterDef::new("r", "Path('/')", "svc")],
            middlewares: vec![MiddlewareDef::new("m", "headers", Default::default())],
            services: vec![ServiceDef::new("svc", vec![ServerDef::new("127.0.0.1", 8080)])],
        }
    }

    #[test]
    fn accepts_valid_model() {
        assert!(validate_model(&valid_model(), |kind| kind == "headers").is_ok());
    }

    #[test]
    fn reports_every_error() {
        let mut model = valid_model();
        model.routers.push(RouterDef::new("r", " ", "svc"));
        model.services.push(ServiceDef::new("empty", vec![]));
        model.services.push(ServiceDef::new("bad", vec![ServerDef::new("", 0)]));

        let errors = validate_model(&model, |_| false).unwrap_err();
        assert!(errors.contains(&ModelError::DuplicateName {
            kind: "router",
            name: "r".into()
        }));
        assert!(errors.contains(&ModelError::EmptyRule { router: "r".into() }));
        assert!(errors.contains(&ModelError::NoServers {
            service: "empty".into()
        }));
        assert!(errors.contains(&ModelError::InvalidHost {
            service: "bad".into(),
            host: String::new()
        }));
        assert!(errors.contains(&ModelError::InvalidPort {
            service: "bad".into()
        }));
        assert!(errors.contains(&ModelError::UnknownMiddlewareType {
            middleware: "m".into(),
            kind: "headers".into()
        }));
    }
}
