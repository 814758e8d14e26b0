//! Routing-table compiler.
//!
//! Turns a merged [`DynamicModel`] into a [`CompiledTable`]. Every step can
//! fail the whole build; a partial table is never returned.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use futures_util::future::try_join_all;
use thiserror::Error;

use crate::dynamic::{validate_model, DynamicModel, ModelError};
use crate::http::forward::{ServiceHandler, UpstreamClient};
use crate::middleware::{Middleware, MiddlewareChain, MiddlewareError, MiddlewareRegistry};
use crate::routing::rule::{parse_rule, RuleError};
use crate::routing::table::{CompiledRoute, CompiledTable, EntrypointTable};

/// Errors aborting a table build.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidModel(Vec<ModelError>),

    #[error("router '{router}' has an invalid rule: {source}")]
    Rule {
        router: String,
        #[source]
        source: RuleError,
    },

    #[error("router '{router}' references unknown service '{service}'")]
    UnknownService { router: String, service: String },

    #[error("router '{router}' references unknown middleware '{middleware}'")]
    UnknownMiddleware { router: String, middleware: String },

    #[error("router '{router}' references unknown entrypoint '{entrypoint}'")]
    UnknownEntrypoint { router: String, entrypoint: String },

    #[error("router '{router}' is not attached to any entrypoint")]
    NoEntrypoints { router: String },

    #[error(transparent)]
    Middleware(#[from] MiddlewareError),
}

fn join_errors(errors: &[ModelError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Builds routing tables for a fixed set of entrypoints.
#[derive(Debug, Clone)]
pub struct RouterFactory {
    registry: Arc<MiddlewareRegistry>,
    entrypoints: Vec<String>,
    client: UpstreamClient,
}

impl RouterFactory {
    pub fn new(registry: Arc<MiddlewareRegistry>, entrypoints: Vec<String>, client: UpstreamClient) -> Self {
        Self {
            registry,
            entrypoints,
            client,
        }
    }

    /// Compile a model. Middleware creation is awaited before returning.
    pub async fn build(&self, model: &DynamicModel) -> Result<CompiledTable, CompileError> {
        validate_model(model, |kind| self.registry.contains(kind)).map_err(CompileError::InvalidModel)?;

        let mut rules = Vec::with_capacity(model.routers.len());
        for router in &model.routers {
            let rule = parse_rule(&router.rule).map_err(|source| CompileError::Rule {
                router: router.name.clone(),
                source,
            })?;
            rules.push(rule);
        }

        // One handler per service, shared by every router targeting it.
        let mut services: HashMap<&str, Arc<ServiceHandler>> = HashMap::new();
        for router in &model.routers {
            if services.contains_key(router.service.as_str()) {
                continue;
            }
            let def = model
                .service(&router.service)
                .ok_or_else(|| CompileError::UnknownService {
                    router: router.name.clone(),
                    service: router.service.clone(),
                })?;
            services.insert(def.name.as_str(), Arc::new(ServiceHandler::new(def, self.client.clone())));
        }

        let mut referenced = BTreeSet::new();
        for router in &model.routers {
            for name in &router.middlewares {
                let def = model
                    .middleware(name)
                    .ok_or_else(|| CompileError::UnknownMiddleware {
                        router: router.name.clone(),
                        middleware: name.clone(),
                    })?;
                referenced.insert(def.name.as_str());
            }
        }

        let pending = referenced
            .iter()
            .filter_map(|name| model.middleware(name))
            .map(|def| self.registry.create(def))
            .collect::<Result<Vec<_>, _>>()?;
        let created = try_join_all(pending).await?;
        let instances: HashMap<&str, Arc<dyn Middleware>> = referenced.into_iter().zip(created).collect();

        let mut grouped: BTreeMap<&str, Vec<Arc<CompiledRoute>>> =
            self.entrypoints.iter().map(|name| (name.as_str(), Vec::new())).collect();

        for (router, rule) in model.routers.iter().zip(rules) {
            if router.entrypoints.is_empty() {
                return Err(CompileError::NoEntrypoints {
                    router: router.name.clone(),
                });
            }
            if let Some(unknown) = router.entrypoints.iter().find(|ep| !grouped.contains_key(ep.as_str())) {
                return Err(CompileError::UnknownEntrypoint {
                    router: router.name.clone(),
                    entrypoint: unknown.clone(),
                });
            }

            let mut chain = Vec::with_capacity(router.middlewares.len());
            for name in &router.middlewares {
                let instance = instances
                    .get(name.as_str())
                    .cloned()
                    .ok_or_else(|| CompileError::UnknownMiddleware {
                        router: router.name.clone(),
                        middleware: name.clone(),
                    })?;
                chain.push((name.clone(), instance));
            }
            let service = services
                .get(router.service.as_str())
                .cloned()
                .ok_or_else(|| CompileError::UnknownService {
                    router: router.name.clone(),
                    service: router.service.clone(),
                })?;

            let route = Arc::new(CompiledRoute::new(
                router.name.clone(),
                rule,
                router.priority.unwrap_or(0),
                MiddlewareChain::new(chain, service),
            ));
            for entrypoint in &router.entrypoints {
                if let Some(routes) = grouped.get_mut(entrypoint.as_str()) {
                    routes.push(route.clone());
                }
            }
        }

        let table = CompiledTable::new(
            grouped
                .into_iter()
                .map(|(name, routes)| EntrypointTable::new(name, routes)),
        );

        tracing::debug!(
            routers = model.routers.len(),
            services = services.len(),
            middlewares = instances.len(),
            routes = table.route_count(),
            "Routing table compiled"
        );

        Ok(table)
    }
}
