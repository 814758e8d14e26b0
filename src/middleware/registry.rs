//! Middleware type registry.
//!
//! Maps a middleware `type` to the factory that builds instances of it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::dynamic::{MiddlewareDef, MiddlewareOptions};
use crate::middleware::{access_log, headers, rate_limit, strip_prefix, Middleware, MiddlewareError};

/// Pending result of a factory.
pub type MiddlewareFuture = BoxFuture<'static, Result<Arc<dyn Middleware>, MiddlewareError>>;

/// Everything a factory gets to build one instance.
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    /// Qualified middleware name, used in errors and logs.
    pub name: String,
    pub kind: String,
    pub options: MiddlewareOptions,
}

/// Builds middleware instances of one type.
pub trait MiddlewareFactory: Send + Sync {
    fn create(&self, context: MiddlewareContext) -> MiddlewareFuture;
}

impl<F, Fut> MiddlewareFactory for F
where
    F: Fn(MiddlewareContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Arc<dyn Middleware>, MiddlewareError>> + Send + 'static,
{
    fn create(&self, context: MiddlewareContext) -> MiddlewareFuture {
        Box::pin(self(context))
    }
}

/// Registered middleware types.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    factories: HashMap<String, Arc<dyn MiddlewareFactory>>,
}

impl MiddlewareRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the bundled middleware types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(headers::KIND, headers::create);
        registry.register(strip_prefix::KIND, strip_prefix::create);
        registry.register(rate_limit::KIND, rate_limit::create);
        registry.register(access_log::KIND, access_log::create);
        registry
    }

    /// Register a factory, replacing any previous one for the same type.
    pub fn register(&mut self, kind: impl Into<String>, factory: impl MiddlewareFactory + 'static) {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered type names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Start creating an instance for a definition.
    pub fn create(&self, def: &MiddlewareDef) -> Result<MiddlewareFuture, MiddlewareError> {
        let factory = self
            .factories
            .get(&def.kind)
            .ok_or_else(|| MiddlewareError::UnknownType {
                name: def.name.clone(),
                kind: def.kind.clone(),
            })?;

        Ok(factory.create(MiddlewareContext {
            name: def.name.clone(),
            kind: def.kind.clone(),
            options: def.options.clone(),
        }))
    }
}

impl std::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: serde_json::Value) -> MiddlewareOptions {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn builtins_are_registered() {
        let registry = MiddlewareRegistry::with_builtins();
        assert_eq!(
            registry.kinds(),
            vec!["access-log", "headers", "rate-limit", "strip-prefix"]
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let registry = MiddlewareRegistry::with_builtins();
        let def = MiddlewareDef::new("m@p", "unknown", MiddlewareOptions::new());
        assert!(matches!(
            registry.create(&def),
            Err(MiddlewareError::UnknownType { .. })
        ));
    }

    #[tokio::test]
    async fn creates_builtin_instance() {
        let registry = MiddlewareRegistry::with_builtins();
        let def = MiddlewareDef::new(
            "strip@p",
            "strip-prefix",
            options(json!({ "prefixes": ["/api"] })),
        );
        assert!(registry.create(&def).unwrap().await.is_ok());
    }

    #[tokio::test]
    async fn custom_factory_errors_are_surfaced() {
        let mut registry = MiddlewareRegistry::new();
        registry.register("broken", |ctx: MiddlewareContext| async move {
            Err::<Arc<dyn Middleware>, _>(MiddlewareError::Creation {
                name: ctx.name,
                reason: "backend unavailable".into(),
            })
        });

        let def = MiddlewareDef::new("b@p", "broken", MiddlewareOptions::new());
        let err = registry.create(&def).unwrap().await.unwrap_err();
        assert!(err.to_string().contains("backend unavailable"));
    }
}
