//! Provider aggregation and name qualification.
//!
//! Every router, middleware and service is renamed `<name>@<provider>` and
//! router references are rewritten to the same provider's qualified names.
//! A provider therefore only ever references what it declared itself.

use std::collections::BTreeMap;

use crate::dynamic::model::{DynamicModel, MiddlewareDef, RouterDef, ServiceDef};

/// Separator between an object name and its provider.
pub const PROVIDER_SEPARATOR: char = '@';

/// Qualify `name` with `provider`.
pub fn qualify(name: &str, provider: &str) -> String {
    format!("{name}{PROVIDER_SEPARATOR}{provider}")
}

/// Last model received from each provider.
///
/// Owned by the configuration watcher; providers are iterated in name order
/// so merging is deterministic.
#[derive(Debug, Clone, Default)]
pub struct AggregatorState {
    providers: BTreeMap<String, DynamicModel>,
}

impl AggregatorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the latest model of a provider, returning the one it replaces.
    pub fn update(&mut self, provider: impl Into<String>, model: DynamicModel) -> Option<DynamicModel> {
        self.providers.insert(provider.into(), model)
    }

    pub fn providers(&self) -> impl Iterator<Item = (&str, &DynamicModel)> {
        self.providers.iter().map(|(name, model)| (name.as_str(), model))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Merged view of all providers.
    pub fn merge(&self, default_entrypoints: &[String]) -> DynamicModel {
        merge_configurations(self, default_entrypoints)
    }
}

/// Merge all provider models into one qualified model.
///
/// Routers without entrypoints receive `default_entrypoints`.
pub fn merge_configurations(state: &AggregatorState, default_entrypoints: &[String]) -> DynamicModel {
    let mut merged = DynamicModel::default();

    for (provider, model) in state.providers() {
        for router in &model.routers {
            merged
                .routers
                .push(qualify_router(router, provider, default_entrypoints));
        }

        merged.middlewares.extend(model.middlewares.iter().map(|m| MiddlewareDef {
            name: qualify(&m.name, provider),
            kind: m.kind.clone(),
            options: m.options.clone(),
        }));

        merged.services.extend(model.services.iter().map(|s| ServiceDef {
            name: qualify(&s.name, provider),
            servers: s.servers.clone(),
        }));
    }

    merged
}

fn qualify_router(router: &RouterDef, provider: &str, default_entrypoints: &[String]) -> RouterDef {
    let entrypoints = if router.entrypoints.is_empty() {
        default_entrypoints.to_vec()
    } else {
        router.entrypoints.clone()
    };

    RouterDef {
        name: qualify(&router.name, provider),
        rule: router.rule.clone(),
        entrypoints,
        middlewares: router
            .middlewares
            .iter()
            .map(|m| qualify(m, provider))
            .collect(),
        service: qualify(&router.service, provider),
        priority: router.priority,
    }
}
