//! Compiled routing table.
//!
//! # Responsibilities
//! - Hold the ordered routes of each entrypoint
//! - Find the first route matching a request
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Ordering: priority desc, then rule specificity desc, then name asc
//! - O(n) scan per request (acceptable for typical route counts)
//! - Explicit no-match rather than a silent default route

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};

use crate::middleware::MiddlewareChain;
use crate::routing::matcher::Matcher;
use crate::routing::rule::Rule;

/// One router, ready to serve.
#[derive(Debug)]
pub struct CompiledRoute {
    name: String,
    rule: Rule,
    priority: i32,
    matcher: Box<dyn Matcher>,
    chain: MiddlewareChain,
}

impl CompiledRoute {
    pub fn new(name: impl Into<String>, rule: Rule, priority: i32, chain: MiddlewareChain) -> Self {
        let matcher = rule.to_matcher();
        Self {
            name: name.into(),
            rule,
            priority,
            matcher,
            chain,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn chain(&self) -> &MiddlewareChain {
        &self.chain
    }

    pub fn matches(&self, request: &Request<Body>) -> bool {
        self.matcher.matches(request)
    }

    /// Run the request through this route's chain.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        self.chain.handle(request).await
    }
}

fn route_order(a: &Arc<CompiledRoute>, b: &Arc<CompiledRoute>) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.rule.specificity().cmp(&a.rule.specificity()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Ordered routes mounted on one entrypoint.
#[derive(Debug)]
pub struct EntrypointTable {
    name: String,
    routes: Vec<Arc<CompiledRoute>>,
}

impl EntrypointTable {
    pub fn new(name: impl Into<String>, mut routes: Vec<Arc<CompiledRoute>>) -> Self {
        routes.sort_by(route_order);
        Self {
            name: name.into(),
            routes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Routes in evaluation order.
    pub fn routes(&self) -> &[Arc<CompiledRoute>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route whose rule matches the request.
    pub fn match_request(&self, request: &Request<Body>) -> Option<&CompiledRoute> {
        self.routes
            .iter()
            .find(|route| route.matches(request))
            .map(Arc::as_ref)
    }
}

/// The complete table: one sub-table per configured entrypoint.
#[derive(Debug, Default)]
pub struct CompiledTable {
    entrypoints: HashMap<String, EntrypointTable>,
}

impl CompiledTable {
    pub fn new(entrypoints: impl IntoIterator<Item = EntrypointTable>) -> Self {
        Self {
            entrypoints: entrypoints
                .into_iter()
                .map(|table| (table.name.clone(), table))
                .collect(),
        }
    }

    pub fn entrypoint(&self, name: &str) -> Option<&EntrypointTable> {
        self.entrypoints.get(name)
    }

    /// Entrypoint names, sorted.
    pub fn entrypoint_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entrypoints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of route entries across all entrypoints.
    pub fn route_count(&self) -> usize {
        self.entrypoints.values().map(EntrypointTable::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::{ServerDef, ServiceDef};
    use crate::http::forward::{build_client, ServiceHandler};
    use crate::routing::rule::parse_rule;
    use std::time::Duration;

    fn route(name: &str, rule: &str, priority: i32) -> Arc<CompiledRoute> {
        let service = ServiceDef::new("svc@test", vec![ServerDef::new("127.0.0.1", 9)]);
        let handler = Arc::new(ServiceHandler::new(&service, build_client(Duration::from_secs(1))));
        Arc::new(CompiledRoute::new(
            name,
            parse_rule(rule).unwrap(),
            priority,
            MiddlewareChain::new(Vec::new(), handler),
        ))
    }

    fn request(host: &str, path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header("host", host)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn longer_prefix_wins() {
        let table = EntrypointTable::new(
            "web",
            vec![route("a", "PathPrefix('/a')", 0), route("ab", "PathPrefix('/a/b')", 0)],
        );

        let matched = table.match_request(&request("x", "/a/b/x")).unwrap();
        assert_eq!(matched.name(), "ab");

        let matched = table.match_request(&request("x", "/a/c")).unwrap();
        assert_eq!(matched.name(), "a");
    }

    #[test]
    fn priority_overrides_specificity() {
        let table = EntrypointTable::new(
            "web",
            vec![route("catch-all", "PathPrefix('/')", 10), route("api", "PathPrefix('/api')", 0)],
        );
        assert_eq!(table.match_request(&request("x", "/api/v1")).unwrap().name(), "catch-all");
    }

    #[test]
    fn ties_are_ordered_by_name() {
        let table = EntrypointTable::new(
            "web",
            vec![route("b", "PathPrefix('/x')", 0), route("a", "PathPrefix('/y')", 0)],
        );
        let names: Vec<&str> = table.routes().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn no_match_is_none() {
        let table = EntrypointTable::new("web", vec![route("h", "Host('api.example.com')", 0)]);
        assert!(table.match_request(&request("www.example.com", "/")).is_none());
        assert!(table.match_request(&request("API.example.com:8080", "/")).is_some());
    }

    #[test]
    fn table_counts_routes_per_entrypoint() {
        let shared = route("shared", "Path('/')", 0);
        let table = CompiledTable::new(vec![
            EntrypointTable::new("web", vec![shared.clone()]),
            EntrypointTable::new("admin", vec![shared]),
        ]);
        assert_eq!(table.entrypoint_names(), vec!["admin", "web"]);
        assert_eq!(table.route_count(), 2);
        assert!(table.entrypoint("missing").is_none());
    }
}
