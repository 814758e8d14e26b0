//! Upstream pool of one service.
//!
//! # Responsibilities
//! - Hold the upstreams declared by a service
//! - Apply the load balancing algorithm to select one
//! - Provide guards for in-flight tracking

use std::sync::Arc;

use crate::dynamic::ServiceDef;
use crate::load_balancer::{
    round_robin::RoundRobin,
    upstream::{Upstream, UpstreamGuard},
    LoadBalancer,
};

#[derive(Debug)]
pub struct UpstreamPool {
    upstreams: Vec<Arc<Upstream>>,
    balancer: Box<dyn LoadBalancer>,
}

impl UpstreamPool {
    /// Create a round-robin pool from a service definition.
    pub fn from_service(service: &ServiceDef) -> Self {
        Self {
            upstreams: service
                .servers
                .iter()
                .map(|s| Arc::new(Upstream::from_server(s)))
                .collect(),
            balancer: Box::new(RoundRobin::new()),
        }
    }

    /// Select an upstream and track the request against it.
    pub fn next(&self) -> Option<UpstreamGuard> {
        self.balancer
            .next_server(&self.upstreams)
            .map(|upstream| upstream.track())
    }

    pub fn upstreams(&self) -> &[Arc<Upstream>] {
        &self.upstreams
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::ServerDef;

    #[test]
    fn rotates_through_service_servers() {
        let service = ServiceDef::new(
            "svc",
            vec![ServerDef::new("10.0.0.1", 80), ServerDef::new("10.0.0.2", 80)],
        );
        let pool = UpstreamPool::from_service(&service);

        let first = pool.next().unwrap();
        assert_eq!(first.host, "10.0.0.1");
        assert_eq!(pool.upstreams()[0].in_flight(), 1);
        drop(first);

        assert_eq!(pool.next().unwrap().host, "10.0.0.2");
        assert_eq!(pool.upstreams()[0].in_flight(), 0);
    }
}
