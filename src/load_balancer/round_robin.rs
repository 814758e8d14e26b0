//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{upstream::Upstream, LoadBalancer};

/// Round-robin selector.
/// Stores an internal counter to rotate through upstreams.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, upstreams: &[Arc<Upstream>]) -> Option<Arc<Upstream>> {
        if upstreams.is_empty() {
            return None;
        }

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % upstreams.len();
        Some(Arc::clone(&upstreams[index]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::ServerDef;

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let u1 = Arc::new(Upstream::from_server(&ServerDef::new("127.0.0.1", 8080)));
        let u2 = Arc::new(Upstream::from_server(&ServerDef::new("127.0.0.1", 8081)));
        let upstreams = vec![u1.clone(), u2.clone()];

        assert_eq!(lb.next_server(&upstreams).unwrap().port, 8080);
        assert_eq!(lb.next_server(&upstreams).unwrap().port, 8081);
        assert_eq!(lb.next_server(&upstreams).unwrap().port, 8080);
    }

    #[test]
    fn empty_pool() {
        assert!(RoundRobin::new().next_server(&[]).is_none());
    }
}
