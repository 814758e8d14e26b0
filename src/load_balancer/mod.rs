//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → service handler
//!     → pool.rs (upstreams of the service)
//!     → round_robin.rs (rotate through upstreams)
//!     → upstream.rs (in-flight tracking guard)
//!     → forward request
//! ```
//!
//! # Design Decisions
//! - One pool per compiled service; rebuilt with every routing table
//! - Balancer state lives in the pool, not in the model
//! - In-flight counts are tracked per upstream and reported by `/api/entrypoints`

pub mod pool;
pub mod round_robin;
pub mod upstream;

use std::sync::Arc;

/// Strategy choosing the next upstream of a service.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    fn next_server(&self, upstreams: &[Arc<Upstream>]) -> Option<Arc<Upstream>>;
}

pub use pool::UpstreamPool;
pub use round_robin::RoundRobin;
pub use upstream::{Upstream, UpstreamGuard};
