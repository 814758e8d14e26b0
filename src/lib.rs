//! Dynamic API gateway library.
//!
//! Providers publish configuration snapshots, the watcher merges and
//! compiles them into routing tables, and entrypoints serve traffic from
//! whichever table is live.

pub mod api;
pub mod config;
pub mod dynamic;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod middleware;
pub mod observability;
pub mod provider;
pub mod routing;
pub mod watcher;

pub use config::GatewayConfig;
pub use dynamic::DynamicModel;
pub use lifecycle::{Gateway, RunningGateway, Shutdown};
pub use middleware::MiddlewareRegistry;
