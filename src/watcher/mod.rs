//! Configuration watcher subsystem.
//!
//! # Data Flow
//! ```text
//! SnapshotPublisher (providers)
//!     → mpsc channel
//!     → configuration.rs (accept: drop empty snapshots)
//!     → throttle.rs (coalesce per provider until the interval elapses)
//!     → AggregatorState update + merge
//!     → dedupe against the last published model
//!     → RouterFactory::build → TableSwapController::swap
//!     → listeners (registration order)
//! ```
//!
//! # Design Decisions
//! - One task owns the aggregation state; no locks around it
//! - At most one compile in flight; snapshots arriving meanwhile are coalesced
//! - First failure is fatal, later failures keep the previous table

pub mod configuration;
pub mod throttle;

pub use configuration::{
    ConfigurationWatcher, Listener, WatcherError, WatcherHandle, WatcherSettings, WatcherStatus,
};
pub use throttle::{Coalescer, Throttle};
