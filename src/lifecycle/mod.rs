//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Static config → registry, watcher, providers
//!     → first routing table applied (or fatal error)
//!     → bind entrypoints and API
//!
//! Shutdown (shutdown.rs):
//!     Signal received → watcher stops → listeners drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: the first configuration must compile before traffic is accepted
//! - Listeners start last (traffic only when a table exists)

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, spawn_signal_handler};
pub use startup::{Gateway, RunningGateway, StartupError};
