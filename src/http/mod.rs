//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, one server per entrypoint)
//!     → request.rs (add or keep request ID)
//!     → routing table lookup (routing::table)
//!     → middleware chain
//!     → forward.rs (pick upstream, proxy request)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod server;

pub use forward::{build_client, ServiceHandler, UpstreamClient};
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::EntrypointServer;
