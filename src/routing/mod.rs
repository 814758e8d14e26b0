//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Table Compilation (on every accepted configuration):
//!     DynamicModel (merged, qualified)
//!     → rule.rs (parse rule expressions)
//!     → factory.rs (resolve services and middlewares, build chains)
//!     → table.rs (order routes, group by entrypoint)
//!     → swap.rs (atomically replace the live table)
//!
//! Incoming Request (host, path)
//!     → swap.rs (load current table)
//!     → table.rs (first matching route of the entrypoint)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched route or no-match
//! ```
//!
//! # Design Decisions
//! - Tables are immutable once built and replaced as a whole
//! - Compilation is all-or-nothing
//! - No regex in hot path (exact and prefix matching only)
//! - Deterministic: same input always matches same route

pub mod factory;
pub mod matcher;
pub mod rule;
pub mod swap;
pub mod table;

pub use factory::{CompileError, RouterFactory};
pub use rule::{parse_rule, MatcherKind, Rule, RuleError};
pub use swap::{TableState, TableSwapController};
pub use table::{CompiledRoute, CompiledTable, EntrypointTable};
