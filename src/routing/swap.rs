//! Atomic replacement of the live routing table.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::routing::table::CompiledTable;

/// Observable state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    NoTable,
    Serving { generation: u64 },
}

/// Holds the table currently serving traffic.
///
/// Readers take one `Arc` per request and keep it for the whole request, so a
/// concurrent swap never mixes entries of two tables. Failed compiles never
/// reach this type.
#[derive(Debug, Default)]
pub struct TableSwapController {
    current: ArcSwapOption<CompiledTable>,
    generation: AtomicU64,
}

impl TableSwapController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the live table, if any.
    pub fn load(&self) -> Option<Arc<CompiledTable>> {
        self.current.load_full()
    }

    pub fn is_serving(&self) -> bool {
        self.current.load().is_some()
    }

    /// Install a new table and return its generation (starting at 1).
    pub fn swap(&self, table: CompiledTable) -> u64 {
        self.current.store(Some(Arc::new(table)));
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> TableState {
        match self.generation() {
            0 => TableState::NoTable,
            generation => TableState::Serving { generation },
        }
    }
}
