//! The engines that turn a set of growing glyphs into a dendrogram.
//!
//! Two implementations share the same contract: [`naive::cluster_naive`] is
//! the O(n^2 log n) pairwise reference algorithm used to check the
//! quadtree-accelerated [`quadtree_engine::cluster_quadtree`] for
//! equivalence; production code always wants the latter.

pub mod naive;
pub mod quadtree_engine;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dendrogram::Dendrogram;

/// A cheaply cloneable flag checked at the top of the main loop, so a
/// long-running cluster can be cancelled from another thread.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Construct a token that starts out not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of running either engine to completion (or cancellation).
#[derive(Debug)]
pub struct ClusterOutcome {
    /// The merge tree built so far. Complete (single root) unless the run
    /// was cancelled or the input had fewer than two glyphs.
    pub dendrogram: Dendrogram,
    /// Total events popped from the global queue and acted on.
    pub events_processed: usize,
    /// Total events popped and discarded as stale.
    pub events_discarded: usize,
    /// Whether the run stopped early due to cancellation rather than
    /// reaching a single root.
    pub cancelled: bool,
}
