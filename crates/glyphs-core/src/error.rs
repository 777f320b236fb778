//! Fatal error kinds the clustering engine can raise.
//!
//! Per the error handling design: invalid input, dead-glyph events, and
//! orphan-cell events are normal control flow, not errors — only the two
//! kinds below abort the run.

use thiserror::Error;

/// Fatal failures raised by the clustering engine.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// A split would have produced a cell smaller than `min_cell_size`.
    ///
    /// Indicates either `min_cell_size` set too large, or input with too
    /// many near-coincident points crammed into one region.
    #[error(
        "cell at {cell_rect:?} (depth {depth}) cannot be split further at t={at}: \
         min_cell_size would be violated (too many near-coincident points, \
         or min_cell_size set too large)"
    )]
    CapacityUnsatisfiable {
        /// The rectangle of the cell that could not be split.
        cell_rect: crate::geom::Rect,
        /// Recursion depth reached.
        depth: u32,
        /// Simulation time at which the split was attempted.
        at: f64,
    },

    /// The optional debug-mode invariant checker detected corruption.
    #[error("invariant violation: {detail}")]
    InvariantViolation {
        /// Human-readable description of which invariant failed and why.
        detail: String,
    },
}

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, ClusterError>;
