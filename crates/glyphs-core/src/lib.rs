//! Event-driven agglomerative clustering of growing weighted glyphs.
//!
//! A glyph is a point that grows outward over time according to a
//! pluggable [`grow::GrowFn`]; whenever two glyphs' regions touch they
//! merge, and the history of merges forms a [`dendrogram::Dendrogram`].
//! [`engine::naive`] computes this by brute force; [`engine::quadtree_engine`]
//! accelerates it with an adaptive spatial index ([`quadtree`]) and an
//! event-driven main loop over a global priority queue ([`event`]).

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod dendrogram;
pub mod engine;
pub mod error;
pub mod event;
pub mod geom;
pub mod glyph;
pub mod grow;
pub mod params;
pub mod quadtree;
pub mod recorder;

pub use dendrogram::{Dendrogram, DendroNode, NodeId};
pub use engine::{CancelToken, ClusterOutcome};
pub use error::{ClusterError, Result};
pub use event::{Event, EventKind, EventQueue};
pub use geom::{Point, Quadrant, Rect, Side};
pub use glyph::{Glyph, GlyphArena, GlyphId, Liveness};
pub use grow::{AreaLinearSquares, CircularLinear, GlyphGeom, GrowFn, LinearSquares, LogarithmicSquares};
pub use params::{EngineParams, QueueBucketing};
pub use quadtree::{Cell, CellId, Quadtree};
pub use recorder::FirstMergeRecorder;
