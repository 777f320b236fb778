//! Input parsing, projection, synthetic generators, and dendrogram
//! (de)serialization for `glyphs-core`.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod dendrogram_io;
pub mod generator;
pub mod points;
pub mod projection;

pub use dendrogram_io::{read_dendrogram, write_dendrogram, DendrogramArtifact};
pub use points::{read_points, WeightedPoint};
pub use projection::{project, unproject};
