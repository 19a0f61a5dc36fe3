//! Graph layer — lazy import graph and distance map construction.

pub mod distance;
pub mod index;

pub use distance::{DistanceMap, DistanceRankBuilder};
pub use index::SourceGraphIndex;
