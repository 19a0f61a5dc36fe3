//! Import-graph distance map construction.
//!
//! Multi-source BFS outward from the changed files: every seed starts at
//! distance 0, each resolved local import adds one hop. The walk stops at a
//! configurable hop cap; files beyond it (or unreachable) simply never
//! appear in the map, which downstream ranking reads as "infinitely far".

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::config::GraphConfig;
use crate::graph::index::{normalize_path, SourceGraphIndex};

/// File path → hop distance from the nearest seed.
pub type DistanceMap = HashMap<String, u32>;

/// Paths under a dependency directory never enter the walk.
pub fn is_third_party(path: &str) -> bool {
    path.contains("/node_modules/") || path.starts_with("node_modules/")
}

/// Builds [`DistanceMap`]s over a shared per-run [`SourceGraphIndex`].
pub struct DistanceRankBuilder<'a> {
    index: &'a SourceGraphIndex,
    max_depth: u32,
}

impl<'a> DistanceRankBuilder<'a> {
    pub fn new(index: &'a SourceGraphIndex, max_depth: u32) -> Self {
        Self { index, max_depth }
    }

    pub fn from_config(index: &'a SourceGraphIndex, config: &GraphConfig) -> Self {
        Self::new(index, config.max_depth)
    }

    /// Walk outward from `seeds` and return every file within the hop cap.
    ///
    /// The frontier is FIFO and a file's recorded distance only ever
    /// improves, so with unit edge weights each file settles at its true
    /// minimum hop count regardless of seed order.
    pub fn build(&self, seeds: &[String]) -> DistanceMap {
        let mut distances: DistanceMap = HashMap::new();
        let mut queue: VecDeque<(String, u32)> = VecDeque::new();

        for seed in seeds {
            let seed = normalize_path(seed);
            if is_third_party(&seed) {
                continue;
            }
            if !distances.contains_key(&seed) {
                distances.insert(seed.clone(), 0);
                queue.push_back((seed, 0));
            }
        }

        while let Some((current, depth)) = queue.pop_front() {
            // depth hops already used; expanding would cost one more.
            if depth >= self.max_depth {
                continue;
            }

            for neighbor in self.index.neighbors(&current) {
                if is_third_party(&neighbor) {
                    continue;
                }
                let next = depth + 1;
                let better = match distances.get(&neighbor) {
                    Some(&existing) => next < existing,
                    None => true,
                };
                if better {
                    distances.insert(neighbor.clone(), next);
                    queue.push_back((neighbor, next));
                }
            }
        }

        debug!(
            seeds = seeds.len(),
            reached = distances.len(),
            max_depth = self.max_depth,
            "distance map built"
        );
        distances
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
