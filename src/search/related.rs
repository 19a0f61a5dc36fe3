//! Related-test resolution.
//!
//! Maps a set of changed source files to the test files worth running.
//! Phase 1 asks the external search tool for test files that mention the
//! seeds textually; hits that belong to the run's own test list win
//! outright. When that produces nothing usable, phase 2 walks each pool
//! member's import graph depth-first, looking for any file whose raw
//! content mentions a seed token. Phase 2 runs its per-file scans on a
//! fixed-size worker pool and memoizes on `(path, remaining-depth)` so
//! convergent import chains are walked once.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::graph::distance::is_third_party;
use crate::graph::index::{normalize_path, SourceGraphIndex};
use crate::observability::Metrics;
use crate::search::candidates::{seed_tokens, CandidateSearch};

type ScanMemo = Mutex<HashMap<(String, usize), bool>>;

pub struct RelatedTestsResolver<'a> {
    config: &'a ResolverConfig,
}

impl<'a> RelatedTestsResolver<'a> {
    pub fn new(config: &'a ResolverConfig) -> Self {
        Self { config }
    }

    /// Resolve which of `test_files` relate to the `seeds`.
    ///
    /// An empty seed set means "no signal": the input list comes back
    /// unchanged. Otherwise the output is the related subset of the input
    /// list, sorted by absolute path.
    pub fn resolve(&self, root: &Path, test_files: &[String], seeds: &[String]) -> Vec<String> {
        if seeds.is_empty() {
            return test_files.to_vec();
        }

        let started = Instant::now();
        let mut metrics = Metrics::new();

        let universe: Vec<String> = test_files.iter().map(|p| normalize_path(p)).collect();
        let universe_set: HashSet<&str> = universe.iter().map(String::as_str).collect();

        // Phase 1: coarse text search, filtered to the run's own tests.
        let candidates =
            CandidateSearch::new(self.config).find_candidates(root, seeds, &mut metrics);
        let mut usable: Vec<String> = candidates
            .iter()
            .filter(|c| universe_set.contains(c.as_str()))
            .cloned()
            .collect();
        if !usable.is_empty() {
            usable.sort();
            usable.dedup();
            debug!(
                related = usable.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "related tests resolved by candidate search"
            );
            return usable;
        }

        // Phase 2: bounded reachability over the candidate set when the
        // search found something, the whole input list when it found nothing.
        let pool: Vec<String> = if candidates.is_empty() {
            universe.clone()
        } else {
            candidates
        };

        let index = SourceGraphIndex::new();
        let tokens = seed_tokens(root, seeds);
        let memo: ScanMemo = Mutex::new(HashMap::new());

        let scan = |test_file: &String| {
            reaches_seed_token(&index, test_file, self.config.max_depth, &tokens, &memo)
        };
        let reached: Vec<String> = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency)
            .build()
        {
            Ok(worker_pool) => worker_pool
                .install(|| pool.par_iter().filter(|t| scan(t)).cloned().collect()),
            // A pool that cannot be built degrades to the caller's thread.
            Err(_) => pool.iter().filter(|t| scan(t)).cloned().collect(),
        };

        let mut related: Vec<String> = reached
            .into_iter()
            .filter(|t| universe_set.contains(t.as_str()))
            .collect();
        related.sort();
        related.dedup();

        metrics.resolve_duration_ms = Some(started.elapsed().as_millis() as u64);
        let index_metrics = index.metrics();
        metrics.files_scanned = index_metrics.files_scanned;
        metrics.specifiers_extracted = index_metrics.specifiers_extracted;
        metrics.cache_hits = index_metrics.cache_hits;
        metrics.cache_misses = index_metrics.cache_misses;
        debug!(
            related = related.len(),
            pool = pool.len(),
            cache_hit_rate = metrics.cache_hit_rate(),
            metrics = %metrics.to_json(),
            "related tests resolved by reachability scan"
        );
        related
    }
}

/// Depth-limited DFS from `path`: true when any file within `remaining` hops
/// (including `path` itself) textually contains a seed token.
///
/// Results are memoized per `(path, remaining)`; only completed answers are
/// cached, so concurrent scans can duplicate work but never read a
/// half-finished entry.
fn reaches_seed_token(
    index: &SourceGraphIndex,
    path: &str,
    remaining: usize,
    tokens: &[String],
    memo: &ScanMemo,
) -> bool {
    let key = (normalize_path(path), remaining);
    if let Some(&cached) = lock(memo).get(&key) {
        return cached;
    }

    let hit = content_mentions_token(index, &key.0, tokens)
        || (remaining > 0
            && index.neighbors(&key.0).iter().any(|neighbor| {
                !is_third_party(neighbor)
                    && reaches_seed_token(index, neighbor, remaining - 1, tokens, memo)
            }));

    lock(memo).insert(key, hit);
    hit
}

fn content_mentions_token(index: &SourceGraphIndex, path: &str, tokens: &[String]) -> bool {
    match index.content(path) {
        Some(content) => tokens.iter().any(|token| content.contains(token.as_str())),
        None => false,
    }
}

fn lock<'m>(
    memo: &'m ScanMemo,
) -> std::sync::MutexGuard<'m, HashMap<(String, usize), bool>> {
    memo.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
