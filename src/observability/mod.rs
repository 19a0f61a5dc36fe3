//! Structured logging and run metrics.
//!
//! This module provides:
//! - [`init_logging`] — One-time structured logging setup with `RUST_LOG` support
//! - [`Metrics`] — Lightweight per-run counters for the analysis pipeline

use tracing_subscriber::EnvFilter;

/// Initialize structured logging with `RUST_LOG` environment variable support.
///
/// Defaults to `testgraph=info` when `RUST_LOG` is not set. Call once at
/// program startup — subsequent calls are silently ignored by
/// `tracing_subscriber`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("testgraph=info"));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Lightweight per-run metrics collector.
///
/// Tracks graph scan volume, cache effectiveness, and search subprocess
/// outcomes. Serializable to JSON via [`Metrics::to_json`].
#[derive(Debug, Clone)]
pub struct Metrics {
    pub resolve_duration_ms: Option<u64>,
    pub files_scanned: usize,
    pub specifiers_extracted: usize,
    pub search_invocations: u64,
    pub search_timeouts: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            resolve_duration_ms: None,
            files_scanned: 0,
            specifiers_extracted: 0,
            search_invocations: 0,
            search_timeouts: 0,
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "resolve_duration_ms": self.resolve_duration_ms,
            "files_scanned": self.files_scanned,
            "specifiers_extracted": self.specifiers_extracted,
            "search_invocations": self.search_invocations,
            "search_timeouts": self.search_timeouts,
            "cache_hits": self.cache_hits,
            "cache_misses": self.cache_misses,
        })
    }

    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / total as f64
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
