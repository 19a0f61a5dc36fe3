//! Configuration data structures for testgraph.
//!
//! Defines the YAML config format: resolver, graph, and correlation tuning
//! knobs. Every field has a serde default so a partial file (or none at all)
//! yields a fully usable config.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TestgraphError};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for testgraph.
///
/// Loaded from an explicit YAML path when the CLI is given one; defaults
/// otherwise. There is no discovery chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestgraphConfig {
    /// Config format version (currently "1.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Related-test resolution knobs.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Import-graph traversal knobs.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Failure correlation knobs.
    #[serde(default)]
    pub correlation: CorrelationConfig,
}

impl Default for TestgraphConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            resolver: ResolverConfig::default(),
            graph: GraphConfig::default(),
            correlation: CorrelationConfig::default(),
        }
    }
}

impl TestgraphConfig {
    /// Parse a YAML document into a config.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let mut config: TestgraphConfig = serde_yaml::from_str(text)
            .map_err(|e| TestgraphError::Config(format!("failed to parse config: {e}")))?;
        config.normalize();
        Ok(config)
    }

    /// Load a config from an explicit file path.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Clamp unusable values back to their defaults. Zero concurrency, zero
    /// or negative windows, and a zero search timeout would all wedge the
    /// pipeline rather than tune it.
    pub fn normalize(&mut self) {
        if self.resolver.concurrency == 0 {
            self.resolver.concurrency = 1;
        }
        if self.resolver.search_timeout_ms == 0 {
            self.resolver.search_timeout_ms = default_search_timeout_ms();
        }
        if self.correlation.normal_window_ms <= 0 {
            self.correlation.normal_window_ms = default_normal_window_ms();
        }
        if self.correlation.strict_window_ms <= 0 {
            self.correlation.strict_window_ms = default_strict_window_ms();
        }
    }
}

// ---------------------------------------------------------------------------
// ResolverConfig
// ---------------------------------------------------------------------------

/// Knobs for related-test resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// External full-text search tool invoked for candidate discovery.
    #[serde(default = "default_search_tool")]
    pub search_tool: String,

    /// Hard kill deadline for the search subprocess.
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,

    /// Depth cap for the content-scan fallback walk.
    #[serde(default = "default_scan_depth")]
    pub max_depth: usize,

    /// Worker pool size for fallback scans.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            search_tool: default_search_tool(),
            search_timeout_ms: default_search_timeout_ms(),
            max_depth: default_scan_depth(),
            concurrency: default_concurrency(),
        }
    }
}

// ---------------------------------------------------------------------------
// GraphConfig
// ---------------------------------------------------------------------------

/// Knobs for import-graph distance building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Hop cap for the multi-source BFS. Files farther than this from every
    /// seed are absent from the distance map.
    #[serde(default = "default_bfs_depth")]
    pub max_depth: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_depth: default_bfs_depth(),
        }
    }
}

// ---------------------------------------------------------------------------
// CorrelationConfig
// ---------------------------------------------------------------------------

/// Knobs for HTTP failure correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Candidate window around the failure timestamp.
    #[serde(default = "default_normal_window_ms")]
    pub normal_window_ms: i64,

    /// Tighter window used for transport-level failures.
    #[serde(default = "default_strict_window_ms")]
    pub strict_window_ms: i64,

    /// Minimum score a candidate must reach to be reported.
    #[serde(default = "default_min_score")]
    pub min_score: i64,

    /// Raised bar for transport-level failures that fall through to scoring.
    #[serde(default = "default_transport_min_score")]
    pub transport_min_score: i64,

    /// When set, transport failures with no nearby exchange are reported as
    /// such instead of silently producing nothing.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            normal_window_ms: default_normal_window_ms(),
            strict_window_ms: default_strict_window_ms(),
            min_score: default_min_score(),
            transport_min_score: default_transport_min_score(),
            verbose: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_version() -> String {
    "1.0".to_string()
}

fn default_search_tool() -> String {
    "rg".to_string()
}

fn default_search_timeout_ms() -> u64 {
    2000
}

fn default_scan_depth() -> usize {
    5
}

fn default_concurrency() -> usize {
    16
}

fn default_bfs_depth() -> u32 {
    6
}

fn default_normal_window_ms() -> i64 {
    3000
}

fn default_strict_window_ms() -> i64 {
    600
}

fn default_min_score() -> i64 {
    1200
}

fn default_transport_min_score() -> i64 {
    1400
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
