//! Coarse candidate discovery via an external full-text search tool.
//!
//! Derives grep tokens from the changed files and asks the configured tool
//! (ripgrep by default) which test files mention any of them. The subprocess
//! runs under a hard deadline; a missing tool, a timeout, a crash, or zero
//! matches all produce the same answer — an empty candidate list — so the
//! resolver can always fall back to its own scan.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::graph::index::normalize_path;
use crate::observability::Metrics;

/// Globs handed to the search tool so only test files can match.
const TEST_GLOBS: &[&str] = &["*.test.*", "*.spec.*", "**/__tests__/**"];

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Derive search tokens from seed source files: each seed contributes its
/// root-relative path without extension, its bare basename, and its last two
/// path segments. Deduplicated, order of first appearance kept.
pub fn seed_tokens(root: &Path, seeds: &[String]) -> Vec<String> {
    let root_prefix = format!("{}/", normalize_path(&root.to_string_lossy()));

    let mut tokens: Vec<String> = Vec::new();
    let mut push = |token: String| {
        if !token.is_empty() && !tokens.contains(&token) {
            tokens.push(token);
        }
    };

    for seed in seeds {
        let normalized = normalize_path(seed);
        let relative = normalized
            .strip_prefix(&root_prefix)
            .unwrap_or(normalized.trim_start_matches('/'));
        let stem = strip_extension(relative);

        push(stem.to_string());
        let segments: Vec<&str> = stem.split('/').collect();
        if let Some(base) = segments.last() {
            push((*base).to_string());
        }
        if segments.len() >= 2 {
            push(segments[segments.len() - 2..].join("/"));
        }
    }
    tokens
}

fn strip_extension(path: &str) -> &str {
    let basename_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[basename_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..basename_start + dot],
        _ => path,
    }
}

enum WaitOutcome {
    Completed(String),
    TimedOut,
    Failed,
}

/// Candidate discovery front end over the external search subprocess.
pub struct CandidateSearch<'a> {
    config: &'a ResolverConfig,
}

impl<'a> CandidateSearch<'a> {
    pub fn new(config: &'a ResolverConfig) -> Self {
        Self { config }
    }

    /// Ask the search tool which test files under `root` mention any seed
    /// token. Every failure mode degrades to an empty list.
    pub fn find_candidates(
        &self,
        root: &Path,
        seeds: &[String],
        metrics: &mut Metrics,
    ) -> Vec<String> {
        let tokens = seed_tokens(root, seeds);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut command = Command::new(&self.config.search_tool);
        command
            .arg("-l")
            .arg("--no-messages")
            .arg("--fixed-strings");
        for token in &tokens {
            command.arg("-e").arg(token);
        }
        for glob in TEST_GLOBS {
            command.arg("-g").arg(glob);
        }
        command
            .arg(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        metrics.search_invocations += 1;
        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!(tool = %self.config.search_tool, "search tool unavailable: {e}");
                return Vec::new();
            }
        };

        let deadline = Duration::from_millis(self.config.search_timeout_ms);
        match wait_with_deadline(child, deadline) {
            WaitOutcome::Completed(stdout) => {
                let files = parse_file_list(&stdout);
                debug!(tokens = tokens.len(), candidates = files.len(), "search completed");
                files
            }
            WaitOutcome::TimedOut => {
                metrics.search_timeouts += 1;
                warn!(
                    tool = %self.config.search_tool,
                    timeout_ms = self.config.search_timeout_ms,
                    "search timed out, continuing without candidates"
                );
                Vec::new()
            }
            WaitOutcome::Failed => Vec::new(),
        }
    }
}

/// Poll the child until it exits or the deadline passes; kill on deadline.
///
/// Exit code 1 counts as success with no matches (ripgrep convention);
/// anything above that is a tool failure.
fn wait_with_deadline(mut child: Child, deadline: Duration) -> WaitOutcome {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let no_match = status.code() == Some(1);
                if !status.success() && !no_match {
                    return WaitOutcome::Failed;
                }
                let mut stdout = String::new();
                if let Some(mut reader) = child.stdout.take() {
                    use std::io::Read;
                    if reader.read_to_string(&mut stdout).is_err() {
                        return WaitOutcome::Failed;
                    }
                }
                return WaitOutcome::Completed(stdout);
            }
            Ok(None) => {
                if start.elapsed() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return WaitOutcome::TimedOut;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(_) => return WaitOutcome::Failed,
        }
    }
}

/// One file path per line, blanks skipped, separators normalized.
fn parse_file_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(normalize_path)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
