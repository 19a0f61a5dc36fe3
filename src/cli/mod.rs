//! Command-line surface.
//!
//! Thin orchestration over the library: each subcommand loads config,
//! drives one pipeline, and prints plain lines. Degraded runs (missing
//! search tool, sparse events) still exit 0; only boundary errors such as
//! unreadable input files are fatal.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::bridge;
use crate::config::TestgraphConfig;
use crate::correlate::{is_transport_error, CorrelationMatch, HttpCorrelationEngine};
use crate::discovery;
use crate::error::{Result, TestgraphError};
use crate::graph::{DistanceRankBuilder, SourceGraphIndex};
use crate::rank::RankComposer;
use crate::search::RelatedTestsResolver;
use crate::types::{AssertionFailure, EventKind, TestRecord};

#[derive(Parser)]
#[command(
    name = "testgraph",
    version,
    about = "Test-run intelligence: related-test resolution, ranking, failure correlation",
    long_about = "testgraph maps changed source files to the tests worth running,\n\
        orders test results by proximity to the change, and pairs assertion\n\
        failures with the HTTP exchange that most plausibly caused them.\n\n\
        Quick start:\n  \
        testgraph related --root . --seed src/auth.ts\n  \
        testgraph rank --root . --results results.json --seed src/auth.ts\n  \
        testgraph correlate --events run.log"
)]
pub struct Cli {
    /// Path to a YAML config file (defaults apply when omitted)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve which test files relate to a set of changed source files
    ///
    /// Reads the candidate universe from --test-list (one path per line) or
    /// discovers test files under the root when the flag is omitted. Prints
    /// one related test path per line, sorted.
    ///
    /// Example: testgraph related --root . --seed src/auth.ts
    Related {
        /// Project root directory
        #[arg(long)]
        root: PathBuf,

        /// File listing the run's test files, one absolute path per line
        #[arg(long)]
        test_list: Option<PathBuf>,

        /// Changed source file (repeatable)
        #[arg(long = "seed")]
        seeds: Vec<String>,
    },
    /// Order a run's test records for presentation
    ///
    /// The results file is a JSON array of {"path", "failed"} records.
    /// Output is in print order: most important record last, next to where
    /// the terminal scrollback ends.
    ///
    /// Example: testgraph rank --root . --results results.json --seed src/auth.ts
    Rank {
        /// Project root directory
        #[arg(long)]
        root: PathBuf,

        /// JSON file with the run's test records
        #[arg(long)]
        results: PathBuf,

        /// Changed source file seeding the distance map (repeatable)
        #[arg(long = "seed")]
        seeds: Vec<String>,

        /// Test path to pin ahead of distance ordering (repeatable, first
        /// strongest)
        #[arg(long = "priority")]
        priority: Vec<String>,
    },
    /// Print the import-distance map built from the seeds
    ///
    /// Debug view: one "distance<TAB>path" line per reachable file,
    /// nearest first.
    ///
    /// Example: testgraph distances --root . --seed src/auth.ts
    Distances {
        /// Project root directory
        #[arg(long)]
        root: PathBuf,

        /// Source file to walk outward from (repeatable)
        #[arg(long = "seed")]
        seeds: Vec<String>,
    },
    /// Pair captured assertion failures with the HTTP exchange behind them
    ///
    /// Reads a captured bridge stream (marker + JSON lines) and prints one
    /// verdict per failure.
    ///
    /// Example: testgraph correlate --events run.log --verbose
    Correlate {
        /// Captured event stream file
        #[arg(long)]
        events: PathBuf,

        /// Also report transport failures that had no nearby exchange
        #[arg(long)]
        verbose: bool,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Related {
            root,
            test_list,
            seeds,
        } => run_related(&config, &root, test_list.as_deref(), &seeds),
        Commands::Rank {
            root,
            results,
            seeds,
            priority,
        } => run_rank(&config, &root, &results, &seeds, &priority),
        Commands::Distances { root, seeds } => run_distances(&config, &root, &seeds),
        Commands::Correlate { events, verbose } => run_correlate(&config, &events, verbose),
    }
}

fn load_config(path: Option<&Path>) -> Result<TestgraphConfig> {
    match path {
        Some(p) => TestgraphConfig::load(p),
        None => Ok(TestgraphConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn run_related(
    config: &TestgraphConfig,
    root: &Path,
    test_list: Option<&Path>,
    seeds: &[String],
) -> Result<()> {
    let tests = match test_list {
        Some(path) => read_path_lines(path)?,
        None => discovery::discover_test_files(root),
    };
    let resolver = RelatedTestsResolver::new(&config.resolver);
    for path in resolver.resolve(root, &tests, seeds) {
        println!("{path}");
    }
    Ok(())
}

fn run_rank(
    config: &TestgraphConfig,
    root: &Path,
    results: &Path,
    seeds: &[String],
    priority: &[String],
) -> Result<()> {
    let text = std::fs::read_to_string(results)?;
    let records: Vec<TestRecord> = serde_json::from_str(&text)
        .map_err(|e| TestgraphError::Parse(format!("results file {}: {e}", results.display())))?;

    let seeds = absolute_seeds(root, seeds);
    let index = SourceGraphIndex::new();
    let distances = DistanceRankBuilder::from_config(&index, &config.graph).build(&seeds);
    let composer = RankComposer::new(&distances, priority);
    for record in composer.print_order(&records) {
        let outcome = if record.failed { "fail" } else { "pass" };
        println!("{outcome}\t{}", record.path);
    }
    Ok(())
}

fn run_distances(config: &TestgraphConfig, root: &Path, seeds: &[String]) -> Result<()> {
    let seeds = absolute_seeds(root, seeds);
    let index = SourceGraphIndex::new();
    let distances = DistanceRankBuilder::from_config(&index, &config.graph).build(&seeds);

    let mut entries: Vec<(String, u32)> = distances.into_iter().collect();
    entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    for (path, distance) in entries {
        println!("{distance}\t{path}");
    }
    Ok(())
}

fn run_correlate(config: &TestgraphConfig, events: &Path, verbose: bool) -> Result<()> {
    let stream = std::fs::read_to_string(events)?;
    let run = bridge::collect_run_events(&stream);

    let mut correlation = config.correlation.clone();
    correlation.verbose = correlation.verbose || verbose;
    let engine = HttpCorrelationEngine::new(&correlation);

    for failure in &run.failures {
        let hint = bridge::identity_hint(&run.starts, failure);
        println!("{}", describe_failure(failure));
        match engine.correlate(failure, &run.http_events, &hint) {
            Some(matched) => println!("  {}", describe_match(&matched)),
            None => {
                if correlation.verbose && is_transport_error(&failure.message) {
                    println!(
                        "  no relevant exchange within {}ms",
                        correlation.strict_window_ms
                    );
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn describe_failure(failure: &AssertionFailure) -> String {
    let mut head = String::new();
    if let Some(file) = &failure.test_file {
        head.push_str(file);
    }
    if let Some(name) = &failure.test_name {
        if !head.is_empty() {
            head.push_str(" > ");
        }
        head.push_str(name);
    }
    if head.is_empty() {
        head.push_str("unknown test");
    }
    format!("{head}: {}", failure.message)
}

fn describe_match(matched: &CorrelationMatch) -> String {
    let event = &matched.event;
    let mut parts: Vec<String> = Vec::new();
    if event.kind == EventKind::Abort {
        parts.push("aborted".to_string());
    }
    if let Some(method) = &event.method {
        parts.push(method.clone());
    }
    if let Some(path) = event.route_or_path() {
        parts.push(path.to_string());
    }
    if let Some(status) = event.status {
        parts.push(status.to_string());
    }
    if parts.is_empty() {
        parts.push("exchange".to_string());
    }
    format!("matched {} (score {})", parts.join(" "), matched.score)
}

fn read_path_lines(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Seeds given relative to the root become absolute so they line up with
/// the absolute paths the graph layer works in.
fn absolute_seeds(root: &Path, seeds: &[String]) -> Vec<String> {
    seeds
        .iter()
        .map(|seed| {
            if Path::new(seed).is_absolute() {
                seed.clone()
            } else {
                root.join(seed).to_string_lossy().into_owned()
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpEvent;

    // -- describe_failure ---------------------------------------------------

    #[test]
    fn failure_line_includes_identity_and_message() {
        let failure = AssertionFailure {
            test_file: Some("/r/auth.test.ts".to_string()),
            test_name: Some("login works".to_string()),
            message: "expected 404, got 200".to_string(),
            ..Default::default()
        };
        assert_eq!(
            describe_failure(&failure),
            "/r/auth.test.ts > login works: expected 404, got 200"
        );
    }

    #[test]
    fn failure_line_without_identity() {
        let failure = AssertionFailure {
            message: "boom".to_string(),
            ..Default::default()
        };
        assert_eq!(describe_failure(&failure), "unknown test: boom");
    }

    // -- describe_match -----------------------------------------------------

    #[test]
    fn match_line_shows_method_path_status() {
        let matched = CorrelationMatch {
            event: HttpEvent {
                method: Some("GET".to_string()),
                url: Some("http://localhost:3000/api/users?x=1".to_string()),
                status: Some(404),
                ..Default::default()
            },
            score: 4150,
        };
        assert_eq!(
            describe_match(&matched),
            "matched GET /api/users 404 (score 4150)"
        );
    }

    #[test]
    fn match_line_marks_aborts() {
        let matched = CorrelationMatch {
            event: HttpEvent {
                kind: EventKind::Abort,
                url: Some("/api/users".to_string()),
                ..Default::default()
            },
            score: 550,
        };
        assert_eq!(describe_match(&matched), "matched aborted /api/users (score 550)");
    }

    #[test]
    fn match_line_for_bare_event() {
        let matched = CorrelationMatch {
            event: HttpEvent::default(),
            score: 1200,
        };
        assert_eq!(describe_match(&matched), "matched exchange (score 1200)");
    }

    // -- helpers ------------------------------------------------------------

    #[test]
    fn relative_seeds_join_the_root() {
        let seeds = vec!["src/auth.ts".to_string(), "/abs/other.ts".to_string()];
        let out = absolute_seeds(Path::new("/repo"), &seeds);
        assert_eq!(out, vec!["/repo/src/auth.ts".to_string(), "/abs/other.ts".to_string()]);
    }

    #[test]
    fn missing_config_flag_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.resolver.search_tool, "rg");
        assert_eq!(config.graph.max_depth, 6);
    }

    #[test]
    fn test_list_lines_trimmed_and_blank_lines_dropped() {
        let dir = tempfile::TempDir::new().unwrap();
        let list = dir.path().join("tests.txt");
        std::fs::write(&list, "/r/a.test.ts\n\n  /r/b.test.ts  \n").unwrap();
        let lines = read_path_lines(&list).unwrap();
        assert_eq!(lines, vec!["/r/a.test.ts".to_string(), "/r/b.test.ts".to_string()]);
    }

    #[test]
    fn unreadable_test_list_is_a_boundary_error() {
        assert!(read_path_lines(Path::new("/no/such/list.txt")).is_err());
    }
}
