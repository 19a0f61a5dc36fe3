//! Test-file discovery across a project tree.
//!
//! Walks the project with gitignore rules applied and collects files that
//! follow the conventional runner patterns: a `.test.` or `.spec.` infix in
//! the basename, or placement inside a `__tests__/` directory. Supplies the
//! resolver's universe when the caller has no runner-provided list.

use std::path::Path;

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::graph::distance::is_third_party;
use crate::graph::index::normalize_path;

/// Source extensions eligible as test files.
const TEST_FILE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"];

/// Whether a path follows the conventional test-file patterns.
pub fn is_test_file(path: &str) -> bool {
    let normalized = normalize_path(path);
    if !TEST_FILE_EXTENSIONS
        .iter()
        .any(|ext| normalized.ends_with(ext))
    {
        return false;
    }
    let basename = normalized.rsplit('/').next().unwrap_or(&normalized);
    basename.contains(".test.")
        || basename.contains(".spec.")
        || normalized.contains("/__tests__/")
        || normalized.starts_with("__tests__/")
}

/// Collect every test file under `root`, sorted by absolute path.
pub fn discover_test_files(root: &Path) -> Vec<String> {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    let mut walker = WalkBuilder::new(&root);
    walker
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false);

    let mut files = Vec::new();
    for entry in walker.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("walk error: {e}");
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let normalized = normalize_path(&path.to_string_lossy());
        if is_third_party(&normalized) {
            continue;
        }
        if is_test_file(&normalized) {
            files.push(normalized);
        }
    }

    files.sort();
    debug!(root = %root.display(), count = files.len(), "test files discovered");
    files
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
