//! Lazy import graph over project sources.
//!
//! [`SourceGraphIndex`] answers two questions about a file: which import
//! specifiers it contains, and which file a given specifier resolves to.
//! Both answers are cached for the lifetime of the index, which is created
//! per resolution run and thrown away afterwards.
//!
//! Extraction is regex-based rather than a full parse. Three syntactic
//! families are recognized: static imports (`import x from './a'`), dynamic
//! loads (`import('./a')`, `require('./a')`), and re-exports
//! (`export { x } from './a'`). Bare-package specifiers are discarded; only
//! local ones (starting with `.` or `/`) enter the graph.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

use crate::observability::Metrics;

/// Extension suffixes to probe when resolving a specifier, in order. The
/// bare path goes first so specifiers that already carry an extension win
/// immediately; the `/index.*` entries cover directory barrels.
const EXTENSION_SUFFIXES: &[&str] = &[
    "",
    ".ts",
    ".tsx",
    ".js",
    ".jsx",
    ".mjs",
    ".cjs",
    "/index.ts",
    "/index.tsx",
    "/index.js",
    "/index.jsx",
    "/index.mjs",
    "/index.cjs",
];

// `import x from './a'`, `import './a'`, `export { x } from './a'`
static STATIC_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:import|export)\s+(?:[^'";]*?\bfrom\s+)?['"]([^'"]+)['"]"#).unwrap()
});

// `import('./a')`
static DYNAMIC_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bimport\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

// `require('./a')`
static REQUIRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

/// Check if an import specifier names a local file rather than a package.
pub fn is_local_specifier(specifier: &str) -> bool {
    specifier.starts_with('.') || specifier.starts_with('/')
}

/// Extract local import specifiers from source text, in order of appearance,
/// first occurrence kept on duplicates.
pub fn extract_specifiers(source: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = Vec::new();
    for re in [&*STATIC_IMPORT_RE, &*DYNAMIC_IMPORT_RE, &*REQUIRE_RE] {
        for caps in re.captures_iter(source) {
            if let Some(m) = caps.get(1) {
                found.push((m.start(), m.as_str()));
            }
        }
    }
    found.sort_by_key(|(pos, _)| *pos);

    let mut specifiers = Vec::new();
    for (_, spec) in found {
        if !is_local_specifier(spec) {
            continue;
        }
        if !specifiers.iter().any(|s| s == spec) {
            specifiers.push(spec.to_string());
        }
    }
    specifiers
}

/// Normalize a path by resolving `.` and `..` components and collapsing
/// separators to forward slashes. A leading root is preserved.
///
/// `/repo/routes/../utils/./auth` → `/repo/utils/auth`
pub fn normalize_path(path: &str) -> String {
    let pb = PathBuf::from(path.replace('\\', "/"));
    let mut rooted = false;
    let mut components: Vec<String> = Vec::new();

    for component in pb.components() {
        match component {
            Component::RootDir => rooted = true,
            Component::CurDir => {}
            Component::ParentDir => {
                components.pop();
            }
            Component::Normal(s) => {
                components.push(s.to_string_lossy().to_string());
            }
            Component::Prefix(_) => {}
        }
    }

    let joined = components.join("/");
    if rooted {
        format!("/{joined}")
    } else {
        joined
    }
}

// ---------------------------------------------------------------------------
// SourceGraphIndex
// ---------------------------------------------------------------------------

/// Per-run import graph with interior caches.
///
/// Shared by reference across worker threads during fallback scans; every
/// cache sits behind its own mutex. Nothing here ever fails outward: an
/// unreadable file has no specifiers, an unresolvable specifier has no
/// target.
pub struct SourceGraphIndex {
    content_cache: Mutex<HashMap<String, Option<Arc<String>>>>,
    specifier_cache: Mutex<HashMap<String, Arc<Vec<String>>>>,
    resolve_cache: Mutex<HashMap<(String, String), Option<String>>>,
    metrics: Mutex<Metrics>,
}

impl SourceGraphIndex {
    pub fn new() -> Self {
        Self {
            content_cache: Mutex::new(HashMap::new()),
            specifier_cache: Mutex::new(HashMap::new()),
            resolve_cache: Mutex::new(HashMap::new()),
            metrics: Mutex::new(Metrics::new()),
        }
    }

    /// Raw content of `path`, read once per run. `None` when unreadable.
    pub fn content(&self, path: &str) -> Option<Arc<String>> {
        let key = normalize_path(path);
        {
            let cache = lock(&self.content_cache);
            if let Some(cached) = cache.get(&key) {
                lock(&self.metrics).cache_hits += 1;
                return cached.clone();
            }
        }
        let read = std::fs::read_to_string(&key).ok().map(Arc::new);
        let mut metrics = lock(&self.metrics);
        metrics.cache_misses += 1;
        metrics.files_scanned += 1;
        drop(metrics);
        if read.is_none() {
            trace!(path = %key, "unreadable file, treating as empty");
        }
        lock(&self.content_cache).insert(key, read.clone());
        read
    }

    /// Ordered local import specifiers of the file at `path`. Empty when the
    /// file cannot be read.
    pub fn specifiers(&self, path: &str) -> Arc<Vec<String>> {
        let key = normalize_path(path);
        {
            let cache = lock(&self.specifier_cache);
            if let Some(cached) = cache.get(&key) {
                return Arc::clone(cached);
            }
        }
        let specifiers = match self.content(&key) {
            Some(source) => extract_specifiers(&source),
            None => Vec::new(),
        };
        lock(&self.metrics).specifiers_extracted += specifiers.len();
        let specifiers = Arc::new(specifiers);
        lock(&self.specifier_cache)
            .insert(key, Arc::clone(&specifiers));
        specifiers
    }

    /// Resolve a local specifier relative to the importing file. Probes the
    /// filesystem through [`EXTENSION_SUFFIXES`]; first hit wins. `None`
    /// when nothing on disk matches.
    pub fn resolve(&self, from_path: &str, specifier: &str) -> Option<String> {
        let from_key = normalize_path(from_path);
        let cache_key = (from_key.clone(), specifier.to_string());
        {
            let cache = lock(&self.resolve_cache);
            if let Some(cached) = cache.get(&cache_key) {
                lock(&self.metrics).cache_hits += 1;
                return cached.clone();
            }
        }

        let resolved = resolve_on_disk(&from_key, specifier);
        lock(&self.metrics).cache_misses += 1;
        lock(&self.resolve_cache).insert(cache_key, resolved.clone());
        resolved
    }

    /// Resolved local import targets of `path`, order-preserving, deduped.
    pub fn neighbors(&self, path: &str) -> Vec<String> {
        let specifiers = self.specifiers(path);
        let mut out: Vec<String> = Vec::new();
        for spec in specifiers.iter() {
            if let Some(target) = self.resolve(path, spec) {
                if !out.contains(&target) {
                    out.push(target);
                }
            }
        }
        out
    }

    /// Snapshot of the run counters.
    pub fn metrics(&self) -> Metrics {
        lock(&self.metrics).clone()
    }
}

impl Default for SourceGraphIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Join a specifier onto the importing file's directory and probe extension
/// suffixes against the filesystem.
fn resolve_on_disk(from_path: &str, specifier: &str) -> Option<String> {
    let base = if specifier.starts_with('/') {
        specifier.to_string()
    } else {
        let dir = match from_path.rfind('/') {
            Some(pos) => &from_path[..pos],
            None => "",
        };
        if dir.is_empty() {
            specifier.to_string()
        } else {
            format!("{dir}/{specifier}")
        }
    };
    let normalized = normalize_path(&base);

    for suffix in EXTENSION_SUFFIXES {
        let candidate = format!("{normalized}{suffix}");
        if Path::new(&candidate).is_file() {
            return Some(candidate);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
