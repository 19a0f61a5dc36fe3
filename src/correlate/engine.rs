//! Single-shot correlation of one assertion failure against the run's
//! captured HTTP exchanges.
//!
//! The decision procedure: pick the narrowest non-empty candidate pool
//! (own-test events, then same-file events in the time window, then any
//! event in the window), short-circuit transport faults to the nearest
//! abort when one was captured, otherwise score each response event and
//! accept the best one if it clears the configured bar — a raised bar for
//! transport faults, which a response rarely explains. The answer is
//! always one event or none; a wrong explanation is worse than no
//! explanation.

use tracing::debug;

use crate::config::CorrelationConfig;
use crate::correlate::signals::{is_transport_error, method_hint, path_hint};
use crate::types::{AssertionFailure, EventKind, HttpEvent};

// ---------------------------------------------------------------------------
// Score weights
// ---------------------------------------------------------------------------

// Status agreement dominates; an event reproducing the number the assertion
// actually saw is near-certain to be the one.
const STATUS_MATCHES_RECEIVED: i64 = 1500;
const STATUS_MATCHES_EXPECTED: i64 = 1200;
const STATUS_ERROR_CLASS: i64 = 800;

const ROUTE_EXACT: i64 = 500;
const ROUTE_SUFFIX: i64 = 300;
const ROUTE_SUBSTRING: i64 = 200;
const METHOD_BONUS: i64 = 50;
const METHOD_ONLY: i64 = 10;

const SPECIFICITY_ROUTE: i64 = 80;
const SPECIFICITY_URL: i64 = 40;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which test the orchestrator believes was running, used to fill identity
/// fields the failure record itself lacks.
#[derive(Debug, Clone, Default)]
pub struct TestIdentity {
    pub file: Option<String>,
    pub name: Option<String>,
}

/// The single accepted correlation: one event and the score that won.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatch {
    pub event: HttpEvent,
    pub score: i64,
}

// ---------------------------------------------------------------------------
// HttpCorrelationEngine
// ---------------------------------------------------------------------------

pub struct HttpCorrelationEngine<'a> {
    config: &'a CorrelationConfig,
}

impl<'a> HttpCorrelationEngine<'a> {
    pub fn new(config: &'a CorrelationConfig) -> Self {
        Self { config }
    }

    /// Correlate one failure against the run's events. Returns at most one
    /// match; every degraded input (no events, sparse fields, unparseable
    /// hints) collapses to `None` rather than an error.
    pub fn correlate(
        &self,
        failure: &AssertionFailure,
        events: &[HttpEvent],
        hint: &TestIdentity,
    ) -> Option<CorrelationMatch> {
        if events.is_empty() {
            return None;
        }

        let transport = is_transport_error(&failure.message);
        let window = if transport {
            self.config.strict_window_ms
        } else {
            self.config.normal_window_ms
        };

        let identity = effective_identity(failure, hint);
        let pool = select_pool(events, &identity, failure.timestamp, window);
        debug!(
            pool = pool.len(),
            window_ms = window,
            transport,
            "correlation pool selected"
        );
        if pool.is_empty() {
            return None;
        }

        if transport {
            // A torn-down connection is explained by an abort or nothing.
            return self.nearest_abort(&pool, failure.timestamp);
        }

        self.best_scored(&pool, failure, window, transport)
    }

    /// Abort event with the smallest time delta to the failure. Ties keep
    /// the earliest-emitted event.
    fn nearest_abort(
        &self,
        pool: &[&HttpEvent],
        failure_ts: Option<i64>,
    ) -> Option<CorrelationMatch> {
        let mut best: Option<(&HttpEvent, i64)> = None;
        for event in pool.iter().filter(|e| e.kind == EventKind::Abort) {
            let delta = time_delta(event.timestamp, failure_ts);
            match best {
                Some((_, best_delta)) if delta >= best_delta => {}
                _ => best = Some((event, delta)),
            }
        }
        best.map(|(event, delta)| CorrelationMatch {
            event: (*event).clone(),
            // Proximity is the only signal an abort carries.
            score: self.config.strict_window_ms.saturating_sub(delta).max(0),
        })
    }

    /// Score every response event in the pool and keep the best, provided
    /// it clears the acceptance bar. Ties keep the earliest-emitted event.
    fn best_scored(
        &self,
        pool: &[&HttpEvent],
        failure: &AssertionFailure,
        window: i64,
        transport: bool,
    ) -> Option<CorrelationMatch> {
        let hint_path = path_hint(&failure.message);
        let hint_method = method_hint(&failure.message);

        let mut best: Option<(&HttpEvent, i64)> = None;
        for event in pool.iter().filter(|e| e.kind == EventKind::Response) {
            let score = score_event(
                event,
                failure,
                window,
                hint_path.as_deref(),
                hint_method.as_deref(),
            );
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((event, score)),
            }
        }

        let threshold = self.acceptance_threshold(transport);
        match best {
            Some((event, score)) if score >= threshold => Some(CorrelationMatch {
                event: (*event).clone(),
                score,
            }),
            Some((_, score)) => {
                debug!(score, threshold, "best candidate below acceptance bar");
                None
            }
            None => None,
        }
    }

    fn acceptance_threshold(&self, transport: bool) -> i64 {
        if transport {
            self.config.min_score.max(self.config.transport_min_score)
        } else {
            self.config.min_score
        }
    }
}

// ---------------------------------------------------------------------------
// Pool selection
// ---------------------------------------------------------------------------

/// First non-empty pool wins, never merged: the failure's own test's events,
/// then same-file events inside the window, then anything inside the window.
/// The identity pool is unwindowed since ownership is a stronger signal than
/// the clock.
fn select_pool<'e>(
    events: &'e [HttpEvent],
    identity: &TestIdentity,
    failure_ts: Option<i64>,
    window: i64,
) -> Vec<&'e HttpEvent> {
    let own: Vec<&HttpEvent> = events
        .iter()
        .filter(|e| matches_identity(e, identity))
        .collect();
    if !own.is_empty() {
        return own;
    }

    let same_file: Vec<&HttpEvent> = events
        .iter()
        .filter(|e| same_file(e, identity) && within_window(e.timestamp, failure_ts, window))
        .collect();
    if !same_file.is_empty() {
        return same_file;
    }

    events
        .iter()
        .filter(|e| within_window(e.timestamp, failure_ts, window))
        .collect()
}

fn matches_identity(event: &HttpEvent, identity: &TestIdentity) -> bool {
    same_file(event, identity)
        && fuzzy_name_match(event.test_name.as_deref(), identity.name.as_deref())
}

fn same_file(event: &HttpEvent, identity: &TestIdentity) -> bool {
    match (event.test_file.as_deref(), identity.file.as_deref()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Equal, or one contains the other. Runners report nested names like
/// `auth > login works`, so containment is treated as the same test.
fn fuzzy_name_match(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
        }
        _ => false,
    }
}

/// Missing clock data never disqualifies an event from a windowed pool.
fn within_window(event_ts: Option<i64>, failure_ts: Option<i64>, window: i64) -> bool {
    match (event_ts, failure_ts) {
        (Some(e), Some(f)) => (e - f).abs() <= window,
        _ => true,
    }
}

fn time_delta(event_ts: Option<i64>, failure_ts: Option<i64>) -> i64 {
    match (event_ts, failure_ts) {
        (Some(e), Some(f)) => (e - f).abs(),
        _ => i64::MAX,
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

fn score_event(
    event: &HttpEvent,
    failure: &AssertionFailure,
    window: i64,
    hint_path: Option<&str>,
    hint_method: Option<&str>,
) -> i64 {
    let time = match (event.timestamp, failure.timestamp) {
        (Some(e), Some(f)) => (window - (e - f).abs()).max(0),
        _ => 0,
    };
    let status = status_score(event.status, failure.received, failure.expected);
    let route = route_score(event, hint_path, hint_method);
    let specificity = if event.route.is_some() {
        SPECIFICITY_ROUTE
    } else if event.url.is_some() {
        SPECIFICITY_URL
    } else {
        0
    };
    time + status + route + specificity
}

fn status_score(status: Option<u16>, received: Option<f64>, expected: Option<f64>) -> i64 {
    let Some(status) = status else {
        return 0;
    };
    if matches_number(status, received) {
        return STATUS_MATCHES_RECEIVED;
    }
    if matches_number(status, expected) {
        return STATUS_MATCHES_EXPECTED;
    }
    if status >= 400 {
        STATUS_ERROR_CLASS
    } else {
        0
    }
}

fn matches_number(status: u16, value: Option<f64>) -> bool {
    value.is_some_and(|v| v == f64::from(status))
}

fn route_score(event: &HttpEvent, hint_path: Option<&str>, hint_method: Option<&str>) -> i64 {
    let method_matches = match (event.method.as_deref(), hint_method) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    };

    let Some(hint) = hint_path else {
        return if method_matches { METHOD_ONLY } else { 0 };
    };
    let Some(event_path) = event.route_or_path() else {
        return 0;
    };
    if event_path.is_empty() {
        return 0;
    }

    let base = if event_path == hint {
        ROUTE_EXACT
    } else if event_path.ends_with(hint) || hint.ends_with(event_path) {
        ROUTE_SUFFIX
    } else if event_path.contains(hint) || hint.contains(event_path) {
        ROUTE_SUBSTRING
    } else {
        0
    };
    if base > 0 && method_matches {
        base + METHOD_BONUS
    } else {
        base
    }
}

fn effective_identity(failure: &AssertionFailure, hint: &TestIdentity) -> TestIdentity {
    TestIdentity {
        file: failure.test_file.clone().or_else(|| hint.file.clone()),
        name: failure.test_name.clone().or_else(|| hint.name.clone()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
