//! Runner-side event bridge.
//!
//! The instrumentation shim inside the test process writes one line per
//! event to stderr: a fixed marker followed by a JSON payload with a
//! `type` discriminator. Runner noise may precede the marker on the same
//! line. Anything that is not a marked, well-formed, recognized event is
//! dropped without comment; a flaky capture layer must never take the
//! pipeline down with it.

use serde::Deserialize;
use tracing::debug;

use crate::correlate::TestIdentity;
use crate::types::{AssertionFailure, EventKind, HttpEvent};

/// Marker the instrumentation shim prefixes every event line with.
pub const EVENT_MARKER: &str = "@testgraph:";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// `testStart` payload. Used to attribute later events to the test that was
/// running when they fired.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestStart {
    pub timestamp: Option<i64>,
    pub test_file: Option<String>,
    pub test_name: Option<String>,
}

/// `console` payload. Captured for completeness; nothing here consumes it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleLine {
    pub level: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeEvent {
    HttpResponse(HttpEvent),
    HttpAbort(HttpEvent),
    HttpResponseBatch {
        #[serde(default)]
        events: Vec<HttpEvent>,
    },
    AssertionFailure(AssertionFailure),
    Console(ConsoleLine),
    TestStart(TestStart),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse one output line into a bridge event. `None` for unmarked lines,
/// broken JSON, and unrecognized types alike.
pub fn parse_line(line: &str) -> Option<BridgeEvent> {
    let idx = line.find(EVENT_MARKER)?;
    let payload = line[idx + EVENT_MARKER.len()..].trim();
    match serde_json::from_str::<BridgeEvent>(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!(error = %err, "dropping malformed bridge line");
            None
        }
    }
}

/// Everything one run's event stream produced, split by consumer.
#[derive(Debug, Default)]
pub struct RunEvents {
    /// Responses and aborts in emission order, batches flattened in place.
    pub http_events: Vec<HttpEvent>,
    pub failures: Vec<AssertionFailure>,
    pub starts: Vec<TestStart>,
}

/// Collect a whole captured stream. Order within `http_events` follows
/// emission order, which downstream tie-breaks depend on.
pub fn collect_run_events(stream: &str) -> RunEvents {
    let mut run = RunEvents::default();
    for line in stream.lines() {
        let Some(event) = parse_line(line) else {
            continue;
        };
        match event {
            BridgeEvent::HttpResponse(mut e) => {
                e.kind = EventKind::Response;
                run.http_events.push(e);
            }
            BridgeEvent::HttpAbort(mut e) => {
                e.kind = EventKind::Abort;
                run.http_events.push(e);
            }
            BridgeEvent::HttpResponseBatch { events } => {
                for mut e in events {
                    e.kind = EventKind::Response;
                    run.http_events.push(e);
                }
            }
            BridgeEvent::AssertionFailure(f) => run.failures.push(f),
            BridgeEvent::TestStart(s) => run.starts.push(s),
            BridgeEvent::Console(_) => {}
        }
    }
    run
}

/// Identity of the test most plausibly running when `failure` fired: the
/// last `testStart` at or before the failure's timestamp. Starts or
/// failures without clocks degrade to "last start seen".
pub fn identity_hint(starts: &[TestStart], failure: &AssertionFailure) -> TestIdentity {
    let mut best: Option<&TestStart> = None;
    for start in starts {
        if let (Some(s), Some(f)) = (start.timestamp, failure.timestamp) {
            if s > f {
                continue;
            }
        }
        best = Some(start);
    }
    TestIdentity {
        file: best.and_then(|s| s.test_file.clone()),
        name: best.and_then(|s| s.test_name.clone()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
