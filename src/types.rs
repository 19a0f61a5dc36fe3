//! Core domain types for testgraph.
//!
//! Mirrors the JSON shapes emitted by the runner-side bridge (camelCase
//! keys) so captured event streams deserialize directly into these structs.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// Kind of a captured HTTP exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A completed request/response pair.
    #[default]
    Response,
    /// A request that never completed (connection torn down mid-flight).
    Abort,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Response => "response",
            Self::Abort => "abort",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HttpEvent
// ---------------------------------------------------------------------------

/// One captured HTTP exchange observed during a test run.
///
/// Every field except `kind` is optional: instrumentation hooks see wildly
/// different amounts of context depending on where they intercepted the
/// request, and a sparse event still participates in correlation (missing
/// fields simply contribute nothing to the score).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpEvent {
    #[serde(skip)]
    pub kind: EventKind,
    /// Capture time, epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Raw request URL as the client sent it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Structured route pattern when the server reported one, e.g. `/users/:id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Truncated response body excerpt for display next to a match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Test file active when the exchange was captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_file: Option<String>,
    /// Test name active when the exchange was captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
}

impl HttpEvent {
    /// Whether the capture recorded which test was running.
    pub fn has_identity(&self) -> bool {
        self.test_file.is_some() || self.test_name.is_some()
    }

    /// Best available path hint for route comparison: the structured route
    /// pattern when present, else the raw URL's path component.
    pub fn route_or_path(&self) -> Option<&str> {
        if let Some(route) = self.route.as_deref() {
            return Some(route);
        }
        self.url.as_deref().map(url_path)
    }
}

/// Strip scheme, authority, query, and fragment from a raw URL, leaving the
/// path component. Already-bare paths pass through unchanged.
pub fn url_path(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => {
            let after = &url[idx + 3..];
            match after.find('/') {
                Some(slash) => &after[slash..],
                None => "/",
            }
        }
        None => url,
    };
    let rest = rest.split('?').next().unwrap_or(rest);
    rest.split('#').next().unwrap_or(rest)
}

// ---------------------------------------------------------------------------
// AssertionFailure
// ---------------------------------------------------------------------------

/// A failed assertion reported by the runner-side bridge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssertionFailure {
    /// Failure time, epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    pub message: String,
    /// Matcher name when the runner reported one, e.g. `toBe`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    /// Expected value when numeric (status-code assertions mostly).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<f64>,
    /// Received value when numeric.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<f64>,
}

// ---------------------------------------------------------------------------
// TestRecord
// ---------------------------------------------------------------------------

/// One test file's outcome, as fed to the rank composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    /// Absolute file path, forward slashes.
    pub path: String,
    pub failed: bool,
}

impl TestRecord {
    pub fn new(path: impl Into<String>, failed: bool) -> Self {
        Self {
            path: path.into(),
            failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn http_event_deserializes_camel_case() {
        let json = r#"{
            "timestamp": 1700000000123,
            "method": "GET",
            "url": "http://localhost:3000/api/users?page=2",
            "route": "/api/users",
            "status": 200,
            "durationMs": 12.5,
            "testFile": "/repo/tests/users.test.ts",
            "testName": "lists users"
        }"#;
        let ev: HttpEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.kind, EventKind::Response);
        assert_eq!(ev.timestamp, Some(1700000000123));
        assert_eq!(ev.method.as_deref(), Some("GET"));
        assert_eq!(ev.status, Some(200));
        assert_eq!(ev.duration_ms, Some(12.5));
        assert_eq!(ev.test_name.as_deref(), Some("lists users"));
    }

    #[test]
    fn http_event_tolerates_sparse_payloads() {
        let ev: HttpEvent = serde_json::from_str("{}").unwrap();
        assert_eq!(ev.timestamp, None);
        assert_eq!(ev.status, None);
        assert!(!ev.has_identity());
    }

    #[test]
    fn http_event_ignores_unknown_fields() {
        let ev: HttpEvent =
            serde_json::from_str(r#"{"status": 500, "requestId": "abc-123"}"#).unwrap();
        assert_eq!(ev.status, Some(500));
    }

    #[test]
    fn http_event_serialization_skips_none() {
        let ev = HttpEvent {
            status: Some(404),
            ..Default::default()
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("404"));
        assert!(!json.contains("timestamp"));
        assert!(!json.contains("route"));
    }

    #[test]
    fn has_identity_with_either_field() {
        let mut ev = HttpEvent::default();
        assert!(!ev.has_identity());
        ev.test_name = Some("creates a user".into());
        assert!(ev.has_identity());
        ev.test_name = None;
        ev.test_file = Some("/repo/a.test.ts".into());
        assert!(ev.has_identity());
    }

    #[test]
    fn route_or_path_prefers_structured_route() {
        let ev = HttpEvent {
            url: Some("http://localhost:3000/api/users/42".into()),
            route: Some("/api/users/:id".into()),
            ..Default::default()
        };
        assert_eq!(ev.route_or_path(), Some("/api/users/:id"));
    }

    #[test]
    fn route_or_path_falls_back_to_url_path() {
        let ev = HttpEvent {
            url: Some("http://localhost:3000/api/users/42?full=1".into()),
            ..Default::default()
        };
        assert_eq!(ev.route_or_path(), Some("/api/users/42"));
    }

    // -- url_path --

    #[test_case("http://localhost:3000/api/users", "/api/users" ; "absolute_http")]
    #[test_case("https://api.example.com/v2/orders?limit=5", "/v2/orders" ; "query_stripped")]
    #[test_case("http://host/path#section", "/path" ; "fragment_stripped")]
    #[test_case("/api/users/42", "/api/users/42" ; "bare_path_passthrough")]
    #[test_case("http://host", "/" ; "no_path_becomes_root")]
    #[test_case("", "" ; "empty")]
    fn url_path_extracts(input: &str, expected: &str) {
        assert_eq!(url_path(input), expected);
    }

    // -- AssertionFailure --

    #[test]
    fn assertion_failure_deserializes_camel_case() {
        let json = r#"{
            "timestamp": 1700000001000,
            "testFile": "/repo/tests/orders.test.ts",
            "testName": "rejects unknown order",
            "message": "expected 200 to be 404",
            "matcher": "toBe",
            "expected": 404,
            "received": 200
        }"#;
        let f: AssertionFailure = serde_json::from_str(json).unwrap();
        assert_eq!(f.expected, Some(404.0));
        assert_eq!(f.received, Some(200.0));
        assert_eq!(f.matcher.as_deref(), Some("toBe"));
        assert!(f.message.contains("404"));
    }

    #[test]
    fn assertion_failure_defaults_message_empty() {
        let f: AssertionFailure = serde_json::from_str("{}").unwrap();
        assert_eq!(f.message, "");
        assert_eq!(f.expected, None);
    }

    // -- TestRecord --

    #[test]
    fn test_record_serde_roundtrip() {
        let rec = TestRecord::new("/repo/tests/a.test.ts", true);
        let json = serde_json::to_string(&rec).unwrap();
        let back: TestRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    // -- EventKind --

    #[test]
    fn event_kind_display_matches_as_str() {
        for kind in [EventKind::Response, EventKind::Abort] {
            assert_eq!(format!("{kind}"), kind.as_str());
        }
    }

    #[test]
    fn event_kind_default_is_response() {
        assert_eq!(EventKind::default(), EventKind::Response);
    }
}
