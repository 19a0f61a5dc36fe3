//! Signals extracted from assertion-failure messages.
//!
//! Failure text is the only context the runner gives us about what the test
//! was doing on the wire. Two kinds of signal are pulled out: whether the
//! message describes a transport-level fault (the connection died rather
//! than the server answering wrong), and any route or method hint embedded
//! in the message for matching against captured exchanges.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::url_path;

/// Transport-fault phrases and the errno-style codes they surface as.
static TRANSPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)connection reset|econnreset|timed out|etimedout|refused|broken pipe|epipe|socket hang up",
    )
    .unwrap()
});

/// First URL or absolute path mentioned in a message.
static PATH_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"']+|/[A-Za-z0-9_\-./:@%]+"#).unwrap());

/// Uppercase HTTP verb. Case-sensitive so prose like "did not get" stays out.
static METHOD_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\b").unwrap());

/// Whether a failure message describes a torn-down connection rather than an
/// unexpected response.
pub fn is_transport_error(message: &str) -> bool {
    TRANSPORT_RE.is_match(message)
}

/// Extract a request-path hint from a failure message, if any. URLs are
/// reduced to their path component so hints compare cleanly against routes.
pub fn path_hint(message: &str) -> Option<String> {
    let matched = PATH_HINT_RE.find(message)?.as_str();
    if matched.starts_with("http") {
        Some(url_path(matched).to_string())
    } else {
        Some(matched.to_string())
    }
}

/// Extract an HTTP method hint from a failure message, if any.
pub fn method_hint(message: &str) -> Option<String> {
    METHOD_HINT_RE
        .find(message)
        .map(|m| m.as_str().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    // -- is_transport_error -------------------------------------------------

    #[test_case("connect ECONNREFUSED 127.0.0.1:3000", true ; "econnrefused code")]
    #[test_case("read ECONNRESET", true ; "econnreset code")]
    #[test_case("socket hang up", true ; "hang up phrase")]
    #[test_case("Connection reset by peer", true ; "reset phrase")]
    #[test_case("request timed out after 5000ms", true ; "timed out phrase")]
    #[test_case("connect ETIMEDOUT 10.0.0.1:443", true ; "etimedout code")]
    #[test_case("write EPIPE", true ; "epipe code")]
    #[test_case("Broken pipe while streaming", true ; "broken pipe phrase")]
    #[test_case("expected 200 to be 404", false ; "status assertion")]
    #[test_case("expected 'refunded' to equal 'pending'", false ; "ordinary text")]
    fn classifies_transport_messages(message: &str, expected: bool) {
        assert_eq!(is_transport_error(message), expected);
    }

    // -- path_hint ----------------------------------------------------------

    #[test_case("expected 404 \"GET /api/users/42\"", Some("/api/users/42") ; "quoted verb and path")]
    #[test_case("request to http://localhost:3000/api/users?page=2 failed", Some("/api/users") ; "url reduced to path")]
    #[test_case("https://api.example.com returned 500", Some("/") ; "bare host url")]
    #[test_case("expected 200 to be 404", None ; "no path present")]
    fn extracts_path_hints(message: &str, expected: Option<&str>) {
        assert_eq!(path_hint(message).as_deref(), expected);
    }

    #[test]
    fn path_hint_takes_first_match() {
        let hint = path_hint("POST /orders then GET /orders/7 failed");
        assert_eq!(hint.as_deref(), Some("/orders"));
    }

    // -- method_hint --------------------------------------------------------

    #[test_case("expected 404 \"GET /api/users\"", Some("GET") ; "uppercase verb")]
    #[test_case("DELETE /session returned 500", Some("DELETE") ; "leading verb")]
    #[test_case("did not get a response", None ; "lowercase prose ignored")]
    #[test_case("expected 200 to be 404", None ; "no verb present")]
    fn extracts_method_hints(message: &str, expected: Option<&str>) {
        assert_eq!(method_hint(message).as_deref(), expected);
    }
}
