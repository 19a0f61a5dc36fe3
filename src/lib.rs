//! testgraph — test-run intelligence library.
//!
//! Maps changed source files to related tests over a lazily built import
//! graph, orders test results deterministically by failure and proximity,
//! and correlates assertion failures with the captured HTTP exchange that
//! most plausibly caused them.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod correlate;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod observability;
pub mod rank;
pub mod search;
pub mod types;
