//! Failure-to-exchange correlation layer.

pub mod engine;
pub mod signals;

pub use engine::{CorrelationMatch, HttpCorrelationEngine, TestIdentity};
pub use signals::is_transport_error;
