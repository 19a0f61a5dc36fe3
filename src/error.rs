//! Error types for the testgraph crate.
//!
//! The analysis pipeline itself never surfaces errors: resolution, ranking,
//! and correlation all degrade to empty or absent results when something goes
//! wrong underneath them. `TestgraphError` exists for the outer boundary
//! only, where the CLI reads config files, result files, and captured event
//! streams.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TestgraphError>;

#[derive(Debug, Error)]
pub enum TestgraphError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}
