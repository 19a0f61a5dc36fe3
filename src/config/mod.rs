//! Configuration layer — YAML-loadable tuning knobs for the analysis pipeline.

pub mod schema;

pub use schema::{CorrelationConfig, GraphConfig, ResolverConfig, TestgraphConfig};
