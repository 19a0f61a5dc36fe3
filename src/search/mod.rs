//! Search layer: coarse candidate discovery and related-test resolution.

pub mod candidates;
pub mod related;

pub use candidates::CandidateSearch;
pub use related::RelatedTestsResolver;
