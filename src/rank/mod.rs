//! Deterministic rank composition.
//!
//! Orders a run's test records so the most urgent work surfaces first:
//! failures outrank everything, then proximity to the changed code (the
//! distance map), then path as the final tie-break. Explicit priority
//! overrides slot in ahead of any graph distance without ever outranking
//! a failure.

use crate::graph::index::normalize_path;
use crate::graph::DistanceMap;
use crate::types::TestRecord;

/// Effective distance for files absent from the map and not overridden.
const UNREACHABLE: i64 = i64::MAX;

// ---------------------------------------------------------------------------
// RankComposer
// ---------------------------------------------------------------------------

/// Composes the final test ordering from failure state, graph distance,
/// and explicit priority overrides.
pub struct RankComposer<'a> {
    distances: &'a DistanceMap,
    /// Normalized override paths, earliest entry strongest.
    priority: Vec<String>,
}

impl<'a> RankComposer<'a> {
    pub fn new(distances: &'a DistanceMap, priority_overrides: &[String]) -> Self {
        Self {
            distances,
            priority: priority_overrides.iter().map(|p| normalize_path(p)).collect(),
        }
    }

    /// Effective distance of a record: overrides map to negative values
    /// (earliest override most negative), mapped files to their hop count,
    /// everything else to the unreachable sentinel.
    pub fn effective_distance(&self, path: &str) -> i64 {
        let canonical = normalize_path(path);
        if let Some(idx) = self.priority.iter().position(|p| *p == canonical) {
            return -((self.priority.len() - idx) as i64);
        }
        match self.distances.get(&canonical) {
            Some(&d) => i64::from(d),
            None => UNREACHABLE,
        }
    }

    /// Canonical order, most important record first: failed before passing,
    /// then effective distance ascending, then path ascending.
    pub fn compose(&self, records: &[TestRecord]) -> Vec<TestRecord> {
        let mut ordered: Vec<TestRecord> = records.to_vec();
        ordered.sort_by(|a, b| {
            b.failed
                .cmp(&a.failed)
                .then_with(|| {
                    self.effective_distance(&a.path)
                        .cmp(&self.effective_distance(&b.path))
                })
                .then_with(|| a.path.cmp(&b.path))
        });
        ordered
    }

    /// `compose` reversed for sequential printing.
    ///
    /// Runner output is read bottom-up: the last line printed lands next to
    /// the summary, so the most important record must print last. Printing
    /// this list top-to-bottom does exactly that.
    pub fn print_order(&self, records: &[TestRecord]) -> Vec<TestRecord> {
        let mut ordered = self.compose(records);
        ordered.reverse();
        ordered
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn rec(path: &str, failed: bool) -> TestRecord {
        TestRecord::new(path, failed)
    }

    fn paths(records: &[TestRecord]) -> Vec<&str> {
        records.iter().map(|r| r.path.as_str()).collect()
    }

    fn distances(pairs: &[(&str, u32)]) -> DistanceMap {
        pairs
            .iter()
            .map(|(p, d)| (p.to_string(), *d))
            .collect::<HashMap<_, _>>()
    }

    // -- effective_distance -------------------------------------------------

    #[test_case("/r/a.test.ts", 0 ; "mapped at zero")]
    #[test_case("/r/b.test.ts", 4 ; "mapped at four")]
    fn effective_distance_uses_map(path: &str, expected: u32) {
        let map = distances(&[("/r/a.test.ts", 0), ("/r/b.test.ts", 4)]);
        let composer = RankComposer::new(&map, &[]);
        assert_eq!(composer.effective_distance(path), i64::from(expected));
    }

    #[test]
    fn effective_distance_absent_is_unreachable() {
        let map = distances(&[]);
        let composer = RankComposer::new(&map, &[]);
        assert_eq!(composer.effective_distance("/r/far.test.ts"), i64::MAX);
    }

    #[test]
    fn effective_distance_overrides_are_negative_earliest_first() {
        let map = distances(&[("/r/first.test.ts", 0)]);
        let overrides = vec!["/r/first.test.ts".to_string(), "/r/second.test.ts".to_string()];
        let composer = RankComposer::new(&map, &overrides);
        // Earliest override most negative; override beats the mapped distance.
        assert_eq!(composer.effective_distance("/r/first.test.ts"), -2);
        assert_eq!(composer.effective_distance("/r/second.test.ts"), -1);
    }

    #[test]
    fn effective_distance_normalizes_before_lookup() {
        let map = distances(&[("/r/x.test.ts", 2)]);
        let composer = RankComposer::new(&map, &[]);
        assert_eq!(composer.effective_distance("/r/./sub/../x.test.ts"), 2);
    }

    // -- compose ------------------------------------------------------------

    #[test]
    fn failed_records_rank_before_any_passing_record() {
        let map = distances(&[("/r/near.test.ts", 0)]);
        let records = vec![rec("/r/near.test.ts", false), rec("/r/far.test.ts", true)];
        let composer = RankComposer::new(&map, &[]);
        let ordered = composer.compose(&records);
        assert_eq!(paths(&ordered), vec!["/r/far.test.ts", "/r/near.test.ts"]);
    }

    #[test]
    fn passing_records_order_by_distance_then_absent() {
        let map = distances(&[("/r/near.test.ts", 0), ("/r/mid.test.ts", 3)]);
        let records = vec![
            rec("/r/unknown.test.ts", false),
            rec("/r/mid.test.ts", false),
            rec("/r/near.test.ts", false),
        ];
        let composer = RankComposer::new(&map, &[]);
        let ordered = composer.compose(&records);
        assert_eq!(
            paths(&ordered),
            vec!["/r/near.test.ts", "/r/mid.test.ts", "/r/unknown.test.ts"]
        );
    }

    #[test]
    fn equal_distance_breaks_ties_by_path() {
        let map = distances(&[("/r/b.test.ts", 1), ("/r/a.test.ts", 1)]);
        let records = vec![rec("/r/b.test.ts", false), rec("/r/a.test.ts", false)];
        let composer = RankComposer::new(&map, &[]);
        let ordered = composer.compose(&records);
        assert_eq!(paths(&ordered), vec!["/r/a.test.ts", "/r/b.test.ts"]);
    }

    #[test]
    fn override_ranks_ahead_of_distance_zero() {
        let map = distances(&[("/r/changed.test.ts", 0)]);
        let overrides = vec!["/r/pinned.test.ts".to_string()];
        let records = vec![rec("/r/changed.test.ts", false), rec("/r/pinned.test.ts", false)];
        let composer = RankComposer::new(&map, &overrides);
        let ordered = composer.compose(&records);
        assert_eq!(paths(&ordered), vec!["/r/pinned.test.ts", "/r/changed.test.ts"]);
    }

    #[test]
    fn override_order_is_preserved() {
        let map = distances(&[]);
        let overrides = vec!["/r/one.test.ts".to_string(), "/r/two.test.ts".to_string()];
        let records = vec![rec("/r/two.test.ts", false), rec("/r/one.test.ts", false)];
        let composer = RankComposer::new(&map, &overrides);
        let ordered = composer.compose(&records);
        assert_eq!(paths(&ordered), vec!["/r/one.test.ts", "/r/two.test.ts"]);
    }

    #[test]
    fn override_never_outranks_a_failure() {
        let map = distances(&[]);
        let overrides = vec!["/r/pinned.test.ts".to_string()];
        let records = vec![
            rec("/r/pinned.test.ts", false),
            rec("/r/unmapped.test.ts", true),
        ];
        let composer = RankComposer::new(&map, &overrides);
        let ordered = composer.compose(&records);
        assert_eq!(
            paths(&ordered),
            vec!["/r/unmapped.test.ts", "/r/pinned.test.ts"]
        );
    }

    #[test]
    fn failed_records_tie_break_among_themselves() {
        let map = distances(&[("/r/near.test.ts", 1)]);
        let records = vec![
            rec("/r/unknown.test.ts", true),
            rec("/r/near.test.ts", true),
        ];
        let composer = RankComposer::new(&map, &[]);
        let ordered = composer.compose(&records);
        assert_eq!(paths(&ordered), vec!["/r/near.test.ts", "/r/unknown.test.ts"]);
    }

    // -- print_order --------------------------------------------------------

    #[test]
    fn print_order_is_compose_reversed() {
        let map = distances(&[("/r/near.test.ts", 0)]);
        let records = vec![
            rec("/r/near.test.ts", false),
            rec("/r/fail.test.ts", true),
            rec("/r/far.test.ts", false),
        ];
        let composer = RankComposer::new(&map, &[]);
        let mut expected = composer.compose(&records);
        expected.reverse();
        assert_eq!(composer.print_order(&records), expected);
        // Most important record prints last.
        assert_eq!(
            composer.print_order(&records).last().map(|r| r.path.as_str()),
            Some("/r/fail.test.ts")
        );
    }

    // -- determinism --------------------------------------------------------

    #[test]
    fn input_permutation_does_not_change_output() {
        let map = distances(&[("/r/a.test.ts", 2), ("/r/b.test.ts", 1)]);
        let forward = vec![
            rec("/r/a.test.ts", false),
            rec("/r/b.test.ts", false),
            rec("/r/c.test.ts", true),
        ];
        let mut backward = forward.clone();
        backward.reverse();
        let composer = RankComposer::new(&map, &[]);
        assert_eq!(composer.compose(&forward), composer.compose(&backward));
    }
}
