//! Coverage verification: checks collected label counts
//! against each scenario's `Cover`/`CoverTable` requirements using Wilson
//! score intervals, so a requirement can be judged satisfied from a
//! statistically honest interval rather than the raw observed percentage.

use crate::scenario::{CoverRequirement, CoverTableRequirement};
use crate::stats::wilson_score_interval;
use std::collections::HashMap;

/// One requirement's verdict.
#[derive(Debug, Clone)]
pub struct CoverageReport {
    pub label: String,
    pub required_pct: f64,
    pub observed_pct: f64,
    pub confidence: f64,
    pub interval: (f64, f64),
    pub satisfied: bool,
}

/// Checks `label_counts`/`tests_run` against one `Cover(requiredPct, _,
/// label)` node: satisfied iff the Wilson interval's upper bound admits
/// the required percentage.
pub fn verify_cover(label: &str, required_pct: f64, count: u64, tests_run: u64, confidence: f64) -> CoverageReport {
    let observed_pct = if tests_run == 0 { 0.0 } else { 100.0 * count as f64 / tests_run as f64 };
    let (lo, hi) = wilson_score_interval(count, tests_run, confidence).unwrap_or((0.0, 1.0));
    let satisfied = required_pct / 100.0 <= hi;
    CoverageReport { label: label.to_string(), required_pct, observed_pct, confidence, interval: (lo, hi), satisfied }
}

/// Verifies every `Cover` requirement against the explorer's accumulated
/// label counts.
pub fn verify_covers(covers: &[CoverRequirement], labels: &HashMap<String, u64>, tests_run: u64, confidence: f64) -> Vec<CoverageReport> {
    covers
        .iter()
        .map(|c| {
            let count = labels.get(&c.label).copied().unwrap_or(0);
            verify_cover(&c.label, c.percentage, count, tests_run, confidence)
        })
        .collect()
}

/// Verifies every category of every `CoverTable` requirement. Categories
/// are matched against `labels` by the table-qualified key
/// `"{table}::{category}"`, which the explorer writes into the label map
/// whenever a `CoverTable` category predicate holds for a test case.
pub fn verify_cover_tables(tables: &[CoverTableRequirement], labels: &HashMap<String, u64>, tests_run: u64, confidence: f64) -> Vec<CoverageReport> {
    tables
        .iter()
        .flat_map(|t| {
            t.categories.iter().map(move |(category, _)| {
                let key = cover_table_label(&t.name, category);
                let count = labels.get(&key).copied().unwrap_or(0);
                verify_cover(&key, 0.0, count, tests_run, confidence)
            })
        })
        .collect()
}

pub fn cover_table_label(table: &str, category: &str) -> String {
    format!("{table}::{category}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfied_when_observed_rate_comfortably_exceeds_requirement() {
        let report = verify_cover("neg", 10.0, 150, 1000, 0.95);
        assert!(report.satisfied);
    }

    #[test]
    fn unsatisfied_when_upper_bound_falls_short_of_requirement() {
        let report = verify_cover("rare", 50.0, 2, 1000, 0.95);
        assert!(!report.satisfied);
    }

    #[test]
    fn zero_tests_run_yields_unit_interval_and_fails_any_positive_requirement() {
        let report = verify_cover("never-ran", 1.0, 0, 0, 0.95);
        assert_eq!(report.interval, (0.0, 1.0));
        assert!(report.satisfied);
    }
}
