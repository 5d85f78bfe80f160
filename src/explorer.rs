//! The explorer: traverses a compiled scenario's nested
//! quantifier list, interleaving forall/exists semantics, precondition
//! skipping, and budget/confidence-based early termination.

use crate::context::with_fresh_context;
use crate::coverage::cover_table_label;
use crate::pick::Size;
use crate::reporter::{Phase, Progress, ProgressReporter};
use crate::sampler::SeededRng;
use crate::scenario::{BoundTestCase, DynPick, ExecutableScenario, QuantifierKind};
use crate::stats::{calculate_bayesian_confidence, DistributionTracker};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Search limits the explorer enforces at every frame boundary.
#[derive(Clone, Debug)]
pub struct ExplorationBudget {
    pub max_tests: usize,
    pub max_time: Duration,
    pub target_confidence: f64,
    pub min_confidence: f64,
    pub max_iterations: usize,
    pub pass_rate_threshold: f64,
    pub confidence_check_interval: usize,
}

impl Default for ExplorationBudget {
    fn default() -> Self {
        ExplorationBudget {
            max_tests: 100,
            max_time: Duration::from_secs(10),
            target_confidence: 0.95,
            min_confidence: 0.90,
            max_iterations: 10_000,
            pass_rate_threshold: 0.999,
            confidence_check_interval: 100,
        }
    }
}

/// Per-quantifier detail collected only when [`Explorer::with_detailed_stats`]
/// is enabled.
#[derive(Clone, Debug, Default)]
pub struct QuantifierStats {
    pub samples_generated: usize,
    pub unique_values: usize,
    pub corner_cases_tested: usize,
    pub distribution: DistributionTracker,
}

#[derive(Clone, Debug, Default)]
pub struct DetailedStatistics {
    pub per_quantifier: HashMap<String, QuantifierStats>,
}

/// The tagged union `{passed | failed | exhausted}`.
#[derive(Debug)]
pub enum Outcome {
    Passed,
    Failed,
    Exhausted,
}

#[derive(Debug)]
pub struct ExplorationResult {
    pub outcome: Outcome,
    pub tests_run: usize,
    pub skipped: usize,
    pub witness: Option<BoundTestCase>,
    pub counterexample: Option<BoundTestCase>,
    pub error: Option<String>,
    pub labels: HashMap<String, u64>,
    pub detailed_stats: Option<DetailedStatistics>,
}

enum FrameOutcome {
    Pass(Option<BoundTestCase>),
    Fail(BoundTestCase),
    Skipped,
    Inconclusive,
}

struct ExplorationState<'a> {
    budget: &'a ExplorationBudget,
    start: Instant,
    tests_run: usize,
    passes: usize,
    failures: usize,
    skipped: usize,
    iterations: usize,
    confidence_satisfied: bool,
    last_error: Option<String>,
    labels: HashMap<String, u64>,
    detailed: Option<DetailedStatistics>,
    progress: Option<(Arc<dyn ProgressReporter>, usize, Duration)>,
    last_progress_tests: usize,
    last_progress_at: Instant,
}

impl<'a> ExplorationState<'a> {
    fn new(budget: &'a ExplorationBudget, collect_detailed: bool, progress: Option<(Arc<dyn ProgressReporter>, usize, Duration)>) -> Self {
        let now = Instant::now();
        ExplorationState {
            budget,
            start: now,
            tests_run: 0,
            passes: 0,
            failures: 0,
            skipped: 0,
            iterations: 0,
            confidence_satisfied: false,
            last_error: None,
            labels: HashMap::new(),
            detailed: if collect_detailed { Some(DetailedStatistics::default()) } else { None },
            progress,
            last_progress_tests: 0,
            last_progress_at: now,
        }
    }

    fn maybe_report_progress(&mut self) {
        let Some((reporter, interval_tests, interval_time)) = self.progress.clone() else { return };
        let tests_elapsed = self.tests_run + self.skipped - self.last_progress_tests;
        if tests_elapsed < interval_tests && self.last_progress_at.elapsed() < interval_time {
            return;
        }
        reporter.on_progress(&Progress {
            tests_run: self.tests_run,
            tests_passed: self.passes,
            tests_discarded: self.skipped,
            total_tests: Some(self.budget.max_tests),
            elapsed: self.start.elapsed(),
            current_phase: Phase::Exploring,
        });
        self.last_progress_tests = self.tests_run + self.skipped;
        self.last_progress_at = Instant::now();
    }

    fn over_budget(&self) -> bool {
        self.tests_run >= self.budget.max_tests
            || self.iterations >= self.budget.max_iterations
            || self.start.elapsed() >= self.budget.max_time
            || self.confidence_satisfied
    }

    fn maybe_check_confidence(&mut self) {
        if self.tests_run == 0 || self.tests_run % self.budget.confidence_check_interval != 0 {
            return;
        }
        let confidence = calculate_bayesian_confidence(self.passes as u64, self.failures as u64, self.budget.pass_rate_threshold)
            .unwrap_or(0.0);
        let reached_tests = self.tests_run >= self.budget.max_tests;
        if confidence >= self.budget.target_confidence || (reached_tests && confidence >= self.budget.min_confidence) {
            self.confidence_satisfied = true;
        }
    }

    fn merge_context(&mut self, ctx: &crate::context::StatisticsContext) {
        for (k, v) in ctx.labels() {
            *self.labels.entry(k.clone()).or_insert(0) += v;
        }
    }

    /// Evaluates every `Cover`/`CoverTable` predicate against a counted test
    /// case and folds matches into the same label map `label()` calls write
    /// to, keyed by `cover_table_label` for table categories.
    fn record_coverage(&mut self, scenario: &ExecutableScenario, case: &BoundTestCase) {
        for cover in &scenario.covers {
            if (cover.predicate)(case) {
                *self.labels.entry(cover.label.clone()).or_insert(0) += 1;
            }
        }
        for table in &scenario.cover_tables {
            for (category, predicate) in &table.categories {
                if predicate(case) {
                    *self.labels.entry(cover_table_label(&table.name, category)).or_insert(0) += 1;
                }
            }
        }
    }

    fn record_quantifier_sample(&mut self, name: &str, pick: &DynPick, corner_cases: &[DynPick], seen: &mut HashMap<String, Vec<DynPick>>, equals: impl Fn(&DynPick, &DynPick) -> bool) {
        let Some(detailed) = self.detailed.as_mut() else { return };
        let entry = detailed.per_quantifier.entry(name.to_string()).or_default();
        entry.samples_generated += 1;
        if let Some(v) = pick.observe() {
            entry.distribution.add(v);
        }
        let bucket = seen.entry(name.to_string()).or_default();
        if !bucket.iter().any(|p| equals(p, pick)) {
            bucket.push(pick.clone());
            entry.unique_values += 1;
        }
        if corner_cases.iter().any(|c| equals(c, pick)) {
            entry.corner_cases_tested += 1;
        }
    }
}

/// Drives one check invocation's exploration phase.
pub struct Explorer {
    budget: ExplorationBudget,
    collect_detailed: bool,
    progress: Option<(Arc<dyn ProgressReporter>, usize, Duration)>,
}

impl Explorer {
    pub fn new(budget: ExplorationBudget) -> Self {
        Explorer { budget, collect_detailed: false, progress: None }
    }

    pub fn with_detailed_stats(mut self, enabled: bool) -> Self {
        self.collect_detailed = enabled;
        self
    }

    /// Installs a progress reporter invoked at least every `interval_tests`
    /// tests or `interval_time`, whichever comes first (the default cadence
    /// is 100 tests / 1000ms).
    pub fn with_progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>, interval_tests: usize, interval_time: Duration) -> Self {
        self.progress = Some((reporter, interval_tests, interval_time));
        self
    }

    pub fn explore(&self, scenario: &ExecutableScenario, seed: u64) -> ExplorationResult {
        let rng = SeededRng::from_seed(seed);
        let mut state = ExplorationState::new(&self.budget, self.collect_detailed, self.progress.clone());
        let mut case = BoundTestCase::new();
        let mut seen_per_quantifier: HashMap<String, Vec<DynPick>> = HashMap::new();

        let top = rng.with(|rng| self.run_frame(scenario, 0, &mut case, &mut state, rng, &mut seen_per_quantifier));

        let outcome = match top {
            FrameOutcome::Fail(ce) => ExplorationResult {
                outcome: Outcome::Failed,
                tests_run: state.tests_run,
                skipped: state.skipped,
                witness: None,
                counterexample: Some(ce),
                error: state.last_error.clone(),
                labels: state.labels.clone(),
                detailed_stats: state.detailed.clone(),
            },
            FrameOutcome::Pass(witness) if scenario.has_existential => ExplorationResult {
                outcome: Outcome::Passed,
                tests_run: state.tests_run,
                skipped: state.skipped,
                witness,
                counterexample: None,
                error: None,
                labels: state.labels.clone(),
                detailed_stats: state.detailed.clone(),
            },
            FrameOutcome::Pass(_) => ExplorationResult {
                outcome: Outcome::Passed,
                tests_run: state.tests_run,
                skipped: state.skipped,
                witness: None,
                counterexample: None,
                error: None,
                labels: state.labels.clone(),
                detailed_stats: state.detailed.clone(),
            },
            FrameOutcome::Skipped | FrameOutcome::Inconclusive => ExplorationResult {
                outcome: Outcome::Exhausted,
                tests_run: state.tests_run,
                skipped: state.skipped,
                witness: None,
                counterexample: None,
                error: None,
                labels: state.labels.clone(),
                detailed_stats: state.detailed.clone(),
            },
        };
        outcome
    }

    fn per_quantifier_budget(&self, scenario: &ExecutableScenario, state: &ExplorationState) -> usize {
        let remaining = self.budget.max_tests.saturating_sub(state.tests_run).max(1);
        let depth = scenario.quantifiers.len().max(1);
        let root = (remaining as f64).powf(1.0 / depth as f64).ceil() as usize;
        root.clamp(1, 64)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_frame(
        &self,
        scenario: &ExecutableScenario,
        idx: usize,
        case: &mut BoundTestCase,
        state: &mut ExplorationState,
        rng: &mut dyn rand::RngCore,
        seen: &mut HashMap<String, Vec<DynPick>>,
    ) -> FrameOutcome {
        let q = &scenario.quantifiers[idx];
        let is_last = idx + 1 == scenario.quantifiers.len();
        let n = self.per_quantifier_budget(scenario, state);
        let picks = q.sample_with_bias(n, rng);
        let corner_cases = q.corner_cases();

        match q.kind {
            QuantifierKind::ForAll => {
                for pick in picks {
                    if state.over_budget() {
                        return FrameOutcome::Pass(None);
                    }
                    state.record_quantifier_sample(&q.name, &pick, &corner_cases, seen, |a, b| q.equals(a, b));
                    case.bind(q.name.clone(), pick);
                    let outcome = if is_last {
                        self.evaluate_leaf(scenario, case, state)
                    } else {
                        self.run_frame(scenario, idx + 1, case, state, rng, seen)
                    };
                    match outcome {
                        FrameOutcome::Fail(ce) => return FrameOutcome::Fail(ce),
                        FrameOutcome::Inconclusive => return FrameOutcome::Fail(case.clone()),
                        FrameOutcome::Skipped | FrameOutcome::Pass(_) => continue,
                    }
                }
                FrameOutcome::Pass(None)
            }
            QuantifierKind::Exists => {
                for pick in picks {
                    if state.over_budget() {
                        return FrameOutcome::Inconclusive;
                    }
                    state.record_quantifier_sample(&q.name, &pick, &corner_cases, seen, |a, b| q.equals(a, b));
                    case.bind(q.name.clone(), pick);
                    let outcome = if is_last {
                        self.evaluate_leaf(scenario, case, state)
                    } else {
                        self.run_frame(scenario, idx + 1, case, state, rng, seen)
                    };
                    if let FrameOutcome::Pass(witness) = outcome {
                        return FrameOutcome::Pass(Some(witness.unwrap_or_else(|| case.clone())));
                    }
                }
                FrameOutcome::Inconclusive
            }
        }
    }

    fn evaluate_leaf(&self, scenario: &ExecutableScenario, case: &mut BoundTestCase, state: &mut ExplorationState) -> FrameOutcome {
        state.iterations += 1;
        if !scenario.apply_givens_and_preconditions(case) {
            state.skipped += 1;
            return FrameOutcome::Skipped;
        }
        let (result, ctx) = with_fresh_context(|| scenario.evaluate_property(case));
        state.merge_context(&ctx);
        state.maybe_report_progress();
        match result {
            Ok(true) => {
                state.tests_run += 1;
                state.passes += 1;
                state.record_coverage(scenario, case);
                state.maybe_check_confidence();
                FrameOutcome::Pass(Some(case.clone()))
            }
            Ok(false) => {
                state.tests_run += 1;
                state.failures += 1;
                state.record_coverage(scenario, case);
                FrameOutcome::Fail(case.clone())
            }
            Err(e) if e.is_precondition_failure() => {
                state.skipped += 1;
                FrameOutcome::Skipped
            }
            Err(e) => {
                state.tests_run += 1;
                state.failures += 1;
                state.record_coverage(scenario, case);
                state.last_error = Some(e.to_string());
                FrameOutcome::Fail(case.clone())
            }
        }
    }
}

pub fn search_space_describes(size: Size) -> String {
    match size {
        Size::Exact(n) => format!("{n} exact"),
        Size::Estimated { value, lo, hi } => format!("~{value} ({lo}..{hi})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrary::primitives::integer;
    use crate::scenario::Scenario;

    #[test]
    fn commutativity_holds_for_small_integers() {
        let scenario = Scenario::new()
            .forall("a", integer(-10, 10))
            .forall("b", integer(-10, 10))
            .then(|case| {
                let a = *case.get::<i64>("a").unwrap();
                let b = *case.get::<i64>("b").unwrap();
                Ok(a + b == b + a)
            })
            .compile()
            .unwrap();

        let explorer = Explorer::new(ExplorationBudget { max_tests: 200, ..Default::default() });
        let result = explorer.explore(&scenario, 1);
        assert!(matches!(result.outcome, Outcome::Passed));
    }

    #[test]
    fn planted_counterexample_is_found() {
        let scenario = Scenario::new()
            .forall("a", integer(-10, 10))
            .forall("b", integer(-10, 10))
            .then(|case| {
                let a = *case.get::<i64>("a").unwrap();
                let b = *case.get::<i64>("b").unwrap();
                if a + b == 0 {
                    Ok(a + b == b)
                } else {
                    Ok(a + b == b + a)
                }
            })
            .compile()
            .unwrap();

        let explorer = Explorer::new(ExplorationBudget { max_tests: 2000, ..Default::default() });
        let result = explorer.explore(&scenario, 7);
        assert!(matches!(result.outcome, Outcome::Failed));
        let ce = result.counterexample.unwrap();
        let a = *ce.get::<i64>("a").unwrap();
        let b = *ce.get::<i64>("b").unwrap();
        assert_eq!(a + b, 0);
    }

    #[test]
    fn exists_witness_is_found_for_multiple_of_seven() {
        let scenario = Scenario::new()
            .exists("n", integer(0, 100))
            .then(|case| {
                let n = *case.get::<i64>("n").unwrap();
                Ok(n % 7 == 0)
            })
            .compile()
            .unwrap();

        let explorer = Explorer::new(ExplorationBudget { max_tests: 500, ..Default::default() });
        let result = explorer.explore(&scenario, 3);
        assert!(matches!(result.outcome, Outcome::Passed));
        let witness = result.witness.unwrap();
        let n = *witness.get::<i64>("n").unwrap();
        assert_eq!(n % 7, 0);
    }

    #[test]
    fn preconditions_skip_without_counting_as_failures() {
        let scenario = Scenario::new()
            .forall("a", integer(0, 10))
            .precondition(|case| *case.get::<i64>("a").unwrap() != 5)
            .then(|_case| Ok(true))
            .compile()
            .unwrap();

        let explorer = Explorer::new(ExplorationBudget { max_tests: 50, ..Default::default() });
        let result = explorer.explore(&scenario, 11);
        assert!(matches!(result.outcome, Outcome::Passed));
    }

    #[test]
    fn cover_and_cover_table_predicates_are_counted_without_explicit_labels() {
        use crate::scenario::BoundTestCase;

        let is_negative: Arc<dyn Fn(&BoundTestCase) -> bool + Send + Sync> = Arc::new(|case: &BoundTestCase| *case.get::<i64>("x").unwrap() < 0);
        let is_nonnegative: Arc<dyn Fn(&BoundTestCase) -> bool + Send + Sync> = Arc::new(|case: &BoundTestCase| *case.get::<i64>("x").unwrap() >= 0);

        let scenario = Scenario::new()
            .forall("x", integer(-50, 50))
            .cover(10.0, |case| *case.get::<i64>("x").unwrap() < 0, "neg")
            .cover_table("sign", vec![("neg".to_string(), is_negative), ("nonneg".to_string(), is_nonnegative)])
            .then(|_case| Ok(true))
            .compile()
            .unwrap();

        let explorer = Explorer::new(ExplorationBudget { max_tests: 200, ..Default::default() });
        let result = explorer.explore(&scenario, 5);
        assert!(matches!(result.outcome, Outcome::Passed));
        assert!(result.labels.get("neg").copied().unwrap_or(0) > 0, "Cover predicate should have been evaluated automatically");
        assert!(result.labels.contains_key("sign::neg"));
        assert!(result.labels.contains_key("sign::nonneg"));
        let total: u64 = result.labels["sign::neg"] + result.labels["sign::nonneg"];
        assert_eq!(total, result.tests_run as u64);
    }

    #[test]
    fn detailed_stats_collect_a_value_distribution_per_quantifier() {
        let scenario = Scenario::new()
            .forall("a", integer(-10, 10))
            .then(|_case| Ok(true))
            .compile()
            .unwrap();

        let explorer = Explorer::new(ExplorationBudget { max_tests: 100, ..Default::default() }).with_detailed_stats(true);
        let result = explorer.explore(&scenario, 2);
        let stats = result.detailed_stats.unwrap();
        let a_stats = &stats.per_quantifier["a"];
        assert!(a_stats.distribution.count() > 0);
    }
}
