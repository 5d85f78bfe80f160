//! The check orchestrator: wires the explorer, shrinker, and coverage
//! verification together around one compiled scenario -- configure
//! options, then hand it a scenario to run.

use crate::coverage::{self, CoverageReport};
use crate::error::EngineError;
use crate::explorer::{DetailedStatistics, Explorer, ExplorationBudget, Outcome};
use crate::reporter::{ProgressReporter, ResultReporter, SilentProgressReporter, SilentResultReporter};
use crate::scenario::{BoundTestCase, ExecutableScenario};
use crate::shrinker::{RoundStrategy, ShrinkBudget, Shrinker};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// The tagged union `{forall-pass, exists-pass, exhausted, failed}`,
/// carrying an example/counterexample typed as the scenario record.
#[derive(Debug)]
pub enum CheckOutcome<Rec> {
    ForAllPass { tests_run: usize, skipped: usize },
    ExistsPass { tests_run: usize, skipped: usize, witness: Rec },
    Exhausted { tests_run: usize, skipped: usize },
    Failed { tests_run: usize, skipped: usize, counterexample: Rec, error: Option<String>, shrink_steps: usize },
}

impl<Rec> CheckOutcome<Rec> {
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, CheckOutcome::ForAllPass { .. } | CheckOutcome::ExistsPass { .. })
    }
}

/// Check options. Dependency-injection hooks
/// (`statisticsAggregator`, `*ReporterFactory`) are represented as plain
/// `Arc`-held trait objects rather than factories, since this crate's
/// check invocations are single-shot rather than pooled.
pub struct CheckOptions {
    pub seed: Option<u64>,
    pub log_statistics: bool,
    pub verbose: bool,
    pub progress_reporter: Arc<dyn ProgressReporter>,
    pub progress_interval_tests: usize,
    pub progress_interval: Duration,
    pub result_reporter: Arc<dyn ResultReporter<BoundTestCase>>,
    pub budget: ExplorationBudget,
    pub shrink_budget: ShrinkBudget,
    pub shrink_strategy: RoundStrategy,
    pub detailed_stats: bool,
    pub cover_confidence: f64,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            seed: None,
            log_statistics: false,
            verbose: false,
            progress_reporter: Arc::new(SilentProgressReporter),
            progress_interval_tests: 100,
            progress_interval: Duration::from_millis(1000),
            result_reporter: Arc::new(SilentResultReporter),
            budget: ExplorationBudget::default(),
            shrink_budget: ShrinkBudget::default(),
            shrink_strategy: RoundStrategy::RoundRobin,
            detailed_stats: false,
            cover_confidence: 0.95,
        }
    }
}

/// The result object: `{satisfiable, example, statistics, seed, skipped}`
/// plus the typed assert helpers.
pub struct CheckResult {
    pub outcome: CheckOutcome<BoundTestCase>,
    pub seed: u64,
    pub labels: HashMap<String, u64>,
    pub detailed_stats: Option<DetailedStatistics>,
    pub coverage: Vec<CoverageReport>,
}

impl CheckResult {
    pub fn satisfiable(&self) -> bool {
        self.outcome.is_satisfiable()
    }

    pub fn skipped(&self) -> usize {
        match &self.outcome {
            CheckOutcome::ForAllPass { skipped, .. }
            | CheckOutcome::ExistsPass { skipped, .. }
            | CheckOutcome::Exhausted { skipped, .. }
            | CheckOutcome::Failed { skipped, .. } => *skipped,
        }
    }

    pub fn example(&self) -> Option<&BoundTestCase> {
        match &self.outcome {
            CheckOutcome::ExistsPass { witness, .. } => Some(witness),
            _ => None,
        }
    }

    pub fn counterexample(&self) -> Option<&BoundTestCase> {
        match &self.outcome {
            CheckOutcome::Failed { counterexample, .. } => Some(counterexample),
            _ => None,
        }
    }

    /// Throws with a prefix + seed on mismatch.
    pub fn assert_satisfiable(&self) -> Result<(), EngineError> {
        if self.satisfiable() {
            Ok(())
        } else {
            Err(EngineError::schema_misuse("assertSatisfiable", format!("result was not satisfiable (seed={})", self.seed)))
        }
    }

    pub fn assert_not_satisfiable(&self) -> Result<(), EngineError> {
        if !self.satisfiable() {
            Ok(())
        } else {
            Err(EngineError::schema_misuse("assertNotSatisfiable", format!("result was satisfiable (seed={})", self.seed)))
        }
    }

    /// Asserts a witness/passing example exists and that every field named
    /// in `partial` matches it.
    pub fn assert_example(&self, partial: &[(&str, &dyn Fn(&BoundTestCase) -> bool)]) -> Result<(), EngineError> {
        let Some(example) = self.example() else {
            return Err(EngineError::schema_misuse("assertExample", format!("no example was found (seed={})", self.seed)));
        };
        for (name, pred) in partial {
            if !pred(example) {
                return Err(EngineError::schema_misuse("assertExample", format!("field `{name}` did not match (seed={})", self.seed)));
            }
        }
        Ok(())
    }

    pub fn assert_counter_example(&self, partial: &[(&str, &dyn Fn(&BoundTestCase) -> bool)]) -> Result<(), EngineError> {
        let Some(ce) = self.counterexample() else {
            return Err(EngineError::schema_misuse("assertCounterExample", format!("no counterexample was found (seed={})", self.seed)));
        };
        for (name, pred) in partial {
            if !pred(ce) {
                return Err(EngineError::schema_misuse("assertCounterExample", format!("field `{name}` did not match (seed={})", self.seed)));
            }
        }
        Ok(())
    }
}

/// The check orchestrator: a builder around [`CheckOptions`] that runs a
/// compiled scenario through exploration, shrinking (on failure), and
/// coverage verification.
#[derive(Default)]
pub struct Check {
    options: CheckOptions,
}

impl Check {
    pub fn new() -> Self {
        Check::default()
    }

    pub fn with_options(options: CheckOptions) -> Self {
        Check { options }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    pub fn budget(mut self, budget: ExplorationBudget) -> Self {
        self.options.budget = budget;
        self
    }

    pub fn shrink_strategy(mut self, strategy: RoundStrategy) -> Self {
        self.options.shrink_strategy = strategy;
        self
    }

    pub fn run(&self, scenario: ExecutableScenario) -> CheckResult {
        let seed = self.options.seed.unwrap_or(0);
        let explorer = Explorer::new(self.options.budget.clone())
            .with_detailed_stats(self.options.detailed_stats)
            .with_progress_reporter(self.options.progress_reporter.clone(), self.options.progress_interval_tests, self.options.progress_interval);

        let explored = explorer.explore(&scenario, seed);

        let coverage_reports = coverage::verify_covers(&scenario.covers, &explored.labels, explored.tests_run as u64, self.options.cover_confidence)
            .into_iter()
            .chain(coverage::verify_cover_tables(&scenario.cover_tables, &explored.labels, explored.tests_run as u64, self.options.cover_confidence))
            .collect();

        let outcome = match explored.outcome {
            Outcome::Failed => {
                let ce = explored.counterexample.expect("Failed outcome always carries a counterexample");
                let shrinker = Shrinker::new(self.options.shrink_budget.clone(), self.options.shrink_strategy);
                let shrunk = shrinker.shrink(&scenario, ce);
                CheckOutcome::Failed {
                    tests_run: explored.tests_run,
                    skipped: explored.skipped,
                    counterexample: shrunk.counterexample,
                    error: explored.error,
                    shrink_steps: shrunk.steps,
                }
            }
            Outcome::Passed if scenario.has_existential => CheckOutcome::ExistsPass {
                tests_run: explored.tests_run,
                skipped: explored.skipped,
                witness: explored.witness.expect("existential Passed outcome always carries a witness"),
            },
            Outcome::Passed => CheckOutcome::ForAllPass { tests_run: explored.tests_run, skipped: explored.skipped },
            Outcome::Exhausted => CheckOutcome::Exhausted { tests_run: explored.tests_run, skipped: explored.skipped },
        };

        let result = CheckResult { outcome, seed, labels: explored.labels, detailed_stats: explored.detailed_stats, coverage: coverage_reports };
        self.options.result_reporter.on_result(&result.outcome);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrary::primitives::integer;
    use crate::scenario::Scenario;

    #[test]
    fn passing_scenario_reports_forall_pass() {
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

        let result = Check::new().seed(1).run(scenario);
        assert!(result.satisfiable());
        result.assert_satisfiable().unwrap();
    }

    #[test]
    fn failing_scenario_shrinks_and_reports_counterexample() {
        let scenario = Scenario::new()
            .forall("a", integer(-1000, 1000))
            .then(|case| Ok(*case.get::<i64>("a").unwrap() < 100))
            .compile()
            .unwrap();

        let result = Check::new().seed(5).budget(ExplorationBudget { max_tests: 500, ..Default::default() }).run(scenario);
        assert!(!result.satisfiable());
        result.assert_not_satisfiable().unwrap();
        let ce = result.counterexample().unwrap();
        assert!(*ce.get::<i64>("a").unwrap() >= 100);
    }

    #[test]
    fn exists_scenario_reports_witness() {
        let scenario = Scenario::new()
            .exists("n", integer(0, 100))
            .then(|case| Ok(*case.get::<i64>("n").unwrap() % 7 == 0))
            .compile()
            .unwrap();

        let result = Check::new().seed(2).run(scenario);
        assert!(result.satisfiable());
        let example = result.example().unwrap();
        assert_eq!(*example.get::<i64>("n").unwrap() % 7, 0);
        assert!(result.assert_example(&[("n", &|c: &BoundTestCase| *c.get::<i64>("n").unwrap() % 7 == 0)]).is_ok());
    }
}
