//! Reporter interfaces: `ProgressReporter` receives periodic
//! snapshots during exploration/shrinking, `ResultReporter` receives the
//! final outcome. The default implementations here are the minimal useful
//! sinks, layered over the optional `log`/`env_logger` wiring rather than
//! inventing a new logging facade.

use std::time::Duration;

/// The current phase of a check invocation, reported alongside progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Exploring,
    Shrinking,
}

/// A periodic snapshot emitted during exploration/shrinking.
#[derive(Clone, Debug)]
pub struct Progress {
    pub tests_run: usize,
    pub tests_passed: usize,
    pub tests_discarded: usize,
    pub total_tests: Option<usize>,
    pub elapsed: Duration,
    pub current_phase: Phase,
}

pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, progress: &Progress);
}

/// Logs progress via `log::info!` when the `use_logging` feature is on,
/// otherwise a silent no-op.
#[derive(Default)]
pub struct LoggingProgressReporter;

impl ProgressReporter for LoggingProgressReporter {
    fn on_progress(&self, progress: &Progress) {
        #[cfg(feature = "use_logging")]
        log::info!(
            "{:?}: {}/{} tests run ({} passed, {} discarded) after {:?}",
            progress.current_phase,
            progress.tests_run,
            progress.total_tests.map(|t| t.to_string()).unwrap_or_else(|| "?".to_string()),
            progress.tests_passed,
            progress.tests_discarded,
            progress.elapsed
        );
        #[cfg(not(feature = "use_logging"))]
        let _ = progress;
    }
}

/// Drops every progress update; useful in tests or when a caller supplies
/// its own `onProgress` callback via check options.
#[derive(Default)]
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn on_progress(&self, _progress: &Progress) {}
}

/// Receives the final check outcome. `Rec` is the reporter's
/// view of a bound test case; `check.rs` implements this for
/// `crate::scenario::BoundTestCase`.
pub trait ResultReporter<Rec>: Send + Sync {
    fn on_result(&self, outcome: &crate::check::CheckOutcome<Rec>);
}

/// Logs a one-line summary of the outcome via `log::info!`/`log::warn!`.
#[derive(Default)]
pub struct LoggingResultReporter;

impl<Rec> ResultReporter<Rec> for LoggingResultReporter {
    fn on_result(&self, outcome: &crate::check::CheckOutcome<Rec>) {
        #[cfg(feature = "use_logging")]
        match outcome {
            crate::check::CheckOutcome::ForAllPass { tests_run, .. } => log::info!("forall passed after {tests_run} tests"),
            crate::check::CheckOutcome::ExistsPass { tests_run, .. } => log::info!("exists witness found after {tests_run} tests"),
            crate::check::CheckOutcome::Exhausted { tests_run, skipped, .. } => {
                log::warn!("exhausted after {tests_run} tests ({skipped} skipped) without a conclusive result")
            }
            crate::check::CheckOutcome::Failed { tests_run, .. } => log::warn!("failed after {tests_run} tests"),
        }
        #[cfg(not(feature = "use_logging"))]
        let _ = outcome;
    }
}

#[derive(Default)]
pub struct SilentResultReporter;

impl<Rec> ResultReporter<Rec> for SilentResultReporter {
    fn on_result(&self, _outcome: &crate::check::CheckOutcome<Rec>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_progress_reporter_does_not_panic() {
        let reporter = SilentProgressReporter;
        reporter.on_progress(&Progress {
            tests_run: 10,
            tests_passed: 10,
            tests_discarded: 0,
            total_tests: Some(100),
            elapsed: Duration::from_millis(5),
            current_phase: Phase::Exploring,
        });
    }

    #[test]
    fn silent_result_reporter_does_not_panic() {
        let reporter: SilentResultReporter = SilentResultReporter;
        let outcome: crate::check::CheckOutcome<()> = crate::check::CheckOutcome::ForAllPass { tests_run: 1, skipped: 0 };
        reporter.on_result(&outcome);
    }
}
