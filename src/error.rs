//! The error taxonomy used throughout the engine.
//!
//! Most of the variants here are control signals rather than failures in
//! the usual sense (see the module docs on [`EngineError`]); they are still
//! modeled as one `Error` type so that `?` works uniformly through the
//! arbitrary algebra, the explorer, and the shrinker.

use thiserror::Error;

/// The engine's unified error type.
///
/// Several of these variants are not "errors" in the sense of something
/// going wrong with the engine itself; they're how the property body and
/// the arbitrary algebra signal control flow back to the explorer:
///
/// - [`EngineError::PreconditionFailed`] marks a test case as skipped.
/// - [`EngineError::EmptyArbitrary`] is a generation failure, not a panic.
/// - [`EngineError::PropertyPanicked`] records a thrown value as a failure.
/// - Budget exhaustion is not an error at all; it surfaces as
///   `ExplorationResult::Exhausted` and never flows through this type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Raised from inside a property body to mark the current test case as
    /// skipped. Not a failure: skipped cases are excluded from pass/fail
    /// confidence accounting but still count against `maxIterations`.
    #[error("precondition failed")]
    PreconditionFailed,

    /// A construction-time misuse of an arbitrary or scenario builder, e.g.
    /// a negative weight, a non-integer index bound, or a confidence
    /// threshold outside `(0, 1)`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `pick` returned nothing: the arbitrary is empty (directly, or
    /// because a filter starved out every candidate).
    #[error("arbitrary produced no value (empty or filter-starved)")]
    EmptyArbitrary,

    /// The property body raised an error that the engine doesn't otherwise
    /// classify; recorded as a failure with the formatted payload retained.
    #[error("property threw: {0}")]
    PropertyPanicked(String),

    /// Misuse of a typed assertion helper on `CheckOutcome`, e.g. asserting
    /// a witness exists on a result that turned out unsatisfiable.
    #[error("{context}: {detail}")]
    SchemaMisuse { context: String, detail: String },
}

impl EngineError {
    pub fn invalid_argument<S: Into<String>>(detail: S) -> Self {
        EngineError::InvalidArgument(detail.into())
    }

    pub fn schema_misuse<C: Into<String>, D: Into<String>>(context: C, detail: D) -> Self {
        EngineError::SchemaMisuse { context: context.into(), detail: detail.into() }
    }

    /// True for the one variant that is a control signal, not a failure.
    pub fn is_precondition_failure(&self) -> bool {
        matches!(self, EngineError::PreconditionFailed)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
