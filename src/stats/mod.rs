//! The statistical apparatus: streaming primitives,
//! probability distributions, and confidence functions.

pub mod confidence;
pub mod distributions;
pub mod streaming;

pub use confidence::{
    calculate_bayesian_confidence, calculate_credible_interval, detection_probability,
    expected_tests_to_detect_failure, sample_size_for_confidence, wilson_score_interval,
};
pub use distributions::{Beta, BetaBinomial};
pub use streaming::{DistributionTracker, MeanVariance, MinMax, P2Quantiles, DEFAULT_HISTOGRAM_SAMPLE_SIZE};
