//! Confidence functions: Wilson score intervals, Bayesian
//! confidence, credible intervals, sample-size planning, and the two
//! closed-form detection-probability helpers.

use crate::error::{EngineError, EngineResult};
use crate::stats::distributions::Beta;

fn check_unit_interval(name: &str, x: f64) -> EngineResult<()> {
    if !(x > 0.0 && x < 1.0) {
        return Err(EngineError::invalid_argument(format!("{} must be in (0, 1), got {}", name, x)));
    }
    Ok(())
}

fn check_half_open_unit_interval(name: &str, x: f64) -> EngineResult<()> {
    if !(x > 0.0 && x <= 1.0) {
        return Err(EngineError::invalid_argument(format!("{} must be in (0, 1], got {}", name, x)));
    }
    Ok(())
}

/// `[lower, upper]` Wilson score interval for `successes` out of `trials`
/// at the given `confidence` (default 0.95 at call sites). Clipped to
/// `[0, 1]`. `trials = 0` returns `[0, 1]`.
pub fn wilson_score_interval(successes: u64, trials: u64, confidence: f64) -> EngineResult<(f64, f64)> {
    check_unit_interval("confidence", confidence)?;
    if trials == 0 {
        return Ok((0.0, 1.0));
    }
    let n = trials as f64;
    let p_hat = successes as f64 / n;
    let z = z_score(confidence);
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = p_hat + z2 / (2.0 * n);
    let margin = z * ((p_hat * (1.0 - p_hat) / n) + z2 / (4.0 * n * n)).sqrt();
    let lo = ((center - margin) / denom).clamp(0.0, 1.0);
    let hi = ((center + margin) / denom).clamp(0.0, 1.0);
    Ok((lo, hi))
}

/// Inverse standard-normal CDF (Acklam's rational approximation), used to
/// turn a two-sided confidence level into a z-score for the Wilson
/// interval without pulling in a whole normal-distribution dependency
/// beyond what `statrs` already gives us elsewhere.
fn z_score(confidence: f64) -> f64 {
    let p = 1.0 - (1.0 - confidence) / 2.0;
    inverse_normal_cdf(p)
}

fn inverse_normal_cdf(p: f64) -> f64 {
    // Peter Acklam's algorithm; accurate to ~1.15e-9.
    const A: [f64; 6] = [
        -3.969683028665376e+01, 2.209460984245205e+02, -2.759285104469687e+02,
        1.383577518672690e+02, -3.066479806614716e+01, 2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01, 1.615858368580409e+02, -1.556989798598866e+02,
        6.680131188771972e+01, -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03, -3.223964580411365e-01, -2.400758277161838e+00,
        -2.549732539343734e+00, 4.374664141464968e+00, 2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03, 3.224671290700398e-01, 2.445134137142996e+00, 3.754408661907416e+00,
    ];
    let p_low = 0.02425;
    let p_high = 1.0 - p_low;

    if p < p_low {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= p_high {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

/// Posterior probability, under a uniform `Beta(1,1)` prior over the pass
/// rate, that the true pass rate exceeds `threshold`:
/// `1 - Beta(successes+1, failures+1).cdf(threshold)`.
pub fn calculate_bayesian_confidence(successes: u64, failures: u64, threshold: f64) -> EngineResult<f64> {
    check_unit_interval("threshold", threshold)?;
    let posterior = Beta::new(successes as f64 + 1.0, failures as f64 + 1.0)?;
    Ok(1.0 - posterior.cdf(threshold))
}

/// `[alpha/2, 1 - alpha/2]` posterior quantiles of `Beta(successes+1,
/// failures+1)`.
pub fn calculate_credible_interval(successes: u64, failures: u64, confidence: f64) -> EngineResult<(f64, f64)> {
    check_unit_interval("confidence", confidence)?;
    let posterior = Beta::new(successes as f64 + 1.0, failures as f64 + 1.0)?;
    let alpha = 1.0 - confidence;
    Ok((posterior.inv(alpha / 2.0), posterior.inv(1.0 - alpha / 2.0)))
}

/// Binary search on `n in [1, 100_000]` for the minimum `n` such that
/// `calculate_bayesian_confidence(n, 0, threshold) >= target_confidence`.
pub fn sample_size_for_confidence(threshold: f64, target_confidence: f64) -> EngineResult<u64> {
    check_unit_interval("threshold", threshold)?;
    check_unit_interval("target_confidence", target_confidence)?;

    const MAX_N: u64 = 100_000;
    if calculate_bayesian_confidence(MAX_N, 0, threshold)? < target_confidence {
        return Err(EngineError::invalid_argument(
            "no n in [1, 100000] reaches the requested confidence at this threshold",
        ));
    }

    let (mut lo, mut hi) = (1u64, MAX_N);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if calculate_bayesian_confidence(mid, 0, threshold)? >= target_confidence {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    Ok(lo)
}

/// `1 / failure_rate`.
pub fn expected_tests_to_detect_failure(failure_rate: f64) -> EngineResult<f64> {
    check_half_open_unit_interval("failure_rate", failure_rate)?;
    Ok(1.0 / failure_rate)
}

/// `1 - (1 - failure_rate)^tests`.
pub fn detection_probability(failure_rate: f64, tests: u64) -> EngineResult<f64> {
    check_half_open_unit_interval("failure_rate", failure_rate)?;
    Ok(1.0 - (1.0 - failure_rate).powi(tests as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wilson_interval_trials_zero_is_unit_interval() {
        assert_eq!(wilson_score_interval(0, 0, 0.95).unwrap(), (0.0, 1.0));
    }

    #[test]
    fn wilson_interval_bounds_contain_observed_rate() {
        let (lo, hi) = wilson_score_interval(50, 100, 0.95).unwrap();
        assert!(lo <= 0.5 && 0.5 <= hi);
    }

    #[test]
    fn bayesian_confidence_monotonic_in_successes() {
        let threshold = 0.9;
        let mut prev = 0.0;
        for n in [0u64, 10, 50, 100, 500] {
            let c = calculate_bayesian_confidence(n, 0, threshold).unwrap();
            assert!(c >= prev - 1e-12, "confidence decreased at n={}", n);
            prev = c;
        }
    }

    #[test]
    fn sample_size_inversion_is_tight() {
        let threshold = 0.999;
        let target = 0.95;
        let n = sample_size_for_confidence(threshold, target).unwrap();
        assert!(n >= 2900 && n <= 3100, "n={} out of expected band", n);
        assert!(calculate_bayesian_confidence(n, 0, threshold).unwrap() >= target);
        if n > 1 {
            assert!(calculate_bayesian_confidence(n - 1, 0, threshold).unwrap() < target);
        }
    }

    #[test]
    fn detection_identity_holds_for_small_rate() {
        let r = 0.001;
        let n = (1.0 / r).round() as u64;
        let p = detection_probability(r, n).unwrap();
        let expected = 1.0 - 1.0 / std::f64::consts::E;
        assert!((p - expected).abs() < 0.01);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        assert!(calculate_bayesian_confidence(1, 1, 1.5).is_err());
        assert!(calculate_bayesian_confidence(1, 1, 0.0).is_err());
    }
}
