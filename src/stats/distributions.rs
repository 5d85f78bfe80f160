//! Beta and Beta-Binomial distributions: thin wrappers over
//! `statrs` that add the mode/inverse-cdf conveniences the rest of the
//! engine needs (filter-arbitrary size estimation, Bayesian confidence).

use crate::error::{EngineError, EngineResult};
use statrs::distribution::{Beta as StatrsBeta, ContinuousCDF, Continuous};
use statrs::function::gamma::ln_gamma;

/// `Beta(alpha, beta)`.
#[derive(Clone, Copy, Debug)]
pub struct Beta {
    alpha: f64,
    beta: f64,
}

impl Beta {
    pub fn new(alpha: f64, beta: f64) -> EngineResult<Self> {
        if !(alpha > 0.0 && beta > 0.0) {
            return Err(EngineError::invalid_argument(format!(
                "Beta requires alpha, beta > 0, got ({}, {})",
                alpha, beta
            )));
        }
        Ok(Beta { alpha, beta })
    }

    fn inner(&self) -> StatrsBeta {
        StatrsBeta::new(self.alpha, self.beta).expect("validated at construction")
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta_param(&self) -> f64 {
        self.beta
    }

    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    /// Mode of `Beta(alpha, beta)`. Undefined (returns the mean) when
    /// `alpha <= 1` or `beta <= 1`.
    pub fn mode(&self) -> f64 {
        if self.alpha > 1.0 && self.beta > 1.0 {
            (self.alpha - 1.0) / (self.alpha + self.beta - 2.0)
        } else {
            self.mean()
        }
    }

    pub fn pdf(&self, x: f64) -> f64 {
        self.inner().pdf(x)
    }

    pub fn cdf(&self, x: f64) -> f64 {
        self.inner().cdf(x.clamp(0.0, 1.0))
    }

    /// Inverse CDF via bisection (statrs's `Beta` has no closed-form
    /// `inverse_cdf`, so we search monotonically on `cdf`).
    pub fn inv(&self, p: f64) -> f64 {
        let p = p.clamp(0.0, 1.0);
        if p <= 0.0 {
            return 0.0;
        }
        if p >= 1.0 {
            return 1.0;
        }
        let (mut lo, mut hi) = (0.0f64, 1.0f64);
        for _ in 0..100 {
            let mid = (lo + hi) / 2.0;
            if self.cdf(mid) < p {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        (lo + hi) / 2.0
    }

    /// Posterior update with a `Beta(1, 1)` uniform prior.
    pub fn uniform_prior() -> Self {
        Beta { alpha: 1.0, beta: 1.0 }
    }

    /// The *legacy* optimistic prior kept as a research-reproducibility
    /// baseline alongside the canonical uninformative prior.
    pub fn legacy_optimistic_prior() -> Self {
        Beta { alpha: 2.0, beta: 1.0 }
    }

    pub fn updated(&self, accepts: f64, rejects: f64) -> Self {
        Beta { alpha: self.alpha + accepts, beta: self.beta + rejects }
    }
}

/// `BetaBinomial(trials, alpha, beta)`: the posterior-predictive
/// distribution used when reasoning about a fixed number of future trials.
#[derive(Clone, Copy, Debug)]
pub struct BetaBinomial {
    trials: u64,
    alpha: f64,
    beta: f64,
}

impl BetaBinomial {
    pub fn new(trials: u64, alpha: f64, beta: f64) -> EngineResult<Self> {
        if !(alpha > 0.0 && beta > 0.0) {
            return Err(EngineError::invalid_argument("BetaBinomial requires alpha, beta > 0"));
        }
        Ok(BetaBinomial { trials, alpha, beta })
    }

    pub fn mean(&self) -> f64 {
        self.trials as f64 * self.alpha / (self.alpha + self.beta)
    }

    /// `log pmf(k)` via `lgamma`, numerically stable for large `trials`.
    pub fn log_pmf(&self, k: u64) -> f64 {
        let n = self.trials as f64;
        let k = k as f64;
        ln_choose(n, k)
            + ln_beta(k + self.alpha, n - k + self.beta)
            - ln_beta(self.alpha, self.beta)
    }

    pub fn pmf(&self, k: u64) -> f64 {
        self.log_pmf(k).exp()
    }

    /// Exact mode when `alpha > 1 && beta > 1` and `trials > 0`; otherwise
    /// approximated by rounding the mean.
    pub fn mode(&self) -> u64 {
        if self.alpha > 1.0 && self.beta > 1.0 && self.trials > 0 {
            let num = (self.alpha - 1.0) * (self.trials as f64 + 1.0);
            let den = self.alpha + self.beta - 2.0;
            (num / den).floor().clamp(0.0, self.trials as f64) as u64
        } else {
            self.mean().round().clamp(0.0, self.trials as f64) as u64
        }
    }

    /// `O(trials)` summation of the pmf up to and including `k`.
    pub fn cdf(&self, k: u64) -> f64 {
        (0..=k.min(self.trials)).map(|i| self.pmf(i)).sum()
    }

    /// Binary search on [`BetaBinomial::cdf`] for the smallest `k` with
    /// `cdf(k) >= p`.
    pub fn inv(&self, p: f64) -> u64 {
        let p = p.clamp(0.0, 1.0);
        let (mut lo, mut hi) = (0u64, self.trials);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.cdf(mid) >= p {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }
}

fn ln_beta(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

fn ln_choose(n: f64, k: f64) -> f64 {
    ln_gamma(n + 1.0) - ln_gamma(k + 1.0) - ln_gamma(n - k + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beta_mean_and_mode_agree_for_symmetric_case() {
        let b = Beta::new(5.0, 5.0).unwrap();
        assert!((b.mean() - 0.5).abs() < 1e-9);
        assert!((b.mode() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn beta_cdf_is_monotonic() {
        let b = Beta::new(2.0, 3.0).unwrap();
        let mut prev = 0.0;
        for i in 1..=10 {
            let x = i as f64 / 10.0;
            let c = b.cdf(x);
            assert!(c >= prev);
            prev = c;
        }
    }

    #[test]
    fn beta_inv_roundtrips_cdf() {
        let b = Beta::new(3.0, 7.0).unwrap();
        for p in [0.1, 0.5, 0.9] {
            let x = b.inv(p);
            assert!((b.cdf(x) - p).abs() < 0.01);
        }
    }

    #[test]
    fn beta_binomial_mean_matches_formula() {
        let bb = BetaBinomial::new(10, 2.0, 2.0).unwrap();
        assert!((bb.mean() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn beta_binomial_cdf_sums_to_one_at_trials() {
        let bb = BetaBinomial::new(20, 1.0, 1.0).unwrap();
        assert!((bb.cdf(20) - 1.0).abs() < 1e-6);
    }
}
