//! O(1)-memory streaming primitives: Welford mean/variance,
//! min/max, and the P² quantile estimator, composed into a
//! [`DistributionTracker`].

pub const DEFAULT_HISTOGRAM_SAMPLE_SIZE: usize = 200;

/// Running mean and variance via Welford's algorithm.
#[derive(Clone, Debug, Default)]
pub struct MeanVariance {
    count: u64,
    mean: f64,
    m2: f64,
}

impl MeanVariance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, v: f64) {
        self.count += 1;
        let delta = v - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = v - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (Bessel's correction). Requires `count >= 2`.
    pub fn sample_variance(&self) -> Option<f64> {
        if self.count < 2 {
            None
        } else {
            Some(self.m2 / (self.count as f64 - 1.0))
        }
    }

    /// Population variance. Requires `count >= 1`.
    pub fn population_variance(&self) -> Option<f64> {
        if self.count < 1 {
            None
        } else {
            Some(self.m2 / self.count as f64)
        }
    }

    pub fn sample_stddev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }
}

/// Running minimum and maximum.
#[derive(Clone, Debug, Default)]
pub struct MinMax {
    min: Option<f64>,
    max: Option<f64>,
}

impl MinMax {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, v: f64) {
        self.min = Some(self.min.map_or(v, |m| m.min(v)));
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }
}

/// The P² algorithm: an O(1)-memory streaming quantile estimator that
/// tracks five markers at `p in {0, 0.25, 0.5, 0.75, 1}`.
///
/// The first five samples are buffered and sorted exactly to seed the
/// markers; after that every `add` is O(1).
#[derive(Clone, Debug)]
pub struct P2Quantiles {
    initial: Vec<f64>,
    heights: [f64; 5],
    positions: [f64; 5],
    desired: [f64; 5],
    increments: [f64; 5],
    count: u64,
    reservoir: Vec<f64>,
    reservoir_cap: usize,
}

impl Default for P2Quantiles {
    fn default() -> Self {
        Self::new()
    }
}

impl P2Quantiles {
    pub fn new() -> Self {
        P2Quantiles::with_histogram_capacity(DEFAULT_HISTOGRAM_SAMPLE_SIZE)
    }

    pub fn with_histogram_capacity(cap: usize) -> Self {
        P2Quantiles {
            initial: Vec::with_capacity(5),
            heights: [0.0; 5],
            positions: [1.0, 2.0, 3.0, 4.0, 5.0],
            desired: [1.0, 1.0, 1.0, 1.0, 1.0],
            increments: [0.0, 0.25, 0.5, 0.75, 1.0],
            count: 0,
            reservoir: Vec::with_capacity(cap),
            reservoir_cap: cap,
        }
    }

    pub fn add(&mut self, v: f64) {
        self.count += 1;
        self.push_reservoir(v);

        if self.initial.len() < 5 {
            self.initial.push(v);
            if self.initial.len() == 5 {
                self.initial.sort_by(|a, b| a.partial_cmp(b).unwrap());
                self.heights = [
                    self.initial[0],
                    self.initial[1],
                    self.initial[2],
                    self.initial[3],
                    self.initial[4],
                ];
            }
            return;
        }

        // classify into a cell and update extreme markers if needed.
        let k = if v < self.heights[0] {
            self.heights[0] = v;
            0
        } else if v < self.heights[1] {
            0
        } else if v < self.heights[2] {
            1
        } else if v < self.heights[3] {
            2
        } else if v <= self.heights[4] {
            3
        } else {
            self.heights[4] = v;
            3
        };

        for i in (k + 1)..5 {
            self.positions[i] += 1.0;
        }
        for i in 0..5 {
            self.desired[i] += self.increments[i];
        }

        for i in 1..4 {
            let d = self.desired[i] - self.positions[i];
            if (d >= 1.0 && self.positions[i + 1] - self.positions[i] > 1.0)
                || (d <= -1.0 && self.positions[i - 1] - self.positions[i] < -1.0)
            {
                let sign = if d >= 0.0 { 1.0 } else { -1.0 };
                let parabolic = self.parabolic(i, sign);
                let new_height = if self.heights[i - 1] < parabolic && parabolic < self.heights[i + 1] {
                    parabolic
                } else {
                    self.linear(i, sign)
                };
                self.heights[i] = new_height;
                self.positions[i] += sign;
            }
        }
    }

    fn parabolic(&self, i: usize, sign: f64) -> f64 {
        let (n_m, n, n_p) = (self.positions[i - 1], self.positions[i], self.positions[i + 1]);
        let (q_m, q, q_p) = (self.heights[i - 1], self.heights[i], self.heights[i + 1]);
        q + sign / (n_p - n_m)
            * ((n - n_m + sign) * (q_p - q) / (n_p - n) + (n_p - n - sign) * (q - q_m) / (n - n_m))
    }

    fn linear(&self, i: usize, sign: f64) -> f64 {
        let d = if sign > 0.0 { i + 1 } else { i - 1 };
        self.heights[i] + sign * (self.heights[d] - self.heights[i]) / (self.positions[d] - self.positions[i])
    }

    fn push_reservoir(&mut self, v: f64) {
        if self.reservoir.len() < self.reservoir_cap {
            self.reservoir.push(v);
        } else {
            // index-based replacement, not classical Vitter reservoir
            // sampling; see SPEC_FULL/DESIGN open question (b).
            let idx = (self.count as usize) % self.reservoir_cap;
            self.reservoir[idx] = v;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    fn quantile_at(&self, idx: usize) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        if (self.count as usize) < 5 {
            let mut sorted = self.initial.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let pos = ((sorted.len() - 1) as f64 * self.increments[idx]).round() as usize;
            return sorted[pos];
        }
        self.heights[idx]
    }

    pub fn min(&self) -> f64 {
        self.quantile_at(0)
    }

    pub fn q1(&self) -> f64 {
        self.quantile_at(1)
    }

    pub fn median(&self) -> f64 {
        self.quantile_at(2)
    }

    pub fn q3(&self) -> f64 {
        self.quantile_at(3)
    }

    pub fn max(&self) -> f64 {
        self.quantile_at(4)
    }

    /// A bounded histogram over the reservoir, with `bins` buckets spanning
    /// the observed min/max.
    pub fn histogram(&self, bins: usize) -> Vec<(f64, f64, usize)> {
        if self.reservoir.is_empty() || bins == 0 {
            return Vec::new();
        }
        let lo = self.reservoir.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = self.reservoir.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let width = if (hi - lo).abs() < f64::EPSILON { 1.0 } else { (hi - lo) / bins as f64 };
        let mut counts = vec![0usize; bins];
        for &v in &self.reservoir {
            let mut idx = ((v - lo) / width) as usize;
            if idx >= bins {
                idx = bins - 1;
            }
            counts[idx] += 1;
        }
        (0..bins).map(|i| (lo + width * i as f64, lo + width * (i + 1) as f64, counts[i])).collect()
    }
}

/// Composes [`MeanVariance`] + [`MinMax`] + [`P2Quantiles`] into the
/// per-quantifier distribution summary used by detailed statistics.
#[derive(Clone, Debug, Default)]
pub struct DistributionTracker {
    mean_var: MeanVariance,
    min_max: MinMax,
    quantiles: P2Quantiles,
}

impl DistributionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, v: f64) {
        self.mean_var.add(v);
        self.min_max.add(v);
        self.quantiles.add(v);
    }

    pub fn count(&self) -> u64 {
        self.mean_var.count()
    }

    pub fn mean(&self) -> f64 {
        self.mean_var.mean()
    }

    pub fn sample_stddev(&self) -> Option<f64> {
        self.mean_var.sample_stddev()
    }

    pub fn min(&self) -> Option<f64> {
        self.min_max.min()
    }

    pub fn max(&self) -> Option<f64> {
        self.min_max.max()
    }

    pub fn q1(&self) -> f64 {
        self.quantiles.q1()
    }

    pub fn median(&self) -> f64 {
        self.quantiles.median()
    }

    pub fn q3(&self) -> f64 {
        self.quantiles.q3()
    }

    /// Default bin count: `ceil(sqrt(n))`, clamped to `[1, 50]`.
    pub fn histogram(&self) -> Vec<(f64, f64, usize)> {
        let n = self.count().max(1) as f64;
        let bins = (n.sqrt().ceil() as usize).clamp(1, 50);
        self.quantiles.histogram(bins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welford_matches_naive_mean() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut mv = MeanVariance::new();
        for &x in &xs {
            mv.add(x);
        }
        let naive_mean = xs.iter().sum::<f64>() / xs.len() as f64;
        assert!((mv.mean() - naive_mean).abs() < 1e-9);

        let naive_pop_var =
            xs.iter().map(|x| (x - naive_mean).powi(2)).sum::<f64>() / xs.len() as f64;
        assert!((mv.population_variance().unwrap() - naive_pop_var).abs() < 1e-9);
    }

    #[test]
    fn min_max_tracks_extremes() {
        let mut mm = MinMax::new();
        for v in [3.0, -1.0, 10.0, 2.0] {
            mm.add(v);
        }
        assert_eq!(mm.min(), Some(-1.0));
        assert_eq!(mm.max(), Some(10.0));
    }

    #[test]
    fn p2_quantiles_approximate_uniform_median() {
        let mut q = P2Quantiles::new();
        for i in 0..2000u64 {
            q.add(i as f64);
        }
        let exact_median = 999.5;
        let rel_err = (q.median() - exact_median).abs() / exact_median;
        assert!(rel_err < 0.05, "median {} too far from {}", q.median(), exact_median);
    }

    #[test]
    fn distribution_tracker_requires_no_panics_on_empty() {
        let d = DistributionTracker::new();
        assert_eq!(d.count(), 0);
        assert!(d.sample_stddev().is_none());
        assert!(d.histogram().is_empty());
    }
}
