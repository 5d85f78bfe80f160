//! Samplers: a decorator stack producing `Pick`s from an
//! arbitrary. All share one seeded RNG; mutation (filter posteriors,
//! caches) is confined to the decorator, never the underlying arbitrary's
//! pure sampling behavior.

use crate::arbitrary::{Arb, ArbitraryExt};
use crate::pick::Pick;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A shared, seeded RNG handle. Every sampler in a check run is built
/// around the same one, so `seed` fully determines the draw sequence.
#[derive(Clone)]
pub struct SeededRng(Rc<RefCell<SmallRng>>);

impl SeededRng {
    pub fn from_seed(seed: u64) -> Self {
        SeededRng(Rc::new(RefCell::new(SmallRng::seed_from_u64(seed))))
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SmallRng) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

/// Delegates straight to `arb.sample`/`sample_with_bias`/`sample_unique`
/// using the shared seeded RNG.
pub struct RandomSampler {
    rng: SeededRng,
}

impl RandomSampler {
    pub fn new(rng: SeededRng) -> Self {
        RandomSampler { rng }
    }

    pub fn sample<A: Clone + PartialEq>(&self, arb: &Arb<A>, n: usize) -> Vec<Pick<A>> {
        self.rng.with(|rng| arb.sample(n, rng))
    }

    pub fn sample_with_bias<A: Clone + PartialEq>(&self, arb: &Arb<A>, n: usize) -> Vec<Pick<A>> {
        self.rng.with(|rng| arb.sample_with_bias(n, rng))
    }

    pub fn sample_unique<A: Clone + PartialEq>(&self, arb: &Arb<A>, n: usize, exclude: &[Pick<A>]) -> Vec<Pick<A>> {
        self.rng.with(|rng| arb.sample_unique(n, exclude, rng))
    }
}

/// Forces corner-case prepending regardless of what the underlying
/// sampling call would otherwise do -- a thin wrapper so the explorer can
/// ask for "biased" sampling without caring whether the inner sampler is
/// random, cached, or deduping.
pub struct BiasedSampler {
    inner: RandomSampler,
}

impl BiasedSampler {
    pub fn new(rng: SeededRng) -> Self {
        BiasedSampler { inner: RandomSampler::new(rng) }
    }

    pub fn sample<A: Clone + PartialEq>(&self, arb: &Arb<A>, n: usize) -> Vec<Pick<A>> {
        self.inner.sample_with_bias(arb, n)
    }
}

/// Memoizes per-arbitrary samples keyed by the arbitrary's allocation
/// address. A cache hit at equal-or-larger cached size returns a prefix of
/// the stored picks instead of resampling; a hit at a smaller size grows
/// the cache with a fresh draw and replaces the entry.
pub struct CachedSampler {
    inner: RandomSampler,
    cache: RefCell<HashMap<usize, Box<dyn Any>>>,
}

impl CachedSampler {
    pub fn new(rng: SeededRng) -> Self {
        CachedSampler { inner: RandomSampler::new(rng), cache: RefCell::new(HashMap::new()) }
    }

    pub fn sample<A: Clone + PartialEq + 'static>(&self, arb: &Arb<A>, n: usize) -> Vec<Pick<A>> {
        let key = std::sync::Arc::as_ptr(arb) as *const () as usize;
        {
            let cache = self.cache.borrow();
            if let Some(entry) = cache.get(&key) {
                if let Some(picks) = entry.downcast_ref::<Vec<Pick<A>>>() {
                    if picks.len() >= n {
                        return picks[..n].to_vec();
                    }
                }
            }
        }
        let fresh = self.inner.sample(arb, n);
        self.cache.borrow_mut().insert(key, Box::new(fresh.clone()));
        fresh
    }
}

/// Uses the arbitrary's own equality function to filter duplicates out of
/// whatever the inner sampler produces.
pub struct DedupingSampler {
    inner: RandomSampler,
}

impl DedupingSampler {
    pub fn new(rng: SeededRng) -> Self {
        DedupingSampler { inner: RandomSampler::new(rng) }
    }

    pub fn sample<A: Clone + PartialEq>(&self, arb: &Arb<A>, n: usize) -> Vec<Pick<A>> {
        self.inner.sample_unique(arb, n, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrary::primitives::integer;

    #[test]
    fn random_sampler_is_deterministic_for_fixed_seed() {
        let a = integer(0, 1000);
        let s1 = RandomSampler::new(SeededRng::from_seed(99));
        let s2 = RandomSampler::new(SeededRng::from_seed(99));
        let p1: Vec<i64> = s1.sample(&a, 20).into_iter().map(|p| p.value).collect();
        let p2: Vec<i64> = s2.sample(&a, 20).into_iter().map(|p| p.value).collect();
        assert_eq!(p1, p2);
    }

    #[test]
    fn biased_sampler_includes_corner_cases() {
        let a = integer(-10, 10);
        let corners = a.corner_cases().len();
        let sampler = BiasedSampler::new(SeededRng::from_seed(5));
        let picks = sampler.sample(&a, corners + 5);
        for corner in a.corner_cases() {
            assert!(picks.iter().any(|p| p.value == corner.value));
        }
    }

    #[test]
    fn deduping_sampler_has_no_repeats() {
        let a = integer(0, 5);
        let sampler = DedupingSampler::new(SeededRng::from_seed(1));
        let picks = sampler.sample(&a, 6);
        let mut values: Vec<i64> = picks.iter().map(|p| p.value).collect();
        let before = values.len();
        values.sort();
        values.dedup();
        assert_eq!(values.len(), before);
    }

    #[test]
    fn cached_sampler_returns_prefix_on_growth_hit() {
        let a = integer(0, 1000);
        let sampler = CachedSampler::new(SeededRng::from_seed(7));
        let first = sampler.sample(&a, 5);
        let second = sampler.sample(&a, 3);
        assert_eq!(&second[..], &first[..3]);
    }
}
