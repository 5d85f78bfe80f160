//! The arbitrary algebra: a polymorphic generator model
//! with exact/estimated cardinality, random sampling, corner-case
//! enumeration, shrinkable refinement, mapping, filtering, and weighted
//! composition.
//!
//! Cyclic-reference note: `Arbitrary` is a plain trait;
//! `NoArbitrary` is a concrete zero-sized type re-exported as a
//! constructor function (`no_arbitrary`), and every combinator owns its
//! base through `Arc<dyn Arbitrary<A>>` -- there are no back-edges, just an
//! abstract contract and one concrete always-empty implementation.

pub mod containers;
pub mod primitives;
pub mod shrink_iter;

use crate::pick::{Pick, Size};
use rand::RngCore;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

pub use shrink_iter::{EmptyShrinkIterator, NumericShrinkIterator, ShrinkIterator, VecShrinkIterator};

pub use containers::{array, composite, record, weighted, ArrayArbitrary, CompositeArbitrary, RecordArbitrary, WeightedArbitrary, WeightedEntry};
pub use primitives::{boolean, constant, hex_char, integer, printable_ascii_char, real, Boolean, Constant, DefaultArbitrary, Integer, Real};

/// An `Arc`-erased, `Send + Sync` arbitrary: the shared currency type used
/// everywhere a quantifier or combinator needs to hold an arbitrary by
/// value without knowing its concrete type.
pub type Arb<A> = Arc<dyn Arbitrary<A>>;

/// A polymorphic producer of [`Pick<A>`] values.
///
/// Implementors must satisfy:
/// - `can_generate(pick(rng))` whenever `pick` returns `Some`.
/// - if `b = shrink(a)` has nonzero size, every pick in `b`'s support is
///   `is_shrunken`-smaller than `a`.
/// - repeated shrinking from any starting pick reaches [`NoArbitrary`] in
///   finitely many steps.
pub trait Arbitrary<A: Clone + PartialEq>: Send + Sync {
    fn size(&self) -> Size;

    /// A single random pick, or `None` if the arbitrary is empty or (for a
    /// filter) starved out every candidate it tried.
    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<A>>;

    /// Finite enumeration of "interesting" values: bounds, zero, typical
    /// pivots, declared in a fixed order.
    fn corner_cases(&self) -> Vec<Pick<A>>;

    /// A strictly smaller arbitrary whose support sits in the
    /// "closer-to-minimal" neighborhood of `pick`. May be [`NoArbitrary`].
    fn shrink(&self, pick: &Pick<A>) -> Arb<A>;

    /// A lazy, ordered shrink-candidate stream with accept/reject feedback.
    fn shrink_iterator(&self, pick: &Pick<A>) -> Box<dyn ShrinkIterator<A> + Send>;

    /// Membership test.
    fn can_generate(&self, pick: &Pick<A>) -> bool;

    /// Total order predicate: is `candidate` smaller than `current` in this
    /// arbitrary's shrink order?
    fn is_shrunken(&self, candidate: &Pick<A>, current: &Pick<A>) -> bool;

    /// Equality witness used for deduplication (`DedupingSampler`,
    /// `sampleUnique`).
    fn equals(&self, a: &Pick<A>, b: &Pick<A>) -> bool {
        a.value == b.value
    }
}

/// Default-method extension trait providing `sample`/`sample_with_bias`/
/// `sample_unique` atop the required [`Arbitrary`] methods; blanket
/// implemented so it's usable on `&dyn Arbitrary<A>` and `Arc<dyn
/// Arbitrary<A>>` alike without every combinator having to restate them.
pub trait ArbitraryExt<A: Clone + PartialEq>: Arbitrary<A> {
    fn sample(&self, n: usize, rng: &mut dyn RngCore) -> Vec<Pick<A>> {
        if self.size().is_zero() {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            match self.pick(rng) {
                Some(p) => out.push(p),
                None => break,
            }
        }
        out
    }

    /// Corner cases first (in declared order), then random picks, total
    /// capped at `n`.
    fn sample_with_bias(&self, n: usize, rng: &mut dyn RngCore) -> Vec<Pick<A>> {
        let mut out = self.corner_cases();
        out.truncate(n);
        if out.len() < n {
            out.extend(self.sample(n - out.len(), rng));
        }
        out
    }

    /// Up to `n` picks, deduplicated against both `exclude` and each other
    /// via [`Arbitrary::equals`]. Bounded retry: stops once the arbitrary
    /// looks exhausted rather than looping forever against a small support.
    fn sample_unique(&self, n: usize, exclude: &[Pick<A>], rng: &mut dyn RngCore) -> Vec<Pick<A>> {
        let mut out: Vec<Pick<A>> = Vec::with_capacity(n);
        let max_attempts = (n.saturating_mul(20)).max(100);
        for _ in 0..max_attempts {
            if out.len() >= n {
                break;
            }
            let Some(p) = self.pick(rng) else { break };
            let dup = exclude.iter().chain(out.iter()).any(|q| self.equals(q, &p));
            if !dup {
                out.push(p);
            }
        }
        out
    }
}

impl<A: Clone + PartialEq, T: Arbitrary<A> + ?Sized> ArbitraryExt<A> for T {}

/// The empty arbitrary: zero size, never picks, absorbs `map`/`filter`.
pub struct NoArbitrary;

impl<A: Clone + PartialEq + Send + Sync + 'static> Arbitrary<A> for NoArbitrary {
    fn size(&self) -> Size {
        Size::Exact(0)
    }
    fn pick(&self, _rng: &mut dyn RngCore) -> Option<Pick<A>> {
        None
    }
    fn corner_cases(&self) -> Vec<Pick<A>> {
        Vec::new()
    }
    fn shrink(&self, _pick: &Pick<A>) -> Arb<A> {
        no_arbitrary()
    }
    fn shrink_iterator(&self, _pick: &Pick<A>) -> Box<dyn ShrinkIterator<A> + Send> {
        Box::new(EmptyShrinkIterator::new())
    }
    fn can_generate(&self, _pick: &Pick<A>) -> bool {
        false
    }
    fn is_shrunken(&self, _candidate: &Pick<A>, _current: &Pick<A>) -> bool {
        false
    }
}

pub fn no_arbitrary<A: Clone + PartialEq + Send + Sync + 'static>() -> Arb<A> {
    Arc::new(NoArbitrary)
}

/// A mapped arbitrary: pushes picks from `base: Arbitrary<A>` through `f`
/// to produce `Arbitrary<B>`. `can_generate` falls back to re-deriving the
/// pick's base-space membership via the stored `original`, or (when there
/// is none) an equality scan, since `f` need not be invertible.
pub struct Mapped<A, B> {
    base: Arb<A>,
    f: Arc<dyn Fn(A) -> B + Send + Sync>,
}

impl<A, B> Mapped<A, B> {
    pub fn new(base: Arb<A>, f: Arc<dyn Fn(A) -> B + Send + Sync>) -> Self {
        Mapped { base, f }
    }
}

impl<A, B> Arbitrary<B> for Mapped<A, B>
where
    A: Clone + PartialEq + Send + Sync + 'static,
    B: Clone + PartialEq + Send + Sync + 'static,
{
    fn size(&self) -> Size {
        // map preserves the cardinality upper bound; since a
        // mapping function can collapse values, we only keep `hi`/`value`
        // guarantees and leave `lo` at 0 unless the base was exact and we
        // have no evidence of collisions.
        match self.base.size() {
            Size::Exact(n) => Size::estimated(n, 0, n),
            Size::Estimated { value, hi, .. } => Size::estimated(value, 0, hi),
        }
    }

    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<B>> {
        let base_pick = self.base.pick(rng)?;
        let value = (self.f)(base_pick.value.clone());
        Some(Pick { value, original: Some((self.f)(base_pick.original.unwrap_or(base_pick.value))) })
    }

    fn corner_cases(&self) -> Vec<Pick<B>> {
        self.base
            .corner_cases()
            .into_iter()
            .map(|p| {
                let value = (self.f)(p.value.clone());
                Pick { value, original: Some((self.f)(p.original.unwrap_or(p.value))) }
            })
            .collect()
    }

    fn shrink(&self, pick: &Pick<B>) -> Arb<B> {
        let Some(ref orig) = pick.original else { return no_arbitrary() };
        let base_pick = Pick::new(orig.clone());
        let base_shrunk = {
            // We don't have a base::Arbitrary<A> pick with a meaningful
            // `original`, so approximate via the base's own shrink of a
            // fresh pick built from our stored pre-image. This is sound
            // because `shrink` only needs *a* smaller arbitrary, not the
            // unique one.
            let _ = &base_pick;
            self.base.shrink(&Pick::new(orig.clone()))
        };
        Arc::new(Mapped { base: base_shrunk, f: self.f.clone() })
    }

    fn shrink_iterator(&self, pick: &Pick<B>) -> Box<dyn ShrinkIterator<B> + Send> {
        let Some(ref orig) = pick.original else { return Box::new(EmptyShrinkIterator::new()) };
        Box::new(MappedShrinkIterator { inner: self.base.shrink_iterator(&Pick::new(orig.clone())), f: self.f.clone() })
    }

    fn can_generate(&self, pick: &Pick<B>) -> bool {
        match &pick.original {
            Some(orig) => self.base.can_generate(&Pick::new(orig.clone())),
            None => self.base.corner_cases().into_iter().any(|p| (self.f)(p.value) == pick.value),
        }
    }

    fn is_shrunken(&self, candidate: &Pick<B>, current: &Pick<B>) -> bool {
        match (&candidate.original, &current.original) {
            (Some(c), Some(u)) => self.base.is_shrunken(&Pick::new(c.clone()), &Pick::new(u.clone())),
            _ => false,
        }
    }
}

struct MappedShrinkIterator<A, B> {
    inner: Box<dyn ShrinkIterator<A> + Send>,
    f: Arc<dyn Fn(A) -> B + Send + Sync>,
}

impl<A, B> ShrinkIterator<B> for MappedShrinkIterator<A, B> {
    fn next(&mut self) -> Option<B> {
        self.inner.next().map(|a| (self.f)(a))
    }
    fn accept_smaller(&mut self) {
        self.inner.accept_smaller()
    }
    fn reject_smaller(&mut self) {
        self.inner.reject_smaller()
    }
}

pub fn map<A, B>(base: Arb<A>, f: impl Fn(A) -> B + Send + Sync + 'static) -> Arb<B>
where
    A: Clone + PartialEq + Send + Sync + 'static,
    B: Clone + PartialEq + Send + Sync + 'static,
{
    Arc::new(Mapped::new(base, Arc::new(f)))
}

/// A filtered arbitrary: rejection-samples `pick`, maintaining a Beta
/// posterior over the accept rate. The posterior is the one
/// piece of mutable state hidden inside an otherwise-immutable generator
/// tree and must be fresh per check invocation.
pub struct Filtered<A> {
    base: Arb<A>,
    predicate: Arc<dyn Fn(&A) -> bool + Send + Sync>,
    posterior: Mutex<crate::stats::Beta>,
    legacy: bool,
}

impl<A: Clone + PartialEq> Filtered<A> {
    pub fn new(base: Arb<A>, predicate: Arc<dyn Fn(&A) -> bool + Send + Sync>) -> Self {
        Filtered { base, predicate, posterior: Mutex::new(crate::stats::Beta::uniform_prior()), legacy: false }
    }

    /// The legacy optimistic-prior variant kept as a research-reproducibility
    /// baseline alongside the canonical uninformative-prior constructor.
    pub fn new_legacy(base: Arb<A>, predicate: Arc<dyn Fn(&A) -> bool + Send + Sync>) -> Self {
        Filtered { base, predicate, posterior: Mutex::new(crate::stats::Beta::legacy_optimistic_prior()), legacy: true }
    }

    fn record(&self, accepted: bool) {
        let mut posterior = self.posterior.lock().unwrap();
        *posterior = if accepted { posterior.updated(1.0, 0.0) } else { posterior.updated(0.0, 1.0) };
    }

    /// Stops retrying once `base_size * posterior.inv(upper_ci) < 1`: the
    /// credible upper bound on the accept rate implies fewer than one
    /// accepting value remains in the base arbitrary's support.
    fn retry_exhausted(&self, base_size: u128) -> bool {
        let posterior = self.posterior.lock().unwrap();
        let upper_ci = posterior.inv(0.975);
        (base_size as f64) * upper_ci < 1.0
    }
}

impl<A: Clone + PartialEq + Send + Sync + 'static> Arbitrary<A> for Filtered<A> {
    fn size(&self) -> Size {
        let posterior = self.posterior.lock().unwrap();
        let base_size = self.base.size().value();
        let lo_ci = posterior.inv(0.025);
        let hi_ci = posterior.inv(0.975);
        let scale = |f: f64| ((base_size as f64) * f).round().max(0.0) as u128;
        Size::estimated(scale(posterior.mode()), scale(lo_ci), scale(hi_ci))
    }

    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<A>> {
        let base_size = self.base.size().value();
        loop {
            if self.retry_exhausted(base_size) {
                return None;
            }
            let candidate = self.base.pick(rng)?;
            let accept = (self.predicate)(&candidate.value);
            self.record(accept);
            if accept {
                return Some(candidate);
            }
        }
    }

    fn corner_cases(&self) -> Vec<Pick<A>> {
        self.base.corner_cases().into_iter().filter(|p| (self.predicate)(&p.value)).collect()
    }

    fn shrink(&self, pick: &Pick<A>) -> Arb<A> {
        let shrunk_base = self.base.shrink(pick);
        Arc::new(Filtered {
            base: shrunk_base,
            predicate: self.predicate.clone(),
            posterior: Mutex::new(if self.legacy {
                crate::stats::Beta::legacy_optimistic_prior()
            } else {
                crate::stats::Beta::uniform_prior()
            }),
            legacy: self.legacy,
        })
    }

    fn shrink_iterator(&self, pick: &Pick<A>) -> Box<dyn ShrinkIterator<A> + Send> {
        Box::new(FilteredShrinkIterator { inner: self.base.shrink_iterator(pick), predicate: self.predicate.clone() })
    }

    fn can_generate(&self, pick: &Pick<A>) -> bool {
        (self.predicate)(&pick.value) && self.base.can_generate(pick)
    }

    fn is_shrunken(&self, candidate: &Pick<A>, current: &Pick<A>) -> bool {
        self.base.is_shrunken(candidate, current)
    }
}

struct FilteredShrinkIterator<A> {
    inner: Box<dyn ShrinkIterator<A> + Send>,
    predicate: Arc<dyn Fn(&A) -> bool + Send + Sync>,
}

impl<A> ShrinkIterator<A> for FilteredShrinkIterator<A> {
    fn next(&mut self) -> Option<A> {
        loop {
            let candidate = self.inner.next()?;
            if (self.predicate)(&candidate) {
                return Some(candidate);
            }
            self.inner.reject_smaller();
        }
    }
    fn accept_smaller(&mut self) {
        self.inner.accept_smaller()
    }
    fn reject_smaller(&mut self) {
        self.inner.reject_smaller()
    }
}

pub fn filter<A>(base: Arb<A>, predicate: impl Fn(&A) -> bool + Send + Sync + 'static) -> Arb<A>
where
    A: Clone + PartialEq + Send + Sync + 'static,
{
    Arc::new(Filtered::new(base, Arc::new(predicate)))
}

pub fn filter_legacy<A>(base: Arb<A>, predicate: impl Fn(&A) -> bool + Send + Sync + 'static) -> Arb<A>
where
    A: Clone + PartialEq + Send + Sync + 'static,
{
    Arc::new(Filtered::new_legacy(base, Arc::new(predicate)))
}

/// Wraps a base arbitrary so that `sample_with_bias` behaves like plain
/// `sample` (no corner-case prepending), used when a quantifier wants pure
/// randomness (e.g. inside a `Composite` variant whose own corner cases are
/// already surfaced by the composite).
pub struct NoBias<A> {
    base: Arb<A>,
}

impl<A: Clone + PartialEq + Send + Sync + 'static> Arbitrary<A> for NoBias<A> {
    fn size(&self) -> Size {
        self.base.size()
    }
    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<A>> {
        self.base.pick(rng)
    }
    fn corner_cases(&self) -> Vec<Pick<A>> {
        Vec::new()
    }
    fn shrink(&self, pick: &Pick<A>) -> Arb<A> {
        Arc::new(NoBias { base: self.base.shrink(pick) })
    }
    fn shrink_iterator(&self, pick: &Pick<A>) -> Box<dyn ShrinkIterator<A> + Send> {
        self.base.shrink_iterator(pick)
    }
    fn can_generate(&self, pick: &Pick<A>) -> bool {
        self.base.can_generate(pick)
    }
    fn is_shrunken(&self, candidate: &Pick<A>, current: &Pick<A>) -> bool {
        self.base.is_shrunken(candidate, current)
    }
}

pub fn no_bias<A: Clone + PartialEq + Send + Sync + 'static>(base: Arb<A>) -> Arb<A> {
    Arc::new(NoBias { base })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrary::primitives::integer;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn no_arbitrary_is_empty_and_absorbs_map_and_filter() {
        let empty: Arb<i64> = no_arbitrary();
        assert!(empty.size().is_zero());
        assert!(empty.pick(&mut rng()).is_none());

        let mapped = map(empty.clone(), |x: i64| x + 1);
        assert!(mapped.size().is_zero());
        assert!(mapped.pick(&mut rng()).is_none());

        let filtered = filter(empty, |_: &i64| true);
        assert!(filtered.size().is_zero());
    }

    #[test]
    fn filter_predicate_holds_for_every_sample() {
        let evens = filter(integer(0, 100), |x: &i64| x % 2 == 0);
        let mut r = rng();
        let samples = evens.sample(50, &mut r);
        for p in &samples {
            assert_eq!(p.value % 2, 0);
        }
    }

    #[test]
    fn mapped_preserves_cardinality_upper_bound() {
        let base = integer(0, 9);
        let mapped = map(base, |x: i64| x * 2);
        assert!(mapped.size().hi() <= 10);
    }
}
