//! Primitive arbitraries: `Integer`, `Real`, `Boolean`,
//! `Constant`, and the character arbitraries used by `String`.

use crate::arbitrary::shrink_iter::{EmptyShrinkIterator, NumericShrinkIterator, ShrinkIterator, VecShrinkIterator};
use crate::arbitrary::{no_arbitrary, Arb, Arbitrary};
use crate::pick::{Pick, Size};
use rand::RngCore;
use std::sync::Arc;

/// `Integer(min, max)`: exact size `max - min + 1`.
#[derive(Clone, Debug)]
pub struct Integer {
    min: i64,
    max: i64,
}

impl Integer {
    pub fn new(min: i64, max: i64) -> Self {
        assert!(min <= max, "Integer requires min <= max");
        Integer { min, max }
    }
}

impl Arbitrary<i64> for Integer {
    fn size(&self) -> Size {
        Size::Exact((self.max - self.min + 1) as u128)
    }

    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<i64>> {
        use rand::Rng;
        Some(Pick::new(rng.gen_range(self.min..=self.max)))
    }

    /// `{min, 0 if in range, mid, max}`, sorted by absolute value and
    /// deduplicated.
    fn corner_cases(&self) -> Vec<Pick<i64>> {
        let mid = self.min + (self.max - self.min) / 2;
        let mut cands = vec![self.min, mid, self.max];
        if self.min <= 0 && 0 <= self.max {
            cands.push(0);
        }
        cands.sort_by_key(|v| v.unsigned_abs());
        cands.dedup();
        cands.into_iter().map(Pick::new).collect()
    }

    fn shrink(&self, pick: &Pick<i64>) -> Arb<i64> {
        let v = pick.value;
        if v > 0 {
            Arc::new(Integer::new(self.min.max(0), v - 1))
        } else if v < 0 {
            Arc::new(Integer::new(v + 1, self.max.min(0)))
        } else {
            no_arbitrary()
        }
    }

    fn shrink_iterator(&self, pick: &Pick<i64>) -> Box<dyn ShrinkIterator<i64> + Send> {
        let floor = if pick.value >= 0 { 0i128.max(self.min as i128) } else { 0i128.min(self.max as i128) };
        Box::new(I128Adapter(NumericShrinkIterator::new(floor, pick.value as i128)))
    }

    fn can_generate(&self, pick: &Pick<i64>) -> bool {
        self.min <= pick.value && pick.value <= self.max
    }

    fn is_shrunken(&self, candidate: &Pick<i64>, current: &Pick<i64>) -> bool {
        candidate.value.abs() < current.value.abs()
    }
}

struct I128Adapter(NumericShrinkIterator);
impl ShrinkIterator<i64> for I128Adapter {
    fn next(&mut self) -> Option<i64> {
        self.0.next().map(|v| v as i64)
    }
    fn accept_smaller(&mut self) {
        self.0.accept_smaller()
    }
    fn reject_smaller(&mut self) {
        self.0.reject_smaller()
    }
}

pub fn integer(min: i64, max: i64) -> Arb<i64> {
    Arc::new(Integer::new(min, max))
}

/// `Real`: double-precision, with shrinking by repeated halving toward
/// zero. Corner cases exclude `+-infinity`.
#[derive(Clone, Debug)]
pub struct Real {
    min: f64,
    max: f64,
    precision: u32,
}

impl Real {
    pub fn new(min: f64, max: f64, precision: u32) -> Self {
        assert!(min <= max, "Real requires min <= max");
        Real { min, max, precision }
    }

    fn round(&self, v: f64) -> f64 {
        let scale = 10f64.powi(self.precision as i32);
        (v * scale).round() / scale
    }
}

impl Arbitrary<f64> for Real {
    fn size(&self) -> Size {
        let span = self.max - self.min;
        let granularity = 10f64.powi(self.precision as i32);
        let n = (span * granularity).round().max(1.0) as u128;
        Size::estimated(n, n, n)
    }

    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<f64>> {
        use rand::Rng;
        let raw = rng.gen_range(self.min..=self.max);
        Some(Pick::new(self.round(raw)))
    }

    fn corner_cases(&self) -> Vec<Pick<f64>> {
        let mid = self.round((self.min + self.max) / 2.0);
        let mut cands = vec![self.min, mid, self.max];
        if self.min <= 0.0 && 0.0 <= self.max {
            cands.push(0.0);
        }
        cands.sort_by(|a, b| a.abs().partial_cmp(&b.abs()).unwrap());
        cands.dedup_by(|a, b| (*a - *b).abs() < f64::EPSILON);
        cands.into_iter().map(Pick::new).collect()
    }

    fn shrink(&self, pick: &Pick<f64>) -> Arb<f64> {
        if pick.value == 0.0 {
            return no_arbitrary();
        }
        let halved = self.round(pick.value / 2.0);
        Arc::new(Real::new(self.min.max(halved.min(0.0)), self.max.min(halved.max(0.0)), self.precision))
    }

    fn shrink_iterator(&self, pick: &Pick<f64>) -> Box<dyn ShrinkIterator<f64> + Send> {
        if pick.value == 0.0 {
            return Box::new(EmptyShrinkIterator::new());
        }
        let mut candidates = Vec::new();
        let mut v = pick.value;
        for _ in 0..64 {
            v = self.round(v / 2.0);
            if v == 0.0 {
                candidates.push(0.0);
                break;
            }
            candidates.push(v);
        }
        Box::new(VecShrinkIterator::new(candidates))
    }

    fn can_generate(&self, pick: &Pick<f64>) -> bool {
        self.min <= pick.value && pick.value <= self.max
    }

    fn is_shrunken(&self, candidate: &Pick<f64>, current: &Pick<f64>) -> bool {
        candidate.value.abs() < current.value.abs()
    }
}

pub fn real(min: f64, max: f64, precision: u32) -> Arb<f64> {
    Arc::new(Real::new(min, max, precision))
}

/// `Boolean`: exact size 2, shrinks `true -> false`.
#[derive(Clone, Debug, Default)]
pub struct Boolean;

impl Arbitrary<bool> for Boolean {
    fn size(&self) -> Size {
        Size::Exact(2)
    }
    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<bool>> {
        use rand::Rng;
        Some(Pick::new(rng.gen_bool(0.5)))
    }
    fn corner_cases(&self) -> Vec<Pick<bool>> {
        vec![Pick::new(false), Pick::new(true)]
    }
    fn shrink(&self, pick: &Pick<bool>) -> Arb<bool> {
        if pick.value {
            Arc::new(Constant::new(false))
        } else {
            no_arbitrary()
        }
    }
    fn shrink_iterator(&self, pick: &Pick<bool>) -> Box<dyn ShrinkIterator<bool> + Send> {
        if pick.value {
            Box::new(VecShrinkIterator::new(vec![false]))
        } else {
            Box::new(EmptyShrinkIterator::new())
        }
    }
    fn can_generate(&self, _pick: &Pick<bool>) -> bool {
        true
    }
    fn is_shrunken(&self, candidate: &Pick<bool>, current: &Pick<bool>) -> bool {
        !candidate.value && current.value
    }
}

pub fn boolean() -> Arb<bool> {
    Arc::new(Boolean)
}

/// `Constant(c)`: exact size 1, never shrinks.
#[derive(Clone, Debug)]
pub struct Constant<A>(A);

impl<A> Constant<A> {
    pub fn new(value: A) -> Self {
        Constant(value)
    }
}

impl<A: Clone + PartialEq + Send + Sync + 'static> Arbitrary<A> for Constant<A> {
    fn size(&self) -> Size {
        Size::Exact(1)
    }
    fn pick(&self, _rng: &mut dyn RngCore) -> Option<Pick<A>> {
        Some(Pick::new(self.0.clone()))
    }
    fn corner_cases(&self) -> Vec<Pick<A>> {
        vec![Pick::new(self.0.clone())]
    }
    fn shrink(&self, _pick: &Pick<A>) -> Arb<A> {
        no_arbitrary()
    }
    fn shrink_iterator(&self, _pick: &Pick<A>) -> Box<dyn ShrinkIterator<A> + Send> {
        Box::new(EmptyShrinkIterator::new())
    }
    fn can_generate(&self, pick: &Pick<A>) -> bool {
        pick.value == self.0
    }
    fn is_shrunken(&self, _candidate: &Pick<A>, _current: &Pick<A>) -> bool {
        false
    }
}

pub fn constant<A: Clone + PartialEq + Send + Sync + 'static>(value: A) -> Arb<A> {
    Arc::new(Constant::new(value))
}

/// Printable ASCII char arbitrary: `[0x20, 0x7e]`.
pub fn printable_ascii_char() -> Arb<char> {
    Arc::new(CharRange { lo: 0x20, hi: 0x7e })
}

/// Hex-digit char arbitrary: `[0-9a-f]`.
pub fn hex_char() -> Arb<char> {
    crate::arbitrary::containers::weighted(vec![
        WeightedCharSet::digits(),
        WeightedCharSet::hex_lower(),
    ])
}

struct WeightedCharSet;
impl WeightedCharSet {
    fn digits() -> crate::arbitrary::containers::WeightedEntry<char> {
        crate::arbitrary::containers::WeightedEntry::new(10.0, Arc::new(CharRange { lo: b'0' as u32, hi: b'9' as u32 }))
    }
    fn hex_lower() -> crate::arbitrary::containers::WeightedEntry<char> {
        crate::arbitrary::containers::WeightedEntry::new(6.0, Arc::new(CharRange { lo: b'a' as u32, hi: b'f' as u32 }))
    }
}

/// A contiguous Unicode scalar range, backing printable-ASCII, hex, and
/// custom unicode char arbitraries.
#[derive(Clone, Debug)]
pub struct CharRange {
    lo: u32,
    hi: u32,
}

impl CharRange {
    pub fn new(lo: u32, hi: u32) -> Self {
        assert!(lo <= hi);
        CharRange { lo, hi }
    }
}

impl Arbitrary<char> for CharRange {
    fn size(&self) -> Size {
        Size::Exact((self.hi - self.lo + 1) as u128)
    }
    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<char>> {
        use rand::Rng;
        let cp = rng.gen_range(self.lo..=self.hi);
        char::from_u32(cp).map(Pick::new)
    }
    fn corner_cases(&self) -> Vec<Pick<char>> {
        [self.lo, self.lo + (self.hi - self.lo) / 2, self.hi]
            .into_iter()
            .filter_map(|cp: &u32| char::from_u32(*cp))
            .map(Pick::new)
            .collect()
    }
    fn shrink(&self, pick: &Pick<char>) -> Arb<char> {
        if (pick.value as u32) == self.lo {
            no_arbitrary()
        } else {
            Arc::new(CharRange { lo: self.lo, hi: pick.value as u32 - 1 })
        }
    }
    fn shrink_iterator(&self, pick: &Pick<char>) -> Box<dyn ShrinkIterator<char> + Send> {
        if (pick.value as u32) == self.lo {
            Box::new(EmptyShrinkIterator::new())
        } else {
            Box::new(VecShrinkIterator::new(vec![char::from_u32(self.lo).unwrap_or(' ')]))
        }
    }
    fn can_generate(&self, pick: &Pick<char>) -> bool {
        let cp = pick.value as u32;
        self.lo <= cp && cp <= self.hi
    }
    fn is_shrunken(&self, candidate: &Pick<char>, current: &Pick<char>) -> bool {
        (candidate.value as u32) < (current.value as u32)
    }
}

/// Supplies a default, bounded arbitrary for a primitive type from its
/// Rust type alone -- the hook `prop_engine_macros::property` uses to turn
/// an untyped `fn(a: i64, b: bool) -> bool` argument list into a scenario
/// without the caller naming a combinator. Ranges are bounded rather than
/// spanning the full type range since `Integer`/`Real`'s size accounting is
/// exact and a full `i64` range would overflow it.
pub trait DefaultArbitrary: Clone + PartialEq + Send + Sync + Sized + 'static {
    fn default_arbitrary() -> Arb<Self>;
}

impl DefaultArbitrary for i64 {
    fn default_arbitrary() -> Arb<Self> {
        integer(-1_000_000, 1_000_000)
    }
}

impl DefaultArbitrary for bool {
    fn default_arbitrary() -> Arb<Self> {
        boolean()
    }
}

impl DefaultArbitrary for f64 {
    fn default_arbitrary() -> Arb<Self> {
        real(-1_000_000.0, 1_000_000.0, 6)
    }
}

impl DefaultArbitrary for char {
    fn default_arbitrary() -> Arb<Self> {
        printable_ascii_char()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrary::ArbitraryExt;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn integer_samples_are_in_range() {
        let a = integer(-10, 10);
        for p in a.sample(200, &mut rng()) {
            assert!((-10..=10).contains(&p.value));
        }
    }

    #[test]
    fn integer_corner_cases_include_bounds_and_zero() {
        let a = integer(-5, 5);
        let corners: Vec<i64> = a.corner_cases().into_iter().map(|p| p.value).collect();
        assert!(corners.contains(&-5));
        assert!(corners.contains(&5));
        assert!(corners.contains(&0));
    }

    #[test]
    fn integer_shrink_terminates() {
        let a = integer(-100, 100);
        let mut pick = Pick::new(77i64);
        let mut steps = 0;
        loop {
            let shrunk = a.shrink(&pick);
            if shrunk.size().is_zero() {
                break;
            }
            let next = shrunk.pick(&mut rng()).unwrap();
            pick = next;
            steps += 1;
            assert!(steps < 100);
        }
    }

    #[test]
    fn boolean_shrinks_true_to_false_only() {
        let b = boolean();
        let shrunk: Vec<bool> = {
            let mut it = b.shrink_iterator(&Pick::new(true));
            let mut out = Vec::new();
            while let Some(v) = it.next() {
                out.push(v);
            }
            out
        };
        assert_eq!(shrunk, vec![false]);
    }
}
