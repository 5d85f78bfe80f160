//! Structural and combinator arbitraries: `String`,
//! `Array`, `Record`, `Composite`, and `Weighted`.

use crate::arbitrary::shrink_iter::{EmptyShrinkIterator, ShrinkIterator, VecShrinkIterator};
use crate::arbitrary::{map, no_arbitrary, Arb, Arbitrary, ArbitraryExt};
use crate::pick::{Pick, Size};
use rand::RngCore;
use std::collections::BTreeMap;
use std::sync::Arc;

/// `Array(elem, min, max)`: variable-length sequences. Shrink policy:
/// shorten first, then shrink elements in place (length-shrinks toward
/// `min`, then per-element shrinks).
pub struct ArrayArbitrary<A> {
    elem: Arb<A>,
    min: usize,
    max: usize,
}

impl<A: Clone + PartialEq + Send + Sync + 'static> ArrayArbitrary<A> {
    pub fn new(elem: Arb<A>, min: usize, max: usize) -> Self {
        assert!(min <= max, "Array requires min <= max");
        ArrayArbitrary { elem, min, max }
    }
}

impl<A: Clone + PartialEq + Send + Sync + 'static> Arbitrary<Vec<A>> for ArrayArbitrary<A> {
    fn size(&self) -> Size {
        let elem_hi = self.elem.size().hi();
        // sum_{len=min}^{max} elem_hi^len saturates fast; treat as estimated
        // once the element type isn't itself trivially sized, exact only
        // when elem_hi <= 1 (e.g. Constant elements).
        if elem_hi <= 1 {
            Size::Exact((self.max - self.min + 1) as u128)
        } else {
            let hi = elem_hi.saturating_pow(self.max as u32).min(u128::MAX / 2);
            Size::estimated(hi, (self.max - self.min + 1) as u128, hi)
        }
    }

    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<Vec<A>>> {
        use rand::Rng;
        let len = rng.gen_range(self.min..=self.max);
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(self.elem.pick(rng)?.value);
        }
        Some(Pick::new(values))
    }

    /// Empty array (if allowed) and the minimum-length array.
    fn corner_cases(&self) -> Vec<Pick<Vec<A>>> {
        let mut out = Vec::new();
        if self.min == 0 {
            out.push(Pick::new(Vec::new()));
        }
        if self.min > 0 {
            if let Some(first) = self.elem.corner_cases().into_iter().next() {
                out.push(Pick::new(vec![first.value; self.min]));
            }
        }
        out
    }

    fn shrink(&self, pick: &Pick<Vec<A>>) -> Arb<Vec<A>> {
        if pick.value.is_empty() {
            return no_arbitrary();
        }
        let candidates = shrink_candidates(&pick.value, &self.elem, self.min);
        Arc::new(FixedCandidates::new(candidates))
    }

    fn shrink_iterator(&self, pick: &Pick<Vec<A>>) -> Box<dyn ShrinkIterator<Vec<A>> + Send> {
        if pick.value.is_empty() {
            return Box::new(EmptyShrinkIterator::new());
        }
        Box::new(VecShrinkIterator::new(shrink_candidates(&pick.value, &self.elem, self.min)))
    }

    fn can_generate(&self, pick: &Pick<Vec<A>>) -> bool {
        self.min <= pick.value.len() && pick.value.len() <= self.max
    }

    fn is_shrunken(&self, candidate: &Pick<Vec<A>>, current: &Pick<Vec<A>>) -> bool {
        candidate.value.len() < current.value.len()
    }
}

/// Length-shortening candidates followed by per-element shrink candidates:
/// the same two-phase shrink a variable-length sequence always wants,
/// shared by `ArrayArbitrary` and `string`.
fn shrink_candidates<A: Clone + PartialEq + Send + Sync + 'static>(
    xs: &[A],
    elem: &Arb<A>,
    min_len: usize,
) -> Vec<Vec<A>> {
    let mut out: Vec<Vec<A>> = Vec::new();
    if xs.len() > min_len {
        out.push(xs[..min_len].to_vec());
    }
    let mut k = xs.len() / 2;
    while k > 0 && xs.len().saturating_sub(k) >= min_len {
        for window_start in 0..=(xs.len() - k) {
            let mut shorter = xs[..window_start].to_vec();
            shorter.extend_from_slice(&xs[window_start + k..]);
            out.push(shorter);
        }
        k /= 2;
    }
    for (i, x) in xs.iter().enumerate() {
        let pick = Pick::new(x.clone());
        let mut it = elem.shrink_iterator(&pick);
        while let Some(sx) = it.next() {
            let mut changed = xs.to_vec();
            changed[i] = sx;
            out.push(changed);
        }
    }
    out
}

/// A fixed list of precomputed candidates, wrapped up as an `Arbitrary` so
/// `shrink()` can return something concrete without re-deriving structure.
struct FixedCandidates<A> {
    candidates: Vec<A>,
}

impl<A> FixedCandidates<A> {
    fn new(candidates: Vec<A>) -> Self {
        FixedCandidates { candidates }
    }
}

impl<A: Clone + PartialEq + Send + Sync + 'static> Arbitrary<A> for FixedCandidates<A> {
    fn size(&self) -> Size {
        Size::Exact(self.candidates.len() as u128)
    }
    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<A>> {
        use rand::Rng;
        if self.candidates.is_empty() {
            None
        } else {
            let idx = rng.gen_range(0..self.candidates.len());
            Some(Pick::new(self.candidates[idx].clone()))
        }
    }
    fn corner_cases(&self) -> Vec<Pick<A>> {
        self.candidates.iter().cloned().map(Pick::new).collect()
    }
    fn shrink(&self, _pick: &Pick<A>) -> Arb<A> {
        no_arbitrary()
    }
    fn shrink_iterator(&self, _pick: &Pick<A>) -> Box<dyn ShrinkIterator<A> + Send> {
        Box::new(EmptyShrinkIterator::new())
    }
    fn can_generate(&self, pick: &Pick<A>) -> bool {
        self.candidates.contains(&pick.value)
    }
    fn is_shrunken(&self, _candidate: &Pick<A>, _current: &Pick<A>) -> bool {
        true
    }
}

pub fn array<A: Clone + PartialEq + Send + Sync + 'static>(elem: Arb<A>, min: usize, max: usize) -> Arb<Vec<A>> {
    Arc::new(ArrayArbitrary::new(elem, min, max))
}

/// `String(min, max, char_arb)`: array-of-char mapped to a joined string.
pub fn string(min: usize, max: usize, char_arb: Arb<char>) -> Arb<String> {
    map(array(char_arb, min, max), |chars: Vec<char>| chars.into_iter().collect())
}

/// `Record({k: Arbitrary})`: a named product over arbitraries that all
/// produce the same value type `A`, surfaced as a `BTreeMap<String, A>`
/// (a same-typed record; see DESIGN.md for why heterogeneous records are
/// out of scope for this crate's trait-object encoding).
pub struct RecordArbitrary<A> {
    fields: Vec<(String, Arb<A>)>,
    corner_case_cap: usize,
}

impl<A: Clone + PartialEq + Send + Sync + 'static> RecordArbitrary<A> {
    pub fn new(fields: Vec<(String, Arb<A>)>) -> Self {
        RecordArbitrary { fields, corner_case_cap: 64 }
    }
}

impl<A: Clone + PartialEq + Send + Sync + 'static> Arbitrary<BTreeMap<String, A>> for RecordArbitrary<A> {
    fn size(&self) -> Size {
        let mut value: u128 = 1;
        for (_, arb) in &self.fields {
            value = value.saturating_mul(arb.size().value());
        }
        Size::estimated(value, value, value)
    }

    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<BTreeMap<String, A>>> {
        let mut map = BTreeMap::new();
        for (name, arb) in &self.fields {
            map.insert(name.clone(), arb.pick(rng)?.value);
        }
        Some(Pick::new(map))
    }

    /// Cartesian product of component corner cases, capped to avoid blowup.
    fn corner_cases(&self) -> Vec<Pick<BTreeMap<String, A>>> {
        let mut combos: Vec<BTreeMap<String, A>> = vec![BTreeMap::new()];
        for (name, arb) in &self.fields {
            let field_corners = arb.corner_cases();
            if field_corners.is_empty() {
                continue;
            }
            let mut next = Vec::new();
            'outer: for combo in &combos {
                for corner in &field_corners {
                    if next.len() >= self.corner_case_cap {
                        break 'outer;
                    }
                    let mut extended = combo.clone();
                    extended.insert(name.clone(), corner.value.clone());
                    next.push(extended);
                }
            }
            combos = next;
        }
        combos.into_iter().map(Pick::new).collect()
    }

    fn shrink(&self, pick: &Pick<BTreeMap<String, A>>) -> Arb<BTreeMap<String, A>> {
        let mut candidates = Vec::new();
        for (name, arb) in &self.fields {
            if let Some(value) = pick.value.get(name) {
                let mut it = arb.shrink_iterator(&Pick::new(value.clone()));
                while let Some(sv) = it.next() {
                    let mut replaced = pick.value.clone();
                    replaced.insert(name.clone(), sv);
                    candidates.push(replaced);
                }
            }
        }
        Arc::new(FixedCandidates::new(candidates))
    }

    fn shrink_iterator(&self, pick: &Pick<BTreeMap<String, A>>) -> Box<dyn ShrinkIterator<BTreeMap<String, A>> + Send> {
        let mut candidates = Vec::new();
        for (name, arb) in &self.fields {
            if let Some(value) = pick.value.get(name) {
                let mut it = arb.shrink_iterator(&Pick::new(value.clone()));
                while let Some(sv) = it.next() {
                    let mut replaced = pick.value.clone();
                    replaced.insert(name.clone(), sv);
                    candidates.push(replaced);
                }
            }
        }
        Box::new(VecShrinkIterator::new(candidates))
    }

    fn can_generate(&self, pick: &Pick<BTreeMap<String, A>>) -> bool {
        self.fields.iter().all(|(name, arb)| match pick.value.get(name) {
            Some(v) => arb.can_generate(&Pick::new(v.clone())),
            None => false,
        })
    }

    fn is_shrunken(&self, candidate: &Pick<BTreeMap<String, A>>, current: &Pick<BTreeMap<String, A>>) -> bool {
        self.fields.iter().any(|(name, arb)| {
            match (candidate.value.get(name), current.value.get(name)) {
                (Some(c), Some(u)) => arb.is_shrunken(&Pick::new(c.clone()), &Pick::new(u.clone())),
                _ => false,
            }
        })
    }
}

pub fn record<A: Clone + PartialEq + Send + Sync + 'static>(
    fields: Vec<(String, Arb<A>)>,
) -> Arb<BTreeMap<String, A>> {
    Arc::new(RecordArbitrary::new(fields))
}

/// `Composite(variants)`: a tagged union weighted by each variant's size.
pub struct CompositeArbitrary<A> {
    variants: Vec<Arb<A>>,
}

impl<A: Clone + PartialEq + Send + Sync + 'static> CompositeArbitrary<A> {
    pub fn new(variants: Vec<Arb<A>>) -> Self {
        assert!(!variants.is_empty(), "Composite requires at least one variant");
        CompositeArbitrary { variants }
    }

    fn pick_variant(&self, rng: &mut dyn RngCore) -> &Arb<A> {
        use rand::Rng;
        let weights: Vec<u128> = self.variants.iter().map(|v| v.size().value().max(1)).collect();
        let total: u128 = weights.iter().sum();
        let mut target = rng.gen_range(0..total);
        for (variant, weight) in self.variants.iter().zip(weights.iter()) {
            if target < *weight {
                return variant;
            }
            target -= *weight;
        }
        self.variants.last().unwrap()
    }
}

impl<A: Clone + PartialEq + Send + Sync + 'static> Arbitrary<A> for CompositeArbitrary<A> {
    fn size(&self) -> Size {
        let value: u128 = self.variants.iter().map(|v| v.size().value()).sum();
        Size::estimated(value, value, value)
    }

    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<A>> {
        self.pick_variant(rng).pick(rng)
    }

    fn corner_cases(&self) -> Vec<Pick<A>> {
        self.variants.iter().flat_map(|v| v.corner_cases()).collect()
    }

    fn shrink(&self, pick: &Pick<A>) -> Arb<A> {
        for variant in &self.variants {
            if variant.can_generate(pick) {
                return variant.shrink(pick);
            }
        }
        no_arbitrary()
    }

    fn shrink_iterator(&self, pick: &Pick<A>) -> Box<dyn ShrinkIterator<A> + Send> {
        for variant in &self.variants {
            if variant.can_generate(pick) {
                return variant.shrink_iterator(pick);
            }
        }
        Box::new(EmptyShrinkIterator::new())
    }

    fn can_generate(&self, pick: &Pick<A>) -> bool {
        self.variants.iter().any(|v| v.can_generate(pick))
    }

    fn is_shrunken(&self, candidate: &Pick<A>, current: &Pick<A>) -> bool {
        self.variants.iter().any(|v| v.can_generate(current) && v.is_shrunken(candidate, current))
    }
}

pub fn composite<A: Clone + PartialEq + Send + Sync + 'static>(variants: Vec<Arb<A>>) -> Arb<A> {
    Arc::new(CompositeArbitrary::new(variants))
}

/// One entry of a [`WeightedArbitrary`]: a non-negative weight and its
/// arbitrary.
pub struct WeightedEntry<A> {
    weight: f64,
    arbitrary: Arb<A>,
}

impl<A> WeightedEntry<A> {
    pub fn new(weight: f64, arbitrary: Arb<A>) -> Self {
        assert!(weight >= 0.0, "Weighted entries require non-negative weight");
        WeightedEntry { weight, arbitrary }
    }
}

/// `Weighted(entries)`: user-supplied non-negative weights (total > 0);
/// pick by cumulative-weight binary search; corner cases ordered by
/// descending weight; size is the sum of component sizes.
pub struct WeightedArbitrary<A> {
    entries: Vec<WeightedEntry<A>>,
    cumulative: Vec<f64>,
    total: f64,
}

impl<A: Clone + PartialEq + Send + Sync + 'static> WeightedArbitrary<A> {
    pub fn new(entries: Vec<WeightedEntry<A>>) -> Self {
        let mut cumulative = Vec::with_capacity(entries.len());
        let mut running = 0.0;
        for e in &entries {
            running += e.weight;
            cumulative.push(running);
        }
        assert!(running > 0.0, "Weighted requires total weight > 0");
        WeightedArbitrary { entries, cumulative, total: running }
    }

    fn entry_for(&self, target: f64) -> &WeightedEntry<A> {
        let idx = self.cumulative.partition_point(|&c| c < target);
        &self.entries[idx.min(self.entries.len() - 1)]
    }
}

impl<A: Clone + PartialEq + Send + Sync + 'static> Arbitrary<A> for WeightedArbitrary<A> {
    fn size(&self) -> Size {
        let value: u128 = self.entries.iter().map(|e| e.arbitrary.size().value()).sum();
        Size::estimated(value, value, value)
    }

    fn pick(&self, rng: &mut dyn RngCore) -> Option<Pick<A>> {
        use rand::Rng;
        let target = rng.gen_range(0.0..self.total);
        self.entry_for(target).arbitrary.pick(rng)
    }

    fn corner_cases(&self) -> Vec<Pick<A>> {
        let mut ordered: Vec<&WeightedEntry<A>> = self.entries.iter().collect();
        ordered.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap());
        ordered.into_iter().flat_map(|e| e.arbitrary.corner_cases()).collect()
    }

    fn shrink(&self, pick: &Pick<A>) -> Arb<A> {
        for e in &self.entries {
            if e.arbitrary.can_generate(pick) {
                return e.arbitrary.shrink(pick);
            }
        }
        no_arbitrary()
    }

    fn shrink_iterator(&self, pick: &Pick<A>) -> Box<dyn ShrinkIterator<A> + Send> {
        for e in &self.entries {
            if e.arbitrary.can_generate(pick) {
                return e.arbitrary.shrink_iterator(pick);
            }
        }
        Box::new(EmptyShrinkIterator::new())
    }

    fn can_generate(&self, pick: &Pick<A>) -> bool {
        self.entries.iter().any(|e| e.arbitrary.can_generate(pick))
    }

    fn is_shrunken(&self, candidate: &Pick<A>, current: &Pick<A>) -> bool {
        self.entries.iter().any(|e| e.arbitrary.can_generate(current) && e.arbitrary.is_shrunken(candidate, current))
    }
}

pub fn weighted<A: Clone + PartialEq + Send + Sync + 'static>(entries: Vec<WeightedEntry<A>>) -> Arb<A> {
    Arc::new(WeightedArbitrary::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrary::primitives::integer;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(3)
    }

    #[test]
    fn array_respects_length_bounds() {
        let a = array(integer(0, 9), 2, 5);
        for p in a.sample(50, &mut rng()) {
            assert!((2..=5).contains(&p.value.len()));
        }
    }

    #[test]
    fn array_corner_cases_include_empty_when_allowed() {
        let a = array(integer(0, 9), 0, 5);
        let corners = a.corner_cases();
        assert!(corners.iter().any(|p| p.value.is_empty()));
    }

    #[test]
    fn string_length_is_additive_under_concatenation() {
        let a = string(0, 10, crate::arbitrary::primitives::printable_ascii_char());
        let b = string(0, 10, crate::arbitrary::primitives::printable_ascii_char());
        let mut r = rng();
        for _ in 0..20 {
            let sa = a.pick(&mut r).unwrap().value;
            let sb = b.pick(&mut r).unwrap().value;
            let joined = format!("{}{}", sa, sb);
            assert_eq!(joined.chars().count(), sa.chars().count() + sb.chars().count());
        }
    }

    #[test]
    fn weighted_respects_total_size_sum() {
        let w = weighted(vec![
            WeightedEntry::new(1.0, integer(0, 4)),
            WeightedEntry::new(3.0, integer(10, 14)),
        ]);
        assert_eq!(w.size().value(), 5 + 5);
    }
}
