//! Scenarios: a declarative sequence of quantifiers,
//! derived bindings, preconditions, coverage requirements, and a property,
//! compiled down to an [`ExecutableScenario`] the explorer can drive
//! without knowing each quantifier's concrete value type.
//!
//! Quantifiers can't be expressed as a progressively-typed tuple since a
//! scenario may bind an arbitrary number of them, so the compiled test case
//! is a dynamic map (`BoundTestCase`) instead: each quantifier's arbitrary is
//! type-erased into an [`ErasedArbitrary`] trait object the moment it's
//! attached to a scenario, and the property closure downcasts by name.

use crate::arbitrary::{Arb, ArbitraryExt};
use crate::error::EngineError;
use crate::pick::{Pick, Size};
use rand::RngCore;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A type-erased [`Pick`]. `value`/`original` are kept behind `Arc<dyn
/// Any>` (not `Box`) so a `DynPick` can be cheaply cloned without
/// requiring the erased payload itself to implement `Clone`.
#[derive(Clone)]
pub struct DynPick {
    value: Arc<dyn Any + Send + Sync>,
    original: Option<Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for DynPick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynPick").finish_non_exhaustive()
    }
}

impl DynPick {
    pub fn downcast<A: 'static>(&self) -> Option<&A> {
        self.value.downcast_ref::<A>()
    }

    /// Projects this pick onto the scalar a distribution tracker wants:
    /// the value itself for scalar types, the length for sequence types.
    /// `None` for erased types with no natural numeric projection.
    pub(crate) fn observe(&self) -> Option<f64> {
        if let Some(v) = self.value.downcast_ref::<i64>() {
            return Some(*v as f64);
        }
        if let Some(v) = self.value.downcast_ref::<f64>() {
            return Some(*v);
        }
        if let Some(v) = self.value.downcast_ref::<bool>() {
            return Some(if *v { 1.0 } else { 0.0 });
        }
        if let Some(v) = self.value.downcast_ref::<char>() {
            return Some(*v as u32 as f64);
        }
        if let Some(v) = self.value.downcast_ref::<String>() {
            return Some(v.len() as f64);
        }
        if let Some(v) = self.value.downcast_ref::<Vec<char>>() {
            return Some(v.len() as f64);
        }
        if let Some(v) = self.value.downcast_ref::<Vec<i64>>() {
            return Some(v.len() as f64);
        }
        if let Some(v) = self.value.downcast_ref::<Vec<bool>>() {
            return Some(v.len() as f64);
        }
        if let Some(v) = self.value.downcast_ref::<Vec<f64>>() {
            return Some(v.len() as f64);
        }
        None
    }
}

fn erase_pick<A: Clone + PartialEq + Send + Sync + 'static>(pick: Pick<A>) -> DynPick {
    DynPick {
        value: Arc::new(pick.value),
        original: pick.original.map(|o| Arc::new(o) as Arc<dyn Any + Send + Sync>),
    }
}

fn unerase_pick<A: Clone + 'static>(pick: &DynPick) -> Option<Pick<A>> {
    let value = pick.value.downcast_ref::<A>()?.clone();
    let original = match &pick.original {
        Some(o) => Some(o.downcast_ref::<A>()?.clone()),
        None => None,
    };
    Some(Pick { value, original })
}

/// A lazy shrink candidate stream over type-erased picks.
pub trait ErasedShrinkIterator: Send {
    fn next(&mut self) -> Option<DynPick>;
    fn accept_smaller(&mut self);
    fn reject_smaller(&mut self);
}

struct ErasedShrinkIteratorWrapper<A> {
    inner: Box<dyn crate::arbitrary::ShrinkIterator<A> + Send>,
}

impl<A: Clone + PartialEq + Send + Sync + 'static> ErasedShrinkIterator for ErasedShrinkIteratorWrapper<A> {
    fn next(&mut self) -> Option<DynPick> {
        self.inner.next().map(|value| DynPick { value: Arc::new(value), original: None })
    }
    fn accept_smaller(&mut self) {
        self.inner.accept_smaller()
    }
    fn reject_smaller(&mut self) {
        self.inner.reject_smaller()
    }
}

/// A type-erased [`crate::arbitrary::Arbitrary`]: the scenario-level
/// currency type that lets a single `Vec<Quantifier>` hold arbitraries
/// over unrelated concrete types.
pub trait ErasedArbitrary: Send + Sync {
    fn size(&self) -> Size;
    fn pick_dyn(&self, rng: &mut dyn RngCore) -> Option<DynPick>;
    fn corner_cases_dyn(&self) -> Vec<DynPick>;
    fn sample_dyn(&self, n: usize, rng: &mut dyn RngCore) -> Vec<DynPick>;
    fn sample_with_bias_dyn(&self, n: usize, rng: &mut dyn RngCore) -> Vec<DynPick>;
    fn shrink_dyn(&self, pick: &DynPick) -> Arc<dyn ErasedArbitrary>;
    fn shrink_iterator_dyn(&self, pick: &DynPick) -> Box<dyn ErasedShrinkIterator>;
    fn is_shrunken_dyn(&self, candidate: &DynPick, current: &DynPick) -> bool;
    fn equals_dyn(&self, a: &DynPick, b: &DynPick) -> bool;
}

struct ErasedWrapper<A> {
    inner: Arb<A>,
}

impl<A: Clone + PartialEq + Send + Sync + 'static> ErasedArbitrary for ErasedWrapper<A> {
    fn size(&self) -> Size {
        self.inner.size()
    }

    fn pick_dyn(&self, rng: &mut dyn RngCore) -> Option<DynPick> {
        self.inner.pick(rng).map(erase_pick)
    }

    fn corner_cases_dyn(&self) -> Vec<DynPick> {
        self.inner.corner_cases().into_iter().map(erase_pick).collect()
    }

    fn sample_dyn(&self, n: usize, rng: &mut dyn RngCore) -> Vec<DynPick> {
        self.inner.sample(n, rng).into_iter().map(erase_pick).collect()
    }

    fn sample_with_bias_dyn(&self, n: usize, rng: &mut dyn RngCore) -> Vec<DynPick> {
        self.inner.sample_with_bias(n, rng).into_iter().map(erase_pick).collect()
    }

    fn shrink_dyn(&self, pick: &DynPick) -> Arc<dyn ErasedArbitrary> {
        match unerase_pick::<A>(pick) {
            Some(p) => Arc::new(ErasedWrapper { inner: self.inner.shrink(&p) }),
            None => Arc::new(ErasedWrapper { inner: crate::arbitrary::no_arbitrary::<A>() }),
        }
    }

    fn shrink_iterator_dyn(&self, pick: &DynPick) -> Box<dyn ErasedShrinkIterator> {
        match unerase_pick::<A>(pick) {
            Some(p) => Box::new(ErasedShrinkIteratorWrapper { inner: self.inner.shrink_iterator(&p) }),
            None => Box::new(ErasedShrinkIteratorWrapper { inner: Box::new(crate::arbitrary::EmptyShrinkIterator::<A>::new()) }),
        }
    }

    fn is_shrunken_dyn(&self, candidate: &DynPick, current: &DynPick) -> bool {
        match (unerase_pick::<A>(candidate), unerase_pick::<A>(current)) {
            (Some(c), Some(u)) => self.inner.is_shrunken(&c, &u),
            _ => false,
        }
    }

    fn equals_dyn(&self, a: &DynPick, b: &DynPick) -> bool {
        match (unerase_pick::<A>(a), unerase_pick::<A>(b)) {
            (Some(a), Some(b)) => self.inner.equals(&a, &b),
            _ => false,
        }
    }
}

/// Erases a concrete arbitrary into the scenario's shared currency type.
pub fn erase<A: Clone + PartialEq + Send + Sync + 'static>(arb: Arb<A>) -> Arc<dyn ErasedArbitrary> {
    Arc::new(ErasedWrapper { inner: arb })
}

/// Universal or existential quantification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantifierKind {
    ForAll,
    Exists,
}

/// A mapping from quantifier/given name to the pick bound to it -- the
/// record the property body and preconditions observe.
#[derive(Clone, Debug, Default)]
pub struct BoundTestCase {
    bindings: BTreeMap<String, DynPick>,
}

impl BoundTestCase {
    pub fn new() -> Self {
        BoundTestCase::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, pick: DynPick) {
        self.bindings.insert(name.into(), pick);
    }

    pub fn get<A: 'static>(&self, name: &str) -> Option<&A> {
        self.bindings.get(name)?.downcast::<A>()
    }

    pub fn pick(&self, name: &str) -> Option<&DynPick> {
        self.bindings.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(|s| s.as_str())
    }
}

type PredicateFn = Arc<dyn Fn(&BoundTestCase) -> bool + Send + Sync>;
type DeriveFn = Arc<dyn Fn(&BoundTestCase) -> DynPick + Send + Sync>;
type PropertyFn = Arc<dyn Fn(&BoundTestCase) -> Result<bool, EngineError> + Send + Sync>;

pub struct Quantifier {
    pub name: String,
    pub kind: QuantifierKind,
    pub arbitrary: Arc<dyn ErasedArbitrary>,
}

/// One node in a scenario's declaration order.
pub enum Node {
    Quantifier(Quantifier),
    Given { name: String, derive: DeriveFn },
    Precondition(PredicateFn),
    Cover { percentage: f64, predicate: PredicateFn, label: String },
    CoverTable { name: String, categories: Vec<(String, PredicateFn)> },
    Then(PropertyFn),
}

/// The declarative, uncompiled form: an ordered list of nodes. Construction
/// is append-only; `compile` produces the form the explorer actually drives.
#[derive(Default)]
pub struct Scenario {
    nodes: Vec<Node>,
}

impl Scenario {
    pub fn new() -> Self {
        Scenario::default()
    }

    pub fn forall<A: Clone + PartialEq + Send + Sync + 'static>(mut self, name: impl Into<String>, arbitrary: Arb<A>) -> Self {
        self.nodes.push(Node::Quantifier(Quantifier { name: name.into(), kind: QuantifierKind::ForAll, arbitrary: erase(arbitrary) }));
        self
    }

    pub fn exists<A: Clone + PartialEq + Send + Sync + 'static>(mut self, name: impl Into<String>, arbitrary: Arb<A>) -> Self {
        self.nodes.push(Node::Quantifier(Quantifier { name: name.into(), kind: QuantifierKind::Exists, arbitrary: erase(arbitrary) }));
        self
    }

    pub fn given<A: Clone + PartialEq + Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        derive: impl Fn(&BoundTestCase) -> A + Send + Sync + 'static,
    ) -> Self {
        let derive: DeriveFn = Arc::new(move |case| erase_pick(Pick::new(derive(case))));
        self.nodes.push(Node::Given { name: name.into(), derive });
        self
    }

    pub fn precondition(mut self, predicate: impl Fn(&BoundTestCase) -> bool + Send + Sync + 'static) -> Self {
        self.nodes.push(Node::Precondition(Arc::new(predicate)));
        self
    }

    pub fn cover(mut self, percentage: f64, predicate: impl Fn(&BoundTestCase) -> bool + Send + Sync + 'static, label: impl Into<String>) -> Self {
        self.nodes.push(Node::Cover { percentage, predicate: Arc::new(predicate), label: label.into() });
        self
    }

    pub fn cover_table(mut self, name: impl Into<String>, categories: Vec<(String, Arc<dyn Fn(&BoundTestCase) -> bool + Send + Sync>)>) -> Self {
        self.nodes.push(Node::CoverTable { name: name.into(), categories });
        self
    }

    pub fn then(mut self, property: impl Fn(&BoundTestCase) -> Result<bool, EngineError> + Send + Sync + 'static) -> Self {
        self.nodes.push(Node::Then(Arc::new(property)));
        self
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Pure compile step: flattens the node list into an
    /// [`ExecutableScenario`] without touching any arbitrary or RNG.
    pub fn compile(self) -> Result<ExecutableScenario, EngineError> {
        let mut quantifiers = Vec::new();
        let mut givens = Vec::new();
        let mut preconditions = Vec::new();
        let mut covers = Vec::new();
        let mut cover_tables = Vec::new();
        let mut property = None;
        let mut has_existential = false;

        for node in self.nodes {
            match node {
                Node::Quantifier(q) => {
                    if q.kind == QuantifierKind::Exists {
                        has_existential = true;
                    }
                    quantifiers.push(ExecutableQuantifier { name: q.name, kind: q.kind, arbitrary: q.arbitrary });
                }
                Node::Given { name, derive } => givens.push((name, derive)),
                Node::Precondition(p) => preconditions.push(p),
                Node::Cover { percentage, predicate, label } => covers.push(CoverRequirement { percentage, predicate, label }),
                Node::CoverTable { name, categories } => cover_tables.push(CoverTableRequirement { name, categories }),
                Node::Then(p) => property = Some(p),
            }
        }

        let property = property.ok_or_else(|| EngineError::schema_misuse("Scenario::compile", "scenario has no `then` property"))?;
        if quantifiers.is_empty() {
            return Err(EngineError::schema_misuse("Scenario::compile", "scenario has no quantifiers"));
        }

        let search_space_size = quantifiers.iter().fold(Size::Exact(1), |acc, q| {
            let a = acc.value();
            let b = q.arbitrary.size().value();
            Size::Exact(a.saturating_mul(b))
        });

        Ok(ExecutableScenario { quantifiers, givens, preconditions, covers, cover_tables, property, has_existential, search_space_size })
    }
}

pub struct ExecutableQuantifier {
    pub name: String,
    pub kind: QuantifierKind,
    arbitrary: Arc<dyn ErasedArbitrary>,
}

impl ExecutableQuantifier {
    pub fn size(&self) -> Size {
        self.arbitrary.size()
    }

    pub fn corner_cases(&self) -> Vec<DynPick> {
        self.arbitrary.corner_cases_dyn()
    }

    pub fn sample(&self, n: usize, rng: &mut dyn RngCore) -> Vec<DynPick> {
        self.arbitrary.sample_dyn(n, rng)
    }

    pub fn sample_with_bias(&self, n: usize, rng: &mut dyn RngCore) -> Vec<DynPick> {
        self.arbitrary.sample_with_bias_dyn(n, rng)
    }

    pub fn shrink(&self, pick: &DynPick) -> Arc<dyn ErasedArbitrary> {
        self.arbitrary.shrink_dyn(pick)
    }

    pub fn shrink_iterator(&self, pick: &DynPick) -> Box<dyn ErasedShrinkIterator> {
        self.arbitrary.shrink_iterator_dyn(pick)
    }

    pub fn is_shrunken(&self, candidate: &DynPick, current: &DynPick) -> bool {
        self.arbitrary.is_shrunken_dyn(candidate, current)
    }

    pub fn equals(&self, a: &DynPick, b: &DynPick) -> bool {
        self.arbitrary.equals_dyn(a, b)
    }
}

pub struct CoverRequirement {
    pub percentage: f64,
    pub predicate: PredicateFn,
    pub label: String,
}

pub struct CoverTableRequirement {
    pub name: String,
    pub categories: Vec<(String, PredicateFn)>,
}

/// The compiled form the explorer drives: quantifiers
/// decoupled from their underlying arbitrary objects, plus the
/// derivations, preconditions, coverage requirements, and property that
/// round out one test case evaluation.
pub struct ExecutableScenario {
    pub quantifiers: Vec<ExecutableQuantifier>,
    pub givens: Vec<(String, DeriveFn)>,
    pub preconditions: Vec<PredicateFn>,
    pub covers: Vec<CoverRequirement>,
    pub cover_tables: Vec<CoverTableRequirement>,
    pub property: PropertyFn,
    pub has_existential: bool,
    pub search_space_size: Size,
}

impl ExecutableScenario {
    /// Applies every `given` derivation to `case` in declaration order,
    /// then runs every precondition; returns `false` on the first
    /// precondition that fails (the caller records this as `skipped`).
    pub fn apply_givens_and_preconditions(&self, case: &mut BoundTestCase) -> bool {
        for (name, derive) in &self.givens {
            let pick = derive(case);
            case.bind(name.clone(), pick);
        }
        self.preconditions.iter().all(|p| p(case))
    }

    pub fn evaluate_property(&self, case: &BoundTestCase) -> Result<bool, EngineError> {
        (self.property)(case)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrary::primitives::integer;

    #[test]
    fn compile_rejects_scenario_without_then() {
        let scenario = Scenario::new().forall("a", integer(0, 10));
        assert!(scenario.compile().is_err());
    }

    #[test]
    fn compile_rejects_scenario_without_quantifiers() {
        let scenario = Scenario::new().then(|_case| Ok(true));
        assert!(scenario.compile().is_err());
    }

    #[test]
    fn compiled_scenario_binds_and_evaluates() {
        let scenario = Scenario::new()
            .forall("a", integer(-10, 10))
            .forall("b", integer(-10, 10))
            .then(|case| {
                let a = *case.get::<i64>("a").unwrap();
                let b = *case.get::<i64>("b").unwrap();
                Ok(a + b == b + a)
            })
            .compile()
            .unwrap();

        use rand::SeedableRng;
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        let mut case = BoundTestCase::new();
        for q in &scenario.quantifiers {
            let pick = q.sample(1, &mut rng).into_iter().next().unwrap();
            case.bind(q.name.clone(), pick);
        }
        assert!(scenario.apply_givens_and_preconditions(&mut case));
        assert!(scenario.evaluate_property(&case).unwrap());
    }

    #[test]
    fn search_space_size_multiplies_quantifier_sizes() {
        let scenario = Scenario::new()
            .forall("a", integer(0, 9))
            .forall("b", integer(0, 4))
            .then(|_case| Ok(true))
            .compile()
            .unwrap();
        assert_eq!(scenario.search_space_size.value(), 50);
    }
}
