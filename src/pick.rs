//! The two smallest data-model types: [`Pick`] and [`Size`].

use std::hash::{Hash, Hasher};

/// A single realization drawn from an [`crate::arbitrary::Arbitrary`].
///
/// `value` is what the property body sees. `original` is the pre-image
/// under any `map` that produced this pick, kept around so that shrinking
/// a mapped arbitrary can still compare candidates in the *base* arbitrary's
/// terms rather than the mapped one's.
#[derive(Clone, Debug)]
pub struct Pick<A> {
    pub value: A,
    pub original: Option<A>,
}

impl<A> Pick<A> {
    pub fn new(value: A) -> Self {
        Pick { value, original: None }
    }

    pub fn with_original(value: A, original: A) -> Self {
        Pick { value, original: Some(original) }
    }

    pub fn map<B>(self, f: impl Fn(A) -> B) -> Pick<B>
    where
        A: Clone,
    {
        let original = self.original.map(&f);
        Pick { value: f(self.value), original }
    }
}

impl<A: PartialEq> PartialEq for Pick<A> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<A: Eq> Eq for Pick<A> {}

impl<A: Hash> Hash for Pick<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

/// The cardinality of an arbitrary's support.
///
/// Invariant: for `Estimated { value, lo, hi }`, `lo <= value <= hi`; for
/// `Exact(n)`, read as `lo = value = hi = n`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Size {
    Exact(u128),
    Estimated { value: u128, lo: u128, hi: u128 },
}

impl Size {
    pub fn estimated(value: u128, lo: u128, hi: u128) -> Self {
        debug_assert!(lo <= value && value <= hi, "Size::estimated interval must bracket value");
        Size::Estimated { value, lo, hi }
    }

    /// The best-guess cardinality, regardless of variant.
    pub fn value(&self) -> u128 {
        match *self {
            Size::Exact(n) => n,
            Size::Estimated { value, .. } => value,
        }
    }

    pub fn lo(&self) -> u128 {
        match *self {
            Size::Exact(n) => n,
            Size::Estimated { lo, .. } => lo,
        }
    }

    pub fn hi(&self) -> u128 {
        match *self {
            Size::Exact(n) => n,
            Size::Estimated { hi, .. } => hi,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value() == 0
    }

    /// Scale an estimated size by a factor derived from a posterior (used
    /// by `Filtered`): scales `value`, `lo`, and `hi` independently so the
    /// credible interval keeps meaning.
    pub fn scaled(&self, value_factor: f64, lo_factor: f64, hi_factor: f64) -> Size {
        let scale = |n: u128, f: f64| -> u128 { ((n as f64) * f).round().max(0.0) as u128 };
        match *self {
            Size::Exact(n) => Size::estimated(scale(n, value_factor), scale(n, lo_factor), scale(n, hi_factor)),
            Size::Estimated { value, lo, hi } => {
                Size::estimated(scale(value, value_factor), scale(lo, lo_factor), scale(hi, hi_factor))
            }
        }
    }
}
