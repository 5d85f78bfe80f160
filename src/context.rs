//! Statistics context: a per-check-invocation scratchpad
//! that property bodies use to label branches, record custom events, and
//! name targets for the shrinker to optimize against. Propagated via a
//! thread-local so nested `forall`/`exists` bodies can reach it without an
//! explicit parameter threaded through every combinator.

use std::cell::RefCell;
use std::collections::HashMap;

/// One check invocation's accumulated labels/events/targets.
#[derive(Debug, Default, Clone)]
pub struct StatisticsContext {
    labels: HashMap<String, u64>,
    events: Vec<String>,
    targets: HashMap<String, f64>,
}

impl StatisticsContext {
    pub fn new() -> Self {
        StatisticsContext::default()
    }

    pub fn label(&mut self, name: impl Into<String>) {
        *self.labels.entry(name.into()).or_insert(0) += 1;
    }

    pub fn event(&mut self, description: impl Into<String>) {
        self.events.push(description.into());
    }

    /// Records an observation against a named optimization target; later
    /// observations with a larger value replace the running maximum, which
    /// is what the shrinker/explorer consult when a scenario asks to
    /// maximize a target.
    pub fn target(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        let entry = self.targets.entry(name).or_insert(f64::NEG_INFINITY);
        if value > *entry {
            *entry = value;
        }
    }

    pub fn labels(&self) -> &HashMap<String, u64> {
        &self.labels
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn target_value(&self, name: &str) -> Option<f64> {
        self.targets.get(name).copied()
    }

    pub fn merge(&mut self, other: &StatisticsContext) {
        for (k, v) in &other.labels {
            *self.labels.entry(k.clone()).or_insert(0) += v;
        }
        self.events.extend(other.events.iter().cloned());
        for (k, v) in &other.targets {
            self.target(k.clone(), *v);
        }
    }
}

thread_local! {
    static CURRENT: RefCell<Option<StatisticsContext>> = RefCell::new(None);
}

/// Runs `f` with a fresh [`StatisticsContext`] installed as the
/// thread-local current context, returning both `f`'s result and the
/// accumulated context. Nested calls save and restore the previous
/// context so a property that itself drives a nested check doesn't leak
/// labels into its caller's context.
pub fn with_fresh_context<R>(f: impl FnOnce() -> R) -> (R, StatisticsContext) {
    let previous = CURRENT.with(|cell| cell.borrow_mut().replace(StatisticsContext::new()));
    let result = f();
    let collected = CURRENT.with(|cell| cell.borrow_mut().replace(StatisticsContext::new()).unwrap_or_default());
    CURRENT.with(|cell| *cell.borrow_mut() = previous);
    (result, collected)
}

/// Records a label against the currently installed context, a no-op if
/// called outside `with_fresh_context` (e.g. a property run directly in a
/// unit test without going through [`crate::check::Check`]).
pub fn label(name: impl Into<String>) {
    CURRENT.with(|cell| {
        if let Some(ctx) = cell.borrow_mut().as_mut() {
            ctx.label(name);
        }
    });
}

pub fn event(description: impl Into<String>) {
    CURRENT.with(|cell| {
        if let Some(ctx) = cell.borrow_mut().as_mut() {
            ctx.event(description);
        }
    });
}

pub fn target(name: impl Into<String>, value: f64) {
    CURRENT.with(|cell| {
        if let Some(ctx) = cell.borrow_mut().as_mut() {
            ctx.target(name, value);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_recorded_inside_fresh_context_are_collected() {
        let (_, ctx) = with_fresh_context(|| {
            label("even");
            label("even");
            label("odd");
        });
        assert_eq!(ctx.labels().get("even"), Some(&2));
        assert_eq!(ctx.labels().get("odd"), Some(&1));
    }

    #[test]
    fn nested_fresh_contexts_do_not_leak_into_the_outer_one() {
        let (_, outer) = with_fresh_context(|| {
            label("outer-label");
            let (_, inner) = with_fresh_context(|| {
                label("inner-label");
            });
            assert_eq!(inner.labels().get("inner-label"), Some(&1));
            label("outer-label");
        });
        assert_eq!(outer.labels().get("outer-label"), Some(&2));
        assert!(outer.labels().get("inner-label").is_none());
    }

    #[test]
    fn target_keeps_running_maximum() {
        let (_, ctx) = with_fresh_context(|| {
            target("depth", 3.0);
            target("depth", 7.0);
            target("depth", 5.0);
        });
        assert_eq!(ctx.target_value("depth"), Some(7.0));
    }

    #[test]
    fn label_outside_context_is_a_harmless_no_op() {
        label("stray");
    }
}
