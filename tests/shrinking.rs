//! End-to-end shrinking behavior: a planted counterexample that must still
//! fail after shrinking (S2), and round-robin's fairness advantage over
//! sequential-exhaustive on a symmetric multi-quantifier bug (property 14).

use prop_engine::arbitrary::primitives::integer;
use prop_engine::check::Check;
use prop_engine::explorer::{Explorer, ExplorationBudget, Outcome};
use prop_engine::scenario::{ExecutableScenario, Scenario};
use prop_engine::shrinker::{RoundStrategy, ShrinkBudget, Shrinker};

fn planted_sum_bug() -> ExecutableScenario {
    // a + b == 0 with b != 0 is the only way this "commutativity" check
    // can fail; every other pair is true by ordinary integer addition.
    Scenario::new()
        .forall("a", integer(-10, 10))
        .forall("b", integer(-10, 10))
        .then(|case| {
            let a = *case.get::<i64>("a").unwrap();
            let b = *case.get::<i64>("b").unwrap();
            if a + b == 0 {
                Ok(a + b == b)
            } else {
                Ok(a + b == b + a)
            }
        })
        .compile()
        .expect("scenario should compile")
}

/// The planted bug is found and, after shrinking, the counterexample still
/// satisfies the bug condition (`a + b == 0 && b != 0`) and is no larger in
/// magnitude than what the explorer originally found.
#[test]
fn planted_counterexample_still_fails_after_shrinking() {
    let scenario = planted_sum_bug();
    let budget = ExplorationBudget { max_tests: 2000, ..Default::default() };
    let result = Check::new().seed(7).budget(budget).shrink_strategy(RoundStrategy::DeltaDebugging).run(scenario);

    assert!(!result.satisfiable());
    let ce = result.counterexample().expect("failed run carries a counterexample");
    let a = *ce.get::<i64>("a").unwrap();
    let b = *ce.get::<i64>("b").unwrap();
    assert_eq!(a + b, 0, "shrunk counterexample must still trigger the planted bug");
    assert_ne!(b, 0, "b == 0 trivially satisfies a + b == b and isn't the bug");
    assert!(a.unsigned_abs() + b.unsigned_abs() <= 20, "shrinking should not grow the counterexample");
}

fn symmetric_sum_bug() -> ExecutableScenario {
    // a + b + c <= 250 fails whenever the three draw near their shared
    // maximum; since the property only depends on the sum, each quantifier
    // is independently shrinkable without breaking the other two.
    Scenario::new()
        .forall("a", integer(-100, 100))
        .forall("b", integer(-100, 100))
        .forall("c", integer(-100, 100))
        .then(|case| {
            let a = *case.get::<i64>("a").unwrap();
            let b = *case.get::<i64>("b").unwrap();
            let c = *case.get::<i64>("c").unwrap();
            Ok(a + b + c <= 250)
        })
        .compile()
        .expect("scenario should compile")
}

fn spread(ce: &prop_engine::scenario::BoundTestCase) -> i64 {
    let a = ce.get::<i64>("a").unwrap().abs();
    let b = ce.get::<i64>("b").unwrap().abs();
    let c = ce.get::<i64>("c").unwrap().abs();
    a.max(b).max(c) - a.min(b).min(c)
}

/// Round-robin distributes shrinking across all three quantifiers instead
/// of exhausting the first one while leaving the others at their original,
/// unshrunk magnitude -- so its final spread between the largest and
/// smallest shrunk magnitude should never exceed sequential-exhaustive's.
#[test]
fn round_robin_shrinks_more_fairly_than_sequential_exhaustive() {
    let budget = ExplorationBudget { max_tests: 200, ..Default::default() };
    let explorer = Explorer::new(budget);

    let mut sequential_total = 0i64;
    let mut round_robin_total = 0i64;
    let mut cases_considered = 0;

    for seed in 0..30u64 {
        let scenario = symmetric_sum_bug();
        let explored = explorer.explore(&scenario, seed);
        let Outcome::Failed = explored.outcome else { continue };
        let counterexample = explored.counterexample.unwrap();
        cases_considered += 1;

        let sequential = Shrinker::new(ShrinkBudget::default(), RoundStrategy::SequentialExhaustive)
            .shrink(&scenario, counterexample.clone());
        let round_robin = Shrinker::new(ShrinkBudget::default(), RoundStrategy::RoundRobin).shrink(&scenario, counterexample);

        sequential_total += spread(&sequential.counterexample);
        round_robin_total += spread(&round_robin.counterexample);
    }

    assert!(cases_considered > 0, "at least one seed should have produced a failing case to shrink");
    assert!(
        round_robin_total <= sequential_total,
        "round-robin spread ({round_robin_total}) should not exceed sequential-exhaustive's ({sequential_total}) across {cases_considered} cases"
    );
}
