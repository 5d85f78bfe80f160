//! A property-based testing engine built around nested universal/
//! existential quantifiers, fair shrinking, and Bayesian confidence
//! bounds, rather than the fixed-iteration-count model of a conventional
//! QuickCheck port.
//!
//! A scenario is declared with [`scenario::Scenario`], compiled, and run
//! through [`check::Check`]:
//!
//! ```
//! use prop_engine::arbitrary::primitives::integer;
//! use prop_engine::check::Check;
//! use prop_engine::scenario::Scenario;
//!
//! let scenario = Scenario::new()
//!     .forall("a", integer(-100, 100))
//!     .forall("b", integer(-100, 100))
//!     .then(|case| {
//!         let a = *case.get::<i64>("a").unwrap();
//!         let b = *case.get::<i64>("b").unwrap();
//!         Ok(a + b == b + a)
//!     })
//!     .compile()
//!     .unwrap();
//!
//! let result = Check::new().seed(42).run(scenario);
//! assert!(result.satisfiable());
//! ```

pub mod arbitrary;
pub mod check;
pub mod context;
pub mod coverage;
pub mod error;
pub mod explorer;
pub mod pick;
pub mod reporter;
pub mod sampler;
pub mod scenario;
pub mod shrinker;
pub mod stats;

pub use check::{Check, CheckOptions, CheckOutcome, CheckResult};
pub use error::{EngineError, EngineResult};
pub use explorer::{DetailedStatistics, ExplorationBudget, Explorer, ExplorationResult, Outcome, QuantifierStats};
pub use pick::{Pick, Size};
pub use scenario::{BoundTestCase, ExecutableScenario, QuantifierKind, Scenario};
pub use shrinker::{RoundStrategy, ShrinkBudget, Shrinker};
