//! Exercises the `#[property]` attribute end-to-end.

use prop_engine_macros::property;

#[property]
fn min_is_the_smaller_argument(x: i64, y: i64) -> bool {
    if x < y {
        x.min(y) == x
    } else {
        x.min(y) == y
    }
}

#[property]
fn addition_is_commutative(a: i64, b: i64) -> bool {
    a + b == b + a
}

#[property]
fn double_negation_is_identity(flag: bool) -> bool {
    !!flag == flag
}
