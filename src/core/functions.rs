//! Element-wise transforms for the `assign_*` family.
//!
//! Binary transforms take `(current, other)` and return the new value of
//! `current`, so `z.assign_with(&v, minus_mult(s))` computes `z ← z - s·v`.

use crate::core::scalar::Scalar;

/// `a ← a / k`
pub fn div<T: Scalar>(k: T) -> impl Fn(T) -> T {
    move |a| a / k
}

/// `a ← a · k`
pub fn mult<T: Scalar>(k: T) -> impl Fn(T) -> T {
    move |a| a * k
}

/// `a ← a - b · k`
pub fn minus_mult<T: Scalar>(k: T) -> impl Fn(T, T) -> T {
    move |a, b| a - b * k
}

/// `a ← a + b · k`
pub fn plus_mult_second<T: Scalar>(k: T) -> impl Fn(T, T) -> T {
    move |a, b| a + b * k
}

/// `a ← a + b`
pub fn plus<T: Scalar>(a: T, b: T) -> T {
    a + b
}

/// `a ← a - b`
pub fn minus<T: Scalar>(a: T, b: T) -> T {
    a - b
}

/// `a ← a · b`
pub fn times<T: Scalar>(a: T, b: T) -> T {
    a * b
}
