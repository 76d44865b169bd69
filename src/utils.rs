use num_bigint::BigUint;

/// Default absolute tolerance for checking that conditional distributions sum to one.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Absolute-difference comparison of two floats.
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Product of cardinalities as an arbitrary-precision integer.
///
/// Table sizes of intermediate factors grow exponentially with their scope,
/// so cost estimates must not overflow `usize`.
pub fn big_table_size(cards: impl IntoIterator<Item = usize>) -> BigUint {
    cards.into_iter().fold(BigUint::from(1u32), |acc, c| acc * BigUint::from(c))
}
