//! Fixed-point helpers shared by the ledger, the yield tracker and the
//! rebalance engine.
//!
//! Every helper here is checked: instead of panicking or wrapping, overflow,
//! underflow and division by zero are reported as an [`Error`] so that the
//! enclosing call can revert cleanly.
use alloy_primitives::{U256, U512};
pub use sol::*;
use stylus_sdk::prelude::*;

/// Scale of the yield index: `1e18` represents one unit of yield per unit of
/// managed liquidity.
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Denominator for values expressed in basis points.
pub const BPS: U256 = U256::from_limbs([10_000, 0, 0, 0]);

#[cfg_attr(coverage_nightly, coverage(off))]
mod sol {
    use alloy_sol_macro::sol;

    sol! {
        /// An accounting update would exceed the range of `uint256`.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error ArithmeticOverflow();

        /// An accounting update would go below zero.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error ArithmeticUnderflow();
    }
}

/// A checked-math error.
#[derive(SolidityError, Debug)]
pub enum Error {
    /// An accounting update would exceed the range of `uint256`.
    Overflow(ArithmeticOverflow),
    /// An accounting update would go below zero.
    Underflow(ArithmeticUnderflow),
}

impl Error {
    pub(crate) fn overflow() -> Self {
        Error::Overflow(ArithmeticOverflow {})
    }

    pub(crate) fn underflow() -> Self {
        Error::Underflow(ArithmeticUnderflow {})
    }
}

/// Returns `a + b`.
///
/// # Errors
///
/// * [`Error::Overflow`] - If the sum exceeds `U256::MAX`.
pub fn add(a: U256, b: U256) -> Result<U256, Error> {
    a.checked_add(b).ok_or_else(Error::overflow)
}

/// Returns `a - b`.
///
/// # Errors
///
/// * [`Error::Underflow`] - If `b > a`.
pub fn sub(a: U256, b: U256) -> Result<U256, Error> {
    a.checked_sub(b).ok_or_else(Error::underflow)
}

/// Calculates `floor(x * y / denominator)` with full 512-bit precision for
/// the intermediate product.
///
/// # Errors
///
/// * [`Error::Overflow`] - If `denominator` is zero or the result does not
///   fit into `U256`.
pub fn mul_div(x: U256, y: U256, denominator: U256) -> Result<U256, Error> {
    if denominator.is_zero() {
        return Err(Error::overflow());
    }

    // `U256` * `U256` always fits into `U512`.
    let prod = U512::from(x) * U512::from(y);
    let result = prod / U512::from(denominator);

    if result > U512::from(U256::MAX) {
        return Err(Error::overflow());
    }
    Ok(U256::from(result))
}

/// Relative deviation between two rates in basis points, measured against
/// the larger one: `|a - b| * 10_000 / max(a, b)`. Two zero rates have no
/// deviation.
#[must_use]
pub fn deviation_bps(a: U256, b: U256) -> U256 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if hi.is_zero() {
        return U256::ZERO;
    }
    // `hi - lo <= hi`, so the quotient is at most `BPS`.
    mul_div(hi - lo, BPS, hi).unwrap_or(BPS)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{uint, U256, U512};
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn wad_and_bps_constants() {
        assert_eq!(WAD, uint!(1_000_000_000_000_000_000_U256));
        assert_eq!(BPS, uint!(10_000_U256));
    }

    #[test]
    fn mul_div_rounds_toward_zero() {
        assert_eq!(
            mul_div(uint!(10_U256), WAD, uint!(1000_U256)).unwrap(),
            uint!(10_000_000_000_000_000_U256)
        );
        assert_eq!(
            mul_div(uint!(7_U256), uint!(1_U256), uint!(2_U256)).unwrap(),
            uint!(3_U256)
        );
    }

    #[test]
    fn mul_div_reports_zero_denominator() {
        let err = mul_div(U256::ONE, U256::ONE, U256::ZERO).unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));
    }

    #[test]
    fn mul_div_reports_result_overflow() {
        let err = mul_div(U256::MAX, uint!(2_U256), U256::ONE).unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));
    }

    #[test]
    fn add_and_sub_are_checked() {
        assert!(matches!(add(U256::MAX, U256::ONE), Err(Error::Overflow(_))));
        assert!(matches!(sub(U256::ZERO, U256::ONE), Err(Error::Underflow(_))));
        assert_eq!(sub(uint!(5_U256), uint!(3_U256)).unwrap(), uint!(2_U256));
    }

    #[test]
    fn deviation_is_symmetric_and_bounded() {
        let a = uint!(100_U256);
        let b = uint!(80_U256);
        assert_eq!(deviation_bps(a, b), uint!(2000_U256));
        assert_eq!(deviation_bps(b, a), uint!(2000_U256));
        assert_eq!(deviation_bps(a, U256::ZERO), BPS);
        assert_eq!(deviation_bps(U256::ZERO, U256::ZERO), U256::ZERO);
    }

    proptest! {
        #[test]
        fn mul_div_matches_wide_arithmetic(x: u128, y: u128, d in 1u128..) {
            let (x, y, d) = (U256::from(x), U256::from(y), U256::from(d));
            let expected = U512::from(x) * U512::from(y) / U512::from(d);
            let actual = mul_div(x, y, d).unwrap();
            prop_assert_eq!(U512::from(actual), expected);
        }

        #[test]
        fn deviation_never_exceeds_bps(a: u128, b: u128) {
            let dev = deviation_bps(U256::from(a), U256::from(b));
            prop_assert!(dev <= BPS);
        }
    }
}
