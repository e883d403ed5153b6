use alloy_sol_macro::sol;
use stylus_sdk::prelude::AbiType;

use super::{amounts, BalanceDelta, Currency, PoolKey};

sol! {
    /// Parameters of a swap, as handed to the swap callbacks.
    #[derive(Debug, AbiType)]
    struct SwapParams {
        /// Direction of the swap: `currency0` in for `currency1` out when set.
        bool zeroForOne;
        /// Exact input when negative, exact output when positive.
        int256 amountSpecified;
        /// Price limit past which the swap stops.
        uint160 sqrtPriceLimitX96;
    }
}

impl SwapParams {
    /// Returns true when `amountSpecified` is the exact input amount.
    #[must_use]
    pub fn is_exact_input(&self) -> bool {
        self.amountSpecified.is_negative()
    }

    /// Returns the currency the swapper pays into the pool together with its
    /// side of `delta`, negative when the pool was paid.
    #[must_use]
    pub fn input_side(
        &self,
        key: &PoolKey,
        delta: BalanceDelta,
    ) -> (Currency, i128) {
        let (amount0, amount1) = amounts(delta);
        if self.zeroForOne {
            (key.currency0, amount0)
        } else {
            (key.currency1, amount1)
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{aliases::U160, Address, I256};

    use super::*;
    use crate::uniswap::v4::{to_balance_delta, I24, U24};

    fn key() -> PoolKey {
        PoolKey {
            currency0: Address::repeat_byte(0x01),
            currency1: Address::repeat_byte(0x02),
            fee: U24::from(3_000),
            tickSpacing: I24::try_from(60).unwrap(),
            hooks: Address::repeat_byte(0xc0),
        }
    }

    fn params(zero_for_one: bool, amount: i64) -> SwapParams {
        SwapParams {
            zeroForOne: zero_for_one,
            amountSpecified: I256::try_from(amount).unwrap(),
            sqrtPriceLimitX96: U160::ZERO,
        }
    }

    #[test]
    fn input_side_follows_direction() {
        let delta = to_balance_delta(-100, 49);
        assert_eq!(
            params(true, -100).input_side(&key(), delta),
            (Address::repeat_byte(0x01), -100)
        );

        let delta = to_balance_delta(49, -100);
        assert_eq!(
            params(false, -100).input_side(&key(), delta),
            (Address::repeat_byte(0x02), -100)
        );
    }

    #[test]
    fn exact_input_is_negative_amount() {
        assert!(params(true, -1).is_exact_input());
        assert!(!params(true, 1).is_exact_input());
    }
}
