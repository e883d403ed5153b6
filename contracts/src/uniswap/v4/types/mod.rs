//! Module with data types for Uniswap V4 Hooks.
use alloy_primitives::{Signed, Uint, B256, I256};

mod pool_key;
mod swap_params;

pub use pool_key::{Currency, PoolKey, DYNAMIC_FEE_FLAG, MAX_LP_FEE};
pub use swap_params::SwapParams;

/// Type representing Id of a Pool.
pub type PoolId = B256;

/// Type representing signed 24-bits integer.
pub type I24 = Signed<24, 1>;

/// Type representing unsigned 24-bits integer.
pub type U24 = Uint<24, 1>;

/// Type representing balance delta.
///
/// The upper 128 bits hold `amount0`, the lower 128 bits hold `amount1`.
/// A negative amount is owed by the swapper to the pool, a positive amount
/// is owed by the pool to the swapper.
pub type BalanceDelta = I256;

/// Type representing before swap delta.
pub type BeforeSwapDelta = I256;

/// Packs `amount0` and `amount1` into a [`BalanceDelta`].
#[must_use]
pub fn to_balance_delta(amount0: i128, amount1: i128) -> BalanceDelta {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(&amount0.to_be_bytes());
    bytes[16..].copy_from_slice(&amount1.to_be_bytes());
    I256::from_be_bytes(bytes)
}

/// Splits a [`BalanceDelta`] into `(amount0, amount1)`.
#[must_use]
pub fn amounts(delta: BalanceDelta) -> (i128, i128) {
    let bytes: [u8; 32] = delta.to_be_bytes();
    let mut amount0 = [0u8; 16];
    let mut amount1 = [0u8; 16];
    amount0.copy_from_slice(&bytes[..16]);
    amount1.copy_from_slice(&bytes[16..]);
    (i128::from_be_bytes(amount0), i128::from_be_bytes(amount1))
}
