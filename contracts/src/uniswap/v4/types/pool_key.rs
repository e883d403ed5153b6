use alloy_primitives::keccak256;
use alloy_sol_types::{sol, SolValue};
use stylus_sdk::prelude::AbiType;

use super::PoolId;

sol! {
    /// Returns the key for identifying a pool.
    #[derive(Debug, AbiType)]
    struct PoolKey {
        /// The lower currency of the pool, sorted numerically.
        address currency0;
        /// The higher currency of the pool, sorted numerically.
        address currency1;
        /// The pool LP fee, capped at 1_000_000.
        /// If the highest bit is 1, the pool has a dynamic fee and
        /// must be exactly equal to 0x800000.
        uint24 fee;
        /// Ticks that involve positions must be a multiple of tick spacing.
        int24 tickSpacing;
        /// The hooks contract attached to the pool.
        address hooks;
    }
}

/// Type representing a currency of a pool (an ERC-20 token address).
pub type Currency = alloy_primitives::Address;

/// Fee value marking a pool whose LP fee is supplied by its hook.
pub const DYNAMIC_FEE_FLAG: u32 = 0x80_0000;

/// Maximum LP fee, in hundredths of a bip.
pub const MAX_LP_FEE: u32 = 1_000_000;

impl PoolKey {
    /// Returns the [`PoolId`] of this pool.
    #[must_use]
    pub fn id(&self) -> PoolId {
        keccak256(self.abi_encode())
    }

    /// Returns true if the pool's LP fee is provided by its hook on every
    /// swap.
    #[must_use]
    pub fn is_dynamic_fee(&self) -> bool {
        self.fee.to::<u32>() == DYNAMIC_FEE_FLAG
    }

    /// Returns true if `currency` is one of the two pool currencies.
    #[must_use]
    pub fn contains(&self, currency: Currency) -> bool {
        self.currency0 == currency || self.currency1 == currency
    }
}

impl From<PoolKey> for PoolId {
    fn from(value: PoolKey) -> Self {
        value.id()
    }
}

impl From<&PoolKey> for PoolId {
    fn from(value: &PoolKey) -> Self {
        value.id()
    }
}
