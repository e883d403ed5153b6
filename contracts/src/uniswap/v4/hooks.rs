//! Uniswap V4 Hooks Interface.
//!
//! V4 decides whether to invoke specific hooks by inspecting the least
//! significant bits of the address that the hooks contract is deployed to.
//! For example, a hooks contract deployed to address:
//! 0x00000000000000000000000000000000000000C0
//! has the lowest bits '1100 0000' which would cause the 'before swap' and
//! 'after swap' hooks to be used, and nothing else.
//!
//! The address therefore has to be mined before deployment (see the
//! `hook-miner` crate), and a hook checks at construction time that it landed
//! on an address matching the callbacks it actually implements.
//!
//! Should only be callable by the v4 PoolManager.
use alloc::vec::Vec;

use alloy_primitives::{keccak256, Address, FixedBytes, I128};
pub use sol::*;
use stylus_sdk::{abi::Bytes, prelude::*};

use crate::uniswap::v4::{
    BalanceDelta, BeforeSwapDelta, PoolKey, SwapParams, U24,
};

/// Flag bit of the `beforeInitialize` callback.
pub const BEFORE_INITIALIZE_FLAG: u16 = 1 << 13;
/// Flag bit of the `afterInitialize` callback.
pub const AFTER_INITIALIZE_FLAG: u16 = 1 << 12;
/// Flag bit of the `beforeAddLiquidity` callback.
pub const BEFORE_ADD_LIQUIDITY_FLAG: u16 = 1 << 11;
/// Flag bit of the `afterAddLiquidity` callback.
pub const AFTER_ADD_LIQUIDITY_FLAG: u16 = 1 << 10;
/// Flag bit of the `beforeRemoveLiquidity` callback.
pub const BEFORE_REMOVE_LIQUIDITY_FLAG: u16 = 1 << 9;
/// Flag bit of the `afterRemoveLiquidity` callback.
pub const AFTER_REMOVE_LIQUIDITY_FLAG: u16 = 1 << 8;
/// Flag bit of the `beforeSwap` callback.
pub const BEFORE_SWAP_FLAG: u16 = 1 << 7;
/// Flag bit of the `afterSwap` callback.
pub const AFTER_SWAP_FLAG: u16 = 1 << 6;
/// Flag bit of the `beforeDonate` callback.
pub const BEFORE_DONATE_FLAG: u16 = 1 << 5;
/// Flag bit of the `afterDonate` callback.
pub const AFTER_DONATE_FLAG: u16 = 1 << 4;
/// Flag bit allowing `beforeSwap` to return a delta.
pub const BEFORE_SWAP_RETURNS_DELTA_FLAG: u16 = 1 << 3;
/// Flag bit allowing `afterSwap` to return a delta.
pub const AFTER_SWAP_RETURNS_DELTA_FLAG: u16 = 1 << 2;
/// Flag bit allowing `afterAddLiquidity` to return a delta.
pub const AFTER_ADD_LIQUIDITY_RETURNS_DELTA_FLAG: u16 = 1 << 1;
/// Flag bit allowing `afterRemoveLiquidity` to return a delta.
pub const AFTER_REMOVE_LIQUIDITY_RETURNS_DELTA_FLAG: u16 = 1;

/// Mask covering every flag bit of a hook address.
pub const ALL_HOOK_MASK: u16 = (1 << 14) - 1;

/// Bit set on a fee returned by `beforeSwap` to override the LP fee of a
/// dynamic-fee pool.
pub const OVERRIDE_FEE_FLAG: u32 = 0x40_0000;

/// Solidity signature of the `beforeSwap` callback.
pub const BEFORE_SWAP_SIGNATURE: &str = "beforeSwap(address,(address,address,uint24,int24,address),(bool,int256,uint160),bytes)";
/// Solidity signature of the `afterSwap` callback.
pub const AFTER_SWAP_SIGNATURE: &str = "afterSwap(address,(address,address,uint24,int24,address),(bool,int256,uint160),int256,bytes)";

#[cfg_attr(coverage_nightly, coverage(off))]
mod sol {
    use alloy_sol_macro::sol;
    use stylus_sdk::prelude::AbiType;

    sol! {
        /// The callbacks a hook implements, mirrored by the flag bits of its
        /// address.
        #[derive(Debug, AbiType)]
        #[allow(missing_docs)]
        struct Permissions {
            bool beforeInitialize;
            bool afterInitialize;
            bool beforeAddLiquidity;
            bool afterAddLiquidity;
            bool beforeRemoveLiquidity;
            bool afterRemoveLiquidity;
            bool beforeSwap;
            bool afterSwap;
            bool beforeDonate;
            bool afterDonate;
            bool beforeSwapReturnDelta;
            bool afterSwapReturnDelta;
            bool afterAddLiquidityReturnDelta;
            bool afterRemoveLiquidityReturnDelta;
        }
    }

    sol! {
        /// The flag bits of `hook` do not match the callbacks it implements.
        ///
        /// * `hook` - Address of the hook contract.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error InvalidHookAddress(address hook);
    }
}

/// An Uniswap V4 Hook error.
#[derive(SolidityError, Debug)]
pub enum Error {
    /// The flag bits of the hook address do not match its permissions.
    InvalidHookAddress(InvalidHookAddress),
}

impl Permissions {
    /// Permissions of a hook that only observes swaps: `beforeSwap` and
    /// `afterSwap`, without returning deltas.
    #[must_use]
    pub fn swap_only() -> Self {
        Permissions {
            beforeInitialize: false,
            afterInitialize: false,
            beforeAddLiquidity: false,
            afterAddLiquidity: false,
            beforeRemoveLiquidity: false,
            afterRemoveLiquidity: false,
            beforeSwap: true,
            afterSwap: true,
            beforeDonate: false,
            afterDonate: false,
            beforeSwapReturnDelta: false,
            afterSwapReturnDelta: false,
            afterAddLiquidityReturnDelta: false,
            afterRemoveLiquidityReturnDelta: false,
        }
    }

    /// Returns the flag bits an address must carry for these permissions.
    #[must_use]
    pub fn flags(&self) -> u16 {
        [
            (self.beforeInitialize, BEFORE_INITIALIZE_FLAG),
            (self.afterInitialize, AFTER_INITIALIZE_FLAG),
            (self.beforeAddLiquidity, BEFORE_ADD_LIQUIDITY_FLAG),
            (self.afterAddLiquidity, AFTER_ADD_LIQUIDITY_FLAG),
            (self.beforeRemoveLiquidity, BEFORE_REMOVE_LIQUIDITY_FLAG),
            (self.afterRemoveLiquidity, AFTER_REMOVE_LIQUIDITY_FLAG),
            (self.beforeSwap, BEFORE_SWAP_FLAG),
            (self.afterSwap, AFTER_SWAP_FLAG),
            (self.beforeDonate, BEFORE_DONATE_FLAG),
            (self.afterDonate, AFTER_DONATE_FLAG),
            (self.beforeSwapReturnDelta, BEFORE_SWAP_RETURNS_DELTA_FLAG),
            (self.afterSwapReturnDelta, AFTER_SWAP_RETURNS_DELTA_FLAG),
            (
                self.afterAddLiquidityReturnDelta,
                AFTER_ADD_LIQUIDITY_RETURNS_DELTA_FLAG,
            ),
            (
                self.afterRemoveLiquidityReturnDelta,
                AFTER_REMOVE_LIQUIDITY_RETURNS_DELTA_FLAG,
            ),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(0, |flags, (_, flag)| flags | flag)
    }
}

/// Returns the flag bits encoded in `hook`'s address.
#[must_use]
pub fn address_flags(hook: Address) -> u16 {
    let low = u16::from_be_bytes([hook[18], hook[19]]);
    low & ALL_HOOK_MASK
}

/// Returns true if the flag bits of `hook` are exactly `flags`: every
/// required bit set and every other flag bit clear.
#[must_use]
pub fn has_exact_flags(hook: Address, flags: u16) -> bool {
    address_flags(hook) == flags & ALL_HOOK_MASK
}

/// Checks that `hook` was deployed to an address matching `permissions`.
///
/// # Arguments
///
/// * `hook` - Address of the hook contract.
/// * `permissions` - Callbacks the hook implements.
///
/// # Errors
///
/// * [`Error::InvalidHookAddress`] - If the address bits differ from the
///   permission flags.
pub fn validate_hook_permissions(
    hook: Address,
    permissions: &Permissions,
) -> Result<(), Error> {
    if has_exact_flags(hook, permissions.flags()) {
        Ok(())
    } else {
        Err(Error::InvalidHookAddress(InvalidHookAddress { hook }))
    }
}

/// Computes the 4-byte selector of a Solidity function signature.
#[must_use]
pub fn selector(signature: &str) -> FixedBytes<4> {
    let hash = keccak256(signature.as_bytes());
    FixedBytes::from([hash[0], hash[1], hash[2], hash[3]])
}

/// Swap-lifecycle subset of the Uniswap V4 hooks interface.
///
/// The pool manager only invokes callbacks whose flag bits are set in the
/// hook address, so a hook mined for [`Permissions::swap_only`] exposes just
/// these entry points.
pub trait IHooks {
    /// The error type associated to this trait implementation.
    type Error: Into<Vec<u8>>;

    /// Returns the callbacks implemented by this hook.
    ///
    /// # Arguments
    ///
    /// * `&self` - Read access to the contract's state.
    fn get_hook_permissions(&self) -> Permissions;

    /// The hook called before a swap.
    ///
    /// Returns tuple containing the function selector for the hook, and
    /// the hook's delta in specified and unspecified currencies, and
    /// optionally override the lp fee, only used if three conditions are met:
    /// 1. the Pool has a dynamic fee,
    /// 2. the value's 2nd highest bit is set (23rd bit, 0x400000), and
    /// 3. the value is less than or equal to the maximum fee (1 million).
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the contract's state.
    /// * `sender` - The initial msg::sender() for the swap call.
    /// * `key` - The key for the pool.
    /// * `params` - The parameters for the swap.
    /// * `hook_data` - Arbitrary data handed into the Pool Manager by the
    ///   swapper to be be passed on to the hook.
    ///
    /// # Errors
    ///
    /// May return [`Self::Error`].
    fn before_swap(
        &mut self,
        sender: Address,
        key: PoolKey,
        params: SwapParams,
        hook_data: Bytes,
    ) -> Result<(FixedBytes<4>, BeforeSwapDelta, U24), Self::Error>;

    /// The hook called after a swap.
    ///
    /// Returns the function selector for the hook, and
    /// the hook's delta in unspecified currency.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the contract's state.
    /// * `sender` - The initial msg::sender() for the swap call.
    /// * `key` - The key for the pool.
    /// * `params` - The parameters for the swap.
    /// * `delta` - The amount owed to the caller (positive), or owed to the
    ///   pool (negative).
    /// * `hook_data` - Arbitrary data handed into the Pool Manager by the
    ///   swapper to be be passed on to the hook.
    ///
    /// # Errors
    ///
    /// May return [`Self::Error`].
    fn after_swap(
        &mut self,
        sender: Address,
        key: PoolKey,
        params: SwapParams,
        delta: BalanceDelta,
        hook_data: Bytes,
    ) -> Result<(FixedBytes<4>, I128), Self::Error>;
}
