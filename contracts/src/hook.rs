//! Uniswap V4 hook that manages deposited liquidity across pools and
//! rebalances it toward the best yield.
//!
//! Users deposit ERC-20 tokens into the hook's custody and allocate part of
//! their balance to managed pools. The pool manager notifies the hook around
//! every swap; the share of the swap fee attributable to hook-managed
//! liquidity raises the pool's yield index, which users can claim against.
//! After each swap the rebalance engine looks for yield imbalances between
//! managed pools and either proposes or executes a move of the hook's own
//! reserve liquidity.
//!
//! Only `beforeSwap` and `afterSwap` are implemented, so the hook must be
//! deployed to an address whose flag bits are exactly
//! [`BEFORE_SWAP_FLAG`] `|` [`AFTER_SWAP_FLAG`] (`0xC0`). The constructor
//! refuses any other address.
//!
//! Every mutating entry point runs under a [`ReentrancyGuard`]: a nested
//! entry, for instance a token calling back into the hook during a transfer,
//! fails with [`ReentrantCallback`].
use alloc::{vec, vec::Vec};

use alloy_primitives::{
    keccak256, Address, FixedBytes, B256, I128, I256, U16, U256,
};
use alloy_sol_types::SolValue;
pub use sol::*;
use stylus_sdk::{
    abi::Bytes,
    block,
    call::{Call, MethodError},
    contract, evm, msg,
    prelude::*,
    storage::{
        StorageAddress, StorageB256, StorageMap, StorageU16, StorageU256,
        StorageVec,
    },
};

use crate::{
    ledger::{self, DepositLedger, InsufficientBalance, ZeroAmount},
    rebalance::{
        self, evaluate, InvalidRebalanceConfig, PoolSnapshot, RebalanceConfig,
        RebalanceCooldownActive, RebalanceEngine, RebalanceProposal,
        RebalanceProposed,
    },
    token::Erc20Interface,
    uniswap::v4::{
        hooks::{
            self, selector, validate_hook_permissions, InvalidHookAddress,
            Permissions, AFTER_SWAP_SIGNATURE, BEFORE_SWAP_SIGNATURE,
            OVERRIDE_FEE_FLAG,
        },
        BalanceDelta, BeforeSwapDelta, IHooks, PoolId, PoolKey, SwapParams,
        MAX_LP_FEE, U24,
    },
    utils::{
        math::{self, ArithmeticOverflow, ArithmeticUnderflow, BPS},
        reentrancy_guard::{self, ReentrantCallback},
        ReentrancyGuard,
    },
    yield_tracker::{
        self, InvalidPool, PoolAlreadyManaged, UnmanagedPool, YieldTracker,
    },
};
#[cfg(doc)]
use crate::uniswap::v4::hooks::{AFTER_SWAP_FLAG, BEFORE_SWAP_FLAG};

/// Maximum number of pools the hook manages at once. Bounds the work done
/// by each rebalance evaluation.
pub const MAX_MANAGED_POOLS: usize = 16;

#[cfg_attr(coverage_nightly, coverage(off))]
mod sol {
    use alloy_sol_macro::sol;

    sol! {
        /// Emitted when `user` moves `amount` of free balance into a pool.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event Allocated(address indexed user, bytes32 indexed pool_id, uint256 amount);

        /// Emitted when `user` moves `amount` out of a pool back into free
        /// balance.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event Deallocated(address indexed user, bytes32 indexed pool_id, uint256 amount);

        /// Emitted when `user` is paid the yield earned in a pool.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event YieldClaimed(
            address indexed user,
            bytes32 indexed pool_id,
            address token,
            uint256 amount
        );

        /// Emitted when the owner puts a pool under management.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event PoolRegistered(bytes32 indexed pool_id, address token, uint16 hook_share_bps);

        /// Emitted when the owner adds protocol-owned liquidity to a pool.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event ReserveSeeded(bytes32 indexed pool_id, uint256 amount);

        /// Emitted when the owner takes protocol-owned liquidity out of a
        /// pool.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event ReserveUnseeded(bytes32 indexed pool_id, uint256 amount);

        /// Emitted when ownership gets transferred between accounts.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event OwnershipTransferred(address indexed previous_owner, address indexed new_owner);
    }

    sol! {
        /// A pool callback was invoked by an account other than the pool
        /// manager.
        ///
        /// * `caller` - Account that invoked the callback.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error HookUnauthorized(address caller);

        /// The caller account is not authorized to perform an operation.
        ///
        /// * `account` - Account that was found to not be authorized.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error OwnableUnauthorizedAccount(address account);

        /// An address argument is not usable, e.g. [`Address::ZERO`].
        ///
        /// * `account` - The rejected address.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error InvalidAddress(address account);

        /// `beforeSwap` was called for a pool whose previous swap did not
        /// complete.
        ///
        /// * `pool_id` - Identifier of the pool.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error SwapInFlight(bytes32 pool_id);

        /// `afterSwap` does not match the swap announced by `beforeSwap`.
        ///
        /// * `swap_id` - Identifier computed for the reported swap.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error UnknownSwap(bytes32 swap_id);

        /// A call to `token` reverted or returned `false`.
        ///
        /// * `token` - Address of the token.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error TokenTransferFailed(address token);
    }
}

/// An error that occurred in the [`YieldOptimizerHook`] contract.
#[derive(SolidityError, Debug)]
pub enum Error {
    /// A pool callback came from an account other than the pool manager.
    HookUnauthorized(HookUnauthorized),
    /// An admin entry point was called by an account other than the owner.
    UnauthorizedAccount(OwnableUnauthorizedAccount),
    /// An address argument is not usable.
    InvalidAddress(InvalidAddress),
    /// The contract's address does not carry the swap flags.
    InvalidHookAddress(InvalidHookAddress),
    /// The account does not hold enough balance.
    InsufficientBalance(InsufficientBalance),
    /// The amount is zero.
    ZeroAmount(ZeroAmount),
    /// A guarded entry point was re-entered.
    ReentrantCallback(ReentrantCallback),
    /// An accounting update would exceed the range of `uint256`.
    Overflow(ArithmeticOverflow),
    /// An accounting update would go below zero.
    Underflow(ArithmeticUnderflow),
    /// The pool is not managed.
    UnmanagedPool(UnmanagedPool),
    /// The pool is already managed.
    PoolAlreadyManaged(PoolAlreadyManaged),
    /// The pool cannot be used for the requested operation.
    InvalidPool(InvalidPool),
    /// The pool's previous swap has not completed.
    SwapInFlight(SwapInFlight),
    /// The reported swap was never announced, or was already settled.
    UnknownSwap(UnknownSwap),
    /// A token call reverted or returned `false`.
    TokenTransferFailed(TokenTransferFailed),
    /// One of the pools is cooling down after a rebalance.
    CooldownActive(RebalanceCooldownActive),
    /// The rebalance configuration is out of range.
    InvalidRebalanceConfig(InvalidRebalanceConfig),
}

impl From<math::Error> for Error {
    fn from(value: math::Error) -> Self {
        match value {
            math::Error::Overflow(e) => Error::Overflow(e),
            math::Error::Underflow(e) => Error::Underflow(e),
        }
    }
}

impl From<ledger::Error> for Error {
    fn from(value: ledger::Error) -> Self {
        match value {
            ledger::Error::InsufficientBalance(e) => {
                Error::InsufficientBalance(e)
            }
            ledger::Error::ZeroAmount(e) => Error::ZeroAmount(e),
            ledger::Error::Overflow(e) => Error::Overflow(e),
            ledger::Error::Underflow(e) => Error::Underflow(e),
        }
    }
}

impl From<yield_tracker::Error> for Error {
    fn from(value: yield_tracker::Error) -> Self {
        match value {
            yield_tracker::Error::UnmanagedPool(e) => Error::UnmanagedPool(e),
            yield_tracker::Error::PoolAlreadyManaged(e) => {
                Error::PoolAlreadyManaged(e)
            }
            yield_tracker::Error::InsufficientBalance(e) => {
                Error::InsufficientBalance(e)
            }
            yield_tracker::Error::Overflow(e) => Error::Overflow(e),
            yield_tracker::Error::Underflow(e) => Error::Underflow(e),
        }
    }
}

impl From<rebalance::Error> for Error {
    fn from(value: rebalance::Error) -> Self {
        match value {
            rebalance::Error::CooldownActive(e) => Error::CooldownActive(e),
            rebalance::Error::InvalidConfig(e) => {
                Error::InvalidRebalanceConfig(e)
            }
            rebalance::Error::InvalidPool(e) => Error::InvalidPool(e),
            rebalance::Error::ZeroAmount(e) => Error::ZeroAmount(e),
            rebalance::Error::UnmanagedPool(e) => Error::UnmanagedPool(e),
            rebalance::Error::PoolAlreadyManaged(e) => {
                Error::PoolAlreadyManaged(e)
            }
            rebalance::Error::InsufficientBalance(e) => {
                Error::InsufficientBalance(e)
            }
            rebalance::Error::Overflow(e) => Error::Overflow(e),
            rebalance::Error::Underflow(e) => Error::Underflow(e),
        }
    }
}

impl From<reentrancy_guard::Error> for Error {
    fn from(value: reentrancy_guard::Error) -> Self {
        match value {
            reentrancy_guard::Error::Reentrant(e) => Error::ReentrantCallback(e),
        }
    }
}

impl From<hooks::Error> for Error {
    fn from(value: hooks::Error) -> Self {
        match value {
            hooks::Error::InvalidHookAddress(e) => Error::InvalidHookAddress(e),
        }
    }
}

impl MethodError for Error {
    fn encode(self) -> Vec<u8> {
        self.into()
    }
}

/// State of a [`YieldOptimizerHook`] contract.
#[storage]
pub struct YieldOptimizerHook {
    /// The only account allowed to invoke pool callbacks.
    pub(crate) pool_manager: StorageAddress,
    /// Account allowed to call admin entry points.
    pub(crate) owner: StorageAddress,
    /// User deposits held in custody.
    pub(crate) ledger: DepositLedger,
    /// Yield accounting of managed pools.
    pub(crate) tracker: YieldTracker,
    /// Rebalance configuration and cooldowns.
    pub(crate) engine: RebalanceEngine,
    /// Lock shared by every mutating entry point.
    pub(crate) guard: ReentrancyGuard,
    /// Identifiers of the managed pools, in registration order.
    pub(crate) pools: StorageVec<StorageB256>,
    /// Share of each pool's LP fee attributed to managed liquidity, in basis
    /// points.
    pub(crate) hook_share_bps: StorageMap<PoolId, StorageU16>,
    /// Identifier of the swap announced by `beforeSwap`, per pool.
    pub(crate) in_flight: StorageMap<PoolId, StorageB256>,
    /// Number of completed swaps, per pool.
    pub(crate) nonces: StorageMap<PoolId, StorageU256>,
}

/// NOTE: Implementation of [`TopLevelStorage`] to be able use `&mut self` when
/// calling other contracts and not `&mut (impl TopLevelStorage +
/// BorrowMut<Self>)`. Should be fixed in the future by the Stylus team.
unsafe impl TopLevelStorage for YieldOptimizerHook {}

#[public]
#[implements(IHooks<Error = Error>)]
impl YieldOptimizerHook {
    /// Constructor.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the contract's state.
    /// * `pool_manager` - The v4 pool manager allowed to invoke callbacks.
    /// * `initial_owner` - Account allowed to call admin entry points.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidHookAddress`] - If the contract's address does not
    ///   carry exactly the `beforeSwap` and `afterSwap` flags.
    /// * [`Error::InvalidAddress`] - If `pool_manager` or `initial_owner` is
    ///   [`Address::ZERO`].
    #[constructor]
    pub fn constructor(
        &mut self,
        pool_manager: Address,
        initial_owner: Address,
    ) -> Result<(), Error> {
        validate_hook_permissions(
            contract::address(),
            &Permissions::swap_only(),
        )?;
        for account in [pool_manager, initial_owner] {
            if account.is_zero() {
                return Err(Error::InvalidAddress(InvalidAddress { account }));
            }
        }

        self.pool_manager.set(pool_manager);
        self.engine.set_config(RebalanceConfig::default())?;
        self.transfer_ownership_unchecked(initial_owner);
        Ok(())
    }

    /// Pulls `amount` of `token` from the caller and credits it to the
    /// caller's balance. The caller must have approved the hook beforehand.
    ///
    /// # Errors
    ///
    /// * [`Error::ReentrantCallback`] - If called while another entry point
    ///   is executing.
    /// * [`Error::ZeroAmount`] - If `amount` is zero.
    /// * [`Error::TokenTransferFailed`] - If the token refuses the transfer.
    /// * [`Error::Overflow`] - If the balance would exceed `U256::MAX`.
    ///
    /// # Events
    ///
    /// * [`ledger::Deposited`].
    pub fn deposit(&mut self, token: Address, amount: U256) -> Result<(), Error> {
        self.non_reentrant(|hook| {
            if amount.is_zero() {
                return Err(ZeroAmount {}.into());
            }
            let user = msg::sender();
            hook.pull(token, user, amount)?;
            hook.ledger.deposit(user, token, amount)?;
            Ok(())
        })
    }

    /// Pays `amount` of `token` out of the caller's free balance.
    ///
    /// # Errors
    ///
    /// * [`Error::ReentrantCallback`] - If called while another entry point
    ///   is executing.
    /// * [`Error::ZeroAmount`] - If `amount` is zero.
    /// * [`Error::InsufficientBalance`] - If `amount` exceeds the caller's
    ///   free balance.
    /// * [`Error::TokenTransferFailed`] - If the token refuses the transfer.
    ///
    /// # Events
    ///
    /// * [`ledger::Withdrawn`].
    pub fn withdraw(&mut self, token: Address, amount: U256) -> Result<(), Error> {
        self.non_reentrant(|hook| {
            let user = msg::sender();
            hook.require_available(user, token, amount)?;
            hook.push(token, user, amount)?;
            hook.ledger.withdraw(user, token, amount)?;
            Ok(())
        })
    }

    /// Moves `amount` of the caller's free balance of the pool's managed
    /// token into the pool.
    ///
    /// # Errors
    ///
    /// * [`Error::ReentrantCallback`] - If called while another entry point
    ///   is executing.
    /// * [`Error::UnmanagedPool`] - If the pool is not managed.
    /// * [`Error::ZeroAmount`] - If `amount` is zero.
    /// * [`Error::InsufficientBalance`] - If `amount` exceeds the caller's
    ///   free balance.
    ///
    /// # Events
    ///
    /// * [`Allocated`].
    pub fn allocate(&mut self, key: PoolKey, amount: U256) -> Result<(), Error> {
        self.non_reentrant(|hook| {
            let user = msg::sender();
            let pool_id = key.id();
            hook.add_position(pool_id, user, amount)?;
            evm::log(Allocated { user, pool_id, amount });
            Ok(())
        })
    }

    /// Moves `amount` of the caller's liquidity out of the pool back into
    /// free balance. Yield earned so far stays claimable.
    ///
    /// # Errors
    ///
    /// * [`Error::ReentrantCallback`] - If called while another entry point
    ///   is executing.
    /// * [`Error::UnmanagedPool`] - If the pool is not managed.
    /// * [`Error::ZeroAmount`] - If `amount` is zero.
    /// * [`Error::InsufficientBalance`] - If `amount` exceeds the caller's
    ///   liquidity in the pool.
    ///
    /// # Events
    ///
    /// * [`Deallocated`].
    pub fn deallocate(
        &mut self,
        key: PoolKey,
        amount: U256,
    ) -> Result<(), Error> {
        self.non_reentrant(|hook| {
            let user = msg::sender();
            let pool_id = key.id();
            hook.remove_position(pool_id, user, amount)?;
            evm::log(Deallocated { user, pool_id, amount });
            Ok(())
        })
    }

    /// Pays the caller the yield earned in a pool, in the pool's managed
    /// token, and returns the amount paid.
    ///
    /// Yield is paid out of tokens the hook holds beyond its deposits, so a
    /// claim can never consume another user's balance.
    ///
    /// # Errors
    ///
    /// * [`Error::ReentrantCallback`] - If called while another entry point
    ///   is executing.
    /// * [`Error::UnmanagedPool`] - If the pool is not managed.
    /// * [`Error::InsufficientBalance`] - If the hook does not hold enough
    ///   surplus tokens to pay the yield.
    /// * [`Error::TokenTransferFailed`] - If the token refuses the transfer.
    ///
    /// # Events
    ///
    /// * [`YieldClaimed`] - If a non-zero amount is paid.
    pub fn claim_yield(&mut self, key: PoolKey) -> Result<U256, Error> {
        self.non_reentrant(|hook| {
            let user = msg::sender();
            hook.pay_yield(key.id(), user, user)
        })
    }

    /// Returns the balance of `token` deposited by `user`.
    pub fn balance_of(&self, user: Address, token: Address) -> U256 {
        self.ledger.balance_of(user, token)
    }

    /// Returns the sum of all deposits of `token`.
    pub fn total_of(&self, token: Address) -> U256 {
        self.ledger.total_of(token)
    }

    /// Returns the part of `user`'s balance of `token` held in pools.
    pub fn allocated_of(&self, user: Address, token: Address) -> U256 {
        self.ledger.allocated_of(user, token)
    }

    /// Returns the yield `user` can claim from a pool.
    ///
    /// # Errors
    ///
    /// * [`Error::Overflow`] - If the yield exceeds `U256::MAX`.
    pub fn yield_of(&self, key: PoolKey, user: Address) -> Result<U256, Error> {
        Ok(self.tracker.yield_of(key.id(), user)?)
    }

    /// Returns the yield index of a pool.
    pub fn yield_index(&self, key: PoolKey) -> U256 {
        self.tracker.index_of(key.id())
    }

    /// Returns the liquidity managed by the hook in a pool, user and reserve
    /// positions combined.
    pub fn managed_liquidity(&self, key: PoolKey) -> U256 {
        self.tracker.liquidity_of(key.id())
    }

    /// Returns the protocol-owned liquidity of a pool.
    pub fn reserve_of(&self, key: PoolKey) -> U256 {
        self.tracker.shares_of(key.id(), contract::address())
    }

    /// Returns true if the pool is managed by the hook.
    pub fn is_managed(&self, key: PoolKey) -> bool {
        self.tracker.is_managed(key.id())
    }

    /// Returns the timestamp until which a pool rests after a rebalance.
    pub fn cooldown_until(&self, key: PoolKey) -> u64 {
        self.engine.cooldown_until(key.id())
    }

    /// Returns the pool manager allowed to invoke callbacks.
    pub fn pool_manager(&self) -> Address {
        self.pool_manager.get()
    }

    /// Returns the address of the current owner.
    pub fn owner(&self) -> Address {
        self.owner.get()
    }

    /// Returns the rebalance configuration as `(trigger_bps, min_trade,
    /// max_move_bps, cooldown, auto_rebalance, dynamic_fee)`.
    pub fn rebalance_config(&self) -> (u16, U256, u16, u64, bool, u32) {
        let config = self.engine.config();
        (
            config.trigger_bps,
            config.min_trade,
            config.max_move_bps,
            config.cooldown,
            config.auto_rebalance,
            config.dynamic_fee,
        )
    }

    /// Puts a pool under management. Yield in the pool is measured in
    /// `managed_token`, and `hook_share_bps` of its LP fee is attributed to
    /// managed liquidity.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedAccount`] - If not called by the owner.
    /// * [`Error::InvalidPool`] - If the pool is not attached to this hook,
    ///   `managed_token` is not one of its currencies, `hook_share_bps` is
    ///   outside `1..=10_000`, or [`MAX_MANAGED_POOLS`] is reached.
    /// * [`Error::PoolAlreadyManaged`] - If the pool is already managed.
    ///
    /// # Events
    ///
    /// * [`PoolRegistered`].
    pub fn register_pool(
        &mut self,
        key: PoolKey,
        managed_token: Address,
        hook_share_bps: u16,
    ) -> Result<(), Error> {
        self.only_owner()?;
        self.non_reentrant(|hook| {
            let pool_id = key.id();
            let valid = key.hooks == contract::address()
                && key.contains(managed_token)
                && (1..=10_000).contains(&hook_share_bps)
                && (key.is_dynamic_fee() || key.fee.to::<u32>() <= MAX_LP_FEE)
                && hook.pools.len() < MAX_MANAGED_POOLS;
            if !valid {
                return Err(InvalidPool { pool_id }.into());
            }

            hook.tracker.register(pool_id, managed_token, block::timestamp())?;
            hook.pools.push(pool_id);
            hook.hook_share_bps.setter(pool_id).set(U16::from(hook_share_bps));

            evm::log(PoolRegistered {
                pool_id,
                token: managed_token,
                hook_share_bps,
            });
            Ok(())
        })
    }

    /// Replaces the rebalance configuration.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedAccount`] - If not called by the owner.
    /// * [`Error::InvalidRebalanceConfig`] - If a value is out of range.
    ///
    /// # Events
    ///
    /// * [`rebalance::RebalanceConfigUpdated`].
    pub fn set_rebalance_config(
        &mut self,
        trigger_bps: u16,
        min_trade: U256,
        max_move_bps: u16,
        cooldown: u64,
        auto_rebalance: bool,
        dynamic_fee: u32,
    ) -> Result<(), Error> {
        self.only_owner()?;
        self.engine.set_config(RebalanceConfig {
            trigger_bps,
            min_trade,
            max_move_bps,
            cooldown,
            auto_rebalance,
            dynamic_fee,
        })?;
        Ok(())
    }

    /// Pulls `amount` of the pool's managed token from the owner and adds it
    /// to the pool as protocol-owned liquidity. Only this liquidity is ever
    /// moved by rebalances.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedAccount`] - If not called by the owner.
    /// * [`Error::UnmanagedPool`] - If the pool is not managed.
    /// * [`Error::ZeroAmount`] - If `amount` is zero.
    /// * [`Error::TokenTransferFailed`] - If the token refuses the transfer.
    ///
    /// # Events
    ///
    /// * [`ReserveSeeded`].
    pub fn seed_reserve(&mut self, key: PoolKey, amount: U256) -> Result<(), Error> {
        self.only_owner()?;
        self.non_reentrant(|hook| {
            let pool_id = key.id();
            hook.require_managed(pool_id)?;
            if amount.is_zero() {
                return Err(ZeroAmount {}.into());
            }

            let reserve = contract::address();
            let token = hook.tracker.token_of(pool_id);
            hook.pull(token, msg::sender(), amount)?;
            hook.ledger.deposit(reserve, token, amount)?;
            hook.add_position(pool_id, reserve, amount)?;

            evm::log(ReserveSeeded { pool_id, amount });
            Ok(())
        })
    }

    /// Takes `amount` of protocol-owned liquidity out of the pool and pays
    /// it to the owner.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedAccount`] - If not called by the owner.
    /// * [`Error::UnmanagedPool`] - If the pool is not managed.
    /// * [`Error::ZeroAmount`] - If `amount` is zero.
    /// * [`Error::InsufficientBalance`] - If the pool's reserve is smaller
    ///   than `amount`.
    /// * [`Error::TokenTransferFailed`] - If the token refuses the transfer.
    ///
    /// # Events
    ///
    /// * [`ReserveUnseeded`].
    pub fn unseed_reserve(
        &mut self,
        key: PoolKey,
        amount: U256,
    ) -> Result<(), Error> {
        self.only_owner()?;
        self.non_reentrant(|hook| {
            let pool_id = key.id();
            hook.require_managed(pool_id)?;
            if amount.is_zero() {
                return Err(ZeroAmount {}.into());
            }

            let reserve = contract::address();
            let token = hook.tracker.token_of(pool_id);
            let available = hook.tracker.shares_of(pool_id, reserve);
            if amount > available {
                return Err(InsufficientBalance {
                    account: reserve,
                    token,
                    available,
                    needed: amount,
                }
                .into());
            }

            hook.push(token, msg::sender(), amount)?;
            hook.remove_position(pool_id, reserve, amount)?;
            hook.ledger.withdraw(reserve, token, amount)?;

            evm::log(ReserveUnseeded { pool_id, amount });
            Ok(())
        })
    }

    /// Pays the owner the yield earned by the pool's protocol-owned
    /// liquidity and returns the amount paid.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedAccount`] - If not called by the owner.
    /// * [`Error::UnmanagedPool`] - If the pool is not managed.
    /// * [`Error::InsufficientBalance`] - If the hook does not hold enough
    ///   surplus tokens to pay the yield.
    /// * [`Error::TokenTransferFailed`] - If the token refuses the transfer.
    ///
    /// # Events
    ///
    /// * [`YieldClaimed`] - If a non-zero amount is paid, with the hook as
    ///   `user`.
    pub fn claim_reserve_yield(&mut self, key: PoolKey) -> Result<U256, Error> {
        self.only_owner()?;
        self.non_reentrant(|hook| {
            hook.pay_yield(key.id(), contract::address(), msg::sender())
        })
    }

    /// Moves `amount` of protocol-owned liquidity from one pool to another,
    /// subject to the same cooldown as automatic rebalances.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedAccount`] - If not called by the owner.
    /// * [`Error::CooldownActive`] - If either pool is cooling down.
    /// * [`Error::InsufficientBalance`] - If the source reserve is smaller
    ///   than `amount`.
    /// * [`Error::InvalidPool`] - If the pools are the same or their managed
    ///   tokens differ.
    /// * [`Error::UnmanagedPool`] - If either pool is not managed.
    ///
    /// # Events
    ///
    /// * [`rebalance::Rebalanced`].
    pub fn execute_rebalance(
        &mut self,
        from_key: PoolKey,
        to_key: PoolKey,
        amount: U256,
    ) -> Result<(), Error> {
        self.only_owner()?;
        self.non_reentrant(|hook| {
            let now = block::timestamp();
            let from = from_key.id();
            let proposal = RebalanceProposal {
                from,
                to: to_key.id(),
                token: hook.tracker.token_of(from),
                amount,
                timestamp: now,
            };
            hook.engine.execute(
                &mut hook.tracker,
                contract::address(),
                &proposal,
                now,
            )?;
            Ok(())
        })
    }

    /// Transfers ownership of the contract to `new_owner`.
    ///
    /// # Errors
    ///
    /// * [`Error::UnauthorizedAccount`] - If not called by the owner.
    /// * [`Error::InvalidAddress`] - If `new_owner` is [`Address::ZERO`].
    ///
    /// # Events
    ///
    /// * [`OwnershipTransferred`].
    pub fn transfer_ownership(&mut self, new_owner: Address) -> Result<(), Error> {
        self.only_owner()?;
        if new_owner.is_zero() {
            return Err(InvalidAddress { account: new_owner }.into());
        }
        self.transfer_ownership_unchecked(new_owner);
        Ok(())
    }
}

#[public]
impl IHooks for YieldOptimizerHook {
    type Error = Error;

    fn get_hook_permissions(&self) -> Permissions {
        Permissions::swap_only()
    }

    fn before_swap(
        &mut self,
        sender: Address,
        key: PoolKey,
        params: SwapParams,
        _hook_data: Bytes,
    ) -> Result<(FixedBytes<4>, BeforeSwapDelta, U24), Error> {
        self.only_pool_manager()?;
        self.non_reentrant(|hook| {
            let pool_id = key.id();
            let mut fee = U24::ZERO;

            if hook.tracker.is_managed(pool_id) {
                if !hook.in_flight.get(pool_id).is_zero() {
                    return Err(SwapInFlight { pool_id }.into());
                }
                let swap_id = hook.swap_id(pool_id, sender, &params);
                hook.in_flight.setter(pool_id).set(swap_id);

                if key.is_dynamic_fee() {
                    let lp_fee = hook.engine.config().dynamic_fee;
                    fee = U24::from(lp_fee | OVERRIDE_FEE_FLAG);
                }
            }

            Ok((selector(BEFORE_SWAP_SIGNATURE), BeforeSwapDelta::ZERO, fee))
        })
    }

    fn after_swap(
        &mut self,
        sender: Address,
        key: PoolKey,
        params: SwapParams,
        delta: BalanceDelta,
        _hook_data: Bytes,
    ) -> Result<(FixedBytes<4>, I128), Error> {
        self.only_pool_manager()?;
        self.non_reentrant(|hook| {
            let pool_id = key.id();

            if hook.tracker.is_managed(pool_id) {
                let swap_id = hook.swap_id(pool_id, sender, &params);
                let expected = hook.in_flight.get(pool_id);
                if expected.is_zero() || expected != swap_id {
                    return Err(UnknownSwap { swap_id }.into());
                }
                hook.in_flight.setter(pool_id).set(B256::ZERO);
                let nonce = hook.nonces.get(pool_id);
                hook.nonces.setter(pool_id).set(math::add(nonce, U256::ONE)?);

                let fee = hook.attributable_fee(&key, &params, delta)?;
                hook.tracker.roll_window(pool_id, block::timestamp());
                hook.tracker.on_swap_notification(pool_id, fee)?;
                hook.rebalance_after_swap(pool_id)?;
            }

            Ok((selector(AFTER_SWAP_SIGNATURE), I128::ZERO))
        })
    }
}

impl YieldOptimizerHook {
    /// Runs `f` while holding the reentrancy lock. The lock is released on
    /// every exit path of `f`.
    fn non_reentrant<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.guard.enter()?;
        let result = f(self);
        self.guard.exit();
        result
    }

    fn only_pool_manager(&self) -> Result<(), Error> {
        let caller = msg::sender();
        if caller != self.pool_manager.get() {
            return Err(HookUnauthorized { caller }.into());
        }
        Ok(())
    }

    fn only_owner(&self) -> Result<(), Error> {
        let account = msg::sender();
        if account != self.owner.get() {
            return Err(OwnableUnauthorizedAccount { account }.into());
        }
        Ok(())
    }

    fn transfer_ownership_unchecked(&mut self, new_owner: Address) {
        let previous_owner = self.owner.get();
        self.owner.set(new_owner);
        evm::log(OwnershipTransferred { previous_owner, new_owner });
    }

    fn require_managed(&self, pool_id: PoolId) -> Result<(), Error> {
        if self.tracker.is_managed(pool_id) {
            Ok(())
        } else {
            Err(UnmanagedPool { pool_id }.into())
        }
    }

    fn require_available(
        &self,
        user: Address,
        token: Address,
        amount: U256,
    ) -> Result<(), Error> {
        if amount.is_zero() {
            return Err(ZeroAmount {}.into());
        }
        let available = self.ledger.available_of(user, token);
        if amount > available {
            return Err(InsufficientBalance {
                account: user,
                token,
                available,
                needed: amount,
            }
            .into());
        }
        Ok(())
    }

    /// Allocates `amount` of `user`'s free balance to `pool_id`.
    fn add_position(
        &mut self,
        pool_id: PoolId,
        user: Address,
        amount: U256,
    ) -> Result<(), Error> {
        self.require_managed(pool_id)?;
        let token = self.tracker.token_of(pool_id);
        let delta = to_signed(amount)?;

        self.ledger.allocate(user, token, amount)?;
        self.tracker.on_deposit_or_withdraw(pool_id, user, delta)?;
        Ok(())
    }

    /// Releases `amount` of `user`'s liquidity in `pool_id`.
    fn remove_position(
        &mut self,
        pool_id: PoolId,
        user: Address,
        amount: U256,
    ) -> Result<(), Error> {
        self.require_managed(pool_id)?;
        if amount.is_zero() {
            return Err(ZeroAmount {}.into());
        }
        let token = self.tracker.token_of(pool_id);
        let delta = to_signed(amount)?;

        self.tracker.on_deposit_or_withdraw(pool_id, user, -delta)?;
        self.ledger.release(user, token, amount)?;
        Ok(())
    }

    /// Identifier of a swap: `keccak256(abi.encode(pool_id, sender, params,
    /// nonce))`.
    fn swap_id(
        &self,
        pool_id: PoolId,
        sender: Address,
        params: &SwapParams,
    ) -> B256 {
        let nonce = self.nonces.get(pool_id);
        let mut data = Vec::with_capacity(32 * 6);
        data.extend_from_slice(pool_id.as_slice());
        data.extend_from_slice(sender.into_word().as_slice());
        data.extend_from_slice(&params.abi_encode());
        data.extend_from_slice(&nonce.to_be_bytes::<32>());
        keccak256(data)
    }

    /// Part of the swap's LP fee earned by managed liquidity, denominated in
    /// the pool's managed token.
    ///
    /// The swap input is the negative side of `delta`. When it is paid in
    /// the managed token, the LP fee is `|input| * fee / 1_000_000` and the
    /// pool's hook share of it is attributed. Swaps paying in the other
    /// currency accrue nothing.
    fn attributable_fee(
        &self,
        key: &PoolKey,
        params: &SwapParams,
        delta: BalanceDelta,
    ) -> Result<U256, Error> {
        let pool_id = key.id();
        let (currency, input) = params.input_side(key, delta);
        if input >= 0 || currency != self.tracker.token_of(pool_id) {
            return Ok(U256::ZERO);
        }

        let lp_fee = if key.is_dynamic_fee() {
            self.engine.config().dynamic_fee
        } else {
            key.fee.to::<u32>()
        };
        let paid = math::mul_div(
            U256::from(input.unsigned_abs()),
            U256::from(lp_fee),
            U256::from(MAX_LP_FEE),
        )?;
        let share = U256::from(self.hook_share_bps.get(pool_id).to::<u16>());
        Ok(math::mul_div(paid, share, BPS)?)
    }

    /// Evaluates the pools sharing `pool_id`'s managed token and executes or
    /// announces the resulting proposal.
    fn rebalance_after_swap(&mut self, pool_id: PoolId) -> Result<(), Error> {
        let now = block::timestamp();
        let reserve = contract::address();
        let token = self.tracker.token_of(pool_id);

        let snapshots: Vec<PoolSnapshot> = (0..self.pools.len())
            .filter_map(|i| self.pools.get(i))
            .filter(|id| self.tracker.token_of(*id) == token)
            .map(|id| PoolSnapshot {
                id,
                token,
                rate: self.tracker.rate_of(id, now),
                liquidity: self.tracker.liquidity_of(id),
                reserve: self.tracker.shares_of(id, reserve),
                cooldown_until: self.engine.cooldown_until(id),
            })
            .collect();

        let config = self.engine.config();
        let Some(proposal) = evaluate(&snapshots, &config, now) else {
            return Ok(());
        };

        if config.auto_rebalance {
            self.engine.execute(&mut self.tracker, reserve, &proposal, now)?;
        } else {
            evm::log(RebalanceProposed {
                from_pool: proposal.from,
                to_pool: proposal.to,
                token: proposal.token,
                amount: proposal.amount,
            });
        }
        Ok(())
    }

    /// Pays `recipient` the yield `account` earned in `pool_id` out of the
    /// hook's surplus.
    fn pay_yield(
        &mut self,
        pool_id: PoolId,
        account: Address,
        recipient: Address,
    ) -> Result<U256, Error> {
        self.require_managed(pool_id)?;

        let amount = self.tracker.yield_of(pool_id, account)?;
        if amount.is_zero() {
            return Ok(amount);
        }
        let token = self.tracker.token_of(pool_id);
        let surplus = self.surplus_of(token)?;
        if amount > surplus {
            return Err(InsufficientBalance {
                account: contract::address(),
                token,
                available: surplus,
                needed: amount,
            }
            .into());
        }

        self.push(token, recipient, amount)?;
        self.tracker.claim(pool_id, account)?;
        evm::log(YieldClaimed { user: account, pool_id, token, amount });
        Ok(amount)
    }

    /// Tokens of `token` held by the hook beyond what is owed to depositors.
    fn surplus_of(&mut self, token: Address) -> Result<U256, Error> {
        let erc20 = Erc20Interface::new(token);
        let held = erc20
            .balance_of(Call::new_in(self), contract::address())
            .map_err(|_| TokenTransferFailed { token })?;
        Ok(held.saturating_sub(self.ledger.total_of(token)))
    }

    fn pull(
        &mut self,
        token: Address,
        from: Address,
        amount: U256,
    ) -> Result<(), Error> {
        let erc20 = Erc20Interface::new(token);
        match erc20.transfer_from(
            Call::new_in(self),
            from,
            contract::address(),
            amount,
        ) {
            Ok(true) => Ok(()),
            _ => Err(TokenTransferFailed { token }.into()),
        }
    }

    fn push(
        &mut self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Error> {
        let erc20 = Erc20Interface::new(token);
        match erc20.transfer(Call::new_in(self), to, amount) {
            Ok(true) => Ok(()),
            _ => Err(TokenTransferFailed { token }.into()),
        }
    }
}

fn to_signed(amount: U256) -> Result<I256, Error> {
    I256::try_from(amount).map_err(|_| ArithmeticOverflow {}.into())
}
