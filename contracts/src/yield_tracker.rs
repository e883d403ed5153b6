//! Per-pool yield accounting for liquidity managed by the hook.
//!
//! Every managed pool carries a yield index: the cumulative fee earned per
//! unit of managed liquidity, scaled by [`WAD`]. A swap notification raises
//! the index by `fee * WAD / liquidity`. A user's position remembers the
//! index value at which it was last settled, so its pending yield is
//! `(index - snapshot) * shares / WAD`.
//!
//! Pending yield is always settled into the position before its shares
//! change. This way liquidity added after a swap never earns that swap's
//! fee, and liquidity removed keeps what it earned.
//!
//! The tracker also keeps a rate window per pool, a checkpoint of the index
//! and the time it was taken, from which the rebalance engine derives how
//! fast each pool is currently accruing. A window rolls over once it is
//! [`RATE_WINDOW`] seconds old. Until the current window is that long, its
//! growth is blended with the rate of the previous one, so a pool that sat
//! idle for days is judged by recent swaps and a fresh window does not
//! extrapolate a single swap.
use alloc::{vec, vec::Vec};

use alloy_primitives::{Address, I256, U256, U64};
pub use sol::*;
use stylus_sdk::{
    evm,
    prelude::*,
    storage::{
        StorageAddress, StorageBool, StorageMap, StorageU256, StorageU64,
    },
};

use crate::{
    ledger::InsufficientBalance,
    uniswap::v4::PoolId,
    utils::math::{self, ArithmeticOverflow, ArithmeticUnderflow, WAD},
};

/// Length, in seconds, of a pool's rate window.
pub const RATE_WINDOW: u64 = 3_600;

#[cfg_attr(coverage_nightly, coverage(off))]
mod sol {
    use alloy_sol_macro::sol;

    sol! {
        /// Emitted when a swap fee raises the yield index of a pool.
        ///
        /// * `pool_id` - Identifier of the pool.
        /// * `fee` - Fee attributed to managed liquidity.
        /// * `index` - Yield index after the update.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event YieldAccrued(bytes32 indexed pool_id, uint256 fee, uint256 index);
    }

    sol! {
        /// The pool is not managed by the hook.
        ///
        /// * `pool_id` - Identifier of the pool.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error UnmanagedPool(bytes32 pool_id);

        /// The pool is already managed by the hook.
        ///
        /// * `pool_id` - Identifier of the pool.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error PoolAlreadyManaged(bytes32 pool_id);

        /// The pool cannot be used for the requested operation.
        ///
        /// * `pool_id` - Identifier of the pool.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error InvalidPool(bytes32 pool_id);
    }
}

/// An error that occurred in the [`YieldTracker`].
#[derive(SolidityError, Debug)]
pub enum Error {
    /// The pool is not managed.
    UnmanagedPool(UnmanagedPool),
    /// The pool is already managed.
    PoolAlreadyManaged(PoolAlreadyManaged),
    /// The user holds fewer shares than requested.
    InsufficientBalance(InsufficientBalance),
    /// An accounting update would exceed the range of `uint256`.
    Overflow(ArithmeticOverflow),
    /// An accounting update would go below zero.
    Underflow(ArithmeticUnderflow),
}

impl From<math::Error> for Error {
    fn from(value: math::Error) -> Self {
        match value {
            math::Error::Overflow(e) => Error::Overflow(e),
            math::Error::Underflow(e) => Error::Underflow(e),
        }
    }
}

/// A user's stake in a managed pool.
#[storage]
pub struct Position {
    /// Liquidity the user allocated to the pool.
    pub(crate) shares: StorageU256,
    /// Index value at the last settlement.
    pub(crate) snapshot: StorageU256,
    /// Yield settled but not yet claimed.
    pub(crate) settled: StorageU256,
}

/// Yield state of a single managed pool.
#[storage]
pub struct PoolYield {
    /// Whether the pool is registered.
    pub(crate) managed: StorageBool,
    /// Token in which liquidity and yield are denominated.
    pub(crate) token: StorageAddress,
    /// Cumulative yield per unit of liquidity, scaled by [`WAD`].
    pub(crate) index: StorageU256,
    /// Sum of all position shares.
    pub(crate) liquidity: StorageU256,
    /// Index value at the start of the current rate window.
    pub(crate) checkpoint_index: StorageU256,
    /// Start of the current rate window.
    pub(crate) checkpoint_time: StorageU64,
    /// Rate measured when the current window started.
    pub(crate) previous_rate: StorageU256,
    /// Positions by user.
    pub(crate) positions: StorageMap<Address, Position>,
}

/// State of a [`YieldTracker`].
#[storage]
pub struct YieldTracker {
    /// Yield state by pool.
    pub(crate) pools: StorageMap<PoolId, PoolYield>,
}

/// Position values computed ahead of a write.
struct Settlement {
    index: U256,
    shares: U256,
    settled: U256,
}

impl YieldTracker {
    /// Starts tracking yield for `pool`, denominated in `token`.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the tracker's state.
    /// * `pool` - Identifier of the pool.
    /// * `token` - Managed token of the pool.
    /// * `now` - Current block timestamp, start of the first rate window.
    ///
    /// # Errors
    ///
    /// * [`Error::PoolAlreadyManaged`] - If `pool` is already registered.
    pub fn register(
        &mut self,
        pool: PoolId,
        token: Address,
        now: u64,
    ) -> Result<(), Error> {
        if self.is_managed(pool) {
            return Err(Error::PoolAlreadyManaged(PoolAlreadyManaged {
                pool_id: pool,
            }));
        }

        let mut state = self.pools.setter(pool);
        state.managed.set(true);
        state.token.set(token);
        state.checkpoint_time.set(U64::from(now));
        Ok(())
    }

    /// Returns true if `pool` is registered.
    #[must_use]
    pub fn is_managed(&self, pool: PoolId) -> bool {
        self.pools.get(pool).managed.get()
    }

    /// Returns the managed token of `pool`.
    #[must_use]
    pub fn token_of(&self, pool: PoolId) -> Address {
        self.pools.get(pool).token.get()
    }

    /// Returns the yield index of `pool`.
    #[must_use]
    pub fn index_of(&self, pool: PoolId) -> U256 {
        self.pools.get(pool).index.get()
    }

    /// Returns the total managed liquidity of `pool`.
    #[must_use]
    pub fn liquidity_of(&self, pool: PoolId) -> U256 {
        self.pools.get(pool).liquidity.get()
    }

    /// Returns the shares `user` holds in `pool`.
    #[must_use]
    pub fn shares_of(&self, pool: PoolId, user: Address) -> U256 {
        self.pools.get(pool).positions.get(user).shares.get()
    }

    /// Raises the yield index of `pool` by `fee * WAD / liquidity`, rounded
    /// toward zero, and returns the new index.
    ///
    /// A pool without managed liquidity keeps its index: there is nobody to
    /// attribute the fee to.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the tracker's state.
    /// * `pool` - Identifier of the pool.
    /// * `fee` - Fee attributed to managed liquidity.
    ///
    /// # Errors
    ///
    /// * [`Error::UnmanagedPool`] - If `pool` is not registered.
    /// * [`Error::Overflow`] - If the index would exceed `U256::MAX`.
    ///
    /// # Events
    ///
    /// * [`YieldAccrued`] - When the index changes.
    pub fn on_swap_notification(
        &mut self,
        pool: PoolId,
        fee: U256,
    ) -> Result<U256, Error> {
        self.require_managed(pool)?;

        let index = self.index_of(pool);
        let liquidity = self.liquidity_of(pool);
        if fee.is_zero() || liquidity.is_zero() {
            return Ok(index);
        }

        let increment = math::mul_div(fee, WAD, liquidity)?;
        if increment.is_zero() {
            return Ok(index);
        }
        let index = math::add(index, increment)?;
        self.pools.setter(pool).index.set(index);

        evm::log(YieldAccrued { pool_id: pool, fee, index });
        Ok(index)
    }

    /// Settles `user`'s pending yield in `pool`, then applies `delta` to the
    /// user's shares and to the pool's liquidity.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the tracker's state.
    /// * `pool` - Identifier of the pool.
    /// * `user` - Owner of the position.
    /// * `delta` - Signed change of the position's shares.
    ///
    /// # Errors
    ///
    /// * [`Error::UnmanagedPool`] - If `pool` is not registered.
    /// * [`Error::InsufficientBalance`] - If a negative `delta` exceeds the
    ///   user's shares.
    /// * [`Error::Overflow`] - If shares, liquidity or settled yield would
    ///   exceed `U256::MAX`.
    pub fn on_deposit_or_withdraw(
        &mut self,
        pool: PoolId,
        user: Address,
        delta: I256,
    ) -> Result<(), Error> {
        self.require_managed(pool)?;

        let settlement = self.settlement(pool, user)?;
        let liquidity = self.liquidity_of(pool);
        let amount = delta.unsigned_abs();

        let (shares, liquidity) = if delta.is_negative() {
            if amount > settlement.shares {
                return Err(Error::InsufficientBalance(InsufficientBalance {
                    account: user,
                    token: self.token_of(pool),
                    available: settlement.shares,
                    needed: amount,
                }));
            }
            (settlement.shares - amount, math::sub(liquidity, amount)?)
        } else {
            (
                math::add(settlement.shares, amount)?,
                math::add(liquidity, amount)?,
            )
        };

        let mut state = self.pools.setter(pool);
        state.liquidity.set(liquidity);
        let mut position = state.positions.setter(user);
        position.shares.set(shares);
        position.snapshot.set(settlement.index);
        position.settled.set(settlement.settled);
        Ok(())
    }

    /// Returns the yield `user` could claim from `pool` right now: settled
    /// plus pending.
    ///
    /// # Arguments
    ///
    /// * `&self` - Read access to the tracker's state.
    /// * `pool` - Identifier of the pool.
    /// * `user` - Owner of the position.
    ///
    /// # Errors
    ///
    /// * [`Error::Overflow`] - If the yield exceeds `U256::MAX`.
    pub fn yield_of(&self, pool: PoolId, user: Address) -> Result<U256, Error> {
        Ok(self.settlement(pool, user)?.settled)
    }

    /// Settles `user`'s position in `pool`, zeroes its settled yield and
    /// returns the amount to pay out.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the tracker's state.
    /// * `pool` - Identifier of the pool.
    /// * `user` - Owner of the position.
    ///
    /// # Errors
    ///
    /// * [`Error::UnmanagedPool`] - If `pool` is not registered.
    /// * [`Error::Overflow`] - If the yield exceeds `U256::MAX`.
    pub fn claim(&mut self, pool: PoolId, user: Address) -> Result<U256, Error> {
        self.require_managed(pool)?;

        let settlement = self.settlement(pool, user)?;
        let mut state = self.pools.setter(pool);
        let mut position = state.positions.setter(user);
        position.snapshot.set(settlement.index);
        position.settled.set(U256::ZERO);
        Ok(settlement.settled)
    }

    /// Returns the index growth per second of `pool`.
    ///
    /// A window at least [`RATE_WINDOW`] long yields its own average. A
    /// shorter one is padded to [`RATE_WINDOW`] with the previous window's
    /// rate.
    ///
    /// # Arguments
    ///
    /// * `&self` - Read access to the tracker's state.
    /// * `pool` - Identifier of the pool.
    /// * `now` - Current block timestamp.
    #[must_use]
    pub fn rate_of(&self, pool: PoolId, now: u64) -> U256 {
        let state = self.pools.get(pool);
        let growth =
            state.index.get().saturating_sub(state.checkpoint_index.get());
        let elapsed = now.saturating_sub(state.checkpoint_time.get().to());
        if elapsed >= RATE_WINDOW {
            return growth / U256::from(elapsed);
        }

        let carried = state
            .previous_rate
            .get()
            .saturating_mul(U256::from(RATE_WINDOW - elapsed));
        growth.saturating_add(carried) / U256::from(RATE_WINDOW)
    }

    /// Restarts the rate window of `pool` at `now`, remembering the rate
    /// measured so far.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the tracker's state.
    /// * `pool` - Identifier of the pool.
    /// * `now` - Current block timestamp.
    pub fn checkpoint(&mut self, pool: PoolId, now: u64) {
        let index = self.index_of(pool);
        let rate = self.rate_of(pool, now);
        let mut state = self.pools.setter(pool);
        state.checkpoint_index.set(index);
        state.checkpoint_time.set(U64::from(now));
        state.previous_rate.set(rate);
    }

    /// Restarts the rate window of `pool` if it is at least [`RATE_WINDOW`]
    /// old. Returns whether it did.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the tracker's state.
    /// * `pool` - Identifier of the pool.
    /// * `now` - Current block timestamp.
    pub fn roll_window(&mut self, pool: PoolId, now: u64) -> bool {
        let started: u64 = self.pools.get(pool).checkpoint_time.get().to();
        if !self.is_managed(pool) || now.saturating_sub(started) < RATE_WINDOW {
            return false;
        }
        self.checkpoint(pool, now);
        true
    }

    fn require_managed(&self, pool: PoolId) -> Result<(), Error> {
        if self.is_managed(pool) {
            Ok(())
        } else {
            Err(Error::UnmanagedPool(UnmanagedPool { pool_id: pool }))
        }
    }

    /// Computes the position of `user` in `pool` as if it were settled at
    /// the current index.
    fn settlement(&self, pool: PoolId, user: Address) -> Result<Settlement, Error> {
        let state = self.pools.get(pool);
        let index = state.index.get();
        let position = state.positions.get(user);
        let shares = position.shares.get();
        let snapshot = position.snapshot.get();

        let growth = math::sub(index, snapshot)?;
        let pending = math::mul_div(growth, shares, WAD)?;
        let settled = math::add(position.settled.get(), pending)?;
        Ok(Settlement { index, shares, settled })
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{uint, Address, B256, I256, U256};
    use motsu::prelude::*;
    use stylus_sdk::prelude::*;

    use super::*;

    const POOL: B256 = B256::repeat_byte(0x11);
    const OTHER_POOL: B256 = B256::repeat_byte(0x22);

    #[storage]
    struct TrackerExample {
        tracker: YieldTracker,
    }

    #[public]
    impl TrackerExample {
        fn index(&self, pool: B256) -> U256 {
            self.tracker.index_of(pool)
        }
    }

    unsafe impl TopLevelStorage for TrackerExample {}

    fn shares(amount: u64) -> I256 {
        I256::try_from(amount).unwrap()
    }

    fn init(contract: &Contract<TrackerExample>, admin: Address, token: Address) {
        contract.sender(admin).tracker.register(POOL, token, 0).motsu_unwrap();
    }

    #[motsu::test]
    fn registers_pool_once(
        contract: Contract<TrackerExample>,
        admin: Address,
        token: Address,
    ) {
        init(&contract, admin, token);
        assert!(contract.sender(admin).tracker.is_managed(POOL));
        assert_eq!(contract.sender(admin).tracker.token_of(POOL), token);
        assert_eq!(contract.sender(admin).index(POOL), U256::ZERO);

        let err = contract
            .sender(admin)
            .tracker
            .register(POOL, token, 0)
            .motsu_unwrap_err();
        assert!(matches!(
            err,
            Error::PoolAlreadyManaged(PoolAlreadyManaged { pool_id }) if pool_id == POOL
        ));
    }

    #[motsu::test]
    fn rejects_unmanaged_pool(contract: Contract<TrackerExample>, alice: Address) {
        let err = contract
            .sender(alice)
            .tracker
            .on_swap_notification(OTHER_POOL, uint!(10_U256))
            .motsu_unwrap_err();
        assert!(matches!(err, Error::UnmanagedPool(_)));

        let err = contract
            .sender(alice)
            .tracker
            .on_deposit_or_withdraw(OTHER_POOL, alice, shares(1))
            .motsu_unwrap_err();
        assert!(matches!(err, Error::UnmanagedPool(_)));
    }

    #[motsu::test]
    fn swap_fee_raises_index_and_accrues_yield(
        contract: Contract<TrackerExample>,
        alice: Address,
        bob: Address,
        token: Address,
    ) {
        init(&contract, alice, token);
        contract
            .sender(alice)
            .tracker
            .on_deposit_or_withdraw(POOL, alice, shares(500))
            .motsu_unwrap();
        contract
            .sender(bob)
            .tracker
            .on_deposit_or_withdraw(POOL, bob, shares(500))
            .motsu_unwrap();
        assert_eq!(
            contract.sender(alice).tracker.liquidity_of(POOL),
            uint!(1000_U256)
        );

        let index = contract
            .sender(alice)
            .tracker
            .on_swap_notification(POOL, uint!(10_U256))
            .motsu_unwrap();

        // 10 * 1e18 / 1000 = 0.01 WAD
        assert_eq!(index, uint!(10_000_000_000_000_000_U256));
        assert_eq!(contract.sender(alice).index(POOL), index);
        assert_eq!(
            contract.sender(alice).tracker.yield_of(POOL, alice).motsu_unwrap(),
            uint!(5_U256)
        );
        contract.assert_emitted(&YieldAccrued {
            pool_id: POOL,
            fee: uint!(10_U256),
            index,
        });
    }

    #[motsu::test]
    fn zero_liquidity_keeps_index(
        contract: Contract<TrackerExample>,
        alice: Address,
        token: Address,
    ) {
        init(&contract, alice, token);
        let index = contract
            .sender(alice)
            .tracker
            .on_swap_notification(POOL, uint!(1_000_U256))
            .motsu_unwrap();
        assert_eq!(index, U256::ZERO);
    }

    #[motsu::test]
    fn index_never_decreases(
        contract: Contract<TrackerExample>,
        alice: Address,
        token: Address,
    ) {
        init(&contract, alice, token);
        contract
            .sender(alice)
            .tracker
            .on_deposit_or_withdraw(POOL, alice, shares(3_333))
            .motsu_unwrap();

        let mut previous = U256::ZERO;
        for fee in [0_u64, 1, 7, 0, 10_000, 3, 999_999] {
            let index = contract
                .sender(alice)
                .tracker
                .on_swap_notification(POOL, U256::from(fee))
                .motsu_unwrap();
            assert!(index >= previous);
            previous = index;
        }
    }

    #[motsu::test]
    fn yield_is_proportional_to_shares(
        contract: Contract<TrackerExample>,
        alice: Address,
        bob: Address,
        token: Address,
    ) {
        init(&contract, alice, token);
        contract
            .sender(alice)
            .tracker
            .on_deposit_or_withdraw(POOL, alice, shares(2_000))
            .motsu_unwrap();
        contract
            .sender(bob)
            .tracker
            .on_deposit_or_withdraw(POOL, bob, shares(1_000))
            .motsu_unwrap();

        for fee in [301_u64, 17, 4_999] {
            contract
                .sender(alice)
                .tracker
                .on_swap_notification(POOL, U256::from(fee))
                .motsu_unwrap();
        }

        let alice_yield =
            contract.sender(alice).tracker.yield_of(POOL, alice).motsu_unwrap();
        let bob_yield =
            contract.sender(bob).tracker.yield_of(POOL, bob).motsu_unwrap();

        let double = bob_yield * uint!(2_U256);
        let diff = if alice_yield > double {
            alice_yield - double
        } else {
            double - alice_yield
        };
        assert!(diff <= uint!(2_U256));
        assert!(alice_yield + bob_yield <= U256::from(301 + 17 + 4_999));
    }

    #[motsu::test]
    fn late_liquidity_does_not_earn_past_fees(
        contract: Contract<TrackerExample>,
        alice: Address,
        bob: Address,
        token: Address,
    ) {
        init(&contract, alice, token);
        contract
            .sender(alice)
            .tracker
            .on_deposit_or_withdraw(POOL, alice, shares(1_000))
            .motsu_unwrap();
        contract
            .sender(alice)
            .tracker
            .on_swap_notification(POOL, uint!(100_U256))
            .motsu_unwrap();

        contract
            .sender(bob)
            .tracker
            .on_deposit_or_withdraw(POOL, bob, shares(1_000))
            .motsu_unwrap();
        assert_eq!(
            contract.sender(bob).tracker.yield_of(POOL, bob).motsu_unwrap(),
            U256::ZERO
        );

        contract
            .sender(alice)
            .tracker
            .on_swap_notification(POOL, uint!(100_U256))
            .motsu_unwrap();
        assert_eq!(
            contract.sender(alice).tracker.yield_of(POOL, alice).motsu_unwrap(),
            uint!(150_U256)
        );
        assert_eq!(
            contract.sender(bob).tracker.yield_of(POOL, bob).motsu_unwrap(),
            uint!(50_U256)
        );
    }

    #[motsu::test]
    fn withdrawal_settles_and_keeps_earned_yield(
        contract: Contract<TrackerExample>,
        alice: Address,
        token: Address,
    ) {
        init(&contract, alice, token);
        contract
            .sender(alice)
            .tracker
            .on_deposit_or_withdraw(POOL, alice, shares(1_000))
            .motsu_unwrap();
        contract
            .sender(alice)
            .tracker
            .on_swap_notification(POOL, uint!(40_U256))
            .motsu_unwrap();

        contract
            .sender(alice)
            .tracker
            .on_deposit_or_withdraw(POOL, alice, -shares(1_000))
            .motsu_unwrap();
        assert_eq!(contract.sender(alice).tracker.shares_of(POOL, alice), U256::ZERO);
        assert_eq!(contract.sender(alice).tracker.liquidity_of(POOL), U256::ZERO);
        assert_eq!(
            contract.sender(alice).tracker.yield_of(POOL, alice).motsu_unwrap(),
            uint!(40_U256)
        );

        let claimed =
            contract.sender(alice).tracker.claim(POOL, alice).motsu_unwrap();
        assert_eq!(claimed, uint!(40_U256));
        assert_eq!(
            contract.sender(alice).tracker.yield_of(POOL, alice).motsu_unwrap(),
            U256::ZERO
        );
    }

    #[motsu::test]
    fn cannot_remove_more_than_shares(
        contract: Contract<TrackerExample>,
        alice: Address,
        token: Address,
    ) {
        init(&contract, alice, token);
        contract
            .sender(alice)
            .tracker
            .on_deposit_or_withdraw(POOL, alice, shares(10))
            .motsu_unwrap();

        let err = contract
            .sender(alice)
            .tracker
            .on_deposit_or_withdraw(POOL, alice, -shares(11))
            .motsu_unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientBalance(InsufficientBalance { available, needed, .. })
                if available == uint!(10_U256) && needed == uint!(11_U256)
        ));
        assert_eq!(contract.sender(alice).tracker.shares_of(POOL, alice), uint!(10_U256));
        assert_eq!(contract.sender(alice).tracker.liquidity_of(POOL), uint!(10_U256));
    }

    #[motsu::test]
    fn rate_window_measures_growth_per_second(
        contract: Contract<TrackerExample>,
        alice: Address,
        token: Address,
    ) {
        init(&contract, alice, token);
        contract
            .sender(alice)
            .tracker
            .on_deposit_or_withdraw(POOL, alice, shares(1_000))
            .motsu_unwrap();
        contract
            .sender(alice)
            .tracker
            .on_swap_notification(POOL, uint!(100_U256))
            .motsu_unwrap();

        // 100 * 1e18 / 1000 = 1e17, never spread over less than an hour.
        let hourly = uint!(27_777_777_777_777_U256);
        assert_eq!(contract.sender(alice).tracker.rate_of(POOL, 0), hourly);
        assert_eq!(contract.sender(alice).tracker.rate_of(POOL, 100), hourly);
        assert_eq!(contract.sender(alice).tracker.rate_of(POOL, 3_600), hourly);
        assert_eq!(
            contract.sender(alice).tracker.rate_of(POOL, 7_200),
            uint!(13_888_888_888_888_U256)
        );

        // A new window starts from the previous rate and fades it out.
        contract.sender(alice).tracker.checkpoint(POOL, 3_600);
        assert_eq!(contract.sender(alice).tracker.rate_of(POOL, 3_600), hourly);
        assert_eq!(
            contract.sender(alice).tracker.rate_of(POOL, 5_400),
            uint!(13_888_888_888_888_U256)
        );
        assert_eq!(contract.sender(alice).tracker.rate_of(POOL, 7_200), U256::ZERO);
    }

    #[motsu::test]
    fn idle_pool_rate_follows_recent_swaps(
        contract: Contract<TrackerExample>,
        alice: Address,
        token: Address,
    ) {
        init(&contract, alice, token);
        contract
            .sender(alice)
            .tracker
            .on_deposit_or_withdraw(POOL, alice, shares(1_000))
            .motsu_unwrap();

        assert!(!contract.sender(alice).tracker.roll_window(POOL, RATE_WINDOW - 1));
        assert!(contract.sender(alice).tracker.roll_window(POOL, 100_000));
        assert!(!contract.sender(alice).tracker.roll_window(POOL, 100_500));
        contract
            .sender(alice)
            .tracker
            .on_swap_notification(POOL, uint!(100_U256))
            .motsu_unwrap();

        // Without the roll the fee would be spread over 103_600 seconds.
        assert_eq!(
            contract.sender(alice).tracker.rate_of(POOL, 103_600),
            uint!(27_777_777_777_777_U256)
        );

        // Unmanaged pools never roll.
        assert!(!contract.sender(alice).tracker.roll_window(OTHER_POOL, 100_000));
    }
}
