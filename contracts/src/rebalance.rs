//! Moves protocol-owned liquidity between managed pools when their yield
//! rates drift apart.
//!
//! Evaluation is pure: [`evaluate`] looks at a [`PoolSnapshot`] of every
//! candidate pool and returns at most one [`RebalanceProposal`]. Pools are
//! compared pairwise when they share a managed token. Pairs whose rate
//! deviation exceeds the trigger threshold are ranked by deviation, and the
//! first one that can be sized wins. Liquidity moves from the pair's
//! lower-yielding to its higher-yielding side.
//!
//! Before a proposal is made the engine projects the rates after the move,
//! assuming the fee flow of each pool stays the same, so a rate scales with
//! `L / L'`. A move may close the gap only partially. If it would overshoot
//! so that the source ends up yielding more than the destination, the
//! projected deviation must land strictly below the trigger. Otherwise the
//! amount is halved until it fits, or until it falls under the minimum trade
//! size. A rebalance therefore never sets up one in the opposite direction.
//!
//! Only the hook's own reserve positions are ever moved. Executing a
//! proposal shifts reserve shares from one pool to the other through the
//! [`YieldTracker`]; the reserve's ledger balance stays where it is since the
//! token never leaves custody.
use alloc::{vec, vec::Vec};
use core::cmp::Reverse;

use alloy_primitives::{Address, I256, U16, U256, U32, U64};
pub use sol::*;
use stylus_sdk::{
    evm,
    prelude::*,
    storage::{
        StorageBool, StorageMap, StorageU16, StorageU256, StorageU32,
        StorageU64,
    },
};

use crate::{
    ledger::{InsufficientBalance, ZeroAmount},
    uniswap::v4::{PoolId, MAX_LP_FEE},
    utils::math::{
        self, deviation_bps, ArithmeticOverflow, ArithmeticUnderflow, BPS,
    },
    yield_tracker::{
        self, InvalidPool, PoolAlreadyManaged, UnmanagedPool, YieldTracker,
    },
};

/// Default deviation, in basis points, above which pools are rebalanced.
pub const DEFAULT_TRIGGER_BPS: u16 = 500;
/// Default share, in basis points, of a pool's liquidity moved at once.
pub const DEFAULT_MAX_MOVE_BPS: u16 = 2_000;
/// Default time, in seconds, a pool rests after a rebalance.
pub const DEFAULT_COOLDOWN: u64 = 3_600;
/// Default LP fee returned for dynamic-fee pools, in hundredths of a bip.
pub const DEFAULT_DYNAMIC_FEE: u32 = 3_000;

#[cfg_attr(coverage_nightly, coverage(off))]
mod sol {
    use alloy_sol_macro::sol;

    sol! {
        /// Emitted when an evaluation finds a rebalance that is not executed
        /// automatically.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event RebalanceProposed(
            bytes32 indexed from_pool,
            bytes32 indexed to_pool,
            address token,
            uint256 amount
        );

        /// Emitted when reserve liquidity moves from `from_pool` to
        /// `to_pool`.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event Rebalanced(
            bytes32 indexed from_pool,
            bytes32 indexed to_pool,
            address token,
            uint256 amount
        );

        /// Emitted when the owner replaces the rebalance configuration.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event RebalanceConfigUpdated(
            uint16 trigger_bps,
            uint256 min_trade,
            uint16 max_move_bps,
            uint64 cooldown,
            bool auto_rebalance,
            uint32 dynamic_fee
        );
    }

    sol! {
        /// The pool was rebalanced recently and rests until `until`.
        ///
        /// * `pool_id` - Identifier of the pool.
        /// * `until` - Timestamp at which the cooldown ends.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error RebalanceCooldownActive(bytes32 pool_id, uint64 until);

        /// The rebalance configuration is out of range.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error InvalidRebalanceConfig();
    }
}

/// An error that occurred in the [`RebalanceEngine`].
#[derive(SolidityError, Debug)]
pub enum Error {
    /// One of the pools is cooling down.
    CooldownActive(RebalanceCooldownActive),
    /// The configuration is out of range.
    InvalidConfig(InvalidRebalanceConfig),
    /// The pools cannot be rebalanced against each other.
    InvalidPool(InvalidPool),
    /// The amount is zero.
    ZeroAmount(ZeroAmount),
    /// One of the pools is not managed.
    UnmanagedPool(UnmanagedPool),
    /// The pool is already managed.
    PoolAlreadyManaged(PoolAlreadyManaged),
    /// The source pool's reserve is too small.
    InsufficientBalance(InsufficientBalance),
    /// An accounting update would exceed the range of `uint256`.
    Overflow(ArithmeticOverflow),
    /// An accounting update would go below zero.
    Underflow(ArithmeticUnderflow),
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

/// Tunables of the rebalance engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RebalanceConfig {
    /// Rate deviation, in basis points, above which a pair is rebalanced.
    pub trigger_bps: u16,
    /// Smallest amount worth moving.
    pub min_trade: U256,
    /// Largest share, in basis points, of the source pool's liquidity moved
    /// at once.
    pub max_move_bps: u16,
    /// Seconds both pools rest after a rebalance.
    pub cooldown: u64,
    /// Whether proposals found during a swap are executed right away.
    pub auto_rebalance: bool,
    /// LP fee returned for dynamic-fee pools, in hundredths of a bip.
    pub dynamic_fee: u32,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        RebalanceConfig {
            trigger_bps: DEFAULT_TRIGGER_BPS,
            min_trade: U256::ONE,
            max_move_bps: DEFAULT_MAX_MOVE_BPS,
            cooldown: DEFAULT_COOLDOWN,
            auto_rebalance: false,
            dynamic_fee: DEFAULT_DYNAMIC_FEE,
        }
    }
}

impl RebalanceConfig {
    /// Checks that every value is within range.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidConfig`] - If a basis-point value is zero or above
    ///   `10_000`, the minimum trade is zero, or the dynamic fee exceeds
    ///   [`MAX_LP_FEE`].
    pub fn validate(&self) -> Result<(), Error> {
        let bps = 1..=10_000;
        if !bps.contains(&self.trigger_bps)
            || !bps.contains(&self.max_move_bps)
            || self.min_trade.is_zero()
            || self.dynamic_fee > MAX_LP_FEE
        {
            return Err(Error::InvalidConfig(InvalidRebalanceConfig {}));
        }
        Ok(())
    }
}

/// What the engine needs to know about one pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSnapshot {
    /// Identifier of the pool.
    pub id: PoolId,
    /// Managed token of the pool.
    pub token: Address,
    /// Index growth per second over the current rate window.
    pub rate: U256,
    /// Total managed liquidity.
    pub liquidity: U256,
    /// Liquidity owned by the hook itself.
    pub reserve: U256,
    /// Timestamp until which the pool must not be rebalanced.
    pub cooldown_until: u64,
}

/// A move of reserve liquidity between two pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RebalanceProposal {
    /// Lower-yielding pool the liquidity leaves.
    pub from: PoolId,
    /// Higher-yielding pool the liquidity enters.
    pub to: PoolId,
    /// Managed token of both pools.
    pub token: Address,
    /// Amount of liquidity to move.
    pub amount: U256,
    /// Timestamp of the evaluation.
    pub timestamp: u64,
}

/// Finds the most profitable rebalance among `pools`, if any.
///
/// # Arguments
///
/// * `pools` - Snapshots of the candidate pools.
/// * `config` - Engine tunables.
/// * `now` - Current block timestamp.
#[must_use]
pub fn evaluate(
    pools: &[PoolSnapshot],
    config: &RebalanceConfig,
    now: u64,
) -> Option<RebalanceProposal> {
    let trigger = U256::from(config.trigger_bps);
    let ready: Vec<&PoolSnapshot> =
        pools.iter().filter(|pool| pool.cooldown_until <= now).collect();

    let mut candidates: Vec<(U256, &PoolSnapshot, &PoolSnapshot)> = Vec::new();
    for (i, a) in ready.iter().enumerate() {
        for b in &ready[i + 1..] {
            if a.token != b.token || a.id == b.id {
                continue;
            }
            let deviation = deviation_bps(a.rate, b.rate);
            if deviation <= trigger {
                continue;
            }
            let (low, high) = if a.rate <= b.rate { (*a, *b) } else { (*b, *a) };
            candidates.push((deviation, low, high));
        }
    }
    // Stable, so equal deviations keep the order of `pools`.
    candidates.sort_by_key(|&(deviation, _, _)| Reverse(deviation));

    candidates.into_iter().find_map(|(_, from, to)| {
        size_move(from, to, config).map(|amount| RebalanceProposal {
            from: from.id,
            to: to.id,
            token: from.token,
            amount,
            timestamp: now,
        })
    })
}

/// Largest amount, halving down from the cap, that can move from `from` to
/// `to` without overshooting past the trigger.
fn size_move(
    from: &PoolSnapshot,
    to: &PoolSnapshot,
    config: &RebalanceConfig,
) -> Option<U256> {
    let trigger = U256::from(config.trigger_bps);
    let cap = math::mul_div(from.liquidity, U256::from(config.max_move_bps), BPS)
        .ok()?;
    let mut amount = from.reserve.min(cap);

    while !amount.is_zero() && amount >= config.min_trade {
        let fits = projected_rates(from, to, amount).is_some_and(
            |(from_rate, to_rate)| {
                from_rate <= to_rate || deviation_bps(from_rate, to_rate) < trigger
            },
        );
        if fits {
            return Some(amount);
        }
        amount /= U256::from(2);
    }
    None
}

/// Rates of both pools after moving `amount` from `from` to `to`, assuming
/// their fee flows do not change. `None` when the source pool would be
/// drained.
fn projected_rates(
    from: &PoolSnapshot,
    to: &PoolSnapshot,
    amount: U256,
) -> Option<(U256, U256)> {
    let from_after = from.liquidity.checked_sub(amount)?;
    if from_after.is_zero() {
        return None;
    }
    let to_after = to.liquidity.checked_add(amount)?;

    let from_rate = math::mul_div(from.rate, from.liquidity, from_after).ok()?;
    let to_rate = math::mul_div(to.rate, to.liquidity, to_after).ok()?;
    Some((from_rate, to_rate))
}

/// State of a [`RebalanceEngine`].
#[storage]
pub struct RebalanceEngine {
    /// See [`RebalanceConfig::trigger_bps`].
    pub(crate) trigger_bps: StorageU16,
    /// See [`RebalanceConfig::min_trade`].
    pub(crate) min_trade: StorageU256,
    /// See [`RebalanceConfig::max_move_bps`].
    pub(crate) max_move_bps: StorageU16,
    /// See [`RebalanceConfig::cooldown`].
    pub(crate) cooldown: StorageU64,
    /// See [`RebalanceConfig::auto_rebalance`].
    pub(crate) auto_rebalance: StorageBool,
    /// See [`RebalanceConfig::dynamic_fee`].
    pub(crate) dynamic_fee: StorageU32,
    /// Timestamp until which each pool rests.
    pub(crate) cooldown_until: StorageMap<PoolId, StorageU64>,
}

impl RebalanceEngine {
    /// Returns the current configuration.
    #[must_use]
    pub fn config(&self) -> RebalanceConfig {
        RebalanceConfig {
            trigger_bps: self.trigger_bps.get().to(),
            min_trade: self.min_trade.get(),
            max_move_bps: self.max_move_bps.get().to(),
            cooldown: self.cooldown.get().to(),
            auto_rebalance: self.auto_rebalance.get(),
            dynamic_fee: self.dynamic_fee.get().to(),
        }
    }

    /// Replaces the configuration after validating it.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the engine's state.
    /// * `config` - New configuration.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidConfig`] - If `config` is out of range.
    ///
    /// # Events
    ///
    /// * [`RebalanceConfigUpdated`].
    pub fn set_config(&mut self, config: RebalanceConfig) -> Result<(), Error> {
        config.validate()?;

        self.trigger_bps.set(U16::from(config.trigger_bps));
        self.min_trade.set(config.min_trade);
        self.max_move_bps.set(U16::from(config.max_move_bps));
        self.cooldown.set(U64::from(config.cooldown));
        self.auto_rebalance.set(config.auto_rebalance);
        self.dynamic_fee.set(U32::from(config.dynamic_fee));

        evm::log(RebalanceConfigUpdated {
            trigger_bps: config.trigger_bps,
            min_trade: config.min_trade,
            max_move_bps: config.max_move_bps,
            cooldown: config.cooldown,
            auto_rebalance: config.auto_rebalance,
            dynamic_fee: config.dynamic_fee,
        });
        Ok(())
    }

    /// Returns the timestamp until which `pool` rests.
    #[must_use]
    pub fn cooldown_until(&self, pool: PoolId) -> u64 {
        self.cooldown_until.get(pool).to()
    }

    /// Moves `proposal.amount` of `reserve`'s shares from `proposal.from` to
    /// `proposal.to` and starts the cooldown of both pools.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the engine's state.
    /// * `tracker` - Yield state holding the reserve positions.
    /// * `reserve` - Owner of the protocol-owned positions.
    /// * `proposal` - Move to perform.
    /// * `now` - Current block timestamp.
    ///
    /// # Errors
    ///
    /// * [`Error::ZeroAmount`] - If the amount is zero.
    /// * [`Error::InvalidPool`] - If both pools are the same or their managed
    ///   tokens differ.
    /// * [`Error::UnmanagedPool`] - If either pool is not managed.
    /// * [`Error::CooldownActive`] - If either pool is cooling down.
    /// * [`Error::InsufficientBalance`] - If the reserve in the source pool
    ///   is smaller than the amount.
    ///
    /// # Events
    ///
    /// * [`Rebalanced`].
    pub fn execute(
        &mut self,
        tracker: &mut YieldTracker,
        reserve: Address,
        proposal: &RebalanceProposal,
        now: u64,
    ) -> Result<(), Error> {
        let RebalanceProposal { from, to, amount, .. } = *proposal;
        if amount.is_zero() {
            return Err(Error::ZeroAmount(ZeroAmount {}));
        }
        if from == to {
            return Err(Error::InvalidPool(InvalidPool { pool_id: to }));
        }
        for pool in [from, to] {
            if !tracker.is_managed(pool) {
                return Err(Error::UnmanagedPool(UnmanagedPool {
                    pool_id: pool,
                }));
            }
        }
        let token = tracker.token_of(from);
        if tracker.token_of(to) != token {
            return Err(Error::InvalidPool(InvalidPool { pool_id: to }));
        }
        for pool in [from, to] {
            let until = self.cooldown_until(pool);
            if until > now {
                return Err(Error::CooldownActive(RebalanceCooldownActive {
                    pool_id: pool,
                    until,
                }));
            }
        }

        let available = tracker.shares_of(from, reserve);
        if amount > available {
            return Err(Error::InsufficientBalance(InsufficientBalance {
                account: reserve,
                token,
                available,
                needed: amount,
            }));
        }
        let delta = I256::try_from(amount)
            .map_err(|_| Error::Overflow(ArithmeticOverflow {}))?;

        tracker.on_deposit_or_withdraw(from, reserve, -delta)?;
        tracker.on_deposit_or_withdraw(to, reserve, delta)?;

        let until = U64::from(now.saturating_add(self.cooldown.get().to()));
        for pool in [from, to] {
            self.cooldown_until.setter(pool).set(until);
            tracker.checkpoint(pool, now);
        }

        evm::log(Rebalanced { from_pool: from, to_pool: to, token, amount });
        Ok(())
    }
}
