//! Per-user, per-token deposit accounting.
//!
//! The ledger records how much of each token every user has deposited into
//! the hook, together with the global per-token totals. It never moves tokens
//! itself: the owning contract performs the transfer through the token
//! collaborator and records the result here within the same call.
//!
//! Part of a user's balance may be *allocated* to pool positions. Allocated
//! funds stay in the user's balance (and in the token total) but cannot be
//! withdrawn until they are released back.
//!
//! The following invariants hold after every call, successful or not:
//!
//! * for every token, the sum of all user balances equals the token total;
//! * for every user and token, the allocated amount never exceeds the
//!   balance.
//!
//! Each mutation validates and computes every new value before writing any
//! of them, so a failed call leaves the ledger untouched.
use alloc::{vec, vec::Vec};

use alloy_primitives::{Address, U256};
pub use sol::*;
use stylus_sdk::{
    evm,
    prelude::*,
    storage::{StorageMap, StorageU256},
};

use crate::utils::math::{self, ArithmeticOverflow, ArithmeticUnderflow};

#[cfg_attr(coverage_nightly, coverage(off))]
mod sol {
    use alloy_sol_macro::sol;

    sol! {
        /// Emitted when `amount` of `token` is credited to `user`.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event Deposited(address indexed user, address indexed token, uint256 amount);

        /// Emitted when `amount` of `token` is debited from `user`.
        #[derive(Debug)]
        #[allow(missing_docs)]
        event Withdrawn(address indexed user, address indexed token, uint256 amount);
    }

    sol! {
        /// Indicates an error related to the current balance of `account`.
        ///
        /// * `account` - Account whose balance is insufficient.
        /// * `token` - Token of the balance.
        /// * `available` - Amount the account can currently use.
        /// * `needed` - Amount the operation required.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error InsufficientBalance(address account, address token, uint256 available, uint256 needed);

        /// A zero amount was supplied where a positive one is required.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error ZeroAmount();
    }
}

/// An error that occurred in the [`DepositLedger`].
#[derive(SolidityError, Debug)]
pub enum Error {
    /// The account does not hold enough free balance.
    InsufficientBalance(InsufficientBalance),
    /// The amount is zero.
    ZeroAmount(ZeroAmount),
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

/// State of a [`DepositLedger`].
#[storage]
pub struct DepositLedger {
    /// Maps users to their per-token balances.
    pub(crate) user_deposits:
        StorageMap<Address, StorageMap<Address, StorageU256>>,
    /// Maps tokens to the sum of all user balances.
    pub(crate) total_deposits: StorageMap<Address, StorageU256>,
    /// Maps users to the part of their per-token balances held in pool
    /// positions.
    pub(crate) allocated: StorageMap<Address, StorageMap<Address, StorageU256>>,
}

impl DepositLedger {
    /// Returns the balance of `token` recorded for `user`.
    ///
    /// # Arguments
    ///
    /// * `&self` - Read access to the ledger's state.
    /// * `user` - Account to query.
    /// * `token` - Token to query.
    #[must_use]
    pub fn balance_of(&self, user: Address, token: Address) -> U256 {
        self.user_deposits.get(user).get(token)
    }

    /// Returns the sum of all balances of `token`.
    ///
    /// # Arguments
    ///
    /// * `&self` - Read access to the ledger's state.
    /// * `token` - Token to query.
    #[must_use]
    pub fn total_of(&self, token: Address) -> U256 {
        self.total_deposits.get(token)
    }

    /// Returns the part of `user`'s balance of `token` allocated to pools.
    ///
    /// # Arguments
    ///
    /// * `&self` - Read access to the ledger's state.
    /// * `user` - Account to query.
    /// * `token` - Token to query.
    #[must_use]
    pub fn allocated_of(&self, user: Address, token: Address) -> U256 {
        self.allocated.get(user).get(token)
    }

    /// Returns the part of `user`'s balance of `token` that can be withdrawn
    /// or allocated.
    ///
    /// # Arguments
    ///
    /// * `&self` - Read access to the ledger's state.
    /// * `user` - Account to query.
    /// * `token` - Token to query.
    #[must_use]
    pub fn available_of(&self, user: Address, token: Address) -> U256 {
        // `allocated <= balance` is kept by every mutation.
        self.balance_of(user, token)
            .saturating_sub(self.allocated_of(user, token))
    }

    /// Credits `amount` of `token` to `user`.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the ledger's state.
    /// * `user` - Account to credit.
    /// * `token` - Deposited token.
    /// * `amount` - Deposited amount.
    ///
    /// # Errors
    ///
    /// * [`Error::ZeroAmount`] - If `amount` is zero.
    /// * [`Error::Overflow`] - If the balance or the total would exceed
    ///   `U256::MAX`.
    ///
    /// # Events
    ///
    /// * [`Deposited`].
    pub fn deposit(
        &mut self,
        user: Address,
        token: Address,
        amount: U256,
    ) -> Result<(), Error> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount(ZeroAmount {}));
        }

        let balance = math::add(self.balance_of(user, token), amount)?;
        let total = math::add(self.total_of(token), amount)?;

        self.user_deposits.setter(user).setter(token).set(balance);
        self.total_deposits.setter(token).set(total);

        evm::log(Deposited { user, token, amount });
        Ok(())
    }

    /// Debits `amount` of `token` from `user`.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the ledger's state.
    /// * `user` - Account to debit.
    /// * `token` - Withdrawn token.
    /// * `amount` - Withdrawn amount.
    ///
    /// # Errors
    ///
    /// * [`Error::ZeroAmount`] - If `amount` is zero.
    /// * [`Error::InsufficientBalance`] - If `amount` exceeds the free
    ///   balance of `user`.
    /// * [`Error::Underflow`] - If the token total is smaller than the
    ///   balance, which the ledger invariant rules out.
    ///
    /// # Events
    ///
    /// * [`Withdrawn`].
    pub fn withdraw(
        &mut self,
        user: Address,
        token: Address,
        amount: U256,
    ) -> Result<(), Error> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount(ZeroAmount {}));
        }

        let available = self.available_of(user, token);
        if amount > available {
            return Err(Error::InsufficientBalance(InsufficientBalance {
                account: user,
                token,
                available,
                needed: amount,
            }));
        }

        let balance = math::sub(self.balance_of(user, token), amount)?;
        let total = math::sub(self.total_of(token), amount)?;

        self.user_deposits.setter(user).setter(token).set(balance);
        self.total_deposits.setter(token).set(total);

        evm::log(Withdrawn { user, token, amount });
        Ok(())
    }

    /// Locks `amount` of `user`'s free balance of `token` for pool
    /// positions.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the ledger's state.
    /// * `user` - Account whose balance is allocated.
    /// * `token` - Allocated token.
    /// * `amount` - Allocated amount.
    ///
    /// # Errors
    ///
    /// * [`Error::ZeroAmount`] - If `amount` is zero.
    /// * [`Error::InsufficientBalance`] - If `amount` exceeds the free
    ///   balance of `user`.
    pub fn allocate(
        &mut self,
        user: Address,
        token: Address,
        amount: U256,
    ) -> Result<(), Error> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount(ZeroAmount {}));
        }

        let available = self.available_of(user, token);
        if amount > available {
            return Err(Error::InsufficientBalance(InsufficientBalance {
                account: user,
                token,
                available,
                needed: amount,
            }));
        }

        let allocated = math::add(self.allocated_of(user, token), amount)?;
        self.allocated.setter(user).setter(token).set(allocated);
        Ok(())
    }

    /// Unlocks `amount` of `user`'s allocated balance of `token`.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the ledger's state.
    /// * `user` - Account whose balance is released.
    /// * `token` - Released token.
    /// * `amount` - Released amount.
    ///
    /// # Errors
    ///
    /// * [`Error::ZeroAmount`] - If `amount` is zero.
    /// * [`Error::InsufficientBalance`] - If `amount` exceeds the allocated
    ///   balance of `user`.
    pub fn release(
        &mut self,
        user: Address,
        token: Address,
        amount: U256,
    ) -> Result<(), Error> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount(ZeroAmount {}));
        }

        let allocated = self.allocated_of(user, token);
        if amount > allocated {
            return Err(Error::InsufficientBalance(InsufficientBalance {
                account: user,
                token,
                available: allocated,
                needed: amount,
            }));
        }

        self.allocated.setter(user).setter(token).set(allocated - amount);
        Ok(())
    }
}
