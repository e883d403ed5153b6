//! Contract module that helps prevent nested entry into a contract's own
//! entry points.
//!
//! Entry points wrapped by the owning contract mark the guard as entered for
//! the duration of the call. Any call that reaches another wrapped entry point
//! while the guard is held (for instance through a token callback or a pool
//! manager calling back into the hook) fails with [`ReentrantCallback`].
//!
//! The guard itself only knows how to flip its flag. Scoping (releasing on
//! every exit path) is the job of the owning contract, which wraps its entry
//! points in a closure between [`ReentrancyGuard::enter`] and
//! [`ReentrancyGuard::exit`].
pub use sol::*;
use alloc::{vec, vec::Vec};

use stylus_sdk::{prelude::*, storage::StorageBool};

#[cfg_attr(coverage_nightly, coverage(off))]
mod sol {
    use alloy_sol_macro::sol;

    sol! {
        /// A guarded entry point was reached while another one was still
        /// executing.
        #[derive(Debug)]
        #[allow(missing_docs)]
        error ReentrantCallback();
    }
}

/// An error that occurred in the [`ReentrancyGuard`].
#[derive(SolidityError, Debug)]
pub enum Error {
    /// A guarded entry point was re-entered.
    Reentrant(ReentrantCallback),
}

/// State of a [`ReentrancyGuard`].
#[storage]
pub struct ReentrancyGuard {
    /// Whether a guarded call is currently executing.
    pub(crate) entered: StorageBool,
}

impl ReentrancyGuard {
    /// Marks the guard as entered.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the guard's state.
    ///
    /// # Errors
    ///
    /// * [`Error::Reentrant`] - If the guard is already held.
    pub fn enter(&mut self) -> Result<(), Error> {
        if self.entered.get() {
            return Err(Error::Reentrant(ReentrantCallback {}));
        }
        self.entered.set(true);
        Ok(())
    }

    /// Releases the guard.
    ///
    /// # Arguments
    ///
    /// * `&mut self` - Write access to the guard's state.
    pub fn exit(&mut self) {
        self.entered.set(false);
    }

    /// Returns true while a guarded call is executing.
    ///
    /// # Arguments
    ///
    /// * `&self` - Read access to the guard's state.
    #[must_use]
    pub fn is_entered(&self) -> bool {
        self.entered.get()
    }
}
