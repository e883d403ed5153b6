//! Minimal ERC-20 used as the token collaborator in unit tests.
use alloc::vec::Vec;

use alloy_primitives::{Address, U256};
use stylus_sdk::{
    msg,
    prelude::*,
    storage::{StorageBool, StorageMap, StorageU256},
};

#[storage]
pub(crate) struct MockErc20 {
    balances: StorageMap<Address, StorageU256>,
    allowances: StorageMap<Address, StorageMap<Address, StorageU256>>,
    /// When set, every transfer returns `false` instead of moving funds.
    frozen: StorageBool,
}

unsafe impl TopLevelStorage for MockErc20 {}

#[public]
impl MockErc20 {
    pub(crate) fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(account)
    }

    pub(crate) fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(owner).get(spender)
    }

    pub(crate) fn approve(&mut self, spender: Address, value: U256) -> bool {
        self.allowances.setter(msg::sender()).setter(spender).set(value);
        true
    }

    pub(crate) fn transfer(
        &mut self,
        to: Address,
        value: U256,
    ) -> Result<bool, Vec<u8>> {
        self.move_funds(msg::sender(), to, value)
    }

    pub(crate) fn transfer_from(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<bool, Vec<u8>> {
        let spender = msg::sender();
        let allowance = self.allowances.get(from).get(spender);
        if allowance < value {
            return Err(b"insufficient allowance".to_vec());
        }
        let moved = self.move_funds(from, to, value)?;
        if moved {
            self.allowances.setter(from).setter(spender).set(allowance - value);
        }
        Ok(moved)
    }
}

impl MockErc20 {
    pub(crate) fn mint(&mut self, to: Address, value: U256) {
        let balance = self.balances.get(to);
        self.balances.setter(to).set(balance + value);
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen.set(true);
    }

    fn move_funds(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<bool, Vec<u8>> {
        if self.frozen.get() {
            return Ok(false);
        }
        let from_balance = self.balances.get(from);
        if from_balance < value {
            return Err(b"insufficient balance".to_vec());
        }
        self.balances.setter(from).set(from_balance - value);
        let to_balance = self.balances.get(to);
        self.balances.setter(to).set(to_balance + value);
        Ok(true)
    }
}
