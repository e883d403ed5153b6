//! Deployable yield optimizer hook.
#![cfg_attr(not(any(test, feature = "export-abi")), no_main)]
extern crate alloc;

use alloy_primitives::{Address, FixedBytes, I128, U256};
use stylus_sdk::{abi::Bytes, prelude::*};
use yield_hooks::{
    hook::{Error, YieldOptimizerHook},
    uniswap::v4::{
        hooks::Permissions, BalanceDelta, BeforeSwapDelta, IHooks, PoolKey,
        SwapParams, U24,
    },
};

#[entrypoint]
#[storage]
struct YieldOptimizerHookContract {
    hook: YieldOptimizerHook,
}

#[public]
#[implements(IHooks<Error = Error>)]
impl YieldOptimizerHookContract {
    #[constructor]
    fn constructor(
        &mut self,
        pool_manager: Address,
        initial_owner: Address,
    ) -> Result<(), Error> {
        self.hook.constructor(pool_manager, initial_owner)
    }

    fn deposit(&mut self, token: Address, amount: U256) -> Result<(), Error> {
        self.hook.deposit(token, amount)
    }

    fn withdraw(&mut self, token: Address, amount: U256) -> Result<(), Error> {
        self.hook.withdraw(token, amount)
    }

    fn allocate(&mut self, key: PoolKey, amount: U256) -> Result<(), Error> {
        self.hook.allocate(key, amount)
    }

    fn deallocate(&mut self, key: PoolKey, amount: U256) -> Result<(), Error> {
        self.hook.deallocate(key, amount)
    }

    fn claim_yield(&mut self, key: PoolKey) -> Result<U256, Error> {
        self.hook.claim_yield(key)
    }

    fn balance_of(&self, user: Address, token: Address) -> U256 {
        self.hook.balance_of(user, token)
    }

    fn total_of(&self, token: Address) -> U256 {
        self.hook.total_of(token)
    }

    fn allocated_of(&self, user: Address, token: Address) -> U256 {
        self.hook.allocated_of(user, token)
    }

    fn yield_of(&self, key: PoolKey, user: Address) -> Result<U256, Error> {
        self.hook.yield_of(key, user)
    }

    fn yield_index(&self, key: PoolKey) -> U256 {
        self.hook.yield_index(key)
    }

    fn managed_liquidity(&self, key: PoolKey) -> U256 {
        self.hook.managed_liquidity(key)
    }

    fn reserve_of(&self, key: PoolKey) -> U256 {
        self.hook.reserve_of(key)
    }

    fn is_managed(&self, key: PoolKey) -> bool {
        self.hook.is_managed(key)
    }

    fn cooldown_until(&self, key: PoolKey) -> u64 {
        self.hook.cooldown_until(key)
    }

    fn pool_manager(&self) -> Address {
        self.hook.pool_manager()
    }

    fn owner(&self) -> Address {
        self.hook.owner()
    }

    fn rebalance_config(&self) -> (u16, U256, u16, u64, bool, u32) {
        self.hook.rebalance_config()
    }

    fn register_pool(
        &mut self,
        key: PoolKey,
        managed_token: Address,
        hook_share_bps: u16,
    ) -> Result<(), Error> {
        self.hook.register_pool(key, managed_token, hook_share_bps)
    }

    fn set_rebalance_config(
        &mut self,
        trigger_bps: u16,
        min_trade: U256,
        max_move_bps: u16,
        cooldown: u64,
        auto_rebalance: bool,
        dynamic_fee: u32,
    ) -> Result<(), Error> {
        self.hook.set_rebalance_config(
            trigger_bps,
            min_trade,
            max_move_bps,
            cooldown,
            auto_rebalance,
            dynamic_fee,
        )
    }

    fn seed_reserve(&mut self, key: PoolKey, amount: U256) -> Result<(), Error> {
        self.hook.seed_reserve(key, amount)
    }

    fn unseed_reserve(
        &mut self,
        key: PoolKey,
        amount: U256,
    ) -> Result<(), Error> {
        self.hook.unseed_reserve(key, amount)
    }

    fn claim_reserve_yield(&mut self, key: PoolKey) -> Result<U256, Error> {
        self.hook.claim_reserve_yield(key)
    }

    fn execute_rebalance(
        &mut self,
        from_key: PoolKey,
        to_key: PoolKey,
        amount: U256,
    ) -> Result<(), Error> {
        self.hook.execute_rebalance(from_key, to_key, amount)
    }

    fn transfer_ownership(&mut self, new_owner: Address) -> Result<(), Error> {
        self.hook.transfer_ownership(new_owner)
    }
}

#[public]
impl IHooks for YieldOptimizerHookContract {
    type Error = Error;

    fn get_hook_permissions(&self) -> Permissions {
        self.hook.get_hook_permissions()
    }

    fn before_swap(
        &mut self,
        sender: Address,
        key: PoolKey,
        params: SwapParams,
        hook_data: Bytes,
    ) -> Result<(FixedBytes<4>, BeforeSwapDelta, U24), Self::Error> {
        self.hook.before_swap(sender, key, params, hook_data)
    }

    fn after_swap(
        &mut self,
        sender: Address,
        key: PoolKey,
        params: SwapParams,
        delta: BalanceDelta,
        hook_data: Bytes,
    ) -> Result<(FixedBytes<4>, I128), Self::Error> {
        self.hook.after_swap(sender, key, params, delta, hook_data)
    }
}
