/*!
# Yield Optimizer Hook for Stylus

A Uniswap V4 hook written in Rust for
[Arbitrum Stylus](https://docs.arbitrum.io/stylus/stylus-gentle-introduction).
Users deposit ERC-20 tokens into the hook's custody and allocate them to
managed pools. Every swap through a managed pool raises that pool's yield
index by the fee attributable to hook-managed liquidity, and the hook moves
its own reserve liquidity toward the pools with the best yield.

> This project has never been audited nor thoroughly reviewed for security
> vulnerabilities. Do not use in production.

## Usage

The crate is meant to be embedded by a contract that carries the
`#[entrypoint]`:

```ignore
use yield_hooks::hook::{self, YieldOptimizerHook};
use stylus_sdk::prelude::*;

#[entrypoint]
#[storage]
struct MyHook {
    hook: YieldOptimizerHook,
}
```

The hook must be deployed to an address whose low 14 bits are exactly the
`beforeSwap` and `afterSwap` flags. See the `hook-miner` crate for finding a
matching `CREATE2` salt.
*/

#![allow(clippy::module_name_repetitions)]
#![cfg_attr(not(any(test, feature = "export-abi")), no_std, no_main)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![deny(rustdoc::broken_intra_doc_links)]
extern crate alloc;

pub mod hook;
pub mod ledger;
pub mod rebalance;
pub mod token;
pub mod uniswap;
pub mod utils;
pub mod yield_tracker;
