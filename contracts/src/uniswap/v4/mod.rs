//! Uniswap V4 types and the hook callback interface.
pub mod hooks;
pub mod types;

pub use hooks::IHooks;
pub use types::*;
