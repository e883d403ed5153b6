//! Uniswap protocol integrations.
pub mod v4;
