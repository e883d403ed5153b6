//! Token collaborator used by the hook for custody transfers.
pub mod interface;
#[cfg(test)]
pub(crate) mod mock;

pub use interface::Erc20Interface;
