//! Common utilities shared by the hook's components.
pub mod math;
pub mod reentrancy_guard;

pub use reentrancy_guard::ReentrancyGuard;
