//! CREATE2 salt mining for Uniswap V4 hook addresses.
//!
//! The pool manager decides which callbacks a hook receives by reading the
//! low 14 bits of the hook's address. A hook therefore has to be deployed
//! with `CREATE2` at an address whose flag bits are exactly its permission
//! bitmap. [`HookMiner`] searches a salt range for such an address:
//!
//! ```
//! use alloy_primitives::address;
//! use hook_miner::{HookMiner, AFTER_SWAP_FLAG, BEFORE_SWAP_FLAG};
//!
//! let deployer = address!("4e59b44847b379578588920cA78FbF26c0B4956C");
//! let miner = HookMiner::from_init_code(
//!     deployer,
//!     b"hook init code",
//!     BEFORE_SWAP_FLAG | AFTER_SWAP_FLAG,
//! )
//! .unwrap();
//!
//! let mined = miner.mine(200_000).unwrap();
//! assert!(hook_miner::matches(mined.address, BEFORE_SWAP_FLAG | AFTER_SWAP_FLAG));
//! ```
//!
//! Mining is pure: the same inputs always yield the same salt, sequentially
//! or across threads.
use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicU64, Ordering},
    thread,
};

use alloy_primitives::{keccak256, Address, B256, U256};

/// Mask of the address bits holding hook permission flags.
pub const ALL_HOOK_MASK: u16 = (1 << 14) - 1;
/// Flag of the `beforeSwap` callback.
pub const BEFORE_SWAP_FLAG: u16 = 1 << 7;
/// Flag of the `afterSwap` callback.
pub const AFTER_SWAP_FLAG: u16 = 1 << 6;

/// Attempt bound of the v4-periphery `HookMiner`.
///
/// A salt matches a given 14-bit flag combination with probability `2^-14`,
/// so a search needs 16_384 attempts on average. This bound is about ten
/// times that, and fails with probability `(1 - 2^-14)^160_444`, below
/// `6e-5`.
pub const DEFAULT_MAX_ATTEMPTS: u64 = 160_444;

/// An error that occurred while mining a hook address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MinerError {
    /// The requested flags set bits outside [`ALL_HOOK_MASK`].
    #[error("flags {flags:#06x} set bits outside the hook mask")]
    InvalidFlags {
        /// The rejected flags.
        flags: u16,
    },
    /// No salt in the searched range produces a matching address.
    #[error("no matching hook address within {attempts} attempts")]
    AddressMiningExhausted {
        /// Number of salts tried.
        attempts: u64,
    },
}

/// A salt together with the hook address it deploys to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinedAddress {
    /// Address the hook gets when deployed with [`Self::salt`].
    pub address: Address,
    /// The `CREATE2` salt.
    pub salt: B256,
}

/// Searches `CREATE2` salts for an address carrying a given permission
/// bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookMiner {
    deployer: Address,
    init_code_hash: B256,
    flags: u16,
    start: U256,
}

impl HookMiner {
    /// Creates a miner for contracts deployed by `deployer` with init code
    /// hashing to `init_code_hash`. The search starts at salt zero.
    ///
    /// # Errors
    ///
    /// * [`MinerError::InvalidFlags`] - If `flags` has bits outside
    ///   [`ALL_HOOK_MASK`].
    pub fn new(
        deployer: Address,
        init_code_hash: B256,
        flags: u16,
    ) -> Result<Self, MinerError> {
        if flags & !ALL_HOOK_MASK != 0 {
            return Err(MinerError::InvalidFlags { flags });
        }
        Ok(Self { deployer, init_code_hash, flags, start: U256::ZERO })
    }

    /// Same as [`Self::new`], hashing `init_code` (creation bytecode followed
    /// by the ABI-encoded constructor arguments).
    ///
    /// # Errors
    ///
    /// * [`MinerError::InvalidFlags`] - If `flags` has bits outside
    ///   [`ALL_HOOK_MASK`].
    pub fn from_init_code(
        deployer: Address,
        init_code: &[u8],
        flags: u16,
    ) -> Result<Self, MinerError> {
        Self::new(deployer, keccak256(init_code), flags)
    }

    /// Makes the search start at `start` instead of zero, so that disjoint
    /// salt ranges can be searched independently.
    #[must_use]
    pub fn with_start(mut self, start: U256) -> Self {
        self.start = start;
        self
    }

    /// Returns the flags searched for.
    #[must_use]
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Tries up to `max_attempts` consecutive salts and returns the first
    /// one whose address matches.
    ///
    /// # Errors
    ///
    /// * [`MinerError::AddressMiningExhausted`] - If none of the salts
    ///   match.
    pub fn mine(&self, max_attempts: u64) -> Result<MinedAddress, MinerError> {
        (0..max_attempts)
            .find_map(|attempt| self.try_attempt(attempt))
            .ok_or(MinerError::AddressMiningExhausted { attempts: max_attempts })
    }

    /// Same as [`Self::mine`], spreading the attempts over `workers` scoped
    /// threads. Worker `w` tries attempts `w`, `w + workers`, ... and the
    /// lowest matching attempt wins, so the result equals the sequential
    /// one. `workers` is clamped to the available parallelism.
    ///
    /// # Errors
    ///
    /// * [`MinerError::AddressMiningExhausted`] - If none of the salts
    ///   match.
    pub fn mine_parallel(
        &self,
        max_attempts: u64,
        workers: usize,
    ) -> Result<MinedAddress, MinerError> {
        let workers = worker_count(workers);
        let stride = u64::try_from(workers).unwrap_or(u64::MAX);
        // Lowest matching attempt seen so far; workers stop past it.
        let best = AtomicU64::new(u64::MAX);

        thread::scope(|scope| {
            for worker in 0..stride.min(max_attempts) {
                let best = &best;
                scope.spawn(move || {
                    let mut attempt = worker;
                    while attempt < max_attempts
                        && attempt < best.load(Ordering::Relaxed)
                    {
                        if self.try_attempt(attempt).is_some() {
                            best.fetch_min(attempt, Ordering::Relaxed);
                            return;
                        }
                        attempt = match attempt.checked_add(stride) {
                            Some(next) => next,
                            None => return,
                        };
                    }
                });
            }
        });

        match best.into_inner() {
            u64::MAX => {
                Err(MinerError::AddressMiningExhausted { attempts: max_attempts })
            }
            attempt => self
                .try_attempt(attempt)
                .ok_or(MinerError::AddressMiningExhausted { attempts: max_attempts }),
        }
    }

    fn salt(&self, attempt: u64) -> B256 {
        B256::from(self.start.wrapping_add(U256::from(attempt)).to_be_bytes::<32>())
    }

    fn try_attempt(&self, attempt: u64) -> Option<MinedAddress> {
        let salt = self.salt(attempt);
        let address = compute_address(self.deployer, salt, self.init_code_hash);
        matches(address, self.flags).then_some(MinedAddress { address, salt })
    }
}

/// Clamps `requested` to `1..=available_parallelism`.
fn worker_count(requested: usize) -> usize {
    let available = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    requested.clamp(1, available)
}

/// Computes the `CREATE2` address
/// `keccak256(0xff ++ deployer ++ salt ++ init_code_hash)[12..]`.
#[must_use]
pub fn compute_address(
    deployer: Address,
    salt: B256,
    init_code_hash: B256,
) -> Address {
    deployer.create2(salt, init_code_hash)
}

/// Returns true when the flag bits of `address` are exactly `flags`.
#[must_use]
pub fn matches(address: Address, flags: u16) -> bool {
    let low = u16::from_be_bytes([address[18], address[19]]);
    low & ALL_HOOK_MASK == flags
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, b256, bytes};

    use super::*;

    const SWAP_FLAGS: u16 = BEFORE_SWAP_FLAG | AFTER_SWAP_FLAG;

    fn miner() -> HookMiner {
        HookMiner::from_init_code(
            address!("4e59b44847b379578588920cA78FbF26c0B4956C"),
            &bytes!("6080604052348015600e575f80fd5b50"),
            SWAP_FLAGS,
        )
        .unwrap()
    }

    #[test]
    fn swap_flags_are_0xc0() {
        assert_eq!(SWAP_FLAGS, 0xC0);
    }

    #[test]
    fn computes_create2_addresses() {
        // EIP-1014 examples 0 and 1.
        let init_code_hash = keccak256([0x00_u8]);
        assert_eq!(
            compute_address(Address::ZERO, B256::ZERO, init_code_hash),
            address!("4D1A2e2bB4F88F0250f26Ffff098B0b30B26BF38")
        );
        assert_eq!(
            compute_address(
                address!("deadbeef00000000000000000000000000000000"),
                B256::ZERO,
                init_code_hash,
            ),
            address!("B928f69Bb1D91Cd65274e3c79d8986362984fDA3")
        );
        assert_eq!(
            compute_address(
                address!("deadbeef00000000000000000000000000000000"),
                b256!("000000000000000000000000feed000000000000000000000000000000000000"),
                init_code_hash,
            ),
            address!("D04116cDd17beBE565EB2422F2497E06cC1C9833")
        );
    }

    #[test]
    fn matches_exact_flag_bits_only() {
        let hook = address!("00000000000000000000000000000000000000C0");
        assert!(matches(hook, SWAP_FLAGS));
        assert!(!matches(hook, BEFORE_SWAP_FLAG));

        // Bit 8 is `afterRemoveLiquidity`.
        let extra = address!("00000000000000000000000000000000000001C0");
        assert!(!matches(extra, SWAP_FLAGS));

        // Bits above the mask are ignored.
        let high = address!("ffffffffffffffffffffffffffffffffffffc0C0");
        assert!(matches(high, SWAP_FLAGS));
    }

    #[test]
    fn rejects_flags_outside_mask() {
        let err = HookMiner::new(Address::ZERO, B256::ZERO, 1 << 14).unwrap_err();
        assert_eq!(err, MinerError::InvalidFlags { flags: 1 << 14 });
    }

    #[test]
    fn mines_swap_only_address() {
        let miner = miner();
        let mined = miner.mine(200_000).unwrap();

        assert!(matches(mined.address, SWAP_FLAGS));
        assert_eq!(mined.address.0[19], 0xC0);
        assert_eq!(
            compute_address(
                address!("4e59b44847b379578588920cA78FbF26c0B4956C"),
                mined.salt,
                keccak256(bytes!("6080604052348015600e575f80fd5b50")),
            ),
            mined.address
        );
        // Deterministic.
        assert_eq!(miner.mine(200_000).unwrap(), mined);
    }

    #[test]
    fn mining_returns_first_matching_salt() {
        let miner = miner();
        let mined = miner.mine(200_000).unwrap();
        let first = U256::from_be_bytes(mined.salt.0).to::<u64>();

        let err = miner.mine(first).unwrap_err();
        assert_eq!(err, MinerError::AddressMiningExhausted { attempts: first });
    }

    #[test]
    fn start_skips_earlier_salts() {
        let miner = miner();
        let mined = miner.mine(200_000).unwrap();
        let first = U256::from_be_bytes(mined.salt.0);

        let next = miner.with_start(first + U256::from(1)).mine(400_000).unwrap();
        assert!(U256::from_be_bytes(next.salt.0) > first);
        assert!(matches(next.address, SWAP_FLAGS));
    }

    #[test]
    fn zero_attempts_are_exhausted() {
        let err = miner().mine(0).unwrap_err();
        assert_eq!(err, MinerError::AddressMiningExhausted { attempts: 0 });
        let err = miner().mine_parallel(0, 4).unwrap_err();
        assert_eq!(err, MinerError::AddressMiningExhausted { attempts: 0 });
    }

    #[test]
    fn parallel_mining_matches_sequential() {
        let miner = miner();
        let sequential = miner.mine(200_000).unwrap();
        for workers in [0, 1, 3, 8] {
            assert_eq!(miner.mine_parallel(200_000, workers).unwrap(), sequential);
        }
    }

    #[test]
    fn worker_count_is_clamped() {
        let available = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        assert_eq!(worker_count(0), 1);
        assert_eq!(worker_count(1), 1);
        assert_eq!(worker_count(usize::MAX), available);
        assert!(worker_count(3) <= available);

        let miner = miner();
        assert_eq!(
            miner.mine_parallel(200_000, 100_000).unwrap(),
            miner.mine(200_000).unwrap()
        );
    }

    #[test]
    fn default_bound_is_ten_expected_searches() {
        let expected = u64::from(ALL_HOOK_MASK) + 1;
        assert_eq!(expected, 16_384);
        assert_eq!(DEFAULT_MAX_ATTEMPTS.div_ceil(expected), 10);
    }

    #[test]
    fn zero_flags_require_clear_bits() {
        let miner = HookMiner::from_init_code(Address::ZERO, &[0x00], 0).unwrap();
        let mined = miner.mine(DEFAULT_MAX_ATTEMPTS).unwrap();
        let low = u16::from_be_bytes([mined.address[18], mined.address[19]]);
        assert_eq!(low & ALL_HOOK_MASK, 0);
    }
}
