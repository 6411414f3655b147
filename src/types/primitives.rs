// Primitives - Minimal foundational types
use serde::{Deserialize, Serialize};
use std::fmt;

/// AccountId = opaque 32-byte key
/// Principle: no identity, just keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId([u8; 32]);

impl AccountId {
    pub const ZERO: AccountId = AccountId([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        AccountId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The zero address is never a valid fee or manager address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        AccountId(bytes)
    }
}

/// Block number (u64 is enough for centuries at any block time)
pub type BlockNumber = u64;

/// Epoch number (fixed-length block interval)
pub type EpochNumber = u64;

/// Balance (u128 = enough headroom for proportional arithmetic)
/// 1 COIN = 10^18 units
pub type Balance = u128;

/// Monetary constants
pub const COIN: Balance = 1_000_000_000_000_000_000; // 10^18
pub const MILLICOIN: Balance = 1_000_000_000_000_000; // 10^15

/// Basis points denominator: 10_000 bps = 100%
pub const BPS_DENOMINATOR: u32 = 10_000;
