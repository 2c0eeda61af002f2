//! 20-byte identifiers with hex formatting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when parsing an [`Address`] from a hex string.
#[derive(Debug, Error, PartialEq)]
pub enum AddressParseError {
    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("expected 20 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 20-byte identifier for assets, pairs and accounts.
///
/// Ordering is the lexicographic byte order; asset pairs are canonicalized
/// with the smaller address first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address. Used as the burn destination for permanently
    /// locked liquidity and rejected as an asset identifier.
    pub const fn zero() -> Self {
        Address([0u8; 20])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Build an address with the value in the trailing 8 bytes. Handy for
    /// tests and examples that want readable identifiers.
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Address(bytes)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)?;
        let array: [u8; 20] = bytes
            .try_into()
            .map_err(|bytes: Vec<u8>| AddressParseError::InvalidLength(bytes.len()))?;
        Ok(Address(array))
    }
}
