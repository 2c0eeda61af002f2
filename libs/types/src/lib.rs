//! Shared identifier types for the xyk exchange engine.
//!
//! Everything addressable in the engine (fungible assets, pairs, accounts)
//! is identified by a 20-byte [`Address`]. A pair's address doubles as the
//! ledger account holding its reserves and as the asset id of its liquidity
//! token, so one identifier type covers all three roles.

mod address;

pub use address::{Address, AddressParseError};

/// Identifier of a fungible asset tracked by a ledger.
pub type AssetId = Address;

/// Identifier of a pair; equals the address derived from its asset pair.
pub type PairId = Address;

/// Identifier of a ledger account.
pub type AccountId = Address;
