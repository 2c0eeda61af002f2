//! # xyk core: pair state machine, registry and ledger
//!
//! ## Purpose
//!
//! The exchange engine proper: per-pair reserve and invariant bookkeeping
//! with the mint/burn/swap/sync/skim protocol, cumulative price accumulation,
//! deterministic pair-address derivation, the pair registry, and the narrow
//! ledger interface the engine settles against.
//!
//! ## Architecture Role
//!
//! Pairs are independent entities behind a registry table; all mutating calls
//! to one pair are serialized by its reentrancy flag while distinct pairs
//! proceed concurrently. The router crate sequences ledger transfers and pair
//! transitions on top of this crate; quoting math lives in `xyk-math`.
//!
//! ## Atomicity
//!
//! The engine itself never rolls anything back. Multi-step operations get
//! all-or-nothing semantics from [`transactional`], which snapshots registry
//! and ledger state and restores both if the closure fails. It is the
//! compensating layer a non-transactional host must supply.

mod atomic;
mod clock;
mod derive;
mod error;
mod events;
mod ledger;
mod pair;
mod registry;

pub use atomic::transactional;
pub use clock::{Clock, ManualClock, SystemClock};
pub use derive::{pair_address, sort_assets, PAIR_CODE_HASH};
pub use error::PairError;
pub use events::PairEvent;
pub use ledger::{permit_digest, InMemoryLedger, Ledger, LedgerError, SnapshotLedger};
pub use pair::{Pair, SwapCallback};
pub use registry::PairRegistry;

pub use xyk_math::{FEE_BASE, MAX_RESERVE, MINIMUM_LIQUIDITY};
pub use xyk_types::{AccountId, Address, AssetId, PairId};
