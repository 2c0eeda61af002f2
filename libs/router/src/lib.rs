//! # xyk router: quoting and orchestration
//!
//! ## Purpose
//!
//! The user-facing surface of the exchange engine: read-only multi-hop
//! quoting over registry state, and a stateless [`Router`] that sequences
//! ledger transfers and pair transitions into atomic, slippage-bounded,
//! deadline-gated operations.
//!
//! ## Architecture Role
//!
//! Sits on top of `xyk-core`. The router owns no state of its own; it holds
//! handles to the registry and ledger and derives everything else per call.
//! Atomicity comes from `xyk-core`'s transactional bracket, which rewinds
//! registry and ledger state when any step of a multi-hop flow fails.

mod error;
mod quoting;
mod router;

pub use error::RouterError;
pub use quoting::{get_amounts_in, get_amounts_out, reserves_for};
pub use router::{Router, DEFAULT_SWAP_FEE};

// Single-asset deposit callers quote with the same math the engine settles
// with, so the curve helpers are part of this crate's surface too.
pub use xyk_math::{optimal_swap_split, quote};
