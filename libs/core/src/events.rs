//! Audit-trail events appended to a pair's journal.

use serde::{Deserialize, Serialize};
use xyk_types::Address;

/// One committed state transition of a pair.
///
/// `Sync` is recorded on every reserve commit, followed by the operation's
/// own event; field order matches the state change just committed. The
/// journal is the sole externally observable audit trail of a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairEvent {
    Mint {
        to: Address,
        amount0: u128,
        amount1: u128,
    },
    Burn {
        amount0: u128,
        amount1: u128,
        to: Address,
    },
    Swap {
        amount0_in: u128,
        amount1_in: u128,
        amount0_out: u128,
        amount1_out: u128,
        to: Address,
    },
    Sync {
        reserve0: u128,
        reserve1: u128,
    },
}
