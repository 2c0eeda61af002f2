use crate::ledger::LedgerError;
use thiserror::Error;
use xyk_math::MathError;

/// Failures of pair transitions and registry operations.
///
/// Every condition is fatal to the enclosing operation and surfaced by name;
/// nothing is retried or clamped internally.
#[derive(Debug, Error)]
pub enum PairError {
    #[error("identical assets")]
    IdenticalAssets,

    #[error("zero address is not a valid asset")]
    ZeroAddress,

    #[error("assets are not in canonical order")]
    UnsortedAssets,

    #[error("swap fee {0} per-mille is out of range")]
    InvalidFee(u16),

    #[error("pair already exists")]
    PairExists,

    #[error("pair not found")]
    PairNotFound,

    #[error("insufficient output amount")]
    InsufficientOutputAmount,

    #[error("insufficient input amount")]
    InsufficientInputAmount,

    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    #[error("insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    #[error("insufficient liquidity burned")]
    InsufficientLiquidityBurned,

    #[error("constant-product invariant violated")]
    InvariantViolated,

    #[error("recipient must not be a pool asset")]
    InvalidTo,

    #[error("pair is locked")]
    Locked,

    #[error("reserve exceeds 112-bit bound")]
    ReserveOverflow,

    #[error("swap callback failed: {0}")]
    Callback(String),

    #[error("snapshot decode failed: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
