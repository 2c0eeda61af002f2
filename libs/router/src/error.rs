use thiserror::Error;
use xyk_core::{LedgerError, PairError};
use xyk_math::MathError;

/// Failures surfaced by quoting and orchestration. Slippage and deadline
/// violations get their own variants; engine, ledger and math failures pass
/// through wrapped.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("deadline has passed")]
    Expired,

    #[error("swap path is invalid")]
    InvalidPath,

    #[error("no pair exists for a path hop")]
    PairNotFound,

    #[error("output below the caller's minimum")]
    InsufficientOutputAmount,

    #[error("required input above the caller's maximum")]
    ExcessiveInputAmount,

    #[error("asset A deposit below the caller's minimum")]
    InsufficientAAmount,

    #[error("asset B deposit below the caller's minimum")]
    InsufficientBAmount,

    #[error(transparent)]
    Core(#[from] PairError),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
