use thiserror::Error;

/// Failures of the quoting formulas. Each maps to one caller-visible
/// condition; none are retried or clamped internally.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum MathError {
    #[error("insufficient amount")]
    InsufficientAmount,

    #[error("insufficient input amount")]
    InsufficientInputAmount,

    #[error("insufficient output amount")]
    InsufficientOutputAmount,

    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    #[error("output amount exceeds reserves")]
    ExcessiveOutputAmount,

    #[error("swap fee {0} exceeds fee base")]
    InvalidFee(u16),

    #[error("arithmetic overflow")]
    Overflow,
}
