//! # xyk math: exact constant-product arithmetic
//!
//! ## Purpose
//!
//! Integer math for the x·y=k exchange engine: swap quoting with a per-pair
//! fee on the input leg, liquidity-share pricing, the Q112.112 fixed point
//! used by the cumulative price accumulators, and the closed-form single-asset
//! deposit split.
//!
//! ## Design
//!
//! All amounts are unsigned 128-bit integers. Intermediate products run in
//! 256-bit arithmetic and narrowing back to `u128` is checked; nothing wraps
//! or clamps silently; overflow surfaces as [`MathError::Overflow`]. Rounding
//! always favors the pool: outputs round down, required inputs round up.

pub mod curve;
mod error;
pub mod sqrt;
pub mod uq112x112;

pub use curve::{get_amount_in, get_amount_out, optimal_swap_split, quote};
pub use error::MathError;
pub use sqrt::integer_sqrt;

pub use ethereum_types::U256;

/// Denominator of the per-mille swap fee. A fee of 3 means 0.3% of the
/// input leg is retained by the pool.
pub const FEE_BASE: u16 = 1000;

/// Liquidity shares permanently locked on the first mint into a pair,
/// guarding against the share-price-from-zero division hazard.
pub const MINIMUM_LIQUIDITY: u128 = 1000;

/// Largest representable reserve: reserves are bounded to 112 bits so that
/// a price ratio fits the Q112.112 accumulator format.
pub const MAX_RESERVE: u128 = (1u128 << 112) - 1;

/// Checked narrowing from a 256-bit intermediate back to an amount.
pub fn to_u128(value: U256) -> Result<u128, MathError> {
    if value.bits() <= 128 {
        Ok(value.low_u128())
    } else {
        Err(MathError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_checks_width() {
        assert_eq!(to_u128(U256::from(u128::MAX)).unwrap(), u128::MAX);
        assert_eq!(
            to_u128(U256::from(u128::MAX) + U256::one()),
            Err(MathError::Overflow)
        );
    }
}
