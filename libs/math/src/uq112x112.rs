//! Q112.112 fixed-point encoding for price accumulators.
//!
//! Reserves are bounded to 112 bits, so the marginal price of one reserve in
//! terms of the other fits a 224-bit fixed-point value with 112 fractional
//! bits. Accumulators sum these prices over elapsed time; they wrap on
//! overflow and are meaningful only as differences between two reads.

use crate::MathError;
use ethereum_types::U256;

/// Number of fractional bits.
pub const RESOLUTION: u32 = 112;

/// Encode an integer as Q112.112.
pub fn encode(value: u128) -> U256 {
    U256::from(value) << RESOLUTION
}

/// `numerator / denominator` in Q112.112.
pub fn fraction(numerator: u128, denominator: u128) -> Result<U256, MathError> {
    if denominator == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    Ok(encode(numerator) / U256::from(denominator))
}

/// Truncate a Q112.112 value back to its integer part.
pub fn decode(value: U256) -> U256 {
    value >> RESOLUTION
}
