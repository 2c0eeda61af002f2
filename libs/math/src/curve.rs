//! Constant-product quoting formulas.
//!
//! The fee is taken on the input leg, expressed per-mille against
//! [`FEE_BASE`]. Output quotes round down and input quotes round up, so the
//! pool's invariant product never decreases from rounding.

use crate::{integer_sqrt, to_u128, MathError, FEE_BASE};
use ethereum_types::U256;

/// Price an amount of asset A in asset B at the current reserve ratio,
/// with no fee. Used for balanced liquidity deposits, not for swaps.
pub fn quote(amount_a: u128, reserve_a: u128, reserve_b: u128) -> Result<u128, MathError> {
    if amount_a == 0 {
        return Err(MathError::InsufficientAmount);
    }
    if reserve_a == 0 || reserve_b == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    to_u128(U256::from(amount_a) * U256::from(reserve_b) / U256::from(reserve_a))
}

/// Maximum output for a given input, after the per-mille `fee` is taken
/// from the input leg.
pub fn get_amount_out(
    amount_in: u128,
    reserve_in: u128,
    reserve_out: u128,
    fee: u16,
) -> Result<u128, MathError> {
    if fee >= FEE_BASE {
        return Err(MathError::InvalidFee(fee));
    }
    if amount_in == 0 {
        return Err(MathError::InsufficientInputAmount);
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    let amount_in_with_fee = U256::from(amount_in) * U256::from(FEE_BASE - fee);
    let numerator = amount_in_with_fee * U256::from(reserve_out);
    let denominator = U256::from(reserve_in) * U256::from(FEE_BASE) + amount_in_with_fee;
    to_u128(numerator / denominator)
}

/// Minimum input required for a given output; the inverse of
/// [`get_amount_out`], rounded up in the pool's favor.
pub fn get_amount_in(
    amount_out: u128,
    reserve_in: u128,
    reserve_out: u128,
    fee: u16,
) -> Result<u128, MathError> {
    if fee >= FEE_BASE {
        return Err(MathError::InvalidFee(fee));
    }
    if amount_out == 0 {
        return Err(MathError::InsufficientOutputAmount);
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    if amount_out >= reserve_out {
        return Err(MathError::ExcessiveOutputAmount);
    }
    let numerator = U256::from(reserve_in) * U256::from(amount_out) * U256::from(FEE_BASE);
    let denominator = U256::from(reserve_out - amount_out) * U256::from(FEE_BASE - fee);
    to_u128(numerator / denominator + U256::one())
}

/// Portion of a single-asset deposit to swap so the remainder lands as close
/// as possible to a balanced two-asset deposit.
///
/// Closed-form root of the split quadratic at the 0.3% baseline fee; the
/// constants bake that rate in and are kept even for pairs with other fees.
pub fn optimal_swap_split(reserve_in: u128, amount_in: u128) -> Result<u128, MathError> {
    if reserve_in == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    let reserve = U256::from(reserve_in);
    let radicand =
        reserve * (U256::from(amount_in) * U256::from(3_988_000u64) + reserve * U256::from(3_988_009u64));
    let root = integer_sqrt(radicand);
    let numerator = root
        .checked_sub(reserve * U256::from(1997u64))
        .unwrap_or_default();
    to_u128(numerator / U256::from(1994u64))
}
