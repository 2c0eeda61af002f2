//! Read-only path quoting against live registry state.
//!
//! Walks a swap path pair by pair, orienting each pool's reserves to the
//! travel direction and chaining the per-hop fee math from `xyk-math`.
//! Quotes read reserves without locking, so they can run concurrently with
//! trades; execution re-derives amounts against committed state.

use crate::error::RouterError;
use xyk_core::PairRegistry;
use xyk_types::AssetId;

/// Reserves of the pool for `(asset_in, asset_out)`, oriented so the first
/// element is the input-side reserve.
pub fn reserves_for(
    registry: &PairRegistry,
    asset_in: AssetId,
    asset_out: AssetId,
) -> Result<(u128, u128, u16), RouterError> {
    let pair = registry
        .get_pair(asset_in, asset_out)
        .ok_or(RouterError::PairNotFound)?;
    let (reserve0, reserve1, _) = pair.get_reserves();
    if asset_in == pair.token0() {
        Ok((reserve0, reserve1, pair.fee()))
    } else {
        Ok((reserve1, reserve0, pair.fee()))
    }
}

fn validate_path(path: &[AssetId]) -> Result<(), RouterError> {
    if path.len() < 2 {
        return Err(RouterError::InvalidPath);
    }
    if path.windows(2).any(|hop| hop[0] == hop[1]) {
        return Err(RouterError::InvalidPath);
    }
    Ok(())
}

/// Chain [`get_amount_out`](xyk_math::get_amount_out) along `path`. Returns
/// one amount per path element; the last is the deliverable output.
pub fn get_amounts_out(
    registry: &PairRegistry,
    amount_in: u128,
    path: &[AssetId],
) -> Result<Vec<u128>, RouterError> {
    validate_path(path)?;
    let mut amounts = Vec::with_capacity(path.len());
    amounts.push(amount_in);
    for hop in path.windows(2) {
        let (reserve_in, reserve_out, fee) = reserves_for(registry, hop[0], hop[1])?;
        let last = amounts[amounts.len() - 1];
        amounts.push(xyk_math::get_amount_out(last, reserve_in, reserve_out, fee)?);
    }
    Ok(amounts)
}

/// Chain [`get_amount_in`](xyk_math::get_amount_in) backwards along `path`.
/// The first element is the input required for the requested final output.
pub fn get_amounts_in(
    registry: &PairRegistry,
    amount_out: u128,
    path: &[AssetId],
) -> Result<Vec<u128>, RouterError> {
    validate_path(path)?;
    let mut amounts = vec![0u128; path.len()];
    let last = path.len() - 1;
    amounts[last] = amount_out;
    for i in (0..last).rev() {
        let (reserve_in, reserve_out, fee) = reserves_for(registry, path[i], path[i + 1])?;
        amounts[i] = xyk_math::get_amount_in(amounts[i + 1], reserve_in, reserve_out, fee)?;
    }
    Ok(amounts)
}
