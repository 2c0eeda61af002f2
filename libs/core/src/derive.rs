//! Deterministic pair-address derivation.
//!
//! Pair account ids are a pure function of the registry address and the
//! ordered asset pair, so off-host tooling can compute where a pool lives
//! without querying the registry.

use crate::error::PairError;
use ethers::utils::keccak256;
use once_cell::sync::Lazy;
use xyk_types::{Address, AssetId, PairId};

/// Versioned tag hashed into every derived address. Bump only with a
/// deliberate address-space migration.
pub static PAIR_CODE_HASH: Lazy<[u8; 32]> = Lazy::new(|| keccak256(b"xyk::pair::v1"));

/// Canonical ordering for an asset pair. Rejects identical assets and the
/// zero address; every other call site relies on `token0 < token1`.
pub fn sort_assets(asset_a: AssetId, asset_b: AssetId) -> Result<(AssetId, AssetId), PairError> {
    if asset_a == asset_b {
        return Err(PairError::IdenticalAssets);
    }
    if asset_a.is_zero() || asset_b.is_zero() {
        return Err(PairError::ZeroAddress);
    }
    if asset_a < asset_b {
        Ok((asset_a, asset_b))
    } else {
        Ok((asset_b, asset_a))
    }
}

/// Derive the pair account id: the trailing 20 bytes of
/// `keccak256(0xff ++ factory ++ keccak256(token0 ++ token1) ++ PAIR_CODE_HASH)`.
pub fn pair_address(
    factory: Address,
    asset_a: AssetId,
    asset_b: AssetId,
) -> Result<PairId, PairError> {
    let (token0, token1) = sort_assets(asset_a, asset_b)?;

    let mut salt_input = [0u8; 40];
    salt_input[..20].copy_from_slice(token0.as_bytes());
    salt_input[20..].copy_from_slice(token1.as_bytes());
    let salt = keccak256(salt_input);

    let mut preimage = Vec::with_capacity(85);
    preimage.push(0xff);
    preimage.extend_from_slice(factory.as_bytes());
    preimage.extend_from_slice(&salt);
    preimage.extend_from_slice(&*PAIR_CODE_HASH);
    let digest = keccak256(&preimage);

    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Ok(Address(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(n: u64) -> AssetId {
        Address::from_low_u64(n)
    }

    #[test]
    fn sort_orders_and_validates() {
        let (t0, t1) = sort_assets(token(2), token(1)).unwrap();
        assert_eq!((t0, t1), (token(1), token(2)));
        assert!(matches!(
            sort_assets(token(1), token(1)),
            Err(PairError::IdenticalAssets)
        ));
        assert!(matches!(
            sort_assets(Address::zero(), token(1)),
            Err(PairError::ZeroAddress)
        ));
    }

    #[test]
    fn derivation_is_order_independent() {
        let factory = Address::from_low_u64(0xFAC);
        let forward = pair_address(factory, token(1), token(2)).unwrap();
        let reverse = pair_address(factory, token(2), token(1)).unwrap();
        assert_eq!(forward, reverse);
        assert!(!forward.is_zero());
    }

    #[test]
    fn derivation_is_injective_across_inputs() {
        let factory = Address::from_low_u64(0xFAC);
        let other_factory = Address::from_low_u64(0xFAD);
        let a = pair_address(factory, token(1), token(2)).unwrap();
        let b = pair_address(factory, token(1), token(3)).unwrap();
        let c = pair_address(other_factory, token(1), token(2)).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
