//! Pair registry: creates pools at derived addresses and indexes them for
//! lookup by id or by asset pair.

use crate::clock::Clock;
use crate::derive::{pair_address, sort_assets};
use crate::error::PairError;
use crate::pair::{Pair, PairSnapshot};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use xyk_types::{Address, AssetId, PairId};

#[derive(Debug, Serialize, Deserialize)]
struct RegistrySnapshot {
    address: String,
    pairs: Vec<PairSnapshot>,
}

/// Owns every pair in the system. Lookups are lock-free; creation races on
/// the same asset pair are resolved by the `index` entry, which is the
/// single source of truth for existence.
pub struct PairRegistry {
    address: Address,
    clock: Arc<dyn Clock>,
    pairs: DashMap<PairId, Arc<Pair>>,
    index: DashMap<(AssetId, AssetId), PairId>,
}

impl PairRegistry {
    pub fn new(address: Address, clock: Arc<dyn Clock>) -> Self {
        Self {
            address,
            clock,
            pairs: DashMap::new(),
            index: DashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Create the pool for an asset pair at its derived address. Exactly one
    /// pool may exist per unordered pair regardless of fee.
    pub fn create_pair(
        &self,
        asset_a: AssetId,
        asset_b: AssetId,
        fee: u16,
    ) -> Result<Arc<Pair>, PairError> {
        let (token0, token1) = sort_assets(asset_a, asset_b)?;
        let id = pair_address(self.address, token0, token1)?;

        let entry = self.index.entry((token0, token1));
        let pair = match entry {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(PairError::PairExists),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let pair = Arc::new(Pair::new(id, token0, token1, fee, self.clock.clone())?);
                self.pairs.insert(id, pair.clone());
                vacant.insert(id);
                pair
            }
        };
        info!(pair = %id, %token0, %token1, fee, "pair created");
        Ok(pair)
    }

    /// Look up the pool for an asset pair, in either asset order.
    pub fn get_pair(&self, asset_a: AssetId, asset_b: AssetId) -> Option<Arc<Pair>> {
        let (token0, token1) = sort_assets(asset_a, asset_b).ok()?;
        let id = *self.index.get(&(token0, token1))?;
        self.pairs.get(&id).map(|entry| entry.clone())
    }

    /// Like [`get_pair`](Self::get_pair) but absence is an error, for call
    /// paths that require the pool to exist.
    pub fn pair(&self, asset_a: AssetId, asset_b: AssetId) -> Result<Arc<Pair>, PairError> {
        self.get_pair(asset_a, asset_b).ok_or(PairError::PairNotFound)
    }

    pub fn pair_at(&self, id: PairId) -> Option<Arc<Pair>> {
        self.pairs.get(&id).map(|entry| entry.clone())
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn all_pairs(&self) -> Vec<Arc<Pair>> {
        self.pairs.iter().map(|entry| entry.clone()).collect()
    }

    /// Serialize the registry and every pair's state.
    pub fn snapshot(&self) -> Result<Vec<u8>, PairError> {
        let snapshot = RegistrySnapshot {
            address: hex::encode(self.address.as_bytes()),
            pairs: self
                .pairs
                .iter()
                .map(|entry| entry.to_snapshot())
                .collect(),
        };
        bincode::serialize(&snapshot).map_err(|err| PairError::Snapshot(err.to_string()))
    }

    /// Restore from a snapshot taken on this registry. Surviving pairs are
    /// mutated in place so outstanding `Arc<Pair>` handles stay valid; pairs
    /// created after the snapshot are removed.
    pub fn restore(&self, bytes: &[u8]) -> Result<(), PairError> {
        let snapshot: RegistrySnapshot =
            bincode::deserialize(bytes).map_err(|err| PairError::Snapshot(err.to_string()))?;
        if snapshot.address != hex::encode(self.address.as_bytes()) {
            return Err(PairError::Snapshot(
                "snapshot belongs to a different registry".into(),
            ));
        }

        let mut restored = Vec::with_capacity(snapshot.pairs.len());
        for pair_snapshot in &snapshot.pairs {
            let id: PairId = pair_snapshot
                .address
                .parse::<ParsedAddress>()
                .map(|parsed| parsed.0)
                .map_err(PairError::Snapshot)?;
            match self.pairs.get(&id) {
                Some(pair) => pair.apply_snapshot(pair_snapshot)?,
                None => {
                    let token0 = pair_snapshot
                        .token0
                        .parse::<ParsedAddress>()
                        .map(|parsed| parsed.0)
                        .map_err(PairError::Snapshot)?;
                    let token1 = pair_snapshot
                        .token1
                        .parse::<ParsedAddress>()
                        .map(|parsed| parsed.0)
                        .map_err(PairError::Snapshot)?;
                    let pair = Arc::new(Pair::new(
                        id,
                        token0,
                        token1,
                        pair_snapshot.fee,
                        self.clock.clone(),
                    )?);
                    pair.apply_snapshot(pair_snapshot)?;
                    self.index.insert((token0, token1), id);
                    self.pairs.insert(id, pair);
                }
            }
            restored.push(id);
        }

        // Drop anything created after the snapshot was taken.
        let stale: Vec<PairId> = self
            .pairs
            .iter()
            .map(|entry| *entry.key())
            .filter(|id| !restored.contains(id))
            .collect();
        for id in stale {
            if let Some((_, pair)) = self.pairs.remove(&id) {
                self.index.remove(&(pair.token0(), pair.token1()));
            }
        }
        Ok(())
    }
}

/// Raw-hex address parsing for snapshot payloads (no `0x` prefix).
struct ParsedAddress(Address);

impl std::str::FromStr for ParsedAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|err| err.to_string())?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| "address must be 20 bytes".to_string())?;
        Ok(ParsedAddress(Address(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::ledger::{InMemoryLedger, Ledger};

    fn token(n: u64) -> AssetId {
        Address::from_low_u64(n)
    }

    fn registry() -> PairRegistry {
        PairRegistry::new(
            Address::from_low_u64(0xFAC),
            Arc::new(ManualClock::new(1_000)),
        )
    }

    #[test]
    fn create_registers_at_derived_address() {
        let registry = registry();
        let pair = registry.create_pair(token(2), token(1), 3).unwrap();
        assert_eq!(
            pair.address(),
            pair_address(registry.address(), token(1), token(2)).unwrap()
        );
        assert_eq!((pair.token0(), pair.token1()), (token(1), token(2)));
        assert_eq!(registry.pair_count(), 1);
    }

    #[test]
    fn duplicate_creation_fails_in_either_order() {
        let registry = registry();
        registry.create_pair(token(1), token(2), 3).unwrap();
        assert!(matches!(
            registry.create_pair(token(1), token(2), 3),
            Err(PairError::PairExists)
        ));
        assert!(matches!(
            registry.create_pair(token(2), token(1), 5),
            Err(PairError::PairExists)
        ));
    }

    #[test]
    fn lookup_works_in_either_order() {
        let registry = registry();
        let created = registry.create_pair(token(1), token(2), 3).unwrap();
        let found = registry.get_pair(token(2), token(1)).unwrap();
        assert_eq!(found.address(), created.address());
        assert!(registry.get_pair(token(1), token(3)).is_none());
        assert!(matches!(
            registry.pair(token(1), token(3)),
            Err(PairError::PairNotFound)
        ));
    }

    #[test]
    fn restore_rewinds_state_in_place() {
        let clock = Arc::new(ManualClock::new(1_000));
        let registry = PairRegistry::new(Address::from_low_u64(0xFAC), clock.clone());
        let ledger = InMemoryLedger::new(clock);
        let trader = Address::from_low_u64(0xBEEF);

        let pair = registry.create_pair(token(1), token(2), 3).unwrap();
        ledger.mint(token(1), pair.address(), 1_000_000).unwrap();
        ledger.mint(token(2), pair.address(), 4_000_000).unwrap();
        pair.mint(&ledger, trader).unwrap();

        let snapshot = registry.snapshot().unwrap();

        // Mutate reserves and add a new pair after the snapshot.
        ledger.mint(token(1), pair.address(), 50_000).unwrap();
        pair.sync(&ledger).unwrap();
        registry.create_pair(token(3), token(4), 3).unwrap();

        registry.restore(&snapshot).unwrap();

        // The original Arc observes the rewound reserves.
        let (reserve0, reserve1, _) = pair.get_reserves();
        assert_eq!((reserve0, reserve1), (1_000_000, 4_000_000));
        assert_eq!(registry.pair_count(), 1);
        assert!(registry.get_pair(token(3), token(4)).is_none());
    }

    #[test]
    fn restore_rejects_foreign_snapshot() {
        let registry = registry();
        let other = PairRegistry::new(
            Address::from_low_u64(0xDEAD),
            Arc::new(ManualClock::new(0)),
        );
        let snapshot = other.snapshot().unwrap();
        assert!(matches!(
            registry.restore(&snapshot),
            Err(PairError::Snapshot(_))
        ));
    }
}
