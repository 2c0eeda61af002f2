//! The account-ledger interface the engine settles against, plus an
//! in-memory implementation.
//!
//! The engine treats the ledger as an external collaborator with a narrow
//! surface: balances, transfers, approvals, mint/burn, and signature-based
//! approval. Caller authentication is the host's concern; `from` parameters
//! are taken at face value here, the way a chain runtime supplies a verified
//! sender.

use crate::clock::Clock;
use dashmap::DashMap;
use ethereum_types::U256;
use ethers::types::{RecoveryMessage, Signature, H160, H256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use xyk_math::FEE_BASE;
use xyk_types::{AccountId, Address, AssetId};

/// Failures of ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("insufficient allowance")]
    InsufficientAllowance,

    #[error("permit deadline passed")]
    SignatureExpired,

    #[error("permit signature invalid")]
    InvalidSignature,

    #[error("transfer fee {0} per-mille is out of range")]
    InvalidTransferFee(u16),

    #[error("balance overflow")]
    Overflow,

    #[error("snapshot decode failed: {0}")]
    Snapshot(String),
}

/// Narrow per-asset account ledger: the token standard backing each asset.
pub trait Ledger: Send + Sync {
    fn balance_of(&self, asset: AssetId, account: AccountId) -> u128;

    fn total_supply(&self, asset: AssetId) -> u128;

    fn allowance(&self, asset: AssetId, owner: AccountId, spender: AccountId) -> u128;

    /// Per-owner permit nonce within this asset's ledger namespace.
    fn nonce_of(&self, asset: AssetId, owner: AccountId) -> u64;

    fn transfer(
        &self,
        asset: AssetId,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError>;

    fn transfer_from(
        &self,
        asset: AssetId,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError>;

    fn approve(
        &self,
        asset: AssetId,
        owner: AccountId,
        spender: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError>;

    fn mint(&self, asset: AssetId, to: AccountId, amount: u128) -> Result<(), LedgerError>;

    fn burn(&self, asset: AssetId, from: AccountId, amount: u128) -> Result<(), LedgerError>;

    /// Signature-based approval: verifies a secp256k1 signature over the
    /// domain-separated digest of `(owner, spender, value, nonce, deadline)`,
    /// bumps the owner's nonce and sets the allowance.
    fn permit(
        &self,
        asset: AssetId,
        owner: AccountId,
        spender: AccountId,
        value: u128,
        deadline: u64,
        signature: &Signature,
    ) -> Result<(), LedgerError>;
}

/// A ledger whose full state can be captured and restored, so multi-step
/// engine operations can roll back on failure.
pub trait SnapshotLedger: Ledger {
    fn snapshot(&self) -> Vec<u8>;

    fn restore(&self, snapshot: &[u8]) -> Result<(), LedgerError>;
}

/// Digest an owner signs to grant an allowance without a direct call.
pub fn permit_digest(
    asset: AssetId,
    owner: AccountId,
    spender: AccountId,
    value: u128,
    nonce: u64,
    deadline: u64,
) -> [u8; 32] {
    let mut domain_input = Vec::with_capacity(20 + 20);
    domain_input.extend_from_slice(b"XYK_LEDGER_V1");
    domain_input.extend_from_slice(asset.as_bytes());
    let domain_separator = keccak256(&domain_input);

    let mut payload = Vec::with_capacity(20 + 20 + 16 + 8 + 8);
    payload.extend_from_slice(owner.as_bytes());
    payload.extend_from_slice(spender.as_bytes());
    payload.extend_from_slice(&value.to_be_bytes());
    payload.extend_from_slice(&nonce.to_be_bytes());
    payload.extend_from_slice(&deadline.to_be_bytes());
    let struct_hash = keccak256(&payload);

    let mut preimage = Vec::with_capacity(2 + 32 + 32);
    preimage.extend_from_slice(&[0x19, 0x01]);
    preimage.extend_from_slice(&domain_separator);
    preimage.extend_from_slice(&struct_hash);
    keccak256(&preimage)
}

#[derive(Serialize, Deserialize)]
struct LedgerSnapshot {
    balances: Vec<(AssetId, AccountId, u128)>,
    supplies: Vec<(AssetId, u128)>,
    allowances: Vec<(AssetId, AccountId, AccountId, u128)>,
    nonces: Vec<(AssetId, AccountId, u64)>,
    transfer_fees: Vec<(AssetId, u16)>,
}

/// In-memory multi-asset ledger.
///
/// Assets may be configured with a per-mille transfer fee burned in flight,
/// so fee-on-transfer behavior (and the engine's `sync`/`skim` escape
/// hatches) are exercisable without an external token.
pub struct InMemoryLedger {
    clock: Arc<dyn Clock>,
    balances: DashMap<(AssetId, AccountId), u128>,
    supplies: DashMap<AssetId, u128>,
    allowances: DashMap<(AssetId, AccountId, AccountId), u128>,
    nonces: DashMap<(AssetId, AccountId), u64>,
    transfer_fees: DashMap<AssetId, u16>,
}

impl InMemoryLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            balances: DashMap::new(),
            supplies: DashMap::new(),
            allowances: DashMap::new(),
            nonces: DashMap::new(),
            transfer_fees: DashMap::new(),
        }
    }

    /// Burn `fee` per-mille of every transfer of `asset` in flight.
    pub fn set_transfer_fee(&self, asset: AssetId, fee: u16) -> Result<(), LedgerError> {
        if fee >= FEE_BASE {
            return Err(LedgerError::InvalidTransferFee(fee));
        }
        self.transfer_fees.insert(asset, fee);
        Ok(())
    }

    fn credit(&self, asset: AssetId, account: AccountId, amount: u128) -> Result<(), LedgerError> {
        let mut entry = self.balances.entry((asset, account)).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    fn debit(&self, asset: AssetId, account: AccountId, amount: u128) -> Result<(), LedgerError> {
        let mut entry = self
            .balances
            .get_mut(&(asset, account))
            .ok_or(LedgerError::InsufficientBalance)?;
        *entry = entry
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance)?;
        Ok(())
    }

    fn move_with_fee(
        &self,
        asset: AssetId,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.debit(asset, from, amount)?;
        // Widened so `amount * fee` cannot wrap; the quotient is below
        // `amount` and narrows back losslessly.
        let fee = self
            .transfer_fees
            .get(&asset)
            .map(|entry| {
                (U256::from(amount) * U256::from(*entry) / U256::from(FEE_BASE)).low_u128()
            })
            .unwrap_or(0);
        self.credit(asset, to, amount - fee)?;
        if fee > 0 {
            let mut supply = self.supplies.entry(asset).or_insert(0);
            *supply = supply.saturating_sub(fee);
        }
        debug!(%asset, %from, %to, amount, fee, "transfer");
        Ok(())
    }
}

impl Ledger for InMemoryLedger {
    fn balance_of(&self, asset: AssetId, account: AccountId) -> u128 {
        self.balances
            .get(&(asset, account))
            .map(|entry| *entry)
            .unwrap_or(0)
    }

    fn total_supply(&self, asset: AssetId) -> u128 {
        self.supplies.get(&asset).map(|entry| *entry).unwrap_or(0)
    }

    fn allowance(&self, asset: AssetId, owner: AccountId, spender: AccountId) -> u128 {
        self.allowances
            .get(&(asset, owner, spender))
            .map(|entry| *entry)
            .unwrap_or(0)
    }

    fn nonce_of(&self, asset: AssetId, owner: AccountId) -> u64 {
        self.nonces
            .get(&(asset, owner))
            .map(|entry| *entry)
            .unwrap_or(0)
    }

    fn transfer(
        &self,
        asset: AssetId,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.move_with_fee(asset, from, to, amount)
    }

    fn transfer_from(
        &self,
        asset: AssetId,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let key = (asset, from, spender);
        {
            let mut entry = self
                .allowances
                .get_mut(&key)
                .ok_or(LedgerError::InsufficientAllowance)?;
            // u128::MAX is the conventional unlimited approval and is not
            // drawn down.
            if *entry != u128::MAX {
                *entry = entry
                    .checked_sub(amount)
                    .ok_or(LedgerError::InsufficientAllowance)?;
            }
        }
        self.move_with_fee(asset, from, to, amount)
    }

    fn approve(
        &self,
        asset: AssetId,
        owner: AccountId,
        spender: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.allowances.insert((asset, owner, spender), amount);
        Ok(())
    }

    fn mint(&self, asset: AssetId, to: AccountId, amount: u128) -> Result<(), LedgerError> {
        {
            let mut supply = self.supplies.entry(asset).or_insert(0);
            *supply = supply.checked_add(amount).ok_or(LedgerError::Overflow)?;
        }
        self.credit(asset, to, amount)?;
        debug!(%asset, %to, amount, "mint");
        Ok(())
    }

    fn burn(&self, asset: AssetId, from: AccountId, amount: u128) -> Result<(), LedgerError> {
        self.debit(asset, from, amount)?;
        let mut supply = self
            .supplies
            .get_mut(&asset)
            .ok_or(LedgerError::InsufficientBalance)?;
        *supply = supply
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance)?;
        debug!(%asset, %from, amount, "burn");
        Ok(())
    }

    fn permit(
        &self,
        asset: AssetId,
        owner: AccountId,
        spender: AccountId,
        value: u128,
        deadline: u64,
        signature: &Signature,
    ) -> Result<(), LedgerError> {
        if deadline < self.clock.now() {
            return Err(LedgerError::SignatureExpired);
        }
        let nonce = self.nonce_of(asset, owner);
        let digest = permit_digest(asset, owner, spender, value, nonce, deadline);
        let recovered = signature
            .recover(RecoveryMessage::Hash(H256::from(digest)))
            .map_err(|_| LedgerError::InvalidSignature)?;
        if recovered != H160::from(*owner.as_bytes()) {
            return Err(LedgerError::InvalidSignature);
        }
        self.nonces.insert((asset, owner), nonce + 1);
        self.allowances.insert((asset, owner, spender), value);
        debug!(%asset, %owner, %spender, value, nonce, "permit");
        Ok(())
    }
}

impl SnapshotLedger for InMemoryLedger {
    fn snapshot(&self) -> Vec<u8> {
        let snapshot = LedgerSnapshot {
            balances: self
                .balances
                .iter()
                .map(|entry| (entry.key().0, entry.key().1, *entry.value()))
                .collect(),
            supplies: self
                .supplies
                .iter()
                .map(|entry| (*entry.key(), *entry.value()))
                .collect(),
            allowances: self
                .allowances
                .iter()
                .map(|entry| (entry.key().0, entry.key().1, entry.key().2, *entry.value()))
                .collect(),
            nonces: self
                .nonces
                .iter()
                .map(|entry| (entry.key().0, entry.key().1, *entry.value()))
                .collect(),
            transfer_fees: self
                .transfer_fees
                .iter()
                .map(|entry| (*entry.key(), *entry.value()))
                .collect(),
        };
        bincode::serialize(&snapshot).unwrap_or_default()
    }

    fn restore(&self, snapshot: &[u8]) -> Result<(), LedgerError> {
        let snapshot: LedgerSnapshot = bincode::deserialize(snapshot)
            .map_err(|err| LedgerError::Snapshot(err.to_string()))?;
        self.balances.clear();
        self.supplies.clear();
        self.allowances.clear();
        self.nonces.clear();
        self.transfer_fees.clear();
        for (asset, account, amount) in snapshot.balances {
            self.balances.insert((asset, account), amount);
        }
        for (asset, amount) in snapshot.supplies {
            self.supplies.insert(asset, amount);
        }
        for (asset, owner, spender, amount) in snapshot.allowances {
            self.allowances.insert((asset, owner, spender), amount);
        }
        for (asset, owner, nonce) in snapshot.nonces {
            self.nonces.insert((asset, owner), nonce);
        }
        for (asset, fee) in snapshot.transfer_fees {
            self.transfer_fees.insert(asset, fee);
        }
        Ok(())
    }
}
