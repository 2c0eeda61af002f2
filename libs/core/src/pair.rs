//! The pair state machine: reserve bookkeeping, liquidity shares, swaps and
//! price accumulation for one asset pair.
//!
//! Deposits are push-based: callers transfer assets (or liquidity shares)
//! to the pair's account first, and `mint`/`burn` infer the amounts from the
//! delta between live balances and tracked reserves. `swap` transfers its
//! outputs optimistically, optionally hands control to a caller-supplied
//! callback, and only then enforces the fee-adjusted constant product, the
//! flash-swap pattern, with the K check as the sole safety net.

use crate::clock::Clock;
use crate::error::PairError;
use crate::events::PairEvent;
use crate::ledger::Ledger;
use ethereum_types::U256;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use xyk_math::{integer_sqrt, to_u128, uq112x112, FEE_BASE, MAX_RESERVE, MINIMUM_LIQUIDITY};
use xyk_types::{AccountId, Address, AssetId, PairId};

/// Flash-swap hook. Implemented by callers that want the swap outputs before
/// paying for them; the pair invokes it after the optimistic transfers and
/// verifies the invariant once it returns. The pair's reentrancy flag stays
/// set for the duration, so calling back into the same pair fails with
/// [`PairError::Locked`].
pub trait SwapCallback {
    fn on_swap(
        &self,
        ledger: &dyn Ledger,
        pair: PairId,
        amount0_out: u128,
        amount1_out: u128,
        data: &[u8],
    ) -> Result<(), PairError>;
}

/// Mutable pair state, guarded by the owning [`Pair`]'s lock discipline.
#[derive(Debug)]
struct PairState {
    reserve0: u128,
    reserve1: u128,
    price0_cumulative: U256,
    price1_cumulative: U256,
    timestamp_last: u64,
    journal: Vec<PairEvent>,
}

/// Serialized pair state for registry snapshots. Wide integers are hex
/// strings so the encoding stays stable across serde back ends.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PairSnapshot {
    pub address: String,
    pub token0: String,
    pub token1: String,
    pub fee: u16,
    reserve0: u128,
    reserve1: u128,
    price0_cumulative: String,
    price1_cumulative: String,
    timestamp_last: u64,
    journal: Vec<PairEvent>,
}

/// One pool instance for an ordered asset pair.
///
/// Assets are bound once at construction (`token0 < token1`) and never
/// rebound; the registry guards against duplicate creation. All mutating
/// entry points serialize on the `locked` flag; distinct pairs never
/// coordinate.
pub struct Pair {
    address: PairId,
    token0: AssetId,
    token1: AssetId,
    fee: u16,
    clock: Arc<dyn Clock>,
    locked: AtomicBool,
    state: RwLock<PairState>,
}

/// Clears the reentrancy flag on every exit path.
struct LockGuard<'a>(&'a AtomicBool);

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Pair {
    /// Bind a pair to its ordered assets. Called by the registry; the
    /// binding is single-shot, so a duplicate bind can only surface as the
    /// registry's `PairExists`.
    pub fn new(
        address: PairId,
        token0: AssetId,
        token1: AssetId,
        fee: u16,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PairError> {
        if token0 == token1 {
            return Err(PairError::IdenticalAssets);
        }
        if token0.is_zero() || token1.is_zero() {
            return Err(PairError::ZeroAddress);
        }
        if token0 > token1 {
            return Err(PairError::UnsortedAssets);
        }
        if fee >= FEE_BASE {
            return Err(PairError::InvalidFee(fee));
        }
        Ok(Self {
            address,
            token0,
            token1,
            fee,
            clock,
            locked: AtomicBool::new(false),
            state: RwLock::new(PairState {
                reserve0: 0,
                reserve1: 0,
                price0_cumulative: U256::zero(),
                price1_cumulative: U256::zero(),
                timestamp_last: 0,
                journal: Vec::new(),
            }),
        })
    }

    pub fn address(&self) -> PairId {
        self.address
    }

    pub fn token0(&self) -> AssetId {
        self.token0
    }

    pub fn token1(&self) -> AssetId {
        self.token1
    }

    /// Per-mille fee taken on the swap input leg.
    pub fn fee(&self) -> u16 {
        self.fee
    }

    /// Last-synchronized reserves and the time they were committed.
    pub fn get_reserves(&self) -> (u128, u128, u64) {
        let state = self.state.read();
        (state.reserve0, state.reserve1, state.timestamp_last)
    }

    pub fn price0_cumulative(&self) -> U256 {
        self.state.read().price0_cumulative
    }

    pub fn price1_cumulative(&self) -> U256 {
        self.state.read().price1_cumulative
    }

    /// Outstanding liquidity shares; the share asset id is the pair address.
    pub fn total_liquidity(&self, ledger: &dyn Ledger) -> u128 {
        ledger.total_supply(self.address)
    }

    /// Live ledger balance of the indexed pool asset (`0` or `1`), as
    /// opposed to the tracked reserve.
    pub fn balance_of_index(&self, ledger: &dyn Ledger, index: u8) -> Option<u128> {
        match index {
            0 => Some(ledger.balance_of(self.token0, self.address)),
            1 => Some(ledger.balance_of(self.token1, self.address)),
            _ => None,
        }
    }

    /// Copy of the audit journal.
    pub fn events(&self) -> Vec<PairEvent> {
        self.state.read().journal.clone()
    }

    fn acquire(&self) -> Result<LockGuard<'_>, PairError> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(PairError::Locked);
        }
        Ok(LockGuard(&self.locked))
    }

    fn balances(&self, ledger: &dyn Ledger) -> (u128, u128) {
        (
            ledger.balance_of(self.token0, self.address),
            ledger.balance_of(self.token1, self.address),
        )
    }

    /// Commit reserves from live balances, folding elapsed time into the
    /// price accumulators first (at the prior marginal price) and recording
    /// a `Sync` event. Accumulators wrap by design.
    fn commit(&self, state: &mut PairState, balance0: u128, balance1: u128) -> Result<(), PairError> {
        if balance0 > MAX_RESERVE || balance1 > MAX_RESERVE {
            return Err(PairError::ReserveOverflow);
        }
        let now = self.clock.now();
        let elapsed = now.saturating_sub(state.timestamp_last);
        if elapsed > 0 && state.reserve0 != 0 && state.reserve1 != 0 {
            let price0 = uq112x112::fraction(state.reserve1, state.reserve0)?;
            let price1 = uq112x112::fraction(state.reserve0, state.reserve1)?;
            let elapsed = U256::from(elapsed);
            state.price0_cumulative = state
                .price0_cumulative
                .overflowing_add(price0.overflowing_mul(elapsed).0)
                .0;
            state.price1_cumulative = state
                .price1_cumulative
                .overflowing_add(price1.overflowing_mul(elapsed).0)
                .0;
        }
        state.reserve0 = balance0;
        state.reserve1 = balance1;
        state.timestamp_last = now;
        state.journal.push(PairEvent::Sync {
            reserve0: balance0,
            reserve1: balance1,
        });
        debug!(pair = %self.address, reserve0 = balance0, reserve1 = balance1, "sync");
        Ok(())
    }

    /// Mint liquidity shares for whatever was deposited since the last
    /// commit. Callers transfer both assets to the pair first; the amounts
    /// are the balance deltas, never explicit parameters.
    pub fn mint(&self, ledger: &dyn Ledger, to: AccountId) -> Result<u128, PairError> {
        let _lock = self.acquire()?;
        let (reserve0, reserve1, _) = self.get_reserves();
        let (balance0, balance1) = self.balances(ledger);
        let amount0 = balance0
            .checked_sub(reserve0)
            .ok_or(PairError::InsufficientInputAmount)?;
        let amount1 = balance1
            .checked_sub(reserve1)
            .ok_or(PairError::InsufficientInputAmount)?;

        let total = ledger.total_supply(self.address);
        let liquidity = if total == 0 {
            let shares = to_u128(integer_sqrt(U256::from(amount0) * U256::from(amount1)))?;
            let shares = shares
                .checked_sub(MINIMUM_LIQUIDITY)
                .ok_or(PairError::InsufficientLiquidityMinted)?;
            // The minimum is parked at the zero address forever, so the
            // share price can never be driven back to zero supply.
            ledger.mint(self.address, Address::zero(), MINIMUM_LIQUIDITY)?;
            shares
        } else {
            let share0 = U256::from(amount0) * U256::from(total) / U256::from(reserve0);
            let share1 = U256::from(amount1) * U256::from(total) / U256::from(reserve1);
            to_u128(share0.min(share1))?
        };
        if liquidity == 0 {
            return Err(PairError::InsufficientLiquidityMinted);
        }
        ledger.mint(self.address, to, liquidity)?;

        let mut state = self.state.write();
        self.commit(&mut state, balance0, balance1)?;
        state.journal.push(PairEvent::Mint {
            to,
            amount0,
            amount1,
        });
        debug!(pair = %self.address, %to, amount0, amount1, liquidity, "mint");
        Ok(liquidity)
    }

    /// Burn the liquidity shares held by the pair itself and pay out the
    /// pro-rata share of both reserves. Callers transfer shares to the pair
    /// first (push protocol, mirroring `mint`).
    pub fn burn(&self, ledger: &dyn Ledger, to: AccountId) -> Result<(u128, u128), PairError> {
        let _lock = self.acquire()?;
        let (balance0, balance1) = self.balances(ledger);
        let liquidity = ledger.balance_of(self.address, self.address);
        let total = ledger.total_supply(self.address);
        if total == 0 {
            return Err(PairError::InsufficientLiquidityBurned);
        }

        let amount0 = to_u128(U256::from(liquidity) * U256::from(balance0) / U256::from(total))?;
        let amount1 = to_u128(U256::from(liquidity) * U256::from(balance1) / U256::from(total))?;
        if amount0 == 0 || amount1 == 0 {
            return Err(PairError::InsufficientLiquidityBurned);
        }

        ledger.burn(self.address, self.address, liquidity)?;
        ledger.transfer(self.token0, self.address, to, amount0)?;
        ledger.transfer(self.token1, self.address, to, amount1)?;

        let (balance0, balance1) = self.balances(ledger);
        let mut state = self.state.write();
        self.commit(&mut state, balance0, balance1)?;
        state.journal.push(PairEvent::Burn {
            amount0,
            amount1,
            to,
        });
        debug!(pair = %self.address, %to, amount0, amount1, liquidity, "burn");
        Ok((amount0, amount1))
    }

    /// Trade against the pool. Outputs are transferred before payment; if
    /// `data` is non-empty the `callback` runs with the outputs in hand
    /// (flash swap), and afterwards the fee-adjusted constant product over
    /// the live balances must not have decreased.
    pub fn swap(
        &self,
        ledger: &dyn Ledger,
        amount0_out: u128,
        amount1_out: u128,
        to: AccountId,
        data: &[u8],
        callback: Option<&dyn SwapCallback>,
    ) -> Result<(), PairError> {
        let _lock = self.acquire()?;
        if amount0_out == 0 && amount1_out == 0 {
            return Err(PairError::InsufficientOutputAmount);
        }
        let (reserve0, reserve1, _) = self.get_reserves();
        if amount0_out >= reserve0 || amount1_out >= reserve1 {
            return Err(PairError::InsufficientLiquidity);
        }
        if to == self.token0 || to == self.token1 {
            return Err(PairError::InvalidTo);
        }

        // Optimistic transfers: the recipient holds the outputs before the
        // pool has been paid.
        if amount0_out > 0 {
            ledger.transfer(self.token0, self.address, to, amount0_out)?;
        }
        if amount1_out > 0 {
            ledger.transfer(self.token1, self.address, to, amount1_out)?;
        }
        if !data.is_empty() {
            let callback = callback.ok_or_else(|| {
                PairError::Callback("swap data supplied without a callback handler".into())
            })?;
            callback.on_swap(ledger, self.address, amount0_out, amount1_out, data)?;
        }

        let (balance0, balance1) = self.balances(ledger);
        if balance0 > MAX_RESERVE || balance1 > MAX_RESERVE {
            return Err(PairError::ReserveOverflow);
        }
        let amount0_in = balance0.saturating_sub(reserve0 - amount0_out);
        let amount1_in = balance1.saturating_sub(reserve1 - amount1_out);
        if amount0_in == 0 && amount1_in == 0 {
            return Err(PairError::InsufficientInputAmount);
        }

        // K check with the fee removed from the input legs, scaled by the
        // fee base on both sides.
        let base = U256::from(FEE_BASE);
        let fee = U256::from(self.fee);
        let adjusted0 = U256::from(balance0) * base - U256::from(amount0_in) * fee;
        let adjusted1 = U256::from(balance1) * base - U256::from(amount1_in) * fee;
        let before = U256::from(reserve0) * U256::from(reserve1) * base * base;
        if adjusted0 * adjusted1 < before {
            return Err(PairError::InvariantViolated);
        }

        let mut state = self.state.write();
        self.commit(&mut state, balance0, balance1)?;
        state.journal.push(PairEvent::Swap {
            amount0_in,
            amount1_in,
            amount0_out,
            amount1_out,
            to,
        });
        debug!(
            pair = %self.address, %to,
            amount0_in, amount1_in, amount0_out, amount1_out,
            "swap"
        );
        Ok(())
    }

    /// Force reserves to match live balances. Escape hatch for assets whose
    /// transfers don't deliver the full amount (fees, rebasing).
    pub fn sync(&self, ledger: &dyn Ledger) -> Result<(), PairError> {
        let _lock = self.acquire()?;
        let (balance0, balance1) = self.balances(ledger);
        let mut state = self.state.write();
        self.commit(&mut state, balance0, balance1)
    }

    /// Transfer any balance in excess of the tracked reserves to `to`.
    pub fn skim(&self, ledger: &dyn Ledger, to: AccountId) -> Result<(), PairError> {
        let _lock = self.acquire()?;
        let (reserve0, reserve1, _) = self.get_reserves();
        let (balance0, balance1) = self.balances(ledger);
        let excess0 = balance0.saturating_sub(reserve0);
        let excess1 = balance1.saturating_sub(reserve1);
        if excess0 > 0 {
            ledger.transfer(self.token0, self.address, to, excess0)?;
        }
        if excess1 > 0 {
            ledger.transfer(self.token1, self.address, to, excess1)?;
        }
        debug!(pair = %self.address, %to, excess0, excess1, "skim");
        Ok(())
    }

    pub(crate) fn to_snapshot(&self) -> PairSnapshot {
        let state = self.state.read();
        PairSnapshot {
            address: hex::encode(self.address.as_bytes()),
            token0: hex::encode(self.token0.as_bytes()),
            token1: hex::encode(self.token1.as_bytes()),
            fee: self.fee,
            reserve0: state.reserve0,
            reserve1: state.reserve1,
            price0_cumulative: format!("{:x}", state.price0_cumulative),
            price1_cumulative: format!("{:x}", state.price1_cumulative),
            timestamp_last: state.timestamp_last,
            journal: state.journal.clone(),
        }
    }

    pub(crate) fn apply_snapshot(&self, snapshot: &PairSnapshot) -> Result<(), PairError> {
        let price0 = U256::from_str_radix(&snapshot.price0_cumulative, 16)
            .map_err(|err| PairError::Snapshot(err.to_string()))?;
        let price1 = U256::from_str_radix(&snapshot.price1_cumulative, 16)
            .map_err(|err| PairError::Snapshot(err.to_string()))?;
        let mut state = self.state.write();
        state.reserve0 = snapshot.reserve0;
        state.reserve1 = snapshot.reserve1;
        state.price0_cumulative = price0;
        state.price1_cumulative = price1;
        state.timestamp_last = snapshot.timestamp_last;
        state.journal = snapshot.journal.clone();
        Ok(())
    }
}
