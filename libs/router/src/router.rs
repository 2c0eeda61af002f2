//! Multi-step orchestration: liquidity provisioning and path execution with
//! slippage bounds, deadlines and all-or-nothing semantics.

use crate::error::RouterError;
use crate::quoting::{get_amounts_in, get_amounts_out, reserves_for};
use std::sync::Arc;
use tracing::debug;
use xyk_core::{sort_assets, transactional, Pair, PairRegistry, SnapshotLedger};
use xyk_types::{AccountId, AssetId};

/// Fee applied to pairs the router creates implicitly during
/// [`Router::add_liquidity`], in per-mille of the input leg.
pub const DEFAULT_SWAP_FEE: u16 = 3;

/// Stateless orchestrator over a registry and ledger. Every mutating entry
/// point is deadline-gated and runs inside [`transactional`], so a failure
/// partway through a path leaves no trace.
pub struct Router {
    registry: Arc<PairRegistry>,
    ledger: Arc<dyn SnapshotLedger>,
}

impl Router {
    pub fn new(registry: Arc<PairRegistry>, ledger: Arc<dyn SnapshotLedger>) -> Self {
        Self { registry, ledger }
    }

    pub fn registry(&self) -> &PairRegistry {
        &self.registry
    }

    fn check_deadline(&self, deadline: u64) -> Result<(), RouterError> {
        if self.registry.clock().now() > deadline {
            return Err(RouterError::Expired);
        }
        Ok(())
    }

    fn pair_for(&self, asset_in: AssetId, asset_out: AssetId) -> Result<Arc<Pair>, RouterError> {
        self.registry
            .get_pair(asset_in, asset_out)
            .ok_or(RouterError::PairNotFound)
    }

    /// Deposit both assets in ratio and mint liquidity shares to `to`.
    ///
    /// Desired amounts are upper bounds; the router scales one side down to
    /// the pool's current ratio and rejects the result if it undercuts the
    /// matching minimum. Creates the pair (at [`DEFAULT_SWAP_FEE`]) when it
    /// does not exist yet. Returns `(amount_a, amount_b, liquidity)`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_liquidity(
        &self,
        from: AccountId,
        asset_a: AssetId,
        asset_b: AssetId,
        amount_a_desired: u128,
        amount_b_desired: u128,
        amount_a_min: u128,
        amount_b_min: u128,
        to: AccountId,
        deadline: u64,
    ) -> Result<(u128, u128, u128), RouterError> {
        self.check_deadline(deadline)?;
        transactional(&self.registry, self.ledger.as_ref(), || {
            let pair = match self.registry.get_pair(asset_a, asset_b) {
                Some(pair) => pair,
                None => self.registry.create_pair(asset_a, asset_b, DEFAULT_SWAP_FEE)?,
            };
            let (amount_a, amount_b) = self.ratio_amounts(
                asset_a,
                asset_b,
                amount_a_desired,
                amount_b_desired,
                amount_a_min,
                amount_b_min,
            )?;

            self.ledger.transfer(asset_a, from, pair.address(), amount_a)?;
            self.ledger.transfer(asset_b, from, pair.address(), amount_b)?;
            let liquidity = pair.mint(self.ledger.as_ref(), to)?;
            debug!(pair = %pair.address(), amount_a, amount_b, liquidity, "liquidity added");
            Ok((amount_a, amount_b, liquidity))
        })
    }

    /// Scale the desired deposit down to the pool ratio. On an empty pool
    /// both desired amounts are taken verbatim.
    fn ratio_amounts(
        &self,
        asset_a: AssetId,
        asset_b: AssetId,
        amount_a_desired: u128,
        amount_b_desired: u128,
        amount_a_min: u128,
        amount_b_min: u128,
    ) -> Result<(u128, u128), RouterError> {
        let (reserve_a, reserve_b, _) = reserves_for(&self.registry, asset_a, asset_b)?;
        if reserve_a == 0 && reserve_b == 0 {
            return Ok((amount_a_desired, amount_b_desired));
        }
        let amount_b_optimal = xyk_math::quote(amount_a_desired, reserve_a, reserve_b)?;
        if amount_b_optimal <= amount_b_desired {
            if amount_b_optimal < amount_b_min {
                return Err(RouterError::InsufficientBAmount);
            }
            return Ok((amount_a_desired, amount_b_optimal));
        }
        let amount_a_optimal = xyk_math::quote(amount_b_desired, reserve_b, reserve_a)?;
        // quote is monotonic, so the mirrored amount cannot exceed desired.
        if amount_a_optimal < amount_a_min {
            return Err(RouterError::InsufficientAAmount);
        }
        Ok((amount_a_optimal, amount_b_desired))
    }

    /// Burn `liquidity` shares held by `from` and pay both assets to `to`.
    /// Returns `(amount_a, amount_b)` in the caller's asset order.
    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity(
        &self,
        from: AccountId,
        asset_a: AssetId,
        asset_b: AssetId,
        liquidity: u128,
        amount_a_min: u128,
        amount_b_min: u128,
        to: AccountId,
        deadline: u64,
    ) -> Result<(u128, u128), RouterError> {
        self.check_deadline(deadline)?;
        let pair = self.pair_for(asset_a, asset_b)?;
        transactional(&self.registry, self.ledger.as_ref(), || {
            self.ledger
                .transfer(pair.address(), from, pair.address(), liquidity)?;
            let (amount0, amount1) = pair.burn(self.ledger.as_ref(), to)?;

            let (token0, _) = sort_assets(asset_a, asset_b)?;
            let (amount_a, amount_b) = if asset_a == token0 {
                (amount0, amount1)
            } else {
                (amount1, amount0)
            };
            if amount_a < amount_a_min {
                return Err(RouterError::InsufficientAAmount);
            }
            if amount_b < amount_b_min {
                return Err(RouterError::InsufficientBAmount);
            }
            debug!(pair = %pair.address(), amount_a, amount_b, liquidity, "liquidity removed");
            Ok((amount_a, amount_b))
        })
    }

    /// Swap an exact input along `path`, requiring at least `amount_out_min`
    /// delivered to `to`. Returns the per-hop amounts.
    pub fn swap_exact_in(
        &self,
        from: AccountId,
        amount_in: u128,
        amount_out_min: u128,
        path: &[AssetId],
        to: AccountId,
        deadline: u64,
    ) -> Result<Vec<u128>, RouterError> {
        self.check_deadline(deadline)?;
        let amounts = get_amounts_out(&self.registry, amount_in, path)?;
        if amounts[amounts.len() - 1] < amount_out_min {
            return Err(RouterError::InsufficientOutputAmount);
        }
        transactional(&self.registry, self.ledger.as_ref(), || {
            self.execute_path(from, path, &amounts, to)?;
            Ok(amounts.clone())
        })
    }

    /// Swap along `path` for an exact final output, requiring at most
    /// `amount_in_max` drawn from `from`. Returns the per-hop amounts.
    pub fn swap_exact_out(
        &self,
        from: AccountId,
        amount_out: u128,
        amount_in_max: u128,
        path: &[AssetId],
        to: AccountId,
        deadline: u64,
    ) -> Result<Vec<u128>, RouterError> {
        self.check_deadline(deadline)?;
        let amounts = get_amounts_in(&self.registry, amount_out, path)?;
        if amounts[0] > amount_in_max {
            return Err(RouterError::ExcessiveInputAmount);
        }
        transactional(&self.registry, self.ledger.as_ref(), || {
            self.execute_path(from, path, &amounts, to)?;
            Ok(amounts.clone())
        })
    }

    /// Exact-input swap for assets that take a fee in flight. Amounts are
    /// re-measured from pool balances at every hop instead of being quoted
    /// up front, and only the final delivered amount is bounds-checked.
    /// Returns what `to` actually received.
    pub fn swap_exact_in_supporting_fee(
        &self,
        from: AccountId,
        amount_in: u128,
        amount_out_min: u128,
        path: &[AssetId],
        to: AccountId,
        deadline: u64,
    ) -> Result<u128, RouterError> {
        self.check_deadline(deadline)?;
        if path.len() < 2 {
            return Err(RouterError::InvalidPath);
        }
        let out_asset = path[path.len() - 1];
        transactional(&self.registry, self.ledger.as_ref(), || {
            let first = self.pair_for(path[0], path[1])?;
            self.ledger
                .transfer(path[0], from, first.address(), amount_in)?;

            let before = self.ledger.balance_of(out_asset, to);
            for (i, hop) in path.windows(2).enumerate() {
                let pair = self.pair_for(hop[0], hop[1])?;
                let (reserve0, reserve1, _) = pair.get_reserves();
                let (reserve_in, reserve_out) = if hop[0] == pair.token0() {
                    (reserve0, reserve1)
                } else {
                    (reserve1, reserve0)
                };
                // Whatever actually arrived on top of the reserve is the
                // input for this hop.
                let balance_in = self.ledger.balance_of(hop[0], pair.address());
                let hop_in = balance_in.saturating_sub(reserve_in);
                let hop_out =
                    xyk_math::get_amount_out(hop_in, reserve_in, reserve_out, pair.fee())?;

                let recipient = if i == path.len() - 2 {
                    to
                } else {
                    self.pair_for(hop[1], path[i + 2])?.address()
                };
                let (amount0_out, amount1_out) = if hop[0] == pair.token0() {
                    (0, hop_out)
                } else {
                    (hop_out, 0)
                };
                pair.swap(
                    self.ledger.as_ref(),
                    amount0_out,
                    amount1_out,
                    recipient,
                    &[],
                    None,
                )?;
            }

            let received = self.ledger.balance_of(out_asset, to).saturating_sub(before);
            if received < amount_out_min {
                return Err(RouterError::InsufficientOutputAmount);
            }
            debug!(amount_in, received, hops = path.len() - 1, "fee-aware swap");
            Ok(received)
        })
    }

    /// Move the input to the first pool, then swap hop by hop, delivering
    /// each intermediate output straight to the next pool's account.
    fn execute_path(
        &self,
        from: AccountId,
        path: &[AssetId],
        amounts: &[u128],
        to: AccountId,
    ) -> Result<(), RouterError> {
        let first = self.pair_for(path[0], path[1])?;
        self.ledger
            .transfer(path[0], from, first.address(), amounts[0])?;

        for (i, hop) in path.windows(2).enumerate() {
            let pair = self.pair_for(hop[0], hop[1])?;
            let amount_out = amounts[i + 1];
            let recipient = if i == path.len() - 2 {
                to
            } else {
                self.pair_for(hop[1], path[i + 2])?.address()
            };
            let (amount0_out, amount1_out) = if hop[0] == pair.token0() {
                (0, amount_out)
            } else {
                (amount_out, 0)
            };
            pair.swap(
                self.ledger.as_ref(),
                amount0_out,
                amount1_out,
                recipient,
                &[],
                None,
            )?;
        }
        debug!(hops = path.len() - 1, amount_in = amounts[0], "path executed");
        Ok(())
    }
}
