//! Router flows end to end: liquidity round trips, multi-hop execution with
//! slippage and deadline enforcement, and rollback when a step fails.

use std::sync::Arc;
use xyk_core::{
    Address, InMemoryLedger, Ledger, ManualClock, PairRegistry, MINIMUM_LIQUIDITY,
};
use xyk_router::{get_amounts_out, Router, RouterError, DEFAULT_SWAP_FEE};

const FAR_DEADLINE: u64 = u64::MAX;

fn token(n: u64) -> Address {
    Address::from_low_u64(n)
}

struct Harness {
    router: Router,
    registry: Arc<PairRegistry>,
    ledger: Arc<InMemoryLedger>,
    clock: Arc<ManualClock>,
    alice: Address,
    bob: Address,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(1_000));
    let registry = Arc::new(PairRegistry::new(
        Address::from_low_u64(0xFAC),
        clock.clone(),
    ));
    let ledger = Arc::new(InMemoryLedger::new(clock.clone()));
    let router = Router::new(registry.clone(), ledger.clone());
    Harness {
        router,
        registry,
        ledger,
        clock,
        alice: Address::from_low_u64(0xA11CE),
        bob: Address::from_low_u64(0xB0B),
    }
}

/// Fund `alice` and seed a pool through the router itself.
fn seed_pool(h: &Harness, a: u64, b: u64, amount_a: u128, amount_b: u128) {
    h.ledger.mint(token(a), h.alice, amount_a).unwrap();
    h.ledger.mint(token(b), h.alice, amount_b).unwrap();
    h.router
        .add_liquidity(
            h.alice,
            token(a),
            token(b),
            amount_a,
            amount_b,
            0,
            0,
            h.alice,
            FAR_DEADLINE,
        )
        .unwrap();
}

#[test]
fn add_liquidity_creates_missing_pair() {
    let h = harness();
    h.ledger.mint(token(1), h.alice, 1_000_000).unwrap();
    h.ledger.mint(token(2), h.alice, 4_000_000).unwrap();

    let (amount_a, amount_b, liquidity) = h
        .router
        .add_liquidity(
            h.alice,
            token(1),
            token(2),
            1_000_000,
            4_000_000,
            0,
            0,
            h.alice,
            FAR_DEADLINE,
        )
        .unwrap();
    assert_eq!((amount_a, amount_b), (1_000_000, 4_000_000));
    assert_eq!(liquidity, 2_000_000 - MINIMUM_LIQUIDITY);

    let pair = h.registry.get_pair(token(1), token(2)).unwrap();
    assert_eq!(pair.fee(), DEFAULT_SWAP_FEE);
}

#[test]
fn add_liquidity_scales_to_pool_ratio() {
    let h = harness();
    seed_pool(&h, 1, 2, 1_000_000, 4_000_000);

    // Pool ratio is 1:4; the surplus on the B side is left untouched.
    h.ledger.mint(token(1), h.alice, 100_000).unwrap();
    h.ledger.mint(token(2), h.alice, 1_000_000).unwrap();
    let (amount_a, amount_b, _) = h
        .router
        .add_liquidity(
            h.alice,
            token(1),
            token(2),
            100_000,
            1_000_000,
            0,
            0,
            h.alice,
            FAR_DEADLINE,
        )
        .unwrap();
    assert_eq!((amount_a, amount_b), (100_000, 400_000));
    assert_eq!(h.ledger.balance_of(token(2), h.alice), 600_000);

    // A minimum above the scaled amount trips the slippage guard.
    h.ledger.mint(token(1), h.alice, 100_000).unwrap();
    let result = h.router.add_liquidity(
        h.alice,
        token(1),
        token(2),
        100_000,
        1_000_000,
        0,
        500_000,
        h.alice,
        FAR_DEADLINE,
    );
    assert!(matches!(result, Err(RouterError::InsufficientBAmount)));
}

#[test]
fn liquidity_round_trip_returns_deposits_minus_dust() {
    let h = harness();
    seed_pool(&h, 1, 2, 1_000_000, 4_000_000);
    let pair = h.registry.get_pair(token(1), token(2)).unwrap();
    let shares = h.ledger.balance_of(pair.address(), h.alice);

    let (amount_a, amount_b) = h
        .router
        .remove_liquidity(
            h.alice,
            token(1),
            token(2),
            shares,
            0,
            0,
            h.alice,
            FAR_DEADLINE,
        )
        .unwrap();
    assert_eq!(amount_a, 1_000_000 - 500);
    assert_eq!(amount_b, 4_000_000 - 2_000);

    // Asking for the full deposit back fails on the locked minimum's share.
    seed_pool(&h, 3, 4, 1_000_000, 1_000_000);
    let pair = h.registry.get_pair(token(3), token(4)).unwrap();
    let shares = h.ledger.balance_of(pair.address(), h.alice);
    let result = h.router.remove_liquidity(
        h.alice,
        token(3),
        token(4),
        shares,
        1_000_000,
        0,
        h.alice,
        FAR_DEADLINE,
    );
    assert!(matches!(result, Err(RouterError::InsufficientAAmount)));
    // The rejected burn left the shares with alice.
    assert_eq!(h.ledger.balance_of(pair.address(), h.alice), shares);
}

#[test]
fn swap_exact_in_matches_quote_across_hops() {
    let h = harness();
    seed_pool(&h, 1, 2, 1_000_000, 4_000_000);
    seed_pool(&h, 2, 3, 4_000_000, 2_000_000);

    let path = [token(1), token(2), token(3)];
    let quoted = get_amounts_out(&h.registry, 10_000, &path).unwrap();

    h.ledger.mint(token(1), h.bob, 10_000).unwrap();
    let amounts = h
        .router
        .swap_exact_in(h.bob, 10_000, quoted[2], &path, h.bob, FAR_DEADLINE)
        .unwrap();
    assert_eq!(amounts, quoted);
    assert_eq!(h.ledger.balance_of(token(3), h.bob), quoted[2]);
    assert_eq!(h.ledger.balance_of(token(1), h.bob), 0);
    // No intermediate asset sticks to the trader.
    assert_eq!(h.ledger.balance_of(token(2), h.bob), 0);
}

#[test]
fn swap_exact_in_enforces_minimum_without_side_effects() {
    let h = harness();
    seed_pool(&h, 1, 2, 1_000_000, 4_000_000);

    h.ledger.mint(token(1), h.bob, 10_000).unwrap();
    let quoted = get_amounts_out(&h.registry, 10_000, &[token(1), token(2)]).unwrap();
    let result = h.router.swap_exact_in(
        h.bob,
        10_000,
        quoted[1] + 1,
        &[token(1), token(2)],
        h.bob,
        FAR_DEADLINE,
    );
    assert!(matches!(result, Err(RouterError::InsufficientOutputAmount)));
    assert_eq!(h.ledger.balance_of(token(1), h.bob), 10_000);
}

#[test]
fn swap_exact_out_draws_no_more_than_quoted() {
    let h = harness();
    seed_pool(&h, 1, 2, 1_000_000, 4_000_000);
    seed_pool(&h, 2, 3, 4_000_000, 2_000_000);

    let path = [token(1), token(2), token(3)];
    h.ledger.mint(token(1), h.bob, 50_000).unwrap();
    let amounts = h
        .router
        .swap_exact_out(h.bob, 4_000, 50_000, &path, h.bob, FAR_DEADLINE)
        .unwrap();
    assert_eq!(amounts[2], 4_000);
    assert_eq!(
        h.ledger.balance_of(token(1), h.bob),
        50_000 - amounts[0]
    );
    assert_eq!(h.ledger.balance_of(token(3), h.bob), 4_000);

    // A quotable target whose required input blows the cap.
    let result = h
        .router
        .swap_exact_out(h.bob, 100_000, 10, &path, h.bob, FAR_DEADLINE);
    assert!(matches!(result, Err(RouterError::ExcessiveInputAmount)));
    // An unquotable target fails in the backward pass instead.
    let result = h
        .router
        .swap_exact_out(h.bob, 10_000_000, 10, &path, h.bob, FAR_DEADLINE);
    assert!(matches!(
        result,
        Err(RouterError::Math(xyk_math::MathError::ExcessiveOutputAmount))
    ));
}

#[test]
fn deadline_in_the_past_rejects_everything() {
    let h = harness();
    seed_pool(&h, 1, 2, 1_000_000, 4_000_000);
    h.clock.advance(100); // now = 1_100

    h.ledger.mint(token(1), h.bob, 10_000).unwrap();
    let result = h
        .router
        .swap_exact_in(h.bob, 10_000, 0, &[token(1), token(2)], h.bob, 1_099);
    assert!(matches!(result, Err(RouterError::Expired)));

    // A deadline equal to now still passes.
    h.router
        .swap_exact_in(h.bob, 10_000, 0, &[token(1), token(2)], h.bob, 1_100)
        .unwrap();
}

#[test]
fn fee_on_transfer_path_reconciles_actual_amounts() {
    let h = harness();
    // token1 burns 5% of every transfer in flight.
    h.ledger.set_transfer_fee(token(1), 50).unwrap();
    seed_pool(&h, 1, 2, 1_000_000, 4_000_000);
    let pair = h.registry.get_pair(token(1), token(2)).unwrap();
    let (reserve_in, reserve_out, _) = pair.get_reserves();

    h.ledger.mint(token(1), h.bob, 100_000).unwrap();

    // The quoted path would overstate the input; the fee-aware variant
    // measures what actually landed in the pool.
    let arriving = 100_000 - 100_000 / 1000 * 50;
    let expected = xyk_math::get_amount_out(arriving, reserve_in, reserve_out, 3).unwrap();
    let received = h
        .router
        .swap_exact_in_supporting_fee(
            h.bob,
            100_000,
            expected,
            &[token(1), token(2)],
            h.bob,
            FAR_DEADLINE,
        )
        .unwrap();
    assert_eq!(received, expected);
    assert_eq!(h.ledger.balance_of(token(2), h.bob), expected);
}

#[test]
fn mid_path_failure_rewinds_the_whole_trade() {
    let h = harness();
    seed_pool(&h, 1, 2, 1_000_000, 4_000_000);
    seed_pool(&h, 2, 3, 4_000_000, 2_000_000);
    let first = h.registry.get_pair(token(1), token(2)).unwrap();
    let second = h.registry.get_pair(token(2), token(3)).unwrap();

    // The intermediate asset now burns 5% in flight. The plain quote does
    // not model that, so the first hop succeeds but the second pool receives
    // less than quoted and its invariant check fails mid-path.
    h.ledger.set_transfer_fee(token(2), 50).unwrap();

    h.ledger.mint(token(1), h.bob, 10_000).unwrap();
    let path = [token(1), token(2), token(3)];
    let result = h
        .router
        .swap_exact_in(h.bob, 10_000, 0, &path, h.bob, FAR_DEADLINE);
    assert!(result.is_err());

    // Nothing moved: the input is intact and neither pool's state drifted.
    assert_eq!(h.ledger.balance_of(token(1), h.bob), 10_000);
    assert_eq!(h.ledger.balance_of(token(3), h.bob), 0);
    assert_eq!(h.ledger.balance_of(token(1), first.address()), 1_000_000);
    let (reserve0, reserve1, _) = second.get_reserves();
    assert_eq!((reserve0, reserve1), (4_000_000, 2_000_000));
}
