//! End-to-end tests driving the staking engine through deposits, accrual,
//! transfers and withdrawals against an in-memory token.

use std::sync::{Arc, Mutex};

use lockup_nullables::{NullBlockClock, RecordingPolicy};
use lockup_staking::{
    FlatPolicy, PolicyOracle, PropertyRegistry, StakingEngine, StakingError, StakingEvent,
};
use lockup_token::{EscrowToken, InMemoryToken, TokenError};
use lockup_types::{Address, BlockNumber, PositionId, PropertyId, SCALE};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const REWARD: u128 = 10 * SCALE;
const FUNDS: u128 = 1_000_000;

struct Harness {
    engine: StakingEngine<InMemoryToken>,
    registry: Arc<PropertyRegistry>,
    clock: NullBlockClock,
}

impl Harness {
    fn new() -> Self {
        Self::with_policy(Arc::new(FlatPolicy::full_share(REWARD)))
    }

    fn with_policy(policy: Arc<dyn PolicyOracle>) -> Self {
        let registry = Arc::new(PropertyRegistry::with_properties([prop("p"), prop("q")]));
        let mut engine = StakingEngine::new(
            InMemoryToken::new(),
            policy,
            registry.clone(),
            Address::new("escrow"),
        );
        for who in ["alice", "bob", "carol"] {
            let token = engine.token_mut();
            token.mint(&addr(who), FUNDS).unwrap();
            token.approve(&addr(who), &addr("escrow"), FUNDS);
        }
        Self {
            engine,
            registry,
            clock: NullBlockClock::new(1),
        }
    }

    fn stake(&mut self, who: &str, property: &str, amount: u128) -> PositionId {
        self.engine
            .deposit_to_property(&prop(property), amount, &addr(who), self.clock.now())
            .expect("deposit")
    }

    fn withdrawable(&self, id: PositionId) -> u128 {
        self.engine
            .calculate_withdrawable_interest(id, self.clock.now())
            .expect("preview")
    }

    fn withdraw(&mut self, who: &str, id: PositionId, amount: u128) -> u128 {
        self.engine
            .withdraw_by_position(id, amount, &addr(who), self.clock.now())
            .expect("withdraw")
            .reward
    }

    fn balance(&self, who: &str) -> u128 {
        self.engine.token().balance_of(&addr(who))
    }
}

fn addr(s: &str) -> Address {
    Address::new(s)
}

fn prop(s: &str) -> PropertyId {
    PropertyId::new(s)
}

// ---------------------------------------------------------------------------
// 1. Reward accrual
// ---------------------------------------------------------------------------

#[test]
fn first_staker_then_second_split_the_block_reward() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);

    h.clock.tick();
    assert_eq!(h.withdrawable(a), 10 * SCALE);

    let b = h.stake("bob", "p", 100);
    h.clock.tick();
    assert_eq!(h.withdrawable(a), 15 * SCALE);
    assert_eq!(h.withdrawable(b), 5 * SCALE);
}

#[test]
fn positions_on_one_property_split_in_ratio() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 300);
    let b = h.stake("bob", "p", 100);
    h.clock.advance(4);
    assert_eq!(h.withdrawable(a), 30 * SCALE);
    assert_eq!(h.withdrawable(b), 10 * SCALE);
}

#[test]
fn properties_share_by_locked_total() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    let b = h.stake("bob", "q", 300);
    h.clock.advance(2);
    assert_eq!(h.withdrawable(a), 5 * SCALE);
    assert_eq!(h.withdrawable(b), 15 * SCALE);

    let prices = h.engine.cumulative_prices(&prop("p"), h.clock.now()).unwrap();
    assert_eq!(prices.global.reward_for(400), Some(20 * SCALE));
    assert_eq!(prices.property.reward_for(100), Some(5 * SCALE));
}

#[test]
fn idle_blocks_before_first_stake_pay_nothing() {
    let mut h = Harness::new();
    h.clock.advance(50);
    let a = h.stake("alice", "p", 100);
    assert_eq!(h.withdrawable(a), 0);
    h.clock.tick();
    assert_eq!(h.withdrawable(a), 10 * SCALE);
}

#[test]
fn preview_equals_payout() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 7);
    h.stake("bob", "p", 13);
    h.clock.advance(3);
    h.stake("carol", "q", 11);
    h.clock.advance(5);

    let preview = h.withdrawable(a);
    let before = h.balance("alice");
    let paid = h.withdraw("alice", a, 0);
    assert_eq!(paid, preview);
    assert_eq!(h.balance("alice") - before, preview);
}

#[test]
fn policy_sees_values_from_before_settlement() {
    let policy = Arc::new(RecordingPolicy::full_share(REWARD));
    let mut h = Harness::with_policy(policy.clone());
    let supply = h.engine.token().total_supply();

    h.stake("alice", "p", 100);
    assert!(policy.calls().is_empty());

    h.clock.advance(2);
    h.stake("bob", "p", 50);
    let calls = policy.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].block, BlockNumber::new(3));
    assert_eq!(calls[0].total_locked, 100);
    assert_eq!(calls[0].total_supply, supply);
}

// ---------------------------------------------------------------------------
// 2. Withdrawals
// ---------------------------------------------------------------------------

#[test]
fn zero_withdraw_claims_reward_only() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    h.clock.tick();

    let reward = h.withdraw("alice", a, 0);
    assert_eq!(reward, 10 * SCALE);
    assert_eq!(h.balance("alice"), FUNDS - 100 + 10 * SCALE);
    assert_eq!(h.engine.position(a).unwrap().amount, 100);
    assert_eq!(h.engine.total_locked(), 100);
    assert_eq!(h.withdrawable(a), 0);
}

#[test]
fn reward_is_never_paid_twice() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    h.clock.advance(3);
    assert_eq!(h.withdraw("alice", a, 0), 30 * SCALE);
    assert_eq!(h.withdraw("alice", a, 0), 0);
    h.clock.tick();
    assert_eq!(h.withdraw("alice", a, 0), 10 * SCALE);
    assert_eq!(h.engine.position(a).unwrap().cumulative_reward, 40 * SCALE);
}

#[test]
fn full_withdraw_keeps_the_record() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    h.clock.tick();
    let receipt = h
        .engine
        .withdraw_by_position(a, 100, &addr("alice"), h.clock.now())
        .unwrap();
    assert_eq!(receipt.amount, 100);
    assert_eq!(receipt.reward, 10 * SCALE);
    assert_eq!(receipt.property, prop("p"));
    assert_eq!(h.balance("escrow"), 0);
    assert_eq!(h.engine.total_locked(), 0);
    assert_eq!(h.engine.total_locked_for_property(&prop("p")), 0);

    let position = h.engine.position(a).unwrap();
    assert_eq!(position.amount, 0);
    assert_eq!(position.pending_reward, 0);
    h.clock.advance(10);
    assert_eq!(h.withdrawable(a), 0);
}

#[test]
fn partial_withdraw_reduces_future_share() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    let b = h.stake("bob", "p", 100);
    h.clock.tick();
    h.withdraw("alice", a, 50);
    h.clock.tick();
    // First block split 50/50, second block 1:2.
    let second_block_a = REWARD / 3;
    assert_eq!(h.withdrawable(a), second_block_a);
    assert!(h.withdrawable(b) >= 5 * SCALE + 2 * second_block_a);
    assert_eq!(h.balance("escrow"), 150);
}

// ---------------------------------------------------------------------------
// 3. Positions and ownership
// ---------------------------------------------------------------------------

#[test]
fn every_deposit_opens_a_new_position() {
    let mut h = Harness::new();
    let first = h.stake("alice", "p", 10);
    let second = h.stake("alice", "p", 10);
    assert_ne!(first, second);
    assert_eq!(h.engine.positions_of(&addr("alice")), vec![first, second]);
    assert_eq!(h.engine.position_count(), 2);
}

#[test]
fn deposit_to_position_settles_first() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    h.clock.tick();
    h.engine
        .deposit_to_position(a, 100, &addr("alice"), h.clock.now())
        .unwrap();
    assert_eq!(h.engine.position(a).unwrap().pending_reward, 10 * SCALE);
    h.clock.tick();
    assert_eq!(h.withdrawable(a), 20 * SCALE);
    assert_eq!(h.engine.total_locked_for_property(&prop("p")), 200);
}

#[test]
fn transfer_preserves_accrual() {
    let mut moved = Harness::new();
    let mut kept = Harness::new();
    let m = moved.stake("alice", "p", 100);
    let k = kept.stake("alice", "p", 100);

    moved.clock.advance(2);
    kept.clock.advance(2);
    moved
        .engine
        .transfer_position(m, &addr("alice"), &addr("bob"), moved.clock.now())
        .unwrap();

    moved.clock.advance(2);
    kept.clock.advance(2);
    let via_transfer = moved.withdraw("bob", m, 100);
    let direct = kept.withdraw("alice", k, 100);

    assert_eq!(via_transfer, direct);
    assert_eq!(via_transfer, 40 * SCALE);
    assert_eq!(moved.balance("bob"), FUNDS + 100 + 40 * SCALE);
    assert!(moved.engine.positions_of(&addr("alice")).is_empty());
    assert_eq!(moved.engine.positions_of(&addr("bob")), vec![m]);
}

#[test]
fn previous_owner_loses_authority() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    h.engine
        .transfer_position(a, &addr("alice"), &addr("bob"), h.clock.now())
        .unwrap();
    let result = h
        .engine
        .withdraw_by_position(a, 0, &addr("alice"), h.clock.now());
    assert!(matches!(result, Err(StakingError::NotOwner { caller, .. }) if caller == addr("alice")));
    assert!(matches!(
        h.engine
            .transfer_position(a, &addr("alice"), &addr("carol"), h.clock.now()),
        Err(StakingError::NotOwner { .. })
    ));
}

// ---------------------------------------------------------------------------
// 4. Authentication
// ---------------------------------------------------------------------------

#[test]
fn revocation_freezes_but_keeps_pending() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    h.clock.advance(2);
    h.engine
        .deposit_to_position(a, 100, &addr("alice"), h.clock.now())
        .unwrap();
    assert_eq!(h.engine.position(a).unwrap().pending_reward, 20 * SCALE);

    h.registry.revoke(&prop("p"));
    h.clock.advance(5);
    assert_eq!(h.withdrawable(a), 20 * SCALE);
    assert_eq!(h.withdraw("alice", a, 200), 20 * SCALE);
}

#[test]
fn unauthenticated_property_rejects_new_stake() {
    let mut h = Harness::new();
    let result = h
        .engine
        .deposit_to_property(&prop("nowhere"), 10, &addr("alice"), h.clock.now());
    assert!(matches!(result, Err(StakingError::UnauthenticatedProperty(p)) if p == prop("nowhere")));
    assert_eq!(h.balance("alice"), FUNDS);
}

#[test]
fn reauthentication_resumes_accrual() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    h.registry.revoke(&prop("p"));
    h.clock.advance(3);
    // Settling while revoked discards the revoked blocks.
    h.withdraw("alice", a, 0);
    h.registry.authenticate(prop("p"));
    h.clock.tick();
    assert_eq!(h.withdrawable(a), 10 * SCALE);
}

#[test]
fn settling_before_revocation_credits_accrual_up_to_that_block() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    h.clock.advance(2);
    h.engine.settle_property(&prop("p"), h.clock.now()).unwrap();
    h.registry.revoke(&prop("p"));
    h.clock.advance(5);
    assert_eq!(h.withdrawable(a), 20 * SCALE);

    // Without the explicit settlement the same window would be lost.
    let b = h.stake("bob", "q", 100);
    h.clock.advance(2);
    h.registry.revoke(&prop("q"));
    assert_eq!(h.withdrawable(b), 0);
}

#[test]
fn settling_before_reauthentication_skips_revoked_blocks() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    h.registry.revoke(&prop("p"));
    h.clock.advance(3);
    let state = h.engine.settle_property(&prop("p"), h.clock.now()).unwrap();
    assert_eq!(state.last_settled_block, h.clock.now());
    h.registry.authenticate(prop("p"));
    h.clock.tick();
    assert_eq!(h.withdrawable(a), 10 * SCALE);
}

// ---------------------------------------------------------------------------
// 5. Failures leave no trace
// ---------------------------------------------------------------------------

#[test]
fn validation_errors() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    let now = h.clock.now();
    assert!(matches!(
        h.engine.deposit_to_property(&prop("p"), 0, &addr("alice"), now),
        Err(StakingError::InvalidAmount)
    ));
    assert!(matches!(
        h.engine.deposit_to_position(a, 0, &addr("alice"), now),
        Err(StakingError::InvalidAmount)
    ));
    assert!(matches!(
        h.engine.deposit_to_position(a, 5, &addr("bob"), now),
        Err(StakingError::NotOwner { .. })
    ));
    assert!(matches!(
        h.engine.withdraw_by_position(a, 101, &addr("alice"), now),
        Err(StakingError::InsufficientStake { requested: 101, staked: 100 })
    ));
    assert_eq!(h.engine.stats().get("aborted"), 4);
}

#[test]
fn block_regression_is_rejected() {
    let mut h = Harness::new();
    h.clock.set(10);
    let a = h.stake("alice", "p", 100);
    let result = h
        .engine
        .withdraw_by_position(a, 0, &addr("alice"), BlockNumber::new(9));
    assert!(matches!(result, Err(StakingError::BlockRegression { .. })));
}

#[test]
fn failed_release_leaves_state_identical() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    h.clock.advance(2);
    h.engine.token_mut().burn(&addr("escrow"), 100).unwrap();

    let position = h.engine.position(a).cloned();
    let global = h.engine.global_state().clone();
    let property = h.engine.property_state(&prop("p")).cloned();

    let result = h
        .engine
        .withdraw_by_position(a, 100, &addr("alice"), h.clock.now());
    assert!(matches!(
        result,
        Err(StakingError::Token(TokenError::InsufficientBalance { .. }))
    ));
    assert_eq!(h.engine.position(a).cloned(), position);
    assert_eq!(h.engine.global_state(), &global);
    assert_eq!(h.engine.property_state(&prop("p")).cloned(), property);
    assert_eq!(h.balance("alice"), FUNDS - 100);

    h.engine.token_mut().mint(&addr("escrow"), 100).unwrap();
    assert_eq!(h.withdraw("alice", a, 100), 20 * SCALE);
}

#[test]
fn failed_top_up_leaves_position_untouched() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    h.engine
        .token_mut()
        .approve(&addr("alice"), &addr("escrow"), 0);
    h.clock.tick();

    let result = h
        .engine
        .deposit_to_position(a, 50, &addr("alice"), h.clock.now());
    assert!(matches!(
        result,
        Err(StakingError::Token(TokenError::InsufficientAllowance { needed: 50, available: 0 }))
    ));
    let position = h.engine.position(a).unwrap();
    assert_eq!(position.amount, 100);
    assert_eq!(position.pending_reward, 0);
    assert_eq!(h.engine.total_locked(), 100);
    assert_eq!(h.withdrawable(a), 10 * SCALE);
}

// ---------------------------------------------------------------------------
// 6. Policy swaps and events
// ---------------------------------------------------------------------------

#[test]
fn old_policy_governs_blocks_before_the_swap() {
    let mut h = Harness::new();
    let a = h.stake("alice", "p", 100);
    h.clock.advance(2);
    h.engine
        .set_policy(Arc::new(FlatPolicy::full_share(SCALE)), h.clock.now())
        .unwrap();
    h.clock.advance(2);
    assert_eq!(h.withdrawable(a), 22 * SCALE);
    assert_eq!(h.engine.policy().name(), "flat");
}

#[test]
fn committed_operations_emit_events() {
    let mut h = Harness::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    h.engine
        .subscribe(Box::new(move |event| sink.lock().unwrap().push(event.clone())));

    let a = h.stake("alice", "p", 100);
    let _ = h
        .engine
        .deposit_to_property(&prop("p"), 0, &addr("alice"), h.clock.now());
    h.clock.tick();
    h.withdraw("alice", a, 40);

    let events = seen.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            StakingEvent::Staked {
                sender: addr("alice"),
                property: prop("p"),
                position: a,
                amount: 100,
                block: BlockNumber::new(1),
            },
            StakingEvent::Withdrawn {
                sender: addr("alice"),
                property: prop("p"),
                position: a,
                amount: 40,
                reward: 10 * SCALE,
                block: BlockNumber::new(2),
            },
        ]
    );
}
