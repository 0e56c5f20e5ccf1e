//! Saving engine state and loading it back, through the in-memory store and
//! through LMDB.

use std::sync::Arc;

use lockup_nullables::{NullBlockClock, NullGate, NullStore};
use lockup_staking::{FlatPolicy, StakingEngine, StakingError};
use lockup_store::{StakingStore, StakingWriteBatch, StoreError};
use lockup_store_lmdb::{LmdbEnvironment, LmdbStakingStore};
use lockup_token::InMemoryToken;
use lockup_types::{Address, PositionId, PropertyId, SCALE};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn addr(s: &str) -> Address {
    Address::new(s)
}

fn funded_token() -> InMemoryToken {
    let mut token = InMemoryToken::new();
    for who in ["alice", "bob"] {
        token.mint(&addr(who), 1_000).unwrap();
        token.approve(&addr(who), &addr("escrow"), 1_000);
    }
    token
}

fn new_engine(token: InMemoryToken) -> StakingEngine<InMemoryToken> {
    StakingEngine::new(
        token,
        Arc::new(FlatPolicy::full_share(10 * SCALE)),
        Arc::new(NullGate::allow_all()),
        addr("escrow"),
    )
}

fn load(store: &dyn StakingStore, token: InMemoryToken) -> StakingEngine<InMemoryToken> {
    StakingEngine::load_from_store(
        store,
        token,
        Arc::new(FlatPolicy::full_share(10 * SCALE)),
        Arc::new(NullGate::allow_all()),
        addr("escrow"),
    )
    .expect("load")
}

/// Two properties, three positions, one transfer and one partial withdraw.
fn busy_engine(clock: &NullBlockClock) -> (StakingEngine<InMemoryToken>, Vec<PositionId>) {
    let mut engine = new_engine(funded_token());
    let p = PropertyId::new("p");
    let q = PropertyId::new("q");
    let a = engine.deposit_to_property(&p, 100, &addr("alice"), clock.now()).unwrap();
    let b = engine.deposit_to_property(&q, 300, &addr("bob"), clock.now()).unwrap();
    clock.advance(2);
    let c = engine.deposit_to_property(&p, 50, &addr("alice"), clock.now()).unwrap();
    engine
        .transfer_position(a, &addr("alice"), &addr("bob"), clock.now())
        .unwrap();
    clock.tick();
    engine
        .withdraw_by_position(b, 100, &addr("bob"), clock.now())
        .unwrap();
    (engine, vec![a, b, c])
}

fn assert_same_state(
    left: &StakingEngine<InMemoryToken>,
    right: &StakingEngine<InMemoryToken>,
    ids: &[PositionId],
) {
    assert_eq!(left.global_state(), right.global_state());
    for property in ["p", "q"] {
        let property = PropertyId::new(property);
        assert_eq!(left.property_state(&property), right.property_state(&property));
    }
    for id in ids {
        assert_eq!(left.position(*id), right.position(*id));
    }
    for owner in ["alice", "bob"] {
        assert_eq!(left.positions_of(&addr(owner)), right.positions_of(&addr(owner)));
    }
    assert_eq!(left.position_count(), right.position_count());
}

// ---------------------------------------------------------------------------
// 1. In-memory store
// ---------------------------------------------------------------------------

#[test]
fn round_trip_preserves_all_state() {
    let clock = NullBlockClock::new(1);
    let (engine, ids) = busy_engine(&clock);
    let store = NullStore::new();
    engine.save_to_store(&store).unwrap();
    assert_eq!(store.write_count(), 1);

    let restored = load(&store, engine.token().clone());
    assert_same_state(&engine, &restored, &ids);

    clock.advance(5);
    for id in &ids {
        assert_eq!(
            engine.calculate_withdrawable_interest(*id, clock.now()).unwrap(),
            restored.calculate_withdrawable_interest(*id, clock.now()).unwrap()
        );
    }
}

#[test]
fn restored_engine_continues_numbering() {
    let clock = NullBlockClock::new(1);
    let (engine, ids) = busy_engine(&clock);
    let store = NullStore::new();
    engine.save_to_store(&store).unwrap();

    let mut restored = load(&store, engine.token().clone());
    let next = restored
        .deposit_to_property(&PropertyId::new("q"), 1, &addr("alice"), clock.now())
        .unwrap();
    assert!(ids.iter().all(|id| *id < next));
}

#[test]
fn empty_store_loads_empty_engine() {
    let engine = load(&NullStore::new(), InMemoryToken::new());
    assert_eq!(engine.position_count(), 0);
    assert_eq!(engine.total_locked(), 0);
}

#[test]
fn failed_save_writes_nothing() {
    let clock = NullBlockClock::new(1);
    let (engine, _) = busy_engine(&clock);
    let store = NullStore::new();
    store.fail_next_write();
    assert!(matches!(
        engine.save_to_store(&store),
        Err(StakingError::Store(StoreError::Backend(_)))
    ));
    assert!(store.iter_positions().unwrap().is_empty());
}

#[test]
fn garbage_is_reported_as_store_error() {
    let store = NullStore::new();
    let mut batch = StakingWriteBatch::new();
    batch.put_meta(b"next_position_id", vec![1, 2, 3]);
    store.write(batch).unwrap();

    let result = StakingEngine::load_from_store(
        &store,
        InMemoryToken::new(),
        Arc::new(FlatPolicy::full_share(1)),
        Arc::new(NullGate::allow_all()),
        addr("escrow"),
    );
    assert!(matches!(result, Err(StakingError::Store(StoreError::Corruption(_)))));
}

#[test]
fn position_amounts_must_match_their_property() {
    let clock = NullBlockClock::new(1);
    let p = PropertyId::new("p");

    let mut engine = new_engine(funded_token());
    let id = engine.deposit_to_property(&p, 100, &addr("alice"), clock.now()).unwrap();
    let store = NullStore::new();
    engine.save_to_store(&store).unwrap();

    // Same id, different amount: property and global totals still say 100.
    let mut smaller = new_engine(funded_token());
    smaller.deposit_to_property(&p, 60, &addr("alice"), clock.now()).unwrap();
    let other = NullStore::new();
    smaller.save_to_store(&other).unwrap();
    let mut batch = StakingWriteBatch::new();
    batch.put_position(id, addr("alice"), other.get_position(id).unwrap().unwrap());
    store.write(batch).unwrap();

    let result = StakingEngine::load_from_store(
        &store,
        engine.token().clone(),
        Arc::new(FlatPolicy::full_share(10 * SCALE)),
        Arc::new(NullGate::allow_all()),
        addr("escrow"),
    );
    assert!(matches!(result, Err(StakingError::Store(StoreError::Corruption(_)))));
}

// ---------------------------------------------------------------------------
// 2. LMDB
// ---------------------------------------------------------------------------

#[test]
fn lmdb_round_trip_survives_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let clock = NullBlockClock::new(1);
    let (engine, ids) = busy_engine(&clock);
    {
        let env = LmdbEnvironment::open(dir.path(), 16 << 20).expect("open env");
        engine.save_to_store(&LmdbStakingStore::new(env)).unwrap();
    }

    let env = LmdbEnvironment::open(dir.path(), 16 << 20).expect("reopen env");
    let store = LmdbStakingStore::new(env);
    let restored = load(&store, engine.token().clone());
    assert_same_state(&engine, &restored, &ids);

    // The store's own owner index agrees with the engine's.
    assert_eq!(
        store.positions_of_owner(&addr("bob")).unwrap(),
        restored.positions_of(&addr("bob"))
    );
}

#[test]
fn lmdb_resave_moves_owner_index() {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = LmdbEnvironment::open(dir.path(), 16 << 20).expect("open env");
    let store = LmdbStakingStore::new(env);
    let clock = NullBlockClock::new(1);

    let mut engine = new_engine(funded_token());
    let id = engine
        .deposit_to_property(&PropertyId::new("p"), 10, &addr("alice"), clock.now())
        .unwrap();
    engine.save_to_store(&store).unwrap();
    engine
        .transfer_position(id, &addr("alice"), &addr("bob"), clock.tick())
        .unwrap();
    engine.save_to_store(&store).unwrap();

    assert!(store.positions_of_owner(&addr("alice")).unwrap().is_empty());
    assert_eq!(store.positions_of_owner(&addr("bob")).unwrap(), vec![id]);
}
