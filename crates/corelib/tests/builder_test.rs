//! Tests for the ring builder.
//!
//! Covers registry/ring orchestration, rollback on ring failures, snapshot
//! persistence and reload, and the registry/ring invariant under random
//! mutation sequences.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use corelib::partitioner::Partitioner;
use corelib::store::{JsonFileStore, MemoryStore, SnapshotStore};
use corelib::vnode::partition_label;
use corelib::{
    BuilderConfig, DeviceId, Error, PersistenceError, RegistrySnapshot, RingBuilder, RingSnapshot,
    Token,
};
use proptest::prelude::*;

fn builder() -> RingBuilder<MemoryStore> {
    RingBuilder::new(MemoryStore::new(), BuilderConfig::default()).unwrap()
}

/// Tokens the ring must hold for the builder's current registry.
fn expected_tokens<S: SnapshotStore>(rb: &RingBuilder<S>) -> BTreeSet<Token> {
    rb.devices()
        .iter()
        .flat_map(|d| (0..d.partition_count).map(move |i| Token::from_key(&partition_label(d.id, i))))
        .collect()
}

fn ring_tokens<S: SnapshotStore>(rb: &RingBuilder<S>) -> BTreeSet<Token> {
    rb.ring_snapshot().entries.keys().copied().collect()
}

#[derive(Clone, Debug)]
struct OneBytePartitioner;

impl Partitioner for OneBytePartitioner {
    fn partition(&self, key: &[u8]) -> Token {
        let mut bytes = [0u8; 16];
        bytes[0] = Token::from_bytes(key).0[0];
        Token(bytes)
    }

    fn name(&self) -> &'static str {
        "OneBytePartitioner"
    }
}

/// Memory store whose saves can be switched off.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_saves: AtomicBool,
}

impl FlakyStore {
    fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("disk full".into()));
        }
        Ok(())
    }
}

impl SnapshotStore for FlakyStore {
    fn load_registry(&self) -> Result<RegistrySnapshot, PersistenceError> {
        self.inner.load_registry()
    }

    fn save_registry(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistenceError> {
        self.check()?;
        self.inner.save_registry(snapshot)
    }

    fn load_ring(&self) -> Result<RingSnapshot, PersistenceError> {
        self.inner.load_ring()
    }

    fn save_ring(&self, snapshot: &RingSnapshot) -> Result<(), PersistenceError> {
        self.check()?;
        self.inner.save_ring(snapshot)
    }
}

// ============================================================================
// Orchestration
// ============================================================================

#[test]
fn test_reference_scenario() {
    let rb = builder();
    assert_eq!(rb.add_device(1, "d1", 200).unwrap().partition_count, 4);
    assert_eq!(rb.add_device(2, "d2", 100).unwrap().partition_count, 2);
    assert_eq!(rb.add_device(4, "d4", 800).unwrap().partition_count, 16);
    assert_eq!(rb.partition_total(), 22);

    let owner = rb.lookup(b"probe").unwrap();
    assert!([DeviceId(1), DeviceId(2), DeviceId(4)].contains(&owner));

    assert_eq!(rb.remove_device(DeviceId(4)).unwrap(), 16);
    assert!(matches!(rb.remove_device(DeviceId(4)), Err(Error::NotFound(DeviceId(4)))));

    let d1_before = rb.ring_snapshot().entries.into_iter().filter(|(_, d)| *d == DeviceId(1)).count();
    let tokens_before = ring_tokens(&rb);

    assert_eq!(rb.update_device(DeviceId(2), 400).unwrap(), (2, 8));
    let tokens_after = ring_tokens(&rb);

    assert_eq!(tokens_after.len(), tokens_before.len() + 6);
    assert!(tokens_before.is_subset(&tokens_after));
    assert_eq!(rb.ownership()[&DeviceId(1)], d1_before);
    assert_eq!(rb.ownership()[&DeviceId(2)], 8);
    assert_eq!(ring_tokens(&rb), expected_tokens(&rb));
}

#[test]
fn test_add_rejections_leave_state_unchanged() {
    let rb = builder();
    rb.add_device(1, "d1", 200).unwrap();
    let saves = rb.store().save_count();
    let ring = rb.ring_snapshot();

    for (id, name, weight) in [(0, "x", 100), (2, "", 100), (2, "x", 0), (2, "x", 120), (1, "again", 100)] {
        assert!(
            matches!(rb.add_device(id, name, weight), Err(Error::InvalidParameter(_))),
            "add({id}, {name:?}, {weight}) should be rejected"
        );
    }

    assert_eq!(rb.device_count(), 1);
    assert_eq!(rb.ring_snapshot(), ring);
    assert_eq!(rb.store().save_count(), saves);
}

#[test]
fn test_update_and_remove_unknown_device() {
    let rb = builder();
    assert!(matches!(rb.update_device(DeviceId(3), 200), Err(Error::NotFound(_))));
    assert!(matches!(rb.remove_device(DeviceId(3)), Err(Error::NotFound(_))));
}

#[test]
fn test_shrink_keeps_low_indices() {
    let rb = builder();
    rb.add_device(1, "d1", 1000).unwrap();
    let kept: BTreeSet<Token> = (0..4).map(|i| Token::from_key(&partition_label(DeviceId(1), i))).collect();

    assert_eq!(rb.update_device(DeviceId(1), 200).unwrap(), (20, 4));
    assert_eq!(ring_tokens(&rb), kept);
}

#[test]
fn test_unchanged_weight_rejected_by_default() {
    let rb = builder();
    rb.add_device(1, "d1", 200).unwrap();
    assert!(matches!(rb.update_device(DeviceId(1), 200), Err(Error::InvalidParameter(_))));
}

#[test]
fn test_unchanged_weight_allowed_when_configured() {
    let config = BuilderConfig::default().with_reject_unchanged_weight(false);
    let rb = RingBuilder::new(MemoryStore::new(), config).unwrap();
    rb.add_device(1, "d1", 200).unwrap();
    let ring = rb.ring_snapshot();

    assert_eq!(rb.update_device(DeviceId(1), 200).unwrap(), (4, 4));
    assert_eq!(rb.ring_snapshot(), ring);
    assert_eq!(rb.store().save_count(), 4);
}

#[test]
fn test_lookup_empty_ring() {
    assert!(matches!(builder().lookup(b"probe"), Err(Error::EmptyRing)));
}

#[test]
fn test_lookup_after_last_device_removed() {
    let rb = builder();
    rb.add_device(1, "d1", 200).unwrap();
    rb.remove_device(DeviceId(1)).unwrap();
    assert!(matches!(rb.lookup(b"probe"), Err(Error::EmptyRing)));
}

// ============================================================================
// Rollback
// ============================================================================

#[test]
fn test_add_collision_rolls_back_registry() {
    let rb = RingBuilder::with_partitioner(MemoryStore::new(), BuilderConfig::default(), OneBytePartitioner).unwrap();
    rb.add_device(1, "d1", 100).unwrap();
    let ring = rb.ring_snapshot();
    let saves = rb.store().save_count();

    // 200 one-byte tokens cannot all be distinct from each other.
    let err = rb.add_device(2, "d2", 10_000).unwrap_err();
    assert!(matches!(err, Error::Integrity(_)));

    assert!(rb.device(DeviceId(2)).is_none());
    assert_eq!(rb.ring_snapshot(), ring);
    assert_eq!(rb.store().save_count(), saves);
    rb.verify().unwrap();
}

#[test]
fn test_update_collision_restores_weight() {
    let rb = RingBuilder::with_partitioner(MemoryStore::new(), BuilderConfig::default(), OneBytePartitioner).unwrap();
    rb.add_device(1, "d1", 100).unwrap();

    assert!(matches!(rb.update_device(DeviceId(1), 10_000), Err(Error::Integrity(_))));

    let device = rb.device(DeviceId(1)).unwrap();
    assert_eq!(device.weight, 100);
    assert_eq!(device.partition_count, 2);
    rb.verify().unwrap();
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_save_failure_keeps_in_memory_state() {
    let rb = RingBuilder::new(FlakyStore::default(), BuilderConfig::default()).unwrap();
    rb.add_device(1, "d1", 200).unwrap();

    rb.store().set_failing(true);
    let err = rb.add_device(2, "d2", 300).unwrap_err();
    assert!(matches!(err, Error::Persistence(PersistenceError::Unavailable(_))));
    assert_eq!(rb.device_count(), 2);
    assert_eq!(rb.partition_total(), 10);
    assert!(matches!(rb.rebalance(), Err(Error::Persistence(_))));

    // Reloading discards the unsaved device.
    rb.store().set_failing(false);
    rb.reload().unwrap();
    assert_eq!(rb.device_count(), 1);
    assert_eq!(rb.partition_total(), 4);
}

#[test]
fn test_open_restores_saved_state() {
    let store = Arc::new(MemoryStore::new());
    let rb = RingBuilder::new(Arc::clone(&store), BuilderConfig::default()).unwrap();
    rb.add_device(1, "d1", 200).unwrap();
    rb.add_device(3, "d3", 600).unwrap();
    let owner = rb.lookup(b"probe").unwrap();
    drop(rb);

    let reopened = RingBuilder::open(Arc::clone(&store), BuilderConfig::default()).unwrap();
    assert_eq!(reopened.device_count(), 2);
    assert_eq!(reopened.partition_total(), 16);
    assert_eq!(reopened.lookup(b"probe").unwrap(), owner);
}

#[test]
fn test_open_rejects_divergent_snapshots() {
    let rb = builder();
    rb.add_device(1, "d1", 200).unwrap();
    let registry = rb.registry_snapshot();
    let mut ring = rb.ring_snapshot();
    let first = *ring.entries.keys().next().unwrap();
    ring.entries.remove(&first);

    let store = MemoryStore::with_snapshots(registry, ring);
    let err = RingBuilder::open(store, BuilderConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Integrity(_)));
}

#[test]
fn test_reload_failure_keeps_current_state() {
    let rb = builder();
    rb.add_device(1, "d1", 200).unwrap();

    // Registry says nothing, ring still has device 1: divergent.
    let bad = MemoryStore::with_snapshots(RegistrySnapshot::default(), rb.ring_snapshot());
    let rb2 = RingBuilder::new(bad, BuilderConfig::default()).unwrap();
    assert!(matches!(rb2.reload(), Err(Error::Integrity(_))));
    assert_eq!(rb2.device_count(), 0);
}

#[test]
fn test_json_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let rb = RingBuilder::open(JsonFileStore::in_dir(dir.path()), BuilderConfig::default()).unwrap();
    rb.add_device(1, "d1", 200).unwrap();
    rb.add_device(2, "d2", 100).unwrap();
    rb.update_device(DeviceId(2), 400).unwrap();
    rb.rebalance().unwrap();
    let owner = rb.lookup(b"probe").unwrap();
    drop(rb);

    let reopened = RingBuilder::open(JsonFileStore::in_dir(dir.path()), BuilderConfig::default()).unwrap();
    assert_eq!(reopened.device(DeviceId(2)).unwrap().partition_count, 8);
    assert_eq!(reopened.partition_total(), 12);
    assert_eq!(reopened.lookup(b"probe").unwrap(), owner);
    reopened.verify().unwrap();
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_lookups_concurrent_with_mutations() {
    let rb = Arc::new(builder());
    rb.add_device(1, "d1", 200).unwrap();

    let writer = {
        let rb = Arc::clone(&rb);
        thread::spawn(move || {
            for round in 0..50u64 {
                let weight = 100 * (round % 5 + 1);
                let _ = rb.update_device(DeviceId(1), weight);
                rb.add_device(2, "d2", 300).unwrap();
                rb.remove_device(DeviceId(2)).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|r| {
            let rb = Arc::clone(&rb);
            thread::spawn(move || {
                for i in 0..500 {
                    let owner = rb.lookup(format!("key-{r}-{i}").as_bytes()).unwrap();
                    assert!(owner == DeviceId(1) || owner == DeviceId(2));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    rb.verify().unwrap();
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Add(u64, u64),
    Update(u64, u64),
    Remove(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..8, 1u64..12).prop_map(|(id, w)| Op::Add(id, w * 100)),
        (1u64..8, 1u64..12).prop_map(|(id, w)| Op::Update(id, w * 100)),
        (1u64..8).prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn prop_ring_matches_registry(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let rb = builder();
        for op in ops {
            let _ = match op {
                Op::Add(id, w) => rb.add_device(id, "dev", w).map(|_| ()),
                Op::Update(id, w) => rb.update_device(DeviceId(id), w).map(|_| ()),
                Op::Remove(id) => rb.remove_device(DeviceId(id)).map(|_| ()),
            };
            prop_assert_eq!(ring_tokens(&rb), expected_tokens(&rb));
        }

        for device in rb.devices() {
            prop_assert_eq!(device.partition_count as u64, device.weight / 50);
        }
        if rb.device_count() > 0 {
            let owner = rb.lookup(b"probe").unwrap();
            prop_assert!(rb.device(owner).is_some());
        }
    }
}
