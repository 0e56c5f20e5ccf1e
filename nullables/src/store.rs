//! Nullable store: thread-safe in-memory staking storage for testing.

use lockup_store::{StakingStore, StakingWriteBatch, StoreError, WriteOp};
use lockup_types::{Address, PositionId, PropertyId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    meta: HashMap<Vec<u8>, Vec<u8>>,
    properties: BTreeMap<PropertyId, Vec<u8>>,
    positions: BTreeMap<PositionId, (Address, Vec<u8>)>,
}

/// An in-memory [`StakingStore`]. Batches apply under one lock, so they are
/// atomic; [`NullStore::fail_next_write`] makes the next batch fail whole.
#[derive(Default)]
pub struct NullStore {
    tables: Mutex<Tables>,
    fail_next_write: AtomicBool,
    writes: Mutex<usize>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Number of batches committed so far.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl StakingStore for NullStore {
    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables.lock().unwrap().meta.get(key).cloned())
    }

    fn get_property(&self, property: &PropertyId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables.lock().unwrap().properties.get(property).cloned())
    }

    fn iter_properties(&self) -> Result<Vec<(PropertyId, Vec<u8>)>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn get_position(&self, id: PositionId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .positions
            .get(&id)
            .map(|(_, value)| value.clone()))
    }

    fn iter_positions(&self) -> Result<Vec<(PositionId, Vec<u8>)>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .positions
            .iter()
            .map(|(id, (_, value))| (*id, value.clone()))
            .collect())
    }

    fn positions_of_owner(&self, owner: &Address) -> Result<Vec<PositionId>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .positions
            .iter()
            .filter(|(_, (o, _))| o == owner)
            .map(|(id, _)| *id)
            .collect())
    }

    fn write(&self, batch: StakingWriteBatch) -> Result<(), StoreError> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".into()));
        }
        let mut tables = self.tables.lock().unwrap();
        for op in batch.into_ops() {
            match op {
                WriteOp::PutMeta { key, value } => {
                    tables.meta.insert(key, value);
                }
                WriteOp::PutProperty { property, value } => {
                    tables.properties.insert(property, value);
                }
                WriteOp::PutPosition { id, owner, value } => {
                    tables.positions.insert(id, (owner, value));
                }
            }
        }
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}
