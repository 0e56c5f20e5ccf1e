use lockup_store::{StakingStore, StakingWriteBatch, StoreError, WriteOp};
use lockup_types::{Address, PositionId, PropertyId};

use crate::environment::LmdbEnvironment;
use crate::LmdbError;

/// Owner-index key prefix: `u16` length, then the owner bytes. Length
/// prefixing keeps `"ali"` from matching `"alice"` in a prefix scan.
fn owner_prefix(owner: &str) -> Result<Vec<u8>, StoreError> {
    let bytes = owner.as_bytes();
    let len = u16::try_from(bytes.len())
        .map_err(|_| StoreError::Corruption(format!("owner of {} bytes", bytes.len())))?;
    let mut key = Vec::with_capacity(2 + bytes.len() + 8);
    key.extend_from_slice(&len.to_be_bytes());
    key.extend_from_slice(bytes);
    Ok(key)
}

fn owner_key(owner: &str, id: PositionId) -> Result<Vec<u8>, StoreError> {
    let mut key = owner_prefix(owner)?;
    key.extend_from_slice(&id.to_be_bytes());
    Ok(key)
}

fn decode_id(bytes: &[u8]) -> Result<PositionId, StoreError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Corruption(format!("position key of {} bytes", bytes.len())))?;
    Ok(PositionId::from_be_bytes(raw))
}

fn decode_utf8(bytes: &[u8]) -> Result<&str, StoreError> {
    std::str::from_utf8(bytes).map_err(|e| StoreError::Corruption(e.to_string()))
}

pub struct LmdbStakingStore {
    env: LmdbEnvironment,
}

impl LmdbStakingStore {
    pub fn new(env: LmdbEnvironment) -> Self {
        Self { env }
    }
}

impl StakingStore for LmdbStakingStore {
    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let value = self.env.meta_db.get(&txn, key).map_err(LmdbError::from)?;
        Ok(value.map(<[u8]>::to_vec))
    }

    fn get_property(&self, property: &PropertyId) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let value = self
            .env
            .properties_db
            .get(&txn, property.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        Ok(value.map(<[u8]>::to_vec))
    }

    fn iter_properties(&self) -> Result<Vec<(PropertyId, Vec<u8>)>, StoreError> {
        let txn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let mut results = Vec::new();
        let iter = self.env.properties_db.iter(&txn).map_err(LmdbError::from)?;
        for item in iter {
            let (key, val) = item.map_err(LmdbError::from)?;
            let id = PropertyId::parse(decode_utf8(key)?)
                .map_err(|e| StoreError::Corruption(e.to_string()))?;
            results.push((id, val.to_vec()));
        }
        Ok(results)
    }

    fn get_position(&self, id: PositionId) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let value = self
            .env
            .positions_db
            .get(&txn, &id.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(value.map(<[u8]>::to_vec))
    }

    fn iter_positions(&self) -> Result<Vec<(PositionId, Vec<u8>)>, StoreError> {
        let txn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let mut results = Vec::new();
        let iter = self.env.positions_db.iter(&txn).map_err(LmdbError::from)?;
        for item in iter {
            let (key, val) = item.map_err(LmdbError::from)?;
            results.push((decode_id(key)?, val.to_vec()));
        }
        Ok(results)
    }

    fn positions_of_owner(&self, owner: &Address) -> Result<Vec<PositionId>, StoreError> {
        let txn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let prefix = owner_prefix(owner.as_str())?;
        let iter = self
            .env
            .owner_index_db
            .prefix_iter(&txn, &prefix)
            .map_err(LmdbError::from)?;
        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(LmdbError::from)?;
            ids.push(decode_id(&key[prefix.len()..])?);
        }
        Ok(ids)
    }

    fn write(&self, batch: StakingWriteBatch) -> Result<(), StoreError> {
        let op_count = batch.len();
        // Dropping `txn` on an early return aborts every write in the batch.
        let mut txn = self.env.env.write_txn().map_err(LmdbError::from)?;
        for op in batch.into_ops() {
            match op {
                WriteOp::PutMeta { key, value } => {
                    self.env
                        .meta_db
                        .put(&mut txn, &key, &value)
                        .map_err(LmdbError::from)?;
                }
                WriteOp::PutProperty { property, value } => {
                    self.env
                        .properties_db
                        .put(&mut txn, property.as_str().as_bytes(), &value)
                        .map_err(LmdbError::from)?;
                }
                WriteOp::PutPosition { id, owner, value } => {
                    let id_key = id.to_be_bytes();
                    let previous = self
                        .env
                        .position_owner_db
                        .get(&txn, &id_key)
                        .map_err(LmdbError::from)?
                        .map(|bytes| decode_utf8(bytes).map(str::to_owned))
                        .transpose()?;
                    if let Some(previous) = previous.filter(|p| p != owner.as_str()) {
                        self.env
                            .owner_index_db
                            .delete(&mut txn, &owner_key(&previous, id)?)
                            .map_err(LmdbError::from)?;
                    }
                    self.env
                        .owner_index_db
                        .put(&mut txn, &owner_key(owner.as_str(), id)?, &[])
                        .map_err(LmdbError::from)?;
                    self.env
                        .position_owner_db
                        .put(&mut txn, &id_key, owner.as_str().as_bytes())
                        .map_err(LmdbError::from)?;
                    self.env
                        .positions_db
                        .put(&mut txn, &id_key, &value)
                        .map_err(LmdbError::from)?;
                }
            }
        }
        txn.commit().map_err(LmdbError::from)?;
        tracing::debug!(ops = op_count, "committed staking write batch");
        Ok(())
    }
}
