use crate::{StakingWriteBatch, StoreError};
use lockup_types::{Address, PositionId, PropertyId};

/// Store trait for persisting staking-engine state to durable storage.
///
/// Values are opaque `Vec<u8>` so the store doesn't depend on the
/// `lockup-staking` crate; the engine serializes its own types.
///
/// Layout:
/// - meta: singletons (global ledger state, next position id)
/// - properties: property state keyed by property id
/// - positions: position record keyed by id
/// - owner index: owner → ids, maintained by the store from `PutPosition`
pub trait StakingStore {
    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn get_property(&self, property: &PropertyId) -> Result<Option<Vec<u8>>, StoreError>;
    fn iter_properties(&self) -> Result<Vec<(PropertyId, Vec<u8>)>, StoreError>;

    fn get_position(&self, id: PositionId) -> Result<Option<Vec<u8>>, StoreError>;
    fn iter_positions(&self) -> Result<Vec<(PositionId, Vec<u8>)>, StoreError>;

    /// Ids of every position currently owned by `owner`, ascending.
    fn positions_of_owner(&self, owner: &Address) -> Result<Vec<PositionId>, StoreError>;

    /// Apply every operation in `batch` atomically: either all become
    /// visible or none do.
    fn write(&self, batch: StakingWriteBatch) -> Result<(), StoreError>;
}
