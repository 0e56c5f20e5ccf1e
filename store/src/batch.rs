//! Backend-independent write batches.

use lockup_types::{Address, PositionId, PropertyId};

/// One pending write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    PutMeta { key: Vec<u8>, value: Vec<u8> },
    PutProperty { property: PropertyId, value: Vec<u8> },
    /// Store a position and (re)index it under `owner`, dropping any index
    /// entry for a previous owner.
    PutPosition { id: PositionId, owner: Address, value: Vec<u8> },
}

/// An ordered group of writes committed in a single transaction.
#[derive(Clone, Debug, Default)]
pub struct StakingWriteBatch {
    ops: Vec<WriteOp>,
}

impl StakingWriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_meta(&mut self, key: &[u8], value: Vec<u8>) {
        self.ops.push(WriteOp::PutMeta {
            key: key.to_vec(),
            value,
        });
    }

    pub fn put_property(&mut self, property: PropertyId, value: Vec<u8>) {
        self.ops.push(WriteOp::PutProperty { property, value });
    }

    pub fn put_position(&mut self, id: PositionId, owner: Address, value: Vec<u8>) {
        self.ops.push(WriteOp::PutPosition { id, owner, value });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
