//! Saving and restoring engine state through a [`StakingStore`].

use std::collections::HashMap;
use std::sync::Arc;

use lockup_store::{StakingStore, StakingWriteBatch, StoreError};
use lockup_token::EscrowToken;
use lockup_types::{Address, PositionId, PropertyId};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::AuthenticationGate;
use crate::engine::StakingEngine;
use crate::ledger::{CumulativePriceLedger, GlobalState, PropertyState};
use crate::policy::PolicyOracle;
use crate::position::{Position, PositionStore};
use crate::StakingError;

const GLOBAL_KEY: &[u8] = b"global_state";
const NEXT_POSITION_KEY: &[u8] = b"next_position_id";

fn encode<S: Serialize>(value: &S) -> Result<Vec<u8>, StakingError> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()).into())
}

fn decode<D: DeserializeOwned>(bytes: &[u8]) -> Result<D, StakingError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()).into())
}

impl<T: EscrowToken> StakingEngine<T> {
    /// Write the full ledger and every position as one atomic batch.
    pub fn save_to_store(&self, store: &dyn StakingStore) -> Result<(), StakingError> {
        let mut batch = StakingWriteBatch::new();
        batch.put_meta(GLOBAL_KEY, encode(self.ledger.global())?);
        batch.put_meta(
            NEXT_POSITION_KEY,
            self.positions.next_id().to_be_bytes().to_vec(),
        );
        for (property, state) in self.ledger.properties() {
            batch.put_property(property.clone(), encode(state)?);
        }
        for position in self.positions.iter() {
            batch.put_position(position.id, position.owner.clone(), encode(position)?);
        }
        let ops = batch.len();
        store.write(batch)?;
        tracing::info!(
            ops,
            positions = self.positions.len(),
            total_locked = self.ledger.total_locked(),
            "saved staking state"
        );
        Ok(())
    }

    /// Rebuild an engine from a store. An empty store yields an empty engine.
    pub fn load_from_store(
        store: &dyn StakingStore,
        token: T,
        policy: Arc<dyn PolicyOracle>,
        gate: Arc<dyn AuthenticationGate>,
        escrow: Address,
    ) -> Result<Self, StakingError> {
        let global: GlobalState = match store.get_meta(GLOBAL_KEY)? {
            Some(bytes) => decode(&bytes)?,
            None => GlobalState::default(),
        };
        let next_id = match store.get_meta(NEXT_POSITION_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption(format!("next position id of {} bytes", bytes.len()))
                })?;
                PositionId::from_be_bytes(raw)
            }
            None => PositionId::FIRST,
        };

        let mut properties = HashMap::new();
        for (property, bytes) in store.iter_properties()? {
            let state: PropertyState = decode(&bytes)?;
            properties.insert(property, state);
        }

        let mut positions = Vec::new();
        for (id, bytes) in store.iter_positions()? {
            let position: Position = decode(&bytes)?;
            if position.id != id || position.id >= next_id {
                return Err(StoreError::Corruption(format!(
                    "{} stored under key {id} (next id {next_id})",
                    position.id
                ))
                .into());
            }
            positions.push(position);
        }

        let locked = properties
            .values()
            .try_fold(0u128, |acc, p| acc.checked_add(p.total_locked));
        if locked != Some(global.total_locked) {
            return Err(StoreError::Corruption(format!(
                "property totals {locked:?} do not match global total {}",
                global.total_locked
            ))
            .into());
        }

        let mut by_property: HashMap<&PropertyId, u128> = HashMap::new();
        for position in &positions {
            let sum = by_property.entry(&position.property).or_default();
            *sum = sum.checked_add(position.amount).ok_or_else(|| {
                StoreError::Corruption(format!("positions on {} overflow", position.property))
            })?;
        }
        for (property, state) in &properties {
            let staked = by_property.remove(property).unwrap_or(0);
            if staked != state.total_locked {
                return Err(StoreError::Corruption(format!(
                    "positions on {property} hold {staked}, property records {}",
                    state.total_locked
                ))
                .into());
            }
        }
        if let Some((property, staked)) = by_property.into_iter().find(|(_, staked)| *staked > 0) {
            return Err(StoreError::Corruption(format!(
                "positions hold {staked} on unknown property {property}"
            ))
            .into());
        }

        let mut engine = Self::new(token, policy, gate, escrow);
        engine.ledger = CumulativePriceLedger::from_parts(global, properties);
        engine.positions = PositionStore::from_positions(positions, next_id);
        tracing::info!(
            positions = engine.positions.len(),
            total_locked = engine.ledger.total_locked(),
            "loaded staking state"
        );
        Ok(engine)
    }
}
