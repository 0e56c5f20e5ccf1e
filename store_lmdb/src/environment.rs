//! LMDB environment setup.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::LmdbError;

/// The schema version that the current code writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const SCHEMA_KEY: &[u8] = b"schema_version";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    pub(crate) env: Env,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    pub(crate) properties_db: Database<Bytes, Bytes>,
    pub(crate) positions_db: Database<Bytes, Bytes>,
    /// position id → current owner, so re-indexing can drop the old entry.
    pub(crate) position_owner_db: Database<Bytes, Bytes>,
    /// (owner, id) composite key → empty value.
    pub(crate) owner_index_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Default map size: 1 GiB.
    pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

    /// Open or create an LMDB environment at the given directory.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per directory by this process
        // and never concurrently mapped by another `Env` with different flags.
        let env = unsafe { EnvOpenOptions::new().map_size(map_size).max_dbs(8).open(path)? };

        let mut wtxn = env.write_txn()?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        let properties_db = env.create_database(&mut wtxn, Some("properties"))?;
        let positions_db = env.create_database(&mut wtxn, Some("positions"))?;
        let position_owner_db = env.create_database(&mut wtxn, Some("position_owner"))?;
        let owner_index_db = env.create_database(&mut wtxn, Some("owner_index"))?;
        wtxn.commit()?;

        let lmdb = Self {
            env,
            meta_db,
            properties_db,
            positions_db,
            position_owner_db,
            owner_index_db,
        };
        lmdb.check_schema()?;
        tracing::info!(path = %path.display(), "opened LMDB staking store");
        Ok(lmdb)
    }

    /// Stamp a fresh database with the current schema version, refuse one
    /// written by newer code.
    fn check_schema(&self) -> Result<(), LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        let stored = self
            .meta_db
            .get(&wtxn, SCHEMA_KEY)?
            .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
            .map(u32::from_be_bytes)
            .unwrap_or(0);

        if stored > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::UnsupportedSchema {
                found: stored,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if stored < CURRENT_SCHEMA_VERSION {
            tracing::info!(from = stored, to = CURRENT_SCHEMA_VERSION, "stamping schema version");
            self.meta_db
                .put(&mut wtxn, SCHEMA_KEY, &CURRENT_SCHEMA_VERSION.to_be_bytes())?;
        }
        wtxn.commit()?;
        Ok(())
    }

    pub fn env(&self) -> &Env {
        &self.env
    }
}
