//! Staking configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lockup_store::StoreError;
use lockup_store_lmdb::{LmdbEnvironment, LmdbStakingStore};
use lockup_types::{Address, SCALE};
use lockup_utils::LogFormat;

use crate::policy::{FlatPolicy, PolicyOracle, SupplyCurvePolicy};
use crate::StakingError;

/// 100% in basis points.
const FULL_SHARE_BPS: u32 = 10_000;

/// Which reward policy the engine starts with.
///
/// Amounts are written as decimal strings in TOML, since TOML integers stop
/// at `i64::MAX` and a single 18-decimal token already exceeds that at 10.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    Flat {
        #[serde(with = "amount")]
        reward_per_block: u128,
        #[serde(default = "default_share_bps")]
        staker_share_bps: u32,
    },
    SupplyCurve {
        #[serde(with = "amount")]
        max_reward_per_block: u128,
        #[serde(default = "default_share_bps")]
        staker_share_bps: u32,
    },
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::Flat {
            reward_per_block: SCALE,
            staker_share_bps: default_share_bps(),
        }
    }
}

/// Configuration for a staking engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Account that holds staked principal.
    #[serde(default = "default_escrow")]
    pub escrow: String,

    /// Data directory for the LMDB store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter, e.g. "info" or "debug,lockup_staking=trace".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub policy: PolicyConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_escrow() -> String {
    "lockup_escrow".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./lockup_data")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_share_bps() -> u32 {
    FULL_SHARE_BPS
}

/// `u128` as a decimal string; plain TOML integers are accepted on input.
mod amount {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative integer or decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
            Ok(u128::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
            u128::try_from(v).map_err(|_| E::custom(format!("negative amount {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
            v.trim()
                .replace('_', "")
                .parse()
                .map_err(|_| E::custom(format!("invalid amount {v:?}")))
        }
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl StakingConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, StakingError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| StakingError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, StakingError> {
        toml::from_str(s).map_err(|e| StakingError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("StakingConfig is always serializable to TOML")
    }

    pub fn escrow_address(&self) -> Result<Address, StakingError> {
        Address::parse(self.escrow.clone()).map_err(|e| StakingError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> Result<LogFormat, StakingError> {
        self.log_format.parse().map_err(StakingError::Config)
    }

    /// Install the global subscriber described by this config. Returns
    /// `false` if one was already installed.
    pub fn init_logging(&self) -> Result<bool, StakingError> {
        Ok(lockup_utils::try_init_logging(self.log_format()?, &self.log_level))
    }

    /// Open (or create) the LMDB store under `data_dir`.
    pub fn open_store(&self) -> Result<LmdbStakingStore, StakingError> {
        let env = LmdbEnvironment::open(&self.data_dir, LmdbEnvironment::DEFAULT_MAP_SIZE)
            .map_err(StoreError::from)?;
        Ok(LmdbStakingStore::new(env))
    }

    /// Instantiate the configured reward policy.
    pub fn build_policy(&self) -> Result<Arc<dyn PolicyOracle>, StakingError> {
        let policy: Arc<dyn PolicyOracle> = match &self.policy {
            PolicyConfig::Flat {
                reward_per_block,
                staker_share_bps,
            } => Arc::new(FlatPolicy::new(*reward_per_block, share(*staker_share_bps)?)),
            PolicyConfig::SupplyCurve {
                max_reward_per_block,
                staker_share_bps,
            } => Arc::new(SupplyCurvePolicy::new(
                *max_reward_per_block,
                share(*staker_share_bps)?,
            )),
        };
        Ok(policy)
    }
}

/// Basis points to a SCALE-denominated fraction.
fn share(bps: u32) -> Result<u128, StakingError> {
    if bps > FULL_SHARE_BPS {
        return Err(StakingError::Config(format!(
            "staker share of {bps} bps exceeds {FULL_SHARE_BPS}"
        )));
    }
    Ok(u128::from(bps) * SCALE / u128::from(FULL_SHARE_BPS))
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            escrow: default_escrow(),
            data_dir: default_data_dir(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            policy: PolicyConfig::default(),
        }
    }
}
