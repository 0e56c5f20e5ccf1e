//! Fixed-point helpers for cumulative prices.
//!
//! A `Price` is reward-per-unit-locked scaled by [`SCALE`] (10^18) and held in
//! a 256-bit integer, so `reward × SCALE` never overflows for any `u128`
//! reward and the accumulator can grow for the lifetime of the ledger.
//!
//! Every division truncates toward zero. Settlement therefore never pays out
//! more than was minted; the dust stays with the protocol.

use ethnum::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Fixed-point scale: 10^18 represents 1.0.
pub const SCALE: u128 = 1_000_000_000_000_000_000;

const SCALE_256: U256 = U256::new(SCALE);

/// `a × b / d` in 256-bit arithmetic, truncating. `None` on overflow or `d == 0`.
pub fn mul_div(a: U256, b: U256, d: U256) -> Option<U256> {
    if d == U256::ZERO {
        return None;
    }
    a.checked_mul(b).map(|p| p / d)
}

/// Narrow a 256-bit value back to `u128`, `None` if it does not fit.
pub fn to_u128(value: U256) -> Option<u128> {
    let (high, low) = value.into_words();
    if high == 0 {
        Some(low)
    } else {
        None
    }
}

/// `value × fraction / SCALE` where `fraction` is itself scaled by [`SCALE`].
pub fn apply_fraction(value: u128, fraction: u128) -> Option<u128> {
    mul_div(U256::new(value), U256::new(fraction), SCALE_256).and_then(to_u128)
}

/// A monotonic cumulative price (reward per locked unit, scaled by [`SCALE`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Price(U256);

impl Price {
    pub const ZERO: Self = Self(U256::ZERO);

    pub fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == U256::ZERO
    }

    /// Price increment for distributing `reward` over `units` locked units:
    /// `reward × SCALE / units`. Zero when nothing is locked.
    pub fn per_unit(reward: u128, units: u128) -> Self {
        if units == 0 {
            return Self::ZERO;
        }
        // u128 × 10^18 always fits in 256 bits.
        Self(U256::new(reward) * SCALE_256 / U256::new(units))
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// The price accumulated since `earlier`. Prices never decrease, so a
    /// stale snapshot above the current price yields zero.
    pub fn delta_since(self, earlier: Self) -> Self {
        if self.0 > earlier.0 {
            Self(self.0 - earlier.0)
        } else {
            Self::ZERO
        }
    }

    /// Reward owed to `amount` units at this price: `price × amount / SCALE`.
    pub fn reward_for(self, amount: u128) -> Option<u128> {
        mul_div(self.0, U256::new(amount), SCALE_256).and_then(to_u128)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(U256::from_be_bytes(bytes))
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_be_bytes().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = <[u8; 32]>::deserialize(deserializer)?;
        Ok(Self::from_be_bytes(bytes))
    }
}
