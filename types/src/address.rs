//! Account addresses and property identifiers.

use crate::error::LockupError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest address or property id, in bytes. Both are used as LMDB keys,
/// which are capped at 511 bytes.
pub const MAX_ID_LEN: usize = 255;

fn is_well_formed(raw: &str) -> bool {
    !raw.is_empty() && raw.len() <= MAX_ID_LEN && !raw.chars().any(char::is_whitespace)
}

/// An account that can hold tokens and own positions.
///
/// Addresses are opaque strings: the ledger only compares them for equality
/// and uses them as map keys.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create a new address from a raw string.
    ///
    /// # Panics
    /// Panics if the string is empty, longer than [`MAX_ID_LEN`] bytes or
    /// contains whitespace. Use [`Address::parse`] for untrusted input.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(is_well_formed(&s), "address must be non-empty, at most {MAX_ID_LEN} bytes, without whitespace");
        Self(s)
    }

    /// Parse an address, rejecting malformed input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, LockupError> {
        let s = raw.into();
        if is_well_formed(&s) {
            Ok(Self(s))
        } else {
            Err(LockupError::InvalidAddress(s))
        }
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A stake target. Properties earn a share of minted reward proportional to
/// the amount locked against them, provided they are authenticated.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyId(String);

impl PropertyId {
    /// # Panics
    /// Panics on the same input [`Address::new`] rejects.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(is_well_formed(&s), "property id must be non-empty, at most {MAX_ID_LEN} bytes, without whitespace");
        Self(s)
    }

    pub fn parse(raw: impl Into<String>) -> Result<Self, LockupError> {
        let s = raw.into();
        if is_well_formed(&s) {
            Ok(Self(s))
        } else {
            Err(LockupError::InvalidProperty(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PropertyId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
