//! Property authentication.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use lockup_types::PropertyId;

/// Answers whether a property may currently receive stake and reward. The
/// answer can flip at any time between operations.
pub trait AuthenticationGate: Send + Sync {
    fn is_authenticated(&self, property: &PropertyId) -> bool;
}

/// An in-memory set of authenticated properties.
#[derive(Debug, Default)]
pub struct PropertyRegistry {
    authenticated: RwLock<HashSet<PropertyId>>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties<I>(properties: I) -> Self
    where
        I: IntoIterator<Item = PropertyId>,
    {
        Self {
            authenticated: RwLock::new(properties.into_iter().collect()),
        }
    }

    /// Returns `true` if the property was not already authenticated.
    pub fn authenticate(&self, property: PropertyId) -> bool {
        tracing::info!(property = %property, "property authenticated");
        self.authenticated
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(property)
    }

    /// Returns `true` if the property was authenticated.
    pub fn revoke(&self, property: &PropertyId) -> bool {
        tracing::info!(property = %property, "property authentication revoked");
        self.authenticated
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(property)
    }

    pub fn len(&self) -> usize {
        self.authenticated
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuthenticationGate for PropertyRegistry {
    fn is_authenticated(&self, property: &PropertyId) -> bool {
        self.authenticated
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(property)
    }
}
