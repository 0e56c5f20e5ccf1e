//! Nullable authentication gate with one global switch.

use lockup_staking::AuthenticationGate;
use lockup_types::PropertyId;
use std::sync::atomic::{AtomicBool, Ordering};

/// Authenticates every property, or none, depending on its switch.
pub struct NullGate {
    open: AtomicBool,
}

impl NullGate {
    pub fn allow_all() -> Self {
        Self {
            open: AtomicBool::new(true),
        }
    }

    pub fn deny_all() -> Self {
        Self {
            open: AtomicBool::new(false),
        }
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }
}

impl AuthenticationGate for NullGate {
    fn is_authenticated(&self, _property: &PropertyId) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
