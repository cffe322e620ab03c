//! Per-variant mutual exclusion for count-then-mutate sequences.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::unit::UnitKey;

/// One mutex per (shop, product, variant).
///
/// The guarded data is `()`, so a poisoned lock carries no broken state and is
/// simply recovered. Entries are never evicted.
#[derive(Debug, Default)]
pub struct VariantLocks {
    locks: Mutex<HashMap<UnitKey, Arc<Mutex<()>>>>,
}

impl VariantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`. Not reentrant.
    pub fn with_variant<T>(&self, key: UnitKey, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of variants that have been locked at least once.
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn lock_for(&self, key: UnitKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }
}
