use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use weft_common::{AddressKey, CoordinatePair};

/// Session-scoped store of previously resolved coordinates, keyed by
/// normalized address. No eviction: entries are small and addresses do not
/// move. Safe under interleaved progressive batches because keys are
/// content-derived, so overwrites are idempotent.
#[derive(Clone, Default)]
pub struct LocationCache {
    inner: Arc<Mutex<HashMap<AddressKey, CoordinatePair>>>,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &AddressKey) -> Option<CoordinatePair> {
        self.inner.lock().expect("location cache poisoned").get(key).copied()
    }

    pub fn put(&self, key: AddressKey, coords: CoordinatePair) {
        self.inner
            .lock()
            .expect("location cache poisoned")
            .insert(key, coords);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("location cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
