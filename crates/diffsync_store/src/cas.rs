//! Compare-and-swap map.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// A concurrent map whose values are replaced atomically by identity.
///
/// Values are stored behind `Arc`. A reader takes a snapshot with [`get`],
/// computes a replacement, and installs it with [`compare_and_swap`], which
/// only succeeds if the slot still holds the exact snapshot that was read.
/// [`update`] packages this read-compute-swap cycle as a retry loop.
///
/// # Thread Safety
///
/// The lock is only held for the duration of a single slot access; the
/// replacement value is always computed outside of it.
///
/// [`get`]: CasMap::get
/// [`compare_and_swap`]: CasMap::compare_and_swap
/// [`update`]: CasMap::update
#[derive(Debug)]
pub struct CasMap<K, V> {
    slots: RwLock<HashMap<K, Arc<V>>>,
}

impl<K, V> Default for CasMap<K, V> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V> CasMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the value for `key`.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.slots.read().get(key).cloned()
    }

    /// Stores `value`, replacing whatever was there.
    pub fn insert(&self, key: K, value: V) -> Option<Arc<V>> {
        self.slots.write().insert(key, Arc::new(value))
    }

    /// Stores `value` only if `key` is vacant.
    ///
    /// Returns the stored value on success, or the value that was already
    /// present.
    pub fn insert_if_absent(&self, key: K, value: V) -> Result<Arc<V>, Arc<V>> {
        let mut slots = self.slots.write();
        if let Some(existing) = slots.get(&key) {
            return Err(Arc::clone(existing));
        }
        let value = Arc::new(value);
        slots.insert(key, Arc::clone(&value));
        Ok(value)
    }

    /// Replaces the value for `key` with `new` if it is still `current`.
    ///
    /// Identity, not equality, decides: a slot that was replaced by an equal
    /// value in the meantime does not match.
    pub fn compare_and_swap(&self, key: &K, current: &Arc<V>, new: V) -> bool {
        let mut slots = self.slots.write();
        match slots.get_mut(key) {
            Some(slot) if Arc::ptr_eq(slot, current) => {
                *slot = Arc::new(new);
                true
            }
            _ => false,
        }
    }

    /// Removes the value for `key` if it is still `current`.
    pub fn compare_and_remove(&self, key: &K, current: &Arc<V>) -> bool {
        let mut slots = self.slots.write();
        match slots.get(key) {
            Some(slot) if Arc::ptr_eq(slot, current) => {
                slots.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Removes the value for `key`.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.slots.write().remove(key)
    }

    /// Applies `f` to the current value until the result is installed.
    ///
    /// `f` receives the current snapshot (`None` for a vacant slot) and
    /// returns the replacement, or `None` to leave the slot untouched. It
    /// may run more than once when other writers interleave.
    ///
    /// Returns true if a replacement was installed.
    pub fn update<F>(&self, key: &K, mut f: F) -> bool
    where
        F: FnMut(Option<&V>) -> Option<V>,
    {
        loop {
            let current = self.get(key);
            let Some(next) = f(current.as_deref()) else {
                return false;
            };
            let installed = match &current {
                Some(current) => self.compare_and_swap(key, current, next),
                None => self.insert_if_absent(key.clone(), next).is_ok(),
            };
            if installed {
                return true;
            }
        }
    }

    /// Returns the keys currently present.
    pub fn keys(&self) -> Vec<K> {
        self.slots.read().keys().cloned().collect()
    }

    /// Returns the number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Returns true if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}
