//! A map from keys to sets of values

use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;

/// A map where each key is associated with a set of values.
///
/// Absent keys behave as empty sets; a key stays registered until
/// [`MultiMap::remove_key`] drops it together with its values.
#[derive(Debug, Clone)]
pub struct MultiMap<K, V> {
    map: FxHashMap<K, FxHashSet<V>>,
}

impl<K: Eq + Hash, V: Eq + Hash> PartialEq for MultiMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl<K: Eq + Hash, V: Eq + Hash> Eq for MultiMap<K, V> {}

impl<K, V> Default for MultiMap<K, V> {
    fn default() -> Self {
        Self {
            map: FxHashMap::default(),
        }
    }
}

impl<K: Eq + Hash, V: Eq + Hash> MultiMap<K, V> {
    /// Create an empty multimap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key with no values (a no-op if present).
    pub fn add_key(&mut self, key: K) {
        self.map.entry(key).or_default();
    }

    /// Add a value under a key. Returns true if the value was new.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.map.entry(key).or_default().insert(value)
    }

    /// Remove a key and all of its values.
    pub fn remove_key(&mut self, key: &K) -> Option<FxHashSet<V>> {
        self.map.remove(key)
    }

    /// The value set under a key, if the key is registered.
    pub fn get(&self, key: &K) -> Option<&FxHashSet<V>> {
        self.map.get(key)
    }

    /// Iterate the values under a key (empty for absent keys).
    pub fn values_of<'a>(&'a self, key: &K) -> impl Iterator<Item = &'a V> {
        self.map.get(key).into_iter().flatten()
    }

    /// Whether a key is registered.
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Iterate registered keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.map.keys()
    }

    /// Iterate `(key, value-set)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &FxHashSet<V>)> {
        self.map.iter()
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no key is registered.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_query() {
        let mut map: MultiMap<&str, u32> = MultiMap::new();
        assert!(map.insert("a", 1));
        assert!(map.insert("a", 2));
        assert!(!map.insert("a", 1));

        assert_eq!(map.values_of(&"a").count(), 2);
        assert_eq!(map.values_of(&"b").count(), 0);
    }

    #[test]
    fn test_remove_key() {
        let mut map: MultiMap<&str, u32> = MultiMap::new();
        map.add_key("a");
        assert!(map.contains_key(&"a"));
        assert_eq!(map.values_of(&"a").count(), 0);

        map.insert("a", 1);
        let removed = map.remove_key(&"a").unwrap();
        assert!(removed.contains(&1));
        assert!(!map.contains_key(&"a"));
    }

    #[test]
    fn test_equality() {
        let mut left: MultiMap<&str, u32> = MultiMap::new();
        let mut right: MultiMap<&str, u32> = MultiMap::new();
        left.insert("a", 1);
        right.insert("a", 1);
        assert_eq!(left, right);

        right.insert("a", 2);
        assert_ne!(left, right);
    }
}
