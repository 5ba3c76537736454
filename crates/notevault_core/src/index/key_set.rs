//! Value → key-set mapping used by every emulated index.

use std::collections::{BTreeMap, BTreeSet};

/// Ordered multimap from one attribute value to record keys.
#[derive(Debug, Clone)]
pub struct KeySetIndex<V: Ord> {
    entries: BTreeMap<V, BTreeSet<String>>,
}

impl<V: Ord> Default for KeySetIndex<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V: Ord + Clone> KeySetIndex<V> {
    pub fn insert(&mut self, value: V, key: &str) {
        self.entries
            .entry(value)
            .or_default()
            .insert(key.to_string());
    }

    /// Removes `key` under `value`; empty buckets are dropped.
    pub fn remove(&mut self, value: &V, key: &str) {
        if let Some(keys) = self.entries.get_mut(value) {
            keys.remove(key);
            if keys.is_empty() {
                self.entries.remove(value);
            }
        }
    }

    /// Union of the key sets of every listed value.
    pub fn keys_for_any<'a>(&self, values: impl IntoIterator<Item = &'a V>) -> BTreeSet<String>
    where
        V: 'a,
    {
        let mut union = BTreeSet::new();
        for value in values {
            if let Some(keys) = self.entries.get(value) {
                union.extend(keys.iter().cloned());
            }
        }
        union
    }
}

#[cfg(test)]
mod tests {
    use super::KeySetIndex;

    #[test]
    fn remove_drops_empty_buckets() {
        let mut index = KeySetIndex::default();
        index.insert(true, "a");
        index.insert(true, "b");
        index.remove(&true, "a");
        assert_eq!(index.keys_for_any([true].iter()).len(), 1);
        index.remove(&true, "b");
        assert!(index.entries.is_empty());
        assert!(index.keys_for_any([true].iter()).is_empty());
    }

    #[test]
    fn keys_for_any_unions_buckets() {
        let mut index = KeySetIndex::default();
        index.insert(1_i64, "a");
        index.insert(2_i64, "b");
        index.insert(3_i64, "c");
        let keys = index.keys_for_any([1_i64, 3].iter());
        assert_eq!(keys.len(), 2);
    }
}
