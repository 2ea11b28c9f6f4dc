//! Reverse multimap: a map with O(1) random key retrieval by value
//!
//! Keeps `key -> tag` alongside its exact inverse `tag -> [keys]`. The key
//! lists are plain vectors because random retrieval needs indexable storage;
//! removal stays O(1) through swap-removal plus a position index updated in
//! lock-step. Every tag bucket is non-empty by construction: the last key to
//! leave a bucket deletes it.

use crate::io::error::{KmcError, Result};
use rand::Rng;
use std::collections::HashMap;
use std::hash::Hash;

/// Many-to-one association with O(1) insert, delete and random key retrieval
#[derive(Debug, Clone)]
pub struct ReverseMultimap<K, T> {
    /// key -> tag
    values: HashMap<K, T>,
    /// tag -> keys carrying it, in insertion-then-swap order
    keys: HashMap<T, Vec<K>>,
    /// key -> its position inside its tag's key list
    index: HashMap<K, usize>,
}

impl<K, T> Default for ReverseMultimap<K, T> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            keys: HashMap::new(),
            index: HashMap::new(),
        }
    }
}

impl<K, T> ReverseMultimap<K, T>
where
    K: Clone + Eq + Hash,
    T: Clone + Eq + Hash,
{
    /// Create an empty multimap
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no keys are present
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove all associations
    pub fn clear(&mut self) {
        self.values.clear();
        self.keys.clear();
        self.index.clear();
    }

    /// Tag currently associated with a key
    pub fn get(&self, key: &K) -> Option<&T> {
        self.values.get(key)
    }

    /// Whether the key is present
    pub fn contains(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    /// Keys currently carrying a tag; empty when the tag is absent
    pub fn keys_of(&self, tag: &T) -> &[K] {
        self.keys.get(tag).map_or(&[], Vec::as_slice)
    }

    /// Iterate over `(key, tag)` pairs in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &T)> {
        self.values.iter()
    }

    /// Associate a key with a tag, replacing any prior association
    pub fn set(&mut self, key: K, tag: T) {
        if self.values.contains_key(&key) {
            self.delete_key(&key);
        }
        let list = self.keys.entry(tag.clone()).or_default();
        self.index.insert(key.clone(), list.len());
        list.push(key.clone());
        self.values.insert(key, tag);
    }

    /// Remove a key and return its tag
    ///
    /// # Errors
    ///
    /// Fails when the key is absent.
    pub fn remove(&mut self, key: &K) -> Result<T> {
        if !self.values.contains_key(key) {
            return Err(KmcError::NotFound { entity: "key" });
        }
        Ok(self.delete_key(key))
    }

    /// O(1) retrieval of a uniformly random key carrying a tag
    ///
    /// # Errors
    ///
    /// Fails when no key carries the tag.
    pub fn get_random<R: Rng>(&self, tag: &T, rng: &mut R) -> Result<&K> {
        let list = self
            .keys
            .get(tag)
            .ok_or(KmcError::NotFound { entity: "tag" })?;
        Ok(&list[rng.random_range(0..list.len())])
    }

    /// O(1) retrieval and removal of a uniformly random key carrying a tag
    ///
    /// # Errors
    ///
    /// Fails when no key carries the tag.
    pub fn pop_random<R: Rng>(&mut self, tag: &T, rng: &mut R) -> Result<K> {
        let key = self.get_random(tag, rng)?.clone();
        self.delete_key(&key);
        Ok(key)
    }

    /// Occurrences of each tag; O(distinct tags), not O(keys)
    pub fn count_by_tag(&self) -> impl Iterator<Item = (&T, usize)> {
        self.keys.iter().map(|(tag, list)| (tag, list.len()))
    }

    /// Recompute and check every redundant structure
    ///
    /// Verifies that no key list contains duplicates, that the position
    /// index matches list positions exactly, that no tag maps to an empty
    /// list, and that the forward and reverse maps agree. Test and debug
    /// paths only; never called on the hot path.
    ///
    /// # Errors
    ///
    /// Returns an integrity error describing the first violation found.
    pub fn validate_integrity(&self) -> Result<()> {
        let mut seen = 0usize;
        for (tag, list) in &self.keys {
            if list.is_empty() {
                return Err(KmcError::Integrity {
                    reason: "empty key list not deleted".to_string(),
                });
            }
            for (pos, key) in list.iter().enumerate() {
                if self.values.get(key) != Some(tag) {
                    return Err(KmcError::Integrity {
                        reason: "key list entry disagrees with forward map".to_string(),
                    });
                }
                if self.index.get(key) != Some(&pos) {
                    return Err(KmcError::Integrity {
                        reason: format!("position index mismatch at list offset {pos}"),
                    });
                }
            }
            seen += list.len();
        }
        // Forward-map agreement above rules out duplicates unless counts differ
        if seen != self.values.len() || self.index.len() != self.values.len() {
            return Err(KmcError::Integrity {
                reason: format!(
                    "size mismatch: {} listed, {} mapped, {} indexed",
                    seen,
                    self.values.len(),
                    self.index.len()
                ),
            });
        }
        Ok(())
    }

    // Remove a key and all associated bookkeeping. The key list is updated
    // by swap-removal; at most one element is displaced, whose index entry
    // must be rewritten before the removed key's entry is dropped.
    fn delete_key(&mut self, key: &K) -> T {
        let tag = self.values.remove(key).unwrap_or_else(|| {
            panic!("delete_key on absent key");
        });
        let pos = self.index.remove(key).unwrap_or_else(|| {
            panic!("position index out of step with forward map");
        });
        let list = self.keys.get_mut(&tag).unwrap_or_else(|| {
            panic!("tag bucket out of step with forward map");
        });

        list.swap_remove(pos);
        if let Some(displaced) = list.get(pos) {
            self.index.insert(displaced.clone(), pos);
        }
        if list.is_empty() {
            self.keys.remove(&tag);
        }
        tag
    }
}
