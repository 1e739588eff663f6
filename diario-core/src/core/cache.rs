//! In-memory mirror of decoded entries, keyed by id.
//!
//! The cache is never authoritative; the store is. A [`Journal`](super::journal::Journal)
//! owns exactly one cache and keeps it coherent on every read and write.

use std::collections::HashMap;

use crate::Entry;

#[derive(Debug, Default)]
pub struct EntryCache {
    entries: HashMap<String, Entry>,
}

impl EntryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Entry> {
        self.entries.get(id).cloned()
    }

    /// Stores `entry` under its own id, replacing any previous copy.
    pub fn put(&mut self, entry: Entry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Drops the cached copy of `id`. Returns `true` if one was present.
    pub fn evict(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntryDraft;

    #[test]
    fn test_put_get_evict() {
        let mut cache = EntryCache::new();
        let entry = Entry::new(EntryDraft::new("t", "c"));
        let id = entry.id.clone();

        assert!(cache.get(&id).is_none());
        cache.put(entry.clone());
        assert_eq!(cache.get(&id), Some(entry));
        assert!(cache.evict(&id));
        assert!(!cache.evict(&id));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_replaces_existing_copy() {
        let mut cache = EntryCache::new();
        let mut entry = Entry::new(EntryDraft::new("old", ""));
        cache.put(entry.clone());
        entry.title = "new".to_string();
        cache.put(entry.clone());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&entry.id).unwrap().title, "new");
    }

    #[test]
    fn test_caches_are_independent() {
        let mut a = EntryCache::new();
        let b = EntryCache::new();
        let entry = Entry::new(EntryDraft::default());
        a.put(entry.clone());
        assert!(a.contains(&entry.id));
        assert!(!b.contains(&entry.id));
        a.clear();
        assert!(a.is_empty());
    }
}
