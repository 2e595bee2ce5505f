use std::collections::HashSet;

use super::song::SongId;

/// Bucket count used when none is configured.
pub const DEFAULT_BUCKETS: usize = 50;

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    id: SongId,
}

/// Fixed-size chained hash table mapping string keys to many songs.
///
/// Each bucket is a list of `(key, id)` pairs scanned linearly. A pair is
/// stored at most once; one song can sit under any number of keys. The table
/// never resizes.
#[derive(Debug, Clone)]
pub struct MultiKeyIndex {
    buckets: Vec<Vec<Entry>>,
}

impl MultiKeyIndex {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    pub fn with_buckets(count: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); count.max(1)],
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Polynomial rolling hash (`h * 31 + unit` over UTF-16 code units,
    /// wrapping at 32 bits), folded into the table by absolute value.
    pub fn hash(&self, key: &str) -> usize {
        let mut h: i32 = 0;
        for unit in key.encode_utf16() {
            h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit));
        }
        (h.unsigned_abs() as usize) % self.buckets.len()
    }

    /// Associate `id` with `key`. An existing pair keeps its bucket position.
    pub fn set(&mut self, key: &str, id: SongId) {
        let slot = self.hash(key);
        let bucket = &mut self.buckets[slot];
        if !bucket.iter().any(|e| e.key == key && e.id == id) {
            bucket.push(Entry {
                key: key.to_string(),
                id,
            });
        }
    }

    /// All songs under `key`, in the order they were first set.
    pub fn get(&self, key: &str) -> Vec<SongId> {
        self.buckets[self.hash(key)]
            .iter()
            .filter(|e| e.key == key)
            .map(|e| e.id)
            .collect()
    }

    pub fn contains(&self, key: &str, id: SongId) -> bool {
        self.buckets[self.hash(key)]
            .iter()
            .any(|e| e.key == key && e.id == id)
    }

    /// Drop the `(key, id)` pair. Returns whether it was present.
    pub fn remove(&mut self, key: &str, id: SongId) -> bool {
        let slot = self.hash(key);
        let bucket = &mut self.buckets[slot];
        let before = bucket.len();
        bucket.retain(|e| !(e.key == key && e.id == id));
        bucket.len() != before
    }

    /// Drop every pair under `key`. Returns how many were removed.
    pub fn clear_key(&mut self, key: &str) -> usize {
        let slot = self.hash(key);
        let bucket = &mut self.buckets[slot];
        let before = bucket.len();
        bucket.retain(|e| e.key != key);
        before - bucket.len()
    }

    /// Every distinct song in the table, in first-seen bucket-scan order.
    pub fn all_unique(&self) -> Vec<SongId> {
        let mut seen = HashSet::new();
        self.buckets
            .iter()
            .flatten()
            .filter(|e| seen.insert(e.id))
            .map(|e| e.id)
            .collect()
    }
}

impl Default for MultiKeyIndex {
    fn default() -> Self {
        Self::new()
    }
}
