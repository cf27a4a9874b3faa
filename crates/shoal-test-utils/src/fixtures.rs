//! A chained hash map built on shared lists.
//!
//! Mirrors how higher-level structures consume the core: each bucket is
//! a width-2 [`SharedList`] of `(full hash, value)` pairs, and the bucket
//! array doubles and rehashes once the map holds more than two entries
//! per bucket.

use shoal_heap::Heap;
use shoal_list::{ListConfig, ListError, SharedList};

/// Finaliser from MurmurHash3: a bijection on `u32`, so distinct keys
/// keep distinct full hashes.
pub fn hash_key(key: u32) -> u32 {
    let mut h = key;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

pub struct ChainedMap<'h> {
    heap: &'h Heap,
    buckets: Vec<SharedList<'h, u32>>,
    len: usize,
}

impl<'h> ChainedMap<'h> {
    pub fn new(heap: &'h Heap, buckets: usize) -> Result<Self, ListError> {
        Ok(Self {
            heap,
            buckets: Self::empty_buckets(heap, buckets.max(1))?,
            len: 0,
        })
    }

    fn empty_buckets(heap: &'h Heap, count: usize) -> Result<Vec<SharedList<'h, u32>>, ListError> {
        (0..count)
            .map(|_| SharedList::with_config(heap, ListConfig::new(2)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket(&self, hash: u32) -> &SharedList<'h, u32> {
        &self.buckets[hash as usize % self.buckets.len()]
    }

    pub fn insert(&mut self, key: u32, value: u32) -> Result<(), ListError> {
        let hash = hash_key(key);
        let bucket = self.bucket(hash);
        for node in bucket.iter() {
            let node = node?;
            if node.get(0) == hash {
                node.set(1, value);
                return Ok(());
            }
        }
        bucket.insert(&[hash, value])?;
        self.len += 1;
        if self.len > 2 * self.buckets.len() {
            self.rehash(self.buckets.len() * 2)?;
        }
        Ok(())
    }

    pub fn get(&self, key: u32) -> Result<Option<u32>, ListError> {
        let hash = hash_key(key);
        for node in self.bucket(hash).iter() {
            let node = node?;
            if node.get(0) == hash {
                return Ok(Some(node.get(1)));
            }
        }
        Ok(None)
    }

    pub fn remove(&mut self, key: u32) -> Result<bool, ListError> {
        let hash = hash_key(key);
        let removed = self.bucket(hash).delete_value(&[hash])?;
        if removed {
            self.len -= 1;
        }
        Ok(removed)
    }

    fn rehash(&mut self, count: usize) -> Result<(), ListError> {
        let buckets = Self::empty_buckets(self.heap, count)?;
        let old = std::mem::replace(&mut self.buckets, buckets);
        for list in old {
            for row in list.rows()? {
                self.bucket(row[0]).insert(&row)?;
            }
            list.free()?;
        }
        Ok(())
    }

    /// Free every bucket.
    pub fn free(self) -> Result<(), ListError> {
        for list in self.buckets {
            list.free()?;
        }
        Ok(())
    }
}
