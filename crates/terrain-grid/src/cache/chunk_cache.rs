//! Memory-bounded LRU of decoded grid chunks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::types::CacheStats;

/// A chunk of one array: (array id, chunk column, chunk row).
pub type ChunkKey = (u32, usize, usize);

/// Chunk cache shared by every layer of a grid set and across requests.
pub type SharedChunkCache = Arc<Mutex<ChunkCache>>;

/// Decoded chunks, evicted least recently used first once their total size
/// passes the byte budget.
pub struct ChunkCache {
    chunks: LruCache<ChunkKey, Arc<Vec<f32>>>,
    arrays: HashMap<String, u32>,
    budget_bytes: usize,
    used_bytes: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

fn chunk_bytes(chunk: &[f32]) -> usize {
    std::mem::size_of_val(chunk)
}

impl ChunkCache {
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            chunks: LruCache::unbounded(),
            arrays: HashMap::new(),
            budget_bytes,
            used_bytes: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn shared(budget_bytes: usize) -> SharedChunkCache {
        Arc::new(Mutex::new(Self::new(budget_bytes)))
    }

    /// Stable id of an array path. Reopening the same path keeps its id, so
    /// chunks cached before a reopen stay valid.
    pub fn array_id(&mut self, path: &str) -> u32 {
        if let Some(&id) = self.arrays.get(path) {
            return id;
        }
        let id = self.arrays.len() as u32;
        self.arrays.insert(path.to_string(), id);
        id
    }

    pub fn get(&mut self, key: &ChunkKey) -> Option<Arc<Vec<f32>>> {
        match self.chunks.get(key) {
            Some(chunk) => {
                self.hits += 1;
                Some(Arc::clone(chunk))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Cache a chunk, evicting older ones to stay within the budget. A chunk
    /// larger than the whole budget is not kept.
    pub fn insert(&mut self, key: ChunkKey, chunk: Arc<Vec<f32>>) {
        let size = chunk_bytes(&chunk);
        if size > self.budget_bytes {
            return;
        }
        if let Some(previous) = self.chunks.pop(&key) {
            self.used_bytes -= chunk_bytes(&previous);
        }
        while self.used_bytes + size > self.budget_bytes {
            let Some((_, evicted)) = self.chunks.pop_lru() else {
                break;
            };
            self.used_bytes -= chunk_bytes(&evicted);
            self.evictions += 1;
        }
        self.chunks.put(key, chunk);
        self.used_bytes += size;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.chunks.len(),
            memory_bytes: self.used_bytes as u64,
            evictions: self.evictions,
        }
    }
}
