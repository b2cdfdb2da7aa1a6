//! Cache implementations for terrain grid access.

mod chunk_cache;

pub use chunk_cache::{ChunkCache, ChunkKey, SharedChunkCache};
