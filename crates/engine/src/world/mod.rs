pub mod block;
pub mod chunk;
pub mod position;
pub mod region;

use block::BlockId;
use chunk::Chunk;
use dashmap::DashMap;
use position::{BlockPos, ChunkPos};

/// Size of a world along each axis. Valid coordinates are `0..width`,
/// `0..height` and `0..length` on x, y and z respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    pub length: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32, length: u32) -> Self {
        Self { width, height, length }
    }

    pub const fn contains(&self, pos: BlockPos) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.z >= 0
            && (pos.x as u32) < self.width
            && (pos.y as u32) < self.height
            && (pos.z as u32) < self.length
    }
}

/// A fixed-size block world. Thread-safe, lock-sharded by chunk column.
///
/// Writes from many sessions land here concurrently; `DashMap`'s per-shard
/// locking is what serialises two writers hitting the same column.
pub struct World {
    dims: Dimensions,
    chunks: DashMap<ChunkPos, Chunk>,
}

impl World {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            chunks: DashMap::new(),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.dims.contains(pos)
    }

    /// Read a block. `None` outside the world's bounds; AIR for cells that
    /// were never written.
    pub fn get_block(&self, pos: BlockPos) -> Option<BlockId> {
        if !self.dims.contains(pos) {
            return None;
        }
        Some(match self.chunks.get(&pos.chunk()) {
            Some(chunk) => chunk.get_block(pos.local()),
            None => BlockId::AIR,
        })
    }

    /// Write a block. Returns `false` (and writes nothing) outside the bounds.
    ///
    /// Takes `&self` because `DashMap` provides interior mutability via
    /// per-shard locking.
    pub fn set_block(&self, pos: BlockPos, block: BlockId) -> bool {
        if !self.dims.contains(pos) {
            return false;
        }
        let chunk_pos = pos.chunk();
        if block.is_air() {
            // Writing air into a column that was never allocated is a no-op.
            if let Some(mut chunk) = self.chunks.get_mut(&chunk_pos) {
                chunk.set_block(pos.local(), block);
            }
        } else {
            self.chunks
                .entry(chunk_pos)
                .or_default()
                .set_block(pos.local(), block);
        }
        true
    }

    /// Fill every cell with `y` in `ys` with `block`. Used to lay down simple
    /// test and demo terrain.
    pub fn fill_layers(&self, ys: std::ops::RangeInclusive<i32>, block: BlockId) {
        tracing::debug!("Filling layers {:?} with block {}", ys, block.0);
        for y in ys {
            for x in 0..self.dims.width as i32 {
                for z in 0..self.dims.length as i32 {
                    self.set_block(BlockPos::new(x, y, z), block);
                }
            }
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}
