//! The block mutation queue: the single synchronisation point between many
//! sessions and one shared world.
//!
//! Mutations are accepted without blocking and land in an insertion-ordered
//! pending map. Reads see pending values first, so a session always observes
//! its own writes immediately, while other sessions' clients learn about them
//! when the queue is flushed and the batch goes out on the event bus.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use blockforge_engine::world::World;
use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::position::BlockPos;
use indexmap::IndexMap;
use tokio::sync::broadcast;

use crate::event_bus::WorldChangeBatch;

/// The grid as seen by the editing core.
pub trait Grid: Send + Sync {
    /// Current block, including queued-but-unflushed writes. `None` off-grid.
    fn get_block(&self, pos: BlockPos) -> Option<BlockId>;

    /// Request a write. Never blocks; applied eventually, in order per cell.
    fn queue_mutation(&self, pos: BlockPos, block: BlockId);

    fn in_bounds(&self, pos: BlockPos) -> bool;
}

/// [`Grid`] implementation backed by a [`World`].
pub struct BlockQueue {
    level: Arc<str>,
    world: Arc<World>,
    pending: Mutex<IndexMap<BlockPos, BlockId>>,
    bus: broadcast::Sender<WorldChangeBatch>,
}

impl BlockQueue {
    pub fn new(level: impl Into<Arc<str>>, world: Arc<World>, bus: broadcast::Sender<WorldChangeBatch>) -> Self {
        Self {
            level: level.into(),
            world,
            pending: Mutex::new(IndexMap::new()),
            bus,
        }
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("block queue poisoned").len()
    }

    /// Apply every pending write to the world and publish them as one batch.
    /// Returns the number of cells written.
    pub fn flush(&self) -> usize {
        // The world is written while the pending lock is held, so a reader
        // never finds a cell missing from both the overlay and the world.
        let changes = {
            let mut pending = self.pending.lock().expect("block queue poisoned");
            if pending.is_empty() {
                return 0;
            }
            let mut changes = Vec::with_capacity(pending.len());
            for (pos, block) in pending.drain(..) {
                if self.world.set_block(pos, block) {
                    changes.push((pos, block));
                }
            }
            changes
        };
        let applied = changes.len();
        // No subscribers is fine; nobody needs to hear about it.
        let _ = self.bus.send(WorldChangeBatch {
            level: Arc::clone(&self.level),
            changes: changes.into(),
        });
        tracing::debug!("Flushed {} block changes in {}", applied, self.level);
        applied
    }

    /// Flush on a fixed period until the queue is dropped by everyone else.
    pub fn spawn_flusher(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let queue = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick is immediate, skip it
            loop {
                interval.tick().await;
                let Some(queue) = queue.upgrade() else {
                    break;
                };
                queue.flush();
            }
        })
    }
}

impl Grid for BlockQueue {
    fn get_block(&self, pos: BlockPos) -> Option<BlockId> {
        if let Some(block) = self.pending.lock().expect("block queue poisoned").get(&pos) {
            return Some(*block);
        }
        self.world.get_block(pos)
    }

    fn queue_mutation(&self, pos: BlockPos, block: BlockId) {
        if !self.world.contains(pos) {
            return;
        }
        self.pending
            .lock()
            .expect("block queue poisoned")
            .insert(pos, block);
    }

    fn in_bounds(&self, pos: BlockPos) -> bool {
        self.world.contains(pos)
    }
}
