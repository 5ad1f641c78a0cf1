//! World-change event bus for downstream distribution of edits.
//!
//! Each [`BlockQueue`](crate::queue::BlockQueue) flush publishes one
//! [`WorldChangeBatch`] to a shared `tokio::sync::broadcast` channel.
//! Transports subscribe and forward changes to their clients (spectators,
//! other builders in the same level). Nothing in the editing core waits on
//! subscribers.

use std::sync::Arc;

use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::position::BlockPos;
use tokio::sync::broadcast;

/// Recommended capacity for the broadcast channel.
/// 256 batches in flight covers a few seconds of heavy drawing at the
/// default flush period.
pub const BUS_CAPACITY: usize = 256;

/// Every block change applied by one queue flush, in the order they were
/// first queued.
///
/// Uses `Arc<[...]>` so cloning per broadcast subscriber is just a refcount bump.
#[derive(Clone, Debug)]
pub struct WorldChangeBatch {
    pub level: Arc<str>,
    pub changes: Arc<[(BlockPos, BlockId)]>,
}

pub fn channel() -> broadcast::Sender<WorldChangeBatch> {
    broadcast::channel(BUS_CAPACITY).0
}
