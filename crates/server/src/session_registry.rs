//! Shared registry of online sessions.
//!
//! Tracks who is connected and where, and broadcasts join/leave/move events
//! so transports can keep player lists current. Private chat resolves its
//! target here.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use blockforge_engine::world::position::BlockPos;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::permission::Rank;

#[derive(Clone, Debug)]
pub struct SessionInfo {
    pub id: u64,
    pub uuid: Uuid,
    pub name: String,
    pub rank: Rank,
    pub level: Option<Arc<str>>,
    pub pos: BlockPos,
}

/// Lifecycle events broadcast to subscribers.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Joined { id: u64, uuid: Uuid, name: String },
    Left { id: u64, uuid: Uuid },
    /// Position or level changed.
    Moved {
        id: u64,
        level: Option<Arc<str>>,
        pos: BlockPos,
    },
}

/// Name-derived id, stable across reconnects of the same name.
pub fn offline_uuid(name: &str) -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_OID, format!("OfflinePlayer:{}", name).as_bytes())
}

/// Uses `std::sync::RwLock` because every operation is brief (no awaits
/// while the lock is held) and reads dominate.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<u64, SessionInfo>>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(512);
        Self {
            sessions: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Register a session and broadcast `SessionEvent::Joined`.
    pub fn register(&self, info: SessionInfo) {
        let event = SessionEvent::Joined {
            id: info.id,
            uuid: info.uuid,
            name: info.name.clone(),
        };
        self.sessions
            .write()
            .expect("session registry poisoned")
            .insert(info.id, info);
        // Best-effort: if no subscribers yet, the send fails silently.
        let _ = self.event_tx.send(event);
    }

    pub fn update_position(&self, id: u64, level: Option<Arc<str>>, pos: BlockPos) {
        {
            let mut sessions = self.sessions.write().expect("session registry poisoned");
            let Some(info) = sessions.get_mut(&id) else {
                return;
            };
            info.level = level.clone();
            info.pos = pos;
        }
        let _ = self.event_tx.send(SessionEvent::Moved { id, level, pos });
    }

    pub fn update_rank(&self, id: u64, rank: Rank) {
        if let Some(info) = self
            .sessions
            .write()
            .expect("session registry poisoned")
            .get_mut(&id)
        {
            info.rank = rank;
        }
    }

    /// Remove a session and broadcast `SessionEvent::Left`.
    pub fn deregister(&self, id: u64) {
        let info = self
            .sessions
            .write()
            .expect("session registry poisoned")
            .remove(&id);
        if let Some(info) = info {
            let _ = self.event_tx.send(SessionEvent::Left {
                id: info.id,
                uuid: info.uuid,
            });
        }
    }

    /// Case-insensitive lookup by name.
    pub fn find_by_name(&self, name: &str) -> Option<SessionInfo> {
        self.sessions
            .read()
            .expect("session registry poisoned")
            .values()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn snapshot(&self) -> Vec<SessionInfo> {
        self.sessions
            .read()
            .expect("session registry poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().expect("session registry poisoned").len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
