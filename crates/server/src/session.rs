//! Per-connection session state.
//!
//! A session is driven by exactly one task, so nothing here is shared or
//! locked. Cross-session effects only happen through the level's grid and
//! the registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::position::BlockPos;

use crate::config::CoreConfig;
use crate::context::ServerContext;
use crate::draw::{self, CopyBuffer, DrawAction};
use crate::error::CoreError;
use crate::level::Level;
use crate::permission::{Actor, Rank};
use crate::selection::{Completion, MarkProgress, Selection};
use crate::session_registry::{offline_uuid, SessionInfo};
use crate::spam::SpamTracker;
use crate::undo::EditHistory;

// ── Small per-session types ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteState {
    Unmuted,
    Until(Instant),
    /// Until someone unmutes by hand.
    Indefinite,
}

/// A command parked until `/confirm`, re-run with confirmation granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub command: String,
    pub args: String,
    pub requested_at: Instant,
}

/// Fixed table mapping a held block to the block actually placed.
#[derive(Debug, Clone)]
pub struct BlockBindings([BlockId; 256]);

impl BlockBindings {
    pub fn new() -> Self {
        Self(std::array::from_fn(|i| BlockId(i as u16)))
    }

    /// Returns false if `from` is outside the table.
    pub fn bind(&mut self, from: BlockId, to: BlockId) -> bool {
        match self.0.get_mut(from.0 as usize) {
            Some(slot) => {
                *slot = to;
                true
            }
            None => false,
        }
    }

    pub fn unbind(&mut self, from: BlockId) {
        self.bind(from, from);
    }

    pub fn resolve(&self, held: BlockId) -> BlockId {
        self.0.get(held.0 as usize).copied().unwrap_or(held)
    }
}

impl Default for BlockBindings {
    fn default() -> Self {
        Self::new()
    }
}

// ── Session ─────────────────────────────────────────────────────────────

pub struct Session {
    pub id: u64,
    pub name: String,
    pub rank: Rank,
    pub level: Option<Arc<Level>>,
    pub position: BlockPos,
    pub frozen: bool,
    pub spectating: bool,
    pub mute: MuteState,
    /// Last block the client held when placing by hand.
    pub last_block: BlockId,
    pub bindings: BlockBindings,
    /// Re-arm the same selection after every successful draw.
    pub static_mode: bool,
    pub selection: Selection,
    pub history: EditHistory,
    pub copy: Option<CopyBuffer>,
    pub(crate) pending_confirm: Option<PendingConfirmation>,
    pub(crate) confirmed: bool,
    pub(crate) spam: SpamTracker,
    pub(crate) partial: Option<String>,
    pub(crate) last_command: Option<String>,
    outbox: Vec<String>,
    connected: bool,
}

impl Session {
    /// A detached session. Use [`Session::connect`] to also register it.
    pub fn new(id: u64, name: impl Into<String>, rank: Rank, config: &CoreConfig) -> Self {
        Self {
            id,
            name: name.into(),
            rank,
            level: None,
            position: BlockPos::new(0, 0, 0),
            frozen: false,
            spectating: false,
            mute: MuteState::Unmuted,
            last_block: crate::block::STONE,
            bindings: BlockBindings::new(),
            static_mode: false,
            selection: Selection::new(),
            history: EditHistory::new(config.max_undo_count),
            copy: None,
            pending_confirm: None,
            confirmed: false,
            spam: SpamTracker::new(),
            partial: None,
            last_command: None,
            outbox: Vec::new(),
            connected: false,
        }
    }

    pub fn connect(ctx: &ServerContext, id: u64, name: impl Into<String>, rank: Rank) -> Self {
        let mut session = Self::new(id, name, rank, &ctx.config);
        ctx.registry.register(SessionInfo {
            id,
            uuid: offline_uuid(&session.name),
            name: session.name.clone(),
            rank,
            level: None,
            pos: session.position,
        });
        ctx.metrics.session_joined();
        session.connected = true;
        tracing::info!("Session {} connected as {} ({})", id, session.name, ctx.ranks.rank_name(rank));
        session
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            name: self.name.clone(),
            rank: self.rank,
        }
    }

    /// Queue a line for the client.
    pub fn message(&mut self, text: impl Into<String>) {
        self.outbox.push(text.into());
    }

    /// Drain everything queued for the client.
    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbox)
    }

    /// Move into `level` at `spawn`. Marks from the old level are dropped.
    pub fn join_level(&mut self, ctx: &ServerContext, level: Arc<Level>, spawn: BlockPos) {
        if self.selection.in_progress() {
            self.selection.cancel();
            self.message("Selection cancelled.");
        }
        ctx.registry.update_position(self.id, Some(Arc::clone(&level.name)), spawn);
        tracing::info!("{} joined level {}", self.name, level.name);
        self.level = Some(level);
        self.position = spawn;
    }

    pub fn move_to(&mut self, ctx: &ServerContext, pos: BlockPos) {
        self.position = pos;
        let level = self.level.as_ref().map(|l| Arc::clone(&l.name));
        ctx.registry.update_position(self.id, level, pos);
    }

    pub fn set_rank(&mut self, ctx: &ServerContext, rank: Rank) {
        self.rank = rank;
        ctx.registry.update_rank(self.id, rank);
    }

    /// Time left on a mute, or `None` if not muted. Expired mutes are
    /// cleared on the way.
    pub fn mute_remaining(&mut self, now: Instant) -> Option<Option<Duration>> {
        match self.mute {
            MuteState::Unmuted => None,
            MuteState::Indefinite => Some(None),
            MuteState::Until(until) if until > now => Some(Some(until - now)),
            MuteState::Until(_) => {
                self.mute = MuteState::Unmuted;
                None
            }
        }
    }

    /// Park a command until `/confirm`, replacing anything already waiting.
    pub fn request_confirmation(&mut self, command: &str, args: &str, now: Instant, prompt: &str) {
        self.pending_confirm = Some(PendingConfirmation {
            command: command.to_string(),
            args: args.to_string(),
            requested_at: now,
        });
        self.message(format!("{} Type /confirm to continue.", prompt));
    }

    /// True only while a confirmed command is being re-run.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn has_pending_confirmation(&self) -> bool {
        self.pending_confirm.is_some()
    }

    pub fn has_partial_message(&self) -> bool {
        self.partial.is_some()
    }

    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    pub fn spam_warnings(&self) -> u32 {
        self.spam.warnings()
    }

    // ── Selections ──────────────────────────────────────────────────────

    /// Start collecting marks for `action`. Refused up front if the rank
    /// lacks what the action needs; re-checked again on completion.
    pub fn begin_selection(&mut self, ctx: &ServerContext, action: DrawAction) {
        let required = action.required();
        if let Some(missing) = required.iter().find(|c| !ctx.ranks.has(self.rank, **c)) {
            self.message(format!("You are not allowed to {} ({:?} required).", action.name(), missing));
            return;
        }
        let marks = action.marks_needed();
        let prompt = if marks == 1 {
            "Place or break a block to choose where.".to_string()
        } else {
            format!("Place or break {} blocks to determine the edges.", marks)
        };
        self.selection.start(marks, action, required);
        self.message(prompt);
    }

    pub fn add_mark(&mut self, ctx: &ServerContext, pos: BlockPos, auto_execute: bool) -> Result<(), CoreError> {
        if self.selection.in_progress() {
            let level = self.level.as_ref().ok_or(CoreError::NoWorld(self.id))?;
            if !level.grid.in_bounds(pos) {
                tracing::debug!("{} marked {:?}, outside {}", self.name, pos, level.name);
                self.message(format!("({}, {}, {}) is outside the world.", pos.x, pos.y, pos.z));
                return Ok(());
            }
        }
        match self.selection.add_mark(pos)? {
            MarkProgress::Progress { have, want } => {
                self.message(format!("Mark {} of {} at ({}, {}, {}).", have, want, pos.x, pos.y, pos.z));
                Ok(())
            }
            MarkProgress::Ready if auto_execute => self.execute_selection(ctx),
            MarkProgress::Ready => {
                self.message("Selection complete. Type /mark go to run it.");
                Ok(())
            }
        }
    }

    pub fn execute_selection(&mut self, ctx: &ServerContext) -> Result<(), CoreError> {
        let rank = self.rank;
        match self.selection.complete(|cap| ctx.ranks.has(rank, cap))? {
            Completion::Denied { missing } => {
                self.message(format!("You no longer have permission to do that ({:?} required).", missing));
                Ok(())
            }
            Completion::Granted { action, marks } => {
                let rearm = self.static_mode.then(|| action.clone());
                draw::run(ctx, self, action, &marks)?;
                // The action itself may have started a new selection.
                if let Some(action) = rearm.filter(|_| !self.selection.in_progress()) {
                    let (marks, required) = (action.marks_needed(), action.required());
                    self.selection.start(marks, action, required);
                }
                Ok(())
            }
        }
    }

    /// Returns whether there was anything to cancel.
    pub fn cancel_selection(&mut self) -> bool {
        let active = self.selection.in_progress();
        self.selection.cancel();
        active
    }

    /// Drop all per-connection state and leave the registry.
    pub fn disconnect(&mut self, ctx: &ServerContext) {
        self.selection.cancel();
        self.history.begin_operation();
        self.copy = None;
        self.pending_confirm = None;
        self.partial = None;
        self.last_command = None;
        self.level = None;
        self.outbox.clear();
        if std::mem::take(&mut self.connected) {
            ctx.registry.deregister(self.id);
            ctx.metrics.session_left();
            tracing::info!("Session {} ({}) disconnected", self.id, self.name);
        }
    }
}
