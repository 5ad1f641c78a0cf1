//! Per-session edit history.
//!
//! Every draw-class operation starts by clearing both buffers, so undo only
//! ever covers the most recent operation. Each cell that operation changed
//! leaves one entry holding the block it replaced. Undo replays entries
//! newest first and moves the overwritten values into the redo buffer; redo
//! does the reverse.
//!
//! The undo buffer is bounded. When an operation would push past the bound,
//! the buffer is emptied and marked irreversible, and the rest of that
//! operation records nothing.

use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::position::BlockPos;

use crate::context::ServerContext;
use crate::draw::Editor;
use crate::error::CoreError;
use crate::permission::ChangeContext;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoEntry {
    pub pos: BlockPos,
    /// The block that was there before the change.
    pub prior: BlockId,
}

/// Result of [`UndoBuffer::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    Recorded,
    /// This push hit the bound; the buffer was just emptied.
    Overflowed,
    /// The buffer is already irreversible; nothing kept.
    Dropped,
}

#[derive(Debug)]
pub struct UndoBuffer {
    entries: Vec<UndoEntry>,
    capacity: usize,
    irreversible: bool,
}

impl UndoBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            irreversible: false,
        }
    }

    pub fn push(&mut self, entry: UndoEntry) -> Push {
        if self.irreversible {
            return Push::Dropped;
        }
        if self.entries.len() >= self.capacity {
            self.entries = Vec::new();
            self.irreversible = true;
            return Push::Overflowed;
        }
        self.entries.push(entry);
        Push::Recorded
    }

    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set once the current operation outgrew the buffer.
    pub fn is_irreversible(&self) -> bool {
        self.irreversible
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.irreversible = false;
    }
}

#[derive(Debug)]
pub struct EditHistory {
    pub undo: UndoBuffer,
    pub redo: Vec<UndoEntry>,
}

impl EditHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: UndoBuffer::new(capacity),
            redo: Vec::new(),
        }
    }

    /// Forget everything. Called at the start of every draw-class operation.
    pub fn begin_operation(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty() && self.redo.is_empty()
    }
}

// ── Replay ──────────────────────────────────────────────────────────────

/// Revert the last operation. With nothing to undo but something to redo,
/// this redoes instead, so repeating `undo` toggles.
pub fn undo(ctx: &ServerContext, session: &mut Session) -> Result<(), CoreError> {
    if session.history.undo.is_empty() {
        if !session.history.redo.is_empty() {
            return redo(ctx, session);
        }
        let msg = if session.history.undo.is_irreversible() {
            "Your last operation was too large to undo."
        } else {
            "Nothing to undo."
        };
        session.message(msg);
        return Ok(());
    }

    let level = session.level.clone().ok_or(CoreError::NoWorld(session.id))?;
    let actor = session.actor();
    let EditHistory { undo, redo } = &mut session.history;
    let mut editor = Editor::new(ctx, &level, actor, ChangeContext::Undo, None);
    while let Some(entry) = undo.pop() {
        if let Some(current) = editor.place(entry.pos, entry.prior) {
            redo.push(UndoEntry {
                pos: entry.pos,
                prior: current,
            });
        }
    }
    let report = editor.finish("undo");
    session.message(format!("Undid {} blocks.", report.changed));
    report.notify(session);
    Ok(())
}

/// Re-apply what the last undo reverted.
pub fn redo(ctx: &ServerContext, session: &mut Session) -> Result<(), CoreError> {
    if session.history.redo.is_empty() {
        session.message("Nothing to redo.");
        return Ok(());
    }

    let level = session.level.clone().ok_or(CoreError::NoWorld(session.id))?;
    let actor = session.actor();
    let EditHistory { undo, redo } = &mut session.history;
    let mut editor = Editor::new(ctx, &level, actor, ChangeContext::Undo, None);
    while let Some(entry) = redo.pop() {
        if let Some(current) = editor.place(entry.pos, entry.prior) {
            undo.push(UndoEntry {
                pos: entry.pos,
                prior: current,
            });
        }
    }
    let report = editor.finish("redo");
    session.message(format!("Redid {} blocks.", report.changed));
    report.notify(session);
    Ok(())
}
