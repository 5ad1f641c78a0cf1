//! Region drawing, clipboard and the shared per-cell mutation path.
//!
//! Every operation follows the same outline: validate the volume against
//! the rank's draw limit before touching anything, clear the session's edit
//! history, then push each affected cell through an [`Editor`], which runs
//! the permission cascade, skips no-op writes, queues the mutation and
//! records undo.

mod clipboard;
mod region;
mod transform;

use std::time::{Duration, Instant};

use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::position::BlockPos;

use crate::block;
use crate::context::ServerContext;
use crate::error::CoreError;
use crate::level::Level;
use crate::permission::{Actor, Capability, Cascade, ChangeContext, PlaceRequest, Verdict};
use crate::queue::Grid;
use crate::session::Session;
use crate::undo::{Push, UndoBuffer, UndoEntry};

pub use clipboard::{CopyBuffer, PasteFilter};
pub use transform::{quarter_turns, Axis};

// ── Actions ─────────────────────────────────────────────────────────────

/// What to do once a selection completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawAction {
    Cuboid { block: BlockId, hollow: bool },
    Ellipsoid { block: BlockId },
    /// Overwrite cells whose current block is (or with `invert`, is not)
    /// one of `targets`.
    Replace {
        targets: Vec<BlockId>,
        block: BlockId,
        invert: bool,
    },
    Copy,
    Cut { fill: BlockId },
    Paste { filter: PasteFilter },
}

impl DrawAction {
    pub fn marks_needed(&self) -> usize {
        match self {
            DrawAction::Paste { .. } => 1,
            _ => 2,
        }
    }

    pub fn required(&self) -> Vec<Capability> {
        match self {
            DrawAction::Copy | DrawAction::Cut { .. } | DrawAction::Paste { .. } => vec![Capability::Copy],
            _ => vec![Capability::Draw],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DrawAction::Cuboid { hollow: false, .. } => "cuboid",
            DrawAction::Cuboid { hollow: true, .. } => "hollow cuboid",
            DrawAction::Ellipsoid { .. } => "sphere",
            DrawAction::Replace { invert: false, .. } => "replace",
            DrawAction::Replace { invert: true, .. } => "replacenot",
            DrawAction::Copy => "copy",
            DrawAction::Cut { .. } => "cut",
            DrawAction::Paste { .. } => "paste",
        }
    }
}

/// Run a completed selection.
pub fn run(ctx: &ServerContext, session: &mut Session, action: DrawAction, marks: &[BlockPos]) -> Result<(), CoreError> {
    let want = action.marks_needed();
    if marks.len() < want {
        return Err(CoreError::SelectionIncomplete {
            have: marks.len(),
            want,
        });
    }
    let level = session.level.clone().ok_or(CoreError::NoWorld(session.id))?;

    match action {
        DrawAction::Cuboid { block, hollow } => region::cuboid(ctx, session, &level, marks[0], marks[1], block, hollow),
        DrawAction::Ellipsoid { block } => region::ellipsoid(ctx, session, &level, marks[0], marks[1], block),
        DrawAction::Replace { targets, block, invert } => {
            region::replace(ctx, session, &level, marks[0], marks[1], &targets, block, invert)
        }
        DrawAction::Copy => clipboard::copy(ctx, session, &level, marks[0], marks[1]),
        DrawAction::Cut { fill } => clipboard::cut(ctx, session, &level, marks[0], marks[1], fill),
        DrawAction::Paste { filter } => clipboard::paste(ctx, session, &level, marks[0], &filter),
    }
    Ok(())
}

/// Reject up front if `volume` is over the rank's draw limit.
pub(crate) fn within_limit(ctx: &ServerContext, session: &mut Session, verb: &str, volume: u64) -> bool {
    let limit = ctx.ranks.draw_limit(session.rank);
    if limit != 0 && volume > limit {
        tracing::debug!("{} tried to {} {} blocks (limit {})", session.name, verb, volume, limit);
        session.message(format!(
            "You tried to {} {} blocks. You cannot {} more than {}.",
            verb, volume, verb, limit
        ));
        return false;
    }
    true
}

// ── Mutation path ───────────────────────────────────────────────────────

/// Applies single-cell changes on behalf of one actor, counting outcomes.
pub struct Editor<'a> {
    cascade: Cascade<'a>,
    grid: &'a dyn Grid,
    ctx: &'a ServerContext,
    actor: Actor,
    context: ChangeContext,
    undo: Option<&'a mut UndoBuffer>,
    started: Instant,
    changed: u64,
    denied: u64,
    first_denial: Option<Verdict>,
    overflowed: bool,
}

/// Outcome of a finished [`Editor`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct EditReport {
    pub changed: u64,
    pub denied: u64,
    pub first_denial: Option<Verdict>,
    /// The undo buffer overflowed during this run.
    pub overflowed: bool,
    pub elapsed: Duration,
}

impl EditReport {
    /// Tell the session about anything that went less than perfectly.
    pub fn notify(&self, session: &mut Session) {
        if self.overflowed {
            session.message("This operation was too large to record; it cannot be undone.");
        }
        if let Some(verdict) = &self.first_denial {
            session.message(format!("{} blocks were skipped: {}", self.denied, verdict.describe()));
        }
    }
}

impl<'a> Editor<'a> {
    /// Undo entries go to `undo` when given; otherwise nothing is recorded.
    pub fn new(
        ctx: &'a ServerContext,
        level: &'a Level,
        actor: Actor,
        context: ChangeContext,
        undo: Option<&'a mut UndoBuffer>,
    ) -> Self {
        Self {
            cascade: level.cascade(ctx.ranks.as_ref(), &ctx.hooks),
            grid: level.grid.as_ref(),
            ctx,
            actor,
            context,
            undo,
            started: Instant::now(),
            changed: 0,
            denied: 0,
            first_denial: None,
            overflowed: false,
        }
    }

    pub fn grid(&self) -> &'a dyn Grid {
        self.grid
    }

    /// Try to set `pos` to `block`. Returns the block it replaced when a
    /// mutation was queued; `None` when denied or already equal.
    pub fn place(&mut self, pos: BlockPos, block: BlockId) -> Option<BlockId> {
        let existing = self.grid.get_block(pos);
        let req = PlaceRequest {
            pos,
            block,
            context: self.context,
        };
        let verdict = self.cascade.can_place_over(&self.actor, &req, existing);
        if !verdict.is_allowed() {
            self.denied += 1;
            if self.first_denial.is_none() {
                tracing::debug!("{} denied at {:?}: {}", self.actor.name, pos, verdict);
                self.first_denial = Some(verdict);
            }
            return None;
        }
        // A hook may allow an off-grid cell; there is still nothing to write.
        let existing = existing?;
        if existing == block {
            return None;
        }

        self.grid.queue_mutation(pos, block);
        self.changed += 1;
        if let Some(undo) = self.undo.as_deref_mut() {
            let push = undo.push(UndoEntry { pos, prior: existing });
            if push == Push::Overflowed {
                self.overflowed = true;
            }
        }
        Some(existing)
    }

    /// [`Editor::place`] with stair stacking: a stair placed directly on a
    /// stair turns the one below into the double block instead.
    pub fn place_stacking(&mut self, pos: BlockPos, block: BlockId) -> Option<BlockId> {
        if let Some(merged) = block::stacked(block) {
            let below = pos.below();
            if self.grid.get_block(below) == Some(block) {
                return self.place(below, merged);
            }
        }
        self.place(pos, block)
    }

    pub fn changed(&self) -> u64 {
        self.changed
    }

    /// Record metrics and log one line for the finished operation.
    pub fn finish(self, op: &str) -> EditReport {
        let elapsed = self.started.elapsed();
        self.ctx
            .metrics
            .record_draw(self.changed, self.denied, self.overflowed, elapsed);
        tracing::info!(
            "{} by {}: {} blocks changed, {} denied in {:.1?}",
            op,
            self.actor.name,
            self.changed,
            self.denied,
            elapsed
        );
        EditReport {
            changed: self.changed,
            denied: self.denied,
            first_denial: self.first_denial,
            overflowed: self.overflowed,
            elapsed,
        }
    }

    /// Like [`Editor::finish`] without metrics or logging. Used for single
    /// hand placements.
    pub fn into_report(self) -> EditReport {
        EditReport {
            changed: self.changed,
            denied: self.denied,
            first_denial: self.first_denial,
            overflowed: self.overflowed,
            elapsed: self.started.elapsed(),
        }
    }
}
