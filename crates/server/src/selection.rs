//! Per-session selection state: collects a fixed number of marks, then hands
//! them to the pending draw action exactly once.
//!
//! Starting a new selection while one is pending replaces it (last command
//! wins). Completion clears `marks_expected` before the action runs, so an
//! action that starts another selection from the same input event does not
//! see itself as still in progress.

use blockforge_engine::world::position::BlockPos;

use crate::draw::DrawAction;
use crate::error::CoreError;
use crate::permission::Capability;

/// Where a selection stands after a mark was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkProgress {
    /// Still waiting; `have` of `want` marks collected.
    Progress { have: usize, want: usize },
    /// All marks collected.
    Ready,
}

/// What [`Selection::complete`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Run `action` over `marks`. The selection is already cleared.
    Granted { action: DrawAction, marks: Vec<BlockPos> },
    /// The rank no longer has `missing`. The selection was cancelled.
    Denied { missing: Capability },
}

#[derive(Debug, Default)]
pub struct Selection {
    marks_expected: usize,
    marks: Vec<BlockPos>,
    action: Option<DrawAction>,
    required: Vec<Capability>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin collecting `marks_expected` marks for `action`, replacing any
    /// selection already in progress.
    pub fn start(&mut self, marks_expected: usize, action: DrawAction, required: Vec<Capability>) {
        debug_assert!(marks_expected > 0, "a selection needs at least one mark");
        self.marks.clear();
        self.marks.reserve(marks_expected);
        self.marks_expected = marks_expected;
        self.action = Some(action);
        self.required = required;
    }

    pub fn in_progress(&self) -> bool {
        self.marks_expected > 0
    }

    pub fn marks_expected(&self) -> usize {
        self.marks_expected
    }

    pub fn marks(&self) -> &[BlockPos] {
        &self.marks
    }

    pub fn action(&self) -> Option<&DrawAction> {
        self.action.as_ref()
    }

    /// Record one mark. Once the selection is full, further marks replace
    /// the last one instead of growing past `marks_expected`.
    pub fn add_mark(&mut self, pos: BlockPos) -> Result<MarkProgress, CoreError> {
        if !self.in_progress() {
            tracing::error!("Mark at {:?} with no selection in progress", pos);
            return Err(CoreError::NoSelectionInProgress);
        }
        if self.marks.len() == self.marks_expected {
            self.marks.pop();
        }
        self.marks.push(pos);
        if self.marks.len() == self.marks_expected {
            Ok(MarkProgress::Ready)
        } else {
            Ok(MarkProgress::Progress {
                have: self.marks.len(),
                want: self.marks_expected,
            })
        }
    }

    /// Finish the selection. `has` answers capability checks against the
    /// session's rank *now*, which may differ from when the selection began.
    pub fn complete(&mut self, has: impl Fn(Capability) -> bool) -> Result<Completion, CoreError> {
        if !self.in_progress() {
            tracing::error!("Selection executed with none in progress");
            return Err(CoreError::NoSelectionInProgress);
        }
        if self.action.is_none() {
            tracing::error!("Selection of {} marks has no action", self.marks_expected);
            self.cancel();
            return Err(CoreError::MissingSelectionCallback);
        }
        if self.marks.len() < self.marks_expected {
            return Err(CoreError::SelectionIncomplete {
                have: self.marks.len(),
                want: self.marks_expected,
            });
        }

        if let Some(missing) = self.required.iter().copied().find(|c| !has(*c)) {
            self.cancel();
            return Ok(Completion::Denied { missing });
        }

        self.marks_expected = 0;
        let action = self.action.take().ok_or(CoreError::MissingSelectionCallback)?;
        let marks = std::mem::take(&mut self.marks);
        self.required.clear();
        Ok(Completion::Granted { action, marks })
    }

    /// Drop everything, unconditionally.
    pub fn cancel(&mut self) {
        self.marks_expected = 0;
        self.marks.clear();
        self.action = None;
        self.required.clear();
    }
}
