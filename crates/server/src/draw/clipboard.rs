use std::time::Instant;

use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::position::BlockPos;
use blockforge_engine::world::region::Cuboid;

use crate::block;
use crate::context::ServerContext;
use crate::level::Level;
use crate::permission::ChangeContext;
use crate::queue::Grid;
use crate::session::Session;

use super::{within_limit, Editor};

/// A dense snapshot of a box of blocks.
///
/// `extents` holds the signed size along each axis. A negative extent means
/// the second mark was below the first on that axis, so pasting keeps the
/// first mark's corner at the paste point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyBuffer {
    pub(super) size: [u32; 3],
    pub(super) extents: [i32; 3],
    pub(super) blocks: Vec<BlockId>,
    origin: Option<BlockPos>,
}

impl CopyBuffer {
    /// Build a buffer of `size` by asking `f` for every cell. The sign of
    /// each `extents` entry is kept; magnitudes come from `size`.
    pub fn from_fn(size: [u32; 3], extents: [i32; 3], mut f: impl FnMut([u32; 3]) -> BlockId) -> Self {
        let extents = std::array::from_fn(|i| {
            let len = size[i] as i32;
            if extents[i] < 0 { -len } else { len }
        });
        let volume = size.iter().map(|s| *s as usize).product();
        let mut blocks = Vec::with_capacity(volume);
        for y in 0..size[1] {
            for z in 0..size[2] {
                for x in 0..size[0] {
                    blocks.push(f([x, y, z]));
                }
            }
        }
        Self {
            size,
            extents,
            blocks,
            origin: None,
        }
    }

    /// Snapshot the box between marks `a` and `b`, `a` being the corner the
    /// selection started from.
    pub fn capture(grid: &dyn Grid, a: BlockPos, b: BlockPos) -> Self {
        let region = Cuboid::from_corners(a, b);
        let (sx, sy, sz) = region.size();
        let dir = |from: i32, to: i32| if to >= from { 1 } else { -1 };
        let extents = [dir(a.x, b.x), dir(a.y, b.y), dir(a.z, b.z)];
        let min = region.min;
        let mut buffer = Self::from_fn([sx, sy, sz], extents, |[x, y, z]| {
            grid.get_block(min.offset(x as i32, y as i32, z as i32))
                .unwrap_or(BlockId::AIR)
        });
        buffer.origin = Some(min);
        buffer
    }

    pub fn size(&self) -> [u32; 3] {
        self.size
    }

    pub fn extents(&self) -> [i32; 3] {
        self.extents
    }

    pub fn volume(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Minimum corner of the region this was copied from, if any.
    pub fn origin(&self) -> Option<BlockPos> {
        self.origin
    }

    pub(super) fn index(size: [u32; 3], [x, y, z]: [u32; 3]) -> usize {
        (y as usize * size[2] as usize + z as usize) * size[0] as usize + x as usize
    }

    pub fn get(&self, cell: [u32; 3]) -> BlockId {
        self.blocks[Self::index(self.size, cell)]
    }

    /// The box a paste at `at` covers.
    pub fn destination(&self, at: BlockPos) -> Cuboid {
        let start = |p: i32, i: usize| {
            if self.extents[i] < 0 {
                p.saturating_sub(self.size[i] as i32 - 1)
            } else {
                p
            }
        };
        let min = BlockPos::new(start(at.x, 0), start(at.y, 1), start(at.z, 2));
        let max = min.offset(
            self.size[0] as i32 - 1,
            self.size[1] as i32 - 1,
            self.size[2] as i32 - 1,
        );
        Cuboid { min, max }
    }
}

/// Which buffer cells a paste writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PasteFilter {
    #[default]
    All,
    Only(Vec<BlockId>),
    Except(Vec<BlockId>),
}

impl PasteFilter {
    pub fn admits(&self, block: BlockId) -> bool {
        match self {
            PasteFilter::All => true,
            PasteFilter::Only(list) => list.contains(&block),
            PasteFilter::Except(list) => !list.contains(&block),
        }
    }
}

pub(super) fn copy(ctx: &ServerContext, session: &mut Session, level: &Level, a: BlockPos, b: BlockPos) {
    let started = Instant::now();
    let volume = Cuboid::from_corners(a, b).volume();
    if !within_limit(ctx, session, "copy", volume) {
        return;
    }

    session.history.begin_operation();
    let buffer = CopyBuffer::capture(level.grid.as_ref(), a, b);
    session.copy = Some(buffer);
    ctx.metrics.record_draw(0, 0, false, started.elapsed());
    tracing::info!("copy by {}: {} blocks in {:.1?}", session.name, volume, started.elapsed());
    session.message(format!("Copied {} blocks.", volume));
}

pub(super) fn cut(ctx: &ServerContext, session: &mut Session, level: &Level, a: BlockPos, b: BlockPos, fill: BlockId) {
    let region = Cuboid::from_corners(a, b);
    if !within_limit(ctx, session, "cut", region.volume()) {
        return;
    }

    session.history.begin_operation();
    let buffer = CopyBuffer::capture(level.grid.as_ref(), a, b);
    let copied = buffer.volume();
    session.copy = Some(buffer);

    let actor = session.actor();
    let mut editor = Editor::new(ctx, level, actor, ChangeContext::Draw, Some(&mut session.history.undo));
    for pos in region.iter_strided(ctx.config.draw_stride) {
        editor.place(pos, fill);
    }
    let report = editor.finish("cut");
    session.message(format!(
        "Cut {} blocks; {} replaced with {}.",
        copied,
        report.changed,
        block::name(fill)
    ));
    report.notify(session);
}

pub(super) fn paste(ctx: &ServerContext, session: &mut Session, level: &Level, at: BlockPos, filter: &PasteFilter) {
    let Some(buffer) = session.copy.take() else {
        session.message("You have not copied anything yet.");
        return;
    };
    if !within_limit(ctx, session, "paste", buffer.volume()) {
        session.copy = Some(buffer);
        return;
    }

    let dest = buffer.destination(at);
    if !(level.grid.in_bounds(dest.min) && level.grid.in_bounds(dest.max)) {
        session.message("Part of the paste falls outside the world and will be skipped.");
    }

    session.history.begin_operation();
    let actor = session.actor();
    let mut editor = Editor::new(ctx, level, actor, ChangeContext::Paste, Some(&mut session.history.undo));
    for pos in dest.iter_strided(ctx.config.draw_stride) {
        let cell = [
            (pos.x - dest.min.x) as u32,
            (pos.y - dest.min.y) as u32,
            (pos.z - dest.min.z) as u32,
        ];
        let block = buffer.get(cell);
        if filter.admits(block) {
            editor.place(pos, block);
        }
    }
    let report = editor.finish("paste");
    session.copy = Some(buffer);
    session.message(format!("Pasted {} blocks.", report.changed));
    report.notify(session);
}
