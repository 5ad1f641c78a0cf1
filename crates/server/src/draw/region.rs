use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::position::BlockPos;
use blockforge_engine::world::region::Cuboid;

use crate::block;
use crate::context::ServerContext;
use crate::level::Level;
use crate::permission::ChangeContext;
use crate::session::Session;

use super::{within_limit, Editor};

/// Solid or hollow box fill.
pub(super) fn cuboid(
    ctx: &ServerContext,
    session: &mut Session,
    level: &Level,
    a: BlockPos,
    b: BlockPos,
    block: BlockId,
    hollow: bool,
) {
    let region = Cuboid::from_corners(a, b);
    let volume = if hollow { region.shell_volume() } else { region.volume() };
    if !within_limit(ctx, session, "draw", volume) {
        return;
    }

    session.history.begin_operation();
    let actor = session.actor();
    let mut editor = Editor::new(ctx, level, actor, ChangeContext::Draw, Some(&mut session.history.undo));
    if hollow {
        for pos in region.shell() {
            editor.place_stacking(pos, block);
        }
    } else {
        for pos in region.iter_strided(ctx.config.draw_stride) {
            editor.place_stacking(pos, block);
        }
    }
    let op = if hollow { "hollow cuboid" } else { "cuboid" };
    let report = editor.finish(op);
    session.message(format!("Drew {} {}: {} blocks changed.", op, block::name(block), report.changed));
    report.notify(session);
}

/// Fill the ellipsoid inscribed in the box.
pub(super) fn ellipsoid(ctx: &ServerContext, session: &mut Session, level: &Level, a: BlockPos, b: BlockPos, block: BlockId) {
    let region = Cuboid::from_corners(a, b);
    if !within_limit(ctx, session, "draw", region.ellipsoid_volume()) {
        return;
    }
    // The estimate runs low on thin boxes; a limited rank gets an exact count.
    if ctx.ranks.draw_limit(session.rank) != 0 {
        let cells = region.ellipsoid(ctx.config.draw_stride).count() as u64;
        if !within_limit(ctx, session, "draw", cells) {
            return;
        }
    }

    session.history.begin_operation();
    let actor = session.actor();
    let mut editor = Editor::new(ctx, level, actor, ChangeContext::Draw, Some(&mut session.history.undo));
    for pos in region.ellipsoid(ctx.config.draw_stride) {
        editor.place(pos, block);
    }
    let report = editor.finish("sphere");
    session.message(format!("Drew sphere of {}: {} blocks changed.", block::name(block), report.changed));
    report.notify(session);
}

/// Overwrite cells whose current block matches `targets`, or with `invert`
/// every cell that does not.
#[allow(clippy::too_many_arguments)]
pub(super) fn replace(
    ctx: &ServerContext,
    session: &mut Session,
    level: &Level,
    a: BlockPos,
    b: BlockPos,
    targets: &[BlockId],
    block: BlockId,
    invert: bool,
) {
    let region = Cuboid::from_corners(a, b);
    if !within_limit(ctx, session, "replace", region.volume()) {
        return;
    }

    session.history.begin_operation();
    let actor = session.actor();
    let mut editor = Editor::new(ctx, level, actor, ChangeContext::Draw, Some(&mut session.history.undo));
    let grid = editor.grid();
    for pos in region.iter_strided(ctx.config.draw_stride) {
        let Some(current) = grid.get_block(pos) else {
            continue;
        };
        if targets.contains(&current) != invert {
            editor.place(pos, block);
        }
    }
    let op = if invert { "replacenot" } else { "replace" };
    let report = editor.finish(op);
    session.message(format!("Replaced {} blocks with {}.", report.changed, block::name(block)));
    report.notify(session);
}
