//! Draw operations through the full session path: volume limits, the
//! per-cell cascade, stair stacking, undo/redo and the undo cap.

use std::sync::Arc;
use std::time::Instant;

use blockforge_engine::world::Dimensions;
use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::position::BlockPos;
use blockforge_engine::world::region::Cuboid;

use blockforge_server::block;
use blockforge_server::chat::LogRelay;
use blockforge_server::commands::BuiltinCommands;
use blockforge_server::config::{CoreConfig, RankConfig};
use blockforge_server::context::ServerContext;
use blockforge_server::dispatch::{self, ClickOutcome};
use blockforge_server::event_bus;
use blockforge_server::level::Level;
use blockforge_server::permission::{Capability, ChangeContext, ConfiguredRanks, PlaceRequest, Rank, Verdict};
use blockforge_server::queue::{BlockQueue, Grid};
use blockforge_server::session::Session;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const BUILDER: Rank = Rank(30);
const ADMIN: Rank = Rank(100);

struct Harness {
    ctx: ServerContext,
    level: Arc<Level>,
    queue: Arc<BlockQueue>,
}

fn harness_with(config: CoreConfig) -> Harness {
    let ranks = Arc::new(ConfiguredRanks::new(config.ranks.clone()));
    let ctx = ServerContext::new(config, ranks, Arc::new(BuiltinCommands), Arc::new(LogRelay));
    let (level, queue) = Level::in_memory("test", Dimensions::new(32, 32, 32), event_bus::channel());
    Harness {
        ctx,
        level: Arc::new(level),
        queue,
    }
}

fn harness() -> Harness {
    harness_with(CoreConfig::default())
}

impl Harness {
    fn session(&self, rank: Rank) -> Session {
        let mut s = Session::connect(&self.ctx, 1, "tester", rank);
        s.join_level(&self.ctx, Arc::clone(&self.level), BlockPos::new(0, 0, 0));
        s.take_messages();
        s
    }

    fn line(&self, s: &mut Session, line: &str) {
        dispatch::handle_line(&self.ctx, s, line, Instant::now()).expect("line");
    }

    fn click(&self, s: &mut Session, pos: BlockPos) -> ClickOutcome {
        dispatch::handle_click(&self.ctx, s, pos, block::STONE, false).expect("click")
    }

    /// Run `command`, then mark `a` and `b`.
    fn draw(&self, s: &mut Session, command: &str, a: BlockPos, b: BlockPos) -> Vec<String> {
        self.line(s, command);
        assert_eq!(self.click(s, a), ClickOutcome::Marked);
        assert_eq!(self.click(s, b), ClickOutcome::Marked);
        s.take_messages()
    }

    fn get(&self, pos: BlockPos) -> BlockId {
        self.level.grid.get_block(pos).expect("in bounds")
    }

    fn snapshot(&self, region: Cuboid) -> Vec<BlockId> {
        region.iter_strided(16).map(|p| self.get(p)).collect()
    }
}

fn p(x: i32, y: i32, z: i32) -> BlockPos {
    BlockPos::new(x, y, z)
}

// ---------------------------------------------------------------------------
// Fills
// ---------------------------------------------------------------------------

#[test]
fn solid_fill_touches_exactly_the_box() {
    let h = harness();
    let mut s = h.session(ADMIN);
    let msgs = h.draw(&mut s, "/cuboid stone", p(4, 2, 4), p(1, 0, 2));
    assert!(msgs.iter().any(|m| m.contains("36 blocks changed")), "{:?}", msgs);
    assert_eq!(h.queue.pending_count(), 36);
    assert_eq!(h.get(p(1, 0, 2)), block::STONE);
    assert_eq!(h.get(p(4, 2, 4)), block::STONE);
    assert_eq!(h.get(p(5, 2, 4)), block::AIR);
    assert!(!s.selection.in_progress());
}

#[test]
fn hollow_fill_leaves_interior() {
    let h = harness();
    let mut s = h.session(ADMIN);
    h.draw(&mut s, "/cuboid hollow glass", p(0, 0, 0), p(4, 4, 4));
    assert_eq!(h.queue.pending_count() as u64, 125 - 27);
    assert_eq!(h.get(p(2, 2, 2)), block::AIR);
    assert_eq!(h.get(p(0, 2, 2)), block::GLASS);
}

#[test]
fn volume_estimate_matches_cells_changed() {
    let h = harness();
    let mut s = h.session(ADMIN);
    let region = Cuboid::from_corners(p(3, 1, 7), p(19, 9, 12));
    h.draw(&mut s, "/cuboid stone", region.min, region.max);
    assert_eq!(h.queue.pending_count() as u64, region.volume());

    let h = harness();
    let mut s = h.session(ADMIN);
    h.draw(&mut s, "/cuboid hollow stone", region.min, region.max);
    assert_eq!(h.queue.pending_count() as u64, region.shell_volume());
}

#[test]
fn single_cell_sphere_is_one_block() {
    let h = harness();
    let mut s = h.session(ADMIN);
    h.draw(&mut s, "/sphere stone", p(5, 5, 5), p(5, 5, 5));
    assert_eq!(h.queue.pending_count(), 1);
    assert_eq!(h.get(p(5, 5, 5)), block::STONE);
}

#[test]
fn sphere_stays_inside_its_box_and_is_symmetric() {
    let h = harness();
    let mut s = h.session(ADMIN);
    h.draw(&mut s, "/sphere stone", p(2, 2, 2), p(12, 12, 12));
    assert_eq!(h.get(p(7, 7, 7)), block::STONE);
    assert_eq!(h.get(p(2, 2, 2)), block::AIR);
    for (a, b) in [(p(2, 7, 7), p(12, 7, 7)), (p(7, 2, 7), p(7, 12, 7)), (p(7, 7, 2), p(7, 7, 12))] {
        assert_eq!(h.get(a), h.get(b));
    }
}

#[test]
fn thin_sphere_is_counted_against_the_limit() {
    let mut config = CoreConfig::default();
    config.ranks.push(RankConfig {
        rank: Rank(50),
        name: "tiny".into(),
        capabilities: vec![Capability::Build, Capability::Delete, Capability::Draw],
        draw_limit: 1,
    });
    let h = harness_with(config);
    let mut s = h.session(Rank(50));

    // Two cells in a row: the analytic estimate rounds to one.
    assert_eq!(Cuboid::from_corners(p(5, 5, 5), p(6, 5, 5)).ellipsoid_volume(), 1);
    let msgs = h.draw(&mut s, "/sphere stone", p(5, 5, 5), p(6, 5, 5));
    assert!(
        msgs.contains(&"You tried to draw 2 blocks. You cannot draw more than 1.".to_string()),
        "{:?}",
        msgs
    );
    assert_eq!(h.queue.pending_count(), 0);

    h.draw(&mut s, "/sphere stone", p(5, 5, 5), p(5, 5, 5));
    assert_eq!(h.get(p(5, 5, 5)), block::STONE);
}

#[test]
fn replace_and_replacenot() {
    let h = harness();
    h.queue.world().fill_layers(0..=1, block::DIRT);
    let mut s = h.session(ADMIN);

    h.draw(&mut s, "/replace dirt grass", p(0, 0, 0), p(3, 3, 3));
    assert_eq!(h.queue.pending_count(), 32);
    assert_eq!(h.get(p(0, 1, 0)), block::GRASS);
    assert_eq!(h.get(p(0, 2, 0)), block::AIR);
    assert_eq!(h.get(p(4, 1, 0)), block::DIRT);

    h.draw(&mut s, "/replacenot grass sand", p(0, 0, 0), p(3, 3, 3));
    assert_eq!(h.get(p(0, 1, 0)), block::GRASS);
    assert_eq!(h.get(p(0, 2, 0)), block::SAND);
}

#[test]
fn stair_on_stair_becomes_double() {
    let h = harness();
    h.queue.world().set_block(p(5, 5, 5), block::SLAB);
    let mut s = h.session(ADMIN);

    h.draw(&mut s, "/cuboid slab", p(5, 6, 5), p(5, 6, 5));
    assert_eq!(h.get(p(5, 5, 5)), block::DOUBLE_SLAB);
    assert_eq!(h.get(p(5, 6, 5)), block::AIR);

    h.line(&mut s, "/undo");
    assert_eq!(h.get(p(5, 5, 5)), block::SLAB);
}

#[test]
fn filling_with_what_is_there_changes_nothing() {
    let h = harness();
    h.queue.world().fill_layers(0..=0, block::STONE);
    let mut s = h.session(ADMIN);
    h.draw(&mut s, "/cuboid stone", p(0, 0, 0), p(7, 0, 7));
    assert_eq!(h.queue.pending_count(), 0);
    assert!(s.history.undo.is_empty());
}

// ---------------------------------------------------------------------------
// Limits and permissions
// ---------------------------------------------------------------------------

#[test]
fn over_limit_is_rejected_before_anything_changes() {
    let h = harness();
    let mut s = h.session(BUILDER);
    h.draw(&mut s, "/cuboid stone", p(0, 0, 0), p(1, 1, 1));
    let undo_before = s.history.undo.len();

    let msgs = h.draw(&mut s, "/cuboid stone", p(0, 0, 0), p(31, 31, 31));
    assert!(
        msgs.contains(&"You tried to draw 32768 blocks. You cannot draw more than 20000.".to_string()),
        "{:?}",
        msgs
    );
    assert_eq!(h.queue.pending_count(), 8);
    assert_eq!(s.history.undo.len(), undo_before);
}

#[test]
fn lava_without_permission_enqueues_nothing() {
    let h = harness();
    let mut s = h.session(BUILDER);

    let cascade = h.level.cascade(h.ctx.ranks.as_ref(), &h.ctx.hooks);
    for pos in Cuboid::from_corners(p(0, 0, 0), p(1, 1, 1)).iter_strided(16) {
        let req = PlaceRequest {
            pos,
            block: block::LAVA,
            context: ChangeContext::Draw,
        };
        assert_eq!(
            cascade.can_place(&s.actor(), &req),
            Verdict::BlockTypeDenied {
                block: block::LAVA,
                needs: Capability::PlaceLava
            }
        );
    }

    let msgs = h.draw(&mut s, "/cuboid lava", p(0, 0, 0), p(1, 1, 1));
    assert_eq!(h.queue.pending_count(), 0);
    assert!(msgs.iter().any(|m| m.contains("0 blocks changed")));
    assert!(msgs.iter().any(|m| m.contains("8 blocks were skipped")));
}

#[test]
fn drawing_needs_the_draw_capability() {
    let h = harness();
    let mut s = h.session(Rank(0));
    h.line(&mut s, "/cuboid stone");
    assert!(!s.selection.in_progress());
    let msgs = s.take_messages();
    assert!(msgs[0].contains("not allowed"), "{:?}", msgs);
}

#[test]
fn rank_lost_mid_selection_cancels() {
    let h = harness();
    let mut s = h.session(BUILDER);
    h.line(&mut s, "/cuboid stone");
    h.click(&mut s, p(0, 0, 0));
    s.set_rank(&h.ctx, Rank(0));
    h.click(&mut s, p(2, 2, 2));

    assert!(!s.selection.in_progress());
    assert_eq!(s.selection.marks_expected(), 0);
    assert_eq!(h.queue.pending_count(), 0);
    let msgs = s.take_messages();
    assert!(msgs.iter().any(|m| m.contains("no longer have permission")), "{:?}", msgs);
}

// ---------------------------------------------------------------------------
// Undo / redo
// ---------------------------------------------------------------------------

#[test]
fn undo_then_redo_round_trips_the_grid() {
    let h = harness();
    h.queue.world().fill_layers(0..=1, block::DIRT);
    let region = Cuboid::from_corners(p(0, 0, 0), p(5, 3, 5));
    let before = h.snapshot(region);

    let mut s = h.session(ADMIN);
    h.draw(&mut s, "/cuboid stone", p(1, 1, 1), p(4, 3, 4));
    let after = h.snapshot(region);
    assert_ne!(before, after);

    h.line(&mut s, "/undo");
    assert_eq!(h.snapshot(region), before);
    assert!(s.history.undo.is_empty());
    assert_eq!(s.history.redo.len(), 48);

    h.line(&mut s, "/redo");
    assert_eq!(h.snapshot(region), after);
    assert!(s.history.redo.is_empty());

    // Undo twice toggles: the second undo is served from the redo buffer.
    h.line(&mut s, "/undo");
    h.line(&mut s, "/undo");
    assert_eq!(h.snapshot(region), after);
}

#[test]
fn new_operation_clears_redo() {
    let h = harness();
    let mut s = h.session(ADMIN);
    h.draw(&mut s, "/cuboid stone", p(0, 0, 0), p(1, 1, 1));
    h.line(&mut s, "/undo");
    assert!(!s.history.redo.is_empty());
    h.draw(&mut s, "/cuboid glass", p(5, 5, 5), p(6, 6, 6));
    assert!(s.history.redo.is_empty());
    assert_eq!(s.history.undo.len(), 8);
}

#[test]
fn nothing_to_undo() {
    let h = harness();
    let mut s = h.session(ADMIN);
    h.line(&mut s, "/undo");
    assert_eq!(s.take_messages(), vec!["Nothing to undo.".to_string()]);
}

#[test]
fn overflowing_the_undo_cap_makes_the_draw_irreversible() {
    let mut config = CoreConfig::default();
    config.max_undo_count = 2_000;
    let h = harness_with(config);
    let mut s = h.session(ADMIN);

    // 30 x 10 x 10 = 3000 cells against a cap of 2000.
    let msgs = h.draw(&mut s, "/cuboid stone", p(0, 0, 0), p(29, 9, 9));
    assert_eq!(h.queue.pending_count(), 3_000);
    assert!(s.history.undo.is_empty());
    assert!(s.history.undo.is_irreversible());
    assert!(msgs.iter().any(|m| m.contains("cannot be undone")), "{:?}", msgs);

    h.line(&mut s, "/undo");
    assert_eq!(s.take_messages(), vec!["Your last operation was too large to undo.".to_string()]);
    assert_eq!(h.get(p(0, 0, 0)), block::STONE);
    assert_eq!(h.ctx.metrics.snapshot().undo_overflows, 1);
}

#[test]
fn clearundo_needs_confirmation() {
    let h = harness();
    let mut s = h.session(ADMIN);
    h.draw(&mut s, "/cuboid stone", p(0, 0, 0), p(1, 1, 1));

    h.line(&mut s, "/clearundo");
    assert!(!s.history.is_empty());
    assert!(s.has_pending_confirmation());
    h.line(&mut s, "/confirm");
    assert!(s.history.is_empty());
    assert!(!s.has_pending_confirmation());
}

// ---------------------------------------------------------------------------
// Selection modes
// ---------------------------------------------------------------------------

#[test]
fn static_mode_rearms_the_selection() {
    let h = harness();
    let mut s = h.session(ADMIN);
    h.line(&mut s, "/static");
    h.draw(&mut s, "/cuboid stone", p(0, 0, 0), p(0, 0, 1));
    assert!(s.selection.in_progress());
    assert_eq!(s.selection.marks_expected(), 2);

    h.click(&mut s, p(5, 0, 0));
    h.click(&mut s, p(5, 0, 1));
    assert_eq!(h.get(p(5, 0, 1)), block::STONE);
    assert!(s.selection.in_progress());

    h.line(&mut s, "/abort");
    assert!(!s.selection.in_progress());
}

#[test]
fn manual_marks_wait_for_go() {
    let h = harness();
    let mut s = h.session(ADMIN);
    h.line(&mut s, "/cuboid stone");
    s.move_to(&h.ctx, p(1, 1, 1));
    h.line(&mut s, "/mark");
    s.move_to(&h.ctx, p(2, 2, 2));
    h.line(&mut s, "/mark");
    assert_eq!(h.queue.pending_count(), 0);
    assert!(s.selection.in_progress());

    h.line(&mut s, "/mark go");
    assert_eq!(h.queue.pending_count(), 8);
    assert!(!s.selection.in_progress());
}

#[test]
fn bindings_apply_to_draw_targets() {
    let h = harness();
    let mut s = h.session(ADMIN);
    h.line(&mut s, "/bind stone obsidian");
    h.draw(&mut s, "/cuboid stone", p(0, 0, 0), p(0, 0, 0));
    assert_eq!(h.get(p(0, 0, 0)), block::OBSIDIAN);
}
