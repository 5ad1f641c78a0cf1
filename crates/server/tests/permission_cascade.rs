//! Permission cascade: ordering of the checks, every verdict, and hook
//! overrides.

use std::sync::Arc;

use blockforge_engine::world::Dimensions;
use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::position::BlockPos;
use blockforge_engine::world::region::Cuboid;

use blockforge_server::block;
use blockforge_server::config::CoreConfig;
use blockforge_server::event_bus;
use blockforge_server::level::Level;
use blockforge_server::permission::{
    Actor, BuildAccess, Capability, ChangeContext, ConfiguredRanks, PlaceRequest, PlacementHook, Rank, RankTable,
    Verdict, WorldSecurity, ZoneLookup, ZoneRule,
};
use blockforge_server::queue::{BlockQueue, Grid};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const NOBODY: Rank = Rank(-5);
const GUEST: Rank = Rank(0);
const BUILDER: Rank = Rank(30);
const ADMIN: Rank = Rank(100);

fn ranks() -> ConfiguredRanks {
    ConfiguredRanks::new(CoreConfig::default().ranks)
}

fn level() -> (Level, Arc<BlockQueue>) {
    Level::in_memory("test", Dimensions::new(16, 16, 16), event_bus::channel())
}

fn actor(rank: Rank) -> Actor {
    Actor {
        id: 1,
        name: "tester".into(),
        rank,
    }
}

fn place(pos: BlockPos, block: BlockId) -> PlaceRequest {
    PlaceRequest {
        pos,
        block,
        context: ChangeContext::Manual,
    }
}

fn check(level: &Level, rank: Rank, req: PlaceRequest) -> Verdict {
    let ranks = ranks();
    level.cascade(&ranks, &[]).can_place(&actor(rank), &req)
}

struct BoxZone {
    region: Cuboid,
    allow: bool,
}

impl ZoneLookup for BoxZone {
    fn check_zone(&self, pos: BlockPos, _actor: &Actor) -> ZoneRule {
        if !self.region.contains(pos) {
            return ZoneRule::NoRule;
        }
        let zone: Arc<str> = Arc::from("spawn");
        if self.allow {
            ZoneRule::Allow { zone }
        } else {
            ZoneRule::Deny { zone }
        }
    }
}

struct FixedAccess(BuildAccess);

impl WorldSecurity for FixedAccess {
    fn check_build_access(&self, _actor: &Actor) -> BuildAccess {
        self.0
    }
}

fn spawn_zone(allow: bool) -> Arc<dyn ZoneLookup> {
    Arc::new(BoxZone {
        region: Cuboid::from_corners(BlockPos::new(0, 0, 0), BlockPos::new(3, 3, 3)),
        allow,
    })
}

// ---------------------------------------------------------------------------
// Built-in checks
// ---------------------------------------------------------------------------

#[test]
fn outside_the_grid_is_out_of_bounds() {
    let (level, _q) = level();
    let pos = BlockPos::new(16, 0, 0);
    assert_eq!(check(&level, ADMIN, place(pos, block::STONE)), Verdict::OutOfBounds { pos });
}

#[test]
fn special_blocks_need_their_capability() {
    let (level, _q) = level();
    let pos = BlockPos::new(1, 1, 1);
    assert_eq!(
        check(&level, GUEST, place(pos, block::WATER)),
        Verdict::BlockTypeDenied {
            block: block::WATER,
            needs: Capability::PlaceWater
        }
    );
    assert_eq!(
        check(&level, BUILDER, place(pos, block::STILL_LAVA)),
        Verdict::BlockTypeDenied {
            block: block::STILL_LAVA,
            needs: Capability::PlaceLava
        }
    );
    assert_eq!(
        check(&level, BUILDER, place(pos, block::BEDROCK)),
        Verdict::BlockTypeDenied {
            block: block::BEDROCK,
            needs: Capability::PlaceAdmin
        }
    );
    assert!(check(&level, BUILDER, place(pos, block::WATER)).is_allowed());
}

#[test]
fn deleting_admin_blocks_needs_delete_admin() {
    let (level, q) = level();
    let pos = BlockPos::new(2, 0, 2);
    q.world().set_block(pos, block::BEDROCK);
    assert_eq!(
        check(&level, Rank(80), place(pos, block::AIR)),
        Verdict::BlockTypeDenied {
            block: block::BEDROCK,
            needs: Capability::DeleteAdmin
        }
    );
    assert!(check(&level, ADMIN, place(pos, block::AIR)).is_allowed());
}

#[test]
fn rank_without_build_or_delete() {
    let (level, q) = level();
    let empty = BlockPos::new(5, 5, 5);
    let full = BlockPos::new(6, 5, 5);
    q.world().set_block(full, block::STONE);

    assert_eq!(
        check(&level, NOBODY, place(empty, block::STONE)),
        Verdict::RankDenied {
            rank: NOBODY,
            needs: Capability::Build
        }
    );
    assert_eq!(
        check(&level, NOBODY, place(full, block::AIR)),
        Verdict::RankDenied {
            rank: NOBODY,
            needs: Capability::Delete
        }
    );
    // Air over air touches nothing either capability guards.
    assert!(check(&level, NOBODY, place(empty, block::AIR)).is_allowed());
}

#[test]
fn zone_rules_override_world_and_rank() {
    let (level, _q) = level();
    let level = level
        .with_zones(spawn_zone(true))
        .with_security(Arc::new(FixedAccess(BuildAccess::Denied)));

    // Inside the zone: allowed despite the world and the rank.
    assert!(check(&level, NOBODY, place(BlockPos::new(1, 1, 1), block::STONE)).is_allowed());
    // Outside: world security applies.
    assert_eq!(
        check(&level, ADMIN, place(BlockPos::new(8, 8, 8), block::STONE)),
        Verdict::WorldDenied { level: Arc::from("test") }
    );
}

#[test]
fn zone_deny_beats_rank() {
    let (level, _q) = level();
    let level = level.with_zones(spawn_zone(false));
    assert_eq!(
        check(&level, ADMIN, place(BlockPos::new(0, 0, 0), block::STONE)),
        Verdict::ZoneDenied { zone: Arc::from("spawn") }
    );
}

#[test]
fn block_type_gate_runs_before_zones() {
    let (level, _q) = level();
    let level = level.with_zones(spawn_zone(true));
    assert!(matches!(
        check(&level, GUEST, place(BlockPos::new(1, 1, 1), block::LAVA)),
        Verdict::BlockTypeDenied { .. }
    ));
}

#[test]
fn whitelisted_world_skips_rank_check() {
    let (level, _q) = level();
    let level = level.with_security(Arc::new(FixedAccess(BuildAccess::Whitelisted)));
    assert!(check(&level, NOBODY, place(BlockPos::new(4, 4, 4), block::STONE)).is_allowed());
}

#[test]
fn pending_writes_are_seen_by_the_cascade() {
    let (level, q) = level();
    let pos = BlockPos::new(3, 3, 3);
    q.queue_mutation(pos, block::BEDROCK);
    assert_eq!(
        check(&level, BUILDER, place(pos, block::AIR)),
        Verdict::BlockTypeDenied {
            block: block::BEDROCK,
            needs: Capability::DeleteAdmin
        }
    );
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

struct NoSky;

impl PlacementHook for NoSky {
    fn on_place(&self, _actor: &Actor, req: &PlaceRequest, verdict: &mut Verdict) {
        if req.pos.y > 10 {
            *verdict = Verdict::PluginDenied {
                reason: "Too high.".into(),
            };
        }
    }
}

struct AllowAll;

impl PlacementHook for AllowAll {
    fn on_place(&self, _actor: &Actor, _req: &PlaceRequest, verdict: &mut Verdict) {
        *verdict = Verdict::Allowed;
    }
}

#[test]
fn hook_can_deny() {
    let (level, _q) = level();
    let ranks = ranks();
    let hooks: Vec<Arc<dyn PlacementHook>> = vec![Arc::new(NoSky)];
    let cascade = level.cascade(&ranks, &hooks);
    let a = actor(ADMIN);
    assert!(cascade.can_place(&a, &place(BlockPos::new(1, 10, 1), block::STONE)).is_allowed());
    let denied = cascade.can_place(&a, &place(BlockPos::new(1, 11, 1), block::STONE));
    assert_eq!(denied.describe(), "Too high.");
}

#[test]
fn hook_override_is_unconditional() {
    let (level, _q) = level();
    let ranks = ranks();
    let hooks: Vec<Arc<dyn PlacementHook>> = vec![Arc::new(AllowAll)];
    let cascade = level.cascade(&ranks, &hooks);
    let v = cascade.can_place(&actor(GUEST), &place(BlockPos::new(1, 1, 1), block::LAVA));
    assert_eq!(v, Verdict::Allowed);
}

#[test]
fn later_hooks_see_earlier_verdicts() {
    let (level, _q) = level();
    let ranks = ranks();
    let hooks: Vec<Arc<dyn PlacementHook>> = vec![Arc::new(AllowAll), Arc::new(NoSky)];
    let cascade = level.cascade(&ranks, &hooks);
    let v = cascade.can_place(&actor(GUEST), &place(BlockPos::new(1, 12, 1), block::LAVA));
    assert!(matches!(v, Verdict::PluginDenied { .. }));
}

// ---------------------------------------------------------------------------
// Rank table and messages
// ---------------------------------------------------------------------------

#[test]
fn configured_ranks_use_nearest_row_below() {
    let ranks = ranks();
    assert!(ranks.has(Rank(45), Capability::Draw));
    assert!(!ranks.has(Rank(45), Capability::PlaceLava));
    assert_eq!(ranks.draw_limit(Rank(45)), 20_000);
    assert_eq!(ranks.draw_limit(ADMIN), 0);
    assert_eq!(ranks.rank_name(Rank(85)), "operator");
    assert!(!ranks.has(NOBODY, Capability::Build));
    assert_eq!(ranks.draw_limit(NOBODY), 1);
}

#[test]
fn denials_explain_themselves() {
    let lava = Verdict::BlockTypeDenied {
        block: block::LAVA,
        needs: Capability::PlaceLava,
    };
    assert_eq!(lava.describe(), "You are not allowed to place lava.");
    let bedrock = Verdict::BlockTypeDenied {
        block: block::BEDROCK,
        needs: Capability::DeleteAdmin,
    };
    assert_eq!(bedrock.describe(), "You cannot delete bedrock.");
    assert_eq!(Verdict::Allowed.to_string(), "allowed");
    assert_eq!(
        Verdict::OutOfBounds {
            pos: BlockPos::new(1, 2, 3)
        }
        .describe(),
        "(1, 2, 3) is outside the world."
    );
}
