//! The permission cascade: decides whether one block mutation is allowed.
//!
//! Checks run in a fixed order and stop at the first conclusive answer:
//! bounds, special block types, zones, world security, rank. Registered
//! [`PlacementHook`]s then see the verdict and may overwrite it.
//!
//! Evaluation is read-only apart from the hooks and is cheap enough to run
//! once per cell inside draw loops.

use std::fmt;
use std::sync::Arc;

use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::position::BlockPos;
use serde::{Deserialize, Serialize};

use crate::block;
use crate::config::RankConfig;
use crate::queue::Grid;

// ── Identity and capabilities ───────────────────────────────────────────

/// Ordered authorization level. Higher ranks outrank lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rank(pub i32);

/// A single thing a rank may or may not be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Build,
    Delete,
    PlaceAdmin,
    DeleteAdmin,
    PlaceWater,
    PlaceLava,
    /// Use region drawing commands.
    Draw,
    /// Use copy/cut/paste.
    Copy,
}

/// Who is asking. A cheap snapshot of the session's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: u64,
    pub name: String,
    pub rank: Rank,
}

/// Rank/capability lookups. Implemented outside the core.
pub trait RankTable: Send + Sync {
    fn has(&self, rank: Rank, cap: Capability) -> bool;

    /// Most cells a single operation may affect; 0 means unlimited.
    fn draw_limit(&self, rank: Rank) -> u64;

    fn rank_name(&self, rank: Rank) -> String {
        format!("rank {}", rank.0)
    }
}

/// A [`RankTable`] built from [`RankConfig`] rows. A rank uses the row with
/// the highest `rank` not above it; ranks below every row have no capabilities.
pub struct ConfiguredRanks {
    rows: Vec<RankConfig>,
}

impl ConfiguredRanks {
    pub fn new(mut rows: Vec<RankConfig>) -> Self {
        rows.sort_by_key(|r| r.rank);
        Self { rows }
    }

    fn row(&self, rank: Rank) -> Option<&RankConfig> {
        self.rows.iter().rev().find(|r| r.rank <= rank)
    }
}

impl RankTable for ConfiguredRanks {
    fn has(&self, rank: Rank, cap: Capability) -> bool {
        self.row(rank).is_some_and(|r| r.capabilities.contains(&cap))
    }

    fn draw_limit(&self, rank: Rank) -> u64 {
        // Ranks below every row may only ever touch a single cell.
        self.row(rank).map_or(1, |r| r.draw_limit)
    }

    fn rank_name(&self, rank: Rank) -> String {
        self.row(rank)
            .map_or_else(|| format!("rank {}", rank.0), |r| r.name.clone())
    }
}

// ── Zone and world collaborators ────────────────────────────────────────

/// Outcome of a zone lookup for one coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneRule {
    Allow { zone: Arc<str> },
    Deny { zone: Arc<str> },
    NoRule,
}

pub trait ZoneLookup: Send + Sync {
    fn check_zone(&self, pos: BlockPos, actor: &Actor) -> ZoneRule;
}

/// A level without zones.
pub struct NoZones;

impl ZoneLookup for NoZones {
    fn check_zone(&self, _pos: BlockPos, _actor: &Actor) -> ZoneRule {
        ZoneRule::NoRule
    }
}

/// World-wide build access for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildAccess {
    /// Defer to the rank check.
    Allowed,
    /// Explicitly whitelisted: skip the rank check.
    Whitelisted,
    Denied,
}

pub trait WorldSecurity: Send + Sync {
    fn check_build_access(&self, actor: &Actor) -> BuildAccess;
}

/// A level anyone may build in, subject to rank.
pub struct OpenWorld;

impl WorldSecurity for OpenWorld {
    fn check_build_access(&self, _actor: &Actor) -> BuildAccess {
        BuildAccess::Allowed
    }
}

// ── Requests and verdicts ───────────────────────────────────────────────

/// What produced a mutation. Passed through to hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeContext {
    Manual,
    Draw,
    Paste,
    Undo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceRequest {
    pub pos: BlockPos,
    pub block: BlockId,
    pub context: ChangeContext,
}

/// Result of the cascade. Every denial names what blocked it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    OutOfBounds { pos: BlockPos },
    /// `block` needs `needs`, which the rank lacks.
    BlockTypeDenied { block: BlockId, needs: Capability },
    RankDenied { rank: Rank, needs: Capability },
    WorldDenied { level: Arc<str> },
    ZoneDenied { zone: Arc<str> },
    PluginDenied { reason: String },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }

    /// User-facing explanation. Empty for `Allowed`.
    pub fn describe(&self) -> String {
        match self {
            Verdict::Allowed => String::new(),
            Verdict::OutOfBounds { pos } => {
                format!("({}, {}, {}) is outside the world.", pos.x, pos.y, pos.z)
            }
            Verdict::BlockTypeDenied { block, needs } => match needs {
                Capability::DeleteAdmin => format!("You cannot delete {}.", block::name(*block)),
                _ => format!("You are not allowed to place {}.", block::name(*block)),
            },
            Verdict::RankDenied { needs: Capability::Delete, .. } => {
                "Your rank cannot delete blocks.".into()
            }
            Verdict::RankDenied { .. } => "Your rank cannot build.".into(),
            Verdict::WorldDenied { level } => format!("You are not allowed to build in {}.", level),
            Verdict::ZoneDenied { zone } => format!("You may not build in zone {}.", zone),
            Verdict::PluginDenied { reason } => reason.clone(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allowed => f.write_str("allowed"),
            other => f.write_str(&other.describe()),
        }
    }
}

/// Extension point run after the built-in checks. Whatever the hook leaves
/// in `verdict` is final.
pub trait PlacementHook: Send + Sync {
    fn on_place(&self, actor: &Actor, req: &PlaceRequest, verdict: &mut Verdict);
}

// ── The cascade ─────────────────────────────────────────────────────────

/// Borrowed view of everything one evaluation needs.
pub struct Cascade<'a> {
    pub grid: &'a dyn Grid,
    pub level: &'a Arc<str>,
    pub zones: &'a dyn ZoneLookup,
    pub security: &'a dyn WorldSecurity,
    pub ranks: &'a dyn RankTable,
    pub hooks: &'a [Arc<dyn PlacementHook>],
}

impl Cascade<'_> {
    /// Read the current block and evaluate.
    pub fn can_place(&self, actor: &Actor, req: &PlaceRequest) -> Verdict {
        let existing = self.grid.get_block(req.pos);
        self.can_place_over(actor, req, existing)
    }

    /// Evaluate against an already-read `existing` block (`None` = off-grid).
    pub fn can_place_over(&self, actor: &Actor, req: &PlaceRequest, existing: Option<BlockId>) -> Verdict {
        let mut verdict = self.evaluate(actor, req, existing);
        for hook in self.hooks {
            hook.on_place(actor, req, &mut verdict);
        }
        verdict
    }

    fn evaluate(&self, actor: &Actor, req: &PlaceRequest, existing: Option<BlockId>) -> Verdict {
        let Some(existing) = existing else {
            return Verdict::OutOfBounds { pos: req.pos };
        };
        let new = req.block;
        let has = |cap: Capability| self.ranks.has(actor.rank, cap);

        let gate = if block::is_admin(new) {
            Some(Capability::PlaceAdmin)
        } else if block::is_water(new) {
            Some(Capability::PlaceWater)
        } else if block::is_lava(new) {
            Some(Capability::PlaceLava)
        } else {
            None
        };
        if let Some(needs) = gate.filter(|c| !has(*c)) {
            return Verdict::BlockTypeDenied { block: new, needs };
        }
        if block::is_admin(existing) && existing != new && !has(Capability::DeleteAdmin) {
            return Verdict::BlockTypeDenied {
                block: existing,
                needs: Capability::DeleteAdmin,
            };
        }

        match self.zones.check_zone(req.pos, actor) {
            ZoneRule::Allow { .. } => return Verdict::Allowed,
            ZoneRule::Deny { zone } => return Verdict::ZoneDenied { zone },
            ZoneRule::NoRule => {}
        }

        match self.security.check_build_access(actor) {
            BuildAccess::Denied => {
                return Verdict::WorldDenied {
                    level: Arc::clone(self.level),
                };
            }
            BuildAccess::Whitelisted => return Verdict::Allowed,
            BuildAccess::Allowed => {}
        }

        if !(new.is_air() || has(Capability::Build)) {
            return Verdict::RankDenied {
                rank: actor.rank,
                needs: Capability::Build,
            };
        }
        if !(existing.is_air() || has(Capability::Delete)) {
            return Verdict::RankDenied {
                rank: actor.rank,
                needs: Capability::Delete,
            };
        }
        Verdict::Allowed
    }
}
