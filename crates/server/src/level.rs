//! A named level: one grid plus the zone and security rules that apply to it.

use std::sync::Arc;

use blockforge_engine::world::{Dimensions, World};
use tokio::sync::broadcast;

use crate::event_bus::WorldChangeBatch;
use crate::permission::{Cascade, NoZones, OpenWorld, PlacementHook, RankTable, WorldSecurity, ZoneLookup};
use crate::queue::{BlockQueue, Grid};

pub struct Level {
    pub name: Arc<str>,
    pub grid: Arc<dyn Grid>,
    pub zones: Arc<dyn ZoneLookup>,
    pub security: Arc<dyn WorldSecurity>,
}

impl Level {
    /// A level with no zones and open build access.
    pub fn new(name: impl Into<Arc<str>>, grid: Arc<dyn Grid>) -> Self {
        Self {
            name: name.into(),
            grid,
            zones: Arc::new(NoZones),
            security: Arc::new(OpenWorld),
        }
    }

    /// Allocate an empty in-memory world of `dims` behind a fresh
    /// [`BlockQueue`]. The queue is returned too so the caller can flush it.
    pub fn in_memory(
        name: impl Into<Arc<str>>,
        dims: Dimensions,
        bus: broadcast::Sender<WorldChangeBatch>,
    ) -> (Self, Arc<BlockQueue>) {
        let name: Arc<str> = name.into();
        let world = Arc::new(World::new(dims));
        let queue = Arc::new(BlockQueue::new(Arc::clone(&name), world, bus));
        let level = Self::new(name, Arc::clone(&queue) as Arc<dyn Grid>);
        (level, queue)
    }

    pub fn with_zones(mut self, zones: Arc<dyn ZoneLookup>) -> Self {
        self.zones = zones;
        self
    }

    pub fn with_security(mut self, security: Arc<dyn WorldSecurity>) -> Self {
        self.security = security;
        self
    }

    pub fn cascade<'a>(&'a self, ranks: &'a dyn RankTable, hooks: &'a [Arc<dyn PlacementHook>]) -> Cascade<'a> {
        Cascade {
            grid: self.grid.as_ref(),
            level: &self.name,
            zones: self.zones.as_ref(),
            security: self.security.as_ref(),
            ranks,
            hooks,
        }
    }
}
