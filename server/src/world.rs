//! The `World`: single owner of every piece of mutable game state.
//!
//! There is exactly one logical thread of control mutating this; every
//! subsystem takes `&mut World` (or a disjoint borrow of its fields)
//! explicitly. The catalog inside is read-only after boot.

use std::collections::HashSet;

use deephold_core::catalog::Catalog;
use deephold_core::constants::{LEVEL_SPEED_BASE, WILD_X, WILD_Y};
use deephold_core::rng::GameRng;
use deephold_core::types::{
    DungeonFlags, KindId, MonsterRace, PlayerId, RaceId, WorldPos,
};

use crate::config::Config;
use crate::items::Item;
use crate::levels::LevelStore;
use crate::monsters::Monster;
use crate::net::Observation;
use crate::player::Players;
use crate::pool::Pool;

/// Per-race live bookkeeping, parallel to the race catalog.
#[derive(Clone, Copy, Debug, Default)]
pub struct RaceLive {
    pub cur_num: u16,
    /// Memorisation counters for the knowledge surface.
    pub sights: u32,
    pub kills: u32,
}

/// Global administrative switches, mutated by the admin surface and
/// checked at guard sites.
#[derive(Debug, Default)]
pub struct Admin {
    /// 0 = booting, 1 = running, 2+ = shutdown phases.
    pub runlevel: u8,
    /// Bypass placement guards for admin summons.
    pub summon_override: bool,
    /// Uniques whose deaths are announced to staff.
    pub watch_uniques: Vec<RaceId>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WildTerrain {
    #[default]
    Plain,
    Forest,
    Mountain,
    Swamp,
    Shore,
}

/// An overworld tile's anchor for a dungeon or tower.
#[derive(Clone, Debug)]
pub struct DungeonHandle {
    /// Index into the dungeon-type catalog.
    pub type_id: u16,
    /// Raw `DungeonFlags`.
    pub flags: u16,
    /// Deepest floor this handle reaches.
    pub max_depth: i32,
}

impl DungeonHandle {
    pub fn has(&self, f: DungeonFlags) -> bool {
        self.flags & f.bits() != 0
    }
}

/// One tile of the fixed 2-D overworld grid.
#[derive(Clone, Debug, Default)]
pub struct WildTile {
    pub terrain: WildTerrain,
    pub town: bool,
    /// Radius of civilised influence around a town.
    pub radius: i32,
    pub dungeon: Option<DungeonHandle>,
    pub tower: Option<DungeonHandle>,
}

pub struct Wilderness {
    tiles: Vec<WildTile>,
}

impl Wilderness {
    pub fn new() -> Wilderness {
        Wilderness {
            tiles: vec![WildTile::default(); (WILD_X * WILD_Y) as usize],
        }
    }

    pub fn get(&self, wx: i16, wy: i16) -> &WildTile {
        &self.tiles[(wy as i32 * WILD_X + wx as i32) as usize]
    }

    pub fn get_mut(&mut self, wx: i16, wy: i16) -> &mut WildTile {
        &mut self.tiles[(wy as i32 * WILD_X + wx as i32) as usize]
    }

    /// The dungeon/tower handle a sub-surface position belongs to.
    pub fn handle(&self, wpos: WorldPos) -> Option<&DungeonHandle> {
        let tile = self.get(wpos.wx, wpos.wy);
        if wpos.wz < 0 {
            tile.dungeon.as_ref()
        } else if wpos.wz > 0 {
            tile.tower.as_ref()
        } else {
            None
        }
    }
}

pub struct World {
    pub cfg: Config,
    pub catalog: Catalog,
    pub rng: GameRng,
    pub world_seed: u64,
    /// Scheduler ticks since boot; the only clock game rules use.
    pub tick: i64,

    pub wild: Wilderness,
    pub levels: LevelStore,
    pub monsters: Pool<Monster>,
    pub items: Pool<Item>,
    pub players: Players,

    /// Parallel to `catalog.races`.
    pub race_live: Vec<RaceLive>,
    /// Artifact kinds currently in circulation; preservation removes the
    /// entry so the artifact can generate again.
    pub generated_artifacts: HashSet<KindId>,

    pub admin: Admin,
    /// Re-entrance guard: generation and placement are refused while the
    /// pools are being compacted.
    pub compacting: bool,
}

impl World {
    pub fn new(cfg: Config, catalog: Catalog, world_seed: u64) -> World {
        let race_count = catalog.races.len();
        let max_monsters = cfg.max_monsters;
        let max_items = cfg.max_items;
        World {
            cfg,
            catalog,
            rng: GameRng::seeded(world_seed ^ 0x9e37_79b9_7f4a_7c15),
            world_seed,
            tick: 0,
            wild: Wilderness::new(),
            levels: LevelStore::new(),
            monsters: Pool::new(max_monsters),
            items: Pool::new(max_items),
            players: Players::new(),
            race_live: vec![RaceLive::default(); race_count],
            generated_artifacts: HashSet::new(),
            admin: Admin::default(),
            compacting: false,
        }
    }

    /// Game-mechanic depth of a floor: the handle's base depth plus floors
    /// descended. Surface positions are depth 0.
    pub fn depth_at(&self, wpos: WorldPos) -> i32 {
        if wpos.wz == 0 {
            return 0;
        }
        match self.wild.handle(wpos) {
            Some(h) => self.catalog.dungeon(h.type_id).base_depth + wpos.floor() - 1,
            None => wpos.floor(),
        }
    }

    /// Per-level time rate: deeper floors run faster.
    pub fn level_speed(&self, wpos: WorldPos) -> i32 {
        LEVEL_SPEED_BASE + self.depth_at(wpos)
    }

    /// The effective blueprint for a live monster: race plus ego, derived
    /// on demand. Hot paths snapshot what they need at birth instead.
    pub fn effective_race(&self, r_idx: RaceId, ego: u16) -> MonsterRace {
        deephold_core::types::effective_race(
            self.catalog.race(r_idx),
            self.catalog.ego(ego),
        )
    }

    /// Send an observation to every connected player on a floor, in
    /// mutation order.
    pub fn broadcast_level(&self, wpos: WorldPos, obs: &Observation) {
        for p in self.players.iter() {
            if p.wpos == wpos && p.connected {
                p.observe(obs.clone());
            }
        }
    }

    pub fn message_player(&self, id: PlayerId, text: &str) {
        if let Some(p) = self.players.get(id) {
            p.message(text);
        }
    }

    /// Seconds expressed in scheduler ticks.
    pub fn secs_to_ticks(&self, secs: i64) -> i64 {
        secs * self.cfg.fps as i64
    }
}

/// Anchor the shipped overworld: the capital with the Underhalls below
/// it, the Barrow-downs to the north-west, the Drowned Deeps by the
/// shore. The data-file collaborator replaces this wholesale when real
/// overworld data is loaded.
pub fn seed_overworld(world: &mut World) {
    let capital = world.wild.get_mut(32, 32);
    capital.town = true;
    capital.radius = 8;
    capital.dungeon = Some(DungeonHandle {
        type_id: 0,
        flags: DungeonFlags::RANDOM.bits(),
        max_depth: 100,
    });

    let barrows = world.wild.get_mut(20, 20);
    barrows.terrain = WildTerrain::Swamp;
    barrows.dungeon = Some(DungeonHandle {
        type_id: 1,
        flags: (DungeonFlags::RANDOM | DungeonFlags::NOMAP).bits(),
        max_depth: 35,
    });

    let deeps = world.wild.get_mut(40, 40);
    deeps.terrain = WildTerrain::Shore;
    deeps.dungeon = Some(DungeonHandle {
        type_id: 2,
        flags: DungeonFlags::RANDOM.bits(),
        max_depth: 50,
    });

    let spire = world.wild.get_mut(32, 30);
    spire.terrain = WildTerrain::Mountain;
    spire.tower = Some(DungeonHandle {
        type_id: 0,
        flags: (DungeonFlags::RANDOM | DungeonFlags::TOWER).bits(),
        max_depth: 20,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn test_world() -> World {
        let mut world = World::new(Config::default(), Catalog::builtin(), 12345);
        // One anchored dungeon for depth math.
        world.wild.get_mut(4, 4).dungeon = Some(DungeonHandle {
            type_id: 0,
            flags: DungeonFlags::RANDOM.bits(),
            max_depth: 100,
        });
        world
    }

    #[test]
    fn depth_tracks_handle_base() {
        let world = test_world();
        assert_eq!(world.depth_at(WorldPos::new(4, 4, 0)), 0);
        // Underhalls base depth is 1: first floor is depth 1.
        assert_eq!(world.depth_at(WorldPos::new(4, 4, -1)), 1);
        assert_eq!(world.depth_at(WorldPos::new(4, 4, -20)), 20);
    }

    #[test]
    fn deeper_levels_run_faster() {
        let world = test_world();
        let surface = world.level_speed(WorldPos::new(4, 4, 0));
        let deep = world.level_speed(WorldPos::new(4, 4, -30));
        assert!(deep > surface);
    }
}
