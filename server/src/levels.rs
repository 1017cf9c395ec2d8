//! The level store: lazy allocation and eviction of floors.
//!
//! A floor's record is created on first arrival, its grid generated on
//! the same event, and both are torn down once no player stands there, no
//! pin holds it, and the staleness clock has run out. Deep logouts pin
//! their floor for a depth-scaled while so the character's surroundings
//! survive a reconnect.

use std::collections::HashMap;

use deephold_core::types::{feat, DungeonFlags, LevelFlags, WorldPos};
use log::{debug, info, warn};
use thiserror::Error;

use crate::cave::Grid;
use crate::generate::{self, GenParams};
use crate::world::World;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AcquireError {
    /// No handle reaches this position; nothing can exist here.
    #[error("no floor can exist at {0:?}")]
    BadPosition(WorldPos),
    /// The generator gave up after bounded retries, or the pools are
    /// starved. The triggering action aborts; nothing half-exists.
    #[error("out of memory generating {0:?}")]
    OutOfMemory(WorldPos),
}

/// One floor's record. The grid is present only while the floor is live.
#[derive(Debug, Default)]
pub struct Level {
    pub grid: Option<Grid>,
    /// Raw `LevelFlags`, rolled at generation.
    pub flags: u16,
    pub depth: i32,
    pub dungeon_type: u16,
    /// Game turns elapsed on this floor; advances at the floor's rate.
    pub turn: i64,
    /// Static-pinning refcount.
    pub pins: u32,
    /// Tick until which a logout pin holds regardless of refcount.
    pub static_until: i64,
    pub created_at: i64,
    /// Last tick a player stood here.
    pub last_used: i64,
    /// Arrival cells recorded by the generator.
    pub up_landing: Option<(i32, i32)>,
    pub down_landing: Option<(i32, i32)>,
}

impl Level {
    pub fn has_flag(&self, f: LevelFlags) -> bool {
        self.flags & f.bits() != 0
    }
}

#[derive(Default)]
pub struct LevelStore {
    levels: HashMap<WorldPos, Level>,
}

impl LevelStore {
    pub fn new() -> LevelStore {
        LevelStore { levels: HashMap::new() }
    }

    pub fn get(&self, wpos: WorldPos) -> Option<&Level> {
        self.levels.get(&wpos)
    }

    pub fn get_mut(&mut self, wpos: WorldPos) -> Option<&mut Level> {
        self.levels.get_mut(&wpos)
    }

    pub fn grid(&self, wpos: WorldPos) -> Option<&Grid> {
        self.levels.get(&wpos)?.grid.as_ref()
    }

    pub fn grid_mut(&mut self, wpos: WorldPos) -> Option<&mut Grid> {
        self.levels.get_mut(&wpos)?.grid.as_mut()
    }

    pub fn is_allocated(&self, wpos: WorldPos) -> bool {
        self.grid(wpos).is_some()
    }

    pub fn insert(&mut self, wpos: WorldPos, level: Level) {
        self.levels.insert(wpos, level);
    }

    pub fn remove(&mut self, wpos: WorldPos) -> Option<Level> {
        self.levels.remove(&wpos)
    }

    pub fn positions(&self) -> Vec<WorldPos> {
        self.levels.keys().copied().collect()
    }

    /// Allocated sub-surface floors belonging to one overworld tile. The
    /// surface itself belongs to the tile, not to any handle.
    pub fn floors_of_tile(&self, wx: i16, wy: i16) -> usize {
        self.levels
            .iter()
            .filter(|(p, l)| p.wx == wx && p.wy == wy && p.wz != 0 && l.grid.is_some())
            .count()
    }
}

/// Can a floor exist at this position at all?
fn position_valid(world: &World, wpos: WorldPos) -> bool {
    if wpos.wx < 0
        || wpos.wy < 0
        || wpos.wx as i32 >= deephold_core::constants::WILD_X
        || wpos.wy as i32 >= deephold_core::constants::WILD_Y
    {
        return false;
    }
    if wpos.wz == 0 {
        return true;
    }
    match world.wild.handle(wpos) {
        Some(h) => {
            if h.has(DungeonFlags::DELETED) {
                return false;
            }
            wpos.floor() <= h.max_depth
        }
        None => false,
    }
}

/// Allocate, generate and publish a floor. Idempotent when it already
/// exists. On failure nothing is half-initialised: callers abort the
/// stair descent or recall that triggered the call.
pub fn acquire(world: &mut World, wpos: WorldPos) -> Result<(), AcquireError> {
    if world.levels.is_allocated(wpos) {
        return Ok(());
    }
    if !position_valid(world, wpos) {
        return Err(AcquireError::BadPosition(wpos));
    }
    if world.compacting {
        warn!("acquire({:?}) refused during compaction", wpos);
        return Err(AcquireError::OutOfMemory(wpos));
    }

    let depth = world.depth_at(wpos);
    let dungeon_type = world.wild.handle(wpos).map_or(0, |h| h.type_id);
    let params = GenParams { wpos, depth, dungeon_type };

    generate::build_level(world, &params).map_err(|e| {
        warn!("Generation failed at {:?}: {}", wpos, e);
        AcquireError::OutOfMemory(wpos)
    })?;

    let tick = world.tick;
    if let Some(level) = world.levels.get_mut(wpos) {
        level.created_at = tick;
        level.last_used = tick;
    }
    info!("Level {:?} generated (depth {})", wpos, depth);
    Ok(())
}

/// Pin a floor against the purge sweep.
pub fn pin(world: &mut World, wpos: WorldPos) {
    if let Some(level) = world.levels.get_mut(wpos) {
        level.pins += 1;
    }
}

pub fn unpin(world: &mut World, wpos: WorldPos) {
    if let Some(level) = world.levels.get_mut(wpos) {
        level.pins = level.pins.saturating_sub(1);
    }
}

/// Deep-level logout: hold the floor static for `k x depth` minutes.
pub fn pin_for_logout(world: &mut World, wpos: WorldPos) {
    let depth = world.depth_at(wpos);
    let until = world.tick + world.cfg.pin_ticks(depth);
    if let Some(level) = world.levels.get_mut(wpos) {
        level.static_until = level.static_until.max(until);
        debug!("Floor {:?} pinned until tick {}", wpos, until);
    }
}

/// Release a floor if the rules allow. Returns true when the grid was
/// deallocated. Entities on the floor are wiped (non-unique monsters die
/// quietly, unique kill history is per player and survives); items go
/// through artifact preservation.
pub fn release(world: &mut World, wpos: WorldPos) -> bool {
    let now = world.tick;
    let stale = world.cfg.stale_ticks();
    {
        let Some(level) = world.levels.get(wpos) else { return false };
        if level.grid.is_none() {
            return false;
        }
        if level.pins > 0 || level.static_until > now {
            return false;
        }
        if !world.players.on_level(wpos).is_empty() {
            return false;
        }
        if now - level.last_used < stale {
            return false;
        }
    }

    // Cancel everything in flight on this floor, then free the grid.
    crate::monsters::wipe_monsters_on(world, wpos);
    let doomed: Vec<u16> = world
        .items
        .iter_alive()
        .filter(|(_, i)| i.wpos == wpos && i.held_m_idx == 0 && i.x >= 0)
        .map(|(id, _)| id)
        .collect();
    for id in doomed {
        crate::items::delete_item(world, id, true);
    }

    if let Some(level) = world.levels.get_mut(wpos) {
        level.grid = None;
    }
    info!("Level {:?} released", wpos);
    true
}

/// One pass of the housekeeping pseudo-floor: stale-floor release, item
/// lifetimes, deferred dungeon-handle deletion.
pub fn housekeeping(world: &mut World) {
    for wpos in world.levels.positions() {
        let occupied = !world.players.on_level(wpos).is_empty();
        if occupied {
            let tick = world.tick;
            if let Some(level) = world.levels.get_mut(wpos) {
                level.last_used = tick;
            }
            continue;
        }
        if world.levels.is_allocated(wpos) {
            sweep_expired_pins(world, wpos);
            release(world, wpos);
            if world.levels.is_allocated(wpos) {
                crate::items::sweep_item_lifetimes(world, wpos);
            }
        }
    }

    sweep_deleted_handles(world);
}

fn sweep_expired_pins(world: &mut World, wpos: WorldPos) {
    let now = world.tick;
    if let Some(level) = world.levels.get_mut(wpos) {
        if level.static_until != 0 && level.static_until <= now {
            level.static_until = 0;
            debug!("Floor {:?} unpinned by timeout", wpos);
        }
    }
}

/// A handle flagged DELETED is finally dropped once every floor it owns
/// has been released.
fn sweep_deleted_handles(world: &mut World) {
    let mut cleared: Vec<(i16, i16, bool)> = Vec::new();
    for wy in 0..deephold_core::constants::WILD_Y as i16 {
        for wx in 0..deephold_core::constants::WILD_X as i16 {
            let tile = world.wild.get(wx, wy);
            let doomed_dungeon = tile
                .dungeon
                .as_ref()
                .map_or(false, |h| h.has(DungeonFlags::DELETED));
            let doomed_tower = tile
                .tower
                .as_ref()
                .map_or(false, |h| h.has(DungeonFlags::DELETED));
            if !doomed_dungeon && !doomed_tower {
                continue;
            }
            if world.levels.floors_of_tile(wx, wy) == 0 {
                if doomed_dungeon {
                    cleared.push((wx, wy, false));
                }
                if doomed_tower {
                    cleared.push((wx, wy, true));
                }
            }
        }
    }
    for (wx, wy, tower) in cleared {
        let tile = world.wild.get_mut(wx, wy);
        if tower {
            tile.tower = None;
        } else {
            tile.dungeon = None;
        }
        info!("Deleted {} handle at ({}, {})", if tower { "tower" } else { "dungeon" }, wx, wy);
    }
}

/// Publish a bare rectangular floor with solid boundary: test arenas and
/// admin staging grounds.
pub fn install_blank_level(world: &mut World, wpos: WorldPos, width: i32, height: i32) {
    let mut grid = Grid::solid(width, height);
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            grid.set_feature(x, y, feat::FLOOR);
        }
    }
    grid.dirty.clear();
    let tick = world.tick;
    world.levels.insert(
        wpos,
        Level {
            grid: Some(grid),
            flags: 0,
            depth: world.depth_at(wpos),
            dungeon_type: 0,
            turn: 0,
            pins: 0,
            static_until: 0,
            created_at: tick,
            last_used: tick,
            up_landing: Some((width / 2, height / 2)),
            down_landing: Some((width / 2, height / 2)),
        },
    );
}
