//! Live monsters: instances, placement, groups and escorts, deletion and
//! compaction.
//!
//! Sampling lives in `sample`, the summon taxonomy in `summon`, level
//! scaling in `scale`, death handling in `death`.

pub mod death;
pub mod sample;
pub mod scale;
pub mod summon;

use deephold_core::constants::SPEED_NORMAL;
use deephold_core::types::{
    feat, feature, EgoId, ItemId, MonsterBlow, MonsterId, MonsterRace, PlayerId, RaceFlags,
    RaceId, RaceKindFlags, WorldPos,
};
use log::{debug, info, warn};

use crate::cave::Grid;
use crate::pool::PoolSlot;
use crate::world::World;

#[derive(Clone, Debug, Default, bincode::Encode, bincode::Decode)]
pub struct Monster {
    /// Race index; 0 marks a dead slot.
    pub r_idx: RaceId,
    /// Ego template; 0 for none.
    pub ego: EgoId,

    pub wpos: WorldPos,
    pub x: i32,
    pub y: i32,

    pub hp: i32,
    pub maxhp: i32,
    /// Racial speed after ego and birth variety.
    pub speed: i32,
    /// Current speed, status effects included.
    pub mspeed: i32,
    /// Racial armour class after ego.
    pub ac: i32,
    /// Current armour class.
    pub mac: i32,
    pub energy: i32,

    /// Instance level; starts at the effective race's level.
    pub level: i32,
    pub exp: u32,

    /// Working attack table, scaled by level-ups.
    pub blows: [MonsterBlow; 4],
    /// Birth attack table, for status restores.
    pub orig_blows: [MonsterBlow; 4],

    pub csleep: i32,
    pub stunned: i32,
    pub confused: i32,
    pub monfear: i32,

    /// Bloodline dilution, 0..=100. Earns nothing at the cap.
    pub clone: i32,
    /// Summon-chain depth that produced this instance.
    pub clone_summoning: i32,

    /// Head of the carried-item list; 0 for none.
    pub hold_o_idx: ItemId,
    /// Owning player for pets; 0 for wild monsters.
    pub owner: PlayerId,
    /// Cached closest player, refreshed by the visibility pass.
    pub closest_player: PlayerId,
}

impl PoolSlot for Monster {
    fn is_alive(&self) -> bool {
        self.r_idx != 0
    }
}

impl Monster {
    pub fn is_asleep(&self) -> bool {
        self.csleep > 0
    }

    /// Total average melee output, for the scaling caps.
    pub fn avg_melee(&self) -> i32 {
        self.blows.iter().filter(|b| b.is_attack()).map(|b| b.avg_damage()).sum()
    }
}

/// Can a race of this kind stand on this terrain?
pub fn monster_can_cross(f: deephold_core::types::FeatId, race: &MonsterRace) -> bool {
    if f == feat::DEEP_WATER {
        return race.has_kind(RaceKindFlags::AQUATIC)
            || race.has_kind(RaceKindFlags::CAN_SWIM)
            || race.has_kind(RaceKindFlags::CAN_FLY);
    }
    if f == feat::LAVA {
        return race.has_kind(RaceKindFlags::IM_FIRE) || race.has_kind(RaceKindFlags::CAN_FLY);
    }
    if feature::is_wall(f) {
        return race.has_flag(RaceFlags::PASS_WALL) || race.has_flag(RaceFlags::KILL_WALL);
    }
    // Aquatic races suffocate on dry land.
    if race.has_kind(RaceKindFlags::AQUATIC) {
        return matches!(f, feat::SHALLOW_WATER);
    }
    feature::is_passable(f)
}

/// Pick a cell near `(x, y)` at roughly distance `d`, preferring legal
/// ones. Returns the input on total failure so callers stay in bounds.
pub fn scatter(grid: &Grid, rng: &mut deephold_core::rng::GameRng, x: i32, y: i32, d: i32) -> (i32, i32) {
    for _ in 0..20 {
        let nx = x + rng.rand_int(2 * d + 1) - d;
        let ny = y + rng.rand_int(2 * d + 1) - d;
        if grid.in_bounds_fully(nx, ny) {
            return (nx, ny);
        }
    }
    (x, y)
}

/// Is this unique still available on the given floor?
///
/// A unique is refused when an instance is already alive anywhere, and
/// also when every player currently on the destination floor has already
/// killed it; one player who hasn't keeps it spawnable.
pub fn allow_unique_level(world: &World, r_idx: RaceId, wpos: WorldPos) -> bool {
    let race = world.catalog.race(r_idx);
    if !race.is_unique() {
        return true;
    }
    if world.race_live[r_idx as usize].cur_num >= race.max_num {
        return false;
    }
    let present = world.players.on_level(wpos);
    if present.is_empty() {
        return true;
    }
    present.iter().any(|&pid| {
        world
            .players
            .get(pid)
            .map_or(false, |p| !p.killed_uniques.contains(&r_idx))
    })
}

/// Options for a single placement.
#[derive(Clone, Copy, Debug)]
pub struct PlaceOpts {
    pub sleep: bool,
    pub clone: i32,
    pub clone_summoning: i32,
}

impl Default for PlaceOpts {
    fn default() -> Self {
        PlaceOpts { sleep: false, clone: 0, clone_summoning: 0 }
    }
}

/// Create one monster instance at a cell.
///
/// Refuses protected cells, occupied cells, terrain the race cannot stand
/// on, over-cap races and unavailable uniques — unless the admin override
/// is set, which skips the cell and terrain guards (never the unique cap).
pub fn place_monster_one(
    world: &mut World,
    wpos: WorldPos,
    x: i32,
    y: i32,
    r_idx: RaceId,
    ego: EgoId,
    opts: PlaceOpts,
) -> Option<MonsterId> {
    if world.compacting {
        warn!("Refusing monster placement during compaction");
        return None;
    }
    let race = world.effective_race(r_idx, ego);
    let override_guards = world.admin.summon_override;

    {
        let grid = world.levels.grid(wpos)?;
        if !grid.in_bounds_fully(x, y) {
            return None;
        }
        if !override_guards {
            if !grid.cell_spawnable(x, y) {
                return None;
            }
            if !monster_can_cross(grid.feat(x, y), &race) {
                return None;
            }
        } else if grid.cell(x, y).m_idx != 0 {
            return None;
        }
    }

    // Race cap; uniques additionally respect per-player kill history.
    let base = world.catalog.race(r_idx);
    if world.race_live[r_idx as usize].cur_num >= base.max_num {
        return None;
    }
    if !allow_unique_level(world, r_idx, wpos) {
        return None;
    }

    let hp = if race.has_flag(RaceFlags::FORCE_MAXHP) {
        race.max_hp()
    } else {
        world.rng.damroll(race.hdice as i32, race.hside as i32).max(1)
    };

    // A little racial variety in speed, like siblings differ.
    let speed = if race.speed > SPEED_NORMAL {
        race.speed + world.rng.rand_int(5)
    } else {
        race.speed
    };

    let csleep = if opts.sleep && race.sleep > 0 {
        (race.sleep * 2) + world.rng.randint(race.sleep * 10)
    } else {
        0
    };

    let monster = Monster {
        r_idx,
        ego,
        wpos,
        x,
        y,
        hp,
        maxhp: hp,
        speed,
        mspeed: speed,
        ac: race.ac,
        mac: race.ac,
        energy: 0,
        level: race.level,
        exp: 0,
        blows: race.blows,
        orig_blows: race.blows,
        csleep,
        stunned: 0,
        confused: 0,
        monfear: 0,
        clone: opts.clone.clamp(0, 100),
        clone_summoning: opts.clone_summoning,
        hold_o_idx: 0,
        owner: 0,
        closest_player: 0,
    };

    if world.monsters.over_high_water() {
        compact_monsters(world);
    }
    let id = world.monsters.alloc(monster)?;

    let Some(grid) = world.levels.grid_mut(wpos) else {
        world.monsters.release(id);
        return None;
    };
    grid.cell_mut(x, y).m_idx = id;
    world.race_live[r_idx as usize].cur_num += 1;
    debug!("Placed {} ({}) at {:?} ({}, {})", race.name, id, wpos, x, y);
    Some(id)
}

/// Place a group of one race by breadth-first fanning from a seed cell.
pub fn place_monster_group(
    world: &mut World,
    wpos: WorldPos,
    x: i32,
    y: i32,
    r_idx: RaceId,
    ego: EgoId,
    opts: PlaceOpts,
) -> bool {
    let race = world.catalog.race(r_idx).clone();
    let depth = world.depth_at(wpos);

    // Group size shrinks when the race is out of its depth.
    let mut total = world.rng.randint(10) as i32 + 2;
    if race.level > depth {
        total -= race.level - depth;
    }
    let total = total.clamp(1, world.cfg.group_max as i32) as usize;

    let mut placed = 0usize;
    let mut frontier = vec![(x, y)];
    let mut seen = std::collections::HashSet::new();
    seen.insert((x, y));

    while let Some((cx, cy)) = frontier.pop() {
        if placed >= total {
            break;
        }
        if place_monster_one(world, wpos, cx, cy, r_idx, ego, opts).is_some() {
            placed += 1;
        }
        let mut neighbours: Vec<(i32, i32)> = Vec::new();
        for dy in -1..=1 {
            for dx in -1..=1 {
                let n = (cx + dx, cy + dy);
                if !seen.contains(&n) {
                    neighbours.push(n);
                }
            }
        }
        world.rng.shuffle(&mut neighbours);
        for n in neighbours {
            let legal = world
                .levels
                .grid(wpos)
                .map_or(false, |g| g.in_bounds_fully(n.0, n.1) && g.cell_spawnable(n.0, n.1));
            if legal {
                seen.insert(n);
                frontier.insert(0, n);
            }
        }
    }

    placed > 0
}

/// Place a monster with whatever retinue its race calls for.
pub fn place_monster_aux(
    world: &mut World,
    wpos: WorldPos,
    x: i32,
    y: i32,
    r_idx: RaceId,
    ego: EgoId,
    opts: PlaceOpts,
    group: bool,
) -> Option<MonsterId> {
    let id = place_monster_one(world, wpos, x, y, r_idx, ego, opts)?;
    if !group {
        return Some(id);
    }

    let race = world.catalog.race(r_idx).clone();

    if race.has_flag(RaceFlags::FRIEND) {
        let (nx, ny) = {
            let grid = world.levels.grid(wpos)?;
            scatter(grid, &mut world.rng, x, y, 2)
        };
        place_monster_one(world, wpos, nx, ny, r_idx, ego, opts);
    }

    if race.has_flag(RaceFlags::FRIENDS) {
        place_monster_group(world, wpos, x, y, r_idx, ego, opts);
    }

    if race.has_flag(RaceFlags::ESCORT) {
        let depth = world.depth_at(wpos);
        for _ in 0..32 {
            let (ex, ey) = {
                let grid = world.levels.grid(wpos)?;
                scatter(grid, &mut world.rng, x, y, 3)
            };
            let spawnable = world
                .levels
                .grid(wpos)
                .map_or(false, |g| g.cell_spawnable(ex, ey));
            if !spawnable {
                continue;
            }
            let Some(e_idx) = sample::get_mon_num_escort(world, depth, &race) else {
                break;
            };
            place_monster_one(world, wpos, ex, ey, e_idx, 0, opts);
            // Escorts of gregarious races come in knots.
            if world.catalog.race(e_idx).has_flag(RaceFlags::FRIENDS) && world.rng.magik(50) {
                place_monster_group(world, wpos, ex, ey, e_idx, 0, opts);
            }
        }
    }

    Some(id)
}

/// Drop one sampled monster somewhere on a floor, away from players.
pub fn alloc_monster(world: &mut World, wpos: WorldPos, min_dis: i32, sleep: bool) -> bool {
    let depth = world.depth_at(wpos);
    let dungeon_type = world.wild.handle(wpos).map_or(0, |h| h.type_id);

    let (x, y) = {
        let Some(grid) = world.levels.grid(wpos) else { return false };
        let mut found = None;
        for _ in 0..100 {
            let x = world.rng.rand_int(grid.width - 2) + 1;
            let y = world.rng.rand_int(grid.height - 2) + 1;
            if !grid.cell_spawnable(x, y) {
                continue;
            }
            let near = world
                .players
                .iter()
                .filter(|p| p.wpos == wpos)
                .map(|p| (p.x - x).abs().max((p.y - y).abs()))
                .min()
                .unwrap_or(i32::MAX);
            if near < min_dis {
                continue;
            }
            found = Some((x, y));
            break;
        }
        match found {
            Some(spot) => spot,
            None => return false,
        }
    };

    let landing = match world.levels.grid(wpos) {
        Some(grid) => grid.feat(x, y),
        None => return false,
    };
    let Some(r_idx) =
        sample::get_mon_num_filtered(world, wpos, depth, dungeon_type, move |race| {
            monster_can_cross(landing, race)
        })
    else {
        return false;
    };
    let ego = sample::pick_ego(world, r_idx, depth);
    place_monster_aux(
        world,
        wpos,
        x,
        y,
        r_idx,
        ego,
        PlaceOpts { sleep, ..Default::default() },
        true,
    )
    .is_some()
}

/// Remove a monster instance outright (deallocation, genocide, failed
/// placement cleanup). Death with drops and experience is `death::kill`.
pub fn delete_monster_idx(world: &mut World, m_idx: MonsterId, preserve_arts: bool) {
    let Some(m) = world.monsters.get(m_idx) else { return };
    let (r_idx, wpos, x, y) = (m.r_idx, m.wpos, m.x, m.y);

    // Carried items go down with the monster on deletion.
    let mut cursor = m.hold_o_idx;
    while cursor != 0 {
        let next = world.items.get(cursor).map_or(0, |i| i.next_o_idx);
        crate::items::delete_item(world, cursor, preserve_arts);
        cursor = next;
    }

    if let Some(grid) = world.levels.grid_mut(wpos) {
        if grid.in_bounds(x, y) && grid.cell(x, y).m_idx == m_idx {
            grid.cell_mut(x, y).m_idx = 0;
            grid.dirty.push((x, y));
        }
    }

    for p in world.players.iter_mut() {
        p.forget_monster(m_idx);
        p.observe(crate::net::Observation::MonsterGone { id: m_idx });
    }

    if world.race_live[r_idx as usize].cur_num > 0 {
        world.race_live[r_idx as usize].cur_num -= 1;
    }
    world.monsters.release(m_idx);
}

/// Wipe every monster on a floor, for level deallocation. Uniques are
/// merely displaced (their "remembered" kill history is per player and
/// survives); their live count drops so they can reappear elsewhere.
pub fn wipe_monsters_on(world: &mut World, wpos: WorldPos) {
    for m_idx in world.monsters.alive_ids() {
        if world.monsters.get(m_idx).map_or(false, |m| m.wpos == wpos) {
            delete_monster_idx(world, m_idx, true);
        }
    }
}

/// Low-frequency regeneration sweep for monsters at peace.
pub fn heal_monsters_on(world: &mut World, wpos: WorldPos) {
    for m_idx in world.monsters.alive_ids() {
        let Some(m) = world.monsters.get_mut(m_idx) else { continue };
        if m.wpos != wpos || m.hp >= m.maxhp || m.monfear > 0 {
            continue;
        }
        let gain = (m.maxhp / 20).max(1);
        m.hp = (m.hp + gain).min(m.maxhp);
    }
}

/// Compact the monster pool under pressure.
///
/// Victims score high when far from every player, low-level relative to
/// their floor, and bias hugely toward keeping uniques and quest monsters
/// and toward purging townsfolk. Live entries then squeeze downward and
/// every back-reference is patched.
pub fn compact_monsters(world: &mut World) {
    debug_assert!(!world.compacting, "compaction is not re-entrant");
    world.compacting = true;

    let target = world.monsters.capacity() / 8;
    let mut scored: Vec<(i32, MonsterId)> = Vec::new();
    for (id, m) in world.monsters.iter_alive() {
        let race = world.catalog.race(m.r_idx);
        let mut score = 0;
        let near = world
            .players
            .iter()
            .filter(|p| p.wpos == m.wpos)
            .map(|p| (p.x - m.x).abs() + (p.y - m.y).abs())
            .min();
        score += near.unwrap_or(500);
        let depth = world.depth_at(m.wpos).max(1);
        score += ((depth - race.level) * 100 / depth).max(0);
        if race.is_unique() || race.has_flag(RaceFlags::QUESTOR) {
            score -= 100_000;
        }
        if race.has_flag(RaceFlags::TOWNSFOLK) {
            score += 10_000;
        }
        scored.push((score, id));
    }
    scored.sort_unstable_by_key(|&(score, _)| std::cmp::Reverse(score));

    let victims: Vec<MonsterId> = scored.iter().take(target).map(|&(_, id)| id).collect();
    let count = victims.len();
    world.compacting = false;
    for id in victims {
        delete_monster_idx(world, id, true);
    }
    world.compacting = true;

    for id in world.monsters.alive_ids().into_iter().rev() {
        if let Some((from, to)) = world.monsters.relocate_down(id) {
            remap_monster_refs(world, from, to);
        }
    }

    world.compacting = false;
    info!("Monster compaction removed {} monsters", count);
}

fn remap_monster_refs(world: &mut World, from: MonsterId, to: MonsterId) {
    let (wpos, x, y, hold) = {
        let m = world.monsters.get(to).unwrap();
        (m.wpos, m.x, m.y, m.hold_o_idx)
    };

    if let Some(grid) = world.levels.grid_mut(wpos) {
        if grid.in_bounds(x, y) && grid.cell(x, y).m_idx == from {
            grid.cell_mut(x, y).m_idx = to;
        }
    }

    let mut cursor = hold;
    while cursor != 0 {
        let next = world.items.get(cursor).map_or(0, |i| i.next_o_idx);
        if let Some(item) = world.items.get_mut(cursor) {
            item.held_m_idx = to;
        }
        cursor = next;
    }

    for p in world.players.iter_mut() {
        p.remap_monster(from, to);
    }
}

/// Move a live monster to a new cell on the same floor, keeping the cell
/// links consistent.
pub fn move_monster_to(world: &mut World, m_idx: MonsterId, nx: i32, ny: i32) -> bool {
    let Some(m) = world.monsters.get(m_idx) else { return false };
    let (wpos, ox, oy) = (m.wpos, m.x, m.y);
    {
        let Some(grid) = world.levels.grid_mut(wpos) else { return false };
        if !grid.in_bounds_fully(nx, ny) || grid.cell(nx, ny).m_idx != 0 {
            return false;
        }
        debug_assert_eq!(grid.cell(ox, oy).m_idx, m_idx);
        grid.cell_mut(ox, oy).m_idx = 0;
        grid.cell_mut(nx, ny).m_idx = m_idx;
    }
    let m = world.monsters.get_mut(m_idx).unwrap();
    m.x = nx;
    m.y = ny;
    true
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use deephold_core::catalog::{race_ids, Catalog};

    use crate::config::Config;
    use crate::levels;

    pub(crate) fn arena_world() -> (World, WorldPos) {
        let mut world = World::new(Config::default(), Catalog::builtin(), 7);
        let wpos = WorldPos::new(1, 1, -5);
        world.wild.get_mut(1, 1).dungeon = Some(crate::world::DungeonHandle {
            type_id: 0,
            flags: deephold_core::types::DungeonFlags::RANDOM.bits(),
            max_depth: 100,
        });
        levels::install_blank_level(&mut world, wpos, 40, 40);
        (world, wpos)
    }

    #[test]
    fn place_one_links_cell_and_counts_race() {
        let (mut world, wpos) = arena_world();
        let id = place_monster_one(
            &mut world,
            wpos,
            10,
            10,
            race_ids::KOBOLD,
            0,
            PlaceOpts::default(),
        )
        .unwrap();
        assert_eq!(world.levels.grid(wpos).unwrap().cell(10, 10).m_idx, id);
        let m = world.monsters.get(id).unwrap();
        assert_eq!((m.x, m.y), (10, 10));
        assert_eq!(world.race_live[race_ids::KOBOLD as usize].cur_num, 1);
        // Occupied cell refuses a second placement.
        assert!(place_monster_one(
            &mut world,
            wpos,
            10,
            10,
            race_ids::KOBOLD,
            0,
            PlaceOpts::default()
        )
        .is_none());
    }

    #[test]
    fn uniques_never_double_place() {
        let (mut world, wpos) = arena_world();
        assert!(place_monster_one(
            &mut world,
            wpos,
            5,
            5,
            race_ids::GRISHNAKH,
            0,
            PlaceOpts::default()
        )
        .is_some());
        assert!(place_monster_one(
            &mut world,
            wpos,
            7,
            7,
            race_ids::GRISHNAKH,
            0,
            PlaceOpts::default()
        )
        .is_none());
    }

    #[test]
    fn aquatic_races_refuse_dry_land() {
        let (mut world, wpos) = arena_world();
        assert!(place_monster_one(
            &mut world,
            wpos,
            4,
            4,
            race_ids::PIRANHA,
            0,
            PlaceOpts::default()
        )
        .is_none());
        world
            .levels
            .grid_mut(wpos)
            .unwrap()
            .set_feature(4, 4, feat::SHALLOW_WATER);
        assert!(place_monster_one(
            &mut world,
            wpos,
            4,
            4,
            race_ids::PIRANHA,
            0,
            PlaceOpts::default()
        )
        .is_some());
    }

    #[test]
    fn groups_fan_out_from_seed() {
        let (mut world, wpos) = arena_world();
        assert!(place_monster_group(
            &mut world,
            wpos,
            20,
            20,
            race_ids::CAVE_SPIDER,
            0,
            PlaceOpts::default()
        ));
        let count = world.race_live[race_ids::CAVE_SPIDER as usize].cur_num;
        assert!(count >= 1, "at least the seed spider");
        assert!((count as usize) <= world.cfg.group_max);
        // Every placed spider's cell link is consistent.
        for (id, m) in world.monsters.iter_alive() {
            assert_eq!(world.levels.grid(wpos).unwrap().cell(m.x, m.y).m_idx, id);
        }
    }

    #[test]
    fn escorts_share_glyph_and_stay_below_leader() {
        let (mut world, wpos) = arena_world();
        let leader = place_monster_aux(
            &mut world,
            wpos,
            20,
            20,
            race_ids::ORC_CHIEFTAIN,
            0,
            PlaceOpts::default(),
            true,
        )
        .unwrap();
        let leader_race = world.catalog.race(race_ids::ORC_CHIEFTAIN).clone();
        for (id, m) in world.monsters.iter_alive() {
            if id == leader {
                continue;
            }
            let race = world.catalog.race(m.r_idx);
            assert_eq!(race.glyph, leader_race.glyph);
            assert!(race.level <= leader_race.level);
            assert!(!race.is_unique());
        }
    }

    #[test]
    fn delete_unlinks_everything() {
        let (mut world, wpos) = arena_world();
        let id = place_monster_one(
            &mut world,
            wpos,
            8,
            8,
            race_ids::WOLF,
            0,
            PlaceOpts::default(),
        )
        .unwrap();
        crate::items::monster_carry(
            &mut world,
            id,
            crate::items::Item::of_kind(deephold_core::catalog::kind_ids::DAGGER, 0),
        );
        delete_monster_idx(&mut world, id, true);
        assert_eq!(world.levels.grid(wpos).unwrap().cell(8, 8).m_idx, 0);
        assert_eq!(world.race_live[race_ids::WOLF as usize].cur_num, 0);
        assert_eq!(world.items.alive(), 0);
        assert_eq!(world.monsters.alive(), 0);
    }

    #[test]
    fn compaction_preserves_cell_consistency() {
        let (mut world, wpos) = arena_world();
        for i in 0..30 {
            place_monster_one(
                &mut world,
                wpos,
                2 + i % 20,
                2 + i / 20,
                race_ids::ORC,
                0,
                PlaceOpts::default(),
            );
        }
        compact_monsters(&mut world);
        for (id, m) in world.monsters.iter_alive() {
            assert_eq!(
                world.levels.grid(m.wpos).unwrap().cell(m.x, m.y).m_idx,
                id,
                "cell link broken after compaction"
            );
        }
    }
}
