//! The dungeon generator.
//!
//! A pipeline over a scratch grid: framing, rooms, corridors, streamers,
//! optional destruction, a connectivity repair pass, stairs, allocation,
//! population. Grid building is pure over `(params, rng)` and returns a
//! blueprint; `build_level` loops the bounded retries, installs the
//! result, and only then materialises entities through the normal
//! placement paths.

mod fractal;
mod maze;
mod rooms;
mod town;
mod vaults;

use deephold_core::constants::*;
use deephold_core::types::{
    feat, feature, CellFlags, DungeonFlags, LevelFlags, MonsterRace, RaceKindFlags, WorldPos,
};
use log::debug;
use thiserror::Error;

use crate::cave::{Grid, Overlay, TrapKind};
use crate::items::Item;
use crate::levels::Level;
use crate::monsters::{self, sample, PlaceOpts};
use crate::world::World;

#[derive(Debug, Error)]
pub enum GenFail {
    #[error("no room could be placed")]
    NoRooms,
    #[error("could not place required stairs")]
    NoStairs,
    #[error("open region too small after carving")]
    TooSmall,
    #[error("retries exhausted")]
    Exhausted,
}

#[derive(Clone, Copy, Debug)]
pub struct GenParams {
    pub wpos: WorldPos,
    pub depth: i32,
    pub dungeon_type: u16,
}

/// Monster-theme filters for nests, pits and vault glyphs; resolved into
/// races only after the grid is installed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
    Any,
    Jelly,
    Animal,
    Undead,
    Orc,
    Troll,
    Giant,
    Dragon,
    Demon,
    Kennel,
    Aquatic,
    Symbol(char),
}

impl Theme {
    pub fn allows(self, race: &MonsterRace) -> bool {
        match self {
            Theme::Any => true,
            Theme::Jelly => race.glyph == 'j',
            Theme::Animal => race.has_kind(RaceKindFlags::ANIMAL),
            Theme::Undead => race.has_kind(RaceKindFlags::UNDEAD),
            Theme::Orc => race.has_kind(RaceKindFlags::ORC),
            Theme::Troll => race.has_kind(RaceKindFlags::TROLL),
            Theme::Giant => race.has_kind(RaceKindFlags::GIANT),
            Theme::Dragon => race.has_kind(RaceKindFlags::DRAGON),
            Theme::Demon => race.has_kind(RaceKindFlags::DEMON),
            Theme::Kennel => matches!(race.glyph, 'C' | 'Z'),
            Theme::Aquatic => race.has_kind(RaceKindFlags::AQUATIC),
            Theme::Symbol(c) => race.glyph == c,
        }
    }
}

/// A deferred monster placement decided during grid building.
#[derive(Clone, Copy, Debug)]
pub struct SpawnSpec {
    pub x: i32,
    pub y: i32,
    /// Added to the floor depth when sampling.
    pub boost: i32,
    pub theme: Theme,
    pub sleep: bool,
    pub group: bool,
}

/// A deferred item drop decided during grid building.
#[derive(Clone, Copy, Debug)]
pub struct ItemSpec {
    pub x: i32,
    pub y: i32,
    pub gold: bool,
}

/// Scratch state for one generation attempt.
pub struct Dun {
    pub cent: Vec<(i32, i32)>,
    pub doors: Vec<(i32, i32)>,
    pub walls: Vec<(i32, i32)>,
    pub tunn: Vec<(i32, i32)>,
    pub block_used: Vec<Vec<bool>>,
    pub row_blocks: i32,
    pub col_blocks: i32,
    pub crowded: bool,
    pub watery: bool,
    pub spawns: Vec<SpawnSpec>,
    pub item_spots: Vec<ItemSpec>,
    /// Percent of full size this level was scaled to.
    pub ratio: i32,
}

impl Dun {
    fn new(width: i32, height: i32) -> Dun {
        let row_blocks = height / BLOCK_HGT;
        let col_blocks = width / BLOCK_WID;
        Dun {
            cent: Vec::new(),
            doors: Vec::new(),
            walls: Vec::new(),
            tunn: Vec::new(),
            block_used: vec![vec![false; col_blocks as usize]; row_blocks as usize],
            row_blocks,
            col_blocks,
            crowded: false,
            watery: false,
            spawns: Vec::new(),
            item_spots: Vec::new(),
            ratio: 100,
        }
    }
}

/// Everything one successful grid build hands back for installation.
pub struct Blueprint {
    pub grid: Grid,
    pub flags: u16,
    pub up_landing: Option<(i32, i32)>,
    pub down_landing: Option<(i32, i32)>,
    pub spawns: Vec<SpawnSpec>,
    pub item_spots: Vec<ItemSpec>,
    pub monster_count: i32,
}

/// Generate and publish the floor at `params.wpos`.
pub fn build_level(world: &mut World, params: &GenParams) -> Result<(), GenFail> {
    debug_assert!(!world.compacting);

    if params.wpos.wz == 0 {
        let tile = world.wild.get(params.wpos.wx, params.wpos.wy);
        let bp = if tile.town {
            town::town_gen(world, params)
        } else {
            surface_gen(world, params)
        };
        install(world, params, bp);
        return Ok(());
    }

    for attempt in 0..GEN_RETRIES {
        match dungeon_gen(world, params) {
            Ok(bp) => {
                install(world, params, bp);
                return Ok(());
            }
            Err(e) => {
                debug!("Generation attempt {} at {:?} failed: {}", attempt, params.wpos, e);
            }
        }
    }
    Err(GenFail::Exhausted)
}

/// Publish a blueprint as the live level and materialise its entities.
fn install(world: &mut World, params: &GenParams, bp: Blueprint) {
    let tick = world.tick;
    world.levels.insert(
        params.wpos,
        Level {
            grid: Some(bp.grid),
            flags: bp.flags,
            depth: params.depth,
            dungeon_type: params.dungeon_type,
            turn: 0,
            pins: 0,
            static_until: 0,
            created_at: tick,
            last_used: tick,
            up_landing: bp.up_landing,
            down_landing: bp.down_landing,
        },
    );

    // Deferred items.
    for spot in &bp.item_spots {
        let item = if spot.gold {
            let mut gold = Item::of_kind(deephold_core::catalog::kind_ids::GOLD, tick);
            gold.pval = (params.depth * 2 + world.rng.damroll(2, params.depth.max(2))).max(1);
            gold
        } else {
            match pick_kind_for_depth(world, params.depth) {
                Some(k) => {
                    let mut it = Item::of_kind(k, tick);
                    it.pval = world.catalog.kind(k).charges as i32;
                    it
                }
                None => continue,
            }
        };
        crate::items::floor_carry(world, params.wpos, spot.x, spot.y, item);
    }

    // Deferred themed/boosted spawns.
    for spec in bp.spawns.clone() {
        let level = params.depth + spec.boost;
        let theme = spec.theme;
        let Some(r_idx) = sample::get_mon_num_filtered(
            world,
            params.wpos,
            level,
            params.dungeon_type,
            move |race| theme.allows(race),
        ) else {
            continue;
        };
        let ego = sample::pick_ego(world, r_idx, level);
        monsters::place_monster_aux(
            world,
            params.wpos,
            spec.x,
            spec.y,
            r_idx,
            ego,
            PlaceOpts { sleep: spec.sleep, ..Default::default() },
            spec.group,
        );
    }

    // General population, kept away from the arrival cells.
    let landings: Vec<(i32, i32)> = [bp.up_landing, bp.down_landing]
        .iter()
        .flatten()
        .copied()
        .collect();
    for _ in 0..bp.monster_count {
        alloc_monster_avoiding(world, params, &landings);
    }
}

fn alloc_monster_avoiding(world: &mut World, params: &GenParams, avoid: &[(i32, i32)]) -> bool {
    let wpos = params.wpos;
    let spot = {
        let Some(grid) = world.levels.grid(wpos) else { return false };
        let mut found = None;
        for _ in 0..100 {
            let x = world.rng.rand_int(grid.width - 2) + 1;
            let y = world.rng.rand_int(grid.height - 2) + 1;
            if !grid.cell_spawnable(x, y) {
                continue;
            }
            if avoid.iter().any(|&(ax, ay)| (ax - x).abs() < 5 && (ay - y).abs() < 5) {
                continue;
            }
            found = Some((x, y));
            break;
        }
        found
    };
    let Some((x, y)) = spot else { return false };
    let landing = world.levels.grid(wpos).map_or(feat::FLOOR, |g| g.feat(x, y));
    let Some(r_idx) = sample::get_mon_num_filtered(
        world,
        wpos,
        params.depth,
        params.dungeon_type,
        move |race| monsters::monster_can_cross(landing, race),
    ) else {
        return false;
    };
    let ego = sample::pick_ego(world, r_idx, params.depth);
    monsters::place_monster_aux(
        world,
        wpos,
        x,
        y,
        r_idx,
        ego,
        PlaceOpts { sleep: true, ..Default::default() },
        true,
    )
    .is_some()
}

fn pick_kind_for_depth(world: &mut World, depth: i32) -> Option<u16> {
    let candidates: Vec<u16> = world
        .catalog
        .kinds
        .iter()
        .enumerate()
        .skip(2) // not "nothing", not bare gold
        .filter(|(i, k)| {
            !k.artifact || !world.generated_artifacts.contains(&(*i as u16))
        })
        .filter(|(_, k)| {
            if k.artifact {
                // Artifacts surface only well past their native depth band.
                k.level <= depth && depth >= 30
            } else {
                k.level <= depth + 5
            }
        })
        .map(|(i, _)| i as u16)
        .collect();
    if candidates.is_empty() {
        return None;
    }
    Some(*world.rng.choose(&candidates))
}

// ---------------------------------------------------------------------
// Surface (non-town) tiles: an open wilderness cave.
// ---------------------------------------------------------------------

fn surface_gen(world: &mut World, params: &GenParams) -> Blueprint {
    let tile = world.wild.get(params.wpos.wx, params.wpos.wy).clone();
    let mut grid = Grid::solid(MAX_WID, MAX_HGT);

    for y in 1..MAX_HGT - 1 {
        for x in 1..MAX_WID - 1 {
            let f = if world.rng.magik(70) {
                feat::GRASS
            } else if world.rng.magik(20) {
                feat::TREE
            } else {
                feat::DIRT
            };
            grid.set_feature(x, y, f);
        }
    }

    let cx = MAX_WID / 2;
    let cy = MAX_HGT / 2;
    let mut down = None;
    let mut up = None;
    if tile.dungeon.is_some() {
        grid.set_feature(cx, cy, feat::STAIR_DOWN);
        down = Some((cx, cy));
    }
    if tile.tower.is_some() {
        grid.set_feature(cx + 4, cy, feat::STAIR_UP);
        up = Some((cx + 4, cy));
    }
    grid.dirty.clear();

    Blueprint {
        grid,
        flags: 0,
        up_landing: up.or(Some((cx + 2, cy))),
        down_landing: down.or(Some((cx - 2, cy))),
        spawns: Vec::new(),
        item_spots: Vec::new(),
        monster_count: 4,
    }
}

// ---------------------------------------------------------------------
// Dungeon floors.
// ---------------------------------------------------------------------

fn dungeon_gen(world: &mut World, params: &GenParams) -> Result<Blueprint, GenFail> {
    let depth = params.depth;

    // Stage 1: framing. Scale the grid, roll the level flags and modes.
    let (width, height, ratio) = if world.rng.one_in(SMALL_LEVEL) {
        let w = MIN_WID + world.rng.rand_int((MAX_WID - MIN_WID) / 11 + 1) * 11;
        let h = MIN_HGT + world.rng.rand_int((MAX_HGT - MIN_HGT) / 11 + 1) * 11;
        (w, h, 100 * w * h / (MAX_WID * MAX_HGT))
    } else {
        (MAX_WID, MAX_HGT, 100)
    };

    let mut flags = LevelFlags::empty();
    if world.rng.magik(NO_TELEPORT_CHANCE) {
        flags |= LevelFlags::NO_TELEPORT;
    }
    if depth < 100 && world.rng.magik(NO_MAGIC_CHANCE) {
        flags |= LevelFlags::NO_MAGIC;
    }
    if world.rng.magik(NO_GENO_CHANCE) {
        flags |= LevelFlags::NO_GENO;
    }
    if world.rng.magik(NO_MAP_CHANCE) {
        flags |= LevelFlags::NOMAP;
    }
    if world.rng.magik(NO_MAGIC_MAP_CHANCE) {
        flags |= LevelFlags::NO_MAGIC_MAP;
    }
    if world.rng.magik(NO_DESTROY_CHANCE) {
        flags |= LevelFlags::NO_DESTROY;
    }
    // Handle flags propagate down, and an unmappable floor usually also
    // defeats magical mapping.
    if let Some(h) = world.wild.handle(params.wpos) {
        if h.has(DungeonFlags::NOMAP) {
            flags |= LevelFlags::NOMAP;
        }
        if h.has(DungeonFlags::NO_MAGIC_MAP) {
            flags |= LevelFlags::NO_MAGIC_MAP;
        }
    }
    if flags.contains(LevelFlags::NOMAP) && world.rng.magik(70) {
        flags |= LevelFlags::NO_MAGIC_MAP;
    }

    // Mode rolls, with the exclusions between them.
    let cavern = world.rng.rand_int(depth.max(1)) > DUN_CAVERN && world.rng.magik(DUN_CAVERN2);
    let destroyed = roll_destroyed(&mut world.rng, depth, flags);
    let watery = depth > 5
        && world.rng.magik(DUN_RIVER_CHANCE - depth * DUN_RIVER_REDUCE / 100);
    let maze = !cavern && world.rng.rand_int(DUN_MAZE_FACTOR) < depth - 10;
    let permamaze = maze && world.rng.magik(DUN_MAZE_PERMAWALL);
    let empty_level = !maze && !cavern && world.rng.one_in(EMPTY_LEVEL);
    let dark_empty = empty_level && world.rng.one_in(DARK_EMPTY) && world.rng.rand_int(100) < depth;

    let mut grid = Grid::solid(width, height);
    let mut dun = Dun::new(width, height);
    dun.ratio = ratio;
    dun.watery = watery;

    // Inset to carvable rock (or open arena floor).
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            if empty_level {
                grid.set_feature(x, y, feat::FLOOR);
                if !dark_empty {
                    grid.cell_mut(x, y).set(CellFlags::GLOW);
                }
            } else if permamaze {
                grid.set_feature(x, y, feat::PERM_INNER);
            } else {
                grid.set_feature(x, y, feat::GRANITE);
            }
        }
    }

    if cavern {
        fractal::build_cavern(&mut grid, &mut world.rng);
    }

    // Stage 2: rooms.
    if !empty_level {
        rooms::build_rooms(world, &mut grid, &mut dun, params, destroyed, cavern);
    } else {
        // The whole level is one room; anchor corridors on its middle.
        dun.cent.push((width / 2, height / 2));
    }

    // Restate the boundary: nothing pierces the edge of the world.
    for x in 0..width {
        grid.set_feature(x, 0, feat::PERM_SOLID);
        grid.set_feature(x, height - 1, feat::PERM_SOLID);
    }
    for y in 0..height {
        grid.set_feature(0, y, feat::PERM_SOLID);
        grid.set_feature(width - 1, y, feat::PERM_SOLID);
    }

    if dun.cent.is_empty() {
        return Err(GenFail::NoRooms);
    }

    // Stage 3: corridors (mazes carve their own).
    if maze {
        maze::generate_maze(&mut grid, &mut world.rng, permamaze);
    } else {
        world.rng.shuffle(&mut dun.cent);
        let mut prev = *dun.cent.last().unwrap();
        let cents = dun.cent.clone();
        for &(cx, cy) in cents.iter() {
            build_tunnel(&mut grid, &mut dun, &mut world.rng, cx, cy, prev.0, prev.1);
            prev = (cx, cy);
        }
        let junctions = dun.doors.clone();
        for &(x, y) in &junctions {
            try_doors(world, &mut grid, params, x, y);
        }

        // Stage 4: streamers.
        for _ in 0..DUN_STR_MAG {
            build_streamer(&mut grid, &mut world.rng, feat::MAGMA, DUN_STR_MC);
        }
        for _ in 0..DUN_STR_QUA {
            build_streamer(&mut grid, &mut world.rng, feat::QUARTZ, DUN_STR_QC);
        }
        if watery {
            for _ in 0..DUN_STR_WAT {
                build_water_streamer(&mut grid, &mut world.rng);
            }
            lake_level(&mut grid, &mut dun, &mut world.rng);
        }

        // Stage 5: destruction.
        if destroyed {
            destroy_level(&mut grid, &mut world.rng);
        }
    }

    // Stage 5.5: repair connectivity before anything depends on it.
    repair_connectivity(&mut grid, &dun)?;

    // Stage 6: stairs.
    let (up_landing, down_landing) = place_stairs(world, &mut grid, params, flags, ratio)?;

    // Stage 7: allocation.
    allocate_features(world, &mut grid, &mut dun, params, empty_level || maze);

    // Stage 8: population size; placement happens after install.
    let mut k = (depth / 3).clamp(2, 10) * ratio / 100 + 1;
    if empty_level || maze {
        k *= 2;
    }
    let monster_count = 5 + world.rng.randint(8) * ratio / 100 + k;

    grid.dirty.clear();
    Ok(Blueprint {
        grid,
        flags: flags.bits(),
        up_landing,
        down_landing,
        spawns: dun.spawns.clone(),
        item_spots: dun.item_spots.clone(),
        monster_count,
    })
}

// ---------------------------------------------------------------------
// Corridors.
// ---------------------------------------------------------------------

/// Direction toward the target, axis-aligned, preferring the longer leg.
fn correct_dir(x1: i32, y1: i32, x2: i32, y2: i32) -> (i32, i32) {
    let dx = (x2 - x1).signum();
    let dy = (y2 - y1).signum();
    if dx != 0 && dy != 0 {
        if (x2 - x1).abs() >= (y2 - y1).abs() {
            (dx, 0)
        } else {
            (0, dy)
        }
    } else {
        (dx, dy)
    }
}

fn rand_dir(rng: &mut deephold_core::rng::GameRng) -> (i32, i32) {
    *rng.choose(&[(1, 0), (-1, 0), (0, 1), (0, -1)])
}

/// Carve one randomised tunnel between two points.
///
/// Three cell classes react differently: OUTER room walls are pierced
/// (and their 3x3 neighbourhood hardened to SOLID so nothing pierces
/// next door), INNER and SOLID walls refuse, open floor joins. The walk
/// is biased toward the target with tunable bend and random-step
/// chances, and may terminate early once far from its origin.
fn build_tunnel(
    grid: &mut Grid,
    dun: &mut Dun,
    rng: &mut deephold_core::rng::GameRng,
    mut x1: i32,
    mut y1: i32,
    x2: i32,
    y2: i32,
) {
    dun.tunn.clear();
    dun.walls.clear();

    let (start_x, start_y) = (x1, y1);
    let (mut dx, mut dy) = correct_dir(x1, y1, x2, y2);
    let mut door_flag = false;
    let mut loops = 0;

    while (x1 != x2 || y1 != y2) && loops < 2000 {
        loops += 1;

        if rng.rand_int(100) < DUN_TUN_CHG {
            let (cx, cy) = correct_dir(x1, y1, x2, y2);
            dx = cx;
            dy = cy;
            if rng.rand_int(100) < DUN_TUN_RND {
                let (rx, ry) = rand_dir(rng);
                dx = rx;
                dy = ry;
            }
        }

        let mut tx = x1 + dx;
        let mut ty = y1 + dy;
        while !grid.in_bounds_fully(tx, ty) {
            let (cx, cy) = correct_dir(x1, y1, x2, y2);
            dx = cx;
            dy = cy;
            if rng.rand_int(100) < DUN_TUN_RND {
                let (rx, ry) = rand_dir(rng);
                dx = rx;
                dy = ry;
            }
            tx = x1 + dx;
            ty = y1 + dy;
        }

        let f = grid.feat(tx, ty);

        // The edge of the world and of vaults, and hardened walls, all
        // deflect the walk.
        if f == feat::PERM_SOLID || f == feat::PERM_OUTER || f == feat::WALL_SOLID {
            continue;
        }

        if f == feat::WALL_OUTER {
            // Look one past the wall; refuse to pierce into more wall.
            let nx = tx + dx;
            let ny = ty + dy;
            let beyond = grid.feat(nx, ny);
            if matches!(
                beyond,
                feat::PERM_SOLID | feat::PERM_OUTER | feat::WALL_OUTER | feat::WALL_SOLID
            ) {
                continue;
            }

            x1 = tx;
            y1 = ty;
            dun.walls.push((x1, y1));

            // Forbid re-entry around this piercing.
            for wy in y1 - 1..=y1 + 1 {
                for wx in x1 - 1..=x1 + 1 {
                    if grid.in_bounds(wx, wy) && grid.feat(wx, wy) == feat::WALL_OUTER {
                        grid.set_feature(wx, wy, feat::WALL_SOLID);
                    }
                }
            }
        } else if grid.cell(tx, ty).has(CellFlags::ROOM) {
            // Travel quickly through rooms.
            x1 = tx;
            y1 = ty;
        } else if f == feat::GRANITE || f == feat::WALL_INNER {
            if f == feat::WALL_INNER {
                // Inner walls refuse; turn instead.
                continue;
            }
            x1 = tx;
            y1 = ty;
            dun.tunn.push((x1, y1));
            door_flag = false;
        } else {
            // Corridor intersection or other open ground.
            x1 = tx;
            y1 = ty;
            if !door_flag {
                dun.doors.push((x1, y1));
                door_flag = true;
            }
            if rng.rand_int(100) >= DUN_TUN_CON {
                let drow = (y1 - start_y).abs();
                let dcol = (x1 - start_x).abs();
                if drow > 10 || dcol > 10 {
                    break;
                }
            }
        }
    }

    for &(x, y) in &dun.tunn {
        grid.set_feature(x, y, feat::FLOOR);
    }
    let walls = dun.walls.clone();
    for &(x, y) in &walls {
        grid.set_feature(x, y, feat::FLOOR);
        if rng.rand_int(100) < DUN_TUN_PEN {
            place_random_door_raw(grid, rng, x, y);
        }
    }
}

/// Pick a door feature at the tunable mix.
fn place_random_door_raw(grid: &mut Grid, rng: &mut deephold_core::rng::GameRng, x: i32, y: i32) {
    let roll = rng.rand_int(1000);
    let f = if roll < 300 {
        feat::DOOR_OPEN
    } else if roll < 400 {
        feat::DOOR_BROKEN
    } else if roll < 600 {
        feat::DOOR_SECRET
    } else if roll < 900 {
        feat::DOOR_CLOSED
    } else {
        feat::DOOR_LOCKED
    };
    grid.set_feature(x, y, f);
}

/// Enough corridor neighbours and opposing walls to justify a door?
fn possible_doorway(grid: &Grid, x: i32, y: i32) -> bool {
    if !grid.in_bounds_fully(x, y) {
        return false;
    }
    let mut corridors = 0;
    for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
        if grid.cell_floor(x + dx, y + dy) {
            corridors += 1;
        }
    }
    if corridors < 2 {
        return false;
    }
    let vertical_walls = feature::is_wall(grid.feat(x, y - 1)) && feature::is_wall(grid.feat(x, y + 1));
    let horizontal_walls = feature::is_wall(grid.feat(x - 1, y)) && feature::is_wall(grid.feat(x + 1, y));
    vertical_walls || horizontal_walls
}

/// Try doors around a tunnel junction; deep doors may carry traps.
fn try_doors(world: &mut World, grid: &mut Grid, params: &GenParams, x: i32, y: i32) {
    for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
        let (tx, ty) = (x + dx, y + dy);
        if !grid.in_bounds_fully(tx, ty) || !grid.cell_floor(tx, ty) {
            continue;
        }
        if grid.rand_junction_roll(&mut world.rng) && possible_doorway(grid, tx, ty) {
            place_random_door_raw(grid, &mut world.rng, tx, ty);
            // Doors this shallow are never trapped; deeper ones may be.
            if params.depth > DOOR_TRAP_DEPTH
                && world.rng.magik((params.depth / 2).min(50))
            {
                grid.add_overlay(tx, ty, Overlay::Trap { kind: TrapKind::Alarm, found: false });
            }
        }
    }
}

// ---------------------------------------------------------------------
// Streamers, lakes, destruction.
// ---------------------------------------------------------------------

/// Overlay a vein of `streamer_feat` along a random linear sweep. Vein
/// cells may hide treasure that shows when dug.
fn build_streamer(
    grid: &mut Grid,
    rng: &mut deephold_core::rng::GameRng,
    streamer_feat: deephold_core::types::FeatId,
    treasure_chance: i32,
) {
    let mut x = grid.width / 2 + rng.rand_int(30) - 15;
    let mut y = grid.height / 2 + rng.rand_int(20) - 10;
    let (dx, dy) = *rng.choose(&[
        (1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (-1, -1), (1, -1), (-1, 1),
    ]);

    loop {
        for _ in 0..DUN_STR_DEN {
            let sx = x + rng.rand_int(DUN_STR_RNG * 2 + 1) - DUN_STR_RNG;
            let sy = y + rng.rand_int(DUN_STR_RNG * 2 + 1) - DUN_STR_RNG;
            if !grid.in_bounds_fully(sx, sy) {
                continue;
            }
            if grid.cell(sx, sy).has(CellFlags::ICKY) {
                continue;
            }
            let f = grid.feat(sx, sy);
            if !matches!(f, feat::GRANITE | feat::WALL_INNER | feat::WALL_OUTER | feat::WALL_SOLID) {
                continue;
            }
            if treasure_chance > 0 && rng.one_in(treasure_chance) {
                let hidden = if streamer_feat == feat::MAGMA {
                    feat::MAGMA_HIDDEN
                } else {
                    feat::QUARTZ_HIDDEN
                };
                grid.set_feature(sx, sy, hidden);
                grid.add_overlay(sx, sy, Overlay::HiddenTreasure);
            } else {
                grid.set_feature(sx, sy, streamer_feat);
            }
        }
        x += dx;
        y += dy;
        if !grid.in_bounds_fully(x, y) {
            break;
        }
    }
}

/// Water streamers flood open floor as well as rock.
fn build_water_streamer(grid: &mut Grid, rng: &mut deephold_core::rng::GameRng) {
    let mut x = rng.rand_int(grid.width - 2) + 1;
    let mut y = rng.rand_int(grid.height - 2) + 1;
    let (dx, dy) = *rng.choose(&[(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (-1, -1)]);

    loop {
        for _ in 0..DUN_STR_DEN {
            let sx = x + rng.rand_int(DUN_STR_RNG * 2 + 1) - DUN_STR_RNG;
            let sy = y + rng.rand_int(DUN_STR_RNG * 2 + 1) - DUN_STR_RNG;
            if !grid.in_bounds_fully(sx, sy) {
                continue;
            }
            let c = grid.cell(sx, sy);
            if c.has(CellFlags::ICKY) || feature::is_permanent(c.feat) {
                continue;
            }
            if grid.cell_floor(sx, sy) && !feature::is_protected(c.feat) {
                grid.set_feature(sx, sy, feat::DEEP_WATER);
            }
        }
        x += dx;
        y += dy;
        if !grid.in_bounds_fully(x, y) {
            break;
        }
    }
}

/// A few roundish pools on watery levels.
fn lake_level(grid: &mut Grid, dun: &mut Dun, rng: &mut deephold_core::rng::GameRng) {
    for _ in 0..DUN_LAKE_TRY {
        if !rng.one_in(3) {
            continue;
        }
        let cx = rng.rand_int(grid.width - 20) + 10;
        let cy = rng.rand_int(grid.height - 14) + 7;
        let r = 3 + rng.rand_int(4);
        for y in cy - r..=cy + r {
            for x in cx - r..=cx + r {
                if !grid.in_bounds_fully(x, y) {
                    continue;
                }
                let d2 = (x - cx) * (x - cx) + (y - cy) * (y - cy);
                if d2 > r * r {
                    continue;
                }
                let c = grid.cell(x, y);
                if c.has(CellFlags::ICKY) || feature::is_permanent(c.feat) {
                    continue;
                }
                if grid.cell_floor(x, y) || d2 < (r - 1) * (r - 1) {
                    let f = if d2 * 2 > r * r { feat::SHALLOW_WATER } else { feat::DEEP_WATER };
                    if !feature::is_protected(grid.feat(x, y)) {
                        grid.set_feature(x, y, f);
                    }
                }
            }
        }
        // Lakes want fish.
        dun.spawns.push(SpawnSpec {
            x: cx,
            y: cy,
            boost: 0,
            theme: Theme::Aquatic,
            sleep: true,
            group: true,
        });
    }
}

/// Destroyed-mode roll: deep floors occasionally detonate, unless the
/// level's own flags forbid it.
fn roll_destroyed(
    rng: &mut deephold_core::rng::GameRng,
    depth: i32,
    flags: LevelFlags,
) -> bool {
    if flags.contains(LevelFlags::NO_DESTROY) {
        return false;
    }
    depth > 10 && rng.one_in(DUN_DEST)
}

/// Drop a few blast epicentres and re-roll everything inside them.
fn destroy_level(grid: &mut Grid, rng: &mut deephold_core::rng::GameRng) {
    let epicentres = 1 + rng.randint(3);
    for _ in 0..epicentres {
        let cx = rng.rand_int(grid.width - 10) + 5;
        let cy = rng.rand_int(grid.height - 10) + 5;
        destroy_epicentre(grid, rng, cx, cy);
    }
}

/// One blast: every cell in the disc re-rolls its terrain and loses its
/// contents and room lighting. Vault cells and permanent rock are immune.
fn destroy_epicentre(grid: &mut Grid, rng: &mut deephold_core::rng::GameRng, cx: i32, cy: i32) {
    for y in cy - DESTROY_RADIUS..=cy + DESTROY_RADIUS {
        for x in cx - DESTROY_RADIUS..=cx + DESTROY_RADIUS {
            if !grid.in_bounds_fully(x, y) {
                continue;
            }
            let d2 = (x - cx) * (x - cx) + (y - cy) * (y - cy);
            if d2 > DESTROY_RADIUS * DESTROY_RADIUS {
                continue;
            }
            let c = grid.cell(x, y);
            if c.has(CellFlags::ICKY) || feature::is_permanent(c.feat) {
                continue;
            }

            let roll = rng.rand_int(100);
            let f = if roll < 20 {
                feat::GRANITE
            } else if roll < 35 {
                feat::QUARTZ
            } else if roll < 50 {
                feat::MAGMA
            } else {
                feat::FLOOR
            };
            grid.set_feature(x, y, f);
            let cell = grid.cell_mut(x, y);
            cell.m_idx = 0;
            cell.o_idx = 0;
            cell.clear(CellFlags::ROOM);
            cell.clear(CellFlags::GLOW);
        }
    }
}

// ---------------------------------------------------------------------
// Connectivity.
// ---------------------------------------------------------------------

/// Flood-fill from a room centroid and stitch every unreachable open
/// pocket back on, carving through soft rock (vault shells get a secret
/// door instead of a hole). Fails when the open region stays tiny.
fn repair_connectivity(grid: &mut Grid, dun: &Dun) -> Result<(), GenFail> {
    let w = grid.width as usize;
    let h = grid.height as usize;
    let idx = |x: i32, y: i32| y as usize * w + x as usize;

    let passable = |grid: &Grid, x: i32, y: i32| {
        let f = grid.feat(x, y);
        feature::is_floor(f) || feature::is_door(f) || f == feat::DEEP_WATER || f == feat::LAVA
    };

    // Seed from the first centroid that is actually open, else any open cell.
    let mut seed = None;
    for &(cx, cy) in &dun.cent {
        if passable(grid, cx, cy) {
            seed = Some((cx, cy));
            break;
        }
    }
    if seed.is_none() {
        'scan: for y in 1..grid.height - 1 {
            for x in 1..grid.width - 1 {
                if passable(grid, x, y) {
                    seed = Some((x, y));
                    break 'scan;
                }
            }
        }
    }
    let Some(seed) = seed else { return Err(GenFail::TooSmall) };

    let flood = |grid: &Grid, seed: (i32, i32)| -> Vec<bool> {
        let mut reached = vec![false; w * h];
        let mut queue = vec![seed];
        reached[idx(seed.0, seed.1)] = true;
        while let Some((x, y)) = queue.pop() {
            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let (nx, ny) = (x + dx, y + dy);
                if !grid.in_bounds(nx, ny) || reached[idx(nx, ny)] {
                    continue;
                }
                if passable(grid, nx, ny) {
                    reached[idx(nx, ny)] = true;
                    queue.push((nx, ny));
                }
            }
        }
        reached
    };

    // Stitch pockets until the open region is connected, bounded so a
    // pathological grid cannot loop forever.
    for _ in 0..64 {
        let reached = flood(grid, seed);

        let mut pocket = None;
        'find: for y in 1..grid.height - 1 {
            for x in 1..grid.width - 1 {
                if passable(grid, x, y) && !reached[idx(x, y)] {
                    pocket = Some((x, y));
                    break 'find;
                }
            }
        }
        let Some(pocket) = pocket else {
            let open = reached.iter().filter(|&&r| r).count();
            if open < FRACTAL_MIN_CELLS {
                return Err(GenFail::TooSmall);
            }
            return Ok(());
        };

        // BFS from the pocket through soft rock to the reached region,
        // then carve the discovered path.
        let mut prev: Vec<i32> = vec![-1; w * h];
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(pocket);
        prev[idx(pocket.0, pocket.1)] = idx(pocket.0, pocket.1) as i32;
        let mut junction = None;
        'bfs: while let Some((x, y)) = queue.pop_front() {
            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let (nx, ny) = (x + dx, y + dy);
                if !grid.in_bounds_fully(nx, ny) || prev[idx(nx, ny)] != -1 {
                    continue;
                }
                let f = grid.feat(nx, ny);
                if feature::is_permanent(f) {
                    continue;
                }
                prev[idx(nx, ny)] = idx(x, y) as i32;
                if reached[idx(nx, ny)] {
                    junction = Some((nx, ny));
                    break 'bfs;
                }
                queue.push_back((nx, ny));
            }
        }

        let Some(mut cursor) = junction else {
            // Sealed behind permanent rock; the pocket is lost ground.
            seal_pocket(grid, pocket);
            continue;
        };

        // Walk the path back to the pocket, opening what blocks it.
        loop {
            let (x, y) = cursor;
            let f = grid.feat(x, y);
            if feature::is_wall(f) {
                if grid.cell(x, y).has(CellFlags::ICKY) {
                    grid.set_feature(x, y, feat::DOOR_SECRET);
                } else {
                    grid.set_feature(x, y, feat::FLOOR);
                }
            }
            let p = prev[idx(x, y)];
            let next = ((p % w as i32), (p / w as i32));
            if next == cursor {
                break;
            }
            cursor = next;
        }
    }
    Ok(())
}

/// Give up on an unreachable pocket: fill it with granite.
fn seal_pocket(grid: &mut Grid, seed: (i32, i32)) {
    let mut queue = vec![seed];
    while let Some((x, y)) = queue.pop() {
        if !grid.in_bounds_fully(x, y) {
            continue;
        }
        let f = grid.feat(x, y);
        if !(feature::is_floor(f) || feature::is_door(f) || f == feat::DEEP_WATER || f == feat::LAVA)
        {
            continue;
        }
        grid.set_feature(x, y, feat::GRANITE);
        let cell = grid.cell_mut(x, y);
        cell.clear(CellFlags::ROOM);
        cell.clear(CellFlags::GLOW);
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            queue.push((x + dx, y + dy));
        }
    }
}

// ---------------------------------------------------------------------
// Stairs and allocation.
// ---------------------------------------------------------------------

/// Place both stair flights near walls, scaled by level size, with an
/// extra batch at comfortable depths. Records one landing per direction.
fn place_stairs(
    world: &mut World,
    grid: &mut Grid,
    params: &GenParams,
    flags: LevelFlags,
    ratio: i32,
) -> Result<(Option<(i32, i32)>, Option<(i32, i32)>), GenFail> {
    if flags.contains(LevelFlags::NO_STAIR) {
        return Ok((None, None));
    }

    let max_depth = world.wild.handle(params.wpos).map_or(127, |h| h.max_depth);
    let at_bottom = params.wpos.floor() >= max_depth;

    let mut down_n = if at_bottom {
        0
    } else {
        world.rng.rand_range(3, 4) * ratio / 100 + 1
    };
    let mut up_n = world.rng.rand_range(1, 2);
    if params.depth <= COMFORT_PASSAGE_DEPTH {
        if !at_bottom {
            down_n += world.rng.rand_range(2, 4);
        }
        up_n += world.rng.rand_range(3, 4);
    }

    let mut down_landing = None;
    let mut up_landing = None;

    for (count, stair_feat, landing) in [
        (down_n, feat::STAIR_DOWN, &mut down_landing),
        (up_n, feat::STAIR_UP, &mut up_landing),
    ] {
        let mut placed = 0;
        // Relax the wall-adjacency requirement as attempts fail.
        'walls: for walls in (0..=3).rev() {
            for _ in 0..3000 {
                if placed >= count {
                    break 'walls;
                }
                let x = world.rng.rand_int(grid.width - 2) + 1;
                let y = world.rng.rand_int(grid.height - 2) + 1;
                if !grid.cell_naked(x, y) || grid.cell(x, y).has(CellFlags::ICKY) {
                    continue;
                }
                if grid.next_to_walls(x, y) < walls {
                    continue;
                }
                grid.set_feature(x, y, stair_feat);
                if landing.is_none() {
                    *landing = Some((x, y));
                }
                placed += 1;
            }
        }
        if placed == 0 && count > 0 {
            return Err(GenFail::NoStairs);
        }
    }

    Ok((up_landing, down_landing))
}

/// Scatter rubble, traps, gold and object spots, between-gate pairs and
/// fountains. Counts are normal(mean, 3) scaled by the size ratio.
fn allocate_features(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    bonus: bool,
) {
    let ratio = dun.ratio;
    let scale = |world: &mut World, mean: i32| -> i32 {
        world.rng.randnor(mean, 3) * ratio / 100 + 1
    };

    let mut naked_spot = |world: &mut World, grid: &Grid, room_only: bool| -> Option<(i32, i32)> {
        for _ in 0..500 {
            let x = world.rng.rand_int(grid.width - 2) + 1;
            let y = world.rng.rand_int(grid.height - 2) + 1;
            if !grid.cell_naked(x, y) || grid.cell(x, y).has(CellFlags::ICKY) {
                continue;
            }
            if room_only && !grid.cell(x, y).has(CellFlags::ROOM) {
                continue;
            }
            return Some((x, y));
        }
        None
    };

    // Rubble in corridors.
    let rubble = world.rng.randint((params.depth / 3).clamp(2, 10));
    for _ in 0..rubble {
        if let Some((x, y)) = naked_spot(world, grid, false) {
            if !grid.cell(x, y).has(CellFlags::ROOM) {
                grid.set_feature(x, y, feat::RUBBLE);
            }
        }
    }

    // Floor traps.
    let traps = world.rng.randint((params.depth / 3).clamp(2, 10) * if bonus { 3 } else { 1 });
    for _ in 0..traps {
        if let Some((x, y)) = naked_spot(world, grid, false) {
            let kind = *world.rng.choose(&[
                TrapKind::Pit,
                TrapKind::Dart,
                TrapKind::PoisonGas,
                TrapKind::TeleportAway,
                TrapKind::Summon,
                TrapKind::Alarm,
            ]);
            grid.add_overlay(x, y, Overlay::Trap { kind, found: false });
        }
    }

    // Objects in rooms, then objects and gold anywhere.
    for _ in 0..scale(world, DUN_AMT_ROOM) {
        if let Some((x, y)) = naked_spot(world, grid, true) {
            dun.item_spots.push(ItemSpec { x, y, gold: false });
        }
    }
    for _ in 0..scale(world, DUN_AMT_ITEM) {
        if let Some((x, y)) = naked_spot(world, grid, false) {
            dun.item_spots.push(ItemSpec { x, y, gold: false });
        }
    }
    for _ in 0..scale(world, DUN_AMT_GOLD) {
        if let Some((x, y)) = naked_spot(world, grid, false) {
            dun.item_spots.push(ItemSpec { x, y, gold: true });
        }
    }

    // Between-gate pairs: both endpoints carry the partner coordinate so
    // stepping on either teleports atomically to the other.
    for _ in 0..scale(world, DUN_AMT_BETWEEN) {
        let Some((ax, ay)) = naked_spot(world, grid, true) else { continue };
        grid.set_feature(ax, ay, feat::BETWEEN_GATE);
        let Some((bx, by)) = naked_spot(world, grid, true) else {
            // No partner cell: revert the lone endpoint.
            grid.set_feature(ax, ay, feat::FLOOR);
            continue;
        };
        grid.set_feature(bx, by, feat::BETWEEN_GATE);
        grid.add_overlay(ax, ay, Overlay::Between { to_x: bx, to_y: by });
        grid.add_overlay(bx, by, Overlay::Between { to_x: ax, to_y: ay });
    }

    // Fountains: terrain plus bottled stock in the overlay.
    for _ in 0..scale(world, DUN_AMT_FOUNTAIN) {
        if let Some((x, y)) = naked_spot(world, grid, true) {
            let kind = fountain_stock(world, params.depth);
            grid.set_feature(x, y, feat::FOUNTAIN);
            grid.add_overlay(
                x,
                y,
                Overlay::Fountain { kind, uses: 1 + world.rng.randint(3) as u8 },
            );
        }
    }
}

fn fountain_stock(world: &mut World, depth: i32) -> u16 {
    let potions: Vec<u16> = world
        .catalog
        .kinds
        .iter()
        .enumerate()
        .filter(|(_, k)| {
            matches!(k.class, deephold_core::types::ItemClass::Potion) && k.level <= depth + 5
        })
        .map(|(i, _)| i as u16)
        .collect();
    if potions.is_empty() {
        deephold_core::catalog::kind_ids::CURE_LIGHT
    } else {
        *world.rng.choose(&potions)
    }
}

impl Grid {
    /// Junction-door probability roll, kept with the grid so `try_doors`
    /// reads as one sentence.
    fn rand_junction_roll(&self, rng: &mut deephold_core::rng::GameRng) -> bool {
        rng.rand_int(100) < DUN_TUN_JCT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deephold_core::catalog::Catalog;

    use crate::cave::OverlayKind;
    use crate::config::Config;
    use crate::world::{DungeonHandle, World};

    fn gen_world(seed: u64) -> World {
        let mut world = World::new(Config::default(), Catalog::builtin(), seed);
        world.wild.get_mut(5, 5).dungeon = Some(DungeonHandle {
            type_id: 0,
            flags: DungeonFlags::RANDOM.bits(),
            max_depth: 100,
        });
        world
    }

    fn passable(grid: &Grid, x: i32, y: i32) -> bool {
        let f = grid.feat(x, y);
        feature::is_floor(f) || feature::is_door(f) || f == feat::DEEP_WATER || f == feat::LAVA
    }

    #[test]
    fn boundary_is_permanent_everywhere() {
        for seed in 0..4u64 {
            let mut world = gen_world(seed);
            let wpos = WorldPos::new(5, 5, -(4 + seed as i16 * 7));
            let params = GenParams {
                wpos,
                depth: world.depth_at(wpos),
                dungeon_type: 0,
            };
            build_level(&mut world, &params).unwrap();
            let grid = world.levels.grid(wpos).unwrap();
            for x in 0..grid.width {
                assert_eq!(grid.feat(x, 0), feat::PERM_SOLID);
                assert_eq!(grid.feat(x, grid.height - 1), feat::PERM_SOLID);
            }
            for y in 0..grid.height {
                assert_eq!(grid.feat(0, y), feat::PERM_SOLID);
                assert_eq!(grid.feat(grid.width - 1, y), feat::PERM_SOLID);
            }
        }
    }

    #[test]
    fn every_open_cell_is_reachable() {
        for seed in 0..6u64 {
            let mut world = gen_world(100 + seed);
            let wpos = WorldPos::new(5, 5, -(2 + seed as i16 * 9));
            let params = GenParams {
                wpos,
                depth: world.depth_at(wpos),
                dungeon_type: 0,
            };
            build_level(&mut world, &params).unwrap();
            let grid = world.levels.grid(wpos).unwrap();

            // Flood from one open cell; every other open cell must be hit.
            let mut seed_cell = None;
            'outer: for y in 1..grid.height - 1 {
                for x in 1..grid.width - 1 {
                    if passable(grid, x, y) {
                        seed_cell = Some((x, y));
                        break 'outer;
                    }
                }
            }
            let seed_cell = seed_cell.expect("level has open cells");
            let mut reached =
                vec![false; (grid.width * grid.height) as usize];
            let idx = |x: i32, y: i32| (y * grid.width + x) as usize;
            let mut queue = vec![seed_cell];
            reached[idx(seed_cell.0, seed_cell.1)] = true;
            while let Some((x, y)) = queue.pop() {
                for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                    let (nx, ny) = (x + dx, y + dy);
                    if grid.in_bounds(nx, ny) && !reached[idx(nx, ny)] && passable(grid, nx, ny) {
                        reached[idx(nx, ny)] = true;
                        queue.push((nx, ny));
                    }
                }
            }

            let mut unreachable = 0;
            for y in 1..grid.height - 1 {
                for x in 1..grid.width - 1 {
                    if passable(grid, x, y) && !reached[idx(x, y)] {
                        unreachable += 1;
                    }
                }
            }
            assert_eq!(unreachable, 0, "seed {} left unreachable open cells", seed);
        }
    }

    #[test]
    fn stairs_exist_in_both_directions() {
        let mut world = gen_world(7);
        let wpos = WorldPos::new(5, 5, -12);
        let params = GenParams { wpos, depth: world.depth_at(wpos), dungeon_type: 0 };
        build_level(&mut world, &params).unwrap();
        let level = world.levels.get(wpos).unwrap();
        assert!(level.up_landing.is_some());
        assert!(level.down_landing.is_some());
        let grid = level.grid.as_ref().unwrap();
        let mut ups = 0;
        let mut downs = 0;
        for y in 0..grid.height {
            for x in 0..grid.width {
                match grid.feat(x, y) {
                    feat::STAIR_UP => ups += 1,
                    feat::STAIR_DOWN => downs += 1,
                    _ => {}
                }
            }
        }
        assert!(ups >= 1);
        assert!(downs >= 1);
    }

    #[test]
    fn bottom_floor_has_no_down_stairs() {
        let mut world = gen_world(8);
        world.wild.get_mut(5, 5).dungeon.as_mut().unwrap().max_depth = 9;
        let wpos = WorldPos::new(5, 5, -9);
        let params = GenParams { wpos, depth: world.depth_at(wpos), dungeon_type: 0 };
        build_level(&mut world, &params).unwrap();
        let grid = world.levels.grid(wpos).unwrap();
        for y in 0..grid.height {
            for x in 0..grid.width {
                assert_ne!(grid.feat(x, y), feat::STAIR_DOWN);
            }
        }
    }

    #[test]
    fn between_gates_pair_symmetrically() {
        let mut found_any = false;
        for seed in 0..8u64 {
            let mut world = gen_world(200 + seed);
            let wpos = WorldPos::new(5, 5, -15);
            let params = GenParams { wpos, depth: world.depth_at(wpos), dungeon_type: 0 };
            build_level(&mut world, &params).unwrap();
            let grid = world.levels.grid(wpos).unwrap();
            for y in 0..grid.height {
                for x in 0..grid.width {
                    if let Some(Overlay::Between { to_x, to_y }) =
                        grid.get_overlay(x, y, OverlayKind::Between)
                    {
                        found_any = true;
                        match grid.get_overlay(*to_x, *to_y, OverlayKind::Between) {
                            Some(Overlay::Between { to_x: bx, to_y: by }) => {
                                assert_eq!((*bx, *by), (x, y), "gate round trip broken");
                            }
                            other => panic!("partner is not a gate: {:?}", other),
                        }
                    }
                }
            }
        }
        assert!(found_any, "no between-gates generated across eight levels");
    }

    #[test]
    fn an_epicentre_replaces_most_of_its_disc() {
        // Drive one blast at a known centre so the disc can be audited.
        let mut world = gen_world(9);
        let mut grid = Grid::solid(100, 60);
        for y in 1..59 {
            for x in 1..99 {
                grid.set_feature(x, y, feat::FLOOR);
                grid.cell_mut(x, y).set(CellFlags::ROOM);
            }
        }
        let (cx, cy) = (50, 30);
        destroy_epicentre(&mut grid, &mut world.rng, cx, cy);

        let mut replaced = 0;
        let mut disc = 0;
        for y in cy - DESTROY_RADIUS..=cy + DESTROY_RADIUS {
            for x in cx - DESTROY_RADIUS..=cx + DESTROY_RADIUS {
                let d2 = (x - cx) * (x - cx) + (y - cy) * (y - cy);
                if d2 > DESTROY_RADIUS * DESTROY_RADIUS {
                    continue;
                }
                disc += 1;
                if grid.feat(x, y) != feat::FLOOR || !grid.cell(x, y).has(CellFlags::ROOM) {
                    replaced += 1;
                }
            }
        }
        assert!(
            replaced * 100 > disc * 80,
            "only {}/{} cells of the epicentre changed",
            replaced,
            disc
        );
        // The blast stays inside its radius.
        assert_eq!(grid.feat(cx + DESTROY_RADIUS + 2, cy), feat::FLOOR);
        assert!(grid.cell(cx + DESTROY_RADIUS + 2, cy).has(CellFlags::ROOM));
    }

    #[test]
    fn destruction_spares_vault_cells() {
        let mut world = gen_world(10);
        let mut grid = Grid::solid(100, 60);
        for y in 1..59 {
            for x in 1..99 {
                grid.set_feature(x, y, feat::FLOOR);
                grid.cell_mut(x, y).set(CellFlags::ROOM);
            }
        }
        let (cx, cy) = (50, 30);
        grid.cell_mut(cx, cy).set(CellFlags::ICKY);
        destroy_level(&mut grid, &mut world.rng);
        // Whatever landed, the vault cell is untouched.
        assert_eq!(grid.feat(cx, cy), feat::FLOOR);
        assert!(grid.cell(cx, cy).has(CellFlags::ROOM));
    }

    #[test]
    fn no_destroy_flag_suppresses_the_mode() {
        let mut world = gen_world(12);
        // The flag beats the dice every time.
        for _ in 0..200 {
            assert!(!roll_destroyed(
                &mut world.rng,
                20,
                LevelFlags::NO_DESTROY
            ));
        }
        // Shallow floors never detonate either.
        for _ in 0..200 {
            assert!(!roll_destroyed(&mut world.rng, 10, LevelFlags::empty()));
        }
        // Without the flag the roll does fire at depth.
        let mut fired = false;
        for _ in 0..200 {
            if roll_destroyed(&mut world.rng, 20, LevelFlags::empty()) {
                fired = true;
                break;
            }
        }
        assert!(fired, "the destroyed roll never came up in 200 tries");
    }

    #[test]
    fn population_lands_monsters() {
        let mut world = gen_world(11);
        let wpos = WorldPos::new(5, 5, -20);
        let params = GenParams { wpos, depth: world.depth_at(wpos), dungeon_type: 0 };
        build_level(&mut world, &params).unwrap();
        assert!(world.monsters.alive() > 0, "a depth-20 floor spawns monsters");
        for (id, m) in world.monsters.iter_alive() {
            let grid = world.levels.grid(m.wpos).unwrap();
            assert_eq!(grid.cell(m.x, m.y).m_idx, id);
        }
    }
}
