//! Constants module - dimensions, limits and tunables shared by every layer.

// =============================================================================
// Time
// =============================================================================

/// Scheduler wakeups per real-time second.
pub const FPS: i32 = 20;
/// Microseconds per scheduler wakeup.
pub const TICK_US: i64 = 1_000_000 / FPS as i64;

/// Energy an entity must accumulate before it may act.
pub const ENERGY_THRESHOLD: i32 = 1000;
/// Speed value that credits exactly one action per game turn.
pub const SPEED_NORMAL: i32 = 100;
/// Baseline per-level time rate; deeper floors run faster than this.
pub const LEVEL_SPEED_BASE: i32 = 100;

// =============================================================================
// World dimensions
// =============================================================================

/// Overworld extent in surface tiles.
pub const WILD_X: i32 = 64;
pub const WILD_Y: i32 = 64;

/// Full floor grid size; small levels scale down from this.
pub const MAX_HGT: i32 = 66;
pub const MAX_WID: i32 = 198;

/// Minimum floor grid size, roughly a third of full.
pub const MIN_HGT: i32 = 22;
pub const MIN_WID: i32 = 66;

/// Room placement operates on blocks of this size.
pub const BLOCK_HGT: i32 = 11;
pub const BLOCK_WID: i32 = 11;

/// Upper bounds for the per-generation block map.
pub const MAX_ROOMS_ROW: usize = (MAX_HGT / BLOCK_HGT) as usize;
pub const MAX_ROOMS_COL: usize = (MAX_WID / BLOCK_WID) as usize;

// =============================================================================
// Entity pools
// =============================================================================

/// Live monster instances, world-wide.
pub const MAX_MONSTERS: usize = 8192;
/// Live item instances, world-wide.
pub const MAX_ITEMS: usize = 16384;
/// Connected players.
pub const MAX_PLAYERS: usize = 256;

/// Compaction kicks in above this fill ratio (numerator / denominator).
pub const POOL_HIGH_WATER_NUM: usize = 3;
pub const POOL_HIGH_WATER_DEN: usize = 4;

// =============================================================================
// Dungeon generation
// =============================================================================

/// Room placement attempts per level.
pub const DUN_ROOMS: usize = 50;
/// Level/chance of unusual room.
pub const DUN_UNUSUAL: i32 = 200;
/// 1/chance of a destroyed level (below depth 10).
pub const DUN_DEST: i32 = 15;
/// 1/chance of a small level.
pub const SMALL_LEVEL: i32 = 3;
/// 1/chance of an empty (arena) level.
pub const EMPTY_LEVEL: i32 = 15;
/// 1/chance an arena level is dark.
pub const DARK_EMPTY: i32 = 5;
/// depth/chance of a cavern level.
pub const DUN_CAVERN: i32 = 30;
/// 1/chance extra check for cavern level.
pub const DUN_CAVERN2: i32 = 20;
/// depth/DUN_MAZE_FACTOR chance of a maze level.
pub const DUN_MAZE_FACTOR: i32 = 1000;
/// Percent of mazes built of permanent wall.
pub const DUN_MAZE_PERMAWALL: i32 = 20;

/// Tunnel: chance of random direction per bend.
pub const DUN_TUN_RND: i32 = 10;
/// Tunnel: chance of changing direction per step.
pub const DUN_TUN_CHG: i32 = 30;
/// Tunnel: chance of keeping going past a junction.
pub const DUN_TUN_CON: i32 = 15;
/// Tunnel: chance of a door where a room wall is pierced.
pub const DUN_TUN_PEN: i32 = 25;
/// Tunnel: chance of a door at a corridor junction.
pub const DUN_TUN_JCT: i32 = 90;

/// Streamers: number of magma veins.
pub const DUN_STR_MAG: usize = 3;
/// Streamers: 1/chance of treasure per magma cell.
pub const DUN_STR_MC: i32 = 90;
/// Streamers: number of quartz veins.
pub const DUN_STR_QUA: usize = 2;
/// Streamers: 1/chance of treasure per quartz cell.
pub const DUN_STR_QC: i32 = 40;
/// Streamers: density of each sweep.
pub const DUN_STR_DEN: i32 = 5;
/// Streamers: spread around the sweep line.
pub const DUN_STR_RNG: i32 = 2;
/// Streamers: number of water veins on watery levels.
pub const DUN_STR_WAT: usize = 4;

/// Base chance of a watery level; reduced with depth.
pub const DUN_RIVER_CHANCE: i32 = 15;
pub const DUN_RIVER_REDUCE: i32 = 7;
/// Lake placement attempts on watery levels.
pub const DUN_LAKE_TRY: usize = 6;

/// Mean object allocations per level, before size scaling.
pub const DUN_AMT_ROOM: i32 = 9;
pub const DUN_AMT_ITEM: i32 = 3;
pub const DUN_AMT_GOLD: i32 = 3;
pub const DUN_AMT_BETWEEN: i32 = 2;
pub const DUN_AMT_FOUNTAIN: i32 = 1;

/// Destroyed levels: epicentre blast radius.
pub const DESTROY_RADIUS: i32 = 15;

/// Levels at or above this depth get an extra batch of stairs.
pub const COMFORT_PASSAGE_DEPTH: i32 = 5;

/// Doors at or above this depth are never trapped.
pub const DOOR_TRAP_DEPTH: i32 = 5;

/// Level feature flag probabilities (percent).
pub const NO_TELEPORT_CHANCE: i32 = 3;
pub const NO_MAGIC_CHANCE: i32 = 1;
pub const NO_GENO_CHANCE: i32 = 3;
pub const NO_MAP_CHANCE: i32 = 2;
pub const NO_MAGIC_MAP_CHANCE: i32 = 3;
pub const NO_DESTROY_CHANCE: i32 = 2;

/// Whole-level regeneration attempts before `acquire` gives up.
pub const GEN_RETRIES: usize = 16;
/// Fractal room carve attempts before the room constructor gives up.
pub const FRACTAL_RETRIES: usize = 10;
/// A fractal cave below this many connected cells is discarded.
pub const FRACTAL_MIN_CELLS: usize = 10;

// =============================================================================
// Towns
// =============================================================================

/// Building slots in a town: 6 rows by 12 columns.
pub const TOWN_ROWS: i32 = 6;
pub const TOWN_COLS: i32 = 12;
/// Distinct shop kinds; slots beyond these become houses.
pub const MAX_SHOPS: usize = 16;

// =============================================================================
// Monsters
// =============================================================================

/// 1/chance of an out-of-depth "nasty" sampling boost.
pub const NASTY_MON: i32 = 50;
/// Largest group placed around a FRIENDS seed.
pub const GROUP_MAX: usize = 32;
/// Hard cap on per-instance monster level.
pub const MONSTER_LEVEL_MAX: i32 = 200;
/// Per-attack average damage cap after scaling.
pub const ATTACK_AVG_CAP: i32 = 125;
/// Whole-monster average melee cap after scaling.
pub const AVG_MELEE_CAP: i32 = 400;
/// Chance (percent) a multiplying monster re-rolls its parent's ego.
pub const CLONE_EGO_CHANCE: i32 = 30;
/// Clone dilution added per multiplication step.
pub const CLONE_MULTIPLY_STEP: i32 = 10;
/// A monster this diluted no longer multiplies or yields experience.
pub const CLONE_CAP: i32 = 90;

/// Experience needed for a monster's next level, per racial level curve.
pub const MONSTER_EXP_BASE: u32 = 15;

/// Level-difference experience rules.
pub const EXP_LEVEL_BAND: i32 = 10;
/// Above this player level the band widens.
pub const EXP_KING_LEVEL: i32 = 50;
/// Above this player level no band applies.
pub const EXP_FINAL_LEVEL: i32 = 80;

// =============================================================================
// Housekeeping
// =============================================================================

/// Seconds a floor must be empty and unpinned before release.
pub const LEVEL_STALE_SECS: i64 = 120;
/// Minutes per depth a deep-level logout keeps its floor pinned.
pub const STATIC_MINS_PER_DEPTH: i64 = 2;
/// Seconds a dropped item survives on a dungeon floor.
pub const ITEM_DUNGEON_SECS: i64 = 600;
/// Seconds a dropped item survives on the surface.
pub const ITEM_SURFACE_SECS: i64 = 1800;
/// Lifetime multiplier for artifacts and unique drops.
pub const ITEM_ARTIFACT_MULT: i64 = 3;
/// Seconds a disconnected character lingers before logout.
pub const LOGOUT_GRACE_SECS: i64 = 30;

// =============================================================================
// Visibility
// =============================================================================

/// Maximum sight radius in cells.
pub const MAX_SIGHT: i32 = 20;
/// Weird-minded monsters answer telepathy one time in this many.
pub const WEIRD_MIND_CHANCE: i32 = 10;
