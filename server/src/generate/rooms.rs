//! Room constructors.
//!
//! The level is partitioned into 11x11 blocks; each constructor claims a
//! rectangle of blocks, re-entering if occupied, and writes a consistent
//! outer/inner wall distinction: OUTER may be pierced by corridors, INNER
//! may not, SOLID rejects everything. Centroids land in the room table so
//! the corridor stage can chain them.

use deephold_core::constants::*;
use deephold_core::types::{feat, CellFlags};

use crate::cave::Grid;
use crate::generate::{fractal, vaults, Dun, GenParams, ItemSpec, SpawnSpec, Theme};
use crate::world::World;

/// Required size in blocks per room type, indexed 1..=12.
const ROOM_BLOCKS: [(i32, i32); 13] = [
    (0, 0),
    (3, 1), // 1 simple
    (3, 1), // 2 overlapping
    (3, 1), // 3 crossed
    (3, 1), // 4 large with feature
    (3, 1), // 5 monster nest
    (3, 1), // 6 monster pit
    (3, 2), // 7 lesser vault
    (6, 4), // 8 greater vault
    (2, 2), // 9 circular
    (4, 2), // 10 fractal cave
    (4, 2), // 11 random vault
    (2, 2), // 12 crypt
];

/// Depth-biased pick from the room table, then build. One attempt.
pub fn build_rooms(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    destroyed: bool,
    cavern: bool,
) {
    let depth = params.depth;
    let unusual = world.cfg.dun_unusual;

    for _ in 0..DUN_ROOMS {
        let by0 = world.rng.rand_int(dun.row_blocks);
        let bx0 = world.rng.rand_int(dun.col_blocks);

        // Destroyed levels are boring: caves and plain boxes only.
        if destroyed {
            let k = world.rng.randint(100);
            if !cavern && k < depth {
                room_build(world, grid, dun, params, by0, bx0, 10);
            } else if world.rng.magik(30) {
                room_build(world, grid, dun, params, by0, bx0, 9);
            } else {
                room_build(world, grid, dun, params, by0, bx0, 1);
            }
            continue;
        }

        if world.rng.rand_int(unusual) < depth {
            let k = world.rng.rand_int(100);
            if world.rng.rand_int(unusual) < depth {
                if k < 10 && room_build(world, grid, dun, params, by0, bx0, 8) {
                    continue;
                }
                if k < 25 && room_build(world, grid, dun, params, by0, bx0, 7) {
                    continue;
                }
                if k < 40 && room_build(world, grid, dun, params, by0, bx0, 6) {
                    continue;
                }
                if k < 50 && room_build(world, grid, dun, params, by0, bx0, 5) {
                    continue;
                }
                if k < 60 && room_build(world, grid, dun, params, by0, bx0, 11) {
                    continue;
                }
            }
            if k < 25 && room_build(world, grid, dun, params, by0, bx0, 4) {
                continue;
            }
            if k < 45 && room_build(world, grid, dun, params, by0, bx0, 3) {
                continue;
            }
            if k < 65 && room_build(world, grid, dun, params, by0, bx0, 2) {
                continue;
            }
            if k < 80 && room_build(world, grid, dun, params, by0, bx0, 10) {
                continue;
            }
            if k < 90 {
                if world.rng.magik(70) {
                    if room_build(world, grid, dun, params, by0, bx0, 1) {
                        continue;
                    }
                } else if room_build(world, grid, dun, params, by0, bx0, 9) {
                    continue;
                }
            }
            if k < 100 && room_build(world, grid, dun, params, by0, bx0, 12) {
                continue;
            }
        }

        // Trivial rooms.
        if world.rng.magik(50) {
            if room_build(world, grid, dun, params, by0, bx0, 10) {
                continue;
            }
        }
        if world.rng.magik(30) {
            if room_build(world, grid, dun, params, by0, bx0, 9) {
                continue;
            }
        } else {
            room_build(world, grid, dun, params, by0, bx0, 1);
        }
    }
}

fn room_build(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
    typ: usize,
) -> bool {
    match typ {
        1 => build_type1(world, grid, dun, params, by0, bx0),
        2 => build_type2(world, grid, dun, params, by0, bx0),
        3 => build_type3(world, grid, dun, params, by0, bx0),
        4 => build_type4(world, grid, dun, params, by0, bx0),
        5 => build_type5(world, grid, dun, params, by0, bx0),
        6 => build_type6(world, grid, dun, params, by0, bx0),
        7 => build_type7(world, grid, dun, params, by0, bx0),
        8 => build_type8(world, grid, dun, params, by0, bx0),
        9 => build_type9(world, grid, dun, params, by0, bx0),
        10 => build_type10(world, grid, dun, params, by0, bx0),
        11 => build_type11(world, grid, dun, params, by0, bx0),
        12 => build_type12(world, grid, dun, params, by0, bx0),
        _ => false,
    }
}

/// Claim a rectangle of blocks; crowded rooms (nests, pits) are limited
/// to one per level. Returns the room centre in cell coordinates.
pub fn room_alloc(
    grid: &Grid,
    dun: &mut Dun,
    typ: usize,
    crowded: bool,
    by0: i32,
    bx0: i32,
) -> Option<(i32, i32)> {
    if crowded && dun.crowded {
        return None;
    }
    let (bw, bh) = ROOM_BLOCKS[typ];
    if by0 + bh > dun.row_blocks || bx0 + bw > dun.col_blocks {
        return None;
    }
    for by in by0..by0 + bh {
        for bx in bx0..bx0 + bw {
            if dun.block_used[by as usize][bx as usize] {
                return None;
            }
        }
    }
    for by in by0..by0 + bh {
        for bx in bx0..bx0 + bw {
            dun.block_used[by as usize][bx as usize] = true;
        }
    }
    if crowded {
        dun.crowded = true;
    }

    let cx = (bx0 * 2 + bw) * BLOCK_WID / 2;
    let cy = (by0 * 2 + bh) * BLOCK_HGT / 2;
    if !grid.in_bounds_fully(cx, cy) {
        return None;
    }
    dun.cent.push((cx, cy));
    Some((cx, cy))
}

/// Shallow rooms are often lit.
fn room_lit(world: &mut World, depth: i32) -> bool {
    depth <= world.rng.randint(25)
}

/// Floor out a rectangle and ring it with OUTER walls.
pub fn carve_room(grid: &mut Grid, x1: i32, y1: i32, x2: i32, y2: i32, lit: bool) {
    for y in y1 - 1..=y2 + 1 {
        for x in x1 - 1..=x2 + 1 {
            if !grid.in_bounds_fully(x, y) {
                continue;
            }
            let interior = (y1..=y2).contains(&y) && (x1..=x2).contains(&x);
            if interior {
                grid.set_feature(x, y, feat::FLOOR);
            } else if !grid.cell(x, y).has(CellFlags::ROOM) {
                grid.set_feature(x, y, feat::WALL_OUTER);
            }
            let cell = grid.cell_mut(x, y);
            cell.set(CellFlags::ROOM);
            if lit {
                cell.set(CellFlags::GLOW);
            }
        }
    }
}

/// Clamp a room rectangle into the carvable interior.
fn clamp_rect(grid: &Grid, x1: i32, y1: i32, x2: i32, y2: i32) -> (i32, i32, i32, i32) {
    (
        x1.max(2),
        y1.max(2),
        x2.min(grid.width - 3),
        y2.min(grid.height - 3),
    )
}

// Type 1: plain rectangle, occasionally pillared.
fn build_type1(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
) -> bool {
    let Some((cx, cy)) = room_alloc(grid, dun, 1, false, by0, bx0) else {
        return false;
    };
    let lit = room_lit(world, params.depth);

    let y1 = cy - world.rng.randint(4);
    let y2 = cy + world.rng.randint(3);
    let x1 = cx - world.rng.randint(11);
    let x2 = cx + world.rng.randint(11);
    let (x1, y1, x2, y2) = clamp_rect(grid, x1, y1, x2, y2);
    carve_room(grid, x1, y1, x2, y2, lit);

    // Occasional pillar lattice.
    if world.rng.one_in(20) {
        let mut y = y1 + 1;
        while y <= y2 - 1 {
            let mut x = x1 + 1;
            while x <= x2 - 1 {
                grid.set_feature(x, y, feat::WALL_INNER);
                x += 2;
            }
            y += 2;
        }
    }
    true
}

// Type 2: two overlapping rectangles.
fn build_type2(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
) -> bool {
    let Some((cx, cy)) = room_alloc(grid, dun, 2, false, by0, bx0) else {
        return false;
    };
    let lit = room_lit(world, params.depth);

    for _ in 0..2 {
        let y1 = cy - world.rng.randint(4);
        let y2 = cy + world.rng.randint(3);
        let x1 = cx - world.rng.randint(10);
        let x2 = cx + world.rng.randint(10);
        let (x1, y1, x2, y2) = clamp_rect(grid, x1, y1, x2, y2);
        carve_room(grid, x1, y1, x2, y2, lit);
    }
    true
}

// Type 3: crossed rectangles with an optional centre feature.
fn build_type3(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
) -> bool {
    let Some((cx, cy)) = room_alloc(grid, dun, 3, false, by0, bx0) else {
        return false;
    };
    let lit = room_lit(world, params.depth);

    let dy = 1 + world.rng.randint(2);
    let dx = 1 + world.rng.randint(10);
    let (hx1, hy1, hx2, hy2) = clamp_rect(grid, cx - dx, cy - dy, cx + dx, cy + dy);
    let (vx1, vy1, vx2, vy2) = clamp_rect(grid, cx - dy, cy - dx.min(4), cx + dy, cy + dx.min(4));
    carve_room(grid, hx1, hy1, hx2, hy2, lit);
    carve_room(grid, vx1, vy1, vx2, vy2, lit);

    // Centre features: an inner box of treasure, or pillars.
    match world.rng.rand_int(4) {
        0 => {
            // Walled core with one secret way in and something worth it.
            for y in cy - 1..=cy + 1 {
                for x in cx - 1..=cx + 1 {
                    if x == cx && y == cy {
                        continue;
                    }
                    grid.set_feature(x, y, feat::WALL_INNER);
                }
            }
            let (dx, dy) = *world.rng.choose(&[(1, 0), (-1, 0), (0, 1), (0, -1)]);
            grid.set_feature(cx + dx, cy + dy, feat::DOOR_SECRET);
            dun.item_spots.push(ItemSpec { x: cx, y: cy, gold: false });
            dun.spawns.push(SpawnSpec {
                x: cx,
                y: cy,
                boost: 2,
                theme: Theme::Any,
                sleep: true,
                group: false,
            });
        }
        1 => {
            grid.set_feature(cx, cy, feat::WALL_INNER);
        }
        _ => {}
    }
    true
}

// Type 4: large room with an inner structure.
fn build_type4(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
) -> bool {
    let Some((cx, cy)) = room_alloc(grid, dun, 4, false, by0, bx0) else {
        return false;
    };
    let lit = room_lit(world, params.depth);

    let (x1, y1, x2, y2) = clamp_rect(grid, cx - 11, cy - 4, cx + 11, cy + 4);
    carve_room(grid, x1, y1, x2, y2, lit);

    // Inner wall ring, one cell in.
    let (ix1, iy1, ix2, iy2) = (x1 + 2, y1 + 2, x2 - 2, y2 - 2);
    if ix2 <= ix1 + 1 || iy2 <= iy1 + 1 {
        return true;
    }
    for x in ix1 - 1..=ix2 + 1 {
        grid.set_feature(x, iy1 - 1, feat::WALL_INNER);
        grid.set_feature(x, iy2 + 1, feat::WALL_INNER);
    }
    for y in iy1 - 1..=iy2 + 1 {
        grid.set_feature(ix1 - 1, y, feat::WALL_INNER);
        grid.set_feature(ix2 + 1, y, feat::WALL_INNER);
    }

    // A way in.
    let (dx, dy) = *world.rng.choose(&[(1, 0), (-1, 0), (0, 1), (0, -1)]);
    let (door_x, door_y) = if dx != 0 {
        (if dx > 0 { ix2 + 1 } else { ix1 - 1 }, (iy1 + iy2) / 2)
    } else {
        ((ix1 + ix2) / 2, if dy > 0 { iy2 + 1 } else { iy1 - 1 })
    };
    grid.set_feature(door_x, door_y, feat::DOOR_SECRET);

    match world.rng.rand_int(4) {
        0 => {
            // An inner guardian with loot.
            dun.spawns.push(SpawnSpec {
                x: (ix1 + ix2) / 2,
                y: (iy1 + iy2) / 2,
                boost: 5,
                theme: Theme::Any,
                sleep: true,
                group: false,
            });
            dun.item_spots.push(ItemSpec { x: (ix1 + ix2) / 2 + 1, y: (iy1 + iy2) / 2, gold: false });
        }
        1 => {
            // Checkerboard of pillars.
            for y in iy1..=iy2 {
                for x in ix1..=ix2 {
                    if (x + y) % 2 == 0 {
                        grid.set_feature(x, y, feat::WALL_INNER);
                    }
                }
            }
        }
        2 => {
            // Four compartments around a cross wall.
            let mx = (ix1 + ix2) / 2;
            let my = (iy1 + iy2) / 2;
            for x in ix1..=ix2 {
                grid.set_feature(x, my, feat::WALL_INNER);
            }
            for y in iy1..=iy2 {
                grid.set_feature(mx, y, feat::WALL_INNER);
            }
            grid.set_feature(mx, my - 1, feat::DOOR_CLOSED);
            grid.set_feature(mx - 1, my, feat::DOOR_CLOSED);
        }
        _ => {}
    }
    true
}

fn nest_theme(world: &mut World, depth: i32) -> Theme {
    let roll = world.rng.rand_int(depth.max(1) + 10);
    if roll < 5 {
        Theme::Jelly
    } else if roll < 15 {
        Theme::Animal
    } else if roll < 25 {
        Theme::Kennel
    } else if roll < 40 {
        Theme::Orc
    } else if roll < 55 {
        Theme::Troll
    } else if roll < 70 {
        Theme::Giant
    } else if roll < 85 {
        Theme::Undead
    } else if world.rng.one_in(2) {
        Theme::Dragon
    } else {
        Theme::Demon
    }
}

// Type 5: monster nest. A packed, themed den behind an inner ring.
fn build_type5(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
) -> bool {
    let Some((cx, cy)) = room_alloc(grid, dun, 5, true, by0, bx0) else {
        return false;
    };
    let (x1, y1, x2, y2) = clamp_rect(grid, cx - 11, cy - 4, cx + 11, cy + 4);
    carve_room(grid, x1, y1, x2, y2, false);

    let (ix1, iy1, ix2, iy2) = (x1 + 2, y1 + 2, x2 - 2, y2 - 2);
    for x in ix1 - 1..=ix2 + 1 {
        grid.set_feature(x, iy1 - 1, feat::WALL_INNER);
        grid.set_feature(x, iy2 + 1, feat::WALL_INNER);
    }
    for y in iy1 - 1..=iy2 + 1 {
        grid.set_feature(ix1 - 1, y, feat::WALL_INNER);
        grid.set_feature(ix2 + 1, y, feat::WALL_INNER);
    }
    grid.set_feature((ix1 + ix2) / 2, iy1 - 1, feat::DOOR_SECRET);

    let theme = nest_theme(world, params.depth);
    for y in iy1..=iy2 {
        for x in ix1..=ix2 {
            dun.spawns.push(SpawnSpec {
                x,
                y,
                boost: 5,
                theme,
                sleep: true,
                group: false,
            });
        }
    }
    true
}

// Type 6: monster pit. Same shell, but ranked: the deeper in, the worse.
fn build_type6(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
) -> bool {
    let Some((cx, cy)) = room_alloc(grid, dun, 6, true, by0, bx0) else {
        return false;
    };
    let (x1, y1, x2, y2) = clamp_rect(grid, cx - 11, cy - 4, cx + 11, cy + 4);
    carve_room(grid, x1, y1, x2, y2, false);

    let (ix1, iy1, ix2, iy2) = (x1 + 2, y1 + 2, x2 - 2, y2 - 2);
    for x in ix1 - 1..=ix2 + 1 {
        grid.set_feature(x, iy1 - 1, feat::WALL_INNER);
        grid.set_feature(x, iy2 + 1, feat::WALL_INNER);
    }
    for y in iy1 - 1..=iy2 + 1 {
        grid.set_feature(ix1 - 1, y, feat::WALL_INNER);
        grid.set_feature(ix2 + 1, y, feat::WALL_INNER);
    }
    grid.set_feature((ix1 + ix2) / 2, iy1 - 1, feat::DOOR_SECRET);

    let theme = nest_theme(world, params.depth);
    let mid_x = (ix1 + ix2) / 2;
    for y in iy1..=iy2 {
        for x in ix1..=ix2 {
            // Rank by distance from the centre column: boss in the middle.
            let rank = 10 - ((x - mid_x).abs() * 10 / ((ix2 - ix1) / 2 + 1).max(1)).min(10);
            dun.spawns.push(SpawnSpec {
                x,
                y,
                boost: rank,
                theme,
                sleep: true,
                group: false,
            });
        }
    }
    true
}

// Type 7: lesser vault.
fn build_type7(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
) -> bool {
    vaults::build_vault_room(world, grid, dun, params, by0, bx0, false)
}

// Type 8: greater vault.
fn build_type8(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
) -> bool {
    vaults::build_vault_room(world, grid, dun, params, by0, bx0, true)
}

// Type 9: circular room, sometimes moated.
fn build_type9(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
) -> bool {
    let Some((cx, cy)) = room_alloc(grid, dun, 9, false, by0, bx0) else {
        return false;
    };
    let lit = room_lit(world, params.depth);
    let r = 3 + world.rng.rand_int(4);

    for y in cy - r - 1..=cy + r + 1 {
        for x in cx - r - 1..=cx + r + 1 {
            if !grid.in_bounds_fully(x, y) {
                continue;
            }
            let d2 = (x - cx) * (x - cx) + (y - cy) * (y - cy);
            if d2 <= r * r {
                grid.set_feature(x, y, feat::FLOOR);
            } else if d2 <= (r + 1) * (r + 1) + r {
                if !grid.cell(x, y).has(CellFlags::ROOM) {
                    grid.set_feature(x, y, feat::WALL_OUTER);
                }
            } else {
                continue;
            }
            let cell = grid.cell_mut(x, y);
            cell.set(CellFlags::ROOM);
            if lit {
                cell.set(CellFlags::GLOW);
            }
        }
    }

    // Central pillar or prize.
    if r >= 4 && world.rng.one_in(3) {
        grid.set_feature(cx, cy, feat::WALL_INNER);
    } else if world.rng.one_in(4) {
        dun.item_spots.push(ItemSpec { x: cx, y: cy, gold: false });
    }
    true
}

// Type 10: fractal cave room.
fn build_type10(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
) -> bool {
    let Some((cx, cy)) = room_alloc(grid, dun, 10, false, by0, bx0) else {
        return false;
    };
    let lit = room_lit(world, params.depth);
    fractal::build_fractal_room(grid, &mut world.rng, cx, cy, 40, 20, lit)
}

// Type 11: random vault: a walled box filled with bubble partitions,
// scattered treasure and guards.
fn build_type11(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
) -> bool {
    let Some((cx, cy)) = room_alloc(grid, dun, 11, false, by0, bx0) else {
        return false;
    };
    let w = 8 + world.rng.rand_int(12);
    let h = 4 + world.rng.rand_int(5);
    let (x1, y1, x2, y2) = clamp_rect(grid, cx - w, cy - h, cx + w, cy + h);
    carve_room(grid, x1, y1, x2, y2, false);

    // Bubble walls: grow short partitions from random seeds.
    let area = ((x2 - x1) * (y2 - y1)) / 12;
    for _ in 0..area {
        let x = world.rng.rand_range(x1 + 1, x2 - 1);
        let y = world.rng.rand_range(y1 + 1, y2 - 1);
        grid.set_feature(x, y, feat::WALL_INNER);
        let (dx, dy) = *world.rng.choose(&[(1, 0), (0, 1)]);
        let len = world.rng.randint(3);
        for i in 1..=len {
            let (wx, wy) = (x + dx * i, y + dy * i);
            if wx < x2 && wy < y2 {
                grid.set_feature(wx, wy, feat::WALL_INNER);
            }
        }
    }

    for y in y1..=y2 {
        for x in x1..=x2 {
            grid.cell_mut(x, y).set(CellFlags::ICKY);
        }
    }

    // Sprinkle reward and danger.
    let spots = 3 + world.rng.randint(4);
    for _ in 0..spots {
        let x = world.rng.rand_range(x1, x2);
        let y = world.rng.rand_range(y1, y2);
        if world.rng.one_in(2) {
            dun.item_spots.push(ItemSpec { x, y, gold: world.rng.one_in(3) });
        } else {
            dun.spawns.push(SpawnSpec {
                x,
                y,
                boost: 5,
                theme: Theme::Any,
                sleep: true,
                group: false,
            });
        }
    }
    true
}

// Type 12: crypt: pillar lattice, restless occupants.
fn build_type12(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
) -> bool {
    let Some((cx, cy)) = room_alloc(grid, dun, 12, false, by0, bx0) else {
        return false;
    };
    let (x1, y1, x2, y2) = clamp_rect(grid, cx - 9, cy - 4, cx + 9, cy + 4);
    carve_room(grid, x1, y1, x2, y2, false);

    for y in y1..=y2 {
        for x in x1..=x2 {
            if (x - x1) % 2 == 1 && (y - y1) % 2 == 1 {
                grid.set_feature(x, y, feat::WALL_INNER);
            }
        }
    }

    if params.depth >= 5 {
        let occupants = 2 + world.rng.randint(4);
        for _ in 0..occupants {
            let x = world.rng.rand_range(x1, x2);
            let y = world.rng.rand_range(y1, y2);
            dun.spawns.push(SpawnSpec {
                x,
                y,
                boost: 3,
                theme: Theme::Undead,
                sleep: true,
                group: false,
            });
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use deephold_core::catalog::Catalog;
    use deephold_core::types::WorldPos;

    use crate::config::Config;
    use crate::world::World;

    fn setup() -> (World, Grid, Dun, GenParams) {
        let world = World::new(Config::default(), Catalog::builtin(), 77);
        let mut grid = Grid::solid(MAX_WID, MAX_HGT);
        for y in 1..MAX_HGT - 1 {
            for x in 1..MAX_WID - 1 {
                grid.set_feature(x, y, feat::GRANITE);
            }
        }
        let dun = Dun::new(MAX_WID, MAX_HGT);
        let params = GenParams {
            wpos: WorldPos::new(1, 1, -10),
            depth: 10,
            dungeon_type: 0,
        };
        (world, grid, dun, params)
    }

    #[test]
    fn simple_room_writes_floor_ring_and_flags() {
        let (mut world, mut grid, mut dun, params) = setup();
        assert!(build_type1(&mut world, &mut grid, &mut dun, &params, 1, 3));
        let (cx, cy) = dun.cent[0];
        assert!(grid.cell_floor(cx, cy));
        assert!(grid.cell(cx, cy).has(CellFlags::ROOM));

        // Walking out from the centre hits an OUTER (or SOLID) wall.
        let mut x = cx;
        while grid.cell_floor(x, cy) || grid.feat(x, cy) == feat::WALL_INNER {
            x += 1;
        }
        assert!(matches!(grid.feat(x, cy), feat::WALL_OUTER | feat::WALL_SOLID));
    }

    #[test]
    fn blocks_are_never_claimed_twice() {
        let (mut world, mut grid, mut dun, params) = setup();
        assert!(build_type1(&mut world, &mut grid, &mut dun, &params, 1, 3));
        assert!(!build_type1(&mut world, &mut grid, &mut dun, &params, 1, 3));
        assert_eq!(dun.cent.len(), 1);
    }

    #[test]
    fn only_one_crowded_room_per_level() {
        let (mut world, mut grid, mut dun, params) = setup();
        assert!(build_type5(&mut world, &mut grid, &mut dun, &params, 0, 0));
        assert!(dun.crowded);
        assert!(!build_type6(&mut world, &mut grid, &mut dun, &params, 3, 8));
    }

    #[test]
    fn nests_queue_themed_spawns() {
        let (mut world, mut grid, mut dun, params) = setup();
        assert!(build_type5(&mut world, &mut grid, &mut dun, &params, 2, 5));
        assert!(!dun.spawns.is_empty());
        let theme = dun.spawns[0].theme;
        assert!(dun.spawns.iter().all(|s| s.theme == theme), "one theme per nest");
        assert!(dun.spawns.iter().all(|s| s.sleep));
    }

    #[test]
    fn crypts_carve_pillar_lattice() {
        let (mut world, mut grid, mut dun, params) = setup();
        assert!(build_type12(&mut world, &mut grid, &mut dun, &params, 2, 6));
        let pillars = (1..MAX_HGT - 1)
            .flat_map(|y| (1..MAX_WID - 1).map(move |x| (x, y)))
            .filter(|&(x, y)| grid.feat(x, y) == feat::WALL_INNER)
            .count();
        assert!(pillars >= 4, "expected a lattice, got {} pillars", pillars);
    }

    #[test]
    fn full_room_pass_places_several_rooms() {
        let (mut world, mut grid, mut dun, params) = setup();
        build_rooms(&mut world, &mut grid, &mut dun, &params, false, false);
        assert!(dun.cent.len() >= 3, "only {} rooms", dun.cent.len());
    }
}
