//! Plasma-fractal caves.
//!
//! A midpoint-displacement height map is thresholded into open and closed
//! ground, flood-filled from the centre to isolate the connected region,
//! and written back as floor ringed by outer wall. Undersized results are
//! discarded and re-rolled.

use deephold_core::constants::{FRACTAL_MIN_CELLS, FRACTAL_RETRIES};
use deephold_core::rng::GameRng;
use deephold_core::types::{feat, CellFlags};

use crate::cave::Grid;

/// Midpoint-displacement height map over a (size+1)^2 lattice, sampled
/// down to `w x h`. `grd` sets the starting lattice step (larger means
/// blobbier), `rough` the amplitude decay (larger means noisier).
fn plasma(rng: &mut GameRng, w: i32, h: i32, grd: i32, rough: i32) -> Vec<i32> {
    let size = (w.max(h) as u32).next_power_of_two() as i32;
    let n = size + 1;
    let mut map = vec![0i32; (n * n) as usize];
    let at = |x: i32, y: i32| (y * n + x) as usize;

    for &(x, y) in &[(0, 0), (size, 0), (0, size), (size, size)] {
        map[at(x, y)] = rng.rand_int(256);
    }

    // The lattice arithmetic needs a power-of-two step.
    let grd = (grd.max(2) as u32).next_power_of_two() as i32;
    let mut step = size.min(grd);
    // Coarser-than-grd detail starts mid-range so big grd gives plateaus.
    if step < size {
        for y in (0..n).step_by(step as usize) {
            for x in (0..n).step_by(step as usize) {
                map[at(x, y)] = rng.rand_int(256);
            }
        }
    }

    let mut amp = 128;
    while step > 1 {
        let half = step / 2;

        // Diamond: centres of squares.
        let mut y = half;
        while y < n {
            let mut x = half;
            while x < n {
                let sum = map[at(x - half, y - half)]
                    + map[at(x + half, y - half)]
                    + map[at(x - half, y + half)]
                    + map[at(x + half, y + half)];
                map[at(x, y)] = sum / 4 + rng.rand_int(amp * 2 + 1) - amp;
                x += step;
            }
            y += step;
        }

        // Square: edge midpoints. Corner rows offset by half, centre rows
        // start at zero, so the visited set is exactly the new lattice.
        let mut y = 0;
        while y < n {
            let mut x = if (y / half) % 2 == 0 { half } else { 0 };
            while x < n {
                let mut sum = 0;
                let mut count = 0;
                for (dx, dy) in [(half, 0), (-half, 0), (0, half), (0, -half)] {
                    let (sx, sy) = (x + dx, y + dy);
                    if sx >= 0 && sy >= 0 && sx < n && sy < n {
                        sum += map[at(sx, sy)];
                        count += 1;
                    }
                }
                map[at(x, y)] = sum / count.max(1) + rng.rand_int(amp * 2 + 1) - amp;
                x += step;
            }
            y += half;
        }

        step = half;
        amp = (amp * rough / 16).max(1);
    }

    let mut out = vec![0; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let sx = x * size / w.max(1);
            let sy = y * size / h.max(1);
            out[(y * w + x) as usize] = map[at(sx, sy)].clamp(0, 255);
        }
    }
    out
}

/// One carve attempt. Returns false when the connected open region is too
/// small to be worth keeping.
fn try_fractal(
    grid: &mut Grid,
    rng: &mut GameRng,
    cx: i32,
    cy: i32,
    xsiz: i32,
    ysiz: i32,
    lit: bool,
    as_room: bool,
) -> bool {
    let x1 = (cx - xsiz / 2).max(2);
    let y1 = (cy - ysiz / 2).max(2);
    let x2 = (cx + xsiz / 2).min(grid.width - 3);
    let y2 = (cy + ysiz / 2).min(grid.height - 3);
    let w = x2 - x1 + 1;
    let h = y2 - y1 + 1;
    if w < 5 || h < 5 {
        return false;
    }

    let grd = 1 << (1 + rng.rand_int(3));
    let rough = 8 + rng.rand_int(9);
    let heights = plasma(rng, w, h, grd, rough);

    // Threshold at the mean: roughly half the area opens up.
    let cutoff = heights.iter().sum::<i32>() / heights.len() as i32;
    let open: Vec<bool> = heights.iter().map(|&v| v < cutoff).collect();
    let at = |x: i32, y: i32| (y * w + x) as usize;

    // Flood from the centre (or the nearest open cell to it).
    let mut seed = None;
    'seek: for r in 0..w.max(h) {
        for y in (h / 2 - r).max(0)..=(h / 2 + r).min(h - 1) {
            for x in (w / 2 - r).max(0)..=(w / 2 + r).min(w - 1) {
                if open[at(x, y)] {
                    seed = Some((x, y));
                    break 'seek;
                }
            }
        }
    }
    let Some(seed) = seed else { return false };

    let mut filled = vec![false; (w * h) as usize];
    let mut queue = vec![seed];
    filled[at(seed.0, seed.1)] = true;
    let mut count = 1usize;
    while let Some((x, y)) = queue.pop() {
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || ny < 0 || nx >= w || ny >= h || filled[at(nx, ny)] {
                continue;
            }
            if open[at(nx, ny)] {
                filled[at(nx, ny)] = true;
                count += 1;
                queue.push((nx, ny));
            }
        }
    }

    if count < FRACTAL_MIN_CELLS {
        return false;
    }

    // Materialise: fill becomes floor, the fill boundary becomes outer
    // wall, the rest of the rectangle stays filler rock.
    for y in 0..h {
        for x in 0..w {
            let (gx, gy) = (x1 + x, y1 + y);
            if grid.cell(gx, gy).has(CellFlags::ICKY) {
                continue;
            }
            if filled[at(x, y)] {
                grid.set_feature(gx, gy, feat::FLOOR);
                if as_room {
                    let cell = grid.cell_mut(gx, gy);
                    cell.set(CellFlags::ROOM);
                    if lit {
                        cell.set(CellFlags::GLOW);
                    }
                }
            } else {
                let touches_fill = [(1, 0), (-1, 0), (0, 1), (0, -1)]
                    .iter()
                    .any(|&(dx, dy)| {
                        let (nx, ny) = (x + dx, y + dy);
                        nx >= 0 && ny >= 0 && nx < w && ny < h && filled[at(nx, ny)]
                    });
                if touches_fill && as_room {
                    grid.set_feature(gx, gy, feat::WALL_OUTER);
                    grid.cell_mut(gx, gy).set(CellFlags::ROOM);
                }
            }
        }
    }
    true
}

/// A fractal-cave room; retries a few times before giving up.
pub fn build_fractal_room(
    grid: &mut Grid,
    rng: &mut GameRng,
    cx: i32,
    cy: i32,
    xsiz: i32,
    ysiz: i32,
    lit: bool,
) -> bool {
    for _ in 0..FRACTAL_RETRIES {
        if try_fractal(grid, rng, cx, cy, xsiz, ysiz, lit, true) {
            return true;
        }
    }
    false
}

/// A large open cavern through the middle of the level; no room flags, so
/// corridors tunnel straight through it.
pub fn build_cavern(grid: &mut Grid, rng: &mut GameRng) {
    let w = grid.width * 3 / 4;
    let h = grid.height * 3 / 4;
    for _ in 0..FRACTAL_RETRIES {
        if try_fractal(grid, rng, grid.width / 2, grid.height / 2, w, h, false, false) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plasma_fills_the_requested_rectangle() {
        let mut rng = GameRng::seeded(5);
        let map = plasma(&mut rng, 40, 20, 4, 12);
        assert_eq!(map.len(), 800);
        assert!(map.iter().all(|&v| (0..=255).contains(&v)));
        // Not constant: displacement actually happened.
        let min = map.iter().min().unwrap();
        let max = map.iter().max().unwrap();
        assert!(max - min > 20, "height map is too flat: {}..{}", min, max);
    }

    #[test]
    fn fractal_room_is_internally_connected() {
        let mut rng = GameRng::seeded(9);
        let mut grid = Grid::solid(80, 40);
        for y in 1..39 {
            for x in 1..79 {
                grid.set_feature(x, y, feat::GRANITE);
            }
        }
        assert!(build_fractal_room(&mut grid, &mut rng, 40, 20, 40, 20, false));

        // Every carved floor cell is reachable from the first one.
        let mut seed = None;
        'found: for y in 0..40 {
            for x in 0..80 {
                if grid.cell_floor(x, y) {
                    seed = Some((x, y));
                    break 'found;
                }
            }
        }
        let seed = seed.unwrap();
        let mut reached = vec![false; 80 * 40];
        let idx = |x: i32, y: i32| (y * 80 + x) as usize;
        let mut queue = vec![seed];
        reached[idx(seed.0, seed.1)] = true;
        while let Some((x, y)) = queue.pop() {
            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let (nx, ny) = (x + dx, y + dy);
                if grid.in_bounds(nx, ny) && !reached[idx(nx, ny)] && grid.cell_floor(nx, ny) {
                    reached[idx(nx, ny)] = true;
                    queue.push((nx, ny));
                }
            }
        }
        for y in 0..40 {
            for x in 0..80 {
                if grid.cell_floor(x, y) {
                    assert!(reached[idx(x, y)], "floor cell ({}, {}) disconnected", x, y);
                }
            }
        }
    }
}
