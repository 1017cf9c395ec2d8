//! Maze levels: recursive spanning-tree carving over half-scale vertices.

use deephold_core::rng::GameRng;
use deephold_core::types::{feat, feature, CellFlags};

use crate::cave::Grid;

/// Carve a perfect maze across the whole level. Vertices live on odd
/// coordinates; each carve opens the vertex and the wall between it and
/// its parent. Room interiors and vaults are left alone, so the maze
/// weaves around whatever was already built. At each node there is a 33%
/// chance to re-randomise the direction priority, which keeps long
/// straight runs rare.
pub fn generate_maze(grid: &mut Grid, rng: &mut GameRng, permawall: bool) {
    let vw = (grid.width - 1) / 2;
    let vh = (grid.height - 1) / 2;
    if vw < 2 || vh < 2 {
        return;
    }

    let vertex = |vx: i32, vy: i32| (vx * 2 + 1, vy * 2 + 1);
    let carvable = |grid: &Grid, x: i32, y: i32| {
        grid.in_bounds_fully(x, y)
            && !grid.cell(x, y).has(CellFlags::ICKY)
            && !feature::is_permanent(grid.feat(x, y))
            || (permawall && grid.in_bounds_fully(x, y)
                && !grid.cell(x, y).has(CellFlags::ICKY)
                && grid.feat(x, y) == feat::PERM_INNER)
    };

    let mut visited = vec![false; (vw * vh) as usize];
    let vat = |vx: i32, vy: i32| (vy * vw + vx) as usize;

    // Start from a random vertex that is actually carvable.
    let mut start = None;
    for _ in 0..100 {
        let vx = rng.rand_int(vw);
        let vy = rng.rand_int(vh);
        let (x, y) = vertex(vx, vy);
        if carvable(grid, x, y) {
            start = Some((vx, vy));
            break;
        }
    }
    let Some(start) = start else { return };

    let mut dirs = [(1, 0), (-1, 0), (0, 1), (0, -1)];
    let mut stack = vec![start];
    visited[vat(start.0, start.1)] = true;
    {
        let (x, y) = vertex(start.0, start.1);
        grid.set_feature(x, y, feat::FLOOR);
    }

    while let Some(&(vx, vy)) = stack.last() {
        if rng.magik(33) {
            rng.shuffle(&mut dirs);
        }

        let mut advanced = false;
        for &(dx, dy) in dirs.iter() {
            let (nvx, nvy) = (vx + dx, vy + dy);
            if nvx < 0 || nvy < 0 || nvx >= vw || nvy >= vh || visited[vat(nvx, nvy)] {
                continue;
            }
            let (nx, ny) = vertex(nvx, nvy);
            let (wx, wy) = (vx * 2 + 1 + dx, vy * 2 + 1 + dy);
            if !carvable(grid, nx, ny) || !carvable(grid, wx, wy) {
                continue;
            }
            grid.set_feature(wx, wy, feat::FLOOR);
            grid.set_feature(nx, ny, feat::FLOOR);
            visited[vat(nvx, nvy)] = true;
            stack.push((nvx, nvy));
            advanced = true;
            break;
        }

        if !advanced {
            stack.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maze_grid(permawall: bool) -> Grid {
        let mut grid = Grid::solid(33, 23);
        let fill = if permawall { feat::PERM_INNER } else { feat::GRANITE };
        for y in 1..22 {
            for x in 1..32 {
                grid.set_feature(x, y, fill);
            }
        }
        grid
    }

    #[test]
    fn maze_connects_all_carved_cells() {
        for seed in 0..4 {
            let mut rng = GameRng::seeded(seed);
            let mut grid = maze_grid(false);
            generate_maze(&mut grid, &mut rng, false);

            let mut seed_cell = None;
            'find: for y in 0..23 {
                for x in 0..33 {
                    if grid.cell_floor(x, y) {
                        seed_cell = Some((x, y));
                        break 'find;
                    }
                }
            }
            let start = seed_cell.expect("maze carved something");
            let mut reached = vec![false; 33 * 23];
            let idx = |x: i32, y: i32| (y * 33 + x) as usize;
            let mut queue = vec![start];
            reached[idx(start.0, start.1)] = true;
            let mut count = 1;
            while let Some((x, y)) = queue.pop() {
                for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                    let (nx, ny) = (x + dx, y + dy);
                    if grid.in_bounds(nx, ny) && !reached[idx(nx, ny)] && grid.cell_floor(nx, ny) {
                        reached[idx(nx, ny)] = true;
                        count += 1;
                        queue.push((nx, ny));
                    }
                }
            }
            let floor_total = grid.count_floor();
            assert_eq!(count, floor_total, "maze split into pieces (seed {})", seed);
            // A proper maze visits nearly every vertex.
            assert!(floor_total > 16 * 11, "maze too small: {}", floor_total);
        }
    }

    #[test]
    fn boundary_survives_the_maze() {
        let mut rng = GameRng::seeded(3);
        let mut grid = maze_grid(false);
        generate_maze(&mut grid, &mut rng, false);
        for x in 0..33 {
            assert_eq!(grid.feat(x, 0), feat::PERM_SOLID);
            assert_eq!(grid.feat(x, 22), feat::PERM_SOLID);
        }
    }

    #[test]
    fn permawall_mazes_carve_permanent_rock() {
        let mut rng = GameRng::seeded(4);
        let mut grid = maze_grid(true);
        generate_maze(&mut grid, &mut rng, true);
        assert!(grid.count_floor() > 0);
    }
}
