//! Hand-authored vault construction.
//!
//! Each non-space glyph of the blueprint picture is an instruction:
//! outer/inner/permanent walls, floor, treasure and trap rolls, secret
//! doors, out-of-depth monsters, and digit pairs that become linked
//! between-gates. Pictures may be mirrored and rotated unless flagged;
//! `HIVES` vaults try to stamp another copy next door.

use deephold_core::types::vault::{Vault, VaultKind};
use deephold_core::types::{feat, CellFlags};

use crate::cave::{Grid, Overlay, TrapKind};
use crate::generate::{rooms, Dun, GenParams, ItemSpec, SpawnSpec, Theme};
use crate::world::World;

/// Orientation of one placement.
#[derive(Clone, Copy, Debug)]
struct Transform {
    mirror_x: bool,
    mirror_y: bool,
    rotate: bool,
}

impl Transform {
    fn roll(world: &mut World, vault: &Vault) -> Transform {
        Transform {
            mirror_x: vault.may_mirror() && world.rng.one_in(2),
            mirror_y: vault.may_mirror() && world.rng.one_in(2),
            rotate: vault.may_rotate() && world.rng.one_in(2),
        }
    }

    /// Placed width/height after rotation.
    fn dims(&self, vault: &Vault) -> (i32, i32) {
        if self.rotate {
            (vault.height(), vault.width())
        } else {
            (vault.width(), vault.height())
        }
    }

    /// Map placed-space offsets back into picture coordinates.
    fn source(&self, vault: &Vault, ox: i32, oy: i32) -> (i32, i32) {
        let (mut px, mut py) = if self.rotate { (oy, ox) } else { (ox, oy) };
        if self.mirror_x {
            px = vault.width() - 1 - px;
        }
        if self.mirror_y {
            py = vault.height() - 1 - py;
        }
        (px, py)
    }
}

/// Pick a blueprint of the wanted class, weighted by rarity.
fn pick_vault(world: &mut World, greater: bool) -> Option<Vault> {
    let want = if greater { VaultKind::Greater } else { VaultKind::Lesser };
    let candidates: Vec<Vault> = world
        .catalog
        .vaults
        .iter()
        .filter(|v| v.kind == want)
        .cloned()
        .collect();
    if candidates.is_empty() {
        return None;
    }
    for v in &candidates {
        if world.rng.one_in(v.rarity.max(1) as i32) {
            return Some(v.clone());
        }
    }
    Some(world.rng.choose(&candidates).clone())
}

/// Room-table entry points: lesser (type 7) and greater (type 8) vaults.
pub fn build_vault_room(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    by0: i32,
    bx0: i32,
    greater: bool,
) -> bool {
    let Some(vault) = pick_vault(world, greater) else {
        return false;
    };
    let typ = if greater { 8 } else { 7 };
    let Some((cx, cy)) = rooms::room_alloc(grid, dun, typ, false, by0, bx0) else {
        return false;
    };
    let transform = Transform::roll(world, &vault);
    if !stamp_vault(world, grid, dun, params, &vault, transform, cx, cy) {
        return false;
    }

    // Hive vaults breed: keep stamping copies next door while they fit.
    if vault.is_hive() {
        let (w, h) = transform.dims(&vault);
        let offsets = [(w + 1, 0), (-(w + 1), 0), (0, h + 1), (0, -(h + 1))];
        for &(dx, dy) in offsets.iter() {
            if !world.rng.one_in(2) {
                continue;
            }
            let (nx, ny) = (cx + dx, cy + dy);
            if stamp_vault(world, grid, dun, params, &vault, transform, nx, ny) {
                dun.cent.push((nx, ny));
            }
        }
    }
    true
}

/// Write one vault picture centred on `(cx, cy)`. Fails without touching
/// the grid when the footprint does not fit.
fn stamp_vault(
    world: &mut World,
    grid: &mut Grid,
    dun: &mut Dun,
    params: &GenParams,
    vault: &Vault,
    transform: Transform,
    cx: i32,
    cy: i32,
) -> bool {
    let (w, h) = transform.dims(vault);
    let x1 = cx - w / 2;
    let y1 = cy - h / 2;
    if x1 < 2 || y1 < 2 || x1 + w > grid.width - 2 || y1 + h > grid.height - 2 {
        return false;
    }

    // Digit glyphs pair up as between-gates: first sighting records, the
    // twin links both ways.
    let mut pending_gates: [Option<(i32, i32)>; 10] = [None; 10];

    for oy in 0..h {
        for ox in 0..w {
            let (px, py) = transform.source(vault, ox, oy);
            let glyph = vault.glyph_at(py, px);
            if glyph == ' ' {
                continue;
            }
            let (x, y) = (x1 + ox, y1 + oy);

            let interior = !matches!(glyph, '%');
            {
                let cell = grid.cell_mut(x, y);
                cell.set(CellFlags::ROOM);
                if interior {
                    cell.set(CellFlags::ICKY);
                }
            }

            match glyph {
                '%' => grid.set_feature(x, y, feat::WALL_OUTER),
                '#' => grid.set_feature(x, y, feat::WALL_INNER),
                'X' => grid.set_feature(x, y, feat::PERM_INNER),
                '.' => grid.set_feature(x, y, feat::FLOOR),
                '*' => {
                    grid.set_feature(x, y, feat::FLOOR);
                    if world.rng.magik(60) {
                        dun.item_spots.push(ItemSpec { x, y, gold: world.rng.one_in(3) });
                    } else if world.rng.magik(50) {
                        let kind = *world.rng.choose(&[
                            TrapKind::Pit,
                            TrapKind::Dart,
                            TrapKind::PoisonGas,
                            TrapKind::Summon,
                        ]);
                        grid.add_overlay(x, y, Overlay::Trap { kind, found: false });
                    }
                }
                '+' => {
                    grid.set_feature(x, y, feat::DOOR_SECRET);
                    if params.depth > deephold_core::constants::DOOR_TRAP_DEPTH
                        && world.rng.magik(params.depth.min(40))
                    {
                        grid.add_overlay(
                            x,
                            y,
                            Overlay::Trap { kind: TrapKind::Alarm, found: false },
                        );
                    }
                }
                '^' => {
                    grid.set_feature(x, y, feat::FLOOR);
                    let kind = *world.rng.choose(&[
                        TrapKind::Pit,
                        TrapKind::Dart,
                        TrapKind::PoisonGas,
                        TrapKind::TeleportAway,
                    ]);
                    grid.add_overlay(x, y, Overlay::Trap { kind, found: false });
                }
                '&' => {
                    grid.set_feature(x, y, feat::FLOOR);
                    dun.spawns.push(SpawnSpec {
                        x,
                        y,
                        boost: 5,
                        theme: Theme::Any,
                        sleep: true,
                        group: false,
                    });
                }
                '@' => {
                    grid.set_feature(x, y, feat::FLOOR);
                    dun.spawns.push(SpawnSpec {
                        x,
                        y,
                        boost: 11,
                        theme: Theme::Any,
                        sleep: true,
                        group: false,
                    });
                    dun.item_spots.push(ItemSpec { x, y, gold: false });
                }
                '9' => {
                    grid.set_feature(x, y, feat::FLOOR);
                    dun.spawns.push(SpawnSpec {
                        x,
                        y,
                        boost: 40,
                        theme: Theme::Any,
                        sleep: true,
                        group: false,
                    });
                    dun.item_spots.push(ItemSpec { x, y, gold: false });
                }
                d @ '1'..='8' => {
                    let slot = d.to_digit(10).unwrap() as usize;
                    grid.set_feature(x, y, feat::BETWEEN_GATE);
                    match pending_gates[slot].take() {
                        Some((ax, ay)) => {
                            grid.add_overlay(ax, ay, Overlay::Between { to_x: x, to_y: y });
                            grid.add_overlay(x, y, Overlay::Between { to_x: ax, to_y: ay });
                        }
                        None => pending_gates[slot] = Some((x, y)),
                    }
                }
                _ => {
                    grid.set_feature(x, y, feat::FLOOR);
                }
            }
        }
    }

    // A digit without its twin is a dud gate; make it plain floor.
    for lone in pending_gates.into_iter().flatten() {
        grid.set_feature(lone.0, lone.1, feat::FLOOR);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use deephold_core::catalog::Catalog;
    use deephold_core::constants::{MAX_HGT, MAX_WID};
    use deephold_core::types::WorldPos;

    use crate::cave::OverlayKind;
    use crate::config::Config;

    fn setup() -> (World, Grid, Dun, GenParams) {
        let world = World::new(Config::default(), Catalog::builtin(), 13);
        let mut grid = Grid::solid(MAX_WID, MAX_HGT);
        for y in 1..MAX_HGT - 1 {
            for x in 1..MAX_WID - 1 {
                grid.set_feature(x, y, feat::GRANITE);
            }
        }
        let dun = Dun::new(MAX_WID, MAX_HGT);
        let params = GenParams {
            wpos: WorldPos::new(1, 1, -20),
            depth: 20,
            dungeon_type: 0,
        };
        (world, grid, dun, params)
    }

    fn gate_vault() -> Vault {
        Vault::new(
            "test gates",
            VaultKind::Lesser,
            &["%%%%%", "%1.1%", "%.&.%", "%%%%%"],
        )
    }

    #[test]
    fn stamp_marks_interior_icky_but_not_the_shell() {
        let (mut world, mut grid, mut dun, params) = setup();
        let vault = Vault::new("box", VaultKind::Lesser, &["%%%", "%.%", "%%%"]);
        let t = Transform { mirror_x: false, mirror_y: false, rotate: false };
        assert!(stamp_vault(&mut world, &mut grid, &mut dun, &params, &vault, t, 50, 20));
        assert!(grid.cell(50, 20).has(CellFlags::ICKY));
        assert!(grid.cell(50, 20).has(CellFlags::ROOM));
        assert!(!grid.cell(49, 19).has(CellFlags::ICKY), "shell stays pierceable");
        assert_eq!(grid.feat(49, 19), feat::WALL_OUTER);
    }

    #[test]
    fn digit_twins_become_linked_gates() {
        let (mut world, mut grid, mut dun, params) = setup();
        let t = Transform { mirror_x: false, mirror_y: false, rotate: false };
        assert!(stamp_vault(&mut world, &mut grid, &mut dun, &params, &gate_vault(), t, 50, 20));

        let mut gates = Vec::new();
        for y in 0..MAX_HGT {
            for x in 0..MAX_WID {
                if grid.feat(x, y) == feat::BETWEEN_GATE {
                    gates.push((x, y));
                }
            }
        }
        assert_eq!(gates.len(), 2);
        let (a, b) = (gates[0], gates[1]);
        match grid.get_overlay(a.0, a.1, OverlayKind::Between) {
            Some(Overlay::Between { to_x, to_y }) => assert_eq!((*to_x, *to_y), b),
            other => panic!("no link on first gate: {:?}", other),
        }
        match grid.get_overlay(b.0, b.1, OverlayKind::Between) {
            Some(Overlay::Between { to_x, to_y }) => assert_eq!((*to_x, *to_y), a),
            other => panic!("no link on second gate: {:?}", other),
        }
    }

    #[test]
    fn rotation_swaps_the_footprint() {
        let (mut world, mut grid, mut dun, params) = setup();
        let vault = Vault::new(
            "wide",
            VaultKind::Lesser,
            &["%%%%%%%", "%.....%", "%%%%%%%"],
        );
        let t = Transform { mirror_x: false, mirror_y: false, rotate: true };
        assert!(stamp_vault(&mut world, &mut grid, &mut dun, &params, &vault, t, 60, 30));
        // Rotated: the 7-wide picture now spans 7 rows.
        let mut floors = Vec::new();
        for y in 0..MAX_HGT {
            for x in 0..MAX_WID {
                if grid.cell_floor(x, y) {
                    floors.push((x, y));
                }
            }
        }
        assert_eq!(floors.len(), 5);
        let xs: Vec<i32> = floors.iter().map(|&(x, _)| x).collect();
        assert!(xs.iter().all(|&x| x == xs[0]), "rotated floor runs vertically");
    }

    #[test]
    fn vault_room_lands_via_room_table() {
        let (mut world, mut grid, mut dun, params) = setup();
        let mut placed = false;
        for by in 0..dun.row_blocks {
            for bx in 0..dun.col_blocks {
                if build_vault_room(&mut world, &mut grid, &mut dun, &params, by, bx, false) {
                    placed = true;
                    break;
                }
            }
            if placed {
                break;
            }
        }
        assert!(placed, "no lesser vault fit anywhere");
        assert!(!dun.cent.is_empty());
    }
}
