//! The summon taxonomy and everything that spawns mid-game: summon
//! chains, breeder multiplication.
//!
//! Each taxonomy tag is a predicate over the race catalog; one classifier
//! function answers them all. Spawns produced by a chain inherit an
//! incremented summon-depth counter and, past the configured threshold,
//! count as clones: worthless to kill.

use deephold_core::constants::{CLONE_CAP, CLONE_EGO_CHANCE, CLONE_MULTIPLY_STEP};
use deephold_core::types::{MonsterId, MonsterRace, RaceId, RaceKindFlags, WorldPos};

use crate::monsters::{self, sample, PlaceOpts};
use crate::world::World;

/// What a summon spell asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummonType {
    Any,
    Ant,
    Spider,
    Hound,
    Hydra,
    Angel,
    Demon,
    Undead,
    Dragon,
    HiUndead,
    HiDragon,
    HiDemon,
    Unique,
    /// Same display glyph as the summoner.
    Kin(char),
    Phantom,
    Elemental,
}

/// Does `race` satisfy the taxonomy tag?
pub fn summon_okay(race: &MonsterRace, ty: SummonType) -> bool {
    let unique = race.is_unique();
    match ty {
        SummonType::Any => true,
        SummonType::Ant => race.glyph == 'a' && !unique,
        SummonType::Spider => race.glyph == 'S' && !unique,
        SummonType::Hound => matches!(race.glyph, 'C' | 'Z') && !unique,
        SummonType::Hydra => race.glyph == 'M' && !unique,
        SummonType::Angel => race.glyph == 'A' && !unique,
        SummonType::Demon => race.has_kind(RaceKindFlags::DEMON) && !unique,
        SummonType::Undead => race.has_kind(RaceKindFlags::UNDEAD) && !unique,
        SummonType::Dragon => race.has_kind(RaceKindFlags::DRAGON) && !unique,
        SummonType::HiUndead => {
            matches!(race.glyph, 'L' | 'V' | 'W' | 'D') && race.has_kind(RaceKindFlags::UNDEAD) && race.level >= 45
        }
        SummonType::HiDragon => race.glyph == 'D',
        SummonType::HiDemon => {
            race.has_kind(RaceKindFlags::DEMON) && race.glyph == 'U' && race.level >= 49 && !unique
        }
        SummonType::Unique => unique,
        SummonType::Kin(glyph) => race.glyph == glyph && !unique,
        SummonType::Phantom => race.glyph == 'G' && !unique,
        SummonType::Elemental => race.has_kind(RaceKindFlags::ELEMENTAL) && !unique,
    }
}

/// Summon one monster of the given taxonomy near a cell.
///
/// `level_hint` blends with the floor depth; `clone` is the dilution the
/// new monster starts from; `clone_summoning` is the chain depth of the
/// summoner, incremented for the spawn. Escorts are only allowed when the
/// caller says so (wands of summoning say no; monster spells say yes).
pub fn summon_specific(
    world: &mut World,
    wpos: WorldPos,
    x: i32,
    y: i32,
    level_hint: i32,
    s_clone: i32,
    ty: SummonType,
    allow_escorts: bool,
    clone_summoning: i32,
) -> bool {
    // Find a landing cell close by, widening slowly.
    let mut spot = None;
    for i in 0..20 {
        let d = (i / 15) + 1;
        let (sx, sy) = {
            let Some(grid) = world.levels.grid(wpos) else { return false };
            monsters::scatter(grid, &mut world.rng, x, y, d)
        };
        let ok = {
            let Some(grid) = world.levels.grid(wpos) else { return false };
            grid.cell_spawnable(sx, sy)
        };
        if ok {
            spot = Some((sx, sy));
            break;
        }
    }
    let Some((sx, sy)) = spot else { return false };
    let landing = match world.levels.grid(wpos) {
        Some(grid) => grid.feat(sx, sy),
        None => return false,
    };

    let depth = world.depth_at(wpos);
    let level = (depth + level_hint) / 2 + 5;

    let Some(r_idx) = sample::get_mon_num_filtered(world, wpos, level, 0, move |race| {
        summon_okay(race, ty) && monsters::monster_can_cross(landing, race)
    }) else {
        return false;
    };

    // No uniques from chains that forbid retinues.
    if !allow_escorts && world.catalog.race(r_idx).is_unique() {
        return false;
    }

    let chain = clone_summoning + 1;
    let clone = if chain > world.cfg.clone_summoning_threshold {
        100
    } else {
        s_clone
    };

    monsters::place_monster_aux(
        world,
        wpos,
        sx,
        sy,
        r_idx,
        0,
        PlaceOpts { sleep: false, clone, clone_summoning: chain },
        allow_escorts,
    )
    .is_some()
}

/// Summon `count` monsters of one specific race near a cell, stopping
/// early when no landing cell can be found.
pub fn summon_specific_race(
    world: &mut World,
    wpos: WorldPos,
    x: i32,
    y: i32,
    r_idx: RaceId,
    s_clone: i32,
    count: u8,
) -> bool {
    let mut placed = 0;
    for _ in 0..count {
        let mut landed = false;
        for _ in 0..20 {
            let (sx, sy) = {
                let Some(grid) = world.levels.grid(wpos) else { return placed > 0 };
                monsters::scatter(grid, &mut world.rng, x, y, 1)
            };
            if monsters::place_monster_one(
                world,
                wpos,
                sx,
                sy,
                r_idx,
                0,
                PlaceOpts { sleep: false, clone: s_clone, clone_summoning: 0 },
            )
            .is_some()
            {
                landed = true;
                break;
            }
        }
        if !landed {
            break;
        }
        placed += 1;
    }
    placed > 0
}

/// A breeder's turn action: try to copy itself into an adjacent cell.
///
/// The copy inherits the parent's dilution plus a step penalty, so a
/// lineage self-caps: past `CLONE_CAP` the monster no longer breeds at
/// all, and its descendants' experience value has already gone to zero.
pub fn multiply_monster(world: &mut World, m_idx: MonsterId) -> bool {
    let Some(m) = world.monsters.get(m_idx) else { return false };
    let (wpos, x, y, r_idx, ego, clone, chain) =
        (m.wpos, m.x, m.y, m.r_idx, m.ego, m.clone, m.clone_summoning);

    if clone > CLONE_CAP {
        return false;
    }
    let race = world.catalog.race(r_idx);
    if race.is_unique() {
        return false;
    }
    // Towns do not breed vermin.
    if wpos.is_surface() && world.wild.get(wpos.wx, wpos.wy).town {
        return false;
    }

    let depth = world.depth_at(wpos);
    for _ in 0..18 {
        let (nx, ny) = {
            let Some(grid) = world.levels.grid(wpos) else { return false };
            monsters::scatter(grid, &mut world.rng, x, y, 1)
        };
        let empty = {
            let Some(grid) = world.levels.grid(wpos) else { return false };
            grid.cell_spawnable(nx, ny)
        };
        if !empty {
            continue;
        }
        // The child usually re-rolls its ego rather than copying it.
        let child_ego = if ego != 0 && world.rng.magik(CLONE_EGO_CHANCE) {
            ego
        } else {
            sample::pick_ego(world, r_idx, depth)
        };
        return monsters::place_monster_one(
            world,
            wpos,
            nx,
            ny,
            r_idx,
            child_ego,
            PlaceOpts {
                sleep: false,
                clone: clone + CLONE_MULTIPLY_STEP,
                clone_summoning: chain + 1,
            },
        )
        .is_some();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use deephold_core::catalog::race_ids;

    use crate::monsters::tests::arena_world;
    use crate::monsters::PlaceOpts;

    #[test]
    fn classifier_matches_taxonomy() {
        let (world, _) = arena_world();
        let cat = &world.catalog;
        assert!(summon_okay(cat.race(race_ids::GIANT_ANT), SummonType::Ant));
        assert!(summon_okay(cat.race(race_ids::LICH), SummonType::Undead));
        assert!(summon_okay(cat.race(race_ids::LICH), SummonType::HiUndead));
        assert!(!summon_okay(cat.race(race_ids::GRAVE_WIGHT), SummonType::HiUndead));
        assert!(summon_okay(cat.race(race_ids::DRACOLICH), SummonType::HiDragon));
        assert!(summon_okay(cat.race(race_ids::EARTH_ELEMENTAL), SummonType::Elemental));
        assert!(summon_okay(cat.race(race_ids::MAEGLOR), SummonType::Unique));
        assert!(!summon_okay(cat.race(race_ids::MAEGLOR), SummonType::Demon));
        assert!(summon_okay(cat.race(race_ids::WOLF), SummonType::Kin('C')));
        assert!(!summon_okay(cat.race(race_ids::WOLF), SummonType::Kin('Z')));
    }

    #[test]
    fn summon_lands_near_and_increments_chain() {
        let (mut world, wpos) = arena_world();
        assert!(summon_specific(
            &mut world, wpos, 20, 20, 10, 0, SummonType::Any, false, 0
        ));
        let (_, m) = world.monsters.iter_alive().next().unwrap();
        assert_eq!(m.clone_summoning, 1);
        assert!((m.x - 20).abs() <= 2 && (m.y - 20).abs() <= 2);
    }

    #[test]
    fn deep_chains_spawn_worthless_clones() {
        let (mut world, wpos) = arena_world();
        let threshold = world.cfg.clone_summoning_threshold;
        assert!(summon_specific(
            &mut world, wpos, 20, 20, 10, 0, SummonType::Any, false, threshold
        ));
        let (_, m) = world.monsters.iter_alive().next().unwrap();
        assert_eq!(m.clone_summoning, threshold + 1);
        assert_eq!(m.clone, 100);
    }

    #[test]
    fn multiplication_dilutes_and_self_caps() {
        let (mut world, wpos) = arena_world();
        let parent = crate::monsters::place_monster_one(
            &mut world,
            wpos,
            20,
            20,
            race_ids::WHITE_MOUSE,
            0,
            PlaceOpts::default(),
        )
        .unwrap();
        assert!(multiply_monster(&mut world, parent));
        let child = world
            .monsters
            .iter_alive()
            .find(|&(id, _)| id != parent)
            .map(|(id, _)| id)
            .unwrap();
        let child_clone = world.monsters.get(child).unwrap().clone;
        assert_eq!(child_clone, CLONE_MULTIPLY_STEP);

        // Saturated lineages stop breeding.
        world.monsters.get_mut(parent).unwrap().clone = CLONE_CAP + 1;
        assert!(!multiply_monster(&mut world, parent));
    }
}
