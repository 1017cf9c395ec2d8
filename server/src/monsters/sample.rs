//! Restricted race sampling.
//!
//! Every spawn funnels through one weighted sampler over the race catalog.
//! Eligibility combines the requested level, depth floors, the dungeon's
//! rule table, unique availability and an optional caller predicate (the
//! summon taxonomy, the escort filter). A rare "nasty" roll boosts the
//! requested level before sampling, and a power-bias pass re-samples once
//! or twice keeping the hardest result, which skews the distribution
//! gently to the right.

use deephold_core::types::{EgoId, MonsterRace, RaceFlags, RaceId, WorldPos};

use crate::world::World;

/// Depth floor applied during eligibility: near the bottom of the world
/// only genuinely deep races appear; elsewhere two-thirds of the request.
fn min_level_for(level: i32) -> i32 {
    if level >= 98 {
        69
    } else {
        (level * 2) / 3
    }
}

/// One eligibility pass plus weighted pick. Returns 0 weight total as None.
fn sample_once<F>(world: &mut World, wpos: WorldPos, level: i32, dun_type: u16, extra: &F) -> Option<RaceId>
where
    F: Fn(&MonsterRace) -> bool,
{
    let floor = min_level_for(level);
    let mut entries: Vec<(RaceId, i32)> = Vec::new();

    for (i, race) in world.catalog.races.iter().enumerate().skip(1) {
        let r_idx = i as RaceId;

        // Sorted-by-depth cutoff: never above the requested level.
        if race.level > level {
            continue;
        }
        // Town population only ever spawns at depth zero, and is all that
        // spawns there.
        if level > 0 && race.level <= 0 {
            continue;
        }
        if level <= 0 && !race.has_flag(RaceFlags::TOWNSFOLK) {
            continue;
        }
        if race.has_flag(RaceFlags::ONLY_DEPTH) && race.level != level {
            continue;
        }
        if race.level < floor && !race.has_flag(RaceFlags::TOWNSFOLK) {
            continue;
        }
        if !extra(race) {
            continue;
        }

        entries.push((r_idx, (100 / race.rarity.max(1) as i32).max(1)));
    }

    // The dungeon rule table and unique availability are stochastic or
    // world-dependent, so they are applied per pick, not per entry.
    let total: i32 = entries.iter().map(|&(_, w)| w).sum();
    if total <= 0 {
        return None;
    }

    for _ in 0..50 {
        let mut value = world.rng.rand_int(total);
        let mut picked = None;
        for &(r_idx, w) in &entries {
            if value < w {
                picked = Some(r_idx);
                break;
            }
            value -= w;
        }
        let r_idx = picked?;

        if dun_type != 0 && !dungeon_allows(world, r_idx, dun_type) {
            continue;
        }
        let race = world.catalog.race(r_idx);
        if race.is_unique() && !crate::monsters::allow_unique_level(world, r_idx, wpos) {
            continue;
        }
        return Some(r_idx);
    }
    None
}

/// Apply one randomly drawn rule from the dungeon's percentage table.
fn dungeon_allows(world: &mut World, r_idx: RaceId, dun_type: u16) -> bool {
    let roll = world.rng.rand_int(100) as u8;
    let dungeon = world.catalog.dungeon(dun_type);
    let race = world.catalog.race(r_idx);

    if dungeon.denies_glyph(race.glyph) {
        return false;
    }
    if dungeon.force_allows_glyph(race.glyph) {
        return true;
    }
    dungeon.rule_for_roll(roll).allows(race)
}

/// Choose a race appropriate to `level` for the given dungeon type.
pub fn get_mon_num(world: &mut World, level: i32, dun_type: u16) -> Option<RaceId> {
    get_mon_num_at(world, WorldPos::default(), level, dun_type)
}

/// As `get_mon_num`, with the destination floor for unique bookkeeping.
pub fn get_mon_num_at(
    world: &mut World,
    wpos: WorldPos,
    level: i32,
    dun_type: u16,
) -> Option<RaceId> {
    get_mon_num_filtered(world, wpos, level, dun_type, |_| true)
}

/// The full sampler with a caller predicate.
pub fn get_mon_num_filtered<F>(
    world: &mut World,
    wpos: WorldPos,
    level: i32,
    dun_type: u16,
    extra: F,
) -> Option<RaceId>
where
    F: Fn(&MonsterRace) -> bool,
{
    let mut level = level;

    // Occasional out-of-depth "nasty" boost.
    if level > 0 && world.rng.one_in(world.cfg.nasty_chance) {
        if level < 15 {
            level += 2 + level / 2 + world.rng.randint(3);
        } else {
            level += 10 + level / 4 + world.rng.randint(level / 4);
        }
    }

    let first = sample_once(world, wpos, level, dun_type, &extra)?;

    // Power bias: re-sample once (50%) or twice more (10%), keeping the
    // deepest result each time.
    let p = world.rng.rand_int(100);
    let mut best = first;
    if p < 60 {
        if let Some(second) = sample_once(world, wpos, level, dun_type, &extra) {
            if world.catalog.race(second).level.abs() > world.catalog.race(best).level.abs() {
                best = second;
            }
        }
    }
    if p < 10 {
        if let Some(third) = sample_once(world, wpos, level, dun_type, &extra) {
            if world.catalog.race(third).level.abs() > world.catalog.race(best).level.abs() {
                best = third;
            }
        }
    }
    Some(best)
}

/// Escort filter: same glyph as the leader, not above its level, never a
/// unique, and never a breeder (a breeding escort would outlive its king).
pub fn get_mon_num_escort(world: &mut World, level: i32, leader: &MonsterRace) -> Option<RaceId> {
    let glyph = leader.glyph;
    let cap = leader.level;
    get_mon_num_filtered(world, WorldPos::default(), level.min(cap), 0, move |race| {
        race.glyph == glyph
            && race.level <= cap
            && !race.is_unique()
            && !race.has_flag(RaceFlags::MULTIPLY)
    })
}

/// Roll an ego template for a race at the given depth; 0 for none.
pub fn pick_ego(world: &mut World, r_idx: RaceId, depth: i32) -> EgoId {
    let race = world.catalog.race(r_idx);
    if race.is_unique() {
        return 0;
    }
    let mut candidates: Vec<(EgoId, u8)> = Vec::new();
    for (i, ego) in world.catalog.egos.iter().enumerate().skip(1) {
        if ego.rarity == 0 || ego.min_level > depth || !ego.accepts(race) {
            continue;
        }
        candidates.push((i as EgoId, ego.rarity));
    }
    for (id, rarity) in candidates {
        if world.rng.one_in(rarity as i32 * 10) {
            return id;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use deephold_core::catalog::race_ids;

    use crate::monsters::tests::arena_world;

    #[test]
    fn sampler_respects_requested_level() {
        let (mut world, wpos) = arena_world();
        for _ in 0..100 {
            let r = get_mon_num_at(&mut world, wpos, 5, 0).unwrap();
            let race = world.catalog.race(r);
            // The nasty roll can push past 5, but never to the midgame.
            assert!(race.level <= 15, "{} at level {}", race.name, race.level);
            assert!(race.level > 0, "no townsfolk underground");
        }
    }

    #[test]
    fn town_sampling_yields_only_townsfolk() {
        let (mut world, _) = arena_world();
        for _ in 0..50 {
            let r = get_mon_num_at(&mut world, WorldPos::default(), 0, 0).unwrap();
            assert!(world.catalog.race(r).has_flag(RaceFlags::TOWNSFOLK));
        }
    }

    #[test]
    fn depth_floor_excludes_trivial_races_deep_down() {
        let (mut world, wpos) = arena_world();
        for _ in 0..100 {
            if let Some(r) = get_mon_num_at(&mut world, wpos, 60, 0) {
                assert!(
                    world.catalog.race(r).level >= 40,
                    "{} too shallow for depth 60",
                    world.catalog.race(r).name
                );
            }
        }
    }

    #[test]
    fn barrow_downs_spawns_lean_undead() {
        let (mut world, wpos) = arena_world();
        let mut undead = 0;
        let mut total = 0;
        for _ in 0..200 {
            if let Some(r) = get_mon_num_at(&mut world, wpos, 18, 1) {
                total += 1;
                let race = world.catalog.race(r);
                if race.has_kind(deephold_core::types::RaceKindFlags::UNDEAD)
                    || matches!(race.glyph, 's' | 'W' | 'G')
                {
                    undead += 1;
                }
            }
        }
        assert!(total > 0);
        assert!(
            undead * 2 > total,
            "expected an undead-leaning mix, got {}/{}",
            undead,
            total
        );
    }

    #[test]
    fn escort_filter_pins_glyph_and_level() {
        let (mut world, _) = arena_world();
        let leader = world.catalog.race(race_ids::ORC_CHIEFTAIN).clone();
        for _ in 0..50 {
            if let Some(r) = get_mon_num_escort(&mut world, 13, &leader) {
                let race = world.catalog.race(r);
                assert_eq!(race.glyph, 'o');
                assert!(race.level <= leader.level);
                assert!(!race.is_unique());
            }
        }
    }

    #[test]
    fn extant_unique_is_rejected_by_sampler() {
        let (mut world, wpos) = arena_world();
        world.race_live[race_ids::GRISHNAKH as usize].cur_num = 1;
        for _ in 0..200 {
            if let Some(r) = get_mon_num_at(&mut world, wpos, 15, 0) {
                assert_ne!(r, race_ids::GRISHNAKH);
            }
        }
    }
}
