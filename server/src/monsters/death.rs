//! Damage, death, drops and experience propagation.

use deephold_core::constants::{EXP_FINAL_LEVEL, EXP_KING_LEVEL, EXP_LEVEL_BAND};
use deephold_core::types::{ItemClass, MonsterId, PlayerId, RaceFlags, WorldPos};
use log::info;

use crate::items::{self, Item};
use crate::net::Observation;
use crate::world::World;

/// Apply damage from a player's attack. Returns true when the monster
/// died. Fear bookkeeping stays on the instance; drops and experience run
/// straight through so invariants hold at the tick boundary.
pub fn mon_take_hit(world: &mut World, attacker: PlayerId, m_idx: MonsterId, dam: i32) -> bool {
    let Some(m) = world.monsters.get_mut(m_idx) else { return false };
    m.csleep = 0;
    m.hp -= dam;
    if m.hp >= 0 {
        // Pain can break an ongoing fear, or cause one.
        if dam > 0 && m.monfear > 0 {
            m.monfear = (m.monfear - dam).max(0);
        }
        let (hp, maxhp) = (m.hp, m.maxhp);
        if dam > 0 && hp < maxhp / 10 && world.rng.magik(30) {
            let m = world.monsters.slot_mut(m_idx);
            m.monfear += 20 + world.rng.randint(10);
        }
        return false;
    }
    monster_death(world, attacker, m_idx);
    true
}

/// The experience a kill is worth to one player, before splits.
///
/// The level-difference rules: inside the band, full value; past it the
/// award falls off linearly. The band widens above the king threshold and
/// vanishes entirely above the final threshold. Clones earn nothing.
pub fn kill_exp_for(world: &World, pid: PlayerId, m_idx: MonsterId) -> u32 {
    let Some(m) = world.monsters.get(m_idx) else { return 0 };
    let Some(p) = world.players.get(pid) else { return 0 };
    if m.clone >= 100 {
        return 0;
    }
    let race = world.catalog.race(m.r_idx);

    let base = (race.mexp as i64 * m.level.max(1) as i64 / p.level.max(1) as i64).max(1);
    // Dilution scales the award down along summon/multiply chains.
    let base = base * (100 - m.clone as i64).max(0) / 100;

    let scaled = if p.level >= EXP_FINAL_LEVEL {
        base
    } else {
        let band = if p.level >= EXP_KING_LEVEL {
            EXP_LEVEL_BAND * 2
        } else {
            EXP_LEVEL_BAND
        };
        let diff = p.level - m.level;
        if diff > band {
            base * band as i64 / diff as i64
        } else {
            base
        }
    };
    scaled.max(0) as u32
}

/// Roll the race-declared death drops where the monster stood.
fn roll_drops(world: &mut World, m_idx: MonsterId) {
    let Some(m) = world.monsters.get(m_idx) else { return };
    let (wpos, x, y, r_idx) = (m.wpos, m.x, m.y, m.r_idx);
    let race = world.catalog.race(r_idx).clone();
    let depth = world.depth_at(wpos).max(race.level);

    let only_gold = race.has_flag(RaceFlags::ONLY_GOLD);
    let great = race.has_flag(RaceFlags::DROP_GREAT);
    let good = great || race.has_flag(RaceFlags::DROP_GOOD);

    let mut drops = 0;
    if world.rng.magik(60) {
        drops += 1;
    }
    if good {
        drops += 1;
    }
    if great {
        drops += world.rng.randint(2);
    }

    let tick = world.tick;
    for _ in 0..drops {
        if only_gold || (!good && world.rng.magik(40)) {
            let mut gold = Item::of_kind(deephold_core::catalog::kind_ids::GOLD, tick);
            gold.pval = (depth * 3 + world.rng.damroll(3, depth.max(1))).max(1);
            items::floor_carry(world, wpos, x, y, gold);
            continue;
        }

        // Pick a kind of fitting quality near the kill depth.
        let candidates: Vec<u16> = world
            .catalog
            .kinds
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(i, k)| {
                if matches!(k.class, ItemClass::Gold) {
                    return false;
                }
                // An artifact already in circulation cannot drop again.
                if k.artifact && world.generated_artifacts.contains(&(*i as u16)) {
                    return false;
                }
                if great {
                    k.great && k.level <= depth + 20
                } else if good {
                    k.good && k.level <= depth + 10
                } else {
                    !k.good && !k.great && k.level <= depth
                }
            })
            .map(|(i, _)| i as u16)
            .collect();
        if candidates.is_empty() {
            continue;
        }
        let pick = *world.rng.choose(&candidates);
        let mut item = Item::of_kind(pick, tick);
        item.pval = world.catalog.kind(pick).charges as i32;
        items::floor_carry(world, wpos, x, y, item);
    }
}

/// Full death handling: carried drops, race drops, experience splits,
/// unique bookkeeping, kill counters, removal.
pub fn monster_death(world: &mut World, killer: PlayerId, m_idx: MonsterId) {
    let Some(m) = world.monsters.get(m_idx) else { return };
    let (wpos, r_idx) = (m.wpos, m.r_idx);
    let race = world.catalog.race(r_idx).clone();

    // Carried items hit the floor before the race-declared drops.
    items::monster_drop_carried(world, m_idx);
    roll_drops(world, m_idx);

    // Experience, split evenly across the killer's partymates on this
    // floor; a lone killer keeps it all.
    let share_with: Vec<PlayerId> = match world.players.get(killer) {
        Some(p) if p.party != 0 => {
            let party = p.party;
            world
                .players
                .iter()
                .filter(|q| q.party == party && q.wpos == wpos)
                .map(|q| q.id)
                .collect()
        }
        Some(p) => vec![p.id],
        None => Vec::new(),
    };
    let n = share_with.len().max(1) as u32;
    for pid in &share_with {
        let exp = kill_exp_for(world, *pid, m_idx) / n;
        if exp > 0 {
            if let Some(p) = world.players.get_mut(*pid) {
                p.exp = p.exp.saturating_add(exp);
                let (exp_total, level) = (p.exp, p.level);
                p.observe(Observation::Experience { exp: exp_total, level });
            }
        }
    }

    // Unique bookkeeping and memorisation counters.
    if race.is_unique() {
        if let Some(p) = world.players.get_mut(killer) {
            p.killed_uniques.insert(r_idx);
        }
        if world.admin.watch_uniques.contains(&r_idx) {
            info!("Watched unique '{}' has been slain", race.name);
        }
        let text = format!("{} has been slain.", race.name);
        world.broadcast_level(wpos, &Observation::Message { text });
    }
    world.race_live[r_idx as usize].kills += 1;

    if let Some(p) = world.players.get(killer) {
        p.message(format!("You have slain {}.", race.name));
    }

    crate::monsters::delete_monster_idx(world, m_idx, true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use deephold_core::catalog::race_ids;

    use crate::monsters::tests::arena_world;
    use crate::monsters::{place_monster_one, PlaceOpts};
    use crate::net::Connection;

    fn player_on(world: &mut World, wpos: WorldPos, x: i32, y: i32) -> PlayerId {
        let (conn, _remote) = Connection::pair();
        std::mem::forget(_remote);
        let pid = world.players.insert("tester", conn).unwrap();
        let p = world.players.get_mut(pid).unwrap();
        p.wpos = wpos;
        p.x = x;
        p.y = y;
        pid
    }

    #[test]
    fn death_decrements_live_count_and_drops() {
        let (mut world, wpos) = arena_world();
        let pid = player_on(&mut world, wpos, 5, 5);
        let id = place_monster_one(
            &mut world, wpos, 10, 10, race_ids::ORC_CHIEFTAIN, 0, PlaceOpts::default(),
        )
        .unwrap();
        assert_eq!(world.race_live[race_ids::ORC_CHIEFTAIN as usize].cur_num, 1);

        monster_death(&mut world, pid, id);
        assert_eq!(world.race_live[race_ids::ORC_CHIEFTAIN as usize].cur_num, 0);
        assert_eq!(world.race_live[race_ids::ORC_CHIEFTAIN as usize].kills, 1);
        assert!(world.monsters.get(id).is_none());
        // DROP_GOOD guarantees at least one drop on the death cell.
        assert_ne!(world.levels.grid(wpos).unwrap().cell(10, 10).o_idx, 0);
    }

    #[test]
    fn killing_a_unique_records_it_for_the_killer() {
        let (mut world, wpos) = arena_world();
        let pid = player_on(&mut world, wpos, 5, 5);
        let id = place_monster_one(
            &mut world, wpos, 10, 10, race_ids::GRISHNAKH, 0, PlaceOpts::default(),
        )
        .unwrap();
        monster_death(&mut world, pid, id);
        assert!(world
            .players
            .get(pid)
            .unwrap()
            .killed_uniques
            .contains(&race_ids::GRISHNAKH));
        // The world slot is free again; only the kill history gates respawn.
        assert_eq!(world.race_live[race_ids::GRISHNAKH as usize].cur_num, 0);
    }

    #[test]
    fn clones_yield_no_experience() {
        let (mut world, wpos) = arena_world();
        let pid = player_on(&mut world, wpos, 5, 5);
        let id = place_monster_one(
            &mut world,
            wpos,
            10,
            10,
            race_ids::WOLF,
            0,
            PlaceOpts { sleep: false, clone: 100, clone_summoning: 9 },
        )
        .unwrap();
        assert_eq!(kill_exp_for(&world, pid, id), 0);
    }

    #[test]
    fn level_difference_band_throttles_awards() {
        let (mut world, wpos) = arena_world();
        let pid = player_on(&mut world, wpos, 5, 5);
        let id = place_monster_one(
            &mut world, wpos, 10, 10, race_ids::KOBOLD, 0, PlaceOpts::default(),
        )
        .unwrap();

        world.players.get_mut(pid).unwrap().level = 5;
        let near = kill_exp_for(&world, pid, id);
        world.players.get_mut(pid).unwrap().level = 40;
        let far = kill_exp_for(&world, pid, id);
        assert!(far < near, "deep-level farming of trivial kills pays less");

        // Above the final threshold the band vanishes.
        world.players.get_mut(pid).unwrap().level = EXP_FINAL_LEVEL;
        let unbanded = kill_exp_for(&world, pid, id);
        let expected_base = {
            let race = world.catalog.race(race_ids::KOBOLD);
            (race.mexp as i64 * race.level as i64 / EXP_FINAL_LEVEL as i64).max(1) as u32
        };
        assert_eq!(unbanded, expected_base);
    }

    #[test]
    fn partymates_on_the_floor_split_experience() {
        let (mut world, wpos) = arena_world();
        let a = player_on(&mut world, wpos, 5, 5);
        let b = player_on(&mut world, wpos, 6, 5);
        world.players.get_mut(a).unwrap().party = 3;
        world.players.get_mut(b).unwrap().party = 3;

        let id = place_monster_one(
            &mut world, wpos, 10, 10, race_ids::STONE_TROLL, 0, PlaceOpts::default(),
        )
        .unwrap();
        let solo_award = kill_exp_for(&world, a, id);
        monster_death(&mut world, a, id);

        let ea = world.players.get(a).unwrap().exp;
        let eb = world.players.get(b).unwrap().exp;
        assert_eq!(ea, solo_award / 2);
        assert_eq!(eb, solo_award / 2);
    }
}
