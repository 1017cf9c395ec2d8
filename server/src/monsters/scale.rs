//! Per-instance monster growth.
//!
//! Monsters bank experience like players do. Crossing the per-race curve
//! adds a level, which pays out hit points, occasionally speed and armour,
//! and a melee multiplier. The multiplier curve is flattened for very
//! high gains, and its square root is applied symmetrically to dice and
//! sides so the product carries the full factor. Two caps keep results
//! sane: a per-attack average cap and a whole-monster average cap.

use deephold_core::constants::{
    ATTACK_AVG_CAP, AVG_MELEE_CAP, MONSTER_LEVEL_MAX,
};
use deephold_core::types::MonsterId;

use crate::world::World;

/// Integer square root of a x100 fixed-point factor.
///
/// `factor` and the result are both scaled by 100: `sqrt100(400) == 200`
/// (the square root of 4.0 is 2.0).
fn sqrt100(factor: i64) -> i64 {
    let target = factor * 100;
    if target <= 0 {
        return 100;
    }
    let mut x = target;
    let mut last = 0;
    while x != last {
        last = x;
        x = (x + target / x) / 2;
    }
    x.max(100)
}

/// Award experience and process any level gains. Returns true when at
/// least one level was gained.
pub fn monster_gain_exp(world: &mut World, m_idx: MonsterId, exp: u32) -> bool {
    let Some(m) = world.monsters.get_mut(m_idx) else { return false };
    m.exp = m.exp.saturating_add(exp);
    check_experience(world, m_idx)
}

/// Level the monster up as far as its banked experience allows.
pub fn check_experience(world: &mut World, m_idx: MonsterId) -> bool {
    let Some(m) = world.monsters.get(m_idx) else { return false };
    let race = world.effective_race(m.r_idx, m.ego);
    let old_level = m.level;

    // Roll the gains first, then apply in one borrow.
    let mut melee_gains: i64 = 0;
    let mut new_level = old_level;
    let mut hp_add = 0;
    let mut speed_add = 0;
    let mut ac_add = 0;
    let exp = world.monsters.get(m_idx).map_or(0, |m| m.exp);
    while new_level < MONSTER_LEVEL_MAX && exp >= race.exp_for_level(new_level + 1) {
        new_level += 1;
        if world.rng.magik(90) {
            hp_add += (race.hside as i32 * race.hdice as i32) / 20;
        }
        if world.rng.magik(50) {
            speed_add += world.rng.randint(2);
        }
        if world.rng.magik(30) {
            ac_add += (race.ac / 15).max(1);
        }
        if world.rng.magik(80) {
            melee_gains += 1;
        }
    }

    if new_level == old_level {
        return false;
    }

    // Flatten the curve for very high gains, then convert the count into
    // a x100 damage multiplier: +25 effective levels doubles output. The
    // factor depends on levels gained alone, so growth per level gained
    // only ever shrinks as a race scales further past its native depth.
    let factor: i64 = if melee_gains > 0 {
        let flattened = 100_000 / ((100_000 / melee_gains) + 1000);
        flattened * 100 / 25 + 100
    } else {
        100
    };

    let side_round_up = race.level > 20;
    let sq = sqrt100(factor);

    {
        let m = world.monsters.slot_mut(m_idx);
        m.level = new_level;
        m.maxhp += hp_add;
        m.hp += hp_add;
        m.speed += speed_add;
        m.mspeed += speed_add;
        m.ac += ac_add;
        m.mac += ac_add;

        for blow in m.blows.iter_mut() {
            if !blow.is_attack() {
                continue;
            }
            let d0 = blow.d_dice as i64;
            let s0 = blow.d_side as i64;

            // Dice round down; whatever factor the dice missed is pushed
            // into the sides so the product stays near the target.
            let d1 = d0 + d0 * (sq - 100) / 100;
            let achieved = d1 * 100 / d0;
            let side_factor = (sq * sq) / achieved.max(1);

            let mut s1 = s0 + s0 * (side_factor - 100) / 100;
            if side_round_up && s0 * (side_factor - 100) % 100 != 0 {
                s1 += 1;
            }

            blow.d_dice = d1.clamp(1, u8::MAX as i64) as u8;
            blow.d_side = s1.clamp(1, u8::MAX as i64) as u8;
        }
    }

    apply_melee_caps(world, m_idx);
    true
}

/// Enforce the per-attack and whole-monster damage caps by shaving dice
/// off offending attacks.
fn apply_melee_caps(world: &mut World, m_idx: MonsterId) {
    // Per-attack cap.
    {
        let m = world.monsters.slot_mut(m_idx);
        for blow in m.blows.iter_mut() {
            while blow.is_attack() && blow.avg_damage() > ATTACK_AVG_CAP {
                if blow.d_dice >= blow.d_side {
                    blow.d_dice -= 1;
                } else {
                    blow.d_side -= 1;
                }
            }
        }
    }

    // Whole-monster cap: randomly shave one of the strong attacks until
    // the sum behaves.
    loop {
        let (total, strong): (i32, Vec<usize>) = {
            let m = world.monsters.slot_mut(m_idx);
            let total = m.avg_melee();
            let strong = m
                .blows
                .iter()
                .enumerate()
                .filter(|(_, b)| b.is_attack() && b.avg_damage() > ATTACK_AVG_CAP / 2)
                .map(|(i, _)| i)
                .collect();
            (total, strong)
        };
        if total <= AVG_MELEE_CAP || strong.is_empty() {
            break;
        }
        let pick = strong[world.rng.rand_int(strong.len() as i32) as usize];
        let m = world.monsters.slot_mut(m_idx);
        let blow = &mut m.blows[pick];
        if blow.d_dice <= 10 && blow.d_side > 1 {
            blow.d_side -= 1;
        } else if blow.d_side <= 10 && blow.d_dice > 1 {
            blow.d_dice -= 1;
        } else if world.rng.one_in(2) {
            blow.d_side = blow.d_side.saturating_sub(1).max(1);
        } else {
            blow.d_dice = blow.d_dice.saturating_sub(1).max(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deephold_core::catalog::race_ids;

    use crate::monsters::tests::arena_world;
    use crate::monsters::PlaceOpts;

    #[test]
    fn sqrt100_matches_known_values() {
        assert_eq!(sqrt100(100), 100);
        assert_eq!(sqrt100(400), 200);
        assert!((sqrt100(200) - 141).abs() <= 1);
        assert_eq!(sqrt100(0), 100);
    }

    #[test]
    fn gaining_exp_raises_level_and_stats() {
        let (mut world, wpos) = arena_world();
        let id = crate::monsters::place_monster_one(
            &mut world, wpos, 10, 10, race_ids::STONE_TROLL, 0, PlaceOpts::default(),
        )
        .unwrap();
        let before = world.monsters.get(id).unwrap().clone();
        let race = world.catalog.race(race_ids::STONE_TROLL).clone();
        let need = race.exp_for_level(before.level + 3);

        assert!(monster_gain_exp(&mut world, id, need));
        let after = world.monsters.get(id).unwrap();
        assert_eq!(after.level, before.level + 3);
        assert!(after.maxhp >= before.maxhp);
        assert!(after.speed >= before.speed);
        assert!(after.avg_melee() >= before.avg_melee());
    }

    #[test]
    fn caps_hold_even_for_huge_gains() {
        let (mut world, wpos) = arena_world();
        let id = crate::monsters::place_monster_one(
            &mut world, wpos, 10, 10, race_ids::BALROG, 0, PlaceOpts::default(),
        )
        .unwrap();
        monster_gain_exp(&mut world, id, u32::MAX / 2);
        let m = world.monsters.get(id).unwrap();
        assert!(m.avg_melee() <= AVG_MELEE_CAP, "total {}", m.avg_melee());
        for b in m.blows.iter().filter(|b| b.is_attack()) {
            assert!(b.avg_damage() <= ATTACK_AVG_CAP, "attack {}", b.avg_damage());
        }
        assert!(m.level <= MONSTER_LEVEL_MAX);
    }

    #[test]
    fn per_level_growth_shrinks_for_lower_level_races() {
        // Scale a shallow race and a deep race with identical dice to the
        // same target level; the shallow one's growth per level gained
        // must not exceed the deep one's.
        let (mut world, wpos) = arena_world();
        let shallow = crate::monsters::place_monster_one(
            &mut world, wpos, 5, 5, race_ids::KOBOLD, 0, PlaceOpts::default(),
        )
        .unwrap();
        let deep = crate::monsters::place_monster_one(
            &mut world, wpos, 7, 7, race_ids::STONE_TROLL, 0, PlaceOpts::default(),
        )
        .unwrap();

        let target = 40;
        for &(id, race) in &[(shallow, race_ids::KOBOLD), (deep, race_ids::STONE_TROLL)] {
            let need = world.catalog.race(race).exp_for_level(target);
            monster_gain_exp(&mut world, id, need);
        }

        let growth = |world: &World, id, race_id: deephold_core::types::RaceId| {
            let m = world.monsters.get(id).unwrap();
            let race = world.catalog.race(race_id);
            let base: i32 = race
                .blows
                .iter()
                .filter(|b| b.is_attack())
                .map(|b| b.avg_damage())
                .sum();
            let gained = (m.level - race.level).max(1);
            // Percent growth per level gained.
            ((m.avg_melee() - base) * 100 / base.max(1)) / gained
        };

        let shallow_growth = growth(&world, shallow, race_ids::KOBOLD);
        let deep_growth = growth(&world, deep, race_ids::STONE_TROLL);
        assert!(
            shallow_growth <= deep_growth + 5,
            "shallow {} deep {}",
            shallow_growth,
            deep_growth
        );
    }
}
