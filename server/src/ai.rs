//! Monster turns and melee resolution.

use deephold_core::types::{
    feat, BlowEffect, MonsterId, PlayerId, RaceFlags, RaceSpellFlags,
};
use log::debug;

use crate::monsters::{self, summon};
use crate::net::Observation;
use crate::visibility;
use crate::world::World;

/// Chance denominator for a breeder to try multiplying on its turn.
const MULTIPLY_CHANCE: i32 = 8;

/// One monster action. Called by the scheduler when the monster's energy
/// crosses the action threshold.
pub fn monster_turn(world: &mut World, m_idx: MonsterId) {
    visibility::refresh_closest_player(world, m_idx);
    let Some(m) = world.monsters.get(m_idx) else { return };
    let (wpos, mx, my, target) = (m.wpos, m.x, m.y, m.closest_player);
    let race = world.effective_race(m.r_idx, m.ego);

    // Sleepers may be roused by nearby commotion.
    if m.is_asleep() {
        let Some(p) = world.players.get(target) else { return };
        if p.wpos == wpos {
            let d = visibility::distance(p.x, p.y, mx, my);
            if d <= race.aaf {
                let m = world.monsters.slot_mut(m_idx);
                m.csleep -= (race.aaf - d + 1) * 2;
                if m.csleep <= 0 {
                    m.csleep = 0;
                    debug!("Monster {} wakes", m_idx);
                }
            }
        }
        return;
    }

    // Breeders breed.
    if race.has_flag(RaceFlags::MULTIPLY) && world.rng.one_in(MULTIPLY_CHANCE) {
        if summon::multiply_monster(world, m_idx) {
            return;
        }
    }

    let Some(p) = world.players.get(target) else { return };
    if p.wpos != wpos {
        return;
    }
    let (px, py) = (p.x, p.y);
    let d = visibility::distance(px, py, mx, my);

    // Fear: run away instead of engaging.
    if world.monsters.get(m_idx).map_or(0, |m| m.monfear) > 0 {
        let (dx, dy) = ((mx - px).signum(), (my - py).signum());
        try_step(world, m_idx, dx, dy);
        return;
    }

    // Spells, when there is a line to the target.
    let has_los = world
        .levels
        .grid(wpos)
        .map_or(false, |g| visibility::los(g, mx, my, px, py));
    if race.freq_spell > 0
        && has_los
        && d <= 18
        && world.rng.one_in(race.freq_spell as i32)
        && cast_spell(world, m_idx, target)
    {
        return;
    }

    if d <= 1 {
        monster_melee(world, m_idx, target);
        return;
    }

    // Close the distance.
    let confused = world.monsters.get(m_idx).map_or(0, |m| m.confused) > 0;
    let (dx, dy) = if confused {
        (world.rng.rand_int(3) - 1, world.rng.rand_int(3) - 1)
    } else if race.has_flag(RaceFlags::NEVER_MOVE) {
        (0, 0)
    } else {
        ((px - mx).signum(), (py - my).signum())
    };
    if dx != 0 || dy != 0 {
        if !try_step(world, m_idx, dx, dy) && !confused {
            // Blocked: slide along whichever axis is open.
            if dx != 0 && try_step(world, m_idx, dx, 0) {
                return;
            }
            if dy != 0 {
                let _ = try_step(world, m_idx, 0, dy);
            }
        }
    }
}

/// Attempt one step, honouring terrain, doors and wall-walking.
fn try_step(world: &mut World, m_idx: MonsterId, dx: i32, dy: i32) -> bool {
    let Some(m) = world.monsters.get(m_idx) else { return false };
    let (wpos, x, y) = (m.wpos, m.x, m.y);
    let race = world.effective_race(m.r_idx, m.ego);
    let (nx, ny) = (x + dx, y + dy);

    let action = {
        let Some(grid) = world.levels.grid(wpos) else { return false };
        if !grid.in_bounds_fully(nx, ny) || grid.cell(nx, ny).m_idx != 0 {
            None
        } else {
            let f = grid.feat(nx, ny);
            if f == feat::DOOR_CLOSED {
                Some(StepAction::OpenDoor)
            } else if deephold_core::types::feature::is_wall(f)
                && race.has_flag(RaceFlags::KILL_WALL)
                && !deephold_core::types::feature::is_permanent(f)
            {
                Some(StepAction::EatWall)
            } else if monsters::monster_can_cross(f, &race) {
                Some(StepAction::Walk)
            } else {
                None
            }
        }
    };

    match action {
        Some(StepAction::OpenDoor) => {
            if let Some(grid) = world.levels.grid_mut(wpos) {
                grid.set_feature(nx, ny, feat::DOOR_OPEN);
            }
            true
        }
        Some(StepAction::EatWall) => {
            if let Some(grid) = world.levels.grid_mut(wpos) {
                grid.set_feature(nx, ny, feat::FLOOR);
            }
            let moved = monsters::move_monster_to(world, m_idx, nx, ny);
            if moved {
                visibility::update_mon(world, m_idx);
            }
            moved
        }
        Some(StepAction::Walk) => {
            let moved = monsters::move_monster_to(world, m_idx, nx, ny);
            if moved {
                if race.has_flag(RaceFlags::TAKE_ITEM) {
                    crate::items::monster_take_floor_item(world, m_idx);
                }
                visibility::update_mon(world, m_idx);
            }
            moved
        }
        None => false,
    }
}

enum StepAction {
    Walk,
    OpenDoor,
    EatWall,
}

/// Pick and resolve one spell. Returns false when nothing useful exists,
/// so the turn falls through to movement.
fn cast_spell(world: &mut World, m_idx: MonsterId, target: PlayerId) -> bool {
    let Some(m) = world.monsters.get(m_idx) else { return false };
    let (wpos, mx, my, hp, maxhp, clone, chain) =
        (m.wpos, m.x, m.y, m.hp, m.maxhp, m.clone, m.clone_summoning);
    let race = world.effective_race(m.r_idx, m.ego);
    let depth = world.depth_at(wpos);

    // Wounded casters prefer to mend.
    if hp < maxhp / 3 && race.has_spell(RaceSpellFlags::HEAL) {
        let gain = world.rng.damroll(4, race.level.max(1) / 2 + 1);
        let m = world.monsters.slot_mut(m_idx);
        m.hp = (m.hp + gain).min(m.maxhp);
        return true;
    }

    // Summons, worst first.
    let summon_types: [(RaceSpellFlags, summon::SummonType); 9] = [
        (RaceSpellFlags::S_HI_DEMON, summon::SummonType::HiDemon),
        (RaceSpellFlags::S_HI_UNDEAD, summon::SummonType::HiUndead),
        (RaceSpellFlags::S_HI_DRAGON, summon::SummonType::HiDragon),
        (RaceSpellFlags::S_UNIQUE, summon::SummonType::Unique),
        (RaceSpellFlags::S_DEMON, summon::SummonType::Demon),
        (RaceSpellFlags::S_UNDEAD, summon::SummonType::Undead),
        (RaceSpellFlags::S_DRAGON, summon::SummonType::Dragon),
        (RaceSpellFlags::S_KIN, summon::SummonType::Kin(race.glyph)),
        (RaceSpellFlags::S_MONSTER, summon::SummonType::Any),
    ];
    for (flag, ty) in summon_types {
        if race.has_spell(flag) && world.rng.one_in(3) {
            return summon::summon_specific(
                world, wpos, mx, my, depth, clone, ty, true, chain,
            );
        }
    }

    // Bolts and balls: direct damage.
    if race.has_spell(RaceSpellFlags::BOLT) || race.has_spell(RaceSpellFlags::BALL) {
        let dam = world.rng.damroll(3, race.level.max(1) / 4 + 2);
        damage_player(world, target, dam, "a bolt of force");
        if race.has_spell(RaceSpellFlags::BALL) {
            if let Some(p) = world.players.get(target) {
                p.observe(Observation::ScreenFlash);
            }
        }
        return true;
    }

    // Blink out of trouble.
    if race.has_spell(RaceSpellFlags::BLINK) {
        let spot = {
            let Some(grid) = world.levels.grid(wpos) else { return false };
            let mut found = None;
            for _ in 0..20 {
                let (sx, sy) = monsters::scatter(grid, &mut world.rng, mx, my, 5);
                if grid.cell_spawnable(sx, sy) {
                    found = Some((sx, sy));
                    break;
                }
            }
            found
        };
        if let Some((sx, sy)) = spot {
            monsters::move_monster_to(world, m_idx, sx, sy);
            visibility::update_mon(world, m_idx);
            return true;
        }
    }

    false
}

/// Monster melee against a player: every blow in the table rolls to hit.
pub fn monster_melee(world: &mut World, m_idx: MonsterId, target: PlayerId) {
    let Some(m) = world.monsters.get(m_idx) else { return };
    let blows = m.blows;
    let level = m.level;
    let race = world.effective_race(m.r_idx, m.ego);

    for blow in blows.iter().filter(|b| b.is_attack()) {
        let hit_chance = 50 + level * 3;
        let dodge = world.players.get(target).map_or(0, |p| p.level * 2);
        if world.rng.rand_int(hit_chance + dodge) >= hit_chance {
            continue;
        }
        let dam = world.rng.damroll(blow.d_dice as i32, blow.d_side as i32);
        let verb = match blow.effect {
            BlowEffect::Poison => "poisons",
            BlowEffect::DrainLife => "drains",
            BlowEffect::Fire => "burns",
            BlowEffect::Cold => "freezes",
            _ => "hits",
        };
        damage_player(world, target, dam, &format!("{} {}", race.name, verb));
    }
}

/// Player melee against an adjacent monster.
pub fn player_melee(world: &mut World, pid: PlayerId, m_idx: MonsterId) -> bool {
    let Some(p) = world.players.get(pid) else { return false };
    let Some(m) = world.monsters.get(m_idx) else { return false };
    if p.wpos != m.wpos || visibility::distance(p.x, p.y, m.x, m.y) > 1 {
        return false;
    }

    let level = p.level;
    let mac = m.mac;
    let hit = world.rng.rand_int(50 + level * 5) >= mac.min(40);
    if !hit {
        world.message_player(pid, "You miss.");
        return true;
    }

    // Bare-handed baseline plus level scaling; weapons live in the
    // inventory layer.
    let dam = world.rng.damroll(1, 4) + level / 2;
    let died = crate::monsters::death::mon_take_hit(world, pid, m_idx, dam);
    if !died {
        if let Some(p) = world.players.get(pid) {
            p.observe(Observation::Sound { which: 1 });
        }
        visibility::update_mon(world, m_idx);
    }
    true
}

fn damage_player(world: &mut World, pid: PlayerId, dam: i32, source: &str) {
    let Some(p) = world.players.get_mut(pid) else { return };
    p.hp -= dam;
    let (hp, mhp) = (p.hp, p.mhp);
    p.observe(Observation::HitPoints { cur: hp.max(0), max: mhp });
    p.message(format!("{} you for {} damage.", source, dam));
    p.disturb();

    if hp < 0 {
        // Death drops the character back to the surface of their tile,
        // restored; permadeath policy belongs to the account layer.
        p.message("You die.");
        let surface = p.wpos.surface();
        p.wpos = surface;
        p.hp = mhp;
        p.observe(Observation::Depth { wpos: surface });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deephold_core::catalog::race_ids;
    use deephold_core::types::WorldPos;

    use crate::levels;
    use crate::monsters::{place_monster_one, PlaceOpts};
    use crate::net::Connection;

    fn arena() -> (World, WorldPos) {
        let mut world = World::new(
            crate::config::Config::default(),
            deephold_core::catalog::Catalog::builtin(),
            21,
        );
        let wpos = WorldPos::new(1, 1, -10);
        world.wild.get_mut(1, 1).dungeon = Some(crate::world::DungeonHandle {
            type_id: 0,
            flags: deephold_core::types::DungeonFlags::RANDOM.bits(),
            max_depth: 100,
        });
        levels::install_blank_level(&mut world, wpos, 30, 30);
        (world, wpos)
    }

    fn add_player(world: &mut World, wpos: WorldPos, x: i32, y: i32) -> PlayerId {
        let (conn, remote) = Connection::pair();
        std::mem::forget(remote);
        let pid = world.players.insert("fighter", conn).unwrap();
        let p = world.players.get_mut(pid).unwrap();
        p.wpos = wpos;
        p.x = x;
        p.y = y;
        p.hp = 100;
        p.mhp = 100;
        pid
    }

    #[test]
    fn awake_monster_closes_on_the_player() {
        let (mut world, wpos) = arena();
        let pid = add_player(&mut world, wpos, 5, 5);
        let m = place_monster_one(&mut world, wpos, 15, 5, race_ids::WOLF, 0, PlaceOpts::default())
            .unwrap();
        world.monsters.slot_mut(m).closest_player = pid;

        let before = world.monsters.get(m).unwrap().x;
        monster_turn(&mut world, m);
        let after = world.monsters.get(m).unwrap().x;
        assert!(after < before, "wolf should step toward the player");
        // Cell links stay consistent through movement.
        let mm = world.monsters.get(m).unwrap();
        assert_eq!(world.levels.grid(wpos).unwrap().cell(mm.x, mm.y).m_idx, m);
    }

    #[test]
    fn sleeping_monster_only_stirs() {
        let (mut world, wpos) = arena();
        let pid = add_player(&mut world, wpos, 6, 5);
        let m = place_monster_one(
            &mut world,
            wpos,
            8,
            5,
            race_ids::WOLF,
            0,
            PlaceOpts { sleep: true, ..Default::default() },
        )
        .unwrap();
        world.monsters.slot_mut(m).closest_player = pid;
        let pos_before = (world.monsters.get(m).unwrap().x, world.monsters.get(m).unwrap().y);
        let sleep_before = world.monsters.get(m).unwrap().csleep;
        monster_turn(&mut world, m);
        let mm = world.monsters.get(m).unwrap();
        assert_eq!((mm.x, mm.y), pos_before, "sleepers do not act");
        assert!(mm.csleep < sleep_before, "nearby noise rouses them");
    }

    #[test]
    fn adjacent_monster_attacks() {
        let (mut world, wpos) = arena();
        let pid = add_player(&mut world, wpos, 5, 5);
        let m = place_monster_one(&mut world, wpos, 6, 5, race_ids::STONE_TROLL, 0, PlaceOpts::default())
            .unwrap();
        world.monsters.slot_mut(m).closest_player = pid;

        // Swing until something lands; the troll has two real blows.
        for _ in 0..30 {
            monster_turn(&mut world, m);
        }
        assert!(world.players.get(pid).unwrap().hp < 100, "no blow ever landed");
    }

    #[test]
    fn player_melee_kills_and_cleans_up() {
        let (mut world, wpos) = arena();
        let pid = add_player(&mut world, wpos, 5, 5);
        world.players.get_mut(pid).unwrap().level = 20;
        let m = place_monster_one(&mut world, wpos, 6, 5, race_ids::WHITE_MOUSE, 0, PlaceOpts::default())
            .unwrap();
        for _ in 0..100 {
            if world.monsters.get(m).is_none() {
                break;
            }
            player_melee(&mut world, pid, m);
        }
        assert!(world.monsters.get(m).is_none(), "mouse survived 100 swings");
        assert_eq!(world.levels.grid(wpos).unwrap().cell(6, 5).m_idx, 0);
    }

    #[test]
    fn wall_eaters_carve_as_they_go() {
        let (mut world, wpos) = arena();
        let pid = add_player(&mut world, wpos, 5, 5);
        let m = place_monster_one(
            &mut world, wpos, 10, 5, race_ids::EARTH_ELEMENTAL, 0, PlaceOpts::default(),
        )
        .unwrap();
        world.monsters.slot_mut(m).closest_player = pid;
        // Wall the path.
        world
            .levels
            .grid_mut(wpos)
            .unwrap()
            .set_feature(9, 5, deephold_core::types::feat::GRANITE);

        monster_turn(&mut world, m);
        let f = world.levels.grid(wpos).unwrap().feat(9, 5);
        let mm = world.monsters.get(m).unwrap();
        assert!(
            mm.x < 10 || f == deephold_core::types::feat::FLOOR,
            "elemental neither moved nor carved"
        );
    }
}
