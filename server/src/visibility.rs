//! Per-player visibility caches.
//!
//! For every monster a player could conceivably perceive, two booleans are
//! maintained: `visible` (the client should know this monster exists) and
//! `in_los` (clear line of sight). Transitions enqueue a disturbance so
//! running, resting and auto-walk stop. The player-sees-player routine is
//! the same shape.

use deephold_core::constants::{MAX_SIGHT, WEIRD_MIND_CHANCE};
use deephold_core::types::{feature, CellFlags, MonsterId, PlayerId, RaceFlags};

use crate::cave::Grid;
use crate::net::Observation;
use crate::player::{VIS_LOS, VIS_SEEN};
use crate::world::World;

/// Straight-line visibility between two cells, walls attenuate to zero.
pub fn los(grid: &Grid, x1: i32, y1: i32, x2: i32, y2: i32) -> bool {
    let dx = (x2 - x1).abs();
    let dy = (y2 - y1).abs();
    let sx = (x2 - x1).signum();
    let sy = (y2 - y1).signum();
    let (mut x, mut y) = (x1, y1);
    let mut err = dx - dy;

    loop {
        if x == x2 && y == y2 {
            return true;
        }
        // Endpoints never block themselves.
        if (x, y) != (x1, y1) && feature::blocks_los(grid.feat(x, y)) {
            return false;
        }
        let e2 = err * 2;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
}

/// Chebyshev distance, the grid metric every range check uses.
pub fn distance(x1: i32, y1: i32, x2: i32, y2: i32) -> i32 {
    (x1 - x2).abs().max((y1 - y2).abs())
}

/// Recompute one player's caches for one monster and fire transition
/// events. Returns the new (visible, in_los) pair.
pub fn update_mon_for(world: &mut World, pid: PlayerId, m_idx: MonsterId) -> (bool, bool) {
    let Some(m) = world.monsters.get(m_idx) else { return (false, false) };
    let Some(p) = world.players.get(pid) else { return (false, false) };

    let (mut visible, mut in_los) = (false, false);

    if p.wpos == m.wpos {
        let race = world.effective_race(m.r_idx, m.ego);
        let d = distance(p.x, p.y, m.x, m.y);

        if let Some(grid) = world.levels.grid(p.wpos) {
            if d <= MAX_SIGHT && los(grid, p.x, p.y, m.x, m.y) {
                in_los = true;

                if p.blind == 0 {
                    // Infravision: warm bodies glow in the dark.
                    if d <= p.infra && !race.has_flag(RaceFlags::COLD_BLOOD) {
                        visible = true;
                    }
                    // Ordinary sight needs light on the monster's cell.
                    let cell = m_cell_lit(grid, m.x, m.y);
                    if cell && (!race.has_flag(RaceFlags::INVISIBLE) || p.see_inv) {
                        visible = true;
                    }
                }
            }
        }

        // Telepathy works level-wide, filtered by mind class.
        if p.telepathy != 0 && !race.has_flag(RaceFlags::EMPTY_MIND) {
            let class_match = p.telepathy == u32::MAX || (p.telepathy & race.kind) != 0;
            if class_match {
                if race.has_flag(RaceFlags::WEIRD_MIND) {
                    // Strange minds flicker in and out.
                    if world.rng.one_in(WEIRD_MIND_CHANCE) {
                        visible = true;
                    }
                } else {
                    visible = true;
                }
            }
        }

        // Pets are always known to their owner.
        if m.owner == pid {
            visible = true;
        }
    }

    // Administrative override.
    if world.players.get(pid).map_or(false, |p| p.see_all) {
        visible = true;
    }

    let (glyph, attr, mx, my) = {
        let m = world.monsters.get(m_idx).unwrap();
        let race = world.effective_race(m.r_idx, m.ego);
        (race.glyph, race.attr, m.x, m.y)
    };

    let p = world.players.get_mut(pid).unwrap();
    let was = p.mon_vis[m_idx as usize];
    let was_seen = was & VIS_SEEN != 0;
    let was_los = was & VIS_LOS != 0;

    let mut now = 0;
    if visible {
        now |= VIS_SEEN;
    }
    if in_los {
        now |= VIS_LOS;
    }
    p.mon_vis[m_idx as usize] = now;

    if visible && !was_seen {
        p.observe(Observation::MonsterAppear { id: m_idx, glyph, attr, x: mx, y: my });
        p.disturb();
    } else if !visible && was_seen {
        p.observe(Observation::MonsterGone { id: m_idx });
    }
    if was_los && !in_los {
        p.disturb();
    }

    if visible && !was_seen {
        let r_idx = world.monsters.get(m_idx).map(|m| m.r_idx);
        if let Some(r) = r_idx {
            world.race_live[r as usize].sights += 1;
        }
    }

    (visible, in_los)
}

fn m_cell_lit(grid: &Grid, x: i32, y: i32) -> bool {
    let c = grid.cell(x, y);
    c.has(CellFlags::GLOW) || c.has(CellFlags::LITE)
}

/// Update every player's cache for one monster; called when it moves.
pub fn update_mon(world: &mut World, m_idx: MonsterId) {
    for pid in world.players.ids() {
        update_mon_for(world, pid, m_idx);
    }
    refresh_closest_player(world, m_idx);
}

/// Update one player's cache for every monster; called when the player
/// moves or their senses change.
pub fn update_view(world: &mut World, pid: PlayerId) {
    for m_idx in world.monsters.alive_ids() {
        update_mon_for(world, pid, m_idx);
    }
    update_players_for(world, pid);
}

/// Cache the closest player for the AI's target acquisition.
pub fn refresh_closest_player(world: &mut World, m_idx: MonsterId) {
    let Some(m) = world.monsters.get(m_idx) else { return };
    let (wpos, mx, my) = (m.wpos, m.x, m.y);
    let closest = world
        .players
        .iter()
        .filter(|p| p.wpos == wpos)
        .min_by_key(|p| distance(p.x, p.y, mx, my))
        .map_or(0, |p| p.id);
    world.monsters.slot_mut(m_idx).closest_player = closest;
}

/// The symmetric player-sees-player routine.
pub fn update_players_for(world: &mut World, pid: PlayerId) {
    let Some(p) = world.players.get(pid) else { return };
    let (wpos, px, py, blind, see_all, party) = (p.wpos, p.x, p.y, p.blind, p.see_all, p.party);

    let others: Vec<PlayerId> = world.players.ids().into_iter().filter(|&o| o != pid).collect();
    for other in others {
        let (visible, in_los) = {
            let Some(q) = world.players.get(other) else { continue };
            let mut visible = false;
            let mut in_los = false;
            if q.wpos == wpos {
                let d = distance(px, py, q.x, q.y);
                if let Some(grid) = world.levels.grid(wpos) {
                    if d <= MAX_SIGHT && los(grid, px, py, q.x, q.y) {
                        in_los = true;
                        if blind == 0 && (m_cell_lit(grid, q.x, q.y) || d <= 3) {
                            visible = true;
                        }
                    }
                }
                // Partymates track each other across the whole area.
                if party != 0 && q.party == party {
                    visible = true;
                }
            }
            if see_all {
                visible = true;
            }
            (visible, in_los)
        };

        let p = world.players.get_mut(pid).unwrap();
        let was = p.play_vis[other as usize];
        let mut now = 0;
        if visible {
            now |= VIS_SEEN;
        }
        if in_los {
            now |= VIS_LOS;
        }
        p.play_vis[other as usize] = now;
        if visible && was & VIS_SEEN == 0 {
            p.disturb();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deephold_core::catalog::race_ids;
    use deephold_core::types::{feat, WorldPos};

    use crate::levels;
    use crate::monsters::{place_monster_one, PlaceOpts};
    use crate::net::{Connection, Observation, RemoteEnd};

    fn arena() -> (World, WorldPos) {
        let mut world = World::new(
            crate::config::Config::default(),
            deephold_core::catalog::Catalog::builtin(),
            55,
        );
        let wpos = WorldPos::new(2, 2, -3);
        world.wild.get_mut(2, 2).dungeon = Some(crate::world::DungeonHandle {
            type_id: 0,
            flags: deephold_core::types::DungeonFlags::RANDOM.bits(),
            max_depth: 50,
        });
        levels::install_blank_level(&mut world, wpos, 40, 40);
        (world, wpos)
    }

    fn add_player(world: &mut World, wpos: WorldPos, x: i32, y: i32) -> (PlayerId, RemoteEnd) {
        let (conn, remote) = Connection::pair();
        let pid = world.players.insert("viewer", conn).unwrap();
        let p = world.players.get_mut(pid).unwrap();
        p.wpos = wpos;
        p.x = x;
        p.y = y;
        (pid, remote)
    }

    fn light_cell(world: &mut World, wpos: WorldPos, x: i32, y: i32) {
        world
            .levels
            .grid_mut(wpos)
            .unwrap()
            .cell_mut(x, y)
            .set(CellFlags::GLOW);
    }

    #[test]
    fn lit_monster_in_line_of_sight_is_seen() {
        let (mut world, wpos) = arena();
        let (pid, remote) = add_player(&mut world, wpos, 10, 10);
        let m = place_monster_one(&mut world, wpos, 14, 10, race_ids::ORC, 0, PlaceOpts::default())
            .unwrap();
        light_cell(&mut world, wpos, 14, 10);

        let (visible, in_los) = update_mon_for(&mut world, pid, m);
        assert!(visible);
        assert!(in_los);
        // Appearance produced an event and a disturbance.
        let mut saw_appear = false;
        let mut saw_disturb = false;
        while let Ok(obs) = remote.obs_rx.try_recv() {
            match obs {
                Observation::MonsterAppear { id, .. } if id == m => saw_appear = true,
                Observation::Disturb => saw_disturb = true,
                _ => {}
            }
        }
        assert!(saw_appear);
        assert!(saw_disturb);
    }

    #[test]
    fn walls_break_line_of_sight() {
        let (mut world, wpos) = arena();
        let (pid, _remote) = add_player(&mut world, wpos, 10, 10);
        let m = place_monster_one(&mut world, wpos, 14, 10, race_ids::ORC, 0, PlaceOpts::default())
            .unwrap();
        light_cell(&mut world, wpos, 14, 10);
        world
            .levels
            .grid_mut(wpos)
            .unwrap()
            .set_feature(12, 10, feat::GRANITE);

        let (visible, in_los) = update_mon_for(&mut world, pid, m);
        assert!(!in_los);
        assert!(!visible);
    }

    #[test]
    fn infravision_fails_against_cold_blood() {
        let (mut world, wpos) = arena();
        let (pid, _remote) = add_player(&mut world, wpos, 10, 10);
        // Unlit cells, monster within infravision range.
        let warm = place_monster_one(&mut world, wpos, 12, 10, race_ids::ORC, 0, PlaceOpts::default())
            .unwrap();
        let cold =
            place_monster_one(&mut world, wpos, 10, 12, race_ids::SKELETON, 0, PlaceOpts::default())
                .unwrap();
        world.players.get_mut(pid).unwrap().infra = 5;

        let (warm_vis, _) = update_mon_for(&mut world, pid, warm);
        let (cold_vis, cold_los) = update_mon_for(&mut world, pid, cold);
        assert!(warm_vis);
        assert!(!cold_vis, "cold blood defeats infravision");
        assert!(cold_los, "line of sight is a separate fact");
    }

    #[test]
    fn telepathy_ignores_empty_minds() {
        let (mut world, wpos) = arena();
        let (pid, _remote) = add_player(&mut world, wpos, 10, 10);
        world.players.get_mut(pid).unwrap().telepathy = u32::MAX;
        // Far away and in the dark: only telepathy can reach them.
        let orc = place_monster_one(&mut world, wpos, 35, 35, race_ids::ORC, 0, PlaceOpts::default())
            .unwrap();
        let jelly =
            place_monster_one(&mut world, wpos, 35, 30, race_ids::WHITE_JELLY, 0, PlaceOpts::default())
                .unwrap();

        let (orc_vis, _) = update_mon_for(&mut world, pid, orc);
        let (jelly_vis, _) = update_mon_for(&mut world, pid, jelly);
        assert!(orc_vis, "telepathy reaches across the level");
        assert!(!jelly_vis, "empty minds never register");
    }

    #[test]
    fn blindness_blocks_sight_but_not_telepathy() {
        let (mut world, wpos) = arena();
        let (pid, _remote) = add_player(&mut world, wpos, 10, 10);
        let m = place_monster_one(&mut world, wpos, 12, 10, race_ids::ORC, 0, PlaceOpts::default())
            .unwrap();
        light_cell(&mut world, wpos, 12, 10);
        world.players.get_mut(pid).unwrap().blind = 10;

        let (visible, _) = update_mon_for(&mut world, pid, m);
        assert!(!visible);

        world.players.get_mut(pid).unwrap().telepathy = u32::MAX;
        let (visible, _) = update_mon_for(&mut world, pid, m);
        assert!(visible);
    }

    #[test]
    fn admin_sees_everything() {
        let (mut world, wpos) = arena();
        let (pid, _remote) = add_player(&mut world, wpos, 10, 10);
        world.players.get_mut(pid).unwrap().see_all = true;
        let m = place_monster_one(&mut world, wpos, 38, 38, race_ids::IMP, 0, PlaceOpts::default())
            .unwrap();
        let (visible, _) = update_mon_for(&mut world, pid, m);
        assert!(visible);
    }

    #[test]
    fn partymates_track_each_other() {
        let (mut world, wpos) = arena();
        let (a, _ra) = add_player(&mut world, wpos, 5, 5);
        let (b, _rb) = add_player(&mut world, wpos, 35, 35);
        world.players.get_mut(a).unwrap().party = 2;
        world.players.get_mut(b).unwrap().party = 2;

        update_players_for(&mut world, a);
        assert!(world.players.get(a).unwrap().play_vis[b as usize] & VIS_SEEN != 0);
    }

    #[test]
    fn closest_player_cache_refreshes() {
        let (mut world, wpos) = arena();
        let (a, _ra) = add_player(&mut world, wpos, 5, 5);
        let (b, _rb) = add_player(&mut world, wpos, 30, 30);
        let m = place_monster_one(&mut world, wpos, 28, 28, race_ids::WOLF, 0, PlaceOpts::default())
            .unwrap();
        update_mon(&mut world, m);
        assert_eq!(world.monsters.get(m).unwrap().closest_player, b);
        let _ = a;
    }
}
