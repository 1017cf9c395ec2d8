//! The tick scheduler.
//!
//! Time has no global clock: each floor advances at its own rate. Every
//! scheduler wakeup walks the allocated floors once; players on a floor
//! bank energy in proportion to their speed and the floor's rate and
//! spend it on queued commands, then monsters do the same in entity-id
//! order, then periodic effects and (on a slower cadence) the
//! housekeeping pass run.

use deephold_core::constants::ENERGY_THRESHOLD;
use deephold_core::types::{feat, feature, PlayerId, WorldPos};
use log::{debug, info};

use crate::cave::{Overlay, OverlayKind, TrapKind};
use crate::items;
use crate::levels;
use crate::monsters::{self, summon};
use crate::net::{Command, Observation};
use crate::visibility;
use crate::world::World;

/// One scheduler wakeup.
pub fn world_tick(world: &mut World) {
    world.tick += 1;

    let mut floors: Vec<WorldPos> = world
        .levels
        .positions()
        .into_iter()
        .filter(|&w| world.levels.is_allocated(w))
        .collect();
    // Deterministic order; the map iteration order is not.
    floors.sort_unstable();

    for wpos in floors {
        level_tick(world, wpos);
    }

    // Housekeeping pseudo-floor: once a second.
    if world.tick % world.cfg.fps as i64 == 0 {
        levels::housekeeping(world);
        sweep_disconnects(world);
    }
    // Slow regeneration sweeps.
    if world.tick % (world.cfg.fps as i64 * 10) == 0 {
        for wpos in world.levels.positions() {
            if world.levels.is_allocated(wpos) {
                monsters::heal_monsters_on(world, wpos);
            }
        }
        for p in world.players.iter_mut() {
            if p.hp < p.mhp {
                p.hp += 1;
            }
            if p.blind > 0 {
                p.blind -= 1;
            }
        }
    }
}

fn level_tick(world: &mut World, wpos: WorldPos) {
    let lspeed = world.level_speed(wpos);
    if let Some(level) = world.levels.get_mut(wpos) {
        level.turn += lspeed as i64;
    }

    // Players first: a command queued before the tick resolves before any
    // monster acts this tick.
    for pid in world.players.on_level(wpos) {
        let ready = {
            let Some(p) = world.players.get_mut(pid) else { continue };
            p.energy += p.speed * lspeed / 100;
            p.energy >= ENERGY_THRESHOLD
        };
        if !ready {
            continue;
        }
        let cmd = world
            .players
            .get(pid)
            .and_then(|p| p.next_command())
            .unwrap_or(Command::Idle);
        execute_command(world, pid, cmd);
        if let Some(p) = world.players.get_mut(pid) {
            p.energy -= ENERGY_THRESHOLD;
        }
    }

    // Monsters in entity-id order.
    for m_idx in world.monsters.alive_ids() {
        let Some(m) = world.monsters.get_mut(m_idx) else { continue };
        if m.wpos != wpos {
            continue;
        }
        // Status countdowns.
        if m.stunned > 0 {
            m.stunned -= 1;
        }
        if m.confused > 0 {
            m.confused -= 1;
        }
        if m.monfear > 0 {
            m.monfear -= 1;
        }

        m.energy += m.mspeed * lspeed / 100;
        if m.energy < ENERGY_THRESHOLD {
            continue;
        }
        m.energy -= ENERGY_THRESHOLD;
        if m.stunned > 0 {
            continue;
        }
        crate::ai::monster_turn(world, m_idx);
    }

    flush_dirty_cells(world, wpos);
}

/// Push every changed cell on a floor to the players watching it, in the
/// order the mutations happened.
fn flush_dirty_cells(world: &mut World, wpos: WorldPos) {
    let dirty = match world.levels.grid_mut(wpos) {
        Some(grid) if !grid.dirty.is_empty() => std::mem::take(&mut grid.dirty),
        _ => return,
    };
    for (x, y) in dirty {
        let f = match world.levels.grid(wpos) {
            Some(grid) => grid.feat(x, y),
            None => return,
        };
        let (glyph, attr) = world
            .catalog
            .feature(f)
            .map_or(('?', 7), |feat| (feat.glyph, feat.attr));
        world.broadcast_level(wpos, &Observation::CellUpdate { x, y, feat: f, glyph, attr });
    }
}

/// Execute one player command. Inside the tick every failure surfaces as
/// a message and a consumed turn, never an unwind.
pub fn execute_command(world: &mut World, pid: PlayerId, cmd: Command) {
    match cmd {
        Command::Idle | Command::Rest => {}
        Command::Walk { dx, dy } => {
            player_walk(world, pid, dx as i32, dy as i32);
        }
        Command::Attack { target } => {
            if !crate::ai::player_melee(world, pid, target) {
                world.message_player(pid, "You flail at empty air.");
            }
        }
        Command::TakeStairs => {
            take_stairs(world, pid);
        }
        Command::PickUp => {
            if !items::player_pickup(world, pid) {
                world.message_player(pid, "There is nothing here to pick up.");
            }
        }
        Command::Drop { item, amount: _ } => {
            if !items::player_drop(world, pid, item) {
                world.message_player(pid, "You do not have that.");
            }
        }
        Command::Search => {
            player_search(world, pid);
        }
        Command::Disarm { dx, dy } => {
            player_disarm(world, pid, dx as i32, dy as i32);
        }
        Command::DrinkFountain => {
            player_drink_fountain(world, pid);
        }
        Command::Tunnel { dx, dy } => {
            player_tunnel(world, pid, dx as i32, dy as i32);
        }
        Command::AdminSummon { race } => {
            admin_summon(world, pid, race);
        }
        Command::AdminGenocide { race } => {
            admin_genocide(world, pid, race);
        }
        Command::Quit => {
            disconnect(world, pid);
        }
    }
}

fn player_walk(world: &mut World, pid: PlayerId, dx: i32, dy: i32) {
    let Some(p) = world.players.get(pid) else { return };
    let (wpos, x, y) = (p.wpos, p.x, p.y);
    let (nx, ny) = (x + dx.signum(), y + dy.signum());

    enum Step {
        Blocked,
        Open,
        OpenDoor,
        Locked,
        Fight(deephold_core::types::MonsterId),
    }

    let step = {
        let Some(grid) = world.levels.grid(wpos) else { return };
        if !grid.in_bounds_fully(nx, ny) {
            Step::Blocked
        } else if grid.cell(nx, ny).m_idx != 0 {
            Step::Fight(grid.cell(nx, ny).m_idx)
        } else {
            match grid.feat(nx, ny) {
                feat::DOOR_CLOSED => Step::OpenDoor,
                feat::DOOR_LOCKED => Step::Locked,
                f if feature::is_passable(f) && f != feat::DEEP_WATER && f != feat::LAVA => {
                    Step::Open
                }
                _ => Step::Blocked,
            }
        }
    };

    match step {
        Step::Blocked => {
            world.message_player(pid, "There is a wall in your way.");
        }
        Step::Locked => {
            world.message_player(pid, "The door is locked.");
        }
        Step::OpenDoor => {
            if let Some(grid) = world.levels.grid_mut(wpos) {
                grid.set_feature(nx, ny, feat::DOOR_OPEN);
            }
        }
        Step::Fight(m_idx) => {
            crate::ai::player_melee(world, pid, m_idx);
        }
        Step::Open => {
            {
                let p = world.players.get_mut(pid).unwrap();
                p.x = nx;
                p.y = ny;
                p.observe(Observation::PlayerMoved { wpos, x: nx, y: ny });
            }
            after_player_move(world, pid);
        }
    }
}

/// Everything a cell does to whoever steps onto it.
fn after_player_move(world: &mut World, pid: PlayerId) {
    let Some(p) = world.players.get(pid) else { return };
    let (wpos, x, y) = (p.wpos, p.x, p.y);

    // Between-gates: both endpoints carry the partner, so one step in is
    // one step out at the twin.
    let gate = world
        .levels
        .grid(wpos)
        .and_then(|g| g.get_overlay(x, y, OverlayKind::Between))
        .cloned();
    if let Some(Overlay::Between { to_x, to_y }) = gate {
        let p = world.players.get_mut(pid).unwrap();
        p.x = to_x;
        p.y = to_y;
        p.observe(Observation::PlayerMoved { wpos, x: to_x, y: to_y });
        p.message("You step through the shimmering gate.");
        visibility::update_view(world, pid);
        return;
    }

    // Traps fire unless already found and stepped around.
    let trap = world
        .levels
        .grid(wpos)
        .and_then(|g| g.get_overlay(x, y, OverlayKind::Trap))
        .cloned();
    if let Some(Overlay::Trap { kind, .. }) = trap {
        trigger_trap(world, pid, kind, x, y);
    }

    visibility::update_view(world, pid);
}

fn trigger_trap(world: &mut World, pid: PlayerId, kind: TrapKind, x: i32, y: i32) {
    let Some(p) = world.players.get(pid) else { return };
    let wpos = p.wpos;
    match kind {
        TrapKind::Pit => {
            let dam = world.rng.damroll(2, 6);
            hurt_player(world, pid, dam, "You fall into a pit!");
        }
        TrapKind::Dart => {
            let dam = world.rng.damroll(1, 4);
            hurt_player(world, pid, dam, "A small dart hits you!");
        }
        TrapKind::PoisonGas => {
            let dam = world.rng.damroll(2, 4);
            hurt_player(world, pid, dam, "A cloud of green gas surrounds you!");
        }
        TrapKind::TeleportAway => {
            let pinned = world
                .levels
                .get(wpos)
                .map_or(false, |l| l.has_flag(deephold_core::types::LevelFlags::NO_TELEPORT));
            if pinned {
                world.message_player(pid, "Space refuses to bend here.");
                return;
            }
            world.message_player(pid, "You are wrenched through space!");
            let spot = {
                let Some(grid) = world.levels.grid(wpos) else { return };
                let mut found = None;
                for _ in 0..200 {
                    let tx = world.rng.rand_int(grid.width - 2) + 1;
                    let ty = world.rng.rand_int(grid.height - 2) + 1;
                    if grid.cell_empty(tx, ty) {
                        found = Some((tx, ty));
                        break;
                    }
                }
                found
            };
            if let Some((tx, ty)) = spot {
                let p = world.players.get_mut(pid).unwrap();
                p.x = tx;
                p.y = ty;
                p.observe(Observation::PlayerMoved { wpos, x: tx, y: ty });
            }
        }
        TrapKind::Summon => {
            world.message_player(pid, "You are surrounded by sudden company!");
            let depth = world.depth_at(wpos);
            for _ in 0..3 {
                summon::summon_specific(
                    world,
                    wpos,
                    x,
                    y,
                    depth,
                    0,
                    summon::SummonType::Any,
                    false,
                    0,
                );
            }
        }
        TrapKind::Alarm => {
            world.message_player(pid, "An alarm shrieks!");
            for m_idx in world.monsters.alive_ids() {
                let Some(m) = world.monsters.get_mut(m_idx) else { continue };
                if m.wpos == wpos {
                    m.csleep = 0;
                }
            }
        }
    }
}

fn hurt_player(world: &mut World, pid: PlayerId, dam: i32, text: &str) {
    let Some(p) = world.players.get_mut(pid) else { return };
    p.hp -= dam;
    let (hp, mhp) = (p.hp.max(0), p.mhp);
    p.message(text);
    p.observe(Observation::HitPoints { cur: hp, max: mhp });
    p.disturb();
}

fn take_stairs(world: &mut World, pid: PlayerId) {
    let Some(p) = world.players.get(pid) else { return };
    let (wpos, x, y) = (p.wpos, p.x, p.y);
    let Some(grid) = world.levels.grid(wpos) else { return };

    let dest = match grid.feat(x, y) {
        feat::STAIR_DOWN => WorldPos::new(wpos.wx, wpos.wy, wpos.wz - 1),
        feat::STAIR_UP => {
            if wpos.wz < 0 {
                wpos.toward_surface()
            } else {
                WorldPos::new(wpos.wx, wpos.wy, wpos.wz + 1)
            }
        }
        _ => {
            world.message_player(pid, "There are no stairs here.");
            return;
        }
    };
    let going_down = dest.wz < wpos.wz;

    // The whole action aborts when the floor cannot exist or be built.
    if let Err(e) = levels::acquire(world, dest) {
        debug!("Stair travel {:?} -> {:?} refused: {}", wpos, dest, e);
        world.message_player(pid, "The passage is blocked.");
        return;
    }

    let landing = {
        let level = world.levels.get(dest).unwrap();
        if going_down {
            level.up_landing.or(level.down_landing)
        } else {
            level.down_landing.or(level.up_landing)
        }
    };
    let Some((lx, ly)) = landing else {
        world.message_player(pid, "The passage is blocked.");
        return;
    };

    let p = world.players.get_mut(pid).unwrap();
    p.wpos = dest;
    p.x = lx;
    p.y = ly;
    p.observe(Observation::Depth { wpos: dest });
    let tick = world.tick;
    if let Some(level) = world.levels.get_mut(dest) {
        level.last_used = tick;
    }
    visibility::update_view(world, pid);
}

/// Reveal nearby secrets: hidden doors and unfound traps.
fn player_search(world: &mut World, pid: PlayerId) {
    let Some(p) = world.players.get(pid) else { return };
    let (wpos, x, y, skill) = (p.wpos, p.x, p.y, 30 + p.level * 2);

    let mut found = Vec::new();
    {
        let Some(grid) = world.levels.grid(wpos) else { return };
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (tx, ty) = (x + dx, y + dy);
                if !grid.in_bounds_fully(tx, ty) {
                    continue;
                }
                if grid.feat(tx, ty) == feat::DOOR_SECRET {
                    found.push((tx, ty, true));
                }
                if matches!(
                    grid.get_overlay(tx, ty, OverlayKind::Trap),
                    Some(Overlay::Trap { found: false, .. })
                ) {
                    found.push((tx, ty, false));
                }
            }
        }
    }

    for (tx, ty, is_door) in found {
        if !world.rng.magik(skill) {
            continue;
        }
        let Some(grid) = world.levels.grid_mut(wpos) else { return };
        if is_door {
            grid.set_feature(tx, ty, feat::DOOR_CLOSED);
            world.message_player(pid, "You have found a secret door.");
        } else if let Some(Overlay::Trap { found, .. }) =
            grid.get_overlay_mut(tx, ty, OverlayKind::Trap)
        {
            *found = true;
            world.message_player(pid, "You have found a trap.");
        }
    }
}

/// Disarm a found trap next to the player; fumbling sets it off.
fn player_disarm(world: &mut World, pid: PlayerId, dx: i32, dy: i32) {
    let Some(p) = world.players.get(pid) else { return };
    let (wpos, skill) = (p.wpos, 40 + p.level * 2);
    let (tx, ty) = (p.x + dx.signum(), p.y + dy.signum());

    let trap = world
        .levels
        .grid(wpos)
        .and_then(|g| g.get_overlay(tx, ty, OverlayKind::Trap))
        .cloned();
    let Some(Overlay::Trap { kind, found }) = trap else {
        world.message_player(pid, "There is nothing to disarm there.");
        return;
    };
    if !found {
        world.message_player(pid, "There is nothing to disarm there.");
        return;
    }

    if world.rng.magik(skill) {
        if let Some(grid) = world.levels.grid_mut(wpos) {
            grid.remove_overlay(tx, ty, OverlayKind::Trap);
        }
        world.message_player(pid, "You disarm the trap.");
    } else {
        world.message_player(pid, "You set it off!");
        trigger_trap(world, pid, kind, tx, ty);
        if let Some(grid) = world.levels.grid_mut(wpos) {
            grid.remove_overlay(tx, ty, OverlayKind::Trap);
        }
    }
}

fn player_drink_fountain(world: &mut World, pid: PlayerId) {
    let Some(p) = world.players.get(pid) else { return };
    let (wpos, x, y) = (p.wpos, p.x, p.y);

    let stock = world
        .levels
        .grid(wpos)
        .and_then(|g| g.get_overlay(x, y, OverlayKind::Fountain))
        .cloned();
    let Some(Overlay::Fountain { kind, uses }) = stock else {
        world.message_player(pid, "There is no fountain here.");
        return;
    };
    if uses == 0 {
        world.message_player(pid, "The fountain is dry.");
        return;
    }

    // Drink the stocked draught.
    let name = world.catalog.kind(kind).name.clone();
    let heal = world.rng.damroll(4, 8);
    {
        let p = world.players.get_mut(pid).unwrap();
        p.hp = (p.hp + heal).min(p.mhp);
        let (hp, mhp) = (p.hp, p.mhp);
        p.message(format!("You drink from the fountain: {}.", name));
        p.observe(Observation::HitPoints { cur: hp, max: mhp });
    }

    let Some(grid) = world.levels.grid_mut(wpos) else { return };
    if uses <= 1 {
        grid.remove_overlay(x, y, OverlayKind::Fountain);
        grid.set_feature(x, y, feat::FOUNTAIN_DRY);
    } else if let Some(Overlay::Fountain { uses, .. }) =
        grid.get_overlay_mut(x, y, OverlayKind::Fountain)
    {
        *uses -= 1;
    }
}

/// Dig into a vein or wall; hidden treasure upgrades on digging.
fn player_tunnel(world: &mut World, pid: PlayerId, dx: i32, dy: i32) {
    let Some(p) = world.players.get(pid) else { return };
    let wpos = p.wpos;
    let (tx, ty) = (p.x + dx.signum(), p.y + dy.signum());

    let action = {
        let Some(grid) = world.levels.grid(wpos) else { return };
        if !grid.in_bounds_fully(tx, ty) {
            return;
        }
        let f = grid.feat(tx, ty);
        if feature::is_permanent(f) {
            None
        } else if feature::hides_treasure(f) || matches!(f, feat::MAGMA_TREASURE | feat::QUARTZ_TREASURE) {
            Some(true)
        } else if feature::is_wall(f) {
            Some(false)
        } else {
            None
        }
    };

    match action {
        None => {
            world.message_player(pid, "You see nothing there to dig.");
        }
        Some(treasure) => {
            if !world.rng.magik(30) {
                world.message_player(pid, "You tunnel into the rock.");
                return;
            }
            if let Some(grid) = world.levels.grid_mut(wpos) {
                grid.remove_overlay(tx, ty, OverlayKind::HiddenTreasure);
                grid.set_feature(tx, ty, feat::FLOOR);
            }
            world.message_player(pid, "You have broken through the rock.");
            if treasure {
                let tick = world.tick;
                let mut gold = items::Item::of_kind(deephold_core::catalog::kind_ids::GOLD, tick);
                gold.pval = 20 + world.rng.damroll(4, 20);
                items::floor_carry(world, wpos, tx, ty, gold);
                world.message_player(pid, "You have found something!");
            }
        }
    }
}

/// Admin summon: guarded by dungeon-master status, bypasses placement
/// guards through the override flag.
fn admin_summon(world: &mut World, pid: PlayerId, race: deephold_core::types::RaceId) {
    let Some(p) = world.players.get(pid) else { return };
    if !p.dungeon_master {
        world.message_player(pid, "You may not do that.");
        return;
    }
    let (wpos, x, y) = (p.wpos, p.x, p.y);
    if (race as usize) >= world.catalog.races.len() {
        world.message_player(pid, "No such race.");
        return;
    }
    world.admin.summon_override = true;
    let ok = summon::summon_specific_race(world, wpos, x, y, race, 0, 1);
    world.admin.summon_override = false;
    if !ok {
        world.message_player(pid, "The summons goes unanswered.");
    }
}

/// Admin genocide: remove every instance of one race from the floor,
/// unless the floor forbids it.
fn admin_genocide(world: &mut World, pid: PlayerId, race: deephold_core::types::RaceId) {
    let Some(p) = world.players.get(pid) else { return };
    if !p.dungeon_master {
        world.message_player(pid, "You may not do that.");
        return;
    }
    let wpos = p.wpos;
    let forbidden = world
        .levels
        .get(wpos)
        .map_or(false, |l| l.has_flag(deephold_core::types::LevelFlags::NO_GENO));
    if forbidden {
        world.message_player(pid, "This place resists such magic.");
        return;
    }
    let doomed: Vec<_> = world
        .monsters
        .iter_alive()
        .filter(|(_, m)| m.wpos == wpos && m.r_idx == race)
        .map(|(id, _)| id)
        .collect();
    let count = doomed.len();
    for id in doomed {
        monsters::delete_monster_idx(world, id, true);
    }
    world.message_player(pid, &format!("{} creatures wiped from the floor.", count));
}

/// Mark a player disconnected; the character lingers until the grace
/// period elapses, then logs out (pinning deep floors).
pub fn disconnect(world: &mut World, pid: PlayerId) {
    let grace = world.cfg.logout_grace_ticks();
    let tick = world.tick;
    let Some(p) = world.players.get_mut(pid) else { return };
    if !p.connected {
        return;
    }
    p.connected = false;
    p.logout_at = tick + grace;
    p.conn.drain_commands();
    info!("Player {} disconnected; logout at tick {}", p.name, p.logout_at);
}

fn sweep_disconnects(world: &mut World) {
    let now = world.tick;
    let doomed: Vec<PlayerId> = world
        .players
        .iter()
        .filter(|p| !p.connected && p.logout_at <= now)
        .map(|p| p.id)
        .collect();
    for pid in doomed {
        logout(world, pid);
    }
}

/// Final logout: deep floors stay pinned for a depth-scaled while so the
/// surroundings survive a reconnect.
pub fn logout(world: &mut World, pid: PlayerId) {
    let Some(p) = world.players.get(pid) else { return };
    let wpos = p.wpos;
    let name = p.name.clone();
    if wpos.wz != 0 {
        levels::pin_for_logout(world, wpos);
    }
    world.players.remove(pid);
    info!("Player {} logged out at {:?}", name, wpos);
}
