//! Player instances and the player table.

use std::collections::HashSet;

use deephold_core::constants::{MAX_MONSTERS, MAX_PLAYERS, SPEED_NORMAL};
use deephold_core::types::{ItemId, MonsterId, PlayerId, RaceId, WorldPos};

use crate::net::{Command, Connection, Observation};

/// Visibility cache bits, one byte per entity per player.
pub const VIS_SEEN: u8 = 0x01;
pub const VIS_LOS: u8 = 0x02;

/// Client-side options the server honours.
#[derive(Clone, Copy, Debug)]
pub struct PlayerOptions {
    /// Suppress disturbance on mere appearance changes.
    pub disturb_quiet: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        PlayerOptions { disturb_quiet: false }
    }
}

#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,

    pub wpos: WorldPos,
    pub x: i32,
    pub y: i32,

    pub hp: i32,
    pub mhp: i32,
    pub level: i32,
    pub exp: u32,
    pub gold: i32,
    pub speed: i32,
    pub energy: i32,

    /// Infravision radius in cells; 0 for none.
    pub infra: i32,
    pub see_inv: bool,
    /// Raw `RaceKindFlags` mask of what this player's telepathy reaches;
    /// 0 for no telepathy, `u32::MAX` for unfiltered.
    pub telepathy: u32,
    pub blind: i32,

    /// Admin: perceive everything, bypass placement guards.
    pub see_all: bool,
    pub dungeon_master: bool,

    /// Party membership; 0 for none.
    pub party: u16,

    pub inventory: Vec<ItemId>,
    /// Uniques this player has personally put down.
    pub killed_uniques: HashSet<RaceId>,

    /// Health-bar tracking and targeting.
    pub target: MonsterId,
    pub health_track: MonsterId,

    /// Per-monster visibility cache, indexed by monster id.
    pub mon_vis: Vec<u8>,
    /// Per-player visibility cache, indexed by player id.
    pub play_vis: Vec<u8>,

    pub conn: Connection,
    pub connected: bool,
    /// Tick at which a disconnected character is forcibly logged out.
    pub logout_at: i64,

    pub options: PlayerOptions,
}

impl Player {
    pub fn new(id: PlayerId, name: &str, conn: Connection) -> Player {
        Player {
            id,
            name: name.to_string(),
            wpos: WorldPos::default(),
            x: 0,
            y: 0,
            hp: 20,
            mhp: 20,
            level: 1,
            exp: 0,
            gold: 0,
            speed: SPEED_NORMAL,
            energy: 0,
            infra: 3,
            see_inv: false,
            telepathy: 0,
            blind: 0,
            see_all: false,
            dungeon_master: false,
            party: 0,
            inventory: Vec::new(),
            killed_uniques: HashSet::new(),
            target: 0,
            health_track: 0,
            mon_vis: vec![0; MAX_MONSTERS],
            play_vis: vec![0; MAX_PLAYERS],
            conn,
            connected: true,
            logout_at: 0,
            options: PlayerOptions::default(),
        }
    }

    pub fn can_see_mon(&self, m: MonsterId) -> bool {
        self.mon_vis[m as usize] & VIS_SEEN != 0
    }

    pub fn has_los_mon(&self, m: MonsterId) -> bool {
        self.mon_vis[m as usize] & VIS_LOS != 0
    }

    /// Queue an observation for the client.
    pub fn observe(&self, obs: Observation) {
        self.conn.send(obs);
    }

    pub fn message(&self, text: impl Into<String>) {
        self.observe(Observation::Message { text: text.into() });
    }

    /// Interrupt whatever repeated action is running client-side.
    pub fn disturb(&self) {
        if !self.options.disturb_quiet {
            self.observe(Observation::Disturb);
        }
    }

    pub fn next_command(&self) -> Option<Command> {
        if !self.connected {
            return None;
        }
        self.conn.poll_command()
    }

    /// Forget a monster id entirely, after death or compaction.
    pub fn forget_monster(&mut self, m: MonsterId) {
        self.mon_vis[m as usize] = 0;
        if self.target == m {
            self.target = 0;
        }
        if self.health_track == m {
            self.health_track = 0;
        }
    }

    /// Rewrite a monster id after compaction moved it.
    pub fn remap_monster(&mut self, from: MonsterId, to: MonsterId) {
        self.mon_vis[to as usize] = self.mon_vis[from as usize];
        self.mon_vis[from as usize] = 0;
        if self.target == from {
            self.target = to;
        }
        if self.health_track == from {
            self.health_track = to;
        }
    }
}

/// The player table: dense, slot 0 reserved.
#[derive(Default)]
pub struct Players {
    slots: Vec<Option<Player>>,
}

impl Players {
    pub fn new() -> Players {
        let mut slots = Vec::with_capacity(MAX_PLAYERS);
        for _ in 0..MAX_PLAYERS {
            slots.push(None);
        }
        Players { slots }
    }

    pub fn insert(&mut self, name: &str, conn: Connection) -> Option<PlayerId> {
        let id = (1..self.slots.len()).find(|&i| self.slots[i].is_none())? as PlayerId;
        self.slots[id as usize] = Some(Player::new(id, name, conn));
        Some(id)
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        self.slots.get_mut(id as usize)?.take()
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.slots.get(id as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.slots.get_mut(id as usize)?.as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.slots.iter_mut().filter_map(|s| s.as_mut())
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.iter().map(|p| p.id).collect()
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Players standing on the given floor.
    pub fn on_level(&self, wpos: WorldPos) -> Vec<PlayerId> {
        self.iter().filter(|p| p.wpos == wpos).map(|p| p.id).collect()
    }

    /// Two mutable players at once, for symmetric updates.
    pub fn pair_mut(&mut self, a: PlayerId, b: PlayerId) -> Option<(&mut Player, &mut Player)> {
        if a == b || a as usize >= self.slots.len() || b as usize >= self.slots.len() {
            return None;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (left, right) = self.slots.split_at_mut(hi as usize);
        let pa = left[lo as usize].as_mut()?;
        let pb = right[0].as_mut()?;
        if a < b {
            Some((pa, pb))
        } else {
            Some((pb, pa))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Connection;

    #[test]
    fn insert_assigns_nonzero_ids() {
        let mut players = Players::new();
        let (conn, _remote) = Connection::pair();
        let id = players.insert("alva", conn).unwrap();
        assert_ne!(id, 0);
        assert_eq!(players.get(id).unwrap().name, "alva");
        assert_eq!(players.count(), 1);
    }

    #[test]
    fn on_level_filters_by_floor() {
        let mut players = Players::new();
        let (c1, _r1) = Connection::pair();
        let (c2, _r2) = Connection::pair();
        let a = players.insert("a", c1).unwrap();
        let b = players.insert("b", c2).unwrap();
        players.get_mut(a).unwrap().wpos = WorldPos::new(1, 1, -3);
        players.get_mut(b).unwrap().wpos = WorldPos::new(1, 1, 0);
        assert_eq!(players.on_level(WorldPos::new(1, 1, -3)), vec![a]);
    }

    #[test]
    fn remap_monster_moves_cache_and_target() {
        let mut players = Players::new();
        let (conn, _remote) = Connection::pair();
        let id = players.insert("a", conn).unwrap();
        let p = players.get_mut(id).unwrap();
        p.mon_vis[40] = VIS_SEEN | VIS_LOS;
        p.target = 40;
        p.remap_monster(40, 7);
        assert_eq!(p.mon_vis[40], 0);
        assert_eq!(p.mon_vis[7], VIS_SEEN | VIS_LOS);
        assert_eq!(p.target, 7);
    }

    #[test]
    fn pair_mut_returns_both_in_argument_order() {
        let mut players = Players::new();
        let (c1, _r1) = Connection::pair();
        let (c2, _r2) = Connection::pair();
        let a = players.insert("a", c1).unwrap();
        let b = players.insert("b", c2).unwrap();
        let (pa, pb) = players.pair_mut(b, a).unwrap();
        assert_eq!(pa.id, b);
        assert_eq!(pb.id, a);
    }
}
