//! Serialise/deserialise entry points, one per entity type.
//!
//! The save collaborator decides when and where; this module only turns
//! world state into bytes and back. Entities use plain bincode; level
//! grids compress well and get zlib on top.

use std::io::{Read, Write};

use bincode::config::{standard, Configuration};
use bincode::{Decode, Encode};
use deephold_core::types::{ItemId, PlayerId, RaceId, WorldPos};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use thiserror::Error;

use crate::cave::{Cell, Grid, Overlay};
use crate::items::Item;
use crate::monsters::Monster;
use crate::player::Player;
use crate::world::World;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("encode failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("decode failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("compression failed: {0}")]
    Io(#[from] std::io::Error),
}

fn config() -> Configuration {
    standard()
}

// ---------------------------------------------------------------------
// Entities.
// ---------------------------------------------------------------------

/// Every live monster, paired with its pool id so cross-references
/// survive the round trip.
pub fn save_monsters(world: &World) -> Result<Vec<u8>, PersistError> {
    let rows: Vec<(u16, Monster)> = world
        .monsters
        .iter_alive()
        .map(|(id, m)| (id, m.clone()))
        .collect();
    Ok(bincode::encode_to_vec(rows, config())?)
}

pub fn load_monsters(bytes: &[u8]) -> Result<Vec<(u16, Monster)>, PersistError> {
    let (rows, _) = bincode::decode_from_slice(bytes, config())?;
    Ok(rows)
}

pub fn save_items(world: &World) -> Result<Vec<u8>, PersistError> {
    let rows: Vec<(ItemId, Item)> = world
        .items
        .iter_alive()
        .map(|(id, i)| (id, i.clone()))
        .collect();
    Ok(bincode::encode_to_vec(rows, config())?)
}

pub fn load_items(bytes: &[u8]) -> Result<Vec<(ItemId, Item)>, PersistError> {
    let (rows, _) = bincode::decode_from_slice(bytes, config())?;
    Ok(rows)
}

/// The persistent slice of a player; connection state stays behind.
#[derive(Clone, Debug, Encode, Decode)]
pub struct PlayerSave {
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
    pub infra: i32,
    pub see_inv: bool,
    pub telepathy: u32,
    pub party: u16,
    pub inventory: Vec<ItemId>,
    pub killed_uniques: Vec<RaceId>,
}

impl PlayerSave {
    pub fn of(p: &Player) -> PlayerSave {
        let mut killed: Vec<RaceId> = p.killed_uniques.iter().copied().collect();
        killed.sort_unstable();
        PlayerSave {
            name: p.name.clone(),
            wpos: p.wpos,
            x: p.x,
            y: p.y,
            hp: p.hp,
            mhp: p.mhp,
            level: p.level,
            exp: p.exp,
            gold: p.gold,
            speed: p.speed,
            infra: p.infra,
            see_inv: p.see_inv,
            telepathy: p.telepathy,
            party: p.party,
            inventory: p.inventory.clone(),
            killed_uniques: killed,
        }
    }

    /// Write this snapshot back over a live player.
    pub fn apply(&self, p: &mut Player) {
        p.wpos = self.wpos;
        p.x = self.x;
        p.y = self.y;
        p.hp = self.hp;
        p.mhp = self.mhp;
        p.level = self.level;
        p.exp = self.exp;
        p.gold = self.gold;
        p.speed = self.speed;
        p.infra = self.infra;
        p.see_inv = self.see_inv;
        p.telepathy = self.telepathy;
        p.party = self.party;
        p.inventory = self.inventory.clone();
        p.killed_uniques = self.killed_uniques.iter().copied().collect();
    }
}

pub fn save_player(p: &Player) -> Result<Vec<u8>, PersistError> {
    Ok(bincode::encode_to_vec(PlayerSave::of(p), config())?)
}

pub fn load_player(bytes: &[u8]) -> Result<PlayerSave, PersistError> {
    let (save, _) = bincode::decode_from_slice(bytes, config())?;
    Ok(save)
}

pub fn save_player_by_id(world: &World, pid: PlayerId) -> Result<Option<Vec<u8>>, PersistError> {
    match world.players.get(pid) {
        Some(p) => Ok(Some(save_player(p)?)),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------
// Level grids.
// ---------------------------------------------------------------------

#[derive(Encode, Decode)]
struct GridSave {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    overlays: Vec<(u32, Vec<Overlay>)>,
}

/// Snapshot a floor grid, zlib-compressed.
pub fn save_grid(grid: &Grid) -> Result<Vec<u8>, PersistError> {
    let save = GridSave {
        width: grid.width,
        height: grid.height,
        cells: grid.cells().to_vec(),
        overlays: grid.overlay_entries(),
    };
    let raw = bincode::encode_to_vec(save, config())?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

pub fn load_grid(bytes: &[u8]) -> Result<Grid, PersistError> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut raw = Vec::new();
    decoder.read_to_end(&mut raw)?;
    let (save, _): (GridSave, _) = bincode::decode_from_slice(&raw, config())?;
    Ok(Grid::from_parts(save.width, save.height, save.cells, save.overlays))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deephold_core::catalog::{race_ids, Catalog};
    use deephold_core::types::feat;

    use crate::config::Config;
    use crate::levels;
    use crate::monsters::{place_monster_one, PlaceOpts};
    use crate::net::Connection;
    use crate::world::DungeonHandle;

    fn world() -> (World, WorldPos) {
        let mut world = World::new(Config::default(), Catalog::builtin(), 3);
        let wpos = WorldPos::new(2, 2, -4);
        world.wild.get_mut(2, 2).dungeon = Some(DungeonHandle {
            type_id: 0,
            flags: deephold_core::types::DungeonFlags::RANDOM.bits(),
            max_depth: 50,
        });
        levels::install_blank_level(&mut world, wpos, 24, 24);
        (world, wpos)
    }

    #[test]
    fn monsters_round_trip_with_ids() {
        let (mut world, wpos) = world();
        let id = place_monster_one(&mut world, wpos, 5, 5, race_ids::VAMPIRE, 0, PlaceOpts::default())
            .unwrap();
        let bytes = save_monsters(&world).unwrap();
        let rows = load_monsters(&bytes).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, id);
        assert_eq!(rows[0].1.r_idx, race_ids::VAMPIRE);
        assert_eq!((rows[0].1.x, rows[0].1.y), (5, 5));
    }

    #[test]
    fn grids_round_trip_through_compression() {
        let (mut world, wpos) = world();
        {
            let grid = world.levels.grid_mut(wpos).unwrap();
            grid.set_feature(7, 7, feat::BETWEEN_GATE);
            grid.add_overlay(7, 7, Overlay::Between { to_x: 9, to_y: 9 });
        }
        let grid = world.levels.grid(wpos).unwrap();
        let bytes = save_grid(grid).unwrap();
        let restored = load_grid(&bytes).unwrap();

        assert_eq!(restored.width, grid.width);
        assert_eq!(restored.feat(7, 7), feat::BETWEEN_GATE);
        assert_eq!(
            restored.get_overlay(7, 7, crate::cave::OverlayKind::Between),
            grid.get_overlay(7, 7, crate::cave::OverlayKind::Between)
        );
        // Flat rock compresses hard.
        assert!(bytes.len() < 24 * 24 * 8);
    }

    #[test]
    fn player_save_keeps_the_kill_history() {
        let (conn, _r) = Connection::pair();
        let mut p = Player::new(1, "keeper", conn);
        p.level = 12;
        p.killed_uniques.insert(race_ids::GRISHNAKH);

        let bytes = save_player(&p).unwrap();
        let save = load_player(&bytes).unwrap();
        assert_eq!(save.name, "keeper");
        assert_eq!(save.level, 12);
        assert_eq!(save.killed_uniques, vec![race_ids::GRISHNAKH]);

        let (conn2, _r2) = Connection::pair();
        let mut fresh = Player::new(2, "keeper", conn2);
        save.apply(&mut fresh);
        assert!(fresh.killed_uniques.contains(&race_ids::GRISHNAKH));
    }
}
