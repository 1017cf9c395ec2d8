//! Read-only knowledge dumps.
//!
//! The client renders these as scrollable lists; the server side is just
//! structured rows assembled from world state. Nothing here mutates.

use deephold_core::types::{RaceFlags, WorldPos};

use crate::world::World;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRow {
    pub name: String,
    /// In circulation somewhere in the world right now.
    pub generated: bool,
}

/// The artifact roster: every true artifact and whether it is out there.
pub fn artifact_list(world: &World) -> Vec<ArtifactRow> {
    world
        .catalog
        .artifact_kinds()
        .map(|(id, kind)| ArtifactRow {
            name: kind.name.clone(),
            generated: world.generated_artifacts.contains(&id),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniqueRow {
    pub name: String,
    pub level: i32,
    /// Kills recorded across all players.
    pub kills: u32,
    /// This viewer has personally slain it.
    pub killed_by_you: bool,
}

/// The unique roster, deepest first, as the viewer knows it.
pub fn unique_list(world: &World, viewer: deephold_core::types::PlayerId) -> Vec<UniqueRow> {
    let killed = world
        .players
        .get(viewer)
        .map(|p| p.killed_uniques.clone())
        .unwrap_or_default();

    let mut rows: Vec<UniqueRow> = world
        .catalog
        .unique_races()
        .map(|r_idx| {
            let race = world.catalog.race(r_idx);
            UniqueRow {
                name: race.name.clone(),
                level: race.level,
                kills: world.race_live[r_idx as usize].kills,
                killed_by_you: killed.contains(&r_idx),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.level.cmp(&a.level).then_with(|| a.name.cmp(&b.name)));
    rows
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerRow {
    pub name: String,
    pub level: i32,
    pub wpos: WorldPos,
    pub depth: i32,
    pub party: u16,
}

/// Who is online and where.
pub fn player_list(world: &World) -> Vec<PlayerRow> {
    let mut rows: Vec<PlayerRow> = world
        .players
        .iter()
        .filter(|p| p.connected)
        .map(|p| PlayerRow {
            name: p.name.clone(),
            level: p.level,
            wpos: p.wpos,
            depth: world.depth_at(p.wpos),
            party: p.party,
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DungeonRow {
    pub name: String,
    pub wx: i16,
    pub wy: i16,
    pub base_depth: i32,
    pub max_depth: i32,
    pub tower: bool,
}

/// Every anchored dungeon and tower in the overworld.
pub fn dungeon_list(world: &World) -> Vec<DungeonRow> {
    let mut rows = Vec::new();
    for wy in 0..deephold_core::constants::WILD_Y as i16 {
        for wx in 0..deephold_core::constants::WILD_X as i16 {
            let tile = world.wild.get(wx, wy);
            if let Some(h) = &tile.dungeon {
                let d = world.catalog.dungeon(h.type_id);
                rows.push(DungeonRow {
                    name: d.name.clone(),
                    wx,
                    wy,
                    base_depth: d.base_depth,
                    max_depth: h.max_depth,
                    tower: false,
                });
            }
            if let Some(h) = &tile.tower {
                let d = world.catalog.dungeon(h.type_id);
                rows.push(DungeonRow {
                    name: d.name.clone(),
                    wx,
                    wy,
                    base_depth: d.base_depth,
                    max_depth: h.max_depth,
                    tower: true,
                });
            }
        }
    }
    rows
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KillRow {
    pub name: String,
    pub glyph: char,
    pub level: i32,
    pub sights: u32,
    pub kills: u32,
}

/// Memorisation counters for races whose glyph matches, deepest first.
pub fn kills_by_glyph(world: &World, glyph: char, min_level: i32, uniques_only: bool) -> Vec<KillRow> {
    let mut rows: Vec<KillRow> = world
        .catalog
        .races
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, r)| r.glyph == glyph && r.level >= min_level)
        .filter(|(_, r)| !uniques_only || r.has_flag(RaceFlags::UNIQUE))
        .map(|(i, r)| KillRow {
            name: r.name.clone(),
            glyph: r.glyph,
            level: r.level,
            sights: world.race_live[i].sights,
            kills: world.race_live[i].kills,
        })
        .collect();
    rows.sort_by(|a, b| b.level.cmp(&a.level));
    rows
}

/// The tunable surface, rendered as rows for the settings dump.
pub fn server_settings(world: &World) -> Vec<(String, String)> {
    let cfg = &world.cfg;
    vec![
        ("fps".into(), cfg.fps.to_string()),
        ("level_stale_secs".into(), cfg.level_stale_secs.to_string()),
        ("anti_arts_hoard".into(), cfg.anti_arts_hoard.to_string()),
        ("logout_grace_secs".into(), cfg.logout_grace_secs.to_string()),
        (
            "clone_summoning_threshold".into(),
            cfg.clone_summoning_threshold.to_string(),
        ),
        ("nasty_chance".into(), cfg.nasty_chance.to_string()),
        ("group_max".into(), cfg.group_max.to_string()),
        ("runlevel".into(), world.admin.runlevel.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use deephold_core::catalog::{kind_ids, race_ids, Catalog};
    use deephold_core::types::DungeonFlags;

    use crate::config::Config;
    use crate::net::Connection;
    use crate::world::DungeonHandle;

    fn world() -> World {
        let mut world = World::new(Config::default(), Catalog::builtin(), 5);
        world.wild.get_mut(8, 8).dungeon = Some(DungeonHandle {
            type_id: 1,
            flags: DungeonFlags::RANDOM.bits(),
            max_depth: 40,
        });
        world
    }

    #[test]
    fn artifact_list_tracks_circulation() {
        let mut w = world();
        let rows = artifact_list(&w);
        assert!(rows.len() >= 2);
        assert!(rows.iter().all(|r| !r.generated));

        w.generated_artifacts.insert(kind_ids::ART_CROWN);
        let rows = artifact_list(&w);
        let crown = rows.iter().find(|r| r.name.contains("Crown")).unwrap();
        assert!(crown.generated);
    }

    #[test]
    fn unique_list_is_deepest_first_and_personal() {
        let mut w = world();
        let (conn, _r) = Connection::pair();
        let pid = w.players.insert("scholar", conn).unwrap();
        w.players
            .get_mut(pid)
            .unwrap()
            .killed_uniques
            .insert(race_ids::GRISHNAKH);

        let rows = unique_list(&w, pid);
        assert!(rows.windows(2).all(|p| p[0].level >= p[1].level));
        let grish = rows.iter().find(|r| r.name.contains("Grishnakh")).unwrap();
        assert!(grish.killed_by_you);
        let boss = rows.iter().find(|r| r.name.contains("Maeglor")).unwrap();
        assert!(!boss.killed_by_you);
    }

    #[test]
    fn dungeon_list_names_each_anchor() {
        let w = world();
        let rows = dungeon_list(&w);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "the Barrow-downs");
        assert_eq!((rows[0].wx, rows[0].wy), (8, 8));
        assert!(!rows[0].tower);
    }

    #[test]
    fn player_list_skips_disconnected() {
        let mut w = world();
        let (c1, _r1) = Connection::pair();
        let (c2, _r2) = Connection::pair();
        let a = w.players.insert("ash", c1).unwrap();
        w.players.insert("brin", c2).unwrap();
        w.players.get_mut(a).unwrap().connected = false;

        let rows = player_list(&w);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "brin");
    }

    #[test]
    fn kill_rows_filter_by_glyph() {
        let w = world();
        let rows = kills_by_glyph(&w, 'o', 0, false);
        assert!(rows.iter().all(|r| r.glyph == 'o'));
        assert!(rows.len() >= 3);
        let uniques = kills_by_glyph(&w, 'o', 0, true);
        assert_eq!(uniques.len(), 1);
    }
}
