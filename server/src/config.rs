//! Server configuration.
//!
//! Defaults come from the constants module; a `.env` file (via `dotenvy`)
//! or real environment variables override individual knobs at boot. The
//! full CLI/config-file loader is a separate concern; this is only the
//! surface the game core reads.

use deephold_core::constants;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Scheduler wakeups per second.
    pub fps: i32,
    /// Seconds a floor must be empty and unpinned before release.
    pub level_stale_secs: i64,
    /// Minutes per depth a deep logout pins its floor.
    pub static_mins_per_depth: i64,
    /// Dropped-item lifetime on dungeon floors, seconds.
    pub item_dungeon_secs: i64,
    /// Dropped-item lifetime on the surface, seconds.
    pub item_surface_secs: i64,
    /// Lifetime multiplier for artifacts and unique drops.
    pub item_artifact_mult: i64,
    /// When set, artifacts left on purged floors are destroyed outright
    /// instead of being preserved back into circulation.
    pub anti_arts_hoard: bool,
    /// Seconds a disconnected character lingers before forced logout.
    pub logout_grace_secs: i64,
    /// Summon-chain depth past which spawns count as clones.
    pub clone_summoning_threshold: i32,
    /// 1/chance of an out-of-depth sampling boost.
    pub nasty_chance: i32,
    /// Level/chance of unusual rooms in the generator.
    pub dun_unusual: i32,
    /// Largest placed monster group.
    pub group_max: usize,
    /// Pool capacities.
    pub max_monsters: usize,
    pub max_items: usize,
    /// Port for the accept loop; the framing layer owns the socket.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fps: constants::FPS,
            level_stale_secs: constants::LEVEL_STALE_SECS,
            static_mins_per_depth: constants::STATIC_MINS_PER_DEPTH,
            item_dungeon_secs: constants::ITEM_DUNGEON_SECS,
            item_surface_secs: constants::ITEM_SURFACE_SECS,
            item_artifact_mult: constants::ITEM_ARTIFACT_MULT,
            anti_arts_hoard: false,
            logout_grace_secs: constants::LOGOUT_GRACE_SECS,
            clone_summoning_threshold: 6,
            nasty_chance: constants::NASTY_MON,
            dun_unusual: constants::DUN_UNUSUAL,
            group_max: constants::GROUP_MAX,
            max_monsters: constants::MAX_MONSTERS,
            max_items: constants::MAX_ITEMS,
            port: 18348,
        }
    }
}

impl Config {
    /// Load defaults, then apply `.env` / environment overrides.
    pub fn load() -> Config {
        // Absent .env is fine; a malformed one is worth a warning.
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Ignoring malformed .env: {}", e);
            }
        }

        let mut cfg = Config::default();
        read_env("DEEPHOLD_FPS", &mut cfg.fps);
        read_env("DEEPHOLD_LEVEL_STALE_SECS", &mut cfg.level_stale_secs);
        read_env("DEEPHOLD_STATIC_MINS_PER_DEPTH", &mut cfg.static_mins_per_depth);
        read_env("DEEPHOLD_ITEM_DUNGEON_SECS", &mut cfg.item_dungeon_secs);
        read_env("DEEPHOLD_ITEM_SURFACE_SECS", &mut cfg.item_surface_secs);
        read_env("DEEPHOLD_ANTI_ARTS_HOARD", &mut cfg.anti_arts_hoard);
        read_env("DEEPHOLD_LOGOUT_GRACE_SECS", &mut cfg.logout_grace_secs);
        read_env(
            "DEEPHOLD_CLONE_SUMMONING_THRESHOLD",
            &mut cfg.clone_summoning_threshold,
        );
        read_env("DEEPHOLD_PORT", &mut cfg.port);
        cfg
    }

    /// Ticks a floor must sit idle before the purge sweep may take it.
    pub fn stale_ticks(&self) -> i64 {
        self.level_stale_secs * self.fps as i64
    }

    pub fn logout_grace_ticks(&self) -> i64 {
        self.logout_grace_secs * self.fps as i64
    }

    /// Ticks a deep-level logout pins its floor, scaled by depth.
    pub fn pin_ticks(&self, depth: i32) -> i64 {
        self.static_mins_per_depth * depth.max(1) as i64 * 60 * self.fps as i64
    }

    /// Dropped-item lifetime in ticks for the given floor class.
    pub fn item_lifetime_ticks(&self, surface: bool, artifact: bool) -> i64 {
        let secs = if surface {
            self.item_surface_secs
        } else {
            self.item_dungeon_secs
        };
        let secs = if artifact { secs * self.item_artifact_mult } else { secs };
        secs * self.fps as i64
    }
}

fn read_env<T: std::str::FromStr>(name: &str, slot: &mut T) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse() {
            Ok(v) => *slot = v,
            Err(_) => log::warn!("Ignoring unparseable {}={}", name, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_scales_for_artifacts() {
        let cfg = Config::default();
        let plain = cfg.item_lifetime_ticks(false, false);
        let art = cfg.item_lifetime_ticks(false, true);
        assert_eq!(art, plain * cfg.item_artifact_mult);
        assert!(cfg.item_lifetime_ticks(true, false) > plain);
    }

    #[test]
    fn pin_ticks_grow_with_depth() {
        let cfg = Config::default();
        assert!(cfg.pin_ticks(40) > cfg.pin_ticks(5));
    }
}
