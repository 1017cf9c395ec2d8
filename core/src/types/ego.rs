//! Ego templates: modifier blueprints layered atop a race.
//!
//! "Monster with ego" is not inheritance. An ego applied to a race yields a
//! derived blueprint, computed once at birth; the live instance snapshots
//! the result and never consults the ego again.

use serde::{Deserialize, Serialize};

use super::race::MonsterRace;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonsterEgo {
    /// Name prefix ("Shaman orc") or suffix flag below.
    pub name: String,
    pub name_is_suffix: bool,

    /// Percent applied to hit dice.
    pub hp_mult: i32,
    pub speed_add: i32,
    pub ac_add: i32,
    pub level_add: i32,
    /// Percent applied to every blow's dice sides.
    pub blow_mult: i32,

    /// Raw `RaceFlags` ored in.
    pub flags_add: u32,
    /// Raw `RaceSpellFlags` ored in.
    pub spells_add: u32,
    pub freq_spell: u8,

    /// Races this ego may attach to: empty allows all glyphs.
    pub glyph_allow: Vec<char>,
    pub glyph_deny: Vec<char>,
    /// Minimum sampling depth.
    pub min_level: i32,
    /// Sampling weight divisor.
    pub rarity: u8,
}

impl MonsterEgo {
    pub fn accepts(&self, race: &MonsterRace) -> bool {
        if race.is_unique() {
            return false;
        }
        if self.glyph_deny.contains(&race.glyph) {
            return false;
        }
        self.glyph_allow.is_empty() || self.glyph_allow.contains(&race.glyph)
    }
}

/// Derive the effective blueprint for `(race, ego)`.
///
/// A pure function: the result is a complete `MonsterRace` the rest of the
/// monster subsystem treats exactly like a catalog race.
pub fn effective_race(race: &MonsterRace, ego: Option<&MonsterEgo>) -> MonsterRace {
    let Some(ego) = ego else {
        return race.clone();
    };

    let mut r = race.clone();
    r.name = if ego.name_is_suffix {
        format!("{} {}", race.name, ego.name)
    } else {
        format!("{} {}", ego.name, race.name)
    };

    r.hdice = ((r.hdice as i32 * ego.hp_mult) / 100).clamp(1, u8::MAX as i32) as u8;
    r.speed += ego.speed_add;
    r.ac = (r.ac + ego.ac_add).max(0);
    r.level = (r.level + ego.level_add).max(1);
    r.mexp = (r.mexp as i64 * (100 + ego.level_add as i64 * 10) / 100) as u32;
    r.flags |= ego.flags_add;
    r.spells |= ego.spells_add;
    if ego.freq_spell > r.freq_spell {
        r.freq_spell = ego.freq_spell;
    }

    for blow in r.blows.iter_mut() {
        if !blow.is_attack() {
            continue;
        }
        let side = (blow.d_side as i32 * ego.blow_mult) / 100;
        blow.d_side = side.clamp(1, u8::MAX as i32) as u8;
    }

    r
}
