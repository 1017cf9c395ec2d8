//! Monster race blueprints.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::flags::{RaceFlags, RaceKindFlags, RaceSpellFlags};

/// Index into the race catalog. Zero is reserved for "no race".
pub type RaceId = u16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum BlowMethod {
    #[default]
    None,
    Hit,
    Touch,
    Bite,
    Claw,
    Sting,
    Gaze,
    Crush,
    Spit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum BlowEffect {
    #[default]
    None,
    Hurt,
    Poison,
    Acid,
    Fire,
    Cold,
    Elec,
    Terrify,
    Confuse,
    Paralyze,
    EatGold,
    EatItem,
    DrainLife,
}

/// One of a race's up to four attacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct MonsterBlow {
    pub method: BlowMethod,
    pub effect: BlowEffect,
    /// Damage dice count.
    pub d_dice: u8,
    /// Damage dice sides.
    pub d_side: u8,
}

impl MonsterBlow {
    pub const fn new(method: BlowMethod, effect: BlowEffect, d_dice: u8, d_side: u8) -> Self {
        MonsterBlow { method, effect, d_dice, d_side }
    }

    /// Average damage, rounded down the way every cap comparison does it.
    pub fn avg_damage(&self) -> i32 {
        ((self.d_dice as i32 + 1) * self.d_side as i32) / 2
    }

    pub fn is_attack(&self) -> bool {
        self.d_dice != 0 && self.d_side != 0
    }
}

/// Static blueprint for a monster race, loaded at boot and never mutated
/// afterwards except for the live-count and memorisation counters, which
/// the server tracks separately.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonsterRace {
    pub name: String,
    /// Display glyph; also the key for kin-summoning and escort filters.
    pub glyph: char,
    /// Display colour.
    pub attr: u8,

    /// Hit dice: `hdice` rolls of `hside`.
    pub hdice: u8,
    pub hside: u8,
    /// Racial speed, `SPEED_NORMAL`-relative.
    pub speed: i32,
    /// Racial armour class.
    pub ac: i32,
    /// Initial alertness; higher sleeps longer.
    pub sleep: i32,
    /// Detection radius in cells.
    pub aaf: i32,

    /// Native depth.
    pub level: i32,
    /// Sampling weight divisor; higher is rarer.
    pub rarity: u8,
    /// Experience the race is worth at its native level.
    pub mexp: u32,

    /// Maximum simultaneous live count; 1 for uniques.
    pub max_num: u16,

    /// Behaviour bits, raw `RaceFlags`.
    pub flags: u32,
    /// Taxonomy and terrain bits, raw `RaceKindFlags`.
    pub kind: u32,
    /// Spell bits, raw `RaceSpellFlags`.
    pub spells: u32,
    /// Spell frequency: casts one time in `freq_spell` turns when active.
    pub freq_spell: u8,

    pub blows: [MonsterBlow; 4],
}

impl MonsterRace {
    pub fn has_flag(&self, f: RaceFlags) -> bool {
        self.flags & f.bits() != 0
    }

    pub fn has_kind(&self, f: RaceKindFlags) -> bool {
        self.kind & f.bits() != 0
    }

    pub fn has_spell(&self, f: RaceSpellFlags) -> bool {
        self.spells & f.bits() != 0
    }

    pub fn is_unique(&self) -> bool {
        self.has_flag(RaceFlags::UNIQUE)
    }

    /// Average hit points of a fresh instance.
    pub fn avg_hp(&self) -> i32 {
        (self.hdice as i32 * (self.hside as i32 + 1)) / 2
    }

    /// Maximum hit points of a fresh instance.
    pub fn max_hp(&self) -> i32 {
        self.hdice as i32 * self.hside as i32
    }

    /// Experience required for a live instance to reach `level`, measured
    /// from the race's native level.
    pub fn exp_for_level(&self, level: i32) -> u32 {
        let gained = (level - self.level).max(0) as u32;
        // Quadratic curve: each level costs more than the last.
        crate::constants::MONSTER_EXP_BASE * gained * gained * (self.level.max(1) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race(level: i32) -> MonsterRace {
        MonsterRace {
            name: "test".into(),
            glyph: 'x',
            attr: 1,
            hdice: 4,
            hside: 8,
            speed: 100,
            ac: 10,
            sleep: 10,
            aaf: 20,
            level,
            rarity: 1,
            mexp: 10,
            max_num: 100,
            flags: 0,
            kind: 0,
            spells: 0,
            freq_spell: 0,
            blows: [MonsterBlow::default(); 4],
        }
    }

    #[test]
    fn exp_curve_is_monotonic() {
        let r = race(5);
        let mut prev = 0;
        for lvl in 5..30 {
            let need = r.exp_for_level(lvl);
            assert!(need >= prev);
            prev = need;
        }
    }

    #[test]
    fn avg_damage_rounds_down() {
        let b = MonsterBlow::new(BlowMethod::Hit, BlowEffect::Hurt, 2, 5);
        assert_eq!(b.avg_damage(), 7);
    }
}
