//! Dungeon-type rules: what a given dungeon allows to spawn.

use serde::{Deserialize, Serialize};

use super::race::MonsterRace;

/// How a rule's masks combine against a race's flag sets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleMode {
    /// Rule always matches.
    #[default]
    None,
    /// Every nonzero mask must be fully contained in the race's set.
    And,
    /// Any overlap with any nonzero mask matches.
    Or,
    /// Negation of `And`.
    Nand,
    /// Negation of `Or`.
    Nor,
}

/// One spawn rule: mode, one mask per race flag set, and up to five glyphs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DungeonRule {
    pub mode: RuleMode,
    /// Raw `RaceFlags` mask.
    pub flags: u32,
    /// Raw `RaceKindFlags` mask.
    pub kind: u32,
    /// Raw `RaceSpellFlags` mask.
    pub spells: u32,
    /// Allowed glyphs; `\0` entries are unused.
    pub glyphs: [char; 5],
}

impl DungeonRule {
    /// Does the race satisfy this rule, before NAND/NOR inversion?
    fn matches_raw(&self, race: &MonsterRace) -> bool {
        match self.mode {
            RuleMode::None => true,
            RuleMode::And | RuleMode::Nand => {
                if self.flags != 0 && self.flags & race.flags != self.flags {
                    return false;
                }
                if self.kind != 0 && self.kind & race.kind != self.kind {
                    return false;
                }
                if self.spells != 0 && self.spells & race.spells != self.spells {
                    return false;
                }
                for &g in self.glyphs.iter() {
                    if g != '\0' && g != race.glyph {
                        return false;
                    }
                }
                true
            }
            RuleMode::Or | RuleMode::Nor => {
                if self.flags != 0 && self.flags & race.flags != 0 {
                    return true;
                }
                if self.kind != 0 && self.kind & race.kind != 0 {
                    return true;
                }
                if self.spells != 0 && self.spells & race.spells != 0 {
                    return true;
                }
                self.glyphs.iter().any(|&g| g != '\0' && g == race.glyph)
            }
        }
    }

    /// Apply the rule, inverting for the negative modes.
    pub fn allows(&self, race: &MonsterRace) -> bool {
        let raw = self.matches_raw(race);
        match self.mode {
            RuleMode::Nand | RuleMode::Nor => !raw,
            _ => raw,
        }
    }
}

/// A dungeon flavour: depth range, handle flags, and the percentage-keyed
/// rule table that gives each dungeon a stable monster theme while still
/// allowing exceptions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DungeonType {
    pub name: String,
    pub base_depth: i32,
    pub max_depth: i32,
    /// Raw `DungeonFlags` defaults for handles of this type.
    pub flags: u16,

    /// Glyphs always allowed regardless of rules; empty means "no override".
    pub allow_glyphs: String,
    /// Glyphs never allowed, checked before everything else.
    pub deny_glyphs: String,

    pub rules: Vec<DungeonRule>,
    /// 100 entries mapping a percent roll to a rule index.
    pub rule_percents: Vec<u8>,
}

impl DungeonType {
    /// Select the rule for one spawn given a percent roll in `0..100`.
    pub fn rule_for_roll(&self, roll: u8) -> &DungeonRule {
        static FALLBACK: DungeonRule = DungeonRule {
            mode: RuleMode::None,
            flags: 0,
            kind: 0,
            spells: 0,
            glyphs: ['\0'; 5],
        };
        let idx = self
            .rule_percents
            .get(roll as usize)
            .copied()
            .unwrap_or(0) as usize;
        self.rules.get(idx).unwrap_or(&FALLBACK)
    }

    pub fn denies_glyph(&self, glyph: char) -> bool {
        self.deny_glyphs.contains(glyph)
    }

    pub fn force_allows_glyph(&self, glyph: char) -> bool {
        self.allow_glyphs.contains(glyph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::flags::RaceKindFlags;

    fn undead_race() -> MonsterRace {
        MonsterRace {
            name: "skeleton".into(),
            glyph: 's',
            attr: 1,
            hdice: 5,
            hside: 8,
            speed: 100,
            ac: 15,
            sleep: 10,
            aaf: 20,
            level: 8,
            rarity: 1,
            mexp: 20,
            max_num: 100,
            flags: 0,
            kind: RaceKindFlags::UNDEAD.bits() | RaceKindFlags::EVIL.bits(),
            spells: 0,
            freq_spell: 0,
            blows: Default::default(),
        }
    }

    #[test]
    fn and_rule_requires_full_mask() {
        let rule = DungeonRule {
            mode: RuleMode::And,
            kind: RaceKindFlags::UNDEAD.bits(),
            ..Default::default()
        };
        assert!(rule.allows(&undead_race()));

        let rule = DungeonRule {
            mode: RuleMode::And,
            kind: (RaceKindFlags::UNDEAD | RaceKindFlags::DRAGON).bits(),
            ..Default::default()
        };
        assert!(!rule.allows(&undead_race()));
    }

    #[test]
    fn nor_rule_inverts() {
        let rule = DungeonRule {
            mode: RuleMode::Nor,
            kind: RaceKindFlags::UNDEAD.bits(),
            ..Default::default()
        };
        // The race IS undead, so a NOR-undead dungeon refuses it.
        assert!(!rule.allows(&undead_race()));
    }

    #[test]
    fn or_rule_matches_glyph() {
        let rule = DungeonRule {
            mode: RuleMode::Or,
            glyphs: ['s', '\0', '\0', '\0', '\0'],
            ..Default::default()
        };
        assert!(rule.allows(&undead_race()));
    }

    #[test]
    fn none_rule_allows_everything() {
        let rule = DungeonRule::default();
        assert!(rule.allows(&undead_race()));
    }
}
