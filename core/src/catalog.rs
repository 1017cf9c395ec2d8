//! The boot-time catalog: every immutable table the server consumes.
//!
//! The textual data-file parser is an external collaborator; it produces a
//! `Catalog`. The builtin tables below are the shipped defaults and the
//! fixture set for the test suite. Nothing here is mutated after boot.

use serde::{Deserialize, Serialize};

use crate::types::{
    feat, BlowEffect, BlowMethod, DungeonRule, DungeonType, Feature, ItemClass, ItemKind,
    MonsterBlow, MonsterEgo, MonsterRace, RaceFlags, RaceId, RaceKindFlags, RaceSpellFlags,
    RuleMode, Vault, VaultKind,
};
use crate::types::vault::VaultFlags;

/// A town building kind. Indices 0..MAX_SHOPS are stable: the shop-door
/// overlay stores them and clients key their store UIs off them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShopKind {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct Catalog {
    pub features: Vec<Feature>,
    pub kinds: Vec<ItemKind>,
    pub races: Vec<MonsterRace>,
    pub egos: Vec<MonsterEgo>,
    pub vaults: Vec<Vault>,
    pub dungeons: Vec<DungeonType>,
    pub shops: Vec<ShopKind>,
}

impl Catalog {
    pub fn race(&self, id: RaceId) -> &MonsterRace {
        &self.races[id as usize]
    }

    /// Feature metadata by feature id. The id space is sparse, so this is
    /// a lookup, not an index.
    pub fn feature(&self, id: crate::types::FeatId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn kind(&self, id: u16) -> &ItemKind {
        &self.kinds[id as usize]
    }

    pub fn ego(&self, id: u16) -> Option<&MonsterEgo> {
        if id == 0 {
            None
        } else {
            self.egos.get(id as usize)
        }
    }

    pub fn dungeon(&self, id: u16) -> &DungeonType {
        &self.dungeons[id as usize]
    }

    /// All true-artifact kinds, for the knowledge surface and preservation
    /// bookkeeping.
    pub fn artifact_kinds(&self) -> impl Iterator<Item = (u16, &ItemKind)> {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| k.artifact)
            .map(|(i, k)| (i as u16, k))
    }

    /// Race ids whose races are uniques.
    pub fn unique_races(&self) -> impl Iterator<Item = RaceId> + '_ {
        self.races
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_unique())
            .map(|(i, _)| i as RaceId)
    }

    pub fn builtin() -> Catalog {
        Catalog {
            features: builtin_features(),
            kinds: builtin_kinds(),
            races: builtin_races(),
            egos: builtin_egos(),
            vaults: builtin_vaults(),
            dungeons: builtin_dungeons(),
            shops: builtin_shops(),
        }
    }
}

fn builtin_features() -> Vec<Feature> {
    vec![
        Feature::new(feat::NONE, "nothing", ' ', 0),
        Feature::new(feat::FLOOR, "floor", '.', 7),
        Feature::new(feat::DIRT, "dirt", '.', 3),
        Feature::new(feat::GRASS, "grass", ',', 2),
        Feature::new(feat::TREE, "tree", 'T', 2),
        Feature::new(feat::PAVEMENT, "paved street", '.', 8),
        Feature::new(feat::SHALLOW_WATER, "shallow water", '~', 6),
        Feature::new(feat::DEEP_WATER, "deep water", '~', 4),
        Feature::new(feat::LAVA, "lava", '~', 1),
        Feature::new(feat::RUBBLE, "pile of rubble", ':', 3),
        Feature::new(feat::STAIR_DOWN, "down staircase", '>', 7),
        Feature::new(feat::STAIR_UP, "up staircase", '<', 7),
        Feature::new(feat::BETWEEN_GATE, "shimmering gate", '+', 5),
        Feature::new(feat::FOUNTAIN, "fountain", '_', 6),
        Feature::new(feat::FOUNTAIN_DRY, "dried fountain", '_', 3),
        Feature::new(feat::GLYPH_WARDING, "glyph of warding", ';', 3),
        Feature::new(feat::DOOR_OPEN, "open door", '\'', 3),
        Feature::new(feat::DOOR_BROKEN, "broken door", '\'', 3),
        Feature::new(feat::DOOR_CLOSED, "closed door", '+', 3),
        Feature::new(feat::DOOR_LOCKED, "locked door", '+', 3),
        Feature::new(feat::DOOR_SECRET, "wall", '#', 7),
        Feature::new(feat::SHOP_DOOR, "shop entrance", '1', 7),
        Feature::new(feat::HOUSE_DOOR, "house door", '+', 3),
        Feature::new(feat::MAGMA, "magma vein", '%', 8),
        Feature::new(feat::QUARTZ, "quartz vein", '%', 7),
        Feature::new(feat::MAGMA_TREASURE, "magma with treasure", '*', 3),
        Feature::new(feat::QUARTZ_TREASURE, "quartz with treasure", '*', 3),
        Feature::new(feat::MAGMA_HIDDEN, "magma vein", '%', 8),
        Feature::new(feat::QUARTZ_HIDDEN, "quartz vein", '%', 7),
        Feature::new(feat::GRANITE, "granite wall", '#', 7),
        Feature::new(feat::WALL_INNER, "granite wall", '#', 7),
        Feature::new(feat::WALL_OUTER, "granite wall", '#', 7),
        Feature::new(feat::WALL_SOLID, "granite wall", '#', 7),
        Feature::new(feat::PERM_INNER, "permanent wall", '#', 8),
        Feature::new(feat::PERM_OUTER, "permanent wall", '#', 8),
        Feature::new(feat::PERM_SOLID, "permanent wall", '#', 8),
        Feature::new(feat::HOUSE_WALL, "house wall", '#', 3),
    ]
}

/// Stable kind indices used across the builtin tables.
pub mod kind_ids {
    pub const GOLD: u16 = 1;
    pub const TORCH: u16 = 2;
    pub const RATION: u16 = 3;
    pub const CURE_LIGHT: u16 = 4;
    pub const CURE_SERIOUS: u16 = 5;
    pub const SPEED: u16 = 6;
    pub const SCROLL_PHASE: u16 = 7;
    pub const SCROLL_MAPPING: u16 = 8;
    pub const SCROLL_RECALL: u16 = 9;
    pub const WAND_MISSILE: u16 = 10;
    pub const DAGGER: u16 = 11;
    pub const LONG_SWORD: u16 = 12;
    pub const WAR_HAMMER: u16 = 13;
    pub const LEATHER_ARMOR: u16 = 14;
    pub const CHAIN_MAIL: u16 = 15;
    pub const SMALL_SHIELD: u16 = 16;
    pub const IRON_HELM: u16 = 17;
    pub const LEATHER_BOOTS: u16 = 18;
    pub const RING_PROTECTION: u16 = 19;
    pub const AMULET_WARDING: u16 = 20;
    pub const PICK: u16 = 21;
    pub const ART_DAWNBLADE: u16 = 22;
    pub const ART_CROWN: u16 = 23;
}

fn builtin_kinds() -> Vec<ItemKind> {
    use kind_ids as k;

    let mut v = vec![ItemKind::simple("nothing", ItemClass::Junk, ' ', 0, 0)];
    debug_assert_eq!(v.len() as u16, k::GOLD);
    v.push(ItemKind::simple("gold", ItemClass::Gold, '$', 0, 1));
    v.push(ItemKind::simple("wooden torch", ItemClass::Lantern, '~', 1, 2));
    v.push(ItemKind::simple("ration of food", ItemClass::Food, ',', 0, 3));
    v.push(ItemKind::simple(
        "potion of cure light wounds",
        ItemClass::Potion,
        '!',
        1,
        15,
    ));
    v.push(ItemKind::simple(
        "potion of cure serious wounds",
        ItemClass::Potion,
        '!',
        10,
        40,
    ));
    v.push({
        let mut p = ItemKind::simple("potion of speed", ItemClass::Potion, '!', 25, 250);
        p.good = true;
        p
    });
    v.push(ItemKind::simple(
        "scroll of phase door",
        ItemClass::Scroll,
        '?',
        3,
        15,
    ));
    v.push(ItemKind::simple(
        "scroll of magic mapping",
        ItemClass::Scroll,
        '?',
        10,
        50,
    ));
    v.push(ItemKind::simple(
        "scroll of word of recall",
        ItemClass::Scroll,
        '?',
        15,
        150,
    ));
    v.push({
        let mut w = ItemKind::simple("wand of magic missile", ItemClass::Wand, '-', 5, 75);
        w.charges = 12;
        w.d_dice = 2;
        w.d_side = 6;
        w
    });
    v.push({
        let mut w = ItemKind::simple("dagger", ItemClass::Weapon, '|', 1, 10);
        w.d_dice = 1;
        w.d_side = 4;
        w
    });
    v.push({
        let mut w = ItemKind::simple("long sword", ItemClass::Weapon, '|', 10, 120);
        w.d_dice = 2;
        w.d_side = 5;
        w.good = true;
        w
    });
    v.push({
        let mut w = ItemKind::simple("war hammer", ItemClass::Weapon, '\\', 8, 100);
        w.d_dice = 3;
        w.d_side = 3;
        w
    });
    v.push(ItemKind::simple(
        "leather armour",
        ItemClass::Armor,
        '(',
        2,
        30,
    ));
    v.push({
        let mut a = ItemKind::simple("chain mail", ItemClass::Armor, '[', 15, 300);
        a.good = true;
        a
    });
    v.push(ItemKind::simple("small shield", ItemClass::Shield, ')', 4, 30));
    v.push(ItemKind::simple("iron helm", ItemClass::Helm, ']', 8, 75));
    v.push(ItemKind::simple(
        "leather boots",
        ItemClass::Boots,
        ']',
        2,
        10,
    ));
    v.push({
        let mut r = ItemKind::simple("ring of protection", ItemClass::Ring, '=', 20, 400);
        r.good = true;
        r.great = true;
        r
    });
    v.push({
        let mut a = ItemKind::simple("amulet of warding", ItemClass::Amulet, '"', 30, 600);
        a.good = true;
        a.great = true;
        a
    });
    v.push(ItemKind::simple("miner's pick", ItemClass::Digger, '\\', 5, 50));
    v.push({
        let mut a = ItemKind::simple("the Dawnblade", ItemClass::Weapon, '|', 40, 30000);
        a.d_dice = 4;
        a.d_side = 8;
        a.artifact = true;
        a.good = true;
        a.great = true;
        a.stackable = false;
        a
    });
    v.push({
        let mut a = ItemKind::simple(
            "the Crown of the Deep",
            ItemClass::Helm,
            ']',
            60,
            50000,
        );
        a.artifact = true;
        a.good = true;
        a.great = true;
        a.stackable = false;
        a
    });
    v
}

/// Stable race indices used by tests and the builtin dungeon rules.
pub mod race_ids {
    use crate::types::RaceId;

    pub const URCHIN: RaceId = 1;
    pub const DRUNK: RaceId = 2;
    pub const MONGREL: RaceId = 3;
    pub const WHITE_MOUSE: RaceId = 4;
    pub const CAVE_SPIDER: RaceId = 5;
    pub const KOBOLD: RaceId = 6;
    pub const WILD_DOG: RaceId = 7;
    pub const WHITE_JELLY: RaceId = 8;
    pub const GIANT_ANT: RaceId = 9;
    pub const FLOATING_EYE: RaceId = 10;
    pub const ORC: RaceId = 11;
    pub const ORC_ARCHER: RaceId = 12;
    pub const ORC_CHIEFTAIN: RaceId = 13;
    pub const GRISHNAKH: RaceId = 14;
    pub const SKELETON: RaceId = 15;
    pub const GRAVE_WIGHT: RaceId = 16;
    pub const STONE_TROLL: RaceId = 17;
    pub const WOLF: RaceId = 18;
    pub const AIR_HOUND: RaceId = 19;
    pub const WATER_NAGA: RaceId = 20;
    pub const PIRANHA: RaceId = 21;
    pub const HILL_GIANT: RaceId = 22;
    pub const QUEEN_ANT: RaceId = 23;
    pub const IMP: RaceId = 24;
    pub const FOUR_HYDRA: RaceId = 25;
    pub const EARTH_ELEMENTAL: RaceId = 26;
    pub const DREAD: RaceId = 27;
    pub const YOUNG_RED_DRAGON: RaceId = 28;
    pub const VAMPIRE: RaceId = 29;
    pub const ANGEL: RaceId = 30;
    pub const LICH: RaceId = 31;
    pub const BALROG: RaceId = 32;
    pub const GREAT_WYRM: RaceId = 33;
    pub const DRACOLICH: RaceId = 34;
    pub const MAEGLOR: RaceId = 35;
}

struct RaceSpec {
    name: &'static str,
    glyph: char,
    attr: u8,
    hdice: u8,
    hside: u8,
    speed: i32,
    ac: i32,
    level: i32,
    rarity: u8,
    mexp: u32,
    max_num: u16,
    flags: RaceFlags,
    kind: RaceKindFlags,
    spells: RaceSpellFlags,
    freq_spell: u8,
    blows: [(BlowMethod, BlowEffect, u8, u8); 4],
}

impl RaceSpec {
    fn build(self) -> MonsterRace {
        MonsterRace {
            name: self.name.to_string(),
            glyph: self.glyph,
            attr: self.attr,
            hdice: self.hdice,
            hside: self.hside,
            speed: self.speed,
            ac: self.ac,
            sleep: 10 + self.level,
            aaf: 20,
            level: self.level,
            rarity: self.rarity,
            mexp: self.mexp,
            max_num: self.max_num,
            flags: self.flags.bits(),
            kind: self.kind.bits(),
            spells: self.spells.bits(),
            freq_spell: self.freq_spell,
            blows: self.blows.map(|(m, e, d, s)| MonsterBlow::new(m, e, d, s)),
        }
    }
}

const NO_BLOW: (BlowMethod, BlowEffect, u8, u8) = (BlowMethod::None, BlowEffect::None, 0, 0);

fn builtin_races() -> Vec<MonsterRace> {
    use BlowEffect as E;
    use BlowMethod as M;
    use RaceFlags as F;
    use RaceKindFlags as K;
    use RaceSpellFlags as S;

    let mut races = vec![MonsterRace {
        name: "nothing".into(),
        glyph: ' ',
        attr: 0,
        hdice: 1,
        hside: 1,
        speed: 100,
        ac: 0,
        sleep: 0,
        aaf: 0,
        level: 0,
        rarity: 1,
        mexp: 0,
        max_num: 0,
        flags: 0,
        kind: 0,
        spells: 0,
        freq_spell: 0,
        blows: [MonsterBlow::default(); 4],
    }];

    let specs = vec![
        RaceSpec {
            name: "scruffy urchin", glyph: 't', attr: 7, hdice: 2, hside: 4,
            speed: 100, ac: 1, level: 0, rarity: 1, mexp: 0, max_num: 200,
            flags: F::TOWNSFOLK | F::TAKE_ITEM, kind: K::empty(), spells: S::empty(), freq_spell: 0,
            blows: [(M::Touch, E::EatGold, 0, 0), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "town drunk", glyph: 't', attr: 3, hdice: 2, hside: 3,
            speed: 90, ac: 1, level: 0, rarity: 1, mexp: 0, max_num: 200,
            flags: F::TOWNSFOLK, kind: K::empty(), spells: S::empty(), freq_spell: 0,
            blows: [NO_BLOW; 4],
        },
        RaceSpec {
            name: "stray mongrel", glyph: 'C', attr: 3, hdice: 2, hside: 5,
            speed: 110, ac: 3, level: 0, rarity: 1, mexp: 0, max_num: 200,
            flags: F::TOWNSFOLK, kind: K::ANIMAL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Bite, E::Hurt, 1, 2), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "giant white mouse", glyph: 'r', attr: 7, hdice: 1, hside: 3,
            speed: 110, ac: 4, level: 1, rarity: 1, mexp: 1, max_num: 512,
            flags: F::MULTIPLY, kind: K::ANIMAL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Bite, E::Hurt, 1, 2), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "cave spider", glyph: 'S', attr: 4, hdice: 1, hside: 4,
            speed: 120, ac: 5, level: 2, rarity: 1, mexp: 2, max_num: 256,
            flags: F::FRIENDS, kind: K::ANIMAL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Bite, E::Hurt, 1, 3), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "kobold", glyph: 'k', attr: 2, hdice: 3, hside: 7,
            speed: 100, ac: 16, level: 2, rarity: 1, mexp: 5, max_num: 100,
            flags: F::FRIEND, kind: K::EVIL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Hit, E::Hurt, 1, 6), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "wild dog", glyph: 'C', attr: 3, hdice: 2, hside: 6,
            speed: 110, ac: 6, level: 3, rarity: 1, mexp: 4, max_num: 100,
            flags: F::FRIENDS, kind: K::ANIMAL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Bite, E::Hurt, 1, 4), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "white jelly", glyph: 'j', attr: 7, hdice: 8, hside: 8,
            speed: 60, ac: 1, level: 3, rarity: 1, mexp: 10, max_num: 100,
            flags: F::NEVER_MOVE | F::EMPTY_MIND | F::COLD_BLOOD,
            kind: K::IM_POIS, spells: S::empty(), freq_spell: 0,
            blows: [(M::Touch, E::Poison, 1, 6), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "giant black ant", glyph: 'a', attr: 0, hdice: 3, hside: 6,
            speed: 110, ac: 20, level: 4, rarity: 1, mexp: 8, max_num: 256,
            flags: F::empty(), kind: K::ANIMAL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Bite, E::Hurt, 1, 4), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "floating eye", glyph: 'e', attr: 5, hdice: 11, hside: 8,
            speed: 70, ac: 6, level: 5, rarity: 2, mexp: 17, max_num: 100,
            flags: F::NEVER_MOVE | F::WEIRD_MIND, kind: K::empty(), spells: S::empty(), freq_spell: 0,
            blows: [(M::Gaze, E::Paralyze, 0, 0), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "orc soldier", glyph: 'o', attr: 2, hdice: 4, hside: 8,
            speed: 100, ac: 28, level: 8, rarity: 1, mexp: 15, max_num: 256,
            flags: F::FRIENDS, kind: K::ORC | K::EVIL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Hit, E::Hurt, 2, 6), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "orc archer", glyph: 'o', attr: 2, hdice: 4, hside: 7,
            speed: 100, ac: 24, level: 9, rarity: 2, mexp: 18, max_num: 128,
            flags: F::empty(), kind: K::ORC | K::EVIL, spells: S::BOLT, freq_spell: 6,
            blows: [(M::Hit, E::Hurt, 1, 8), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "orc chieftain", glyph: 'o', attr: 1, hdice: 8, hside: 9,
            speed: 105, ac: 40, level: 13, rarity: 2, mexp: 40, max_num: 64,
            flags: F::ESCORT | F::DROP_GOOD, kind: K::ORC | K::EVIL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Hit, E::Hurt, 2, 8), (M::Hit, E::Hurt, 2, 8), NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "Grishnakh, the Orc Captain", glyph: 'o', attr: 1, hdice: 12, hside: 10,
            speed: 110, ac: 50, level: 15, rarity: 3, mexp: 160, max_num: 1,
            flags: F::UNIQUE | F::ESCORT | F::DROP_GOOD | F::FORCE_MAXHP,
            kind: K::ORC | K::EVIL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Hit, E::Hurt, 3, 6), (M::Hit, E::Hurt, 3, 6), NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "skeleton warrior", glyph: 's', attr: 7, hdice: 5, hside: 8,
            speed: 100, ac: 26, level: 10, rarity: 1, mexp: 20, max_num: 256,
            flags: F::COLD_BLOOD | F::EMPTY_MIND, kind: K::UNDEAD | K::EVIL | K::NONLIVING,
            spells: S::empty(), freq_spell: 0,
            blows: [(M::Hit, E::Hurt, 1, 8), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "grave wight", glyph: 'W', attr: 4, hdice: 12, hside: 8,
            speed: 100, ac: 40, level: 18, rarity: 1, mexp: 60, max_num: 128,
            flags: F::COLD_BLOOD, kind: K::UNDEAD | K::EVIL | K::IM_COLD | K::IM_POIS,
            spells: S::empty(), freq_spell: 0,
            blows: [(M::Touch, E::DrainLife, 1, 6), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "stone troll", glyph: 'T', attr: 7, hdice: 10, hside: 10,
            speed: 100, ac: 40, level: 20, rarity: 1, mexp: 85, max_num: 128,
            flags: F::DROP_GOOD, kind: K::TROLL | K::EVIL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Hit, E::Hurt, 1, 10), (M::Bite, E::Hurt, 2, 4), NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "wolf", glyph: 'C', attr: 7, hdice: 6, hside: 6,
            speed: 120, ac: 30, level: 14, rarity: 1, mexp: 30, max_num: 256,
            flags: F::FRIENDS, kind: K::ANIMAL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Bite, E::Hurt, 1, 6), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "air hound", glyph: 'Z', attr: 6, hdice: 6, hside: 6,
            speed: 110, ac: 30, level: 16, rarity: 1, mexp: 35, max_num: 256,
            flags: F::FRIENDS, kind: K::ANIMAL | K::CAN_FLY, spells: S::empty(), freq_spell: 0,
            blows: [(M::Bite, E::Hurt, 1, 8), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "water naga", glyph: 'n', attr: 6, hdice: 10, hside: 10,
            speed: 100, ac: 36, level: 16, rarity: 2, mexp: 40, max_num: 100,
            flags: F::empty(), kind: K::AQUATIC | K::EVIL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Bite, E::Hurt, 2, 6), (M::Crush, E::Hurt, 2, 6), NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "piranha", glyph: 'F', attr: 4, hdice: 2, hside: 6,
            speed: 110, ac: 10, level: 12, rarity: 1, mexp: 8, max_num: 256,
            flags: F::FRIENDS, kind: K::ANIMAL | K::AQUATIC, spells: S::empty(), freq_spell: 0,
            blows: [(M::Bite, E::Hurt, 1, 6), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "hill giant", glyph: 'P', attr: 3, hdice: 16, hside: 10,
            speed: 100, ac: 45, level: 24, rarity: 1, mexp: 130, max_num: 100,
            flags: F::DROP_GOOD, kind: K::GIANT | K::EVIL, spells: S::empty(), freq_spell: 0,
            blows: [(M::Hit, E::Hurt, 3, 6), (M::Hit, E::Hurt, 3, 6), NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "The Queen Ant", glyph: 'a', attr: 1, hdice: 20, hside: 10,
            speed: 120, ac: 60, level: 26, rarity: 2, mexp: 350, max_num: 1,
            flags: F::UNIQUE | F::FORCE_MAXHP | F::ESCORT, kind: K::ANIMAL,
            spells: S::S_KIN, freq_spell: 4,
            blows: [(M::Bite, E::Hurt, 2, 8), (M::Sting, E::Poison, 2, 6), NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "imp", glyph: 'u', attr: 1, hdice: 6, hside: 8,
            speed: 110, ac: 30, level: 25, rarity: 1, mexp: 55, max_num: 256,
            flags: F::INVISIBLE, kind: K::DEMON | K::EVIL | K::IM_FIRE,
            spells: S::BLINK | S::BOLT, freq_spell: 8,
            blows: [(M::Claw, E::Fire, 1, 6), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "four-headed hydra", glyph: 'M', attr: 3, hdice: 20, hside: 10,
            speed: 100, ac: 50, level: 28, rarity: 2, mexp: 160, max_num: 64,
            flags: F::empty(), kind: K::ANIMAL | K::CAN_SWIM, spells: S::empty(), freq_spell: 0,
            blows: [
                (M::Bite, E::Hurt, 2, 6), (M::Bite, E::Hurt, 2, 6),
                (M::Bite, E::Hurt, 2, 6), (M::Bite, E::Hurt, 2, 6),
            ],
        },
        RaceSpec {
            name: "earth elemental", glyph: 'E', attr: 3, hdice: 30, hside: 10,
            speed: 80, ac: 60, level: 34, rarity: 2, mexp: 200, max_num: 64,
            flags: F::COLD_BLOOD | F::EMPTY_MIND | F::PASS_WALL | F::KILL_WALL,
            kind: K::ELEMENTAL | K::NONLIVING | K::IM_POIS | K::IM_COLD,
            spells: S::empty(), freq_spell: 0,
            blows: [(M::Crush, E::Hurt, 4, 6), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "dread", glyph: 'G', attr: 5, hdice: 12, hside: 10,
            speed: 110, ac: 30, level: 36, rarity: 2, mexp: 150, max_num: 128,
            flags: F::COLD_BLOOD | F::INVISIBLE | F::PASS_WALL | F::WEIRD_MIND,
            kind: K::UNDEAD | K::EVIL | K::IM_COLD | K::IM_POIS,
            spells: S::BLINK, freq_spell: 10,
            blows: [(M::Touch, E::DrainLife, 2, 6), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "young red dragon", glyph: 'd', attr: 1, hdice: 24, hside: 10,
            speed: 100, ac: 55, level: 38, rarity: 1, mexp: 300, max_num: 100,
            flags: F::DROP_GOOD, kind: K::DRAGON | K::EVIL | K::IM_FIRE | K::CAN_FLY,
            spells: S::BALL, freq_spell: 9,
            blows: [(M::Claw, E::Hurt, 2, 8), (M::Bite, E::Fire, 3, 8), NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "vampire", glyph: 'V', attr: 4, hdice: 20, hside: 10,
            speed: 110, ac: 45, level: 40, rarity: 1, mexp: 350, max_num: 100,
            flags: F::COLD_BLOOD | F::DROP_GOOD, kind: K::UNDEAD | K::EVIL | K::IM_COLD | K::IM_POIS,
            spells: S::TELEPORT_TO | S::HEAL, freq_spell: 9,
            blows: [(M::Bite, E::DrainLife, 3, 8), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "angel", glyph: 'A', attr: 7, hdice: 30, hside: 10,
            speed: 110, ac: 60, level: 45, rarity: 3, mexp: 400, max_num: 64,
            flags: F::DROP_GOOD, kind: K::GOOD | K::CAN_FLY,
            spells: S::HEAL | S::HASTE, freq_spell: 6,
            blows: [(M::Hit, E::Hurt, 3, 8), (M::Hit, E::Hurt, 3, 8), NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "lich", glyph: 'L', attr: 5, hdice: 30, hside: 10,
            speed: 110, ac: 60, level: 50, rarity: 2, mexp: 800, max_num: 64,
            flags: F::COLD_BLOOD | F::DROP_GOOD,
            kind: K::UNDEAD | K::EVIL | K::IM_COLD | K::IM_POIS,
            spells: S::S_UNDEAD | S::BOLT | S::BLINK | S::TELEPORT_TO, freq_spell: 4,
            blows: [(M::Touch, E::DrainLife, 3, 8), NO_BLOW, NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "balrog", glyph: 'U', attr: 1, hdice: 50, hside: 10,
            speed: 110, ac: 80, level: 60, rarity: 2, mexp: 3000, max_num: 32,
            flags: F::DROP_GOOD | F::DROP_GREAT,
            kind: K::DEMON | K::EVIL | K::IM_FIRE,
            spells: S::S_DEMON | S::BALL, freq_spell: 4,
            blows: [(M::Hit, E::Fire, 4, 10), (M::Hit, E::Hurt, 4, 10), NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "great wyrm of flame", glyph: 'D', attr: 1, hdice: 60, hside: 10,
            speed: 110, ac: 100, level: 70, rarity: 2, mexp: 6000, max_num: 32,
            flags: F::DROP_GOOD | F::DROP_GREAT | F::FORCE_MAXHP,
            kind: K::DRAGON | K::EVIL | K::IM_FIRE | K::CAN_FLY,
            spells: S::BALL | S::S_HI_DRAGON, freq_spell: 3,
            blows: [(M::Claw, E::Hurt, 4, 10), (M::Bite, E::Fire, 6, 10), NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "dracolich", glyph: 'D', attr: 5, hdice: 60, hside: 10,
            speed: 110, ac: 90, level: 75, rarity: 2, mexp: 8000, max_num: 32,
            flags: F::COLD_BLOOD | F::DROP_GOOD | F::DROP_GREAT,
            kind: K::DRAGON | K::UNDEAD | K::EVIL | K::IM_COLD | K::IM_POIS | K::CAN_FLY,
            spells: S::S_HI_UNDEAD | S::BALL, freq_spell: 3,
            blows: [(M::Claw, E::Hurt, 4, 10), (M::Bite, E::DrainLife, 5, 10), NO_BLOW, NO_BLOW],
        },
        RaceSpec {
            name: "Maeglor, Lord of the Deep", glyph: 'U', attr: 1, hdice: 90, hside: 10,
            speed: 120, ac: 120, level: 98, rarity: 1, mexp: 60000, max_num: 1,
            flags: F::UNIQUE | F::FORCE_DEPTH | F::FORCE_MAXHP | F::DROP_GREAT | F::ESCORT,
            kind: K::DEMON | K::EVIL | K::IM_FIRE,
            spells: S::S_HI_DEMON | S::S_UNIQUE | S::BALL | S::TELEPORT_TO, freq_spell: 2,
            blows: [
                (M::Hit, E::Fire, 6, 10), (M::Hit, E::Fire, 6, 10),
                (M::Crush, E::Hurt, 5, 10), NO_BLOW,
            ],
        },
    ];

    races.extend(specs.into_iter().map(RaceSpec::build));
    races
}

fn builtin_egos() -> Vec<MonsterEgo> {
    vec![
        // Index 0 is "no ego".
        MonsterEgo {
            name: "(none)".into(),
            name_is_suffix: false,
            hp_mult: 100,
            speed_add: 0,
            ac_add: 0,
            level_add: 0,
            blow_mult: 100,
            flags_add: 0,
            spells_add: 0,
            freq_spell: 0,
            glyph_allow: vec![],
            glyph_deny: vec![],
            min_level: 0,
            rarity: 0,
        },
        MonsterEgo {
            name: "Shaman".into(),
            name_is_suffix: false,
            hp_mult: 110,
            speed_add: 0,
            ac_add: 5,
            level_add: 4,
            blow_mult: 100,
            flags_add: 0,
            spells_add: (RaceSpellFlags::BOLT | RaceSpellFlags::HEAL).bits(),
            freq_spell: 6,
            glyph_allow: vec!['o', 'k', 'T', 'P'],
            glyph_deny: vec![],
            min_level: 5,
            rarity: 3,
        },
        MonsterEgo {
            name: "Captain".into(),
            name_is_suffix: false,
            hp_mult: 130,
            speed_add: 5,
            ac_add: 10,
            level_add: 6,
            blow_mult: 120,
            flags_add: RaceFlags::DROP_GOOD.bits(),
            spells_add: 0,
            freq_spell: 0,
            glyph_allow: vec!['o', 'k', 'p', 'T'],
            glyph_deny: vec![],
            min_level: 10,
            rarity: 4,
        },
        MonsterEgo {
            name: "of the Depths".into(),
            name_is_suffix: true,
            hp_mult: 150,
            speed_add: 5,
            ac_add: 10,
            level_add: 10,
            blow_mult: 130,
            flags_add: 0,
            spells_add: RaceSpellFlags::BLINK.bits(),
            freq_spell: 8,
            glyph_allow: vec![],
            glyph_deny: vec!['t'],
            min_level: 30,
            rarity: 6,
        },
    ]
}

fn builtin_vaults() -> Vec<Vault> {
    vec![
        Vault::new(
            "treasure box",
            VaultKind::Lesser,
            &[
                "%%%%%%%%%%",
                "%.......&%",
                "%.######.%",
                "%.#*..*#.%",
                "%.#....#+%",
                "%.######.%",
                "%&.......%",
                "%%%%%%%%%%",
            ],
        ),
        Vault::new(
            "twin gates",
            VaultKind::Lesser,
            &[
                "%%%%%%%%%%%%",
                "%..........%",
                "%.#######..%",
                "%.#1...9#..%",
                "%.#..&..+..%",
                "%.#9...1#..%",
                "%.#######..%",
                "%..........%",
                "%%%%%%%%%%%%",
            ],
        ),
        Vault::new(
            "monk cell",
            VaultKind::Lesser,
            &[
                "%%%%%",
                "%*.&%",
                "%...+",
                "%%%%%",
            ],
        )
        .with_flags(VaultFlags::HIVES),
        Vault::new(
            "grand cross",
            VaultKind::Greater,
            &[
                "%%%%%%%%%%%%%%%%%%%%%%%",
                "%.....................%",
                "%.XXXXXXXX.+.XXXXXXXX.%",
                "%.X*....&X.#.X&....*X.%",
                "%.X.9....X.#.X....9.X.%",
                "%.XXXX+XXX.#.XXX+XXXX.%",
                "%.....#....@....#.....%",
                "%.XXXX+XXX.#.XXX+XXXX.%",
                "%.X.9....X.#.X....9.X.%",
                "%.X*....&X.#.X&....*X.%",
                "%.XXXXXXXX.+.XXXXXXXX.%",
                "%.....................%",
                "%%%%%%%%%%%%%%%%%%%%%%%",
            ],
        ),
    ]
}

fn percents(bands: &[(u8, usize)]) -> Vec<u8> {
    let mut v = Vec::with_capacity(100);
    for &(rule, count) in bands {
        v.extend(std::iter::repeat(rule).take(count));
    }
    debug_assert_eq!(v.len(), 100);
    v
}

fn builtin_dungeons() -> Vec<DungeonType> {
    vec![
        DungeonType {
            name: "the Underhalls".into(),
            base_depth: 1,
            max_depth: 100,
            flags: crate::types::DungeonFlags::RANDOM.bits(),
            allow_glyphs: String::new(),
            deny_glyphs: String::new(),
            rules: vec![DungeonRule::default()],
            rule_percents: percents(&[(0, 100)]),
        },
        DungeonType {
            name: "the Barrow-downs".into(),
            base_depth: 5,
            max_depth: 40,
            flags: (crate::types::DungeonFlags::RANDOM | crate::types::DungeonFlags::NOMAP).bits(),
            allow_glyphs: String::new(),
            deny_glyphs: "F".into(),
            rules: vec![
                DungeonRule {
                    mode: RuleMode::Or,
                    kind: RaceKindFlags::UNDEAD.bits(),
                    glyphs: ['s', 'W', 'G', '\0', '\0'],
                    ..Default::default()
                },
                DungeonRule::default(),
            ],
            rule_percents: percents(&[(0, 80), (1, 20)]),
        },
        DungeonType {
            name: "the Drowned Deeps".into(),
            base_depth: 10,
            max_depth: 60,
            flags: crate::types::DungeonFlags::RANDOM.bits(),
            allow_glyphs: String::new(),
            deny_glyphs: String::new(),
            rules: vec![
                DungeonRule {
                    mode: RuleMode::Or,
                    kind: (RaceKindFlags::AQUATIC | RaceKindFlags::CAN_SWIM).bits(),
                    ..Default::default()
                },
                DungeonRule::default(),
            ],
            rule_percents: percents(&[(0, 70), (1, 30)]),
        },
    ]
}

fn builtin_shops() -> Vec<ShopKind> {
    [
        "General Store",
        "Armoury",
        "Weapon Smith",
        "Temple",
        "Alchemist",
        "Magic Shop",
        "Black Market",
        "Home",
        "Bookstore",
        "Jeweller",
        "Bank",
        "Tavern",
        "Herbalist",
        "Fighters' Hall",
        "Pawnbroker",
        "Mercenary Guild",
    ]
    .iter()
    .map(|n| ShopKind { name: n.to_string() })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_coherent() {
        let cat = Catalog::builtin();
        assert_eq!(cat.shops.len(), crate::constants::MAX_SHOPS);
        assert!(cat.races.len() > 30);
        assert!(cat.artifact_kinds().count() >= 2);
        for d in &cat.dungeons {
            assert_eq!(d.rule_percents.len(), 100);
            for &idx in &d.rule_percents {
                assert!((idx as usize) < d.rules.len());
            }
        }
        for v in &cat.vaults {
            assert!(v.rows.iter().all(|r| r.len() == v.width() as usize));
        }
    }

    #[test]
    fn stable_race_ids_match_table() {
        let cat = Catalog::builtin();
        assert_eq!(cat.race(race_ids::WHITE_MOUSE).name, "giant white mouse");
        assert_eq!(cat.race(race_ids::MAEGLOR).level, 98);
        assert!(cat.race(race_ids::MAEGLOR).is_unique());
        assert_eq!(cat.race(race_ids::MAEGLOR).max_num, 1);
        assert!(cat.race(race_ids::WHITE_MOUSE).has_flag(RaceFlags::MULTIPLY));
    }

    #[test]
    fn uniques_have_max_num_one() {
        let cat = Catalog::builtin();
        for id in cat.unique_races().collect::<Vec<_>>() {
            assert_eq!(cat.race(id).max_num, 1, "unique {} max_num", cat.race(id).name);
        }
    }

    #[test]
    fn townsfolk_sit_at_level_zero() {
        let cat = Catalog::builtin();
        for r in &cat.races {
            if r.has_flag(RaceFlags::TOWNSFOLK) {
                assert_eq!(r.level, 0);
            }
        }
    }
}
