//! Bit sets for cells, levels, dungeons and monster races.
//!
//! The owning structs store these as raw integers (the wire and save
//! formats are flat); the `bitflags` types here provide the symbolic names
//! and mask arithmetic.

use bitflags::bitflags;

bitflags! {
    /// Per-cell state bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CellFlags: u16 {
        /// Part of a room interior.
        const ROOM = 0x0001;
        /// Part of a vault; protected from corridors and destruction.
        const ICKY = 0x0002;
        /// Permanently lit.
        const GLOW = 0x0004;
        /// Memorised by at least one player.
        const MARK = 0x0008;
        /// In some player's current field of view.
        const VIEW = 0x0010;
        /// Temporarily lit.
        const LITE = 0x0020;
        /// Player-versus-player combat forbidden here.
        const NOPK = 0x0040;
        /// Protected: no monster placement, no hostile effects.
        const PROT = 0x0080;
    }
}

bitflags! {
    /// Per-level feature flags, rolled at generation time.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct LevelFlags: u16 {
        const NO_TELEPORT  = 0x0001;
        const NO_MAGIC     = 0x0002;
        const NO_GENO      = 0x0004;
        const NOMAP        = 0x0008;
        const NO_MAGIC_MAP = 0x0010;
        const NO_DESTROY   = 0x0020;
        const NO_STAIR     = 0x0040;
        const NO_GHOST     = 0x0080;
    }
}

bitflags! {
    /// Flags on a dungeon handle.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DungeonFlags: u16 {
        /// Floors are freshly generated, not replayed from a template.
        const RANDOM       = 0x0001;
        /// Removal requested; deferred until every floor is released.
        const DELETED      = 0x0002;
        const NOMAP        = 0x0004;
        const NO_MAGIC_MAP = 0x0008;
        /// The handle climbs instead of descending.
        const TOWER        = 0x0010;
    }
}

bitflags! {
    /// General race behaviour bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RaceFlags: u32 {
        /// At most one live instance world-wide.
        const UNIQUE      = 0x0000_0001;
        /// Never generated above its native depth.
        const FORCE_DEPTH = 0x0000_0002;
        /// Only generated exactly at its native depth.
        const ONLY_DEPTH  = 0x0000_0004;
        /// Hit points are maximal rather than rolled.
        const FORCE_MAXHP = 0x0000_0008;
        /// Appears with one companion of the same race.
        const FRIEND      = 0x0000_0010;
        /// Appears in groups of the same race.
        const FRIENDS     = 0x0000_0020;
        /// Appears with an escort of lesser, same-glyph races.
        const ESCORT      = 0x0000_0040;
        /// Breeds explosively into adjacent cells.
        const MULTIPLY    = 0x0000_0080;
        /// Invisible to ordinary sight.
        const INVISIBLE   = 0x0000_0100;
        /// Defeats infravision.
        const COLD_BLOOD  = 0x0000_0200;
        /// Never detected by telepathy.
        const EMPTY_MIND  = 0x0000_0400;
        /// Detected by telepathy only stochastically.
        const WEIRD_MIND  = 0x0000_0800;
        /// Moves through walls.
        const PASS_WALL   = 0x0000_1000;
        /// Tunnels through walls, leaving corridor behind.
        const KILL_WALL   = 0x0000_2000;
        /// Never moves from its cell.
        const NEVER_MOVE  = 0x0000_4000;
        /// Picks up items it steps on.
        const TAKE_ITEM   = 0x0000_8000;
        /// Drops a better-than-average item on death.
        const DROP_GOOD   = 0x0001_0000;
        /// Drops an exceptional item on death.
        const DROP_GREAT  = 0x0002_0000;
        /// Drops gold rather than objects.
        const ONLY_GOLD   = 0x0004_0000;
        /// Town population; purged first under pool pressure.
        const TOWNSFOLK   = 0x0008_0000;
        /// Part of a scripted quest; strongly kept under pool pressure.
        const QUESTOR     = 0x0010_0000;
    }
}

bitflags! {
    /// Race taxonomy and alignment bits, also used by dungeon rules and
    /// telepathy class filters.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RaceKindFlags: u32 {
        const ANIMAL    = 0x0000_0001;
        const ORC       = 0x0000_0002;
        const TROLL     = 0x0000_0004;
        const GIANT     = 0x0000_0008;
        const DRAGON    = 0x0000_0010;
        const DEMON     = 0x0000_0020;
        const UNDEAD    = 0x0000_0040;
        const ELEMENTAL = 0x0000_0080;
        const NONLIVING = 0x0000_0100;
        const EVIL      = 0x0000_0200;
        const GOOD      = 0x0000_0400;
        /// Lives only in deep water.
        const AQUATIC   = 0x0000_0800;
        /// Crosses deep water without being aquatic.
        const CAN_SWIM  = 0x0000_1000;
        /// Crosses chasms and water by flight.
        const CAN_FLY   = 0x0000_2000;
        /// Immune to fire terrain.
        const IM_FIRE   = 0x0000_4000;
        /// Immune to cold.
        const IM_COLD   = 0x0000_8000;
        /// Immune to poison.
        const IM_POIS   = 0x0001_0000;
    }
}

bitflags! {
    /// Spell-casting and summoning affinities.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RaceSpellFlags: u32 {
        const BLINK        = 0x0000_0001;
        const TELEPORT_TO  = 0x0000_0002;
        const BOLT         = 0x0000_0004;
        const BALL         = 0x0000_0008;
        const HEAL         = 0x0000_0010;
        const HASTE        = 0x0000_0020;
        const S_KIN        = 0x0000_0040;
        const S_MONSTER    = 0x0000_0080;
        const S_MONSTERS   = 0x0000_0100;
        const S_ANT        = 0x0000_0200;
        const S_SPIDER     = 0x0000_0400;
        const S_HOUND      = 0x0000_0800;
        const S_HYDRA      = 0x0000_1000;
        const S_ANGEL      = 0x0000_2000;
        const S_DEMON      = 0x0000_4000;
        const S_UNDEAD     = 0x0000_8000;
        const S_DRAGON     = 0x0001_0000;
        const S_HI_UNDEAD  = 0x0002_0000;
        const S_HI_DRAGON  = 0x0004_0000;
        const S_HI_DEMON   = 0x0008_0000;
        const S_UNIQUE     = 0x0010_0000;
    }
}
