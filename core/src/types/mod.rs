//! Shared type definitions for world state and the boot-time catalog.

mod dungeon;
mod ego;
pub mod feature;
mod flags;
mod item;
mod pos;
mod race;
pub mod vault;

pub use dungeon::{DungeonRule, DungeonType, RuleMode};
pub use ego::{effective_race, MonsterEgo};
pub use feature::{feat, FeatId, Feature};
pub use flags::{CellFlags, DungeonFlags, LevelFlags, RaceFlags, RaceKindFlags, RaceSpellFlags};
pub use item::{ItemClass, ItemKind, KindId};
pub use pos::WorldPos;
pub use race::{BlowEffect, BlowMethod, MonsterBlow, MonsterRace, RaceId};
pub use vault::{Vault, VaultKind};

/// Index into the live monster pool. Zero means "none".
pub type MonsterId = u16;
/// Index into the live item pool. Zero means "none".
pub type ItemId = u16;
/// Index of a connected player. Zero means "none".
pub type PlayerId = u16;
/// Index into the ego template table. Zero means "no ego".
pub type EgoId = u16;
