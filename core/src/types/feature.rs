//! Terrain features: the id space plus classification predicates.
//!
//! Gameplay code never compares raw feature ids for walkability; it goes
//! through the predicates here (or the cell predicates built on top of
//! them), so the id assignments can stay an implementation detail.

use serde::{Deserialize, Serialize};

/// Terrain feature id, as stored in a cell.
pub type FeatId = u16;

/// The feature id space.
pub mod feat {
    use super::FeatId;

    pub const NONE: FeatId = 0;

    // Open ground.
    pub const FLOOR: FeatId = 1;
    pub const DIRT: FeatId = 2;
    pub const GRASS: FeatId = 3;
    pub const TREE: FeatId = 4;
    pub const PAVEMENT: FeatId = 5;
    pub const SHALLOW_WATER: FeatId = 6;
    pub const DEEP_WATER: FeatId = 7;
    pub const LAVA: FeatId = 8;
    pub const RUBBLE: FeatId = 9;

    // Interactive floor features.
    pub const STAIR_DOWN: FeatId = 16;
    pub const STAIR_UP: FeatId = 17;
    pub const BETWEEN_GATE: FeatId = 18;
    pub const FOUNTAIN: FeatId = 19;
    pub const FOUNTAIN_DRY: FeatId = 20;
    pub const GLYPH_WARDING: FeatId = 21;

    // Doors.
    pub const DOOR_OPEN: FeatId = 32;
    pub const DOOR_BROKEN: FeatId = 33;
    pub const DOOR_CLOSED: FeatId = 34;
    pub const DOOR_LOCKED: FeatId = 35;
    pub const DOOR_SECRET: FeatId = 36;
    pub const SHOP_DOOR: FeatId = 37;
    pub const HOUSE_DOOR: FeatId = 38;

    // Veins.
    pub const MAGMA: FeatId = 48;
    pub const QUARTZ: FeatId = 49;
    pub const MAGMA_TREASURE: FeatId = 50;
    pub const QUARTZ_TREASURE: FeatId = 51;
    pub const MAGMA_HIDDEN: FeatId = 52;
    pub const QUARTZ_HIDDEN: FeatId = 53;

    // Walls. Granite carves; the WALL_* trio carries the room-boundary
    // discipline; PERM_* never changes after generation.
    pub const GRANITE: FeatId = 64;
    pub const WALL_INNER: FeatId = 65;
    pub const WALL_OUTER: FeatId = 66;
    pub const WALL_SOLID: FeatId = 67;
    pub const PERM_INNER: FeatId = 68;
    pub const PERM_OUTER: FeatId = 69;
    pub const PERM_SOLID: FeatId = 70;
    pub const HOUSE_WALL: FeatId = 71;
}

/// Open ground a walking creature can occupy.
pub fn is_floor(f: FeatId) -> bool {
    matches!(
        f,
        feat::FLOOR
            | feat::DIRT
            | feat::GRASS
            | feat::TREE
            | feat::PAVEMENT
            | feat::SHALLOW_WATER
            | feat::STAIR_DOWN
            | feat::STAIR_UP
            | feat::BETWEEN_GATE
            | feat::FOUNTAIN
            | feat::FOUNTAIN_DRY
            | feat::GLYPH_WARDING
    )
}

/// Passable by a walking creature, doors included.
pub fn is_passable(f: FeatId) -> bool {
    is_floor(f) || is_door(f) || f == feat::DEEP_WATER || f == feat::LAVA
}

pub fn is_door(f: FeatId) -> bool {
    matches!(
        f,
        feat::DOOR_OPEN
            | feat::DOOR_BROKEN
            | feat::DOOR_CLOSED
            | feat::DOOR_LOCKED
            | feat::DOOR_SECRET
            | feat::SHOP_DOOR
            | feat::HOUSE_DOOR
    )
}

pub fn is_wall(f: FeatId) -> bool {
    (feat::MAGMA..=feat::HOUSE_WALL).contains(&f)
}

/// Walls that survive everything: level edges, vault shells, shop fronts.
pub fn is_permanent(f: FeatId) -> bool {
    matches!(
        f,
        feat::PERM_INNER | feat::PERM_OUTER | feat::PERM_SOLID | feat::HOUSE_WALL
    )
}

/// Blocks line of sight.
pub fn blocks_los(f: FeatId) -> bool {
    is_wall(f) || f == feat::TREE || matches!(f, feat::DOOR_CLOSED | feat::DOOR_LOCKED | feat::DOOR_SECRET)
}

/// Cells a stair, item or monster may never be written onto.
pub fn is_protected(f: FeatId) -> bool {
    matches!(
        f,
        feat::GLYPH_WARDING | feat::STAIR_DOWN | feat::STAIR_UP | feat::BETWEEN_GATE | feat::SHOP_DOOR
    )
}

/// Vein cells that upgrade when dug out.
pub fn hides_treasure(f: FeatId) -> bool {
    matches!(f, feat::MAGMA_HIDDEN | feat::QUARTZ_HIDDEN)
}

/// Features that are lit on their own (shop fronts, lava).
pub fn self_lit(f: FeatId) -> bool {
    matches!(f, feat::SHOP_DOOR | feat::LAVA)
}

/// Catalog entry describing a feature for the data-file collaborator and
/// the client presentation layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatId,
    pub name: String,
    pub glyph: char,
    pub attr: u8,
}

impl Feature {
    pub fn new(id: FeatId, name: &str, glyph: char, attr: u8) -> Self {
        Feature { id, name: name.to_string(), glyph, attr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_and_wall_are_disjoint() {
        for f in 0..=feat::HOUSE_WALL {
            assert!(
                !(is_floor(f) && is_wall(f)),
                "feature {} is both floor and wall",
                f
            );
        }
    }

    #[test]
    fn doors_are_passable_but_not_floor() {
        assert!(is_passable(feat::DOOR_CLOSED));
        assert!(!is_floor(feat::DOOR_CLOSED));
        assert!(blocks_los(feat::DOOR_SECRET));
        assert!(!blocks_los(feat::DOOR_OPEN));
    }

    #[test]
    fn permanent_walls_are_walls() {
        assert!(is_wall(feat::PERM_SOLID));
        assert!(is_permanent(feat::PERM_SOLID));
        assert!(!is_permanent(feat::GRANITE));
    }
}
