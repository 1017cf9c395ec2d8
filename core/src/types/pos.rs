//! World coordinates.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A floor's identity in the world.
///
/// `(wx, wy)` names a tile of the fixed overworld grid; `wz == 0` is the
/// surface of that tile, `wz > 0` counts tower floors upward and `wz < 0`
/// dungeon floors downward.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode, Serialize,
    Deserialize,
)]
pub struct WorldPos {
    pub wx: i16,
    pub wy: i16,
    pub wz: i16,
}

impl WorldPos {
    pub const fn new(wx: i16, wy: i16, wz: i16) -> Self {
        WorldPos { wx, wy, wz }
    }

    /// The surface of the tile this position belongs to.
    pub const fn surface(self) -> Self {
        WorldPos { wx: self.wx, wy: self.wy, wz: 0 }
    }

    pub const fn is_surface(self) -> bool {
        self.wz == 0
    }

    pub const fn is_dungeon(self) -> bool {
        self.wz < 0
    }

    pub const fn is_tower(self) -> bool {
        self.wz > 0
    }

    /// Floors above or below the surface, unsigned.
    pub const fn floor(self) -> i32 {
        self.wz.unsigned_abs() as i32
    }

    /// Two positions share an area iff they share an overworld tile,
    /// regardless of `wz`. Party visibility and monster-reach queries use
    /// this, not equality.
    pub fn same_area(self, other: WorldPos) -> bool {
        self.wx == other.wx && self.wy == other.wy
    }

    /// One step toward the surface, for stair traversal.
    pub fn toward_surface(self) -> Self {
        WorldPos {
            wx: self.wx,
            wy: self.wy,
            wz: self.wz - self.wz.signum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_area_ignores_depth() {
        let a = WorldPos::new(3, 4, 0);
        let b = WorldPos::new(3, 4, -17);
        let c = WorldPos::new(3, 5, 0);
        assert!(a.same_area(b));
        assert!(!a.same_area(c));
    }

    #[test]
    fn toward_surface_steps_both_ways() {
        assert_eq!(WorldPos::new(0, 0, -3).toward_surface().wz, -2);
        assert_eq!(WorldPos::new(0, 0, 5).toward_surface().wz, 4);
        assert_eq!(WorldPos::new(0, 0, 0).toward_surface().wz, 0);
    }
}
