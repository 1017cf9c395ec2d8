//! Hand-authored room templates.
//!
//! A vault is an ASCII picture: every non-space glyph is an instruction to
//! the builder (walls, floor, treasure and trap rolls, monsters at fixed
//! out-of-depth offsets, numbered between-gate twins). The picture may be
//! mirrored and rotated unless flagged otherwise.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultKind {
    Lesser,
    Greater,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct VaultFlags: u8 {
        const NO_MIRROR = 0x01;
        const NO_ROTATE = 0x02;
        /// The builder recursively tries to place another copy adjacent.
        const HIVES     = 0x04;
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vault {
    pub name: String,
    pub kind: VaultKind,
    /// The picture, row-major. All rows share one length.
    pub rows: Vec<String>,
    /// Raw `VaultFlags`.
    pub flags: u8,
    /// Sampling weight divisor.
    pub rarity: u8,
}

impl Vault {
    pub fn new(name: &str, kind: VaultKind, rows: &[&str]) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].len() == w[1].len()));
        Vault {
            name: name.to_string(),
            kind,
            rows: rows.iter().map(|r| r.to_string()).collect(),
            flags: 0,
            rarity: 1,
        }
    }

    pub fn with_flags(mut self, flags: VaultFlags) -> Self {
        self.flags = flags.bits();
        self
    }

    pub fn height(&self) -> i32 {
        self.rows.len() as i32
    }

    pub fn width(&self) -> i32 {
        self.rows.first().map_or(0, |r| r.len() as i32)
    }

    pub fn may_mirror(&self) -> bool {
        self.flags & VaultFlags::NO_MIRROR.bits() == 0
    }

    pub fn may_rotate(&self) -> bool {
        self.flags & VaultFlags::NO_ROTATE.bits() == 0
    }

    pub fn is_hive(&self) -> bool {
        self.flags & VaultFlags::HIVES.bits() != 0
    }

    pub fn glyph_at(&self, y: i32, x: i32) -> char {
        self.rows[y as usize].as_bytes()[x as usize] as char
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_come_from_rows() {
        let v = Vault::new("box", VaultKind::Lesser, &["%%%", "%.%", "%%%"]);
        assert_eq!(v.width(), 3);
        assert_eq!(v.height(), 3);
        assert_eq!(v.glyph_at(1, 1), '.');
    }

    #[test]
    fn flags_gate_transforms() {
        let v = Vault::new("rigid", VaultKind::Greater, &["%"])
            .with_flags(VaultFlags::NO_MIRROR | VaultFlags::NO_ROTATE);
        assert!(!v.may_mirror());
        assert!(!v.may_rotate());
        assert!(!v.is_hive());
    }
}
