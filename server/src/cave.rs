//! The cell grid: one fixed record per square plus a sparse overlay list.
//!
//! The fixed record keeps the hot paths (field of view, pathing) compact;
//! everything rare — shop indices, gate partners, fountain stock, door
//! owners — lives in the overlay map and costs nothing on cells that don't
//! carry it.

use std::collections::HashMap;

use bincode::{Decode, Encode};
use deephold_core::types::{feat, feature, CellFlags, FeatId, ItemId, KindId, MonsterId};

/// Fixed per-cell record.
#[derive(Clone, Copy, Debug, Default, Encode, Decode)]
pub struct Cell {
    pub feat: FeatId,
    /// Raw `CellFlags`.
    pub flags: u16,
    /// Monster standing here; 0 for none.
    pub m_idx: MonsterId,
    /// Head of the item pile here; 0 for none.
    pub o_idx: ItemId,
}

impl Cell {
    pub fn has(&self, f: CellFlags) -> bool {
        self.flags & f.bits() != 0
    }

    pub fn set(&mut self, f: CellFlags) {
        self.flags |= f.bits();
    }

    pub fn clear(&mut self, f: CellFlags) {
        self.flags &= !f.bits();
    }
}

/// Trap kinds stored in trap overlays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub enum TrapKind {
    Pit,
    Dart,
    PoisonGas,
    TeleportAway,
    Summon,
    Alarm,
}

/// Rich per-cell state. One variant per overlay kind; a cell holds at most
/// one overlay of each kind.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Overlay {
    /// Shop entrance; the index keys the client's store UI.
    Shop { index: u8 },
    /// Door of a player-ownable house.
    HouseDoor { owner_key: u32 },
    /// One endpoint of a between-gate; stepping here teleports to the
    /// partner cell, whose own overlay points back.
    Between { to_x: i32, to_y: i32 },
    /// Fountain stock: the bottled kind and how many draughts remain.
    Fountain { kind: KindId, uses: u8 },
    Trap { kind: TrapKind, found: bool },
    /// A vein cell whose treasure only shows once dug.
    HiddenTreasure,
}

/// Discriminant for overlay lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayKind {
    Shop,
    HouseDoor,
    Between,
    Fountain,
    Trap,
    HiddenTreasure,
}

impl Overlay {
    pub fn kind(&self) -> OverlayKind {
        match self {
            Overlay::Shop { .. } => OverlayKind::Shop,
            Overlay::HouseDoor { .. } => OverlayKind::HouseDoor,
            Overlay::Between { .. } => OverlayKind::Between,
            Overlay::Fountain { .. } => OverlayKind::Fountain,
            Overlay::Trap { .. } => OverlayKind::Trap,
            Overlay::HiddenTreasure => OverlayKind::HiddenTreasure,
        }
    }
}

/// A floor's live grid.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    cells: Vec<Cell>,
    overlays: HashMap<u32, Vec<Overlay>>,
    /// Cells whose appearance changed since the last observation flush.
    pub dirty: Vec<(i32, i32)>,
}

impl Grid {
    /// A grid of permanent solid rock; the generator carves from there.
    pub fn solid(width: i32, height: i32) -> Grid {
        let cell = Cell { feat: feat::PERM_SOLID, flags: 0, m_idx: 0, o_idx: 0 };
        Grid {
            width,
            height,
            cells: vec![cell; (width * height) as usize],
            overlays: HashMap::new(),
            dirty: Vec::new(),
        }
    }

    #[inline]
    fn idx(&self, x: i32, y: i32) -> usize {
        debug_assert!(self.in_bounds(x, y));
        (y * self.width + x) as usize
    }

    #[inline]
    fn key(&self, x: i32, y: i32) -> u32 {
        (y * self.width + x) as u32
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    /// In bounds and not on the boundary ring.
    pub fn in_bounds_fully(&self, x: i32, y: i32) -> bool {
        x >= 1 && y >= 1 && x < self.width - 1 && y < self.height - 1
    }

    pub fn cell(&self, x: i32, y: i32) -> &Cell {
        &self.cells[self.idx(x, y)]
    }

    pub fn cell_mut(&mut self, x: i32, y: i32) -> &mut Cell {
        let i = self.idx(x, y);
        &mut self.cells[i]
    }

    pub fn feat(&self, x: i32, y: i32) -> FeatId {
        self.cell(x, y).feat
    }

    /// Replace a cell's terrain. Recomputes derived flags and queues a
    /// visual-dirty event for every watcher.
    pub fn set_feature(&mut self, x: i32, y: i32, f: FeatId) {
        let i = self.idx(x, y);
        let cell = &mut self.cells[i];
        if cell.feat == f {
            return;
        }
        cell.feat = f;
        if feature::self_lit(f) {
            cell.set(CellFlags::GLOW);
        }
        if feature::is_protected(f) {
            cell.set(CellFlags::PROT);
        } else {
            cell.clear(CellFlags::PROT);
        }
        self.dirty.push((x, y));
    }

    // -------------------------------------------------------------------
    // Overlays
    // -------------------------------------------------------------------

    pub fn add_overlay(&mut self, x: i32, y: i32, overlay: Overlay) {
        let key = self.key(x, y);
        let list = self.overlays.entry(key).or_default();
        // At most one overlay of each kind per cell.
        list.retain(|o| o.kind() != overlay.kind());
        list.push(overlay);
    }

    pub fn get_overlay(&self, x: i32, y: i32, kind: OverlayKind) -> Option<&Overlay> {
        self.overlays
            .get(&self.key(x, y))?
            .iter()
            .find(|o| o.kind() == kind)
    }

    pub fn get_overlay_mut(&mut self, x: i32, y: i32, kind: OverlayKind) -> Option<&mut Overlay> {
        let key = self.key(x, y);
        self.overlays
            .get_mut(&key)?
            .iter_mut()
            .find(|o| o.kind() == kind)
    }

    pub fn remove_overlay(&mut self, x: i32, y: i32, kind: OverlayKind) -> Option<Overlay> {
        let key = self.key(x, y);
        let list = self.overlays.get_mut(&key)?;
        let pos = list.iter().position(|o| o.kind() == kind)?;
        let removed = list.remove(pos);
        if list.is_empty() {
            self.overlays.remove(&key);
        }
        Some(removed)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.values().map(|v| v.len()).sum()
    }

    /// Flat cell storage, for the save layer.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Overlay entries as `(packed coordinate, list)` pairs, sorted for a
    /// stable save image.
    pub fn overlay_entries(&self) -> Vec<(u32, Vec<Overlay>)> {
        let mut entries: Vec<(u32, Vec<Overlay>)> = self
            .overlays
            .iter()
            .map(|(&k, v)| (k, v.clone()))
            .collect();
        entries.sort_by_key(|&(k, _)| k);
        entries
    }

    /// Rebuild a grid from its save image.
    pub fn from_parts(
        width: i32,
        height: i32,
        cells: Vec<Cell>,
        overlays: Vec<(u32, Vec<Overlay>)>,
    ) -> Grid {
        debug_assert_eq!(cells.len(), (width * height) as usize);
        Grid {
            width,
            height,
            cells,
            overlays: overlays.into_iter().collect(),
            dirty: Vec::new(),
        }
    }

    // -------------------------------------------------------------------
    // Predicates. Placement and generation code calls these, never raw
    // feature ids.
    // -------------------------------------------------------------------

    /// Open ground, whatever may be standing or lying on it.
    pub fn cell_floor(&self, x: i32, y: i32) -> bool {
        feature::is_floor(self.feat(x, y))
    }

    /// Open ground with no monster on it: a legal movement target.
    pub fn cell_empty(&self, x: i32, y: i32) -> bool {
        let c = self.cell(x, y);
        feature::is_floor(c.feat) && c.m_idx == 0
    }

    /// Pristine floor: no monster, no items, no overlay state, no
    /// protection. The only ground generators may freely write on.
    pub fn cell_naked(&self, x: i32, y: i32) -> bool {
        let c = self.cell(x, y);
        feature::is_floor(c.feat)
            && c.m_idx == 0
            && c.o_idx == 0
            && !c.has(CellFlags::PROT)
            && !self.overlays.contains_key(&self.key(x, y))
    }

    /// Legal monster spawn target: empty, unprotected, not a warded or
    /// otherwise reserved feature.
    pub fn cell_spawnable(&self, x: i32, y: i32) -> bool {
        let c = self.cell(x, y);
        self.cell_empty(x, y)
            && !c.has(CellFlags::PROT)
            && !feature::is_protected(c.feat)
    }

    pub fn count_floor(&self) -> usize {
        self.cells.iter().filter(|c| feature::is_floor(c.feat)).count()
    }

    /// Walls among the 4-neighbours, for "near a wall" placements.
    pub fn next_to_walls(&self, x: i32, y: i32) -> i32 {
        let mut k = 0;
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            if self.in_bounds(x + dx, y + dy) && feature::is_wall(self.feat(x + dx, y + dy)) {
                k += 1;
            }
        }
        k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_grid_starts_as_rock() {
        let g = Grid::solid(10, 8);
        assert_eq!(g.feat(0, 0), feat::PERM_SOLID);
        assert_eq!(g.feat(9, 7), feat::PERM_SOLID);
        assert!(!g.cell_floor(4, 4));
        assert_eq!(g.count_floor(), 0);
    }

    #[test]
    fn set_feature_marks_dirty_and_derives_flags() {
        let mut g = Grid::solid(10, 8);
        g.set_feature(3, 3, feat::FLOOR);
        g.set_feature(4, 3, feat::SHOP_DOOR);
        assert_eq!(g.dirty, vec![(3, 3), (4, 3)]);
        assert!(g.cell(4, 3).has(CellFlags::GLOW));
        assert!(g.cell(4, 3).has(CellFlags::PROT));
        // Re-setting the same feature is not a change.
        g.dirty.clear();
        g.set_feature(3, 3, feat::FLOOR);
        assert!(g.dirty.is_empty());
    }

    #[test]
    fn overlays_round_trip() {
        let mut g = Grid::solid(10, 8);
        g.set_feature(2, 2, feat::BETWEEN_GATE);
        g.add_overlay(2, 2, Overlay::Between { to_x: 7, to_y: 5 });
        assert_eq!(
            g.get_overlay(2, 2, OverlayKind::Between),
            Some(&Overlay::Between { to_x: 7, to_y: 5 })
        );
        // Replacing the same kind does not stack.
        g.add_overlay(2, 2, Overlay::Between { to_x: 1, to_y: 1 });
        assert_eq!(g.overlay_count(), 1);
        assert!(g.remove_overlay(2, 2, OverlayKind::Between).is_some());
        assert_eq!(g.get_overlay(2, 2, OverlayKind::Between), None);
        assert_eq!(g.overlay_count(), 0);
    }

    #[test]
    fn predicates_compose_feature_and_links() {
        let mut g = Grid::solid(10, 8);
        g.set_feature(5, 5, feat::FLOOR);
        assert!(g.cell_floor(5, 5));
        assert!(g.cell_empty(5, 5));
        assert!(g.cell_naked(5, 5));

        g.cell_mut(5, 5).m_idx = 3;
        assert!(!g.cell_empty(5, 5));
        assert!(!g.cell_naked(5, 5));
        g.cell_mut(5, 5).m_idx = 0;

        g.add_overlay(5, 5, Overlay::Trap { kind: TrapKind::Pit, found: false });
        assert!(g.cell_empty(5, 5));
        assert!(!g.cell_naked(5, 5));
    }

    #[test]
    fn spawnable_refuses_protected_ground() {
        let mut g = Grid::solid(10, 8);
        g.set_feature(5, 5, feat::GLYPH_WARDING);
        assert!(g.cell_floor(5, 5));
        assert!(!g.cell_spawnable(5, 5));
        g.set_feature(6, 5, feat::STAIR_UP);
        assert!(!g.cell_spawnable(6, 5));
    }
}
