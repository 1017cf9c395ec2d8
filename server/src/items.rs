//! Live item instances: floor piles, monster-held lists, inventories.
//!
//! Items on a cell form a singly linked stack rooted at the cell's
//! `o_idx`; items carried by a monster form the same kind of list rooted
//! at the monster. An item is in exactly one of four places: a cell pile,
//! a monster's hold list, a player inventory, or nowhere (being moved).

use deephold_core::types::{ItemId, KindId, MonsterId, PlayerId, WorldPos};
use log::{debug, info};

use crate::pool::PoolSlot;
use crate::world::World;

#[derive(Clone, Debug, Default, bincode::Encode, bincode::Decode)]
pub struct Item {
    /// Kind index; 0 marks a dead slot.
    pub k_idx: KindId,
    pub wpos: WorldPos,
    pub x: i32,
    pub y: i32,
    /// Stack count for stackable kinds.
    pub number: u8,
    /// Kind-dependent payload: gold amount, charges, enchantment.
    pub pval: i32,
    /// Next item in this cell pile or hold list; 0 terminates.
    pub next_o_idx: ItemId,
    /// Monster carrying this item; 0 for none.
    pub held_m_idx: MonsterId,
    /// Player who first identified this item; 0 for none.
    pub discoverer: PlayerId,
    /// Identification bits.
    pub ident: u8,
    /// Tick of creation, for the lifetime sweep.
    pub created_at: i64,
}

impl PoolSlot for Item {
    fn is_alive(&self) -> bool {
        self.k_idx != 0
    }
}

impl Item {
    pub fn of_kind(k_idx: KindId, created_at: i64) -> Item {
        Item {
            k_idx,
            number: 1,
            created_at,
            ..Item::default()
        }
    }
}

/// Allocate an item slot, compacting under pressure. `None` means the pool
/// is genuinely full even after compaction.
pub fn item_alloc(world: &mut World, item: Item) -> Option<ItemId> {
    if world.items.over_high_water() && !world.compacting {
        compact_items(world);
    }
    let artifact = world.catalog.kind(item.k_idx).artifact;
    let k_idx = item.k_idx;
    let id = world.items.alloc(item)?;
    if artifact {
        world.generated_artifacts.insert(k_idx);
    }
    Some(id)
}

/// Put an item onto a floor cell, stacking onto the existing pile.
pub fn floor_carry(world: &mut World, wpos: WorldPos, x: i32, y: i32, mut item: Item) -> Option<ItemId> {
    item.wpos = wpos;
    item.x = x;
    item.y = y;
    item.held_m_idx = 0;

    // Merge into an existing stack of the same kind when allowed.
    let kind_stackable = world.catalog.kind(item.k_idx).stackable;
    if kind_stackable {
        let head = world.levels.grid(wpos)?.cell(x, y).o_idx;
        let mut cursor = head;
        while cursor != 0 {
            let existing = world.items.get(cursor)?;
            if existing.k_idx == item.k_idx {
                let number = item.number;
                let pval = item.pval;
                let slot = world.items.get_mut(cursor).unwrap();
                slot.number = slot.number.saturating_add(number);
                slot.pval += pval;
                return Some(cursor);
            }
            cursor = existing.next_o_idx;
        }
    }

    let id = item_alloc(world, item)?;
    let grid = world.levels.grid_mut(wpos)?;
    let head = grid.cell(x, y).o_idx;
    world.items.get_mut(id).unwrap().next_o_idx = head;
    grid.cell_mut(x, y).o_idx = id;
    grid.dirty.push((x, y));
    Some(id)
}

/// Unlink an item from whatever pile or hold list contains it.
fn excise_item(world: &mut World, id: ItemId) {
    let Some(item) = world.items.get(id) else { return };
    let (wpos, x, y, held, next) = (item.wpos, item.x, item.y, item.held_m_idx, item.next_o_idx);

    if held != 0 {
        if let Some(m) = world.monsters.get_mut(held) {
            if m.hold_o_idx == id {
                m.hold_o_idx = next;
            } else {
                let mut cursor = m.hold_o_idx;
                while cursor != 0 {
                    let cur_next = world.items.get(cursor).map_or(0, |i| i.next_o_idx);
                    if cur_next == id {
                        world.items.get_mut(cursor).unwrap().next_o_idx = next;
                        break;
                    }
                    cursor = cur_next;
                }
            }
        }
        return;
    }

    if let Some(grid) = world.levels.grid_mut(wpos) {
        if grid.in_bounds(x, y) {
            if grid.cell(x, y).o_idx == id {
                grid.cell_mut(x, y).o_idx = next;
                grid.dirty.push((x, y));
                return;
            }
            let mut cursor = grid.cell(x, y).o_idx;
            while cursor != 0 {
                let cur_next = world.items.get(cursor).map_or(0, |i| i.next_o_idx);
                if cur_next == id {
                    world.items.get_mut(cursor).unwrap().next_o_idx = next;
                    return;
                }
                cursor = cur_next;
            }
        }
    }
}

/// Destroy an item. `preserve` applies the artifact-preservation rule:
/// true artifacts go back into the unfound pool unless the anti-hoard
/// option says otherwise.
pub fn delete_item(world: &mut World, id: ItemId, preserve: bool) {
    let Some(item) = world.items.get(id) else { return };
    let k_idx = item.k_idx;
    excise_item(world, id);
    let kind = world.catalog.kind(k_idx);
    if kind.artifact {
        if preserve && !world.cfg.anti_arts_hoard {
            world.generated_artifacts.remove(&k_idx);
            info!("Artifact '{}' preserved for regeneration", kind.name);
        } else {
            info!("Artifact '{}' destroyed", kind.name);
        }
    }
    world.items.release(id);
}

/// Pick up the top of the pile under a player. Returns false with no state
/// change when there is nothing to take.
pub fn player_pickup(world: &mut World, pid: PlayerId) -> bool {
    let Some(p) = world.players.get(pid) else { return false };
    let (wpos, x, y) = (p.wpos, p.x, p.y);
    let Some(grid) = world.levels.grid(wpos) else { return false };
    let id = grid.cell(x, y).o_idx;
    if id == 0 {
        return false;
    }

    let (k_idx, pval) = {
        let item = world.items.get(id).unwrap();
        (item.k_idx, item.pval)
    };
    let kind = world.catalog.kind(k_idx).clone();

    excise_item(world, id);

    if matches!(kind.class, deephold_core::types::ItemClass::Gold) {
        // Gold goes straight to the purse and the slot dies.
        world.items.release(id);
        let p = world.players.get_mut(pid).unwrap();
        p.gold += pval.max(1);
        let gold = p.gold;
        p.observe(crate::net::Observation::Gold { amount: gold });
        p.message(format!("You collect {} gold pieces.", pval.max(1)));
    } else {
        let item = world.items.get_mut(id).unwrap();
        item.next_o_idx = 0;
        item.wpos = WorldPos::default();
        // Negative coordinates mark "in an inventory, not on any floor".
        item.x = -1;
        item.y = -1;
        let p = world.players.get_mut(pid).unwrap();
        if item.discoverer == 0 {
            item.discoverer = pid;
        }
        p.inventory.push(id);
        p.message(format!("You have {}.", kind.name));
    }
    true
}

/// Drop an inventory item at the player's feet.
pub fn player_drop(world: &mut World, pid: PlayerId, id: ItemId) -> bool {
    let Some(p) = world.players.get_mut(pid) else { return false };
    let Some(slot) = p.inventory.iter().position(|&i| i == id) else {
        return false;
    };
    p.inventory.remove(slot);
    let (wpos, x, y) = (p.wpos, p.x, p.y);

    let tick = world.tick;
    if let Some(item) = world.items.get_mut(id) {
        item.created_at = tick;
        item.wpos = wpos;
        item.x = x;
        item.y = y;
    }
    // Relink onto the floor pile.
    if let Some(grid) = world.levels.grid_mut(wpos) {
        let head = grid.cell(x, y).o_idx;
        world.items.get_mut(id).unwrap().next_o_idx = head;
        grid.cell_mut(x, y).o_idx = id;
        grid.dirty.push((x, y));
        true
    } else {
        false
    }
}

/// Attach an item to a monster's hold list.
pub fn monster_carry(world: &mut World, m_idx: MonsterId, mut item: Item) -> Option<ItemId> {
    item.held_m_idx = m_idx;
    item.wpos = WorldPos::default();
    let id = item_alloc(world, item)?;
    let m = world.monsters.get_mut(m_idx)?;
    let head = m.hold_o_idx;
    m.hold_o_idx = id;
    world.items.get_mut(id).unwrap().next_o_idx = head;
    Some(id)
}

/// A scavenging monster lifts the top of the pile it is standing on.
pub fn monster_take_floor_item(world: &mut World, m_idx: MonsterId) -> bool {
    let Some(m) = world.monsters.get(m_idx) else { return false };
    let (wpos, x, y) = (m.wpos, m.x, m.y);
    let id = match world.levels.grid(wpos) {
        Some(grid) => grid.cell(x, y).o_idx,
        None => return false,
    };
    if id == 0 {
        return false;
    }
    excise_item(world, id);
    let head = world.monsters.get(m_idx).map_or(0, |m| m.hold_o_idx);
    if let Some(item) = world.items.get_mut(id) {
        item.held_m_idx = m_idx;
        item.next_o_idx = head;
        item.x = -1;
        item.y = -1;
    }
    if let Some(m) = world.monsters.get_mut(m_idx) {
        m.hold_o_idx = id;
    }
    true
}

/// Drop a dead monster's carried items where it stood.
pub fn monster_drop_carried(world: &mut World, m_idx: MonsterId) {
    let Some(m) = world.monsters.get(m_idx) else { return };
    let (wpos, x, y) = (m.wpos, m.x, m.y);
    let mut cursor = m.hold_o_idx;
    world.monsters.get_mut(m_idx).unwrap().hold_o_idx = 0;

    while cursor != 0 {
        let next = world.items.get(cursor).map_or(0, |i| i.next_o_idx);
        if let Some(item) = world.items.get_mut(cursor) {
            item.held_m_idx = 0;
            item.next_o_idx = 0;
            item.wpos = wpos;
            item.x = x;
            item.y = y;
        }
        // Relink onto the floor pile by hand to keep the same slot.
        if let Some(grid) = world.levels.grid_mut(wpos) {
            let head = grid.cell(x, y).o_idx;
            world.items.get_mut(cursor).unwrap().next_o_idx = head;
            grid.cell_mut(x, y).o_idx = cursor;
        }
        cursor = next;
    }
}

/// Delete items whose floor lifetime has elapsed, preserving artifacts.
pub fn sweep_item_lifetimes(world: &mut World, wpos: WorldPos) {
    let surface = wpos.is_surface();
    let now = world.tick;
    let mut doomed = Vec::new();
    for (id, item) in world.items.iter_alive() {
        if item.wpos != wpos || item.held_m_idx != 0 {
            continue;
        }
        let artifact = world.catalog.kind(item.k_idx).artifact;
        let lifetime = world.cfg.item_lifetime_ticks(surface, artifact);
        if now - item.created_at > lifetime {
            doomed.push(id);
        }
    }
    for id in doomed {
        debug!("Item {} rotted away on {:?}", id, wpos);
        delete_item(world, id, true);
    }
}

/// Compact the item pool: pick victims by distance from players, kind
/// level versus floor depth, and artifact bias, then squeeze live entries
/// down and patch every back-reference.
pub fn compact_items(world: &mut World) {
    debug_assert!(!world.compacting);
    world.compacting = true;

    let target = world.items.capacity() / 8;
    let mut scored: Vec<(i32, ItemId)> = Vec::new();
    for (id, item) in world.items.iter_alive() {
        // Inventory items are untouchable.
        if item.held_m_idx == 0 && item.x < 0 {
            continue;
        }
        let kind = world.catalog.kind(item.k_idx);
        if kind.artifact {
            continue;
        }
        let mut score = 0;
        let near = world
            .players
            .iter()
            .filter(|p| p.wpos == item.wpos)
            .map(|p| (p.x - item.x).abs() + (p.y - item.y).abs())
            .min();
        score += near.unwrap_or(1000);
        score -= kind.level * 2;
        score -= kind.cost / 100;
        scored.push((score, id));
    }
    scored.sort_unstable_by_key(|&(score, _)| std::cmp::Reverse(score));

    let victims: Vec<ItemId> = scored.iter().take(target).map(|&(_, id)| id).collect();
    let count = victims.len();
    for id in victims {
        delete_item(world, id, true);
    }

    // Squeeze survivors downward and patch references.
    for id in world.items.alive_ids().into_iter().rev() {
        if let Some((from, to)) = world.items.relocate_down(id) {
            remap_item_refs(world, from, to);
        }
    }

    world.compacting = false;
    info!("Item compaction removed {} items", count);
}

fn remap_item_refs(world: &mut World, from: ItemId, to: ItemId) {
    let (wpos, x, y, held) = {
        let item = world.items.get(to).unwrap();
        (item.wpos, item.x, item.y, item.held_m_idx)
    };

    if held != 0 {
        if let Some(m) = world.monsters.get_mut(held) {
            if m.hold_o_idx == from {
                m.hold_o_idx = to;
            }
        }
    } else if let Some(grid) = world.levels.grid_mut(wpos) {
        if grid.in_bounds(x, y) && grid.cell(x, y).o_idx == from {
            grid.cell_mut(x, y).o_idx = to;
        }
    }

    // Predecessors in any linked pile.
    for id in world.items.alive_ids() {
        if world.items.get(id).map_or(false, |i| i.next_o_idx == from) {
            world.items.get_mut(id).unwrap().next_o_idx = to;
        }
    }

    for p in world.players.iter_mut() {
        for slot in p.inventory.iter_mut() {
            if *slot == from {
                *slot = to;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deephold_core::catalog::kind_ids;

    use crate::levels;
    use crate::world::World;
    use deephold_core::catalog::Catalog;

    fn world_with_level() -> (World, WorldPos) {
        let mut world = World::new(crate::config::Config::default(), Catalog::builtin(), 99);
        let wpos = WorldPos::new(2, 2, 0);
        levels::install_blank_level(&mut world, wpos, 20, 20);
        (world, wpos)
    }

    #[test]
    fn floor_piles_link_and_unlink() {
        let (mut world, wpos) = world_with_level();
        let a = floor_carry(&mut world, wpos, 5, 5, Item::of_kind(kind_ids::DAGGER, 0)).unwrap();
        let b = floor_carry(&mut world, wpos, 5, 5, Item::of_kind(kind_ids::LONG_SWORD, 0)).unwrap();
        let head = world.levels.grid(wpos).unwrap().cell(5, 5).o_idx;
        assert_eq!(head, b);
        assert_eq!(world.items.get(b).unwrap().next_o_idx, a);

        delete_item(&mut world, b, false);
        let head = world.levels.grid(wpos).unwrap().cell(5, 5).o_idx;
        assert_eq!(head, a);
        assert_eq!(world.items.alive(), 1);
    }

    #[test]
    fn stackables_merge_instead_of_linking() {
        let (mut world, wpos) = world_with_level();
        let mut gold = Item::of_kind(kind_ids::GOLD, 0);
        gold.pval = 30;
        let a = floor_carry(&mut world, wpos, 4, 4, gold.clone()).unwrap();
        let b = floor_carry(&mut world, wpos, 4, 4, gold).unwrap();
        assert_eq!(a, b);
        assert_eq!(world.items.get(a).unwrap().pval, 60);
        assert_eq!(world.items.alive(), 1);
    }

    #[test]
    fn artifact_delete_respects_preserve_flag() {
        let (mut world, wpos) = world_with_level();
        let id = floor_carry(&mut world, wpos, 3, 3, Item::of_kind(kind_ids::ART_DAWNBLADE, 0)).unwrap();
        assert!(world.generated_artifacts.contains(&kind_ids::ART_DAWNBLADE));
        delete_item(&mut world, id, true);
        // Preserved: may generate again.
        assert!(!world.generated_artifacts.contains(&kind_ids::ART_DAWNBLADE));

        let id = floor_carry(&mut world, wpos, 3, 3, Item::of_kind(kind_ids::ART_DAWNBLADE, 0)).unwrap();
        world.cfg.anti_arts_hoard = true;
        delete_item(&mut world, id, true);
        // Hoard rule: gone for good.
        assert!(world.generated_artifacts.contains(&kind_ids::ART_DAWNBLADE));
    }

    #[test]
    fn lifetime_sweep_spares_young_and_artifacts() {
        let (mut world, wpos) = world_with_level();
        let old = world.cfg.item_lifetime_ticks(true, false) + 1;
        let young = floor_carry(&mut world, wpos, 2, 2, Item::of_kind(kind_ids::DAGGER, 0)).unwrap();
        let doomed = {
            let mut i = Item::of_kind(kind_ids::RATION, -old);
            i.pval = 0;
            floor_carry(&mut world, wpos, 3, 2, i).unwrap()
        };
        let art = floor_carry(
            &mut world,
            wpos,
            4,
            2,
            Item::of_kind(kind_ids::ART_CROWN, -old),
        )
        .unwrap();

        sweep_item_lifetimes(&mut world, wpos);
        assert!(world.items.get(young).is_some());
        assert!(world.items.get(doomed).is_none());
        // Artifacts live three times as long; this one is old but not that old.
        assert!(world.items.get(art).is_some());
    }
}
