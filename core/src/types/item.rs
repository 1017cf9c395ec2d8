//! Object kinds: the immutable half of the item split.

use serde::{Deserialize, Serialize};

/// Index into the kind catalog. Zero is reserved.
pub type KindId = u16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemClass {
    #[default]
    Junk,
    Gold,
    Potion,
    Scroll,
    Wand,
    Food,
    Weapon,
    Armor,
    Shield,
    Helm,
    Boots,
    Ring,
    Amulet,
    Lantern,
    Digger,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemKind {
    pub name: String,
    pub class: ItemClass,
    pub glyph: char,
    pub attr: u8,

    /// Native depth for allocation.
    pub level: i32,
    /// Base value in gold.
    pub cost: i32,
    pub weight: i32,

    /// Damage or effect dice.
    pub d_dice: u8,
    pub d_side: u8,
    /// Charges for wands, uses for fountain stock.
    pub charges: u8,

    /// True artifacts: unique world-wide, preserved on floor purges.
    pub artifact: bool,
    /// Above-average quality pool (`DROP_GOOD` draws from these).
    pub good: bool,
    /// Exceptional quality pool (`DROP_GREAT`).
    pub great: bool,
    /// May stack in a single pile slot.
    pub stackable: bool,
}

impl ItemKind {
    pub fn simple(name: &str, class: ItemClass, glyph: char, level: i32, cost: i32) -> Self {
        ItemKind {
            name: name.to_string(),
            class,
            glyph,
            attr: 1,
            level,
            cost,
            weight: 10,
            d_dice: 0,
            d_side: 0,
            charges: 0,
            artifact: false,
            good: false,
            great: false,
            stackable: matches!(
                class,
                ItemClass::Gold | ItemClass::Potion | ItemClass::Scroll | ItemClass::Food
            ),
        }
    }
}
