//! Pre-cast queries for the scripting collaborator.
//!
//! Spell effects themselves are driven by an external scripting layer;
//! before it runs a cast, the client needs to know what extra input to
//! collect. The core exposes that as a structured question, and ships a
//! default answerer keyed on the spell table so the server works with no
//! script host attached.

/// What a cast needs from the client before it can execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastQuery {
    /// Fire-and-forget; cast immediately.
    Nothing,
    /// A direction (bolts, short blinks).
    Direction,
    /// A target monster or player.
    Target,
    /// An inventory item (enchant, identify).
    Item,
    /// An extra integer (wonder spells, gold amounts).
    Amount,
}

/// Answers pre-cast queries. The script host implements this; the default
/// implementation answers from a fixed classification.
pub trait SpellPrechecks {
    fn pre_cast(&self, school: u8, spell: u8) -> CastQuery;
}

/// The shipped answerer: conservative defaults per spell shape.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPrechecks;

impl SpellPrechecks for DefaultPrechecks {
    fn pre_cast(&self, school: u8, spell: u8) -> CastQuery {
        match (school, spell) {
            // Attack schools lead with directed casts.
            (0, _) => CastQuery::Direction,
            // Conveyance wants a target for longer jumps.
            (1, 0) => CastQuery::Nothing,
            (1, _) => CastQuery::Target,
            // Item magic operates on the pack.
            (2, _) => CastQuery::Item,
            // Everything else casts outright.
            _ => CastQuery::Nothing,
        }
    }
}
