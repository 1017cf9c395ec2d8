//! The Deephold game server.
//!
//! Everything that owns world state lives here: the cell grid, the level
//! store, the entity pools, visibility, the dungeon generator, the
//! monster subsystem, the tick scheduler and the command surface. The
//! binary in `main.rs` is a thin shell that boots a `World` and drives
//! `tick::world_tick`; the socket framing, account handling and data-file
//! parsing collaborate from outside through the `net` queue types and the
//! `deephold-core` catalog.

pub mod ai;
pub mod cave;
pub mod config;
pub mod generate;
pub mod items;
pub mod knowledge;
pub mod levels;
pub mod monsters;
pub mod net;
pub mod persist;
pub mod player;
pub mod pool;
pub mod spells;
pub mod tick;
pub mod visibility;
pub mod world;
