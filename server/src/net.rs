//! The command/observation surface between the game core and the framing
//! layer.
//!
//! The socket code runs on its own threads and never touches world state:
//! it parses frames into `Command` values and pushes them down a per-player
//! channel; the tick loop drains those during the player's turn and pushes
//! `Observation` values back. One lock-free SPSC pair per client is the
//! only shared state in the process.
//!
//! Every frame starts with a one-byte packet type; `PacketType` mirrors the
//! client's receive-handler table 1:1.

use bincode::{Decode, Encode};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use deephold_core::types::{FeatId, ItemId, MonsterId, RaceId, WorldPos};

/// Wire packet discriminants. The framing collaborator maps these to and
/// from the one-byte header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
#[repr(u8)]
pub enum PacketType {
    // Control.
    Login = 0,
    Quit = 1,
    Keepalive = 2,
    Ping = 3,
    // Player state.
    HitPoints = 10,
    Stamina = 11,
    Mana = 12,
    ArmourClass = 13,
    Gold = 14,
    Depth = 15,
    StatusEffects = 16,
    Indicators = 17,
    Plusses = 18,
    // Inventory and floor.
    InventorySnapshot = 20,
    InventoryDelta = 21,
    FloorItems = 22,
    // Map.
    CellUpdate = 30,
    MiniMap = 31,
    LineInfo = 32,
    // Stores.
    StoreInventory = 40,
    StorePrice = 41,
    StoreTransaction = 42,
    // Social.
    Message = 50,
    Party = 51,
    Guild = 52,
    PlayerList = 53,
    // Round-trips.
    Target = 60,
    Direction = 61,
    SpellRequest = 62,
    // Effects.
    Sound = 70,
    Music = 71,
    ScreenFlash = 72,
    // Interruption of repeated actions.
    Disturb = 80,
}

/// A parsed client command, queued in receive order.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Command {
    /// 8-way step; (dx, dy) each in -1..=1.
    Walk { dx: i8, dy: i8 },
    /// Melee a monster known to be adjacent.
    Attack { target: MonsterId },
    /// Take the stairs under the player.
    TakeStairs,
    /// Rest until interrupted.
    Rest,
    /// Do nothing this turn.
    Idle,
    PickUp,
    Drop { item: ItemId, amount: u8 },
    /// Search adjacent cells for secrets.
    Search,
    Disarm { dx: i8, dy: i8 },
    /// Drink from or bottle a fountain under the player.
    DrinkFountain,
    /// Tunnel into a vein or wall.
    Tunnel { dx: i8, dy: i8 },
    /// Admin: spawn a specific race at the player's feet.
    AdminSummon { race: RaceId },
    /// Admin: wipe every instance of a race from the current floor.
    AdminGenocide { race: RaceId },
    Quit,
}

/// One observation delta, emitted in mutation order.
#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub enum Observation {
    /// A cell the player can see changed appearance.
    CellUpdate { x: i32, y: i32, feat: FeatId, glyph: char, attr: u8 },
    /// A monster became visible or changed state.
    MonsterAppear { id: MonsterId, glyph: char, attr: u8, x: i32, y: i32 },
    MonsterMove { id: MonsterId, x: i32, y: i32 },
    MonsterGone { id: MonsterId },
    PlayerMoved { wpos: WorldPos, x: i32, y: i32 },
    HitPoints { cur: i32, max: i32 },
    Experience { exp: u32, level: i32 },
    Gold { amount: i32 },
    Depth { wpos: WorldPos },
    Message { text: String },
    /// Cancels running, resting and auto-walk client-side.
    Disturb,
    Sound { which: u16 },
    ScreenFlash,
    PlayerList { names: Vec<String> },
}

impl Observation {
    /// The packet type the framing layer tags this observation with.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Observation::CellUpdate { .. } => PacketType::CellUpdate,
            Observation::MonsterAppear { .. }
            | Observation::MonsterMove { .. }
            | Observation::MonsterGone { .. } => PacketType::LineInfo,
            Observation::PlayerMoved { .. } => PacketType::Depth,
            Observation::HitPoints { .. } => PacketType::HitPoints,
            Observation::Experience { .. } => PacketType::Plusses,
            Observation::Gold { .. } => PacketType::Gold,
            Observation::Depth { .. } => PacketType::Depth,
            Observation::Message { .. } => PacketType::Message,
            Observation::Disturb => PacketType::Disturb,
            Observation::Sound { .. } => PacketType::Sound,
            Observation::ScreenFlash => PacketType::ScreenFlash,
            Observation::PlayerList { .. } => PacketType::PlayerList,
        }
    }
}

/// The game-side endpoints of one client's queue pair.
#[derive(Debug)]
pub struct Connection {
    cmd_rx: Receiver<Command>,
    obs_tx: Sender<Observation>,
}

/// The framing-side endpoints, handed to the socket threads.
#[derive(Debug, Clone)]
pub struct RemoteEnd {
    pub cmd_tx: Sender<Command>,
    pub obs_rx: Receiver<Observation>,
}

impl Connection {
    /// Build a queue pair; the `RemoteEnd` goes to the I/O threads.
    pub fn pair() -> (Connection, RemoteEnd) {
        let (cmd_tx, cmd_rx) = unbounded();
        let (obs_tx, obs_rx) = unbounded();
        (Connection { cmd_rx, obs_tx }, RemoteEnd { cmd_tx, obs_rx })
    }

    /// Next queued command, if any. `None` also covers a hung-up producer;
    /// the disconnect sweep handles the player separately.
    pub fn poll_command(&self) -> Option<Command> {
        match self.cmd_rx.try_recv() {
            Ok(cmd) => Some(cmd),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Queue an observation. A full or hung-up queue drops the delta; the
    /// client resyncs on reconnect.
    pub fn send(&self, obs: Observation) {
        let _ = self.obs_tx.send(obs);
    }

    /// Drop all pending input, for disconnection.
    pub fn drain_commands(&self) {
        while self.cmd_rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_arrive_in_order() {
        let (conn, remote) = Connection::pair();
        remote.cmd_tx.send(Command::Walk { dx: 1, dy: 0 }).unwrap();
        remote.cmd_tx.send(Command::Rest).unwrap();
        assert_eq!(conn.poll_command(), Some(Command::Walk { dx: 1, dy: 0 }));
        assert_eq!(conn.poll_command(), Some(Command::Rest));
        assert_eq!(conn.poll_command(), None);
    }

    #[test]
    fn observations_arrive_in_order() {
        let (conn, remote) = Connection::pair();
        conn.send(Observation::Message { text: "a".into() });
        conn.send(Observation::Disturb);
        assert_eq!(
            remote.obs_rx.try_recv().unwrap(),
            Observation::Message { text: "a".into() }
        );
        assert_eq!(remote.obs_rx.try_recv().unwrap(), Observation::Disturb);
    }

    #[test]
    fn drain_discards_pending_input() {
        let (conn, remote) = Connection::pair();
        remote.cmd_tx.send(Command::Rest).unwrap();
        remote.cmd_tx.send(Command::Quit).unwrap();
        conn.drain_commands();
        assert_eq!(conn.poll_command(), None);
    }
}
