//! JSON messages exchanged between the server and its clients.

use serde::{Deserialize, Serialize};

/// Message sent from the server to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Lobby roster update sent while players are joining.
    Lobby(LobbyMessage),
    /// Authoritative board state as seen by the receiving player.
    State(StateMessage),
    /// Explanation for an intent that was not applied.
    Rejected(RejectedMessage),
    /// Final message of a match.
    MatchOver(MatchOverMessage),
}

/// Players currently connected to the lobby.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyMessage {
    /// Peer addresses in connection order.
    pub players: Vec<String>,
    /// Set once the lobby is full and the match begins.
    pub start: bool,
}

/// Full state broadcast.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMessage {
    /// Number of players in the match.
    pub player_count: usize,
    /// Zero-based index of the acting player, `-1` during enemy and end-of-turn phases.
    pub current_player: i64,
    /// Name of the map being played.
    pub map: String,
    /// Card names in the receiving player's hand.
    pub cards: Vec<String>,
    /// Key names held by the receiving player.
    pub keys: Vec<String>,
    /// One-based number of the receiving player.
    pub player_number: u8,
    /// Cells the current selection may move to or attack.
    pub possible_moves: Vec<WireCell>,
    /// Every live pawn and enemy.
    pub elements: Vec<ElementEntry>,
    /// Card spawn layout; only present in the first broadcast of a match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub card_map_list: Vec<SpawnEntry>,
    /// Key spawn layout; only present in the first broadcast of a match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_map_list: Vec<SpawnEntry>,
}

/// Intent refused by the server; the turn was not consumed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedMessage {
    /// Machine readable reason.
    pub reason: String,
}

/// Outcome of a finished match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOverMessage {
    /// Whether the players collected every key.
    pub victory: bool,
    /// Why the match ended.
    pub reason: String,
}

/// Intent submitted by a client during its turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMessage {
    /// Ends the turn without acting.
    #[serde(default)]
    pub skip: bool,
    /// Name of the card the player is using.
    #[serde(default)]
    pub selected_card: Option<String>,
    /// Cell the player clicked.
    #[serde(default)]
    pub selected_cell: Option<WireCell>,
}

/// Cell encoded as a `[y, x]` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct WireCell {
    /// Row, the `y` component.
    pub row: u32,
    /// Column, the `x` component.
    pub column: u32,
}

impl WireCell {
    /// Creates a wire cell from its row and column.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl From<[u32; 2]> for WireCell {
    fn from([row, column]: [u32; 2]) -> Self {
        Self { row, column }
    }
}

impl From<WireCell> for [u32; 2] {
    fn from(cell: WireCell) -> Self {
        [cell.row, cell.column]
    }
}

/// Live entity encoded as `[name, health, y, x]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, i32, u32, u32)", into = "(String, i32, u32, u32)")]
pub struct ElementEntry {
    /// Unique entity name.
    pub name: String,
    /// Current health.
    pub health: i32,
    /// Row of the entity.
    pub row: u32,
    /// Column of the entity.
    pub column: u32,
}

impl From<(String, i32, u32, u32)> for ElementEntry {
    fn from((name, health, row, column): (String, i32, u32, u32)) -> Self {
        Self {
            name,
            health,
            row,
            column,
        }
    }
}

impl From<ElementEntry> for (String, i32, u32, u32) {
    fn from(entry: ElementEntry) -> Self {
        (entry.name, entry.health, entry.row, entry.column)
    }
}

/// Collectible spawn point encoded as `[name, y, x, spawn_id]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, u32, u32, u32)", into = "(String, u32, u32, u32)")]
pub struct SpawnEntry {
    /// Card or key name.
    pub name: String,
    /// Row of the spawn point.
    pub row: u32,
    /// Column of the spawn point.
    pub column: u32,
    /// Map tile id of the spawn group.
    pub spawn_id: u32,
}

impl From<(String, u32, u32, u32)> for SpawnEntry {
    fn from((name, row, column, spawn_id): (String, u32, u32, u32)) -> Self {
        Self {
            name,
            row,
            column,
            spawn_id,
        }
    }
}

impl From<SpawnEntry> for (String, u32, u32, u32) {
    fn from(entry: SpawnEntry) -> Self {
        (entry.name, entry.row, entry.column, entry.spawn_id)
    }
}
