#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Keybound engine.
//!
//! This crate defines the message surface that connects the server adapter,
//! the authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then reports [`Event`] values
//! describing what actually happened. Systems read immutable snapshots and
//! respond exclusively with new command batches.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod patterns;

pub use patterns::{Card, MovementPattern, PatternError};

/// Number of distinct key colours that must be gathered to win a match.
pub const KEY_COLOR_COUNT: usize = 4;

/// Maximum number of cards a player may hold at once.
pub const HAND_CAPACITY: usize = 4;

/// Maximum number of players supported by a match.
pub const MAX_PLAYERS: u8 = 4;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Computes and highlights the cells reachable by a pawn using a card.
    HighlightMoves {
        /// Player requesting the preview.
        player: PlayerNumber,
        /// Pawn whose position anchors the card's pattern.
        pawn: PawnId,
        /// Card whose movement pattern is evaluated.
        card: CardId,
    },
    /// Clears every highlighted cell on the board.
    ClearHighlights,
    /// Moves a pawn or attacks with it using one of the acting player's cards.
    PlayCard {
        /// Player performing the action and receiving any pickup.
        player: PlayerNumber,
        /// Pawn that moves or attacks.
        pawn: PawnId,
        /// Card that must be held by the player.
        card: CardId,
        /// Absolute cell targeted by the action.
        target: CellCoord,
    },
    /// Makes an enemy strike an adjacent pawn.
    EnemyAttack {
        /// Attacking enemy.
        enemy: EnemyId,
        /// Pawn receiving the hit.
        pawn: PawnId,
    },
    /// Moves an enemy by exactly one cardinal step.
    MoveEnemy {
        /// Enemy that moves.
        enemy: EnemyId,
        /// Destination cell, which must neighbour the enemy's current cell.
        to: CellCoord,
    },
    /// Heals every pawn that stands on a healing tile.
    ApplyHealing,
}

/// Events reported by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Announces the cells highlighted for a pawn and card combination.
    MovesHighlighted {
        /// Pawn whose options were computed.
        pawn: PawnId,
        /// Card whose pattern was evaluated.
        card: CardId,
        /// Empty or collectible cells the pawn may move into.
        moves: Vec<CellCoord>,
        /// Enemy-occupied cells the pawn may attack.
        attacks: Vec<CellCoord>,
    },
    /// Confirms that every highlight was cleared.
    HighlightsCleared,
    /// Confirms that a pawn relocated between two cells.
    PawnMoved {
        /// Pawn that moved.
        pawn: PawnId,
        /// Cell the pawn left.
        from: CellCoord,
        /// Cell the pawn entered.
        to: CellCoord,
    },
    /// Confirms that an enemy relocated between two cells.
    EnemyMoved {
        /// Enemy that moved.
        enemy: EnemyId,
        /// Cell the enemy left.
        from: CellCoord,
        /// Cell the enemy entered.
        to: CellCoord,
    },
    /// Reports damage dealt by one entity to another.
    EntityDamaged {
        /// Entity that dealt the damage.
        attacker: EntityRef,
        /// Entity that received the damage.
        target: EntityRef,
        /// Damage applied after elemental modifiers and clamping.
        damage: u32,
        /// Health left on the target, possibly zero or negative.
        remaining_health: i32,
    },
    /// Reports that an entity was defeated and removed from its cell.
    EntityDefeated {
        /// Defeated entity.
        entity: EntityRef,
        /// Cell the entity occupied when it fell.
        cell: CellCoord,
    },
    /// Reports that a player picked up a card.
    CardCollected {
        /// Player receiving the card.
        player: PlayerNumber,
        /// Card added to the player's hand.
        card: CardId,
    },
    /// Reports that a picked up card was discarded because the hand was full.
    CardDiscarded {
        /// Player whose hand was full.
        player: PlayerNumber,
        /// Card that was destroyed.
        card: CardId,
    },
    /// Reports that a player picked up a key.
    KeyCollected {
        /// Player receiving the key.
        player: PlayerNumber,
        /// Colour of the collected key.
        key: KeyColor,
    },
    /// Reports that an enemy trampled a card lying on the cell it entered.
    CardDestroyed {
        /// Enemy that entered the cell.
        enemy: EnemyId,
        /// Card removed from the board.
        card: CardId,
        /// Cell the card was lying on.
        cell: CellCoord,
    },
    /// Reports that a pawn recovered health on a healing tile.
    PawnHealed {
        /// Pawn that was healed.
        pawn: PawnId,
        /// Health actually restored after capping.
        amount: u32,
        /// Health after healing.
        health: i32,
    },
    /// Announces that every key colour has been collected and the match is won.
    AllKeysCollected,
    /// Reports that a command was refused without mutating the world.
    ActionRejected {
        /// Specific reason the command was refused.
        reason: ActionRejection,
    },
}

/// Reasons a command may be refused by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum ActionRejection {
    /// The referenced pawn is not on the board.
    #[error("pawn is not on the board")]
    UnknownPawn,
    /// The referenced enemy is not on the board.
    #[error("enemy is not on the board")]
    UnknownEnemy,
    /// The referenced player does not take part in the match.
    #[error("player is not part of the match")]
    UnknownPlayer,
    /// The player tried to use a card missing from their hand.
    #[error("card is not in the player's hand")]
    CardNotInHand,
    /// The target cell is not a legal move or attack for the card.
    #[error("target cell is not reachable with this card")]
    IllegalTarget,
    /// The two cells involved are not neighbours.
    #[error("cells are not adjacent")]
    NotAdjacent,
    /// The destination cell cannot be entered.
    #[error("destination cell is blocked")]
    CellBlocked,
    /// The match already ended.
    #[error("the match is over")]
    MatchOver,
}

/// Reference to an entity that can take part in combat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityRef {
    /// A player-controlled pawn.
    Pawn(PawnId),
    /// An enemy.
    Enemy(EnemyId),
}

/// Elemental affinity of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// Beats grass, loses to water.
    Fire,
    /// Beats fire, loses to grass.
    Water,
    /// Beats water, loses to fire.
    Grass,
    /// Neither strong nor weak against anything.
    #[default]
    Neutral,
}

impl Element {
    /// Damage modifier applied when an attacker of this element hits `defender`.
    ///
    /// Returns `+1` on advantage, `-1` on disadvantage and `0` otherwise.
    #[must_use]
    pub const fn modifier_against(self, defender: Element) -> i32 {
        match (self, defender) {
            (Self::Fire, Self::Grass)
            | (Self::Grass, Self::Water)
            | (Self::Water, Self::Fire) => 1,
            (Self::Grass, Self::Fire)
            | (Self::Water, Self::Grass)
            | (Self::Fire, Self::Water) => -1,
            _ => 0,
        }
    }
}

/// Cardinal movement directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Every direction, in clockwise order starting north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];
}

/// Unique identifier assigned to a pawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PawnId(u32);

impl PawnId {
    /// Creates a new pawn identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Index of a card definition inside a card catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardId(u16);

impl CardId {
    /// Creates a new card identifier with the provided catalog index.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the catalog index.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

/// One-based player number, stable for the whole match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerNumber(u8);

impl PlayerNumber {
    /// Creates a player number, rejecting zero and numbers above [`MAX_PLAYERS`].
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value == 0 || value > MAX_PLAYERS {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Creates the player number for a zero-based seat index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index)
            .ok()
            .and_then(|value| value.checked_add(1))
            .and_then(Self::new)
    }

    /// Retrieves the one-based number.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Zero-based seat index used on the wire.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize - 1
    }
}

/// Colour of a collectible key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyColor {
    /// The blue key.
    Blue,
    /// The green key.
    Green,
    /// The red key.
    Red,
    /// The yellow key.
    Yellow,
}

impl KeyColor {
    /// Every key colour in catalog order.
    pub const ALL: [KeyColor; KEY_COLOR_COUNT] = [
        KeyColor::Blue,
        KeyColor::Green,
        KeyColor::Red,
        KeyColor::Yellow,
    ];

    /// Display name used as the wire identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Blue => "blue key",
            Self::Green => "green key",
            Self::Red => "red key",
            Self::Yellow => "yellow key",
        }
    }
}

/// Thing standing on a cell. A cell holds at most one occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Occupant {
    /// A player-controlled pawn.
    Pawn(PawnId),
    /// An enemy.
    Enemy(EnemyId),
    /// A card waiting to be picked up.
    Card(CardId),
    /// A key waiting to be picked up.
    Key(KeyColor),
}

impl Occupant {
    /// Reports whether the occupant is a pawn or an enemy.
    #[must_use]
    pub const fn is_entity(&self) -> bool {
        matches!(self, Self::Pawn(_) | Self::Enemy(_))
    }

    /// Reports whether the occupant can be picked up.
    #[must_use]
    pub const fn is_collectible(&self) -> bool {
        matches!(self, Self::Card(_) | Self::Key(_))
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Computes the squared Euclidean distance between two cell coordinates.
    #[must_use]
    pub fn squared_distance(self, other: CellCoord) -> u64 {
        let columns = u64::from(self.column().abs_diff(other.column()));
        let rows = u64::from(self.row().abs_diff(other.row()));
        columns * columns + rows * rows
    }

    /// Translates the cell by a signed offset, staying inside `columns` x `rows`.
    #[must_use]
    pub fn offset(
        self,
        column_delta: i64,
        row_delta: i64,
        columns: u32,
        rows: u32,
    ) -> Option<Self> {
        let column = i64::from(self.column).checked_add(column_delta)?;
        let row = i64::from(self.row).checked_add(row_delta)?;
        if column < 0 || row < 0 || column >= i64::from(columns) || row >= i64::from(rows) {
            return None;
        }
        Some(Self::new(u32::try_from(column).ok()?, u32::try_from(row).ok()?))
    }

    /// Neighbouring cell in the provided direction, if it lies within the grid.
    #[must_use]
    pub fn step(self, direction: Direction, columns: u32, rows: u32) -> Option<Self> {
        match direction {
            Direction::North => self.offset(0, -1, columns, rows),
            Direction::East => self.offset(1, 0, columns, rows),
            Direction::South => self.offset(0, 1, columns, rows),
            Direction::West => self.offset(-1, 0, columns, rows),
        }
    }

    /// Reports whether two cells share an edge.
    #[must_use]
    pub fn is_adjacent(self, other: CellCoord) -> bool {
        self.manhattan_distance(other) == 1
    }
}
