#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn rotation shared by players, enemies and the end-of-turn phase.
//!
//! The queue holds one entry per player, one per enemy and a single
//! end-of-turn marker. Concluding a turn moves the front entry to the back.
//! Defeated enemies are dropped when they reach the front and paused players
//! are passed over without consuming a cycle.

use std::collections::{BTreeSet, VecDeque};

use keybound_core::{EnemyId, PlayerNumber};

/// Wire value of the active player index while no player is acting.
pub const NO_ACTIVE_PLAYER: i64 = -1;

/// Entry stored in the turn rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TurnHolder {
    /// A connected or paused player.
    Player(PlayerNumber),
    /// A single enemy.
    Enemy(EnemyId),
    /// Marker that triggers the passive end-of-turn effects.
    EndOfTurn,
}

impl TurnHolder {
    /// Phase entered when this holder reaches the front of the queue.
    #[must_use]
    pub const fn phase(self) -> TurnPhase {
        match self {
            Self::Player(player) => TurnPhase::PlayerTurn(player),
            Self::Enemy(enemy) => TurnPhase::EnemyTurn(enemy),
            Self::EndOfTurn => TurnPhase::EndOfTurnPhase,
        }
    }
}

/// State of the scheduler for the turn currently being played.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    /// Waits for the player's intent.
    PlayerTurn(PlayerNumber),
    /// Resolves the enemy's strike and movement without waiting.
    EnemyTurn(EnemyId),
    /// Applies healing tiles, then proceeds immediately.
    EndOfTurnPhase,
}

impl TurnPhase {
    /// Whether the phase blocks until input arrives.
    #[must_use]
    pub const fn awaits_input(self) -> bool {
        matches!(self, Self::PlayerTurn(_))
    }

    /// Zero-based index of the acting player, or [`NO_ACTIVE_PLAYER`].
    #[must_use]
    pub fn wire_index(self) -> i64 {
        match self {
            Self::PlayerTurn(player) => i64::from(player.get()) - 1,
            Self::EnemyTurn(_) | Self::EndOfTurnPhase => NO_ACTIVE_PLAYER,
        }
    }
}

/// Circular queue of turn holders.
#[derive(Clone, Debug)]
pub struct TurnQueue {
    holders: VecDeque<TurnHolder>,
    paused: BTreeSet<PlayerNumber>,
}

impl TurnQueue {
    /// Creates the rotation: players first, then enemies, then the end-of-turn marker.
    #[must_use]
    pub fn new(players: &[PlayerNumber], enemies: &[EnemyId]) -> Self {
        let holders = players
            .iter()
            .copied()
            .map(TurnHolder::Player)
            .chain(enemies.iter().copied().map(TurnHolder::Enemy))
            .chain(std::iter::once(TurnHolder::EndOfTurn))
            .collect();
        Self {
            holders,
            paused: BTreeSet::new(),
        }
    }

    /// Number of entries in the rotation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    /// Reports whether the rotation is empty. Never true for a queue built by [`TurnQueue::new`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Entries in turn order, starting with the current front.
    pub fn holders(&self) -> impl Iterator<Item = TurnHolder> + '_ {
        self.holders.iter().copied()
    }

    /// Entry at the front of the queue, before dead or paused entries are skipped.
    #[must_use]
    pub fn front(&self) -> Option<TurnHolder> {
        self.holders.front().copied()
    }

    /// Resolves the phase for the next turn.
    ///
    /// Defeated enemies at the front are removed permanently and paused players
    /// are rotated past. The end-of-turn marker is always playable, so the loop
    /// terminates once it reaches the front at the latest.
    pub fn begin_turn<F>(&mut self, mut is_enemy_alive: F) -> TurnPhase
    where
        F: FnMut(EnemyId) -> bool,
    {
        loop {
            match self.holders.front().copied() {
                Some(TurnHolder::Enemy(enemy)) if !is_enemy_alive(enemy) => {
                    let _ = self.holders.pop_front();
                }
                Some(TurnHolder::Player(player)) if self.paused.contains(&player) => {
                    self.holders.rotate_left(1);
                }
                Some(holder) => return holder.phase(),
                None => return TurnPhase::EndOfTurnPhase,
            }
        }
    }

    /// Concludes the current turn by moving the front entry to the back.
    pub fn end_turn(&mut self) {
        if !self.holders.is_empty() {
            self.holders.rotate_left(1);
        }
    }

    /// Marks a player's entry to be skipped on every rotation.
    ///
    /// Returns `false` when the player was already paused or is not part of the rotation.
    pub fn pause(&mut self, player: PlayerNumber) -> bool {
        self.holders.contains(&TurnHolder::Player(player)) && self.paused.insert(player)
    }

    /// Reports whether a player's turns are being skipped.
    #[must_use]
    pub fn is_paused(&self, player: PlayerNumber) -> bool {
        self.paused.contains(&player)
    }

    /// Players that still take their turns.
    pub fn active_players(&self) -> impl Iterator<Item = PlayerNumber> + '_ {
        self.holders.iter().filter_map(|holder| match holder {
            TurnHolder::Player(player) if !self.paused.contains(player) => Some(*player),
            _ => None,
        })
    }

    /// Reports whether every player entry is paused.
    #[must_use]
    pub fn all_players_paused(&self) -> bool {
        self.active_players().next().is_none()
    }
}
