//! Match orchestration on the single simulation thread.
//!
//! The loop pulls the next phase from the turn queue. Player turns block on
//! client intents until the turn ends or times out. Enemy turns and the
//! end-of-turn phase run straight through. Every board mutation goes through
//! `keybound_world::apply`.

use std::time::{Duration, Instant};

use keybound_core::{
    ActionRejection, CardId, CellCoord, Command, EnemyId, EntityRef, Event, PawnId, PlayerNumber,
};
use keybound_protocol::{
    ElementEntry, IntentMessage, MatchOverMessage, RejectedMessage, ServerMessage, SpawnEntry,
    StateMessage, WireCell,
};
use keybound_system_enemy_ai::EnemyAi;
use keybound_system_turns::{TurnPhase, TurnQueue};
use keybound_world::{self as world, query, SpawnPoint, World};
use thiserror::Error;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "keybound::game";

/// Client traffic as seen by the simulation thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PlayerEvent {
    Intent(PlayerNumber, IntentMessage),
    Malformed(PlayerNumber, String),
    Disconnected(PlayerNumber),
}

/// Connection to the seated players.
pub(crate) trait Transport {
    /// Delivers a message, returning `false` once the player can no longer be reached.
    fn send(&mut self, player: PlayerNumber, message: &ServerMessage) -> bool;

    /// Waits up to `timeout` for the next client event.
    fn next_event(&mut self, timeout: Duration) -> Option<PlayerEvent>;
}

/// How a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MatchOutcome {
    Victory,
    Defeat,
    Abandoned,
}

impl MatchOutcome {
    fn reason(self) -> &'static str {
        match self {
            Self::Victory => "all keys collected",
            Self::Defeat => "every pawn was defeated",
            Self::Abandoned => "every player disconnected",
        }
    }
}

/// Why an intent was refused. The turn is not consumed.
#[derive(Debug, Error, PartialEq, Eq)]
enum IntentError {
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("malformed intent: {0}")]
    Malformed(String),
    #[error("card `{0}` does not exist")]
    UnknownCard(String),
    #[error("no card selected")]
    NoCard,
    #[error("no cell selected")]
    NoCell,
    #[error("cell is outside the board")]
    OutOfBounds,
    #[error("nothing to do on that cell")]
    NoAction,
    #[error(transparent)]
    Rejected(#[from] ActionRejection),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TurnProgress {
    Continue,
    Ended,
}

/// Pawn picked by the acting player together with the cells its card reaches.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Selection {
    pawn: PawnId,
    card: CardId,
    targets: Vec<CellCoord>,
}

/// Authoritative state of one running match.
#[derive(Debug)]
pub(crate) struct Match {
    world: World,
    queue: TurnQueue,
    ai: EnemyAi,
    map: String,
    intent_timeout: Duration,
    selection: Option<Selection>,
    layout_sent: bool,
}

impl Match {
    pub(crate) fn new(world: World, ai: EnemyAi, map: String, intent_timeout: Duration) -> Self {
        let enemies: Vec<_> = query::enemy_view(&world)
            .into_iter()
            .map(|enemy| enemy.id)
            .collect();
        let queue = TurnQueue::new(&query::players(&world), &enemies);
        Self {
            world,
            queue,
            ai,
            map,
            intent_timeout,
            selection: None,
            layout_sent: false,
        }
    }

    /// Plays turns until the match ends.
    pub(crate) fn run<T: Transport>(&mut self, transport: &mut T) -> MatchOutcome {
        info!(
            target: LOG_TARGET,
            map = %self.map,
            turn_holders = self.queue.len(),
            "match started"
        );
        loop {
            if let Some(outcome) = self.outcome() {
                self.finish(transport, outcome);
                return outcome;
            }

            let phase = self
                .queue
                .begin_turn(|enemy| query::is_enemy_alive(&self.world, enemy));
            match phase {
                TurnPhase::PlayerTurn(player) => self.player_turn(transport, player),
                TurnPhase::EnemyTurn(enemy) => self.enemy_turn(enemy),
                TurnPhase::EndOfTurnPhase => self.end_of_turn(),
            }

            if self.outcome().is_none() {
                self.queue.end_turn();
            }
        }
    }

    fn outcome(&self) -> Option<MatchOutcome> {
        if query::is_match_over(&self.world) {
            Some(MatchOutcome::Victory)
        } else if self.queue.all_players_paused() {
            Some(MatchOutcome::Abandoned)
        } else if query::pawn_view(&self.world).is_empty() {
            Some(MatchOutcome::Defeat)
        } else {
            None
        }
    }

    fn finish<T: Transport>(&mut self, transport: &mut T, outcome: MatchOutcome) {
        info!(target: LOG_TARGET, ?outcome, "match over");
        let message = ServerMessage::MatchOver(MatchOverMessage {
            victory: outcome == MatchOutcome::Victory,
            reason: outcome.reason().to_owned(),
        });
        let players: Vec<PlayerNumber> = self.queue.active_players().collect();
        for player in players {
            if !transport.send(player, &message) {
                self.disconnect(player);
            }
        }
    }

    fn player_turn<T: Transport>(&mut self, transport: &mut T, player: PlayerNumber) {
        let phase = TurnPhase::PlayerTurn(player);
        debug!(target: LOG_TARGET, player = player.get(), "player turn");
        self.broadcast(transport, phase);

        let deadline = Instant::now() + self.intent_timeout;
        while !self.queue.is_paused(player) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = if remaining.is_zero() {
                None
            } else {
                transport.next_event(remaining)
            };
            let Some(event) = event else {
                info!(target: LOG_TARGET, player = player.get(), "intent timed out, skipping turn");
                break;
            };

            match event {
                PlayerEvent::Disconnected(who) => self.disconnect(who),
                PlayerEvent::Malformed(who, error) => {
                    self.reject(transport, who, IntentError::Malformed(error));
                }
                PlayerEvent::Intent(who, _) if who != player => {
                    self.reject(transport, who, IntentError::NotYourTurn);
                }
                PlayerEvent::Intent(_, intent) => match self.handle_intent(player, &intent) {
                    Ok(progress) => {
                        self.broadcast(transport, phase);
                        if progress == TurnProgress::Ended {
                            return;
                        }
                    }
                    Err(error) => self.reject(transport, player, error),
                },
            }
        }
        self.reset_selection();
    }

    /// Applies the selection flow to one intent from the acting player.
    fn handle_intent(
        &mut self,
        player: PlayerNumber,
        intent: &IntentMessage,
    ) -> Result<TurnProgress, IntentError> {
        if intent.skip {
            debug!(target: LOG_TARGET, player = player.get(), "turn skipped");
            self.reset_selection();
            return Ok(TurnProgress::Ended);
        }

        let card = match &intent.selected_card {
            Some(name) => Some(
                query::card_catalog(&self.world)
                    .find(name)
                    .ok_or_else(|| IntentError::UnknownCard(name.clone()))?,
            ),
            None => None,
        };
        let card = card
            .or_else(|| self.selection.as_ref().map(|selection| selection.card))
            .ok_or(IntentError::NoCard)?;
        let cell = intent
            .selected_cell
            .map(board_cell)
            .ok_or(IntentError::NoCell)?;
        if !query::grid(&self.world).contains(cell) {
            return Err(IntentError::OutOfBounds);
        }

        let switched = self
            .selection
            .as_ref()
            .filter(|selection| selection.card != card)
            .map(|selection| selection.pawn);
        if let Some(pawn) = switched {
            self.select(player, pawn, card)?;
        }

        let chosen = self
            .selection
            .as_ref()
            .filter(|selection| selection.targets.contains(&cell))
            .map(|selection| selection.pawn);
        if let Some(pawn) = chosen {
            let _ = self.apply(Command::PlayCard {
                player,
                pawn,
                card,
                target: cell,
            })?;
            self.reset_selection();
            return Ok(TurnProgress::Ended);
        }

        if let Some(pawn) = query::pawn_at(&self.world, cell) {
            self.select(player, pawn, card)?;
            return Ok(TurnProgress::Continue);
        }

        Err(IntentError::NoAction)
    }

    fn select(
        &mut self,
        player: PlayerNumber,
        pawn: PawnId,
        card: CardId,
    ) -> Result<(), IntentError> {
        let events = self.apply(Command::HighlightMoves { player, pawn, card })?;
        let targets = events
            .into_iter()
            .find_map(|event| match event {
                Event::MovesHighlighted {
                    mut moves, attacks, ..
                } => {
                    moves.extend(attacks);
                    Some(moves)
                }
                _ => None,
            })
            .unwrap_or_default();
        self.selection = Some(Selection {
            pawn,
            card,
            targets,
        });
        Ok(())
    }

    fn reset_selection(&mut self) {
        self.selection = None;
        if let Err(reason) = self.apply(Command::ClearHighlights) {
            warn!(target: LOG_TARGET, %reason, "failed to clear highlights");
        }
    }

    fn enemy_turn(&mut self, enemy: EnemyId) {
        let Some(snapshot) = query::enemy_view(&self.world)
            .into_iter()
            .find(|candidate| candidate.id == enemy)
        else {
            return;
        };
        let pawns = query::pawn_view(&self.world);
        let collectibles = query::collectible_view(&self.world);
        let mut commands = Vec::new();
        self.ai.handle(
            &snapshot,
            &pawns,
            &collectibles,
            query::grid(&self.world),
            query::player_count(&self.world),
            &mut commands,
        );
        for command in commands {
            if let Err(reason) = self.apply(command) {
                warn!(
                    target: LOG_TARGET,
                    enemy = %snapshot.name,
                    %reason,
                    "enemy command rejected"
                );
            }
        }
    }

    fn end_of_turn(&mut self) {
        if let Err(reason) = self.apply(Command::ApplyHealing) {
            warn!(target: LOG_TARGET, %reason, "healing rejected");
        }
    }

    /// Runs one command against the world and surfaces a rejection as an error.
    fn apply(&mut self, command: Command) -> Result<Vec<Event>, ActionRejection> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        for event in &events {
            match event {
                Event::ActionRejected { reason } => return Err(*reason),
                Event::EntityDefeated { entity, cell } => {
                    if let EntityRef::Enemy(enemy) = entity {
                        self.ai.forget(*enemy);
                    }
                    info!(target: LOG_TARGET, ?entity, ?cell, "entity defeated");
                }
                Event::KeyCollected { player, key } => {
                    info!(
                        target: LOG_TARGET,
                        player = player.get(),
                        key = key.name(),
                        "key collected"
                    );
                }
                Event::CardDestroyed { enemy, cell, .. } => {
                    info!(target: LOG_TARGET, enemy = enemy.get(), ?cell, "card trampled");
                }
                Event::AllKeysCollected => info!(target: LOG_TARGET, "all keys collected"),
                _ => debug!(target: LOG_TARGET, ?event, "world event"),
            }
        }
        Ok(events)
    }

    fn reject<T: Transport>(
        &mut self,
        transport: &mut T,
        player: PlayerNumber,
        error: IntentError,
    ) {
        debug!(target: LOG_TARGET, player = player.get(), %error, "intent rejected");
        let message = ServerMessage::Rejected(RejectedMessage {
            reason: error.to_string(),
        });
        if !transport.send(player, &message) {
            self.disconnect(player);
        }
    }

    fn disconnect(&mut self, player: PlayerNumber) {
        if self.queue.pause(player) {
            info!(target: LOG_TARGET, player = player.get(), "player disconnected, turns paused");
        }
    }

    fn broadcast<T: Transport>(&mut self, transport: &mut T, phase: TurnPhase) {
        let players: Vec<PlayerNumber> = self.queue.active_players().collect();
        for player in players {
            let message = ServerMessage::State(self.state_for(player, phase));
            if !transport.send(player, &message) {
                self.disconnect(player);
            }
        }
        self.layout_sent = true;
    }

    /// Board state as seen by `player`.
    fn state_for(&self, player: PlayerNumber, phase: TurnPhase) -> StateMessage {
        let catalog = query::card_catalog(&self.world);
        let (card_map_list, key_map_list) = if self.layout_sent {
            (Vec::new(), Vec::new())
        } else {
            let spawn = query::item_spawn(&self.world);
            (
                spawn.cards().iter().map(spawn_entry).collect(),
                spawn.keys().iter().map(spawn_entry).collect(),
            )
        };

        StateMessage {
            player_count: query::player_count(&self.world),
            current_player: phase.wire_index(),
            map: self.map.clone(),
            cards: query::player_hand(&self.world, player)
                .unwrap_or_default()
                .iter()
                .filter_map(|&card| catalog.name(card))
                .map(str::to_owned)
                .collect(),
            keys: query::player_keys(&self.world, player)
                .unwrap_or_default()
                .into_iter()
                .map(|key| key.name().to_owned())
                .collect(),
            player_number: player.get(),
            possible_moves: query::highlighted_cells(&self.world)
                .into_iter()
                .map(wire_cell)
                .collect(),
            elements: query::all_elements(&self.world)
                .into_iter()
                .map(|element| ElementEntry {
                    name: element.name,
                    health: element.health,
                    row: element.cell.row(),
                    column: element.cell.column(),
                })
                .collect(),
            card_map_list,
            key_map_list,
        }
    }
}

fn board_cell(cell: WireCell) -> CellCoord {
    CellCoord::new(cell.column, cell.row)
}

fn wire_cell(cell: CellCoord) -> WireCell {
    WireCell::new(cell.row(), cell.column())
}

fn spawn_entry(point: &SpawnPoint) -> SpawnEntry {
    SpawnEntry {
        name: point.name.clone(),
        row: point.cell.row(),
        column: point.cell.column(),
        spawn_id: point.spawn_id,
    }
}
