#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative board state for Keybound matches.
//!
//! The world owns the grid, every pawn and enemy, the players' hands and key
//! slots. It only changes through [`apply`], which validates a [`Command`]
//! and reports what happened as [`Event`]s. Refused commands leave the world
//! untouched and produce a single [`Event::ActionRejected`].

pub mod catalog;
pub mod combat;
pub mod grid;
pub mod legality;
pub mod map;
pub mod navigation;
pub mod setup;

pub use catalog::{CardCatalog, CatalogError, KeyCatalog};
pub use combat::{Combatant, EntitySpec};
pub use grid::{Cell, Grid, GridError, Highlight};
pub use legality::PossibleActions;
pub use map::{MapAsset, MapError};
pub use setup::{EnemySpec, MatchSetup, SetupError};

use keybound_core::{
    ActionRejection, CardId, CellCoord, Command, EnemyId, EntityRef, Event, KeyColor, Occupant,
    PawnId, PlayerNumber, HAND_CAPACITY, KEY_COLOR_COUNT,
};

/// Authoritative state of one match.
#[derive(Clone, Debug)]
pub struct World {
    grid: Grid,
    cards: CardCatalog,
    keys: KeyCatalog,
    pawns: Vec<Pawn>,
    enemies: Vec<Enemy>,
    players: Vec<Player>,
    item_spawn: ItemSpawn,
    match_over: bool,
}

#[derive(Clone, Debug)]
struct Pawn {
    name: String,
    stats: Combatant,
    cell: Option<CellCoord>,
}

#[derive(Clone, Debug)]
struct Enemy {
    name: String,
    stats: Combatant,
    cell: Option<CellCoord>,
    ai_controlled: bool,
    /// Key covered by the enemy, put back on the board when it leaves the cell.
    carried: Option<KeyColor>,
}

#[derive(Clone, Debug)]
struct Player {
    number: PlayerNumber,
    hand: Vec<CardId>,
    keys: [Option<KeyColor>; KEY_COLOR_COUNT],
}

/// Collectible layout chosen when the match was built.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemSpawn {
    cards: Vec<SpawnPoint>,
    keys: Vec<SpawnPoint>,
}

impl ItemSpawn {
    /// Cards scattered on the board at the start of the match.
    #[must_use]
    pub fn cards(&self) -> &[SpawnPoint] {
        &self.cards
    }

    /// Keys scattered on the board at the start of the match.
    #[must_use]
    pub fn keys(&self) -> &[SpawnPoint] {
        &self.keys
    }
}

/// Initial position of a collectible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnPoint {
    /// Card or key name.
    pub name: String,
    /// Cell the collectible was placed on.
    pub cell: CellCoord,
    /// Gid of the spawn group in the map asset.
    pub spawn_id: u32,
}

impl World {
    fn pawn(&self, id: PawnId) -> Option<&Pawn> {
        self.pawns.get(usize::try_from(id.get()).ok()?)
    }

    fn pawn_mut(&mut self, id: PawnId) -> Option<&mut Pawn> {
        self.pawns.get_mut(usize::try_from(id.get()).ok()?)
    }

    fn enemy(&self, id: EnemyId) -> Option<&Enemy> {
        self.enemies.get(usize::try_from(id.get()).ok()?)
    }

    fn enemy_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.enemies.get_mut(usize::try_from(id.get()).ok()?)
    }

    fn player(&self, number: PlayerNumber) -> Option<&Player> {
        self.players.get(number.index())
    }

    fn player_mut(&mut self, number: PlayerNumber) -> Option<&mut Player> {
        self.players.get_mut(number.index())
    }

    fn pawn_cell(&self, id: PawnId) -> Result<CellCoord, ActionRejection> {
        self.pawn(id)
            .and_then(|pawn| pawn.cell)
            .ok_or(ActionRejection::UnknownPawn)
    }

    fn enemy_cell(&self, id: EnemyId) -> Result<CellCoord, ActionRejection> {
        self.enemy(id)
            .and_then(|enemy| enemy.cell)
            .ok_or(ActionRejection::UnknownEnemy)
    }

    /// Validates a pawn and card combination for `player`.
    fn card_actions(
        &self,
        player: PlayerNumber,
        pawn: PawnId,
        card: CardId,
    ) -> Result<(CellCoord, PossibleActions), ActionRejection> {
        let holder = self.player(player).ok_or(ActionRejection::UnknownPlayer)?;
        if !holder.hand.contains(&card) {
            return Err(ActionRejection::CardNotInHand);
        }
        let definition = self.cards.get(card).ok_or(ActionRejection::CardNotInHand)?;
        let origin = self.pawn_cell(pawn)?;
        let actions = legality::possible_actions(&self.grid, origin, definition.pattern());
        Ok((origin, actions))
    }

    fn highlight_moves(
        &mut self,
        player: PlayerNumber,
        pawn: PawnId,
        card: CardId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), ActionRejection> {
        let (_, actions) = self.card_actions(player, pawn, card)?;
        self.grid.clear_highlights();
        for &cell in actions.moves() {
            self.grid.highlight(cell, Highlight::Move);
        }
        for &cell in actions.attacks() {
            self.grid.highlight(cell, Highlight::Attack);
        }
        let (moves, attacks) = actions.into_parts();
        out_events.push(Event::MovesHighlighted {
            pawn,
            card,
            moves,
            attacks,
        });
        Ok(())
    }

    fn play_card(
        &mut self,
        player: PlayerNumber,
        pawn: PawnId,
        card: CardId,
        target: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), ActionRejection> {
        let (origin, actions) = self.card_actions(player, pawn, card)?;
        if !actions.contains(target) {
            return Err(ActionRejection::IllegalTarget);
        }

        if let Some(Occupant::Enemy(enemy)) = self.grid.occupant(target) {
            self.strike(EntityRef::Pawn(pawn), EntityRef::Enemy(enemy), out_events);
            return Ok(());
        }

        let pickup = self.grid.clear(target);
        let _ = self.grid.clear(origin);
        self.grid
            .place(target, Occupant::Pawn(pawn))
            .map_err(|_| ActionRejection::CellBlocked)?;
        if let Some(moved) = self.pawn_mut(pawn) {
            moved.cell = Some(target);
        }
        out_events.push(Event::PawnMoved {
            pawn,
            from: origin,
            to: target,
        });

        match pickup {
            Some(Occupant::Card(collected)) => self.grant_card(player, collected, out_events),
            Some(Occupant::Key(key)) => self.grant_key(player, key, out_events),
            Some(Occupant::Pawn(_) | Occupant::Enemy(_)) | None => {}
        }
        Ok(())
    }

    fn grant_card(&mut self, player: PlayerNumber, card: CardId, out_events: &mut Vec<Event>) {
        let Some(holder) = self.player_mut(player) else {
            return;
        };
        if holder.hand.len() < HAND_CAPACITY {
            holder.hand.push(card);
            out_events.push(Event::CardCollected { player, card });
        } else {
            out_events.push(Event::CardDiscarded { player, card });
        }
    }

    fn grant_key(&mut self, player: PlayerNumber, key: KeyColor, out_events: &mut Vec<Event>) {
        let Some(holder) = self.player_mut(player) else {
            return;
        };
        if let Some(slot) = holder.keys.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(key);
            out_events.push(Event::KeyCollected { player, key });
        }

        let collected = query::collected_keys(self);
        if self.keys.keys().iter().all(|key| collected.contains(key)) {
            self.match_over = true;
            out_events.push(Event::AllKeysCollected);
        }
    }

    fn enemy_attack(
        &mut self,
        enemy: EnemyId,
        pawn: PawnId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), ActionRejection> {
        let from = self.enemy_cell(enemy)?;
        let to = self.pawn_cell(pawn)?;
        if from.squared_distance(to) > 1 {
            return Err(ActionRejection::NotAdjacent);
        }
        self.strike(EntityRef::Enemy(enemy), EntityRef::Pawn(pawn), out_events);
        Ok(())
    }

    fn move_enemy(
        &mut self,
        enemy: EnemyId,
        to: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), ActionRejection> {
        let from = self.enemy_cell(enemy)?;
        if !from.is_adjacent(to) {
            return Err(ActionRejection::NotAdjacent);
        }
        if !navigation::traversable(&self.grid, to) {
            return Err(ActionRejection::CellBlocked);
        }

        let _ = self.grid.clear(from);
        self.drop_carried_key(enemy, from);
        let covered = self.grid.clear(to);
        self.grid
            .place(to, Occupant::Enemy(enemy))
            .map_err(|_| ActionRejection::CellBlocked)?;
        if let Some(moved) = self.enemy_mut(enemy) {
            moved.cell = Some(to);
        }
        out_events.push(Event::EnemyMoved { enemy, from, to });

        match covered {
            Some(Occupant::Card(card)) => out_events.push(Event::CardDestroyed {
                enemy,
                card,
                cell: to,
            }),
            Some(Occupant::Key(key)) => {
                if let Some(moved) = self.enemy_mut(enemy) {
                    moved.carried = Some(key);
                }
            }
            Some(Occupant::Pawn(_) | Occupant::Enemy(_)) | None => {}
        }
        Ok(())
    }

    /// Returns a key hidden under the enemy to the (already vacated) cell.
    fn drop_carried_key(&mut self, enemy: EnemyId, cell: CellCoord) {
        let Some(key) = self.enemy_mut(enemy).and_then(|holder| holder.carried.take()) else {
            return;
        };
        let _ = self.grid.place(cell, Occupant::Key(key));
    }

    fn apply_healing(&mut self, out_events: &mut Vec<Event>) {
        for (index, pawn) in self.pawns.iter_mut().enumerate() {
            let Some(cell) = pawn.cell else {
                continue;
            };
            let heal_value = self.grid.cell(cell).map_or(0, Cell::heal_value);
            if heal_value == 0 {
                continue;
            }
            let amount = pawn.stats.heal(heal_value);
            if amount > 0 {
                out_events.push(Event::PawnHealed {
                    pawn: PawnId::new(u32::try_from(index).unwrap_or(u32::MAX)),
                    amount,
                    health: pawn.stats.health(),
                });
            }
        }
    }

    /// Resolves one strike and removes the defender from the board if it falls.
    fn strike(&mut self, attacker: EntityRef, target: EntityRef, out_events: &mut Vec<Event>) {
        let Some(attacker_stats) = self.stats(attacker) else {
            return;
        };
        let (outcome, cell) = match target {
            EntityRef::Pawn(id) => match self.pawn_mut(id) {
                Some(pawn) => (
                    combat::resolve_attack(&attacker_stats, &mut pawn.stats),
                    pawn.cell,
                ),
                None => return,
            },
            EntityRef::Enemy(id) => match self.enemy_mut(id) {
                Some(enemy) => (
                    combat::resolve_attack(&attacker_stats, &mut enemy.stats),
                    enemy.cell,
                ),
                None => return,
            },
        };
        out_events.push(Event::EntityDamaged {
            attacker,
            target,
            damage: outcome.damage,
            remaining_health: outcome.remaining_health,
        });

        if outcome.survived {
            return;
        }
        let Some(cell) = cell else {
            return;
        };
        let _ = self.grid.clear(cell);
        match target {
            EntityRef::Pawn(id) => {
                if let Some(pawn) = self.pawn_mut(id) {
                    pawn.cell = None;
                }
            }
            EntityRef::Enemy(id) => {
                if let Some(enemy) = self.enemy_mut(id) {
                    enemy.cell = None;
                }
                self.drop_carried_key(id, cell);
            }
        }
        out_events.push(Event::EntityDefeated {
            entity: target,
            cell,
        });
    }

    fn stats(&self, entity: EntityRef) -> Option<Combatant> {
        match entity {
            EntityRef::Pawn(id) => self.pawn(id).map(|pawn| pawn.stats),
            EntityRef::Enemy(id) => self.enemy(id).map(|enemy| enemy.stats),
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if world.match_over && command != Command::ClearHighlights {
        out_events.push(Event::ActionRejected {
            reason: ActionRejection::MatchOver,
        });
        return;
    }

    let outcome = match command {
        Command::HighlightMoves { player, pawn, card } => {
            world.highlight_moves(player, pawn, card, out_events)
        }
        Command::ClearHighlights => {
            world.grid.clear_highlights();
            out_events.push(Event::HighlightsCleared);
            Ok(())
        }
        Command::PlayCard {
            player,
            pawn,
            card,
            target,
        } => world.play_card(player, pawn, card, target, out_events),
        Command::EnemyAttack { enemy, pawn } => world.enemy_attack(enemy, pawn, out_events),
        Command::MoveEnemy { enemy, to } => world.move_enemy(enemy, to, out_events),
        Command::ApplyHealing => {
            world.apply_healing(out_events);
            Ok(())
        }
    };

    if let Err(reason) = outcome {
        out_events.push(Event::ActionRejected { reason });
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use keybound_core::{
        CardId, CellCoord, Element, EnemyId, KeyColor, Occupant, PawnId, PlayerNumber,
    };

    use super::{Cell, Grid, ItemSpawn, PossibleActions, World};
    use crate::{
        catalog::{CardCatalog, KeyCatalog},
        legality,
    };

    /// Number of columns and rows on the board.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        world.grid.dimensions()
    }

    /// Provides read-only access to the board grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Retrieves a single cell.
    #[must_use]
    pub fn cell(world: &World, cell: CellCoord) -> Option<&Cell> {
        world.grid.cell(cell)
    }

    /// Card definitions used by the match.
    #[must_use]
    pub fn card_catalog(world: &World) -> &CardCatalog {
        &world.cards
    }

    /// Key colours that must be collected to win.
    #[must_use]
    pub fn key_catalog(world: &World) -> &KeyCatalog {
        &world.keys
    }

    /// Number of seated players.
    #[must_use]
    pub fn player_count(world: &World) -> usize {
        world.players.len()
    }

    /// Every pawn and enemy still on the board, in row-major cell order.
    #[must_use]
    pub fn all_elements(world: &World) -> Vec<ElementSnapshot> {
        let pawns = world.pawns.iter().filter_map(|pawn| {
            pawn.cell.map(|cell| ElementSnapshot {
                name: pawn.name.clone(),
                health: pawn.stats.health(),
                cell,
            })
        });
        let enemies = world.enemies.iter().filter_map(|enemy| {
            enemy.cell.map(|cell| ElementSnapshot {
                name: enemy.name.clone(),
                health: enemy.stats.health(),
                cell,
            })
        });
        let mut elements: Vec<ElementSnapshot> = pawns.chain(enemies).collect();
        elements.sort_by_key(|element| (element.cell.row(), element.cell.column()));
        elements
    }

    /// Collectible layout chosen when the match was built.
    #[must_use]
    pub fn item_spawn(world: &World) -> &ItemSpawn {
        &world.item_spawn
    }

    /// Cells a pawn could move into or attack with a card, ignoring hand ownership.
    #[must_use]
    pub fn possible_actions(world: &World, pawn: PawnId, card: CardId) -> Option<PossibleActions> {
        let origin = world.pawn(pawn)?.cell?;
        let definition = world.cards.get(card)?;
        Some(legality::possible_actions(
            &world.grid,
            origin,
            definition.pattern(),
        ))
    }

    /// Every highlighted cell in row-major order.
    #[must_use]
    pub fn highlighted_cells(world: &World) -> Vec<CellCoord> {
        world.grid.highlighted_cells()
    }

    /// Pawn standing on the cell, if any.
    #[must_use]
    pub fn pawn_at(world: &World, cell: CellCoord) -> Option<PawnId> {
        match world.grid.occupant(cell) {
            Some(Occupant::Pawn(id)) => Some(id),
            _ => None,
        }
    }

    /// Captures the pawns still on the board, ordered by identifier.
    #[must_use]
    pub fn pawn_view(world: &World) -> Vec<PawnSnapshot> {
        world
            .pawns
            .iter()
            .enumerate()
            .filter_map(|(index, pawn)| {
                Some(PawnSnapshot {
                    id: PawnId::new(u32::try_from(index).ok()?),
                    name: pawn.name.clone(),
                    cell: pawn.cell?,
                    health: pawn.stats.health(),
                    max_health: pawn.stats.max_health(),
                    element: pawn.stats.element(),
                })
            })
            .collect()
    }

    /// Captures the enemies still on the board, ordered by identifier.
    #[must_use]
    pub fn enemy_view(world: &World) -> Vec<EnemySnapshot> {
        world
            .enemies
            .iter()
            .enumerate()
            .filter_map(|(index, enemy)| {
                Some(EnemySnapshot {
                    id: EnemyId::new(u32::try_from(index).ok()?),
                    name: enemy.name.clone(),
                    cell: enemy.cell?,
                    health: enemy.stats.health(),
                    ai_controlled: enemy.ai_controlled,
                })
            })
            .collect()
    }

    /// Every enemy identifier assigned at setup, alive or not.
    #[must_use]
    pub fn enemy_roster(world: &World) -> Vec<EnemyId> {
        (0..world.enemies.len())
            .filter_map(|index| u32::try_from(index).ok().map(EnemyId::new))
            .collect()
    }

    /// Reports whether the enemy is still on the board.
    #[must_use]
    pub fn is_enemy_alive(world: &World, enemy: EnemyId) -> bool {
        world.enemy(enemy).is_some_and(|enemy| enemy.cell.is_some())
    }

    /// Collectibles lying on the board in row-major order.
    #[must_use]
    pub fn collectible_view(world: &World) -> Vec<CollectibleSnapshot> {
        world
            .grid
            .iter()
            .filter_map(|cell| {
                let item = match cell.occupant()? {
                    Occupant::Card(card) => Collectible::Card(card),
                    Occupant::Key(key) => Collectible::Key(key),
                    Occupant::Pawn(_) | Occupant::Enemy(_) => return None,
                };
                Some(CollectibleSnapshot {
                    cell: cell.coord(),
                    item,
                })
            })
            .collect()
    }

    /// Cards held by a player, in pickup order.
    #[must_use]
    pub fn player_hand(world: &World, player: PlayerNumber) -> Option<&[CardId]> {
        world.player(player).map(|holder| holder.hand.as_slice())
    }

    /// Keys held by a player, in slot order.
    #[must_use]
    pub fn player_keys(world: &World, player: PlayerNumber) -> Option<Vec<KeyColor>> {
        world
            .player(player)
            .map(|holder| holder.keys.iter().flatten().copied().collect())
    }

    /// Distinct key colours collected by the whole team, in catalog order.
    #[must_use]
    pub fn collected_keys(world: &World) -> Vec<KeyColor> {
        let mut collected: Vec<KeyColor> = world
            .players
            .iter()
            .flat_map(|holder| holder.keys.iter().flatten().copied())
            .collect();
        collected.sort_unstable();
        collected.dedup();
        collected
    }

    /// Reports whether every key colour has been collected.
    #[must_use]
    pub fn is_match_over(world: &World) -> bool {
        world.match_over
    }

    /// Seated players in seat order.
    #[must_use]
    pub fn players(world: &World) -> Vec<PlayerNumber> {
        world.players.iter().map(|holder| holder.number).collect()
    }

    /// Name and health of a pawn or enemy on the board.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ElementSnapshot {
        /// Entity name, unique within the match.
        pub name: String,
        /// Current health.
        pub health: i32,
        /// Cell the entity occupies.
        pub cell: CellCoord,
    }

    /// Immutable representation of a pawn.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct PawnSnapshot {
        /// Identifier assigned at setup.
        pub id: PawnId,
        /// Pawn name.
        pub name: String,
        /// Cell the pawn occupies.
        pub cell: CellCoord,
        /// Current health.
        pub health: i32,
        /// Health ceiling.
        pub max_health: i32,
        /// Elemental affinity.
        pub element: Element,
    }

    /// Immutable representation of an enemy.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct EnemySnapshot {
        /// Identifier assigned at setup.
        pub id: EnemyId,
        /// Enemy name.
        pub name: String,
        /// Cell the enemy occupies.
        pub cell: CellCoord,
        /// Current health.
        pub health: i32,
        /// Whether the enemy may follow a goal rather than wander.
        pub ai_controlled: bool,
    }

    /// Item lying on the board.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Collectible {
        /// A card.
        Card(CardId),
        /// A key.
        Key(KeyColor),
    }

    /// Collectible together with its cell.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CollectibleSnapshot {
        /// Cell holding the item.
        pub cell: CellCoord,
        /// The item.
        pub item: Collectible,
    }
}
