//! Match construction: roster placement, starting hands and collectible spawning.

use std::collections::{BTreeMap, BTreeSet};

use keybound_core::{
    CardId, CellCoord, Element, EnemyId, Occupant, PawnId, PlayerNumber, HAND_CAPACITY,
    KEY_COLOR_COUNT, MAX_PLAYERS,
};
use rand::{seq::SliceRandom, Rng};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    catalog::{CardCatalog, KeyCatalog},
    combat::EntitySpec,
    grid::{Grid, GridError},
    map::{MapAsset, MapError},
    Enemy, ItemSpawn, Pawn, Player, SpawnPoint, World,
};

const STANDARD_HEALTH: i32 = 100;
const STANDARD_ATTACK: u32 = 20;
const STANDARD_PAWNS: [&str; 4] = ["Gork", "Nano", "Sylphe", "Poticha"];
const STANDARD_ENEMIES: [&str; 4] = ["Skeleton1", "Skeleton2", "Skeleton3", "Skeleton4"];

/// Failures raised while building a match.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The map asset could not be interpreted.
    #[error(transparent)]
    Map(#[from] MapError),
    /// The player count is outside `1..=4`.
    #[error("a match needs between 1 and {} players, got {0}", MAX_PLAYERS)]
    InvalidPlayerCount(u8),
    /// No pawn was listed in the roster.
    #[error("the pawn roster is empty")]
    EmptyRoster,
    /// Two entities share a name.
    #[error("entity name `{0}` is used twice")]
    DuplicateName(String),
    /// An entity starts without health.
    #[error("entity `{0}` must start with positive health")]
    InvalidHealth(String),
    /// The map lacks starting cells for the pawn roster.
    #[error("map offers {available} pawn spawns but the roster has {needed} pawns")]
    NotEnoughPawnSpawns {
        /// Pawns in the roster.
        needed: usize,
        /// Spawn cells on the map.
        available: usize,
    },
    /// The map lacks a spawn group for every key.
    #[error("map offers {found} free key spawn groups, {expected} are needed")]
    MissingKeySpawns {
        /// Keys in the catalog.
        expected: usize,
        /// Usable key spawn groups on the map.
        found: usize,
    },
    /// A player has no starting hand listed.
    #[error("no starting hand is listed for player {0}")]
    MissingHand(u8),
    /// A starting hand exceeds the hand capacity.
    #[error("starting hand of player {player} holds {size} cards")]
    HandTooLarge {
        /// Player whose hand is too large.
        player: u8,
        /// Number of cards listed.
        size: usize,
    },
    /// A starting hand names a card missing from the catalog.
    #[error("card `{0}` is not in the catalog")]
    UnknownCard(String),
    /// Two things were placed on one cell.
    #[error(transparent)]
    Placement(#[from] GridError),
}

/// Enemy roster entry.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EnemySpec {
    /// Shared combat statistics.
    #[serde(flatten)]
    pub stats: EntitySpec,
    /// Whether the enemy may be directed by its goal rather than wander.
    #[serde(default = "ai_controlled_by_default")]
    pub ai_controlled: bool,
}

const fn ai_controlled_by_default() -> bool {
    true
}

/// Everything needed to build a match besides the map and catalogs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchSetup {
    /// Number of seated players.
    pub player_count: u8,
    /// Pawns shared by the players, placed on the map's pawn spawns in order.
    pub pawns: Vec<EntitySpec>,
    /// Enemies, placed on the map's enemy spawns in order. Extra enemies are left out.
    pub enemies: Vec<EnemySpec>,
    /// Card names dealt to each player, indexed by seat.
    pub starting_hands: Vec<Vec<String>>,
}

impl MatchSetup {
    /// Standard roster and starting hands for `player_count` players.
    #[must_use]
    pub fn standard(player_count: u8) -> Self {
        Self {
            player_count,
            pawns: standard_pawns(),
            enemies: standard_enemies(),
            starting_hands: default_starting_hands(player_count),
        }
    }
}

/// The four standard pawns.
#[must_use]
pub fn standard_pawns() -> Vec<EntitySpec> {
    STANDARD_PAWNS
        .iter()
        .map(|name| EntitySpec::new(*name, STANDARD_HEALTH, STANDARD_ATTACK, Element::Neutral))
        .collect()
}

/// The four standard skeletons.
#[must_use]
pub fn standard_enemies() -> Vec<EnemySpec> {
    STANDARD_ENEMIES
        .iter()
        .map(|name| EnemySpec {
            stats: EntitySpec::new(*name, STANDARD_HEALTH, STANDARD_ATTACK, Element::Neutral),
            ai_controlled: true,
        })
        .collect()
}

/// Starting hands dealt for a given number of players.
///
/// The four basic one-step cards are always split across the table so that
/// every direction is covered.
#[must_use]
pub fn default_starting_hands(player_count: u8) -> Vec<Vec<String>> {
    let hands: &[&[&str]] = match player_count {
        1 => &[&["Up1", "Down1", "Left1", "Right1"]],
        2 => &[&["Up1", "Down1"], &["Left1", "Right1"]],
        3 => &[&["Up1"], &["Down1"], &["Left1", "Right1"]],
        4 => &[&["Up1", "Feather", "Cross"], &["Down1"], &["Left1"], &["Right1"]],
        _ => &[],
    };
    hands
        .iter()
        .map(|hand| hand.iter().map(|name| (*name).to_owned()).collect())
        .collect()
}

impl World {
    /// Builds a match from a map asset, a roster and the catalogs.
    ///
    /// Pawns and enemies are placed first, then one key per key spawn group and
    /// a random selection of spawnable cards per card spawn group.
    pub fn new<R: Rng + ?Sized>(
        asset: &MapAsset,
        setup: &MatchSetup,
        cards: CardCatalog,
        keys: KeyCatalog,
        rng: &mut R,
    ) -> Result<Self, SetupError> {
        if setup.player_count == 0 || setup.player_count > MAX_PLAYERS {
            return Err(SetupError::InvalidPlayerCount(setup.player_count));
        }
        if setup.pawns.is_empty() {
            return Err(SetupError::EmptyRoster);
        }
        validate_roster(setup)?;

        let mut layout = asset.layout()?;
        if layout.pawn_spawns.len() < setup.pawns.len() {
            return Err(SetupError::NotEnoughPawnSpawns {
                needed: setup.pawns.len(),
                available: layout.pawn_spawns.len(),
            });
        }

        let mut pawns = Vec::with_capacity(setup.pawns.len());
        for (spec, &cell) in setup.pawns.iter().zip(&layout.pawn_spawns) {
            let id = PawnId::new(next_id(pawns.len()));
            layout.grid.place(cell, Occupant::Pawn(id))?;
            pawns.push(Pawn {
                name: spec.name.clone(),
                stats: spec.combatant(),
                cell: Some(cell),
            });
        }

        let mut enemies = Vec::with_capacity(setup.enemies.len());
        for (spec, &cell) in setup.enemies.iter().zip(&layout.enemy_spawns) {
            let id = EnemyId::new(next_id(enemies.len()));
            layout.grid.place(cell, Occupant::Enemy(id))?;
            enemies.push(Enemy {
                name: spec.stats.name.clone(),
                stats: spec.stats.combatant(),
                cell: Some(cell),
                ai_controlled: spec.ai_controlled,
                carried: None,
            });
        }

        let players = deal_hands(setup, &cards)?;

        let mut item_spawn = ItemSpawn::default();
        spawn_keys(&mut layout.grid, &layout.key_groups, &keys, rng, &mut item_spawn)?;
        spawn_cards(&mut layout.grid, &layout.card_groups, &cards, rng, &mut item_spawn)?;

        Ok(Self {
            grid: layout.grid,
            cards,
            keys,
            pawns,
            enemies,
            players,
            item_spawn,
            match_over: false,
        })
    }
}

fn validate_roster(setup: &MatchSetup) -> Result<(), SetupError> {
    let mut names = BTreeSet::new();
    let roster = setup
        .pawns
        .iter()
        .chain(setup.enemies.iter().map(|enemy| &enemy.stats));
    for spec in roster {
        if spec.health <= 0 {
            return Err(SetupError::InvalidHealth(spec.name.clone()));
        }
        if !names.insert(spec.name.as_str()) {
            return Err(SetupError::DuplicateName(spec.name.clone()));
        }
    }
    Ok(())
}

fn deal_hands(setup: &MatchSetup, cards: &CardCatalog) -> Result<Vec<Player>, SetupError> {
    let mut players = Vec::with_capacity(usize::from(setup.player_count));
    for seat in 0..usize::from(setup.player_count) {
        let number = PlayerNumber::from_index(seat)
            .ok_or(SetupError::InvalidPlayerCount(setup.player_count))?;
        let names = setup
            .starting_hands
            .get(seat)
            .ok_or(SetupError::MissingHand(number.get()))?;
        if names.len() > HAND_CAPACITY {
            return Err(SetupError::HandTooLarge {
                player: number.get(),
                size: names.len(),
            });
        }
        let hand = names
            .iter()
            .map(|name| {
                cards
                    .find(name)
                    .ok_or_else(|| SetupError::UnknownCard(name.clone()))
            })
            .collect::<Result<Vec<CardId>, _>>()?;
        players.push(Player {
            number,
            hand,
            keys: [None; KEY_COLOR_COUNT],
        });
    }
    Ok(players)
}

fn spawn_keys<R: Rng + ?Sized>(
    grid: &mut Grid,
    groups: &BTreeMap<u32, Vec<CellCoord>>,
    keys: &KeyCatalog,
    rng: &mut R,
    item_spawn: &mut ItemSpawn,
) -> Result<(), SetupError> {
    let usable: Vec<(u32, Vec<CellCoord>)> = groups
        .iter()
        .map(|(&gid, cells)| (gid, free_cells(grid, cells)))
        .filter(|(_, cells)| !cells.is_empty())
        .collect();
    if usable.len() < keys.keys().len() {
        return Err(SetupError::MissingKeySpawns {
            expected: keys.keys().len(),
            found: usable.len(),
        });
    }

    for (&key, (gid, cells)) in keys.keys().iter().zip(&usable) {
        let Some(&cell) = cells.choose(rng) else {
            continue;
        };
        grid.place(cell, Occupant::Key(key))?;
        item_spawn.keys.push(SpawnPoint {
            name: key.name().to_owned(),
            cell,
            spawn_id: *gid,
        });
    }
    Ok(())
}

fn spawn_cards<R: Rng + ?Sized>(
    grid: &mut Grid,
    groups: &BTreeMap<u32, Vec<CellCoord>>,
    cards: &CardCatalog,
    rng: &mut R,
    item_spawn: &mut ItemSpawn,
) -> Result<(), SetupError> {
    // One pool for every group, so no card lies on the board twice.
    let mut pool: Vec<CardId> = cards.spawnable().to_vec();
    pool.shuffle(rng);
    for (&gid, cells) in groups {
        let candidates = free_cells(grid, cells);
        let amount = pool.len().min(candidates.len());
        let chosen_cells: Vec<CellCoord> =
            candidates.choose_multiple(rng, amount).copied().collect();

        for (cell, card) in chosen_cells.into_iter().zip(pool.drain(..amount)) {
            grid.place(cell, Occupant::Card(card))?;
            item_spawn.cards.push(SpawnPoint {
                name: cards.name(card).unwrap_or_default().to_owned(),
                cell,
                spawn_id: gid,
            });
        }
    }
    Ok(())
}

fn free_cells(grid: &Grid, cells: &[CellCoord]) -> Vec<CellCoord> {
    cells
        .iter()
        .copied()
        .filter(|&cell| grid.contains(cell) && grid.occupant(cell).is_none())
        .collect()
}

fn next_id(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{ENEMY_SPAWN_LAYER, KEYS_LAYER, LOOT_LAYER, PAWN_SPAWN_LAYER};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn standard_hands_cover_every_player_count() {
        for count in 1..=MAX_PLAYERS {
            let hands = default_starting_hands(count);
            assert_eq!(hands.len(), usize::from(count));
            assert!(hands.iter().all(|hand| hand.len() <= HAND_CAPACITY));
        }
        assert!(default_starting_hands(5).is_empty());
    }

    #[test]
    fn missing_key_spawns_are_fatal() {
        let mut asset = MapAsset::new(4, 4);
        asset
            .set_tile(PAWN_SPAWN_LAYER, CellCoord::new(0, 0), 1)
            .expect("in bounds");
        asset
            .set_tile(KEYS_LAYER, CellCoord::new(3, 3), 2)
            .expect("in bounds");
        let setup = MatchSetup {
            pawns: standard_pawns().into_iter().take(1).collect(),
            ..MatchSetup::standard(1)
        };

        let result = World::new(
            &asset,
            &setup,
            CardCatalog::standard().expect("catalog"),
            KeyCatalog::standard(),
            &mut ChaCha8Rng::seed_from_u64(1),
        );
        assert!(matches!(
            result,
            Err(SetupError::MissingKeySpawns {
                expected: 4,
                found: 1
            })
        ));
    }

    #[test]
    fn card_groups_draw_from_one_pool() {
        let mut asset = MapAsset::new(6, 6);
        asset
            .set_tile(PAWN_SPAWN_LAYER, CellCoord::new(0, 0), 1)
            .expect("in bounds");
        for (column, gid) in (0..4).zip(11..) {
            asset
                .set_tile(KEYS_LAYER, CellCoord::new(column, 5), gid)
                .expect("in bounds");
        }
        for column in 0..6 {
            for (row, gid) in [(1, 30), (2, 31), (3, 32)] {
                asset
                    .set_tile(LOOT_LAYER, CellCoord::new(column, row), gid)
                    .expect("in bounds");
            }
        }
        let setup = MatchSetup {
            pawns: standard_pawns().into_iter().take(1).collect(),
            ..MatchSetup::standard(1)
        };

        let world = World::new(
            &asset,
            &setup,
            CardCatalog::standard().expect("catalog"),
            KeyCatalog::standard(),
            &mut ChaCha8Rng::seed_from_u64(4),
        )
        .expect("valid match");

        let spawned = world.item_spawn.cards();
        assert_eq!(spawned.len(), world.cards.spawnable().len());
        let names: BTreeSet<&str> = spawned.iter().map(|point| point.name.as_str()).collect();
        assert_eq!(names.len(), spawned.len(), "a card spawned twice: {spawned:?}");
    }

    #[test]
    fn roster_is_validated() {
        let mut asset = MapAsset::new(4, 4);
        asset
            .set_tile(ENEMY_SPAWN_LAYER, CellCoord::new(0, 0), 1)
            .expect("in bounds");

        let mut setup = MatchSetup::standard(2);
        setup.enemies[0].stats.name = "Gork".to_owned();
        let result = World::new(
            &asset,
            &setup,
            CardCatalog::standard().expect("catalog"),
            KeyCatalog::standard(),
            &mut ChaCha8Rng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(SetupError::DuplicateName(name)) if name == "Gork"));

        let result = World::new(
            &asset,
            &MatchSetup::standard(0),
            CardCatalog::standard().expect("catalog"),
            KeyCatalog::standard(),
            &mut ChaCha8Rng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(SetupError::InvalidPlayerCount(0))));

        let result = World::new(
            &asset,
            &MatchSetup::standard(2),
            CardCatalog::standard().expect("catalog"),
            KeyCatalog::standard(),
            &mut ChaCha8Rng::seed_from_u64(1),
        );
        assert!(matches!(
            result,
            Err(SetupError::NotEnoughPawnSpawns {
                needed: 4,
                available: 0
            })
        ));
    }
}
