#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy decision making.
//!
//! Each enemy turn first strikes an adjacent pawn, then either follows the
//! enemy's goal along an A* route or wanders one random step. Whether the goal
//! is followed is re-rolled every turn from a probability that grows with the
//! number of players.

pub mod goal;

use std::collections::HashMap;

use keybound_core::{CellCoord, Command, Direction, EnemyId, MAX_PLAYERS};
use keybound_world::{
    navigation,
    query::{Collectible, CollectibleSnapshot, EnemySnapshot, PawnSnapshot},
    Grid,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub use goal::{Goal, GoalKind, GoalSwitching};

/// Chance that an AI-capable enemy follows its goal, indexed by player count.
pub const DEFAULT_CONTROL_TABLE: [f64; MAX_PLAYERS as usize] = [0.6, 0.85, 0.9, 1.0];

const DEFAULT_DECAY: f64 = 0.25;
const DEFAULT_WEIGHT: u32 = 1;

/// Configuration parameters required to construct the enemy AI.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    rng_seed: u64,
    switching: GoalSwitching,
    decay: f64,
    chase_weight: u32,
    seek_weight: u32,
    control_table: [f64; MAX_PLAYERS as usize],
}

impl Config {
    /// Creates a configuration with the standard tuning and the provided seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self {
            rng_seed,
            switching: GoalSwitching::Alternate,
            decay: DEFAULT_DECAY,
            chase_weight: DEFAULT_WEIGHT,
            seek_weight: DEFAULT_WEIGHT,
            control_table: DEFAULT_CONTROL_TABLE,
        }
    }

    /// Selects how goals are replaced.
    #[must_use]
    pub const fn with_switching(mut self, switching: GoalSwitching) -> Self {
        self.switching = switching;
        self
    }

    /// Sets how much commitment a goal loses every turn.
    #[must_use]
    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay.clamp(0.0, 1.0);
        self
    }

    /// Sets the weights used by weighted switching.
    #[must_use]
    pub const fn with_weights(mut self, chase_weight: u32, seek_weight: u32) -> Self {
        self.chase_weight = chase_weight;
        self.seek_weight = seek_weight;
        self
    }

    /// Replaces the player-count indexed AI control probabilities.
    #[must_use]
    pub fn with_control_table(mut self, control_table: [f64; MAX_PLAYERS as usize]) -> Self {
        self.control_table = control_table.map(|chance| chance.clamp(0.0, 1.0));
        self
    }

    /// Chance that an AI-capable enemy follows its goal with `player_count` players.
    #[must_use]
    pub fn control_probability(&self, player_count: usize) -> f64 {
        let index = player_count.clamp(1, self.control_table.len()) - 1;
        self.control_table[index]
    }
}

/// Pure system that turns an enemy's turn into world commands.
#[derive(Debug)]
pub struct EnemyAi {
    config: Config,
    rng: ChaCha8Rng,
    goals: HashMap<EnemyId, Goal>,
}

impl EnemyAi {
    /// Creates the system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            goals: HashMap::new(),
        }
    }

    /// Goal currently held by an enemy.
    #[must_use]
    pub fn goal(&self, enemy: EnemyId) -> Option<&Goal> {
        self.goals.get(&enemy)
    }

    /// Drops the state kept for a defeated enemy.
    pub fn forget(&mut self, enemy: EnemyId) {
        let _ = self.goals.remove(&enemy);
    }

    /// Plays one turn for `enemy`, emitting an optional strike and an optional step.
    pub fn handle(
        &mut self,
        enemy: &EnemySnapshot,
        pawns: &[PawnSnapshot],
        collectibles: &[CollectibleSnapshot],
        grid: &Grid,
        player_count: usize,
        out: &mut Vec<Command>,
    ) {
        if let Some(pawn) = adjacent_pawn(enemy.cell, pawns) {
            out.push(Command::EnemyAttack {
                enemy: enemy.id,
                pawn: pawn.id,
            });
        }

        let directed = enemy.ai_controlled
            && self
                .rng
                .gen_bool(self.config.control_probability(player_count));

        let step = if directed {
            let kind = self.reconsider_goal(enemy.id);
            goal_target(kind, enemy.cell, pawns, collectibles)
                .or_else(|| goal_target(kind.other(), enemy.cell, pawns, collectibles))
                .and_then(|target| next_step(grid, enemy.cell, target))
        } else {
            self.random_step(grid, enemy.cell)
        };

        if let Some(to) = step {
            out.push(Command::MoveEnemy { enemy: enemy.id, to });
        }
    }

    /// Initialises or re-rolls the enemy's goal, then decays its commitment.
    fn reconsider_goal(&mut self, enemy: EnemyId) -> GoalKind {
        let current = self.goals.get(&enemy).copied();
        let mut goal = match current {
            None => self.fresh_goal(GoalKind::ChasePlayer),
            Some(goal) if self.rng.gen::<f64>() >= goal.commitment() => {
                let kind = match self.config.switching {
                    GoalSwitching::Alternate => goal.kind().other(),
                    GoalSwitching::Weighted => self.weighted_kind(),
                };
                self.fresh_goal(kind)
            }
            Some(goal) => goal,
        };
        goal.decay();
        let kind = goal.kind();
        let _ = self.goals.insert(enemy, goal);
        kind
    }

    fn fresh_goal(&self, kind: GoalKind) -> Goal {
        let weight = match kind {
            GoalKind::ChasePlayer => self.config.chase_weight,
            GoalKind::SeekCollectible => self.config.seek_weight,
        };
        Goal::new(kind, weight, self.config.decay)
    }

    fn weighted_kind(&mut self) -> GoalKind {
        let total = self.config.chase_weight.saturating_add(self.config.seek_weight);
        if total == 0 {
            return GoalKind::ChasePlayer;
        }
        if self.rng.gen_range(0..total) < self.config.chase_weight {
            GoalKind::ChasePlayer
        } else {
            GoalKind::SeekCollectible
        }
    }

    /// One pass over the shuffled cardinal directions; stays put when boxed in.
    fn random_step(&mut self, grid: &Grid, from: CellCoord) -> Option<CellCoord> {
        let (columns, rows) = grid.dimensions();
        let mut directions = Direction::ALL;
        directions.shuffle(&mut self.rng);
        directions
            .into_iter()
            .filter_map(|direction| from.step(direction, columns, rows))
            .find(|&cell| is_free(grid, cell))
    }
}

fn adjacent_pawn(cell: CellCoord, pawns: &[PawnSnapshot]) -> Option<&PawnSnapshot> {
    pawns
        .iter()
        .filter(|pawn| cell.squared_distance(pawn.cell) <= 1)
        .min_by_key(|pawn| cell.squared_distance(pawn.cell))
}

fn goal_target(
    kind: GoalKind,
    from: CellCoord,
    pawns: &[PawnSnapshot],
    collectibles: &[CollectibleSnapshot],
) -> Option<CellCoord> {
    match kind {
        GoalKind::ChasePlayer => pawns
            .iter()
            .map(|pawn| pawn.cell)
            .min_by_key(|cell| from.squared_distance(*cell)),
        GoalKind::SeekCollectible => collectibles
            .iter()
            .filter(|item| matches!(item.item, Collectible::Card(_)))
            .map(|item| item.cell)
            .fold(None, |farthest: Option<CellCoord>, cell| match farthest {
                Some(best) if from.squared_distance(best) >= from.squared_distance(cell) => {
                    Some(best)
                }
                _ => Some(cell),
            }),
    }
}

/// First cell of the A* route toward `target`, if it can be entered this turn.
///
/// Cards and keys on the route do not stop the enemy: it steps onto them.
fn next_step(grid: &Grid, from: CellCoord, target: CellCoord) -> Option<CellCoord> {
    let route = navigation::find_route(grid, from, target)?;
    let &first = route.first()?;
    navigation::traversable(grid, first).then_some(first)
}

fn is_free(grid: &Grid, cell: CellCoord) -> bool {
    grid.walkable(cell) && grid.occupant(cell).is_none()
}
