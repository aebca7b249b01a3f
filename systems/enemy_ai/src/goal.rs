//! Enemy goals and the rules for switching between them.

use serde::Deserialize;

/// Behaviour an AI-directed enemy pursues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GoalKind {
    /// Walk toward the nearest pawn.
    ChasePlayer,
    /// Walk toward the farthest card lying on the board.
    SeekCollectible,
}

impl GoalKind {
    /// The other goal kind.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::ChasePlayer => Self::SeekCollectible,
            Self::SeekCollectible => Self::ChasePlayer,
        }
    }
}

/// How a goal is replaced once the commitment roll fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalSwitching {
    /// Always flip to the other goal kind.
    #[default]
    Alternate,
    /// Draw a kind by weight; the current kind may be drawn again.
    Weighted,
}

/// Goal currently held by an enemy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Goal {
    kind: GoalKind,
    weight: u32,
    commitment: f64,
    decay: f64,
}

impl Goal {
    /// Creates a fresh goal with full commitment.
    #[must_use]
    pub const fn new(kind: GoalKind, weight: u32, decay: f64) -> Self {
        Self {
            kind,
            weight,
            commitment: 1.0,
            decay,
        }
    }

    /// Kind of the goal.
    #[must_use]
    pub const fn kind(&self) -> GoalKind {
        self.kind
    }

    /// Selection weight used by weighted switching.
    #[must_use]
    pub const fn weight(&self) -> u32 {
        self.weight
    }

    /// Probability in `[0, 1]` that the goal survives the next re-evaluation.
    #[must_use]
    pub const fn commitment(&self) -> f64 {
        self.commitment
    }

    /// Lowers the commitment by one decay step, never below zero.
    pub fn decay(&mut self) {
        self.commitment = (self.commitment - self.decay).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_decays_to_zero() {
        let mut goal = Goal::new(GoalKind::ChasePlayer, 1, 0.4);
        goal.decay();
        assert!((goal.commitment() - 0.6).abs() < 1e-9);
        goal.decay();
        goal.decay();
        assert_eq!(goal.commitment(), 0.0);
        goal.decay();
        assert_eq!(goal.commitment(), 0.0);
    }

    #[test]
    fn other_flips_kind() {
        assert_eq!(GoalKind::ChasePlayer.other(), GoalKind::SeekCollectible);
        assert_eq!(GoalKind::SeekCollectible.other(), GoalKind::ChasePlayer);
    }
}
