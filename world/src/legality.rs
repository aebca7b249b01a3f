//! Computes where a pawn may move or strike with a given card.

use keybound_core::{CellCoord, MovementPattern, Occupant};

use crate::grid::Grid;

/// Cells a pawn can act on with one card, split by action kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PossibleActions {
    moves: Vec<CellCoord>,
    attacks: Vec<CellCoord>,
}

impl PossibleActions {
    /// Empty or collectible cells the pawn can move into.
    #[must_use]
    pub fn moves(&self) -> &[CellCoord] {
        &self.moves
    }

    /// Enemy-occupied cells the pawn can attack.
    #[must_use]
    pub fn attacks(&self) -> &[CellCoord] {
        &self.attacks
    }

    /// Reports whether the cell is a legal target of either kind.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.moves.contains(&cell) || self.attacks.contains(&cell)
    }

    /// Reports whether the card offers no option at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.attacks.is_empty()
    }

    /// Consumes the set, yielding moves and attacks.
    #[must_use]
    pub fn into_parts(self) -> (Vec<CellCoord>, Vec<CellCoord>) {
        (self.moves, self.attacks)
    }
}

/// Applies `pattern` anchored at `origin`.
///
/// Targets outside the board, unwalkable cells and cells holding a pawn are
/// skipped. Enemy cells become attacks; everything else becomes a move.
#[must_use]
pub fn possible_actions(
    grid: &Grid,
    origin: CellCoord,
    pattern: &MovementPattern,
) -> PossibleActions {
    let (columns, rows) = grid.dimensions();
    let mut actions = PossibleActions::default();

    for (column_delta, row_delta) in pattern.offsets() {
        let Some(target) = origin.offset(column_delta, row_delta, columns, rows) else {
            continue;
        };
        if !grid.walkable(target) {
            continue;
        }
        match grid.occupant(target) {
            Some(Occupant::Pawn(_)) => {}
            Some(Occupant::Enemy(_)) => actions.attacks.push(target),
            Some(Occupant::Card(_) | Occupant::Key(_)) | None => actions.moves.push(target),
        }
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TerrainLayer;
    use keybound_core::{CardId, EnemyId, PawnId};

    fn cross() -> MovementPattern {
        MovementPattern::from_static(&[&[0, 1, 0], &[1, 2, 1], &[0, 1, 0]]).expect("valid")
    }

    #[test]
    fn corner_origin_drops_out_of_bounds_offsets() {
        let grid = Grid::new(4, 4);
        let actions = possible_actions(&grid, CellCoord::new(0, 0), &cross());
        assert_eq!(
            actions.moves(),
            &[CellCoord::new(1, 0), CellCoord::new(0, 1)]
        );
        assert!(actions.attacks().is_empty());
    }

    #[test]
    fn occupants_decide_the_action_kind() {
        let mut grid = Grid::new(3, 3);
        let origin = CellCoord::new(1, 1);
        grid.place(CellCoord::new(1, 0), Occupant::Enemy(EnemyId::new(0)))
            .expect("empty");
        grid.place(CellCoord::new(0, 1), Occupant::Pawn(PawnId::new(1)))
            .expect("empty");
        grid.place(CellCoord::new(2, 1), Occupant::Card(CardId::new(3)))
            .expect("empty");
        grid.add_layer(CellCoord::new(1, 2), TerrainLayer::new(false))
            .expect("in bounds");

        let actions = possible_actions(&grid, origin, &cross());
        assert_eq!(actions.attacks(), &[CellCoord::new(1, 0)]);
        assert_eq!(actions.moves(), &[CellCoord::new(2, 1)]);
        assert!(actions.contains(CellCoord::new(1, 0)));
        assert!(!actions.contains(CellCoord::new(0, 1)));
    }

    #[test]
    fn moves_and_attacks_are_disjoint_and_walkable() {
        let mut grid = Grid::new(5, 5);
        grid.place(CellCoord::new(2, 0), Occupant::Enemy(EnemyId::new(0)))
            .expect("empty");
        grid.add_layer(CellCoord::new(4, 2), TerrainLayer::new(false))
            .expect("in bounds");
        let supreme = MovementPattern::from_static(&[
            &[1, 1, 1, 1, 1],
            &[1, 1, 1, 1, 1],
            &[1, 1, 2, 1, 1],
            &[1, 1, 1, 1, 1],
            &[1, 1, 1, 1, 1],
        ])
        .expect("valid");

        let actions = possible_actions(&grid, CellCoord::new(2, 2), &supreme);
        for cell in actions.moves() {
            assert!(grid.walkable(*cell));
            assert!(!actions.attacks().contains(cell));
        }
        assert_eq!(actions.moves().len(), 22);
        assert_eq!(actions.attacks(), &[CellCoord::new(2, 0)]);
    }
}
