//! Four-directional A* search over the board grid.

use std::{cmp::Reverse, collections::BinaryHeap};

use keybound_core::CellCoord;

use crate::grid::Grid;

/// Shortest route between two cells, returning only the intermediate cells.
///
/// The start and goal are excluded, so adjacent cells and identical cells
/// both yield an empty path, as does an unreachable goal. Cells must be
/// walkable and free of pawns and enemies to be traversed; collectibles do not
/// block. The goal itself is accepted regardless of its occupant so that an
/// enemy can path toward the pawn it hunts.
#[must_use]
pub fn find_path(grid: &Grid, start: CellCoord, goal: CellCoord) -> Vec<CellCoord> {
    let mut route = find_route(grid, start, goal).unwrap_or_default();
    let _ = route.pop();
    route
}

/// Full route from `start` to `goal`, excluding the start and including the goal.
///
/// Returns `None` when the goal is unreachable or outside the grid. Ties on
/// the estimated cost are broken by discovery order, which keeps the result
/// deterministic for a given board.
#[must_use]
pub fn find_route(grid: &Grid, start: CellCoord, goal: CellCoord) -> Option<Vec<CellCoord>> {
    if !grid.contains(start) || !grid.contains(goal) {
        return None;
    }
    if start == goal {
        return Some(Vec::new());
    }

    let (width, height) = grid.dimensions();
    let cell_count = usize::try_from(width)
        .ok()?
        .checked_mul(usize::try_from(height).ok()?)?;

    let mut best_cost = vec![u32::MAX; cell_count];
    let mut came_from: Vec<Option<CellCoord>> = vec![None; cell_count];
    let mut closed = vec![false; cell_count];
    let mut open = BinaryHeap::new();
    let mut sequence: u64 = 0;

    best_cost[grid.index(start)?] = 0;
    open.push(Reverse((start.manhattan_distance(goal), sequence, start)));

    while let Some(Reverse((_, _, cell))) = open.pop() {
        let current_index = grid.index(cell)?;
        if closed[current_index] {
            continue;
        }
        closed[current_index] = true;

        if cell == goal {
            return Some(reconstruct(grid, &came_from, start, goal));
        }

        let next_cost = best_cost[current_index].saturating_add(1);
        for neighbor in neighbors(cell, width, height) {
            let enterable = if neighbor == goal {
                grid.walkable(neighbor)
            } else {
                traversable(grid, neighbor)
            };
            if !enterable {
                continue;
            }
            let Some(neighbor_index) = grid.index(neighbor) else {
                continue;
            };
            if closed[neighbor_index] || best_cost[neighbor_index] <= next_cost {
                continue;
            }

            best_cost[neighbor_index] = next_cost;
            came_from[neighbor_index] = Some(cell);
            sequence += 1;
            let estimate = next_cost.saturating_add(neighbor.manhattan_distance(goal));
            open.push(Reverse((estimate, sequence, neighbor)));
        }
    }

    None
}

/// Reports whether an entity may walk through the cell.
#[must_use]
pub fn traversable(grid: &Grid, cell: CellCoord) -> bool {
    grid.walkable(cell) && !grid.occupant(cell).is_some_and(|occupant| occupant.is_entity())
}

fn reconstruct(
    grid: &Grid,
    came_from: &[Option<CellCoord>],
    start: CellCoord,
    goal: CellCoord,
) -> Vec<CellCoord> {
    let mut route = vec![goal];
    let mut cursor = goal;
    while let Some(previous) = grid
        .index(cursor)
        .and_then(|index| came_from.get(index).copied().flatten())
    {
        if previous == start {
            break;
        }
        route.push(previous);
        cursor = previous;
    }
    route.reverse();
    route
}

fn neighbors(cell: CellCoord, width: u32, height: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(cell.column(), row));
        count += 1;
    }

    if let Some(column) = cell.column().checked_add(1) {
        if column < width {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }
    }

    if let Some(row) = cell.row().checked_add(1) {
        if row < height {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }
    }

    if let Some(column) = cell.column().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(column, cell.row()));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TerrainLayer;
    use keybound_core::{EnemyId, KeyColor, Occupant, PawnId};

    #[test]
    fn open_grid_route_matches_manhattan_distance() {
        let grid = Grid::new(5, 5);
        let start = CellCoord::new(0, 0);
        let goal = CellCoord::new(4, 3);

        let route = find_route(&grid, start, goal).expect("open grid is connected");
        assert_eq!(route.len() as u32, start.manhattan_distance(goal));
        assert_eq!(route.last(), Some(&goal));
        assert_eq!(find_path(&grid, start, goal).len(), route.len() - 1);
    }

    #[test]
    fn consecutive_cells_are_adjacent() {
        let grid = Grid::new(6, 6);
        let start = CellCoord::new(5, 0);
        let route = find_route(&grid, start, CellCoord::new(0, 5)).expect("reachable");

        let mut previous = start;
        for cell in route {
            assert!(previous.is_adjacent(cell), "{previous:?} -> {cell:?}");
            previous = cell;
        }
    }

    #[test]
    fn trivial_and_unreachable_paths_are_empty() {
        let mut grid = Grid::new(3, 3);
        let start = CellCoord::new(0, 0);
        assert!(find_path(&grid, start, start).is_empty());
        assert!(find_path(&grid, start, CellCoord::new(1, 0)).is_empty());
        assert!(find_path(&grid, start, CellCoord::new(7, 7)).is_empty());

        for row in 0..3 {
            grid.add_layer(CellCoord::new(1, row), TerrainLayer::new(false))
                .expect("in bounds");
        }
        assert_eq!(find_route(&grid, start, CellCoord::new(2, 2)), None);
        assert!(find_path(&grid, start, CellCoord::new(2, 2)).is_empty());
    }

    #[test]
    fn route_avoids_walls_and_entities() {
        let mut grid = Grid::new(3, 3);
        grid.add_layer(CellCoord::new(1, 0), TerrainLayer::new(false))
            .expect("in bounds");
        grid.place(CellCoord::new(1, 1), Occupant::Enemy(EnemyId::new(1)))
            .expect("empty cell");

        let route =
            find_route(&grid, CellCoord::new(0, 0), CellCoord::new(2, 0)).expect("reachable");
        assert!(route.contains(&CellCoord::new(1, 2)));
        assert_eq!(route.len(), 6);
    }

    #[test]
    fn collectibles_do_not_block_and_goal_occupant_is_allowed() {
        let mut grid = Grid::new(3, 1);
        grid.place(CellCoord::new(1, 0), Occupant::Key(KeyColor::Blue))
            .expect("empty cell");
        grid.place(CellCoord::new(2, 0), Occupant::Pawn(PawnId::new(0)))
            .expect("empty cell");

        assert_eq!(
            find_path(&grid, CellCoord::new(0, 0), CellCoord::new(2, 0)),
            vec![CellCoord::new(1, 0)]
        );
    }

    #[test]
    fn search_is_deterministic() {
        let grid = Grid::new(7, 7);
        let first = find_route(&grid, CellCoord::new(0, 0), CellCoord::new(6, 6));
        let second = find_route(&grid, CellCoord::new(0, 0), CellCoord::new(6, 6));
        assert_eq!(first, second);
    }
}
