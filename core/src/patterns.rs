//! Movement pattern library describing how each card moves a pawn.
//!
//! A pattern is a small matrix laid out row by row (north at the top). The
//! single `2` marks the pawn's own cell and every `1` marks a relative cell
//! the pawn may move into or attack.

use thiserror::Error;

/// Marker for a cell the pattern ignores.
pub const MARK_NONE: u8 = 0;
/// Marker for a cell the pawn may reach.
pub const MARK_REACH: u8 = 1;
/// Marker for the pawn's own reference cell.
pub const MARK_ANCHOR: u8 = 2;

type RawPattern = &'static [&'static [u8]];

/// Every card known to the game with its raw movement pattern.
pub const STANDARD_LIBRARY: [(&str, RawPattern); 14] = [
    ("Up1", &[&[1], &[2]]),
    ("Up2", &[&[1], &[1], &[2]]),
    ("Down1", &[&[2], &[1]]),
    ("Down2", &[&[2], &[1], &[1]]),
    ("Left1", &[&[1, 2]]),
    ("Left2", &[&[1, 1, 2]]),
    ("Right1", &[&[2, 1]]),
    ("Right2", &[&[2, 1, 1]]),
    ("Cross", &[&[0, 1, 0], &[1, 2, 1], &[0, 1, 0]]),
    (
        "Lightning",
        &[
            &[0, 0, 1],
            &[0, 1, 0],
            &[1, 2, 1],
            &[0, 1, 0],
            &[1, 0, 0],
        ],
    ),
    ("Clock", &[&[1, 1, 1], &[1, 2, 1], &[1, 1, 1]]),
    (
        "Fountain",
        &[
            &[1, 0, 1, 0, 1],
            &[0, 0, 0, 0, 0],
            &[1, 0, 2, 0, 1],
            &[0, 0, 0, 0, 0],
            &[1, 0, 1, 0, 1],
        ],
    ),
    (
        "Feather",
        &[
            &[0, 1, 0, 1, 0],
            &[1, 0, 0, 0, 1],
            &[0, 0, 2, 0, 0],
            &[1, 0, 0, 0, 1],
            &[0, 1, 0, 1, 0],
        ],
    ),
    (
        "Supreme",
        &[
            &[1, 1, 1, 1, 1],
            &[1, 1, 1, 1, 1],
            &[1, 1, 2, 1, 1],
            &[1, 1, 1, 1, 1],
            &[1, 1, 1, 1, 1],
        ],
    ),
];

/// Cards that may be scattered on the board as collectibles.
pub const SPAWNABLE_CARDS: [&str; 9] = [
    "Cross",
    "Lightning",
    "Clock",
    "Fountain",
    "Feather",
    "Up2",
    "Down2",
    "Left2",
    "Right2",
];

/// Reasons a raw matrix cannot be used as a movement pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The matrix has no rows or no columns.
    #[error("movement pattern is empty")]
    Empty,
    /// Rows have different lengths.
    #[error("movement pattern rows have different lengths")]
    Ragged,
    /// No cell is marked as the pawn's position.
    #[error("movement pattern has no anchor cell")]
    MissingAnchor,
    /// More than one cell is marked as the pawn's position.
    #[error("movement pattern has {0} anchor cells")]
    MultipleAnchors(usize),
    /// A cell uses an unknown marker value.
    #[error("movement pattern uses unknown marker {0}")]
    InvalidMarker(u8),
}

/// Validated movement pattern with exactly one anchor cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovementPattern {
    rows: Vec<Vec<u8>>,
    anchor_row: usize,
    anchor_column: usize,
}

impl MovementPattern {
    /// Validates the provided matrix and locates its anchor.
    pub fn new(rows: Vec<Vec<u8>>) -> Result<Self, PatternError> {
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(PatternError::Empty);
        }
        if rows.iter().any(|row| row.len() != width) {
            return Err(PatternError::Ragged);
        }

        let mut anchors = Vec::new();
        for (row_index, row) in rows.iter().enumerate() {
            for (column_index, &mark) in row.iter().enumerate() {
                match mark {
                    MARK_NONE | MARK_REACH => {}
                    MARK_ANCHOR => anchors.push((row_index, column_index)),
                    other => return Err(PatternError::InvalidMarker(other)),
                }
            }
        }

        match anchors.as_slice() {
            [] => Err(PatternError::MissingAnchor),
            [(anchor_row, anchor_column)] => Ok(Self {
                anchor_row: *anchor_row,
                anchor_column: *anchor_column,
                rows,
            }),
            many => Err(PatternError::MultipleAnchors(many.len())),
        }
    }

    /// Builds a pattern from statically declared rows.
    pub fn from_static(rows: &[&[u8]]) -> Result<Self, PatternError> {
        Self::new(rows.iter().map(|row| row.to_vec()).collect())
    }

    /// Row and column of the anchor cell inside the matrix.
    #[must_use]
    pub const fn anchor(&self) -> (usize, usize) {
        (self.anchor_row, self.anchor_column)
    }

    /// Raw rows of the matrix.
    #[must_use]
    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }

    /// Offsets `(column_delta, row_delta)` of every reachable cell relative to the anchor.
    pub fn offsets(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        let anchor_row = self.anchor_row as i64;
        let anchor_column = self.anchor_column as i64;
        self.rows.iter().enumerate().flat_map(move |(row_index, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, &mark)| mark == MARK_REACH)
                .map(move |(column_index, _)| {
                    (
                        column_index as i64 - anchor_column,
                        row_index as i64 - anchor_row,
                    )
                })
        })
    }
}

/// Immutable card definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    name: String,
    pattern: MovementPattern,
}

impl Card {
    /// Creates a card from a name and a validated pattern.
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: MovementPattern) -> Self {
        Self {
            name: name.into(),
            pattern,
        }
    }

    /// Name used as the wire identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Movement pattern of the card.
    #[must_use]
    pub const fn pattern(&self) -> &MovementPattern {
        &self.pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_library_pattern_is_valid() {
        for (name, rows) in STANDARD_LIBRARY {
            let pattern = MovementPattern::from_static(rows);
            assert!(pattern.is_ok(), "{name} should be a valid pattern");
        }
    }

    #[test]
    fn spawnable_cards_exist_in_library() {
        for name in SPAWNABLE_CARDS {
            assert!(
                STANDARD_LIBRARY.iter().any(|(known, _)| *known == name),
                "{name} missing from library"
            );
        }
    }

    #[test]
    fn offsets_are_relative_to_anchor() {
        let pattern = MovementPattern::from_static(&[&[1, 1, 2]]).expect("valid pattern");
        let offsets: Vec<_> = pattern.offsets().collect();
        assert_eq!(offsets, vec![(-2, 0), (-1, 0)]);

        let pattern = MovementPattern::from_static(&[&[2], &[1]]).expect("valid pattern");
        assert_eq!(pattern.offsets().collect::<Vec<_>>(), vec![(0, 1)]);
    }

    #[test]
    fn anchors_are_validated() {
        assert_eq!(
            MovementPattern::from_static(&[&[1, 1]]),
            Err(PatternError::MissingAnchor)
        );
        assert_eq!(
            MovementPattern::from_static(&[&[2, 2]]),
            Err(PatternError::MultipleAnchors(2))
        );
        assert_eq!(
            MovementPattern::from_static(&[&[2, 1], &[1]]),
            Err(PatternError::Ragged)
        );
        assert_eq!(
            MovementPattern::from_static(&[&[2, 7]]),
            Err(PatternError::InvalidMarker(7))
        );
        assert_eq!(MovementPattern::new(Vec::new()), Err(PatternError::Empty));
    }
}
