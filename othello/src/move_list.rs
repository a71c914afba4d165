use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::action::square_to_string;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScoredMove {
    pub square: u8,
    pub score: i32,
}

impl ScoredMove {
    pub fn new(square: u8, score: i32) -> Self {
        Self { square, score }
    }
}

/// Moves of a position with their scores, best first.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MoveList {
    moves: Vec<ScoredMove>,
}

impl MoveList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scored_move: ScoredMove) {
        self.moves.push(scored_move);
    }

    /// Orders by descending score, keeping the insertion order of equal scores.
    pub fn sort(&mut self) {
        self.moves.sort_by(|a, b| b.score.cmp(&a.score));
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn best(&self) -> Option<&ScoredMove> {
        self.moves.iter().max_by(|a, b| {
            a.score
                .cmp(&b.score)
                .then_with(|| b.square.cmp(&a.square))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredMove> {
        self.moves.iter()
    }

    pub fn contains(&self, square: u8) -> bool {
        self.moves.iter().any(|m| m.square == square)
    }
}

impl FromIterator<ScoredMove> for MoveList {
    fn from_iter<I: IntoIterator<Item = ScoredMove>>(iter: I) -> Self {
        Self {
            moves: iter.into_iter().collect(),
        }
    }
}

impl Display for MoveList {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = self
            .moves
            .iter()
            .map(|m| format!("{}:{:+}", square_to_string(m.square), m.score))
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{}", text)
    }
}

/// A sequence of moves.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub moves: Vec<u8>,
}

impl Line {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, square: u8) {
        self.moves.push(square);
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl Display for Line {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for square in &self.moves {
            write!(f, "{}", square_to_string(*square))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_is_descending_and_stable() {
        let mut list: MoveList = [
            ScoredMove::new(1, 0),
            ScoredMove::new(2, 4),
            ScoredMove::new(3, 0),
        ]
        .into_iter()
        .collect();

        list.sort();

        let squares: Vec<u8> = list.iter().map(|m| m.square).collect();
        assert_eq!(squares, vec![2, 1, 3]);
    }

    #[test]
    fn test_best_prefers_lowest_square_on_ties() {
        let list: MoveList = [ScoredMove::new(9, 2), ScoredMove::new(4, 2)]
            .into_iter()
            .collect();

        assert_eq!(list.best().map(|m| m.square), Some(4));
    }

    #[test]
    fn test_line_display() {
        let line = Line {
            moves: vec![37, 43, 18],
        };
        assert_eq!(line.to_string(), "f5d6c3");
    }
}
