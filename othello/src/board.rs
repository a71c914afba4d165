use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use common::iter_bit_indexes;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::symmetry::{inverse_transform, transform, N_SYMMETRIES};

/// Disc placement with the side to move implied: `player` holds the discs of the side to move.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Board {
    pub player: u64,
    pub opponent: u64,
}

impl Board {
    pub fn new(player: u64, opponent: u64) -> Self {
        Self { player, opponent }
    }

    pub fn initial() -> Self {
        Self::new(INITIAL_PLAYER, INITIAL_OPPONENT)
    }

    /// A board is well formed when no square is held by both sides and the four centre squares
    /// are occupied.
    pub fn is_valid(&self) -> bool {
        const CENTER: u64 = (1 << 27) | (1 << 28) | (1 << 35) | (1 << 36);
        self.player & self.opponent == 0 && (self.player | self.opponent) & CENTER == CENTER
    }

    pub fn empties(&self) -> u64 {
        !(self.player | self.opponent)
    }

    pub fn count_empties(&self) -> u8 {
        self.empties().count_ones() as u8
    }

    pub fn get_moves(&self) -> u64 {
        get_moves(self.player, self.opponent)
    }

    pub fn can_move(&self) -> bool {
        self.get_moves() != 0
    }

    pub fn is_legal(&self, square: u8) -> bool {
        square < 64 && self.get_moves() & (1 << square) != 0
    }

    pub fn is_game_over(&self) -> bool {
        !self.can_move() && get_moves(self.opponent, self.player) == 0
    }

    pub fn pass(&self) -> Self {
        Self::new(self.opponent, self.player)
    }

    /// Plays a legal move. The caller is responsible for legality.
    pub fn next(&self, square: u8) -> Self {
        let bit = 1u64 << square;
        let flipped = flips(self.player, self.opponent, square);

        Self::new(self.opponent ^ flipped, self.player | flipped | bit)
    }

    /// Plays `square` and, when the opponent is then left without a move while the mover still has
    /// one, applies the forced pass too. Returns the resulting board and whether a pass was applied.
    pub fn next_position(&self, square: u8) -> Option<(Self, bool)> {
        if !self.is_legal(square) {
            return None;
        }

        let next = self.next(square);
        if !next.can_move() && next.pass().can_move() {
            Some((next.pass(), true))
        } else {
            Some((next, false))
        }
    }

    /// Final disc difference from the side to move, empty squares going to the winner.
    pub fn final_score(&self) -> i32 {
        let n_player = self.player.count_ones() as i32;
        let n_opponent = self.opponent.count_ones() as i32;
        let n_empties = self.count_empties() as i32;
        let diff = n_player - n_opponent;

        match diff.cmp(&0) {
            std::cmp::Ordering::Greater => diff + n_empties,
            std::cmp::Ordering::Less => diff - n_empties,
            std::cmp::Ordering::Equal => 0,
        }
    }

    pub fn symmetry(&self, symmetry: usize) -> Self {
        Self::new(
            transform(self.player, symmetry),
            transform(self.opponent, symmetry),
        )
    }

    pub fn inverse_symmetry(&self, symmetry: usize) -> Self {
        Self::new(
            inverse_transform(self.player, symmetry),
            inverse_transform(self.opponent, symmetry),
        )
    }

    /// The canonical representative among the eight symmetric boards together with the symmetry
    /// that maps this board onto it.
    pub fn unique(&self) -> (Self, usize) {
        (0..N_SYMMETRIES)
            .map(|symmetry| (self.symmetry(symmetry), symmetry))
            .min_by_key(|(board, _)| *board)
            .unwrap_or((*self, 0))
    }

    pub fn canonical(&self) -> Self {
        self.unique().0
    }

    pub fn legal_squares(&self) -> impl Iterator<Item = u8> {
        iter_bit_indexes(self.get_moves()).map(|index| index as u8)
    }

    /// 64 characters, `X` for the side to move, `O` for the opponent and `-` for empty squares.
    pub fn to_compact(&self) -> String {
        (0..64)
            .map(|square| {
                let bit = 1u64 << square;
                if self.player & bit != 0 {
                    'X'
                } else if self.opponent & bit != 0 {
                    'O'
                } else {
                    '-'
                }
            })
            .collect()
    }
}

impl FromStr for Board {
    type Err = anyhow::Error;

    /// Accepts the compact form, optionally followed by the colour to move (`X` or `O`). When `O`
    /// is to move the discs are swapped so that `player` is always the side to move.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let squares = parts.next().ok_or_else(|| anyhow!("Empty board string"))?;

        if squares.chars().count() != BOARD_SIZE {
            return Err(anyhow!(
                "Board must have {} squares, found {}",
                BOARD_SIZE,
                squares.chars().count()
            ));
        }

        let mut board = Board::default();
        for (square, c) in squares.chars().enumerate() {
            let bit = 1u64 << square;
            match c {
                'X' | 'x' | '*' => board.player |= bit,
                'O' | 'o' => board.opponent |= bit,
                '-' | '.' => {}
                _ => return Err(anyhow!("Invalid square character {:?}", c)),
            }
        }

        match parts.next() {
            None | Some("X") | Some("x") | Some("*") => Ok(board),
            Some("O") | Some("o") => Ok(board.pass()),
            Some(side) => Err(anyhow!("Invalid side to move {:?}", side)),
        }
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let moves = self.get_moves();

        writeln!(f, "  A B C D E F G H")?;
        for rank in 0..8 {
            write!(f, "{}", rank + 1)?;
            for file in 0..8 {
                let bit = 1u64 << (rank * 8 + file);
                let c = if self.player & bit != 0 {
                    'X'
                } else if self.opponent & bit != 0 {
                    'O'
                } else if moves & bit != 0 {
                    '.'
                } else {
                    '-'
                };
                write!(f, " {}", c)?;
            }
            writeln!(f, " {}", rank + 1)?;
        }
        write!(f, "  A B C D E F G H")
    }
}

pub fn get_moves(player: u64, opponent: u64) -> u64 {
    let masked = opponent & NOT_A_OR_H_FILE;

    (direction_moves(player, masked, 1)
        | direction_moves(player, opponent, 8)
        | direction_moves(player, masked, 7)
        | direction_moves(player, masked, 9))
        & !(player | opponent)
}

fn direction_moves(player: u64, opponent: u64, shift: u32) -> u64 {
    let mut left = opponent & (player << shift);
    let mut right = opponent & (player >> shift);

    for _ in 0..5 {
        left |= opponent & (left << shift);
        right |= opponent & (right >> shift);
    }

    (left << shift) | (right >> shift)
}

pub fn flips(player: u64, opponent: u64, square: u8) -> u64 {
    let x = (square % 8) as i32;
    let y = (square / 8) as i32;
    let mut flipped = 0;

    for (dx, dy) in DIRECTIONS {
        let mut line = 0;
        let (mut cx, mut cy) = (x + dx, y + dy);

        while (0..8).contains(&cx) && (0..8).contains(&cy) {
            let bit = 1u64 << (cy * 8 + cx);
            if opponent & bit != 0 {
                line |= bit;
            } else {
                if player & bit != 0 {
                    flipped |= line;
                }
                break;
            }
            cx += dx;
            cy += dy;
        }
    }

    flipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::parse_square;

    #[test]
    fn test_initial_moves() {
        let board = Board::initial();
        let expected = ["d3", "c4", "f5", "e6"]
            .iter()
            .map(|s| 1u64 << parse_square(s).unwrap())
            .fold(0, |acc, bit| acc | bit);

        assert_eq!(board.get_moves(), expected);
        assert_eq!(board.count_empties(), 60);
    }

    #[test]
    fn test_next_flips_and_switches_side() {
        let board = Board::initial();
        let f5 = parse_square("f5").unwrap();
        let next = board.next(f5);

        assert_eq!(next.opponent.count_ones(), 4);
        assert_eq!(next.player.count_ones(), 1);
        assert_eq!(next.count_empties(), 59);
    }

    #[test]
    fn test_first_moves_are_symmetric() {
        let board = Board::initial();
        let canonical: Vec<Board> = board
            .legal_squares()
            .map(|square| board.next(square).canonical())
            .collect();

        assert!(canonical.iter().all(|b| *b == canonical[0]));
    }

    #[test]
    fn test_unique_maps_back() {
        let board = Board::initial().next(parse_square("d3").unwrap());
        let (unique, symmetry) = board.unique();

        assert_eq!(board.symmetry(symmetry), unique);
        assert_eq!(unique.inverse_symmetry(symmetry), board);
    }

    #[test]
    fn test_next_position_illegal_move() {
        assert!(Board::initial().next_position(0).is_none());
    }

    #[test]
    fn test_final_score_gives_empties_to_winner() {
        let board = Board::new(0b111, 0b1000);
        assert_eq!(board.final_score(), 2 + 60);
        assert_eq!(board.pass().final_score(), -62);
    }

    #[test]
    fn test_compact_round_trip() {
        let board = Board::initial().next(parse_square("c4").unwrap());
        let text = board.to_compact();
        assert_eq!(text.parse::<Board>().unwrap(), board);

        let swapped: Board = format!("{} O", text).parse().unwrap();
        assert_eq!(swapped, board.pass());
    }

    #[test]
    fn test_invalid_board_rejected() {
        assert!(!Board::new(1, 1).is_valid());
        assert!(!Board::new(1, 2).is_valid());
        assert!(Board::initial().is_valid());
    }
}
