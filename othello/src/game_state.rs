use std::fmt::{self, Display, Formatter};

use crate::Board;

/// A board together with the colour to move and the number of plies played, which the bare
/// `Board` does not track.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct GameState {
    pub board: Board,
    pub black_to_move: bool,
    pub ply: usize,
}

impl engine::GameState for GameState {
    type Position = Board;

    fn initial() -> Self {
        Self {
            board: Board::initial(),
            black_to_move: true,
            ply: 0,
        }
    }

    fn position(&self) -> Board {
        self.board.canonical()
    }
}

impl GameState {
    pub fn from_board(board: Board, black_to_move: bool) -> Self {
        let ply = 60usize.saturating_sub(board.count_empties() as usize);
        Self {
            board,
            black_to_move,
            ply,
        }
    }

    pub fn player_to_move(&self) -> usize {
        if self.black_to_move {
            1
        } else {
            2
        }
    }
}

impl Display for GameState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.board)?;
        write!(
            f,
            "{} to move, ply {}",
            if self.black_to_move { "Black" } else { "White" },
            self.ply
        )
    }
}
