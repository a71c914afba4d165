use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use engine::{GameEngine, ValidActions};
use serde::{Deserialize, Serialize};

use crate::action::{parse_squares, square_to_string};
use crate::{Action, Board, Engine, GameState, PASS};

/// A recorded game: a start position and the squares played from it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub initial: Board,
    pub black_to_move: bool,
    pub moves: Vec<u8>,
}

/// One move of a replayed game. `state` is the position the move was played from and
/// `forced_pass` tells whether the opponent had to pass right after it.
#[derive(Clone, Copy, Debug)]
pub struct GamePly {
    pub state: GameState,
    pub square: u8,
    pub forced_pass: bool,
}

impl Game {
    pub fn new(moves: Vec<u8>) -> Self {
        Self {
            initial: Board::initial(),
            black_to_move: true,
            moves,
        }
    }

    pub fn from_board(initial: Board, black_to_move: bool, moves: Vec<u8>) -> Self {
        Self {
            initial,
            black_to_move,
            moves,
        }
    }

    /// Replays the game, validating every move. Passes are applied automatically when forced, an
    /// explicit pass in the record is accepted only where a pass is legal.
    pub fn plies(&self) -> Result<(Vec<GamePly>, GameState)> {
        let engine = Engine::new();
        let mut state = GameState::from_board(self.initial, self.black_to_move);
        let mut plies = Vec::with_capacity(self.moves.len());
        let mut last_forced_pass = false;

        for (index, &square) in self.moves.iter().enumerate() {
            if square == PASS {
                if last_forced_pass {
                    last_forced_pass = false;
                    continue;
                }
                if engine.valid_actions(&state) != vec![Action::pass()] {
                    bail!("Illegal pass at ply {}", index + 1);
                }
                state = engine.take_action(&state, &Action::pass());
                continue;
            }

            if engine.valid_actions(&state) == vec![Action::pass()] {
                state = engine.take_action(&state, &Action::pass());
            }

            if !state.board.is_legal(square) {
                bail!(
                    "Illegal move {} at ply {}",
                    square_to_string(square),
                    index + 1
                );
            }

            let before = state;
            state = engine.take_action(&state, &Action(square));

            let forced_pass = engine.valid_actions(&state) == vec![Action::pass()];
            if forced_pass {
                state = engine.take_action(&state, &Action::pass());
            }
            last_forced_pass = forced_pass;

            plies.push(GamePly {
                state: before,
                square,
                forced_pass,
            });
        }

        Ok((plies, state))
    }

    pub fn is_legal(&self) -> bool {
        self.plies().is_ok()
    }

    /// Final disc difference from Black's point of view, `None` while the game is unfinished.
    pub fn final_score_black(&self) -> Result<Option<i32>> {
        let engine = Engine::new();
        let (_, last) = self.plies()?;

        Ok(engine.terminal_state(&last).map(|score| {
            if last.black_to_move {
                score
            } else {
                -score
            }
        }))
    }
}

impl FromStr for Game {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let moves = parse_squares(s)?;
        let game = Game::new(moves);
        game.plies()?;

        Ok(game)
    }
}

impl Display for Game {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for square in &self.moves {
            write!(f, "{}", square_to_string(*square))?;
        }
        Ok(())
    }
}

/// A collection of games, stored as text with one move sequence per line.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Base {
    pub games: Vec<Game>,
}

impl Base {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, game: Game) {
        self.games.push(game);
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Game> {
        self.games.iter()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read game base at: {:?}", path))?;

        text.parse()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_string())
            .with_context(|| format!("Failed to write game base at: {:?}", path))
    }
}

impl FromStr for Base {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let games = s
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .map(|(number, line)| {
                line.parse::<Game>()
                    .map_err(|err| anyhow!("Line {}: {}", number + 1, err))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { games })
    }
}

impl Display for Base {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for game in &self.games {
            writeln!(f, "{}", game)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_replay_opening() {
        let game: Game = "f5d6c3d3c4".parse().unwrap();
        let (plies, last) = game.plies().unwrap();

        assert_eq!(plies.len(), 5);
        assert!(!last.black_to_move);
        assert_eq!(last.board.count_empties(), 55);
        assert_eq!(game.final_score_black().unwrap(), None);
    }

    #[test]
    fn test_illegal_move_is_rejected() {
        assert!("f5f5".parse::<Game>().is_err());
        assert!(!Game::new(vec![0]).is_legal());
    }

    #[test]
    fn test_base_skips_comments_and_reports_line() {
        let base: Base = "# games\nf5d6\n\nf5f6\n".parse().unwrap();
        assert_eq!(base.len(), 2);

        let err = "f5d6\na1\n".parse::<Base>().unwrap_err();
        assert!(err.to_string().contains("Line 2"));
    }

    #[test]
    fn test_display_round_trip() {
        let game: Game = "f5d6c3".parse().unwrap();
        assert_eq!(game.to_string(), "f5d6c3");
    }
}
