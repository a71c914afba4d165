use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write};

use anyhow::{anyhow, Result};
use rand::distributions::{Distribution, WeightedIndex};
use serde::Serialize;

use othello::{
    inverse_square, square_to_string, Board, Line, MoveList, ScoredMove, NO_MOVE, SCORE_MAX,
    SCORE_MIN,
};

use crate::{Analyzer, Book, Position};

/// Game statistics gathered from the position's side to move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GameStats {
    pub n_wins: u64,
    pub n_draws: u64,
    pub n_losses: u64,
    pub n_lines: u64,
}

impl GameStats {
    fn of(position: &Position) -> Self {
        Self {
            n_wins: position.n_wins as u64,
            n_draws: position.n_draws as u64,
            n_losses: position.n_losses as u64,
            n_lines: position.n_lines as u64,
        }
    }

    /// The same statistics seen from the other side.
    fn swapped(self) -> Self {
        Self {
            n_wins: self.n_losses,
            n_losses: self.n_wins,
            ..self
        }
    }

    fn add(&mut self, other: Self) {
        self.n_wins += other.n_wins;
        self.n_draws += other.n_draws;
        self.n_losses += other.n_losses;
        self.n_lines += other.n_lines;
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveView {
    pub square: String,
    pub score: i32,
}

/// A position as presented to external consumers, in the orientation of the board asked for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PositionView {
    pub board: String,
    pub value: i32,
    pub lower: i32,
    pub upper: i32,
    pub level: u8,
    pub done: bool,
    pub todo: bool,
    pub n_wins: u32,
    pub n_draws: u32,
    pub n_losses: u32,
    pub n_lines: u32,
    pub moves: Vec<MoveView>,
    pub leaf: Option<MoveView>,
}

impl Book {
    /// The known moves of `board` with their scores, in the orientation of `board`. `None` when
    /// the board is not in the book.
    pub fn get_moves(&self, board: &Board) -> Option<MoveList> {
        self.get_moves_with_position(board)
            .map(|(moves, _)| moves)
    }

    pub fn get_moves_with_position(&self, board: &Board) -> Option<(MoveList, &Position)> {
        let (canonical, symmetry) = board.unique();
        let position = self.store.get(&canonical)?;

        let mut moves = position
            .links
            .iter()
            .chain(position.leaf.iter())
            .filter(|link| link.square != NO_MOVE)
            .map(|link| ScoredMove::new(inverse_square(link.square, symmetry), link.score))
            .collect::<MoveList>();
        moves.sort();

        Some((moves, position))
    }

    /// Picks a book move at random among those within `bias` discs of the best one, the better
    /// moves being more likely. `None` when no move is known.
    pub fn get_random_move(&self, board: &Board, bias: i32) -> Option<ScoredMove> {
        let moves = self.get_moves(board)?;
        let best = i64::from(moves.best()?.score);
        let floor = best - i64::from(bias.clamp(0, SCORE_MAX - SCORE_MIN));

        let candidates = moves
            .iter()
            .filter(|scored| i64::from(scored.score) >= floor)
            .copied()
            .collect::<Vec<_>>();
        let weights = candidates
            .iter()
            .map(|scored| (i64::from(scored.score) - floor + 1) as u64);
        let distribution = WeightedIndex::new(weights).ok()?;

        let index = distribution.sample(&mut *self.rng.lock());
        candidates.get(index).copied()
    }

    /// Plays `square` from `board` then follows the best book moves as long as the positions are
    /// known.
    pub fn get_line(&self, board: &Board, square: u8) -> Result<Line> {
        let (mut current, _) = board
            .next_position(square)
            .ok_or_else(|| anyhow!("Illegal move {}", square_to_string(square)))?;
        let mut line = Line::new();
        line.push(square);

        while let Some(best) = self.get_moves(&current).and_then(|moves| moves.best().copied()) {
            let Some((next, _)) = current.next_position(best.square) else {
                break;
            };
            line.push(best.square);
            current = next;
        }

        Ok(line)
    }

    /// Win, draw and loss counts of `board`. Positions without recorded games take the sum over
    /// their best moves.
    pub fn get_game_stats(&self, board: &Board) -> Option<GameStats> {
        let canonical = board.canonical();
        self.store.get(&canonical)?;

        let mut cache = HashMap::new();
        Some(self.game_stats_of(canonical, &mut cache))
    }

    fn game_stats_of(&self, board: Board, cache: &mut HashMap<Board, GameStats>) -> GameStats {
        if let Some(stats) = cache.get(&board) {
            return *stats;
        }

        let Some(position) = self.store.get(&board) else {
            return GameStats::default();
        };

        let mut stats = GameStats::of(position);
        if stats.is_empty() {
            for link in position.best_links() {
                let Some((child, passed)) = position.child(link.square) else {
                    continue;
                };
                let child_stats = self.game_stats_of(child, cache);
                stats.add(if passed {
                    child_stats
                } else {
                    child_stats.swapped()
                });
            }
        }

        cache.insert(board, stats);
        stats
    }

    /// A human readable description of the position of `board`.
    pub fn show(&self, board: &Board) -> Option<String> {
        let (moves, position) = self.get_moves_with_position(board)?;
        let mut text = String::new();
        self.write_position(&mut text, board, position, &moves).ok()?;

        Some(text)
    }

    fn write_position(
        &self,
        text: &mut String,
        board: &Board,
        position: &Position,
        moves: &MoveList,
    ) -> fmt::Result {
        writeln!(text, "{}", board)?;
        writeln!(
            text,
            "value {} [{}, {}] level {}{}{}",
            position.score.value,
            position.score.lower,
            position.score.upper,
            position.level,
            if position.flags.done { " done" } else { "" },
            if position.flags.todo { " todo" } else { "" },
        )?;
        writeln!(
            text,
            "games {}: +{} ={} -{}",
            position.n_lines, position.n_wins, position.n_draws, position.n_losses
        )?;
        if let Some(counts) = self.bestpath(board) {
            writeln!(
                text,
                "best paths {} / {}",
                counts.n_player, counts.n_opponent
            )?;
        }
        write!(text, "moves {}", moves)
    }

    pub fn show_for_api(&self, board: &Board) -> Option<PositionView> {
        let (canonical, symmetry) = board.unique();
        let position = self.store.get(&canonical)?;
        let view = |square: u8, score: i32| MoveView {
            square: square_to_string(inverse_square(square, symmetry)),
            score,
        };

        let mut moves = position
            .links
            .iter()
            .map(|link| view(link.square, link.score))
            .collect::<Vec<_>>();
        moves.sort_by(|a, b| b.score.cmp(&a.score).then(a.square.cmp(&b.square)));

        Some(PositionView {
            board: board.to_compact(),
            value: position.score.value,
            lower: position.score.lower,
            upper: position.score.upper,
            level: position.level,
            done: position.flags.done,
            todo: position.flags.todo,
            n_wins: position.n_wins,
            n_draws: position.n_draws,
            n_losses: position.n_losses,
            n_lines: position.n_lines,
            moves,
            leaf: position.leaf.map(|leaf| view(leaf.square, leaf.score)),
        })
    }

    /// Seeds `search` with the bounds of every book position reachable from `board`, in the
    /// orientation the search will meet them. Returns the number of positions fed.
    pub fn feed_hash(&self, board: &Board, search: &mut dyn Analyzer) -> usize {
        let mut visited = HashSet::new();
        let mut stack = vec![*board];

        while let Some(board) = stack.pop() {
            if !visited.insert(board) {
                continue;
            }
            let (canonical, symmetry) = board.unique();
            let Some(position) = self.store.get(&canonical) else {
                continue;
            };

            let best_move = position
                .best_link()
                .map_or(NO_MOVE, |link| inverse_square(link.square, symmetry));
            search.feed_hash(
                &board,
                position.score.lower,
                position.score.upper,
                best_move,
            );

            for link in &position.links {
                let square = inverse_square(link.square, symmetry);
                if let Some((child, _)) = board.next_position(square) {
                    stack.push(child);
                }
            }
        }

        visited
            .iter()
            .filter(|board| self.store.contains(board))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BookOptions, Link, Score};
    use othello::{parse_square, symmetric_square, Game, Search};

    fn sq(name: &str) -> u8 {
        parse_square(name).unwrap()
    }

    fn book(lines: &[&str]) -> Book {
        let mut book = Book::new(BookOptions {
            verbosity: 0,
            seed: Some(21),
            ..BookOptions::default()
        });
        for line in lines {
            book.add_game(&line.parse::<Game>().unwrap()).unwrap();
        }
        book
    }

    fn set_value(book: &mut Book, board: Board, score: Score) {
        let position = book.store.find_mut(&board).unwrap();
        position.score = score;
        position.update_done();
    }

    #[test]
    fn test_get_moves_in_board_orientation() {
        let book = book(&["f5d6", "f5f6"]);
        let after_f5 = Board::initial().next(sq("f5"));

        let moves = book.get_moves(&after_f5).unwrap();
        assert_eq!(moves.len(), 2);
        assert!(moves.contains(sq("d6")));
        assert!(moves.contains(sq("f6")));

        let moves = book.get_moves(&Board::initial()).unwrap();
        assert_eq!(moves.len(), 1);
        assert!(moves.contains(sq("f5")));
        assert!(book.get_moves(&after_f5.pass()).is_none());
    }

    #[test]
    fn test_get_moves_follows_symmetry() {
        let book = book(&["f5d6"]);
        let after_d3 = Board::initial().next(sq("d3"));

        let moves = book.get_moves(&after_d3).unwrap();
        let square = moves.best().unwrap().square;
        assert!(after_d3.is_legal(square));
        let (child, _) = after_d3.next_position(square).unwrap();
        assert!(book.contains(&child));
    }

    #[test]
    fn test_random_move_respects_bias() {
        let mut book = book(&["f5d6", "f5f6", "f5f4"]);
        let after_f5 = Board::initial().next(sq("f5"));
        set_value(&mut book, after_f5.next(sq("d6")), Score::new(-4, -64, 64));
        set_value(&mut book, after_f5.next(sq("f6")), Score::new(-3, -64, 64));
        set_value(&mut book, after_f5.next(sq("f4")), Score::new(10, -64, 64));
        book.negamax();

        for _ in 0..50 {
            let chosen = book.get_random_move(&after_f5, 1).unwrap();
            assert_ne!(chosen.square, sq("f4"));
        }
        let best = book.get_random_move(&after_f5, 0).unwrap();
        assert_eq!(best.square, sq("d6"));
        assert_eq!(best.score, 4);
        assert!(book.get_random_move(&after_f5.pass(), 4).is_none());
    }

    #[test]
    fn test_random_move_with_huge_bias_picks_any_move() {
        let mut book = book(&["f5d6", "f5f6", "f5f4"]);
        let after_f5 = Board::initial().next(sq("f5"));
        set_value(&mut book, after_f5.next(sq("d6")), Score::new(-4, -64, 64));
        set_value(&mut book, after_f5.next(sq("f6")), Score::new(-3, -64, 64));
        set_value(&mut book, after_f5.next(sq("f4")), Score::new(10, -64, 64));
        book.negamax();

        let mut seen = HashSet::new();
        for _ in 0..200 {
            let chosen = book.get_random_move(&after_f5, i32::MAX).unwrap();
            seen.insert(chosen.square);
        }
        assert_eq!(seen.len(), 3);
        assert!(book.get_random_move(&after_f5, i32::MIN).is_some());
    }

    #[test]
    fn test_get_line_follows_best_moves() {
        let book = book(&["f5d6c3d3c4"]);
        let line = book.get_line(&Board::initial(), sq("f5")).unwrap();

        assert_eq!(line.len(), 5);
        assert_eq!(line.to_string(), "f5d6c3d3c4");
        assert!(book.get_line(&Board::initial(), sq("a1")).is_err());
    }

    #[test]
    fn test_game_stats_from_recorded_games() {
        let line = "d3c3b3d2e1d6d7e3f4";
        let book = book(&[line]);

        let stats = book.get_game_stats(&Board::initial()).unwrap();
        assert_eq!(stats.n_wins, 1);
        assert_eq!(stats.n_lines, 1);

        let after_d3 = Board::initial().next(sq("d3"));
        let stats = book.get_game_stats(&after_d3).unwrap();
        assert_eq!(stats.n_losses, 1);
    }

    #[test]
    fn test_game_stats_sum_best_children() {
        let mut book = book(&["f5d6", "f5f6"]);
        let after_f5 = Board::initial().next(sq("f5"));
        for position in book.store.iter_mut() {
            position.clear_stats();
        }
        for (reply, wins) in [("d6", 2), ("f6", 3)] {
            let position = book.store.find_mut(&after_f5.next(sq(reply))).unwrap();
            position.n_wins = wins;
            position.n_lines = wins;
        }

        let stats = book.get_game_stats(&after_f5).unwrap();
        assert_eq!(stats.n_losses, 5);
        assert_eq!(stats.n_wins, 0);
        assert_eq!(stats.n_lines, 5);
    }

    #[test]
    fn test_show_and_api_view() {
        let mut book = book(&["f5d6"]);
        let after_f5 = Board::initial().next(sq("f5"));
        let (_, symmetry) = after_f5.unique();
        book.store.find_mut(&after_f5).unwrap().leaf =
            Some(Link::new(symmetric_square(sq("f4"), symmetry), -1));

        let text = book.show(&after_f5).unwrap();
        assert!(text.contains("games 1"));
        assert!(text.contains("todo"));

        let view = book.show_for_api(&after_f5).unwrap();
        assert_eq!(view.board, after_f5.to_compact());
        assert_eq!(view.moves.len(), 1);
        assert_eq!(view.moves[0].square, "d6");
        assert_eq!(view.leaf.as_ref().map(|m| m.square.as_str()), Some("f4"));
        assert!(serde_json::to_string(&view).unwrap().contains("\"d6\""));
        assert!(book.show_for_api(&after_f5.pass()).is_none());
    }

    #[test]
    fn test_feed_hash_seeds_actual_orientation() {
        let mut book = book(&["f5d6c3"]);
        let after_c3 = Board::initial()
            .next(sq("f5"))
            .next(sq("d6"))
            .next(sq("c3"));
        set_value(&mut book, after_c3, Score::exact(2));
        book.negamax();

        let mut search = Search::new();
        let fed = book.feed_hash(&Board::initial(), &mut search);

        assert_eq!(fed, 4);
        let entry = search.probe(&after_c3).unwrap();
        assert_eq!((entry.lower, entry.upper), (2, 2));
        let root = search.probe(&Board::initial()).unwrap();
        assert_eq!(root.best_move, sq("f5"));
    }
}
