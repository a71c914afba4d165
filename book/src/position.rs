use std::fmt::{self, Display, Formatter};

use othello::{square_to_string, Board, SCORE_MAX, SCORE_MIN};
use serde::{Deserialize, Serialize};

/// A known move together with its score from the side to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub square: u8,
    pub score: i32,
}

impl Link {
    pub fn new(square: u8, score: i32) -> Self {
        Self { square, score }
    }
}

impl Display for Link {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", square_to_string(self.square), self.score)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub value: i32,
    pub lower: i32,
    pub upper: i32,
}

impl Score {
    pub fn new(value: i32, lower: i32, upper: i32) -> Self {
        Self {
            value,
            lower,
            upper,
        }
    }

    pub fn exact(value: i32) -> Self {
        Self::new(value, value, value)
    }

    pub fn is_exact(&self) -> bool {
        self.lower == self.upper
    }

    /// Keeps `value` inside the bounds.
    pub fn clamp(&mut self) {
        self.value = self.value.clamp(self.lower, self.upper.max(self.lower));
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::new(0, SCORE_MIN, SCORE_MAX)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionFlags {
    pub done: bool,
    pub todo: bool,
}

/// A canonical board of the book with its known moves and evaluation. Moves are stored in the
/// orientation of the canonical board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub board: Board,
    /// Best move not yet linked to a position of the book.
    pub leaf: Option<Link>,
    pub links: Vec<Link>,
    pub flags: PositionFlags,
    pub score: Score,
    pub level: u8,
    pub n_wins: u32,
    pub n_draws: u32,
    pub n_losses: u32,
    pub n_lines: u32,
}

impl Position {
    /// An unexpanded position. Finished games are solved straight away.
    pub fn new(board: Board) -> Self {
        let board = board.canonical();
        let mut position = Self {
            board,
            leaf: None,
            links: Vec::new(),
            flags: PositionFlags::default(),
            score: Score::default(),
            level: 0,
            n_wins: 0,
            n_draws: 0,
            n_losses: 0,
            n_lines: 0,
        };

        if board.is_game_over() {
            position.set_solved(board.final_score());
        } else {
            position.flags.todo = true;
        }

        position
    }

    pub fn n_empties(&self) -> u8 {
        self.board.count_empties()
    }

    pub fn is_game_over(&self) -> bool {
        self.board.is_game_over()
    }

    pub fn is_solved(&self) -> bool {
        self.score.is_exact()
    }

    pub fn set_solved(&mut self, score: i32) {
        self.score = Score::exact(score);
        self.flags.done = true;
    }

    /// Keeps the DONE flag in line with the bounds.
    pub fn update_done(&mut self) {
        self.flags.done = self.score.is_exact();
    }

    pub fn link(&self, square: u8) -> Option<&Link> {
        self.links.iter().find(|link| link.square == square)
    }

    pub fn link_mut(&mut self, square: u8) -> Option<&mut Link> {
        self.links.iter_mut().find(|link| link.square == square)
    }

    pub fn has_link(&self, square: u8) -> bool {
        self.link(square).is_some()
    }

    pub fn linked_moves(&self) -> u64 {
        self.links
            .iter()
            .filter(|link| link.square < 64)
            .fold(0, |bits, link| bits | (1 << link.square))
    }

    /// Legal moves without a link.
    pub fn unlinked_moves(&self) -> u64 {
        self.board.get_moves() & !self.linked_moves()
    }

    pub fn is_fully_linked(&self) -> bool {
        self.unlinked_moves() == 0
    }

    pub fn best_link(&self) -> Option<&Link> {
        self.links
            .iter()
            .fold(None, |best: Option<&Link>, link| match best {
                Some(best) if best.score >= link.score => Some(best),
                _ => Some(link),
            })
    }

    /// The best score among links and leaf.
    pub fn best_score(&self) -> Option<i32> {
        self.links
            .iter()
            .chain(self.leaf.iter())
            .map(|link| link.score)
            .max()
    }

    /// Links tied with the best link score.
    pub fn best_links(&self) -> impl Iterator<Item = &Link> {
        let best = self.best_link().map_or(SCORE_MIN - 1, |link| link.score);
        self.links.iter().filter(move |link| link.score == best)
    }

    /// The canonical position reached by `square`, with a forced pass applied, and whether the
    /// pass happened.
    pub fn child(&self, square: u8) -> Option<(Board, bool)> {
        self.board
            .next_position(square)
            .map(|(board, passed)| (board.canonical(), passed))
    }

    /// All canonical children reachable through links.
    pub fn linked_children(&self) -> impl Iterator<Item = (Link, Board, bool)> + '_ {
        self.links.iter().filter_map(move |link| {
            self.child(link.square)
                .map(|(board, passed)| (*link, board, passed))
        })
    }

    /// Keeps the links sorted by square.
    pub fn add_link(&mut self, link: Link) {
        match self.links.binary_search_by_key(&link.square, |l| l.square) {
            Ok(index) => self.links[index] = link,
            Err(index) => self.links.insert(index, link),
        }

        if self.leaf.map_or(false, |leaf| leaf.square == link.square) {
            self.leaf = None;
        }
    }

    pub fn remove_link(&mut self, square: u8) -> Option<Link> {
        let index = self.links.iter().position(|link| link.square == square)?;
        Some(self.links.remove(index))
    }

    pub fn add_stats(&mut self, other: &Position) {
        self.n_wins = self.n_wins.saturating_add(other.n_wins);
        self.n_draws = self.n_draws.saturating_add(other.n_draws);
        self.n_losses = self.n_losses.saturating_add(other.n_losses);
        self.n_lines = self.n_lines.saturating_add(other.n_lines);
    }

    pub fn clear_stats(&mut self) {
        self.n_wins = 0;
        self.n_draws = 0;
        self.n_losses = 0;
        self.n_lines = 0;
    }

    pub fn has_stats(&self) -> bool {
        self.n_wins > 0 || self.n_draws > 0 || self.n_losses > 0 || self.n_lines > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use othello::parse_square;

    #[test]
    fn test_new_position_is_todo() {
        let position = Position::new(Board::initial());
        assert!(position.flags.todo);
        assert!(!position.flags.done);
        assert_eq!(position.score, Score::default());
        assert_eq!(position.n_empties(), 60);
    }

    #[test]
    fn test_new_position_uses_canonical_board() {
        let board = Board::initial().next(parse_square("f5").unwrap());
        let position = Position::new(board);
        assert_eq!(position.board, board.canonical());
    }

    #[test]
    fn test_game_over_is_solved() {
        let position = Position::new(Board::new(u64::MAX >> 4, 0xF << 60));
        assert!(position.is_solved());
        assert!(position.flags.done);
        assert!(!position.flags.todo);
        assert_eq!(position.score.value, 56);
    }

    #[test]
    fn test_links_stay_sorted_and_replace_leaf() {
        let mut position = Position::new(Board::initial());
        position.leaf = Some(Link::new(37, 1));
        position.add_link(Link::new(44, -2));
        position.add_link(Link::new(37, 0));
        position.add_link(Link::new(19, 0));

        let squares = position.links.iter().map(|l| l.square).collect::<Vec<_>>();
        assert_eq!(squares, vec![19, 37, 44]);
        assert_eq!(position.leaf, None);
    }

    #[test]
    fn test_best_score_considers_leaf() {
        let mut position = Position::new(Board::initial());
        position.add_link(Link::new(19, -3));
        position.add_link(Link::new(26, 1));
        assert_eq!(position.best_score(), Some(1));

        position.leaf = Some(Link::new(37, 4));
        assert_eq!(position.best_score(), Some(4));
        assert_eq!(position.best_link().map(|l| l.square), Some(26));
    }

    #[test]
    fn test_best_links_returns_ties() {
        let mut position = Position::new(Board::initial());
        position.add_link(Link::new(19, 2));
        position.add_link(Link::new(26, 2));
        position.add_link(Link::new(37, -1));

        let best = position.best_links().map(|l| l.square).collect::<Vec<_>>();
        assert_eq!(best, vec![19, 26]);
    }

    #[test]
    fn test_unlinked_moves() {
        let mut position = Position::new(Board::initial());
        let moves = position.board.get_moves();
        let first = moves.trailing_zeros() as u8;
        position.add_link(Link::new(first, 0));

        assert_eq!(position.unlinked_moves(), moves & !(1 << first));
        assert!(!position.is_fully_linked());
    }

    #[test]
    fn test_score_clamp() {
        let mut score = Score::new(10, -4, 6);
        score.clamp();
        assert_eq!(score.value, 6);
    }
}
