use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;

use othello::Board;

use crate::{
    Analyzer, BestPathOverlay, BestPathStop, BookOptions, Link, Position, PositionStore, Score,
};

/// The opening book: a graph of analysed positions linked by the moves between them.
///
/// Structural operations take `&mut self`. Best-path counting and the queries only read the
/// positions and may run side by side.
pub struct Book {
    pub(crate) store: PositionStore,
    pub(crate) options: BookOptions,
    pub(crate) date: DateTime<Utc>,
    pub(crate) need_saving: bool,
    pub(crate) rng: Mutex<StdRng>,
    pub(crate) search: Option<Box<dyn Analyzer + Send + Sync>>,
    pub(crate) bestpath: RwLock<BestPathOverlay>,
    pub(crate) stop: BestPathStop,
}

impl std::fmt::Debug for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Book")
            .field("store", &self.store)
            .field("options", &self.options)
            .field("date", &self.date)
            .field("need_saving", &self.need_saving)
            .finish_non_exhaustive()
    }
}

impl Default for Book {
    fn default() -> Self {
        Self::new(BookOptions::default())
    }
}

impl Book {
    pub fn new(options: BookOptions) -> Self {
        let seed = options.seed.unwrap_or_else(rand::random);

        Self {
            store: PositionStore::new(),
            options,
            date: Utc::now(),
            need_saving: false,
            rng: Mutex::new(common::create_rng_from_seed(seed)),
            search: None,
            bestpath: RwLock::new(BestPathOverlay::default()),
            stop: BestPathStop::new(),
        }
    }

    pub fn with_search(mut self, search: impl Analyzer + Send + Sync + 'static) -> Self {
        self.set_search(search);
        self
    }

    pub fn set_search(&mut self, search: impl Analyzer + Send + Sync + 'static) {
        self.search = Some(Box::new(search));
    }

    pub fn take_search(&mut self) -> Option<Box<dyn Analyzer + Send + Sync>> {
        self.search.take()
    }

    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }

    pub fn options(&self) -> &BookOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: BookOptions) {
        self.options = options;
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn need_saving(&self) -> bool {
        self.need_saving
    }

    pub fn positions(&self) -> &PositionStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn find(&self, board: &Board) -> Option<&Position> {
        self.store.find(board)
    }

    pub fn contains(&self, board: &Board) -> bool {
        self.store.contains(board)
    }

    /// Adds a board, a no-op when the board or one of its symmetries is already known. A board
    /// whose side to move has to pass is stored from the opponent's side. Returns true when a
    /// position was created.
    pub fn add_board(&mut self, board: &Board) -> Result<bool> {
        if !board.is_valid() {
            bail!("Invalid board\n{}", board);
        }

        let board = if !board.can_move() && board.pass().can_move() {
            board.pass()
        } else {
            *board
        };

        let (position, created) = self.store.add(board);
        if created {
            debug!("New position with {} empties", position.n_empties());
            self.need_saving = true;
        }

        Ok(created)
    }

    /// Orders the positions by board.
    pub fn sort(&mut self) {
        if !self.store.is_sorted() {
            self.store.sort();
            self.need_saving = true;
        }
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.bestpath.write().clear();
        self.need_saving = true;
    }

    /// Analyses the unlinked moves of a position with the attached search. The analysis is skipped
    /// when `level` is below the level already stored, the stored analysis then stands and the
    /// position is no longer TODO. Positions without links take the search bounds as their score,
    /// the others get their score from `negamax`.
    pub(crate) fn analyze_position(&mut self, canonical: &Board, level: u8) -> bool {
        let Some(search) = self.search.as_mut() else {
            return false;
        };
        let Some(position) = self.store.get_mut(canonical) else {
            return false;
        };

        if position.is_game_over() {
            position.flags.todo = false;
            return true;
        }
        if level < position.level {
            if position.flags.todo {
                position.flags.todo = false;
                self.need_saving = true;
            }
            return false;
        }

        analyze_leaf(search.as_mut(), position, level);
        position.level = level;
        position.flags.todo = false;
        self.need_saving = true;
        true
    }

    /// Refreshes the leaf of a position after one of its moves got linked.
    pub(crate) fn refresh_leaf(&mut self, canonical: &Board) {
        let level = self.options.level;
        if let (Some(search), Some(position)) =
            (self.search.as_mut(), self.store.get_mut(canonical))
        {
            analyze_leaf(search.as_mut(), position, level);
        }
    }

    /// Plays the leaf move of a position into a new linked position. Returns the canonical child.
    pub(crate) fn expand_leaf(&mut self, canonical: &Board) -> Option<Board> {
        let position = self.store.get(canonical)?;
        let leaf = position.leaf?;
        let (child, passed) = position.child(leaf.square)?;

        let created = !self.store.contains(&child);
        let score = {
            let (child_position, _) = self.store.add(child);
            if created {
                let value = if passed { leaf.score } else { -leaf.score };
                child_position.score.value = value;
            }
            link_score(child_position, passed)
        };

        if let Some(position) = self.store.get_mut(canonical) {
            position.add_link(Link::new(leaf.square, score));
        }
        self.need_saving = true;

        if self.search.is_some() {
            if created {
                let level = self.options.level;
                self.analyze_position(&child, level);
            }
            self.refresh_leaf(canonical);
        }

        Some(child)
    }
}

fn analyze_leaf(
    search: &mut (dyn Analyzer + Send + Sync),
    position: &mut Position,
    level: u8,
) {
    let excluded = position.linked_moves();
    match search.analyze(&position.board, level, excluded) {
        Some(analysis) => {
            position.leaf = Some(Link::new(analysis.best_move, analysis.value));
            if position.links.is_empty() {
                position.score = Score::new(analysis.value, analysis.lower, analysis.upper);
                position.update_done();
            }
        }
        None => position.leaf = None,
    }
}

/// Score of the move leading to `child`, from the mover's side.
pub(crate) fn link_score(child: &Position, passed: bool) -> i32 {
    if passed {
        child.score.value
    } else {
        -child.score.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use othello::{parse_square, Search};

    fn options() -> BookOptions {
        BookOptions {
            level: 2,
            verbosity: 0,
            seed: Some(7),
            ..BookOptions::default()
        }
    }

    #[test]
    fn test_add_board_twice_keeps_one_position() {
        let mut book = Book::new(options());
        assert!(book.add_board(&Board::initial()).unwrap());
        assert!(!book.add_board(&Board::initial()).unwrap());
        assert_eq!(book.len(), 1);
        assert!(book.need_saving());
    }

    #[test]
    fn test_add_board_rejects_invalid_board() {
        let mut book = Book::new(options());
        assert!(book.add_board(&Board::new(1, 1)).is_err());
        assert!(book.is_empty());
    }

    #[test]
    fn test_expand_leaf_without_search() {
        let mut book = Book::new(options());
        book.add_board(&Board::initial()).unwrap();
        let root = Board::initial().canonical();
        let square = root.legal_squares().next().unwrap();
        book.store.get_mut(&root).unwrap().leaf = Some(Link::new(square, 3));

        let child = book.expand_leaf(&root).unwrap();

        let position = book.find(&root).unwrap();
        assert_eq!(position.leaf, None);
        assert_eq!(position.links, vec![Link::new(square, 3)]);
        assert_eq!(book.find(&child).unwrap().score.value, -3);
        assert!(book.find(&child).unwrap().flags.todo);
    }

    #[test]
    fn test_analyze_position_with_search() {
        let mut book = Book::new(options()).with_search(Search::new());
        let board = Board::initial().next(parse_square("f5").unwrap());
        book.add_board(&board).unwrap();

        assert!(book.analyze_position(&board.canonical(), 2));
        let position = book.find(&board).unwrap();
        assert!(!position.flags.todo);
        assert_eq!(position.level, 2);
        assert!(position.leaf.is_some());
        assert!(!book.analyze_position(&board.canonical(), 1));
    }
}
