use othello::{Board, Search};

/// Evaluation of a board by an analyzer, from the side to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Analysis {
    pub best_move: u8,
    pub value: i32,
    pub lower: i32,
    pub upper: i32,
    pub level: u8,
}

/// The search engine the book relies on to score positions it cannot derive from its links.
pub trait Analyzer {
    /// Analyses `board` ignoring the moves set in `excluded`. `None` when no move is left.
    fn analyze(&mut self, board: &Board, level: u8, excluded: u64) -> Option<Analysis>;

    /// Seeds proven bounds for `board` before a search starts.
    fn feed_hash(&mut self, board: &Board, lower: i32, upper: i32, best_move: u8);
}

impl Analyzer for Search {
    fn analyze(&mut self, board: &Board, level: u8, excluded: u64) -> Option<Analysis> {
        Search::analyze(self, board, level, excluded).map(|result| Analysis {
            best_move: result.best_move,
            value: result.value,
            lower: result.lower,
            upper: result.upper,
            level: result.level,
        })
    }

    fn feed_hash(&mut self, board: &Board, lower: i32, upper: i32, best_move: u8) {
        self.seed(*board, lower, upper, best_move);
    }
}
