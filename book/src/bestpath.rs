use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use log::{debug, info};
use othello::Board;

use crate::{Book, PositionStore};

/// Number of best paths through a position. `n_player` counts the lines where the side to move
/// at the position only plays best moves while the opponent plays any book move, `n_opponent` the
/// reverse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BestPathCounts {
    pub n_player: u64,
    pub n_opponent: u64,
}

impl BestPathCounts {
    fn frontier() -> Self {
        Self {
            n_player: 1,
            n_opponent: 1,
        }
    }
}

/// Counts written by the last best-path traversal, keyed by canonical board. A board is present
/// only once its counts are complete, so a stopped traversal leaves a well formed subset.
#[derive(Debug, Default)]
pub struct BestPathOverlay {
    counts: HashMap<Board, BestPathCounts>,
}

impl BestPathOverlay {
    pub fn get(&self, board: &Board) -> Option<BestPathCounts> {
        self.counts.get(&board.canonical()).copied()
    }

    pub fn is_visited(&self, board: &Board) -> bool {
        self.counts.contains_key(&board.canonical())
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Board, &BestPathCounts)> {
        self.counts.iter()
    }
}

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;

/// Cooperative cancellation of a best-path traversal. Clones share the same state, so a clone can
/// be handed to another thread and stopped from there.
///
/// Only one traversal may run per handle at a time. Stopping while nothing runs does nothing.
#[derive(Clone, Debug, Default)]
pub struct BestPathStop {
    state: Arc<AtomicU8>,
}

impl BestPathStop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a traversal as running. Returns false when a traversal is already running.
    pub fn start(&self) -> bool {
        self.state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn stop(&self) {
        let _ = self
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire);
    }

    pub fn is_stopped(&self) -> bool {
        self.state.load(Ordering::Acquire) == STOPPING
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) != IDLE
    }

    fn finish(&self) {
        self.state.store(IDLE, Ordering::Release);
    }
}

struct RunningGuard<'a>(&'a BestPathStop);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BestPathOutcome {
    Completed {
        visited: usize,
        counts: BestPathCounts,
    },
    Stopped {
        visited: usize,
    },
}

impl BestPathOutcome {
    pub fn visited(&self) -> usize {
        match self {
            Self::Completed { visited, .. } | Self::Stopped { visited } => *visited,
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped { .. })
    }
}

struct Traversal<'a, F> {
    store: &'a PositionStore,
    window: RangeInclusive<u8>,
    stop: &'a BestPathStop,
    counts: HashMap<Board, BestPathCounts>,
    on_visit: F,
}

impl<F> Traversal<'_, F>
where
    F: FnMut(usize),
{
    /// Post-order visit, `None` once a stop was requested.
    fn visit(&mut self, board: Board) -> Option<BestPathCounts> {
        if let Some(counts) = self.counts.get(&board) {
            return Some(*counts);
        }

        if self.stop.is_stopped() {
            return None;
        }

        let store = self.store;
        let Some(position) = store.get(&board) else {
            return Some(BestPathCounts::frontier());
        };

        let counts = if position.links.is_empty() || !self.window.contains(&position.n_empties())
        {
            BestPathCounts::frontier()
        } else {
            let best = position.best_link().map(|link| link.score);
            let mut counts = BestPathCounts::default();

            for (link, child, passed) in position.linked_children() {
                let child = self.visit(child)?;
                let (same_side, other_side) = if passed {
                    (child.n_player, child.n_opponent)
                } else {
                    (child.n_opponent, child.n_player)
                };

                if Some(link.score) == best {
                    counts.n_player = counts.n_player.saturating_add(same_side);
                }
                counts.n_opponent = counts.n_opponent.saturating_add(other_side);
            }

            if self.stop.is_stopped() {
                return None;
            }
            counts
        };

        self.counts.insert(board, counts);
        (self.on_visit)(self.counts.len());

        Some(counts)
    }
}

impl Book {
    pub fn bestpath_stop(&self) -> BestPathStop {
        self.stop.clone()
    }

    /// Requests the running best-path traversal to stop.
    pub fn stop_count_bestpath(&self) {
        self.stop.stop();
    }

    pub fn bestpath(&self, board: &Board) -> Option<BestPathCounts> {
        self.bestpath.read().get(board)
    }

    pub fn bestpath_len(&self) -> usize {
        self.bestpath.read().len()
    }

    pub fn count_bestpath(&self, board: &Board) -> Result<BestPathOutcome> {
        self.count_board_bestpath(board, 0..=60, |_| {})
    }

    /// Counts best paths from `board`. Positions whose number of empty squares lies outside
    /// `window` are treated as frontier and not expanded. `on_visit` receives the number of
    /// completed positions after each one completes.
    pub fn count_board_bestpath(
        &self,
        board: &Board,
        window: RangeInclusive<u8>,
        on_visit: impl FnMut(usize),
    ) -> Result<BestPathOutcome> {
        let root = board.canonical();
        if !self.store.contains(&root) {
            bail!("Board is not in the book");
        }

        if !self.stop.start() {
            return Err(anyhow!("A best-path traversal is already running"));
        }
        let _guard = RunningGuard(&self.stop);

        let mut traversal = Traversal {
            store: &self.store,
            window,
            stop: &self.stop,
            counts: HashMap::new(),
            on_visit,
        };

        let result = traversal.visit(root);
        let visited = traversal.counts.len();
        self.bestpath.write().counts = traversal.counts;

        let outcome = match result {
            Some(counts) => BestPathOutcome::Completed { visited, counts },
            None => BestPathOutcome::Stopped { visited },
        };

        match outcome {
            BestPathOutcome::Completed { counts, .. } => {
                if self.options.verbosity > 0 {
                    info!(
                        "Best paths: {} positions, {} player / {} opponent lines",
                        visited, counts.n_player, counts.n_opponent
                    );
                }
            }
            BestPathOutcome::Stopped { .. } => {
                debug!("Best-path count stopped after {} positions", visited)
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BookOptions;
    use othello::Game;

    fn book_with_lines(lines: &[&str]) -> Book {
        let mut book = Book::new(BookOptions {
            verbosity: 0,
            seed: Some(1),
            ..BookOptions::default()
        });
        for line in lines {
            book.add_game(&line.parse::<Game>().unwrap()).unwrap();
        }
        book.negamax();
        book
    }

    #[test]
    fn test_stop_without_running_is_noop() {
        let stop = BestPathStop::new();
        stop.stop();
        assert!(!stop.is_stopped());
        assert!(stop.start());
        assert!(!stop.start());
        stop.stop();
        assert!(stop.is_stopped());
        assert!(stop.is_running());
        stop.finish();
        stop.stop();
        assert!(!stop.is_stopped());
        assert!(stop.start());
        assert!(!stop.is_stopped());
    }

    #[test]
    fn test_stop_after_finished_count_does_not_abort_next_count() {
        let book = book_with_lines(&["f5d6c3d3c4", "f5f6"]);
        let stop = book.bestpath_stop();

        let first = book.count_bestpath(&Board::initial()).unwrap();
        stop.stop();
        let second = book.count_bestpath(&Board::initial()).unwrap();

        assert!(!first.is_stopped());
        assert_eq!(second, first);
        assert!(!stop.is_running());
    }

    #[test]
    fn test_single_line_counts_one_path() {
        let book = book_with_lines(&["f5d6c3d3c4"]);
        let outcome = book.count_bestpath(&Board::initial()).unwrap();

        assert_eq!(
            outcome,
            BestPathOutcome::Completed {
                visited: 6,
                counts: BestPathCounts::frontier()
            }
        );
        assert!(book.bestpath(&Board::initial()).is_some());
    }

    #[test]
    fn test_opponent_counts_every_link() {
        let book = book_with_lines(&["f5d6", "f5f6", "f5f4"]);
        book.count_bestpath(&Board::initial()).unwrap();

        let after_f5 = Board::initial().next(othello::parse_square("f5").unwrap());
        let counts = book.bestpath(&after_f5).unwrap();
        assert_eq!(counts.n_opponent, 3);
        assert!(counts.n_player >= 1);

        let root = book.bestpath(&Board::initial()).unwrap();
        assert_eq!(root.n_player, 3);
        assert_eq!(root.n_opponent, counts.n_player);
    }

    #[test]
    fn test_unknown_board_is_an_error() {
        let book = book_with_lines(&["f5d6"]);
        let unknown = Board::initial().next(othello::parse_square("f5").unwrap()).pass();
        assert!(book.count_bestpath(&unknown).is_err());
        assert!(!book.bestpath_stop().is_running());
    }

    #[test]
    fn test_window_limits_expansion() {
        let book = book_with_lines(&["f5d6c3d3c4"]);
        let outcome = book
            .count_board_bestpath(&Board::initial(), 58..=60, |_| {})
            .unwrap();

        assert_eq!(outcome.visited(), 4);
    }
}
