use std::collections::HashSet;

use anyhow::{anyhow, bail, Result};
use itertools::Itertools;
use log::{debug, info};
use othello::Board;

use crate::{Book, Link};

/// Levels added to a position's level when `enhance` re-analyses it.
const ENHANCE_LEVEL_STEP: u8 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    pub updated: usize,
}

impl Book {
    fn require_search(&self) -> Result<()> {
        if self.search.is_none() {
            bail!("No search attached to the book");
        }
        Ok(())
    }

    fn require_board(&self, board: &Board) -> Result<Board> {
        let canonical = board.canonical();
        if !self.store.contains(&canonical) {
            return Err(anyhow!("Board is not in the book\n{}", board));
        }
        Ok(canonical)
    }

    /// Re-analyses the TODO positions and those analysed below the configured level, then
    /// propagates. Returns the number of positions analysed.
    pub fn deepen(&mut self) -> Result<usize> {
        self.require_search()?;

        let level = self.options.level;
        let targets = self
            .boards_by_empties()
            .into_iter()
            .filter(|board| {
                self.store.get(board).map_or(false, |position| {
                    !position.is_game_over() && (position.flags.todo || position.level < level)
                })
            })
            .collect::<Vec<_>>();

        let mut analysed = 0;
        for (index, board) in targets.iter().enumerate() {
            if self.analyze_position(board, level) {
                analysed += 1;
            }
            if self.options.verbosity > 1 {
                debug!("Deepen {}/{}", index + 1, targets.len());
            }
        }

        self.negamax();
        if self.options.verbosity > 0 {
            info!("Deepen: {} positions analysed at level {}", analysed, level);
        }

        Ok(analysed)
    }

    /// Merges the positions of `other`. A board known to both keeps the analysis of the higher
    /// level, the tighter bounds on equal levels, gains the links it lacked and sums the game
    /// statistics.
    pub fn merge(&mut self, other: &Book) -> MergeReport {
        let mut report = MergeReport::default();

        for theirs in other.store.iter() {
            let Some(ours) = self.store.get_mut(&theirs.board) else {
                self.store.insert(theirs.clone());
                report.added += 1;
                continue;
            };

            let width = |score: &crate::Score| score.upper - score.lower;
            let better = theirs.level > ours.level
                || (theirs.level == ours.level && width(&theirs.score) < width(&ours.score));
            if better {
                ours.score = theirs.score;
                ours.level = theirs.level;
                ours.leaf = theirs.leaf;
                ours.flags.todo = theirs.flags.todo;
                ours.update_done();
                report.updated += 1;
            }

            for link in &theirs.links {
                if !ours.has_link(link.square) {
                    ours.add_link(*link);
                }
            }
            if ours.leaf.map_or(false, |leaf| ours.has_link(leaf.square)) {
                ours.leaf = None;
            }
            ours.add_stats(theirs);
        }

        self.need_saving = true;
        if self.options.verbosity > 0 {
            info!(
                "Merge: {} positions added, {} updated",
                report.added, report.updated
            );
        }

        report
    }

    /// Expands leaves until every position with more than `n_empties` empty squares has its moves
    /// within the tolerated error linked. New positions are TODO, and analysed when a search is
    /// attached. Returns the number of positions added.
    pub fn fill(&mut self, n_empties: u8) -> usize {
        let mut added = 0;

        loop {
            let candidates = self
                .store
                .iter()
                .filter(|position| position.n_empties() > n_empties)
                .filter(|position| self.leaf_is_playable(position))
                .map(|position| position.board)
                .collect::<Vec<_>>();

            let before = self.len();
            let mut expanded = 0;
            for board in &candidates {
                if self.expand_leaf(board).is_some() {
                    expanded += 1;
                }
            }
            let new = self.len() - before;
            added += new;

            if self.options.verbosity > 1 {
                debug!("Fill: {} leaves expanded, {} new", expanded, new);
            }
            if expanded == 0 || self.search.is_none() {
                break;
            }
        }

        self.negamax();
        if self.options.verbosity > 0 {
            info!("Fill: {} positions added down to {} empties", added, n_empties);
        }

        added
    }

    /// Broadens the book around `board`: within `depth` plies, positions get up to `width` moves
    /// linked by expanding their leaves. Returns the number of positions added.
    pub fn deviate(&mut self, board: &Board, width: usize, depth: usize) -> Result<usize> {
        let root = self.require_board(board)?;
        let before = self.len();
        let mut visited = HashSet::new();

        self.deviate_from(root, width, depth, &mut visited);
        self.negamax();

        let added = self.len() - before;
        if self.options.verbosity > 0 {
            info!(
                "Deviate: {} positions added, {} visited",
                added,
                visited.len()
            );
        }

        Ok(added)
    }

    fn deviate_from(
        &mut self,
        board: Board,
        width: usize,
        depth: usize,
        visited: &mut HashSet<Board>,
    ) {
        if depth == 0 || !visited.insert(board) {
            return;
        }

        while let Some(position) = self.store.get(&board) {
            if position.links.len() >= width || position.leaf.is_none() {
                break;
            }
            if self.expand_leaf(&board).is_none() || self.search.is_none() {
                break;
            }
        }

        for child in self.best_children(&board, width) {
            self.deviate_from(child, width, depth - 1, visited);
        }
    }

    /// Re-analyses the unsolved positions around `board` one step deeper than their current
    /// level, following up to `width` best moves for `depth` plies. Returns the number of
    /// positions analysed.
    pub fn enhance(&mut self, board: &Board, width: usize, depth: usize) -> Result<usize> {
        self.require_search()?;
        let root = self.require_board(board)?;

        let mut visited = HashSet::new();
        let mut frontier = vec![root];
        for _ in 0..depth {
            let mut next = Vec::new();
            for board in frontier {
                if visited.insert(board) {
                    next.extend(self.best_children(&board, width));
                }
            }
            frontier = next;
        }

        let mut analysed = 0;
        for board in &visited {
            let Some(position) = self.store.get(board) else {
                continue;
            };
            if position.is_solved() {
                continue;
            }
            let level = position
                .level
                .max(self.options.level)
                .saturating_add(ENHANCE_LEVEL_STEP);
            if self.analyze_position(board, level) {
                analysed += 1;
            }
        }

        self.negamax();
        if self.options.verbosity > 0 {
            info!("Enhance: {} positions re-analysed", analysed);
        }

        Ok(analysed)
    }

    /// Expands the principal lines: along the best moves from the roots, every leaf scoring at
    /// least as well as the links is played into a new position. Returns the number of leaves
    /// expanded.
    pub fn play(&mut self) -> usize {
        let mut expanded = 0;
        let mut visited = HashSet::new();
        let mut stack = self.roots();

        while let Some(board) = stack.pop() {
            if !visited.insert(board) {
                continue;
            }
            let Some(position) = self.store.get(&board) else {
                continue;
            };

            let leaf_is_best = match (position.leaf, position.best_link()) {
                (Some(leaf), Some(best)) => leaf.score >= best.score,
                (Some(_), None) => true,
                _ => false,
            };
            if leaf_is_best && self.expand_leaf(&board).is_some() {
                expanded += 1;
            }

            stack.extend(self.best_children(&board, 1));
        }

        self.negamax();
        if self.options.verbosity > 0 {
            info!("Play: {} leaves expanded", expanded);
        }

        expanded
    }

    /// Children reached by the `width` best links of a position.
    pub(crate) fn best_children(&self, board: &Board, width: usize) -> Vec<Board> {
        let Some(position) = self.store.get(board) else {
            return Vec::new();
        };

        position
            .links
            .iter()
            .sorted_by(|a, b| b.score.cmp(&a.score).then(a.square.cmp(&b.square)))
            .take(width)
            .filter_map(|link: &Link| position.child(link.square).map(|(child, _)| child))
            .filter(|child| self.store.contains(child))
            .collect()
    }

    /// Whether the leaf of a position is worth playing: it exists and scores within the tolerated
    /// error of the best move.
    fn leaf_is_playable(&self, position: &crate::Position) -> bool {
        let Some(leaf) = position.leaf else {
            return false;
        };
        let error = self.options.error_for(position.n_empties());
        position
            .best_score()
            .map_or(true, |best| leaf.score >= best - error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BookOptions, Position, Score};
    use othello::{parse_square, Game, Search};

    fn options() -> BookOptions {
        BookOptions {
            level: 2,
            verbosity: 0,
            seed: Some(9),
            ..BookOptions::default()
        }
    }

    fn sq(name: &str) -> u8 {
        parse_square(name).unwrap()
    }

    fn game_book(lines: &[&str]) -> Book {
        let mut book = Book::new(options());
        for line in lines {
            book.add_game(&line.parse::<Game>().unwrap()).unwrap();
        }
        book
    }

    #[test]
    fn test_deepen_requires_search() {
        let mut book = game_book(&["f5d6"]);
        assert!(book.deepen().is_err());
    }

    #[test]
    fn test_deepen_analyses_todo_positions() {
        let mut book = game_book(&["f5d6c3"]).with_search(Search::new());
        assert!(book.positions().iter().all(|p| p.flags.todo));

        let analysed = book.deepen().unwrap();

        assert_eq!(analysed, 4);
        for position in book.positions().iter() {
            assert!(!position.flags.todo);
            assert!(position.level >= 2);
            assert!(position.score.lower <= position.score.value);
            assert!(position.score.value <= position.score.upper);
        }
    }

    #[test]
    fn test_deepen_keeps_higher_level() {
        let mut book = game_book(&["f5"]).with_search(Search::new());
        let after_f5 = Board::initial().next(sq("f5")).canonical();
        {
            let position = book.store.get_mut(&after_f5).unwrap();
            position.level = 20;
            position.score = Score::new(7, -64, 64);
            position.flags.todo = true;
        }

        book.deepen().unwrap();

        let position = book.find(&after_f5).unwrap();
        assert_eq!(position.level, 20);
        assert_eq!(position.score.value, 7);
        assert!(!position.flags.todo);
        assert_eq!(book.deepen().unwrap(), 0);
        assert!(!book.find(&after_f5).unwrap().flags.todo);
    }

    #[test]
    fn test_merge_with_copy_doubles_stats() {
        let lines = ["f5d6c3", "f5f6e6f4"];
        let mut book = game_book(&lines);
        book.negamax();
        let copy = {
            let mut copy = game_book(&lines);
            copy.negamax();
            copy
        };
        let before = book.positions().iter().cloned().collect::<Vec<Position>>();

        let report = book.merge(&copy);

        assert_eq!(report, MergeReport::default());
        for old in before {
            let merged = book.find(&old.board).unwrap();
            assert_eq!(merged.score, old.score);
            assert_eq!(merged.links, old.links);
            assert_eq!(merged.n_lines, old.n_lines * 2);
            assert_eq!(merged.n_wins, old.n_wins * 2);
            assert_eq!(merged.n_draws, old.n_draws * 2);
            assert_eq!(merged.n_losses, old.n_losses * 2);
        }
    }

    #[test]
    fn test_merge_prefers_higher_level_and_adds_missing() {
        let mut book = game_book(&["f5d6"]);
        let mut other = game_book(&["f5f6"]);
        let after_f5 = Board::initial().next(sq("f5")).canonical();
        {
            let position = other.store.get_mut(&after_f5).unwrap();
            position.level = 12;
            position.score = Score::new(-3, -10, 4);
        }

        let report = book.merge(&other);

        assert_eq!(report.added, 1);
        assert_eq!(report.updated, 1);
        let position = book.find(&after_f5).unwrap();
        assert_eq!(position.level, 12);
        assert_eq!(position.score, Score::new(-3, -10, 4));
        assert_eq!(position.links.len(), 2);
    }

    #[test]
    fn test_fill_without_search_expands_playable_leaves() {
        let mut book = game_book(&["f5"]);
        let after_f5 = Board::initial().next(sq("f5")).canonical();
        let square = book.find(&after_f5).unwrap().board.legal_squares().next().unwrap();
        book.store.get_mut(&after_f5).unwrap().leaf = Some(Link::new(square, 0));

        assert_eq!(book.fill(50), 1);
        assert_eq!(book.find(&after_f5).unwrap().links.len(), 1);
        assert_eq!(book.fill(50), 0);
    }

    #[test]
    fn test_fill_with_search_stops_at_target() {
        let mut book = Book::new(BookOptions {
            midgame_error: 0,
            ..options()
        })
        .with_search(Search::new());
        book.add_board(&Board::initial()).unwrap();
        book.deepen().unwrap();

        let added = book.fill(57);

        assert!(added >= 3);
        assert!(book.positions().iter().all(|p| p.n_empties() >= 57));
    }

    #[test]
    fn test_deviate_broadens_lines() {
        let mut book = Book::new(options()).with_search(Search::new());
        book.add_board(&Board::initial().next(sq("f5"))).unwrap();
        book.deepen().unwrap();

        let added = book
            .deviate(&Board::initial().next(sq("f5")), 3, 1)
            .unwrap();

        assert_eq!(added, 3);
        let position = book.find(&Board::initial().next(sq("f5"))).unwrap();
        assert_eq!(position.links.len(), 3);
        assert!(book.deviate(&Board::initial(), 2, 2).is_err());
    }

    #[test]
    fn test_enhance_raises_level() {
        let mut book = game_book(&["f5d6"]).with_search(Search::new());
        book.deepen().unwrap();

        let analysed = book.enhance(&Board::initial(), 1, 3).unwrap();

        assert!(analysed >= 1);
        let leaf = book
            .find(&Board::initial().next(sq("f5")).next(sq("d6")))
            .unwrap();
        assert!(leaf.level > 2);
    }

    #[test]
    fn test_play_expands_best_leaf() {
        let mut book = game_book(&["f5"]);
        let root = Board::initial().canonical();
        let after_f5 = Board::initial().next(sq("f5")).canonical();
        let square = book.find(&after_f5).unwrap().board.legal_squares().next().unwrap();
        book.store.get_mut(&after_f5).unwrap().leaf = Some(Link::new(square, 5));
        book.store.get_mut(&root).unwrap().leaf = None;

        assert_eq!(book.play(), 1);
        assert_eq!(book.len(), 3);
    }

    #[test]
    fn test_best_children_orders_by_score() {
        let mut book = Book::new(options());
        let root = Board::initial().next(sq("f5"));
        for (square, value) in [("d6", 3), ("f6", -2), ("f4", 0)] {
            let mut position = Position::new(root.next(sq(square)));
            position.score = Score::new(value, -64, 64);
            book.store.insert(position);
        }
        book.add_board(&root).unwrap();
        book.link();

        let children = book.best_children(&root.canonical(), 2);
        assert_eq!(
            children,
            vec![
                root.next(sq("f6")).canonical(),
                root.next(sq("f4")).canonical()
            ]
        );
    }
}
