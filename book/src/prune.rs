use std::collections::{HashSet, VecDeque};

use anyhow::{bail, Result};
use log::info;
use othello::Board;

use crate::{Book, Link};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed_links: usize,
    pub removed_positions: usize,
}

impl Book {
    /// Positions no link leads to.
    pub fn roots(&self) -> Vec<Board> {
        let children = self
            .store
            .iter()
            .flat_map(|position| position.linked_children().map(|(_, child, _)| child))
            .collect::<HashSet<_>>();

        self.store
            .iter()
            .map(|position| position.board)
            .filter(|board| !children.contains(board))
            .collect()
    }

    /// Canonical boards reachable from `roots` through links, roots included.
    pub fn reachable_from(&self, roots: impl IntoIterator<Item = Board>) -> HashSet<Board> {
        let mut reached = HashSet::new();
        let mut queue = roots
            .into_iter()
            .map(|board| board.canonical())
            .collect::<VecDeque<_>>();

        while let Some(board) = queue.pop_front() {
            let Some(position) = self.store.get(&board) else {
                continue;
            };
            if !reached.insert(board) {
                continue;
            }
            queue.extend(position.linked_children().map(|(_, child, _)| child));
        }

        reached
    }

    /// Removes the moves scoring worse than the best move of their position by more than the
    /// tolerated error, and the moves leading below `options.n_empties` empty squares. Positions no
    /// longer reachable from the roots, or below that depth, are removed. A removed move better
    /// than the current leaf becomes the leaf.
    pub fn prune(&mut self) -> PruneReport {
        let roots = self.roots();
        let min_empties = self.options.n_empties;
        let mut report = PruneReport::default();

        for position in self.store.iter_mut() {
            let Some(best) = position.best_score() else {
                continue;
            };
            let threshold = best - self.options.error_for(position.n_empties());
            let too_deep = position.n_empties() <= min_empties;

            let (kept, removed): (Vec<Link>, Vec<Link>) = position
                .links
                .iter()
                .copied()
                .partition(|link| !too_deep && link.score >= threshold);
            if removed.is_empty() {
                continue;
            }

            report.removed_links += removed.len();
            position.links = kept;

            let best_removed = removed.into_iter().max_by_key(|link| link.score);
            if let Some(candidate) = best_removed {
                if position.leaf.map_or(true, |leaf| leaf.score < candidate.score) {
                    position.leaf = Some(candidate);
                }
            }
        }

        let reachable = self.reachable_from(roots);
        report.removed_positions = self.store.retain(|position| {
            reachable.contains(&position.board) && position.n_empties() >= min_empties
        });

        if report.removed_links > 0 || report.removed_positions > 0 {
            self.need_saving = true;
            self.fix();
            self.negamax();
        }
        if self.options.verbosity > 0 {
            info!(
                "Prune: {} links and {} positions removed",
                report.removed_links, report.removed_positions
            );
        }

        report
    }

    /// Keeps only the positions reachable from `board`. Returns the number of positions removed.
    pub fn subtree(&mut self, board: &Board) -> Result<usize> {
        if !self.store.contains(board) {
            bail!("Board is not in the book");
        }

        let reachable = self.reachable_from([*board]);
        let removed = self
            .store
            .retain(|position| reachable.contains(&position.board));

        if removed > 0 {
            self.need_saving = true;
            self.fix();
        }
        if self.options.verbosity > 0 {
            info!("Subtree: {} positions kept, {} removed", self.len(), removed);
        }

        Ok(removed)
    }
}
