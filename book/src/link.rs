use std::collections::HashSet;

use log::{debug, info};
use othello::Board;

use crate::book::link_score;
use crate::{Book, Link, Score};

/// Changes applied by `Book::fix`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixReport {
    pub dropped_links: usize,
    pub dropped_leaves: usize,
    pub rescored_links: usize,
    pub marked_todo: usize,
    pub solved_game_overs: usize,
}

impl FixReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

impl Book {
    /// Links every legal move whose resulting position is already in the book. Positions left
    /// with unlinked moves get their best remaining move analysed when a search is attached,
    /// otherwise they are marked TODO. Returns the number of links added.
    pub fn link(&mut self) -> usize {
        let mut added = 0;
        let mut missing_leaf = Vec::new();

        for board in self.store.boards() {
            let Some(position) = self.store.get(&board) else {
                continue;
            };

            let new_links = common::iter_bit_indexes(position.unlinked_moves())
                .map(|index| index as u8)
                .filter_map(|square| {
                    let (child, passed) = position.child(square)?;
                    let child = self.store.get(&child)?;
                    Some(Link::new(square, link_score(child, passed)))
                })
                .collect::<Vec<_>>();

            let Some(position) = self.store.get_mut(&board) else {
                continue;
            };
            added += new_links.len();
            for link in new_links {
                position.add_link(link);
            }

            let leaf_is_stale = position
                .leaf
                .map_or(true, |leaf| position.has_link(leaf.square));
            if leaf_is_stale && !position.is_fully_linked() {
                position.leaf = None;
                missing_leaf.push(board);
            } else if position.is_fully_linked() {
                position.leaf = None;
            }
        }

        if self.search.is_some() {
            for board in &missing_leaf {
                self.refresh_leaf(board);
            }
        } else {
            for board in &missing_leaf {
                if let Some(position) = self.store.get_mut(board) {
                    position.flags.todo = true;
                }
            }
        }

        if added > 0 || !missing_leaf.is_empty() {
            self.need_saving = true;
        }
        if self.options.verbosity > 0 {
            info!(
                "Linked {} moves, {} positions without leaf",
                added,
                missing_leaf.len()
            );
        }

        added
    }

    /// Repairs the graph: links to missing positions, illegal or duplicated moves are dropped,
    /// invalid leaves are removed, positions left without any move become TODO, and link scores are
    /// refreshed from the positions they lead to. Running it twice leaves nothing to repair.
    pub fn fix(&mut self) -> FixReport {
        let mut report = FixReport::default();
        let boards = self.store.boards();
        let known = boards.iter().copied().collect::<HashSet<Board>>();

        for board in &boards {
            let Some(position) = self.store.get_mut(board) else {
                continue;
            };

            if position.is_game_over() {
                let score = position.board.final_score();
                if position.score != Score::exact(score)
                    || !position.links.is_empty()
                    || position.leaf.is_some()
                {
                    position.links.clear();
                    position.leaf = None;
                    position.set_solved(score);
                    report.solved_game_overs += 1;
                }
                position.flags.done = true;
                position.flags.todo = false;
                continue;
            }

            let mut seen = 0u64;
            let before = position.links.len();
            let parent = position.board;
            position.links.retain(|link| {
                let valid = parent.is_legal(link.square)
                    && seen & (1 << link.square) == 0
                    && parent
                        .next_position(link.square)
                        .map_or(false, |(child, _)| known.contains(&child.canonical()));
                if valid {
                    seen |= 1 << link.square;
                }
                valid
            });
            position.links.sort_by_key(|link| link.square);
            report.dropped_links += before - position.links.len();

            if let Some(leaf) = position.leaf {
                if !parent.is_legal(leaf.square) || position.has_link(leaf.square) {
                    debug!("Dropping invalid leaf {}", leaf);
                    position.leaf = None;
                    report.dropped_leaves += 1;
                }
            }

            if position.links.is_empty() && position.leaf.is_none() {
                if !position.flags.todo {
                    position.flags.todo = true;
                    report.marked_todo += 1;
                }
                if !position.is_solved() && position.level > 0 {
                    position.score = Score::default();
                    position.level = 0;
                }
            }
        }

        for board in &boards {
            let Some(position) = self.store.get(board) else {
                continue;
            };
            let scores = position
                .linked_children()
                .filter_map(|(link, child, passed)| {
                    let score = link_score(self.store.get(&child)?, passed);
                    (score != link.score).then_some(Link::new(link.square, score))
                })
                .collect::<Vec<_>>();

            if let Some(position) = self.store.get_mut(board) {
                report.rescored_links += scores.len();
                for link in scores {
                    position.add_link(link);
                }
            }
        }

        if !report.is_clean() {
            self.need_saving = true;
        }
        if self.options.verbosity > 0 {
            info!("Fix: {:?}", report);
        }

        report
    }
}
