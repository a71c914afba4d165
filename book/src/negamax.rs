use log::{debug, info, warn};
use othello::{Board, SCORE_MAX, SCORE_MIN};

use crate::book::link_score;
use crate::{Book, Link, Score};

struct Propagation {
    links: Vec<Link>,
    score: Score,
    all_children_solved: bool,
}

impl Book {
    /// Boards ordered from the fewest empty squares up, so children come before their parents.
    pub(crate) fn boards_by_empties(&self) -> Vec<Board> {
        let mut boards = self
            .store
            .iter()
            .map(|position| (position.n_empties(), position.board))
            .collect::<Vec<_>>();
        boards.sort_unstable();
        boards.into_iter().map(|(_, board)| board).collect()
    }

    /// Back-propagates scores and bounds from the most advanced positions to the roots. Solved
    /// positions keep their exact score. Returns the number of positions whose score changed.
    pub fn negamax(&mut self) -> usize {
        let mut changed = 0;

        for board in self.boards_by_empties() {
            let Some(propagation) = self.propagate(&board) else {
                continue;
            };
            let Some(position) = self.store.get_mut(&board) else {
                continue;
            };

            position.links = propagation.links;
            if !position.is_solved() && position.score != propagation.score {
                position.score = propagation.score;
                changed += 1;
            }
            position.update_done();
        }

        if changed > 0 {
            self.need_saving = true;
        }
        if self.options.verbosity > 0 {
            info!("Negamax: {} positions updated", changed);
        }

        changed
    }

    /// Finalises positions whose every legal move leads to a solved position, and corrects solved
    /// positions whose exact score disagrees with such children. Returns the number of positions
    /// changed.
    pub fn correct_solved(&mut self) -> usize {
        let mut changed = 0;

        for board in self.boards_by_empties() {
            let Some(propagation) = self.propagate(&board) else {
                continue;
            };
            if !propagation.all_children_solved {
                continue;
            }
            let Some(position) = self.store.get_mut(&board) else {
                continue;
            };

            let exact = propagation.score;
            if position.score != exact {
                if position.is_solved() {
                    warn!(
                        "Solved score {} corrected to {}",
                        position.score.value, exact.value
                    );
                } else {
                    debug!("Position solved at {}", exact.value);
                }
                position.links = propagation.links;
                position.score = exact;
                position.leaf = None;
                changed += 1;
            }
            position.update_done();
        }

        if changed > 0 {
            self.need_saving = true;
        }
        if self.options.verbosity > 0 {
            info!("Correct solved: {} positions updated", changed);
        }

        changed
    }

    /// Score of a position derived from its links. `None` for positions without links.
    fn propagate(&self, board: &Board) -> Option<Propagation> {
        let position = self.store.get(board)?;
        if position.links.is_empty() || position.is_game_over() {
            return None;
        }

        let mut links = Vec::with_capacity(position.links.len());
        let mut lower = SCORE_MIN;
        let mut upper = SCORE_MIN;
        let mut complete = position.is_fully_linked();
        let mut all_children_solved = complete;

        for link in &position.links {
            let child = position
                .child(link.square)
                .and_then(|(child, passed)| Some((self.store.get(&child)?, passed)));

            match child {
                Some((child, passed)) => {
                    let (child_lower, child_upper) = if passed {
                        (child.score.lower, child.score.upper)
                    } else {
                        (-child.score.upper, -child.score.lower)
                    };
                    lower = lower.max(child_lower);
                    upper = upper.max(child_upper);
                    all_children_solved &= child.is_solved();
                    links.push(Link::new(link.square, link_score(child, passed)));
                }
                None => {
                    complete = false;
                    all_children_solved = false;
                    links.push(*link);
                }
            }
        }

        if !complete {
            upper = SCORE_MAX;
        }

        let value = links
            .iter()
            .chain(position.leaf.iter().filter(|_| !all_children_solved))
            .map(|link| link.score)
            .max()
            .unwrap_or(position.score.value);

        let mut score = Score::new(value, lower, upper);
        score.clamp();

        Some(Propagation {
            links,
            score,
            all_children_solved,
        })
    }
}
