use anyhow::{Context, Result};
use log::{info, warn};
use othello::{symmetric_square, Base, Game};

use crate::book::link_score;
use crate::{Book, Link};

/// Outcome of `Book::check_base`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub n_games: usize,
    /// Games whose every position is in the book.
    pub n_complete: usize,
    pub n_illegal: usize,
    /// Positions of the games, final ones included, missing from the book.
    pub n_missing: usize,
    /// Moves of the games that are not among the best book moves.
    pub n_deviations: usize,
}

impl Book {
    /// Adds every position of a game, links the moves played and updates the game statistics of
    /// the positions along the line. The game is validated before anything changes. Returns the
    /// number of positions created.
    pub fn add_game(&mut self, game: &Game) -> Result<usize> {
        let (plies, last) = game.plies()?;
        let final_black = game.final_score_black()?;
        let mut created = 0;

        let mut boards = plies.iter().map(|ply| ply.state).collect::<Vec<_>>();
        boards.push(last);

        for state in &boards {
            if self.store.add(state.board).1 {
                created += 1;
            }
        }

        for ply in &plies {
            let (canonical, symmetry) = ply.state.board.unique();
            let square = symmetric_square(ply.square, symmetry);
            let Some(position) = self.store.get(&canonical) else {
                continue;
            };
            let Some((child, passed)) = position.child(square) else {
                continue;
            };
            let Some(child) = self.store.get(&child) else {
                continue;
            };
            let link = Link::new(square, link_score(child, passed));

            if let Some(position) = self.store.get_mut(&canonical) {
                if !position.has_link(square) {
                    position.add_link(link);
                }
            }
        }

        for state in &boards {
            let Some(position) = self.store.find_mut(&state.board) else {
                continue;
            };
            position.n_lines = position.n_lines.saturating_add(1);
            if let Some(score) = final_black {
                let score = if state.black_to_move { score } else { -score };
                match score.signum() {
                    1 => position.n_wins = position.n_wins.saturating_add(1),
                    0 => position.n_draws = position.n_draws.saturating_add(1),
                    _ => position.n_losses = position.n_losses.saturating_add(1),
                }
            }
        }

        self.need_saving = true;
        Ok(created)
    }

    /// Adds the games of a collection, skipping the illegal ones. Returns the number of positions
    /// created.
    pub fn add_base(&mut self, base: &Base) -> Result<usize> {
        let mut created = 0;
        let mut rejected = 0;

        for (index, game) in base.iter().enumerate() {
            match self
                .add_game(game)
                .with_context(|| format!("Game {}", index + 1))
            {
                Ok(n) => created += n,
                Err(err) => {
                    warn!("{:#}", err);
                    rejected += 1;
                }
            }
        }

        if self.options.verbosity > 0 {
            info!(
                "Added {} games: {} new positions, {} games rejected",
                base.len(),
                created,
                rejected
            );
        }

        Ok(created)
    }

    /// Compares a game collection with the book without changing it.
    pub fn check_base(&self, base: &Base) -> CheckReport {
        let mut report = CheckReport::default();

        for game in base.iter() {
            report.n_games += 1;
            let Ok((plies, last)) = game.plies() else {
                report.n_illegal += 1;
                continue;
            };

            let mut complete = true;
            if !self.store.contains(&last.board) {
                report.n_missing += 1;
                complete = false;
            }
            for ply in &plies {
                let (canonical, symmetry) = ply.state.board.unique();
                let Some(position) = self.store.get(&canonical) else {
                    report.n_missing += 1;
                    complete = false;
                    continue;
                };

                let square = symmetric_square(ply.square, symmetry);
                let is_best = position.best_links().any(|link| link.square == square)
                    || position
                        .leaf
                        .zip(position.best_score())
                        .map_or(false, |(leaf, best)| leaf.square == square && leaf.score == best);
                if !is_best {
                    report.n_deviations += 1;
                }
            }

            if complete {
                report.n_complete += 1;
            }
        }

        if self.options.verbosity > 0 {
            info!("Check: {:?}", report);
        }

        report
    }
}
