use std::collections::HashSet;

use log::info;
use othello::{inverse_square, Base, Board, Game};

use crate::{Book, Position};

impl Book {
    /// The best lines of the book as a game collection. Every line runs from a root along best
    /// moves until it reaches a position without links or one already covered by an earlier line.
    pub fn extract_skeleton(&self) -> Base {
        let mut base = Base::new();
        let mut visited = HashSet::new();

        for root in self.roots() {
            let black_to_move = root.count_empties() % 2 == 0;
            let mut line = Vec::new();
            self.skeleton_from(root, root, black_to_move, &mut line, &mut visited, &mut base);
        }

        if self.options.verbosity > 0 {
            info!("Skeleton: {} lines", base.len());
        }

        base
    }

    fn skeleton_from(
        &self,
        root: Board,
        board: Board,
        black_to_move: bool,
        line: &mut Vec<u8>,
        visited: &mut HashSet<Board>,
        base: &mut Base,
    ) {
        let (canonical, symmetry) = board.unique();
        let best = self
            .store
            .get(&canonical)
            .filter(|_| visited.insert(canonical))
            .map(|position| position.best_links().map(|link| link.square).collect::<Vec<_>>())
            .unwrap_or_default();

        if best.is_empty() {
            if !line.is_empty() {
                base.push(Game::from_board(root, black_to_move, line.clone()));
            }
            return;
        }

        for square in best {
            let square = inverse_square(square, symmetry);
            let Some((child, _)) = board.next_position(square) else {
                continue;
            };
            line.push(square);
            self.skeleton_from(root, child, black_to_move, line, visited, base);
            line.pop();
        }
    }

    /// Up to `n_positions` positions with `n_empties` empty squares, the most played first.
    pub fn extract_positions(&self, n_empties: u8, n_positions: usize) -> Vec<Position> {
        let mut positions = self
            .store
            .iter()
            .filter(|position| position.n_empties() == n_empties)
            .cloned()
            .collect::<Vec<_>>();

        positions.sort_by(|a, b| b.n_lines.cmp(&a.n_lines).then(a.board.cmp(&b.board)));
        positions.truncate(n_positions);
        positions
    }
}
