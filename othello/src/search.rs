use log::debug;

use crate::board::get_moves;
use crate::constants::CORNERS;
use crate::hash_table::{HashEntry, HashTable, SEEDED_DEPTH};
use crate::{Board, NO_MOVE, PASS, SCORE_MAX, SCORE_MIN};

/// Outcome of analysing a board at a given level.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SearchResult {
    pub best_move: u8,
    pub value: i32,
    pub lower: i32,
    pub upper: i32,
    pub level: u8,
}

impl SearchResult {
    pub fn is_exact(&self) -> bool {
        self.lower == self.upper
    }
}

/// A plain alpha-beta searcher. Boards with at most `level` empty squares are solved exactly,
/// others are searched `level` plies deep with a mobility and corner evaluation.
#[derive(Default)]
pub struct Search {
    table: HashTable,
    nodes: u64,
}

impl Search {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    pub fn clear(&mut self) {
        self.table.clear();
        self.nodes = 0;
    }

    /// Records proven bounds for a board so the next searches can cut on them.
    pub fn seed(&mut self, board: Board, lower: i32, upper: i32, best_move: u8) {
        self.table
            .store(board, HashEntry::new(lower, upper, SEEDED_DEPTH, best_move));
    }

    pub fn probe(&self, board: &Board) -> Option<HashEntry> {
        self.table.get(board).copied()
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Searches `board` ignoring the moves in `excluded`. Returns `None` when every legal move is
    /// excluded.
    pub fn analyze(&mut self, board: &Board, level: u8, excluded: u64) -> Option<SearchResult> {
        if board.is_game_over() {
            let score = board.final_score();
            return Some(SearchResult {
                best_move: NO_MOVE,
                value: score,
                lower: score,
                upper: score,
                level,
            });
        }

        if !board.can_move() {
            let passed = self.analyze(&board.pass(), level, 0)?;
            return Some(SearchResult {
                best_move: PASS,
                value: -passed.value,
                lower: -passed.upper,
                upper: -passed.lower,
                level,
            });
        }

        let moves = board.get_moves() & !excluded;
        if moves == 0 {
            return None;
        }

        let empties = board.count_empties();
        let exact = empties <= level;
        let depth = if exact { empties } else { level.max(1) };
        let tt_move = self.probe(board).map_or(NO_MOVE, |e| e.best_move);

        let mut alpha = SCORE_MIN - 1;
        let beta = SCORE_MAX + 1;
        let mut best_move = NO_MOVE;

        for square in ordered_moves(moves, tt_move) {
            let score = -self.negamax(&board.next(square), depth - 1, -beta, -alpha);
            if score > alpha {
                alpha = score;
                best_move = square;
            }
        }

        debug!(
            "analyzed {} empties at level {}: {} ({} nodes)",
            empties, level, alpha, self.nodes
        );

        Some(SearchResult {
            best_move,
            value: alpha,
            lower: if exact { alpha } else { SCORE_MIN },
            upper: if exact { alpha } else { SCORE_MAX },
            level,
        })
    }

    fn negamax(&mut self, board: &Board, depth: u8, mut alpha: i32, mut beta: i32) -> i32 {
        self.nodes += 1;

        let moves = board.get_moves();
        if moves == 0 {
            let passed = board.pass();
            if !passed.can_move() {
                return board.final_score();
            }
            return -self.negamax(&passed, depth, -beta, -alpha);
        }

        if depth == 0 {
            return evaluate(board);
        }

        let mut tt_move = NO_MOVE;
        if let Some(entry) = self.probe(board) {
            tt_move = entry.best_move;
            if entry.depth >= depth {
                if entry.lower >= beta {
                    return entry.lower;
                }
                if entry.upper <= alpha || entry.is_exact() {
                    return entry.upper;
                }
                alpha = alpha.max(entry.lower);
                beta = beta.min(entry.upper);
            }
        }

        let alpha_orig = alpha;
        let mut best = SCORE_MIN - 1;
        let mut best_move = NO_MOVE;

        for square in ordered_moves(moves, tt_move) {
            let score = -self.negamax(&board.next(square), depth - 1, -beta, -alpha);
            if score > best {
                best = score;
                best_move = square;
                if score > alpha {
                    alpha = score;
                    if alpha >= beta {
                        break;
                    }
                }
            }
        }

        let (lower, upper) = if best <= alpha_orig {
            (SCORE_MIN, best)
        } else if best >= beta {
            (best, SCORE_MAX)
        } else {
            (best, best)
        };
        self.table
            .store(*board, HashEntry::new(lower, upper, depth, best_move));

        best
    }
}

fn ordered_moves(moves: u64, first: u8) -> impl Iterator<Item = u8> {
    let first_bit = if first < 64 { moves & (1 << first) } else { 0 };
    let corners = moves & CORNERS & !first_bit;
    let rest = moves & !CORNERS & !first_bit;

    common::iter_bit_indexes(first_bit)
        .chain(common::iter_bit_indexes(corners))
        .chain(common::iter_bit_indexes(rest))
        .map(|index| index as u8)
}

fn evaluate(board: &Board) -> i32 {
    let mobility = board.get_moves().count_ones() as i32
        - get_moves(board.opponent, board.player).count_ones() as i32;
    let corners = (board.player & CORNERS).count_ones() as i32
        - (board.opponent & CORNERS).count_ones() as i32;
    let discs = board.player.count_ones() as i32 - board.opponent.count_ones() as i32;

    (2 * mobility + 6 * corners + discs / 4).clamp(SCORE_MIN + 1, SCORE_MAX - 1)
}
