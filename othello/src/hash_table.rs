use std::collections::HashMap;

use crate::{Board, NO_MOVE, SCORE_MAX, SCORE_MIN};

/// Proven bounds of a board searched to `depth` plies. Entries seeded from outside the search use
/// `SEEDED_DEPTH` so that they are never replaced.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HashEntry {
    pub lower: i32,
    pub upper: i32,
    pub depth: u8,
    pub best_move: u8,
}

pub const SEEDED_DEPTH: u8 = u8::MAX;

const MAX_ENTRIES: usize = 1 << 20;

impl HashEntry {
    pub fn new(lower: i32, upper: i32, depth: u8, best_move: u8) -> Self {
        Self {
            lower,
            upper,
            depth,
            best_move,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.lower == self.upper
    }
}

impl Default for HashEntry {
    fn default() -> Self {
        Self::new(SCORE_MIN, SCORE_MAX, 0, NO_MOVE)
    }
}

#[derive(Default)]
pub struct HashTable {
    entries: HashMap<Board, HashEntry>,
}

impl HashTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, board: &Board) -> Option<&HashEntry> {
        self.entries.get(board)
    }

    /// Stores an entry unless a deeper one is already present for the board.
    pub fn store(&mut self, board: Board, entry: HashEntry) {
        if self.entries.len() >= MAX_ENTRIES && !self.entries.contains_key(&board) {
            self.entries.retain(|_, e| e.depth == SEEDED_DEPTH);
        }

        match self.entries.get_mut(&board) {
            Some(existing) if existing.depth > entry.depth => {}
            Some(existing) => *existing = entry,
            None => {
                self.entries.insert(board, entry);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
