use std::collections::HashMap;

use othello::Board;

use crate::Position;

/// Deduplicated positions keyed by canonical board. Positions live in a flat vector with an index
/// from board to slot; removing positions compacts the vector and rebuilds the index.
#[derive(Clone, Debug, Default)]
pub struct PositionStore {
    positions: Vec<Position>,
    index: HashMap<Board, usize>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(positions: Vec<Position>) -> Self {
        let mut store = Self::new();
        for position in positions {
            store.insert(position);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.index.clear();
    }

    /// Returns the position of `board`, creating an unexpanded one when the board is new. The flag
    /// tells whether a position was created.
    pub fn add(&mut self, board: Board) -> (&mut Position, bool) {
        let board = board.canonical();
        match self.index.get(&board).copied() {
            Some(slot) => (&mut self.positions[slot], false),
            None => {
                let slot = self.push(Position::new(board));
                (&mut self.positions[slot], true)
            }
        }
    }

    /// Inserts a position, replacing any existing entry for the same board. Returns true when the
    /// board was new.
    ///
    /// Only the board is turned into its canonical form. A position carrying moves must already be
    /// canonical, its moves being kept as they are.
    pub fn insert(&mut self, mut position: Position) -> bool {
        let canonical = position.board.canonical();
        debug_assert!(
            canonical == position.board || (position.links.is_empty() && position.leaf.is_none()),
            "moves of a non canonical position"
        );
        position.board = canonical;
        match self.index.get(&position.board).copied() {
            Some(slot) => {
                self.positions[slot] = position;
                false
            }
            None => {
                self.push(position);
                true
            }
        }
    }

    pub fn contains(&self, board: &Board) -> bool {
        self.index.contains_key(&board.canonical())
    }

    pub fn find(&self, board: &Board) -> Option<&Position> {
        self.slot(board).map(|slot| &self.positions[slot])
    }

    pub fn find_mut(&mut self, board: &Board) -> Option<&mut Position> {
        let slot = self.slot(board)?;
        self.positions.get_mut(slot)
    }

    /// Lookup of a board already in canonical form.
    pub fn get(&self, canonical: &Board) -> Option<&Position> {
        self.index.get(canonical).map(|&slot| &self.positions[slot])
    }

    pub fn get_mut(&mut self, canonical: &Board) -> Option<&mut Position> {
        let slot = *self.index.get(canonical)?;
        self.positions.get_mut(slot)
    }

    /// Removes the position of `board` and every link leading to it.
    pub fn remove(&mut self, board: &Board) -> Option<Position> {
        let board = board.canonical();
        let slot = self.index.remove(&board)?;
        let removed = self.positions.swap_remove(slot);
        if let Some(moved) = self.positions.get(slot) {
            self.index.insert(moved.board, slot);
        }

        for position in self.positions.iter_mut() {
            let dangling = position
                .linked_children()
                .filter(|(_, child, _)| *child == board)
                .map(|(link, _, _)| link.square)
                .collect::<Vec<_>>();
            for square in dangling {
                position.remove_link(square);
            }
        }

        Some(removed)
    }

    /// Keeps the positions for which `keep` returns true and compacts the storage. Links are left
    /// untouched, `fix` drops those left dangling.
    pub fn retain(&mut self, mut keep: impl FnMut(&Position) -> bool) -> usize {
        let before = self.positions.len();
        self.positions.retain(|position| keep(position));
        self.rebuild_index();
        before - self.positions.len()
    }

    /// Orders the positions by board so iteration and serialization are deterministic.
    pub fn sort(&mut self) {
        self.positions.sort_by(|a, b| a.board.cmp(&b.board));
        self.rebuild_index();
    }

    pub fn is_sorted(&self) -> bool {
        self.positions
            .windows(2)
            .all(|pair| pair[0].board <= pair[1].board)
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.positions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Position> {
        self.positions.iter_mut()
    }

    pub fn boards(&self) -> Vec<Board> {
        self.positions.iter().map(|position| position.board).collect()
    }

    pub fn into_positions(self) -> Vec<Position> {
        self.positions
    }

    fn slot(&self, board: &Board) -> Option<usize> {
        self.index.get(&board.canonical()).copied()
    }

    fn push(&mut self, position: Position) -> usize {
        let slot = self.positions.len();
        self.index.insert(position.board, slot);
        self.positions.push(position);
        slot
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .positions
            .iter()
            .enumerate()
            .map(|(slot, position)| (position.board, slot))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Link;
    use othello::parse_square;

    fn f5() -> u8 {
        parse_square("f5").unwrap()
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut store = PositionStore::new();
        let (_, created) = store.add(Board::initial());
        assert!(created);
        let (_, created) = store.add(Board::initial());
        assert!(!created);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_symmetric_boards_share_a_position() {
        let mut store = PositionStore::new();
        let board = Board::initial().next(f5());
        store.add(board);
        for symmetry in 0..8 {
            assert!(store.contains(&board.symmetry(symmetry)));
            store.add(board.symmetry(symmetry));
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_stores_canonical_board() {
        let mut store = PositionStore::new();
        let board = Board::initial().next(f5());
        for symmetry in 0..8 {
            store.insert(Position::new(board.symmetry(symmetry)));
        }

        assert_eq!(store.len(), 1);
        assert_eq!(store.find(&board).unwrap().board, board.canonical());
    }

    #[test]
    fn test_remove_drops_incoming_links() {
        let mut store = PositionStore::new();
        let root = Board::initial();
        let child = root.next(f5());
        store.add(child);

        let (position, _) = store.add(root);
        let square = position.board.legal_squares().next().unwrap();
        position.add_link(Link::new(square, 0));
        let linked_child = position.child(square).unwrap().0;
        assert_eq!(linked_child, child.canonical());

        store.remove(&child).unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.find(&root).unwrap().links.is_empty());
        assert!(store.find(&child).is_none());
    }

    #[test]
    fn test_sort_is_stable() {
        let mut store = PositionStore::new();
        let root = Board::initial();
        for square in root.legal_squares() {
            store.add(root.next(square));
        }
        store.add(root);

        store.sort();
        assert!(store.is_sorted());
        let once = store.boards();
        store.sort();
        assert_eq!(store.boards(), once);
        for board in once {
            assert_eq!(store.get(&board).map(|p| p.board), Some(board));
        }
    }

    #[test]
    fn test_retain_rebuilds_index() {
        let mut store = PositionStore::new();
        let root = Board::initial();
        store.add(root);
        store.add(root.next(f5()));

        let removed = store.retain(|position| position.n_empties() == 59);
        assert_eq!(removed, 1);
        assert!(store.find(&root).is_none());
        assert!(store.find(&root.next(f5())).is_some());
    }
}
