use std::fmt::Debug;
use std::hash::Hash;

pub mod engine;

pub use crate::engine::*;

/// State of a game in progress.
pub trait GameState: Hash + Eq + Clone + Debug {
    /// Key under which states that are the same position up to a symmetry of the board meet.
    type Position: Hash + Eq;

    fn initial() -> Self;

    /// The position of the state, independent of the move number and of the orientation.
    fn position(&self) -> Self::Position;
}
