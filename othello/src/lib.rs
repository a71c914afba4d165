pub mod action;
pub mod board;
pub mod engine;
pub mod game;
pub mod game_state;
pub mod move_list;
pub mod search;

mod constants;
mod hash_table;
mod symmetry;

pub use constants::{BOARD_SIZE, NO_MOVE, PASS, SCORE_MAX, SCORE_MIN};

pub use action::*;
pub use board::*;
pub use self::engine::*;
pub use game::*;
pub use game_state::*;
pub use hash_table::HashEntry;
pub use move_list::*;
pub use search::*;
pub use symmetry::{inverse_square, symmetric_square, N_SYMMETRIES};
