pub const SCORE_MIN: i32 = -64;
pub const SCORE_MAX: i32 = 64;

pub const PASS: u8 = 64;
pub const NO_MOVE: u8 = 65;

pub const BOARD_SIZE: usize = 64;

pub(crate) const NOT_A_OR_H_FILE: u64 = 0x7E7E_7E7E_7E7E_7E7E;
pub(crate) const CORNERS: u64 = 0x8100_0000_0000_0081;

pub(crate) const INITIAL_PLAYER: u64 = (1 << 28) | (1 << 35);
pub(crate) const INITIAL_OPPONENT: u64 = (1 << 27) | (1 << 36);

pub(crate) const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];
