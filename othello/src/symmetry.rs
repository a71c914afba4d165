//! The eight symmetries of the square board. A symmetry index is a bit set applied in a fixed
//! order: bit 2 transposes along the a1-h8 diagonal, then bit 1 mirrors the ranks, then bit 0
//! mirrors the files.

use common::single_bit_index_u64;

use crate::constants::{NO_MOVE, PASS};

pub const N_SYMMETRIES: usize = 8;

pub fn flip_vertical(bits: u64) -> u64 {
    bits.swap_bytes()
}

pub fn flip_horizontal(mut bits: u64) -> u64 {
    const K1: u64 = 0x5555_5555_5555_5555;
    const K2: u64 = 0x3333_3333_3333_3333;
    const K4: u64 = 0x0F0F_0F0F_0F0F_0F0F;

    bits = ((bits >> 1) & K1) | ((bits & K1) << 1);
    bits = ((bits >> 2) & K2) | ((bits & K2) << 2);
    ((bits >> 4) & K4) | ((bits & K4) << 4)
}

pub fn flip_diagonal(mut bits: u64) -> u64 {
    const K1: u64 = 0x5500_5500_5500_5500;
    const K2: u64 = 0x3333_0000_3333_0000;
    const K4: u64 = 0x0F0F_0F0F_0000_0000;

    let mut t = K4 & (bits ^ (bits << 28));
    bits ^= t ^ (t >> 28);
    t = K2 & (bits ^ (bits << 14));
    bits ^= t ^ (t >> 14);
    t = K1 & (bits ^ (bits << 7));
    bits ^ t ^ (t >> 7)
}

pub fn transform(mut bits: u64, symmetry: usize) -> u64 {
    if symmetry & 4 != 0 {
        bits = flip_diagonal(bits);
    }
    if symmetry & 2 != 0 {
        bits = flip_vertical(bits);
    }
    if symmetry & 1 != 0 {
        bits = flip_horizontal(bits);
    }
    bits
}

pub fn inverse_transform(mut bits: u64, symmetry: usize) -> u64 {
    if symmetry & 1 != 0 {
        bits = flip_horizontal(bits);
    }
    if symmetry & 2 != 0 {
        bits = flip_vertical(bits);
    }
    if symmetry & 4 != 0 {
        bits = flip_diagonal(bits);
    }
    bits
}

/// Maps a square of the original board onto the transformed board.
pub fn symmetric_square(square: u8, symmetry: usize) -> u8 {
    match square {
        PASS | NO_MOVE => square,
        _ => single_bit_index_u64(transform(1 << square, symmetry)) as u8,
    }
}

/// Maps a square of the transformed board back onto the original board.
pub fn inverse_square(square: u8, symmetry: usize) -> u8 {
    match square {
        PASS | NO_MOVE => square,
        _ => single_bit_index_u64(inverse_transform(1 << square, symmetry)) as u8,
    }
}
