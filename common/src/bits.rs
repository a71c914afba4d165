pub fn single_bit_index_u64(bit: u64) -> usize {
    bit.trailing_zeros() as usize
}

pub fn first_set_bit(bits: u64) -> u64 {
    bits & bits.wrapping_neg()
}

/// Iterates over the indexes of the set bits, lowest first.
pub fn iter_bit_indexes(mut bits: u64) -> impl Iterator<Item = usize> {
    std::iter::from_fn(move || {
        if bits == 0 {
            return None;
        }

        let index = single_bit_index_u64(bits);
        bits ^= first_set_bit(bits);
        Some(index)
    })
}
