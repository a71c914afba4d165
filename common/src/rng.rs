use rand::prelude::{SeedableRng, StdRng};

/// Expands a 64 bit seed into a full `StdRng` seed so that books created with the same seed
/// make the same random move choices.
pub fn create_rng_from_seed(seed: u64) -> StdRng {
    let seed_bytes = seed.to_le_bytes();
    let mut seed = [0; 32];
    for chunk in seed.chunks_mut(8) {
        chunk.clone_from_slice(&seed_bytes);
    }

    StdRng::from_seed(seed)
}
