//! Seeded random streams keyed by name.

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Hands out one ChaCha8 generator per stream name.
///
/// A stream's seed is a function of the master seed and its name only, so
/// the numbers a simulation draws do not depend on which other streams were
/// opened before it.
pub struct RngManager {
    seed: u64,
    streams: HashMap<String, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            streams: HashMap::new(),
        }
    }

    /// Borrows the named stream, creating it on first use. Later borrows
    /// continue where the previous one stopped.
    pub fn stream(&mut self, name: &str) -> &mut ChaCha8Rng {
        let seed = stream_seed(self.seed, name);
        self.streams
            .entry(name.to_string())
            .or_insert_with(|| ChaCha8Rng::seed_from_u64(seed))
    }
}

fn stream_seed(seed: u64, name: &str) -> u64 {
    // FNV-1a over the name, then folded into the master seed with the
    // 64-bit LCG step.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    let mut mixed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    mixed ^= hash;
    mixed = mixed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    mixed ^ (mixed >> 29)
}
