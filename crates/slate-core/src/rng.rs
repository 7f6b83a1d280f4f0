//! Deterministic PRNG for agent name generation.
//!
//! Uses the SplitMix64 algorithm: 8 bytes of state, trivially serializable,
//! so a restored pool keeps producing the same names it would have.

/// SplitMix64 pseudo-random number generator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Pick an element of `choices` uniformly. Returns `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, choices: &'a [T]) -> Option<&'a T> {
        if choices.is_empty() {
            return None;
        }
        let index = (self.next_u64() % choices.len() as u64) as usize;
        choices.get(index)
    }

    /// Get the internal state (for snapshots).
    pub fn state(&self) -> u64 {
        self.state
    }
}
