//! Deterministic pseudo-random number generation.
//!
//! The tracer draws random numbers many times per traced ray and needs
//! bit-identical reruns, so it carries its own small xorshift generator
//! instead of a thread-local one. Each row worker owns one instance and
//! threads it down the recursion by exclusive reference.

use rand::{Error, RngCore, SeedableRng};

// Knuth-style LCG multiplier used to spread the input seed over the
// four state words.
const SEED_MULT: u32 = 1_812_433_253;

/// Four-word xorshift generator.
///
/// The stream is a pure function of the construction seed; no global
/// state or clock is consulted. A draw is a handful of shifts and xors,
/// cheap enough to sit inside the per-bounce hot path.
#[derive(Debug, Clone)]
pub struct XorShift128 {
    state: [u32; 4],
}

impl XorShift128 {
    /// Create a generator from a 32-bit seed.
    pub fn new(seed: u32) -> Self {
        let mut state = [0u32; 4];
        let mut s = seed;
        for (i, word) in state.iter_mut().enumerate() {
            s = SEED_MULT
                .wrapping_mul(s ^ (s >> 30))
                .wrapping_add(i as u32 + 1);
            *word = s;
        }
        Self { state }
    }

    /// Next uniform 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let [x, y, z, w] = self.state;
        let t = x ^ (x << 11);
        let w_next = (w ^ (w >> 19)) ^ (t ^ (t >> 8));
        self.state = [y, z, w, w_next];
        w_next
    }

    /// Next uniform double in [0, 1).
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        // 2^-32; the result never reaches 1.0
        f64::from(self.next_u32()) * (1.0 / 4_294_967_296.0)
    }
}

impl RngCore for XorShift128 {
    fn next_u32(&mut self) -> u32 {
        XorShift128::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        let lo = u64::from(XorShift128::next_u32(self));
        let hi = u64::from(XorShift128::next_u32(self));
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = XorShift128::next_u32(self).to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for XorShift128 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}
