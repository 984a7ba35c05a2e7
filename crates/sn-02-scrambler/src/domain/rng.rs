//! xorshift* generator with unbiased bounded draws.

/// Multiplier of the xorshift64* output function.
const XORSHIFT_STAR_MULTIPLIER: u64 = 0x2545_F491_4F6C_DD1D;

/// Fallback state for an all-zero seed, which xorshift cannot leave.
const NONZERO_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Deterministic xorshift64* generator.
#[derive(Clone, Debug)]
pub struct XorShiftStar {
    state: u64,
}

impl XorShiftStar {
    /// Generator seeded with `seed`; zero is remapped.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { NONZERO_SEED } else { seed },
        }
    }

    /// Next 64-bit output.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(XORSHIFT_STAR_MULTIPLIER)
    }

    /// Uniform value in `[0, n)`; `n` must be positive.
    ///
    /// Draws below `2^64 mod n` are rejected so every residue is equally
    /// likely.
    pub fn below(&mut self, n: u64) -> u64 {
        debug_assert!(n > 0);
        let threshold = n.wrapping_neg() % n;
        loop {
            let v = self.next_u64();
            if v >= threshold {
                return v % n;
            }
        }
    }

    /// Fisher–Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.below(i as u64 + 1) as usize;
            items.swap(i, j);
        }
    }
}
