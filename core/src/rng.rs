//! Random number helpers.
//!
//! Two generators exist at runtime: a free-running world RNG, and "quick"
//! generators seeded from the world seed plus a location index so town
//! layouts come out identical on every visit. Both are the same type; only
//! the seeding differs.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

pub struct GameRng {
    rng: StdRng,
}

impl GameRng {
    /// Free-running generator for everything that need not reproduce.
    pub fn from_entropy() -> Self {
        GameRng { rng: StdRng::from_entropy() }
    }

    /// Deterministic generator; same seed, same stream.
    pub fn seeded(seed: u64) -> Self {
        GameRng { rng: StdRng::seed_from_u64(seed) }
    }

    /// Uniform in `[0, n)`. Returns 0 when `n <= 0`.
    pub fn rand_int(&mut self, n: i32) -> i32 {
        if n <= 0 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }

    /// Uniform in `[1, n]`. Returns 1 when `n <= 1`.
    pub fn randint(&mut self, n: i32) -> i32 {
        if n <= 1 {
            return 1;
        }
        self.rng.gen_range(1..=n)
    }

    /// Uniform in `[lo, hi]` inclusive.
    pub fn rand_range(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// True `percent` times in 100.
    pub fn magik(&mut self, percent: i32) -> bool {
        self.rand_int(100) < percent
    }

    /// True one time in `n`.
    pub fn one_in(&mut self, n: i32) -> bool {
        self.rand_int(n) == 0
    }

    /// Roll `num` dice of `sides` and sum.
    pub fn damroll(&mut self, num: i32, sides: i32) -> i32 {
        (0..num.max(0)).map(|_| self.randint(sides)).sum()
    }

    /// Approximately normal around `mean` with standard deviation `stand`,
    /// clamped to zero. Twelve summed uniforms are close enough for
    /// allocation counts.
    pub fn randnor(&mut self, mean: i32, stand: i32) -> i32 {
        let sum: i32 = (0..12).map(|_| self.rand_int(1000)).sum();
        // sum has mean 6000 and sd ~ 1000.
        let offset = (sum - 6000) * stand / 1000;
        (mean + offset).max(0)
    }

    /// Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            slice.swap(i, j);
        }
    }

    /// Pick a reference from a nonempty slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> &'a T {
        &slice[self.rand_int(slice.len() as i32) as usize]
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }
}
