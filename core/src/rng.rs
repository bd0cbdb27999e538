//! Deterministic random number generation for stochastic simulators.
//!
//! RULE: bundled simulators never call a platform RNG. Randomness flows
//! through a `SimRng` seeded explicitly by the caller, so two runs with the
//! same seed produce the same frames.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A named, seeded RNG owned by a single simulator.
#[derive(Clone)]
pub struct SimRng {
    pub name: &'static str,
    seed:     u64,
    inner:    Pcg64Mcg,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            name: "unnamed",
            seed,
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Rewind the stream to its construction state.
    pub fn reseed(&mut self) {
        self.inner = Pcg64Mcg::seed_from_u64(self.seed);
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a usize in [0, n).
    pub fn next_below(&mut self, n: usize) -> usize {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        (self.inner.next_u64() % n as u64) as usize
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick an index according to `weights`. Weights need not sum to one.
    /// Falls back to the last index on rounding drift.
    pub fn weighted_index(&mut self, weights: &[f64]) -> usize {
        assert!(!weights.is_empty(), "weights must not be empty");
        let total: f64 = weights.iter().sum();
        let mut roll = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if roll < *w {
                return i;
            }
            roll -= w;
        }
        weights.len() - 1
    }
}
