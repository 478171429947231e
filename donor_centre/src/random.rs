//! Seeded random variates

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};

use crate::config::MinuteRange;

/// The only source of randomness in a run. Processes draw from it in event
/// order, so a fixed seed replays a run exactly.
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        RandomSource {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `[min, max)`. An empty range yields `min`.
    pub fn uniform_int(&mut self, min: usize, max: usize) -> usize {
        match Uniform::new(min, max) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => min,
        }
    }

    pub fn minutes(&mut self, range: MinuteRange) -> usize {
        self.uniform_int(range.min, range.max)
    }

    /// Uniform float in `[0, 1)`.
    pub fn unit_interval(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// True with probability `p`; `0.0` never, `1.0` always.
    pub fn chance(&mut self, p: f64) -> bool {
        self.unit_interval() < p
    }
}
