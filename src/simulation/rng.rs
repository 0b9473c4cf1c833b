//! Random source for the simulation
//!
//! Seeded for reproducible runs and tests, thread RNG otherwise.

use rand::distr::uniform::{SampleRange, SampleUniform};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Default)]
pub struct SimRng {
    seeded: Option<StdRng>,
}

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seeded: Some(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn unseeded() -> Self {
        Self { seeded: None }
    }

    /// Get a random value in the given range, using seeded RNG if available
    pub fn random_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        match &mut self.seeded {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    }

    /// Pick `amount` distinct elements, in random order
    pub fn choose_multiple<T: Clone>(&mut self, slice: &[T], amount: usize) -> Vec<T> {
        match &mut self.seeded {
            Some(rng) => slice.choose_multiple(rng, amount).cloned().collect(),
            None => slice
                .choose_multiple(&mut rand::rng(), amount)
                .cloned()
                .collect(),
        }
    }
}
