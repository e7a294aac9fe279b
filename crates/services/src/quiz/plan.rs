use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use quiz_core::model::{QUESTIONS_PER_TEST, Question};

/// Draws the questions for a new test from a subject's pool.
///
/// The draw is a uniform random permutation of the pool, cut to the test
/// size. The pool is copied, never reordered in place.
#[derive(Debug, Clone)]
pub struct TestBuilder {
    rng: StdRng,
    size: usize,
}

impl TestBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
            size: QUESTIONS_PER_TEST,
        }
    }

    /// Deterministic draws, for tests.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            size: QUESTIONS_PER_TEST,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Draw `min(size, pool.len())` questions in random order.
    pub fn draw(&mut self, pool: &[Question]) -> Vec<Question> {
        let mut drawn = pool.to_vec();
        drawn.as_mut_slice().shuffle(&mut self.rng);
        drawn.truncate(self.size);
        drawn
    }
}

impl Default for TestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
