//! Seeded bootstrap sampling

use crate::{MathError, Result};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

/// Deterministic sampler for bagging.
///
/// Each stream index derives its own `StdRng` from the base seed, so the
/// sample drawn for stream `i` does not depend on how many other streams were
/// drawn before it.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapSampler {
    seed: u64,
}

impl BootstrapSampler {
    /// Create a sampler with the given base seed
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Random generator for the given stream
    pub fn rng(&self, stream: usize) -> StdRng {
        StdRng::seed_from_u64(self.seed.wrapping_add(stream as u64))
    }

    /// Draw `n` indices in `0..n` with replacement
    pub fn resample(rng: &mut StdRng, n: usize) -> Result<Vec<usize>> {
        if n == 0 {
            return Err(MathError::InsufficientData(
                "Cannot resample an empty set".to_string(),
            ));
        }
        Ok((0..n).map(|_| rng.gen_range(0..n)).collect())
    }

    /// Choose `amount` distinct indices in `0..n`, sorted ascending
    pub fn choose_features(rng: &mut StdRng, n: usize, amount: usize) -> Result<Vec<usize>> {
        if amount == 0 || amount > n {
            return Err(MathError::InvalidInput(format!(
                "Cannot choose {} of {} features",
                amount, n
            )));
        }
        let mut chosen = index::sample(rng, n, amount).into_vec();
        chosen.sort_unstable();
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_stream_same_sample() {
        let sampler = BootstrapSampler::new(42);
        let a = BootstrapSampler::resample(&mut sampler.rng(3), 50).unwrap();
        let b = BootstrapSampler::resample(&mut sampler.rng(3), 50).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|&i| i < 50));
    }

    #[test]
    fn different_streams_differ() {
        let sampler = BootstrapSampler::new(42);
        let a = BootstrapSampler::resample(&mut sampler.rng(0), 50).unwrap();
        let b = BootstrapSampler::resample(&mut sampler.rng(1), 50).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn feature_choice_is_distinct_and_sorted() {
        let sampler = BootstrapSampler::new(7);
        let chosen = BootstrapSampler::choose_features(&mut sampler.rng(0), 15, 5).unwrap();
        assert_eq!(chosen.len(), 5);
        assert!(chosen.windows(2).all(|w| w[0] < w[1]));
        assert!(BootstrapSampler::choose_features(&mut sampler.rng(0), 3, 4).is_err());
        assert!(BootstrapSampler::resample(&mut sampler.rng(0), 0).is_err());
    }
}
