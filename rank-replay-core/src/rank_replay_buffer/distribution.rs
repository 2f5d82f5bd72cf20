//! Precomputed rank distributions for stratified sampling.
//!
//! The probability of sampling rank $i$ out of $n$ ranks is
//! $P(i) = i^{-\alpha} / \sum_{j=1}^n j^{-\alpha}$.
//! The ranks are split into `batch_size` contiguous strata of roughly equal probability
//! mass, and one rank is drawn from each stratum when a batch is sampled.
use crate::error::ReplayBufferError;
use std::ops::RangeInclusive;

/// Tolerance of the cumulative mass when locating strata boundaries.
const MASS_EPS: f64 = 1e-9;

/// Rank distribution over `n` ranks.
#[derive(Debug, Clone)]
pub struct Distribution {
    pdf: Vec<f32>,
    normalizer: f64,
    strata_ends: Vec<usize>,
}

impl Distribution {
    /// Builds the distribution over ranks `1..=n` split into `n_strata` strata.
    pub fn new(n: usize, alpha: f32, n_strata: usize) -> Self {
        let alpha = alpha as f64;
        let pow = (1..=n)
            .map(|i| (i as f64).powf(-alpha))
            .collect::<Vec<_>>();
        let normalizer = pow.iter().sum::<f64>();
        let pdf = pow.iter().map(|p| p / normalizer).collect::<Vec<_>>();

        // strata_ends[s] is the last rank of the (s-1)-th stratum
        let mut strata_ends = Vec::with_capacity(n_strata + 1);
        strata_ends.push(0);
        let mut cdf = 0f64;
        let mut rank = 0;
        for s in 1..n_strata {
            let mass = s as f64 / n_strata as f64;
            while rank < n && cdf < mass - MASS_EPS {
                cdf += pdf[rank];
                rank += 1;
            }
            strata_ends.push(rank);
        }
        strata_ends.push(n);

        Self {
            pdf: pdf.into_iter().map(|p| p as f32).collect(),
            normalizer,
            strata_ends,
        }
    }

    /// Returns the number of ranks.
    pub fn n(&self) -> usize {
        self.pdf.len()
    }

    /// Returns $\sum_{j=1}^n j^{-\alpha}$.
    pub fn normalizer(&self) -> f64 {
        self.normalizer
    }

    /// Returns the probability of a 1-indexed rank, or `0` outside `[1, n]`.
    pub fn pdf(&self, rank: usize) -> f32 {
        rank.checked_sub(1)
            .and_then(|i| self.pdf.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    /// Returns the number of strata.
    pub fn n_strata(&self) -> usize {
        self.strata_ends.len() - 1
    }

    /// Returns the boundaries of the strata: `0`, the last rank of each stratum but the
    /// last one, and `n`.
    pub fn strata_ends(&self) -> &[usize] {
        &self.strata_ends
    }

    /// Returns the rank range `[strata_ends[k] + 1, strata_ends[k + 1]]` of the k-th
    /// stratum (0-indexed). The range is empty when two boundaries coincide.
    pub fn stratum(&self, k: usize) -> RangeInclusive<usize> {
        (self.strata_ends[k] + 1)..=self.strata_ends[k + 1]
    }
}

/// Table of [`Distribution`]s, one per fill level of a replay buffer.
///
/// Fill levels are multiples of `partition_size = capacity / batch_size`. Only the
/// levels `n` with `learning_starts <= n <= capacity` have a distribution.
#[derive(Debug)]
pub struct DistributionCache {
    capacity: usize,
    batch_size: usize,
    learning_starts: usize,
    distributions: Vec<Option<Distribution>>,
}

impl DistributionCache {
    /// Precomputes the distributions.
    pub fn new(
        capacity: usize,
        alpha: f32,
        batch_size: usize,
        learning_starts: usize,
    ) -> Result<Self, ReplayBufferError> {
        if batch_size == 0 || batch_size > capacity {
            return Err(ReplayBufferError::InvalidConfig(format!(
                "batch_size must be in [1, capacity = {}], got {}",
                capacity, batch_size
            )));
        }
        let partition_size = capacity / batch_size;
        let distributions = (1..=batch_size)
            .map(|k| k * partition_size)
            .map(|n| (learning_starts <= n).then(|| Distribution::new(n, alpha, batch_size)))
            .collect();

        Ok(Self {
            capacity,
            batch_size,
            learning_starts,
            distributions,
        })
    }

    /// Returns the number of precomputed distributions.
    pub fn len(&self) -> usize {
        self.distributions.iter().filter(|d| d.is_some()).count()
    }

    /// Returns `true` if no distribution was precomputed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the distribution for a buffer holding `len` transitions.
    ///
    /// The bucket is `max(len * batch_size / capacity, 1)`.
    pub fn get(&self, len: usize) -> Result<&Distribution, ReplayBufferError> {
        let not_ready = ReplayBufferError::DistributionNotReady {
            len,
            learning_starts: self.learning_starts,
        };
        if len == 0 || len < self.learning_starts {
            return Err(not_ready);
        }
        let k = (len * self.batch_size / self.capacity).max(1);
        self.distributions
            .get(k - 1)
            .and_then(Option::as_ref)
            .ok_or(not_ready)
    }
}

#[cfg(test)]
mod tests {
    use super::{Distribution, DistributionCache};
    use crate::error::ReplayBufferError;

    #[test]
    fn test_pdf_sums_to_one_and_decreases() {
        let dist = Distribution::new(100, 0.7, 8);
        let sum: f32 = (1..=100).map(|r| dist.pdf(r)).sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!((1..100).all(|r| dist.pdf(r) >= dist.pdf(r + 1)));
        assert_eq!(dist.pdf(0), 0.0);
        assert_eq!(dist.pdf(101), 0.0);
    }

    #[test]
    fn test_alpha_zero_is_uniform() {
        let dist = Distribution::new(10, 0.0, 5);
        assert!((1..=10).all(|r| (dist.pdf(r) - 0.1).abs() < 1e-6));
        assert_eq!(dist.normalizer(), 10.0);
        assert_eq!(dist.strata_ends(), &[0, 2, 4, 6, 8, 10]);
    }

    #[test]
    fn test_strata_partition_the_ranks() {
        let dist = Distribution::new(1000, 0.7, 32);
        let ends = dist.strata_ends();
        assert_eq!(dist.n_strata(), 32);
        assert_eq!(ends[0], 0);
        assert_eq!(ends[32], 1000);
        assert!(ends.windows(2).all(|w| w[0] <= w[1]));

        // Each stratum ends at the first rank reaching its share of the mass
        for s in 1..32 {
            let end = ends[s];
            let cdf: f32 = (1..=end).map(|r| dist.pdf(r)).sum();
            let prev: f32 = (1..end).map(|r| dist.pdf(r)).sum();
            let mass = s as f32 / 32.0;
            assert!(cdf >= mass - 1e-4);
            assert!(prev < mass + 1e-4);
        }
    }

    #[test]
    fn test_skewed_strata_put_few_ranks_first() {
        // capacity = 8, alpha = 0.7, two strata: ranks 1-3 hold about half of the mass
        let dist = Distribution::new(8, 0.7, 2);
        assert_eq!(dist.strata_ends(), &[0, 3, 8]);
        assert_eq!(dist.stratum(0), 1..=3);
        assert_eq!(dist.stratum(1), 4..=8);
    }

    #[test]
    fn test_cache_buckets() -> Result<(), ReplayBufferError> {
        let cache = DistributionCache::new(8, 0.7, 2, 4)?;
        assert_eq!(cache.len(), 2);
        assert!(cache.get(3).is_err());
        assert_eq!(cache.get(4)?.n(), 4);
        assert_eq!(cache.get(7)?.n(), 4);
        assert_eq!(cache.get(8)?.n(), 8);
        Ok(())
    }

    #[test]
    fn test_cache_skips_levels_below_learning_starts() -> Result<(), ReplayBufferError> {
        let cache = DistributionCache::new(100, 0.5, 4, 30)?;
        assert_eq!(cache.len(), 3);
        assert_eq!(
            cache.get(29).err(),
            Some(ReplayBufferError::DistributionNotReady {
                len: 29,
                learning_starts: 30
            })
        );
        // len = 30 falls in the bucket of 25 ranks, which was not built
        assert!(cache.get(30).is_err());
        assert_eq!(cache.get(50)?.n(), 50);
        assert_eq!(cache.get(100)?.n(), 100);
        Ok(())
    }

    #[test]
    fn test_invalid_batch_size() {
        assert!(DistributionCache::new(4, 0.5, 0, 1).is_err());
        assert!(DistributionCache::new(4, 0.5, 5, 1).is_err());
    }
}
