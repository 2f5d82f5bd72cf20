//! Configuration of [`RankReplayBuffer`](super::RankReplayBuffer).
use crate::{error::ReplayBufferError, OverwritePolicy};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`RankReplayBuffer`](super::RankReplayBuffer).
///
/// # Examples
///
/// ```rust
/// use rank_replay_core::{OverwritePolicy, RankReplayBufferConfig};
///
/// let config = RankReplayBufferConfig::default()
///     .capacity(100_000)
///     .alpha(0.7)
///     .batch_size(32)
///     .learning_starts(1_000)
///     .overwrite(OverwritePolicy::Overwrite)
///     .rebalance_interval(Some(100_000));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RankReplayBufferConfig {
    /// Maximum number of transitions.
    pub capacity: usize,

    /// Exponent of the rank distribution. `0` means uniform sampling.
    pub alpha: f32,

    /// Minimum number of transitions before sampling is permitted.
    pub learning_starts: usize,

    /// Number of transitions in a batch, which is also the number of sampling strata.
    pub batch_size: usize,

    /// Behavior on insertion into a full buffer.
    pub overwrite: OverwritePolicy,

    /// Random seed for sampling.
    pub seed: u64,

    /// If `Some(k)`, the buffer rebalances its priority queue every `k` insertions.
    pub rebalance_interval: Option<usize>,

    /// Initial exponent of importance sampling weights used by
    /// [`ReplayBufferBase::batch`](crate::ReplayBufferBase::batch).
    pub beta_0: f32,

    /// Final exponent of importance sampling weights.
    pub beta_final: f32,

    /// Number of priority updates after which the exponent reaches `beta_final`.
    pub n_opts_final: usize,
}

impl Default for RankReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            alpha: 0.7,
            learning_starts: 1000,
            batch_size: 32,
            overwrite: OverwritePolicy::Overwrite,
            seed: 42,
            rebalance_interval: None,
            beta_0: 0.5,
            beta_final: 1.0,
            n_opts_final: 500_000,
        }
    }
}

impl RankReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the exponent of the rank distribution.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the minimum number of transitions before sampling.
    pub fn learning_starts(mut self, learning_starts: usize) -> Self {
        self.learning_starts = learning_starts;
        self
    }

    /// Sets the batch size, i.e., the number of strata.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the behavior on insertion into a full buffer.
    pub fn overwrite(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the interval of automatic rebalancing in insertions.
    pub fn rebalance_interval(mut self, rebalance_interval: Option<usize>) -> Self {
        self.rebalance_interval = rebalance_interval;
        self
    }

    /// Sets the initial exponent of importance sampling weights.
    pub fn beta_0(mut self, beta_0: f32) -> Self {
        self.beta_0 = beta_0;
        self
    }

    /// Sets the final exponent of importance sampling weights.
    pub fn beta_final(mut self, beta_final: f32) -> Self {
        self.beta_final = beta_final;
        self
    }

    /// Sets the number of priority updates to reach `beta_final`.
    pub fn n_opts_final(mut self, n_opts_final: usize) -> Self {
        self.n_opts_final = n_opts_final;
        self
    }

    /// Checks the construction-time constraints.
    pub fn validate(&self) -> Result<(), ReplayBufferError> {
        let invalid = |msg: String| Err(ReplayBufferError::InvalidConfig(msg));
        if self.capacity == 0 {
            return invalid("capacity must be positive".to_string());
        }
        if self.batch_size == 0 || self.batch_size > self.capacity {
            return invalid(format!(
                "batch_size must be in [1, capacity = {}], got {}",
                self.capacity, self.batch_size
            ));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return invalid(format!("alpha must be non-negative, got {}", self.alpha));
        }
        if self.learning_starts > self.capacity {
            return invalid(format!(
                "learning_starts must not exceed capacity = {}, got {}",
                self.capacity, self.learning_starts
            ));
        }
        if self.rebalance_interval == Some(0) {
            return invalid("rebalance_interval must be positive".to_string());
        }
        Ok(())
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
