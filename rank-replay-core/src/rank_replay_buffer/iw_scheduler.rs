//! Exponent of importance sampling weights as a function of training progress.
use super::RankReplayBufferConfig;

/// Anneals $\beta$ linearly from `beta_0` to `beta_final`.
///
/// Progress is counted in priority updates, one per optimization step of the learner.
/// After `n_opts_final` updates $\beta$ stays at `beta_final`.
#[derive(Clone, Debug, PartialEq)]
pub struct IwScheduler {
    beta_0: f32,
    beta_final: f32,
    n_opts_final: usize,
    n_opts: usize,
}

impl From<&RankReplayBufferConfig> for IwScheduler {
    fn from(config: &RankReplayBufferConfig) -> Self {
        Self {
            beta_0: config.beta_0,
            beta_final: config.beta_final,
            n_opts_final: config.n_opts_final,
            n_opts: 0,
        }
    }
}

impl IwScheduler {
    /// Returns $\beta$ at the current progress.
    pub fn beta(&self) -> f32 {
        let progress = match self.n_opts_final {
            0 => 1.0,
            n => (self.n_opts.min(n) as f32) / n as f32,
        };
        self.beta_0 + (self.beta_final - self.beta_0) * progress
    }

    /// Returns the number of priority updates counted so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Counts one priority update.
    pub fn step(&mut self) {
        self.n_opts = self.n_opts.saturating_add(1);
    }
}
