//! Replay buffer interface for reinforcement learning.
//!
//! The interfaces are split by capability. Every buffer stores experiences
//! ([`ExperienceBufferBase`]) and generates batches ([`ReplayBufferBase`]), while only
//! prioritized buffers accept priority feedback ([`PrioritizedReplayBufferBase`]).
//! A training loop that needs priority updates states so in its trait bounds, so the
//! choice between a uniform and a prioritized buffer is resolved at compile time.
use anyhow::Result;

/// Interface for buffers that store experiences from environments.
///
/// # Examples
///
/// ```ignore
/// struct SimpleBuffer<T> {
///     items: Vec<T>,
/// }
///
/// impl<T> ExperienceBufferBase for SimpleBuffer<T> {
///     type Item = T;
///
///     fn push(&mut self, tr: T) -> Result<()> {
///         self.items.push(tr);
///         Ok(())
///     }
///
///     fn len(&self) -> usize {
///         self.items.len()
///     }
/// }
/// ```
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a new experience into the buffer.
    ///
    /// Fails if the buffer refuses the item, for example when it is full and
    /// overwriting is disabled.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the current number of experiences in the buffer.
    fn len(&self) -> usize;
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase: Sized {
    /// Configuration parameters for the replay buffer.
    type Config: Clone;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a new replay buffer from the given configuration.
    ///
    /// Fails if the configuration is invalid.
    fn build(config: &Self::Config) -> Result<Self>;

    /// Samples a batch of `size` experiences for training.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;

    /// Returns `true` if at least `size` experiences are stored.
    fn can_sample(&self, size: usize) -> bool;
}

/// Interface for replay buffers whose sampling depends on priorities.
///
/// Priorities are typically the absolute values of the TD errors computed for the
/// samples of the latest batch.
pub trait PrioritizedReplayBufferBase: ReplayBufferBase {
    /// Updates the priorities of the experiences at `ixs` with `td_errs`.
    ///
    /// `ixs` are the sample indices carried by the batch returned from
    /// [`ReplayBufferBase::batch`].
    fn update_priority(&mut self, ixs: &[usize], td_errs: &[f32]) -> Result<()>;

    /// Restores the exact priority order of the stored experiences.
    fn rebalance(&mut self);
}
