//! Errors in the library.
use thiserror::Error;

/// Errors returned by replay buffers and their components.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayBufferError {
    /// Insertion was attempted with [`OverwritePolicy::RejectWhenFull`] on a full buffer.
    /// The transition was not stored.
    ///
    /// [`OverwritePolicy::RejectWhenFull`]: crate::OverwritePolicy::RejectWhenFull
    #[error("Replay buffer is full (capacity = {capacity}) and overwriting is disabled")]
    BufferFull {
        /// Capacity of the buffer.
        capacity: usize,
    },

    /// Sampling was attempted before enough transitions were stored, or at a fill level
    /// for which no distribution was precomputed.
    #[error("No sampling distribution for {len} transitions (learning_starts = {learning_starts})")]
    DistributionNotReady {
        /// Number of live transitions.
        len: usize,

        /// Minimum number of transitions required before sampling.
        learning_starts: usize,
    },

    /// The slot has no live transition or priority entry.
    #[error("Unknown slot: {0}")]
    UnknownSlot(usize),

    /// A priority is NaN, infinite or negative.
    #[error("Invalid priority {priority} for slot {slot}")]
    InvalidPriority {
        /// Slot whose priority was to be set.
        slot: usize,

        /// Rejected priority.
        priority: f32,
    },

    /// The rank is outside `[1, len]` of the priority queue.
    #[error("Unknown rank: {0}")]
    UnknownRank(usize),

    /// The requested batch size differs from the number of sampling strata.
    #[error("Batch size {got} does not match the number of strata {expected}")]
    InvalidBatchSize {
        /// Number of strata, i.e., the configured batch size.
        expected: usize,

        /// Requested batch size.
        got: usize,
    },

    /// Slots and priority deltas have different lengths.
    #[error("Got {slots} slots but {deltas} priority deltas")]
    LengthMismatch {
        /// Number of slots.
        slots: usize,

        /// Number of deltas.
        deltas: usize,
    },

    /// The configuration violates a construction-time constraint.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
