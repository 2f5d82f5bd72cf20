#![warn(missing_docs)]
//! Rank-based prioritized experience replay.
//!
//! A replay buffer that samples transitions with probability proportional to
//! $\mathrm{rank}^{-\alpha}$ of their priorities, where priorities are the absolute
//! errors reported by the learner.
//!
//! * [`RankReplayBuffer`] is the prioritized buffer. It stores transitions in a
//!   [`TransitionStore`], keeps priorities in a [`PriorityQueue`] and samples by
//!   stratified sampling from a [`DistributionCache`].
//! * [`SimpleReplayBuffer`] samples uniformly.
//!
//! Both buffers implement [`ExperienceBufferBase`] and [`ReplayBufferBase`]; only the
//! prioritized one implements [`PrioritizedReplayBufferBase`].
//!
//! The buffers are meant to be owned by a single training loop. They have no internal
//! locking; producers on other threads should hand transitions to the owning thread,
//! e.g., through a channel.
pub mod error;
pub mod rank_replay_buffer;
pub mod simple_replay_buffer;

mod base;
pub use base::{
    ExperienceBufferBase, PrioritizedReplayBufferBase, ReplayBufferBase, Transition,
    TransitionBatch,
};

mod store;
pub use store::{OverwritePolicy, Slot, TransitionStore};

pub use error::ReplayBufferError;
pub use rank_replay_buffer::{
    Distribution, DistributionCache, IwScheduler, PriorityQueue, RankReplayBuffer,
    RankReplayBufferConfig,
};
pub use simple_replay_buffer::{SimpleReplayBuffer, SimpleReplayBufferConfig};
