//! Core functionalities.
mod batch;
mod replay_buffer;
pub use batch::{Transition, TransitionBatch};
pub use replay_buffer::{ExperienceBufferBase, PrioritizedReplayBufferBase, ReplayBufferBase};
