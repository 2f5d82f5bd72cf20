//! Replay buffer with uniform sampling.
mod base;
mod config;
pub use base::SimpleReplayBuffer;
pub use config::SimpleReplayBufferConfig;
