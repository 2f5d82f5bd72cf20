//! Rank-based prioritized experience replay.
//!
//! This crate re-exports [rank-replay-core](rank_replay_core), which provides the
//! replay buffers, and ships the `rank_replay_sim` binary. The binary drives a buffer
//! with a synthetic training loop:
//!
//! ```bash
//! rank_replay_sim --steps 20000
//! rank_replay_sim --config rank_replay.yaml --save-config used.yaml
//! rank_replay_sim --uniform
//! ```
pub use rank_replay_core::*;
