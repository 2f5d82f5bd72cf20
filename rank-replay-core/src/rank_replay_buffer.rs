//! Rank-based prioritized experience replay.
//!
//! # Key Components
//!
//! - [`RankReplayBuffer`]: the replay buffer, composing the components below
//! - [`PriorityQueue`]: binary max-heap of priorities with lookup by slot
//! - [`DistributionCache`]: precomputed rank distributions split into strata
//! - [`IwScheduler`]: schedule of the exponent of importance sampling weights
//! - [`RankReplayBufferConfig`]: configuration, loadable from YAML
mod base;
mod config;
mod distribution;
mod iw_scheduler;
mod priority_queue;
pub use base::RankReplayBuffer;
pub use config::RankReplayBufferConfig;
pub use distribution::{Distribution, DistributionCache};
pub use iw_scheduler::IwScheduler;
pub use priority_queue::{PriorityEntry, PriorityQueue, DEFAULT_PRIORITY};
