//! Replay buffer with uniform sampling.
use super::SimpleReplayBufferConfig;
use crate::{
    error::ReplayBufferError,
    store::{next_slot, TransitionStore},
    ExperienceBufferBase, OverwritePolicy, ReplayBufferBase, Slot, Transition, TransitionBatch,
};
use anyhow::Result;
use log::{info, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A replay buffer sampling transitions uniformly with replacement.
///
/// It shares the slot layout and the overwrite policy of
/// [`RankReplayBuffer`](crate::RankReplayBuffer), but does not keep priorities and thus
/// does not implement [`PrioritizedReplayBufferBase`](crate::PrioritizedReplayBufferBase).
/// Batches carry sample indices but no importance weights.
pub struct SimpleReplayBuffer<O, A> {
    capacity: usize,
    overwrite: OverwritePolicy,
    i: Slot,
    store: TransitionStore<O, A>,
    rng: StdRng,
}

impl<O, A> SimpleReplayBuffer<O, A> {
    /// Constructs a buffer.
    pub fn new(config: &SimpleReplayBufferConfig) -> Result<Self, ReplayBufferError> {
        config.validate()?;
        info!("Construct replay buffer with capacity = {}", config.capacity);
        Ok(Self {
            capacity: config.capacity,
            overwrite: config.overwrite,
            i: 0,
            store: TransitionStore::new(config.capacity),
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Returns the number of live transitions.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no transition has been added.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns the transition at `slot`.
    pub fn get(&self, slot: Slot) -> Result<&Transition<O, A>, ReplayBufferError> {
        self.store.get(slot)
    }

    /// Stores a transition in the next slot and returns the slot.
    pub fn add(&mut self, tr: Transition<O, A>) -> Result<Slot, ReplayBufferError> {
        if self.store.is_full() && self.overwrite == OverwritePolicy::RejectWhenFull {
            return Err(ReplayBufferError::BufferFull {
                capacity: self.capacity,
            });
        }
        let slot = next_slot(self.i, self.capacity);
        self.store.put(slot, tr)?;
        self.i = slot;
        trace!("SimpleReplayBuffer::add(): slot = {}", slot);
        Ok(slot)
    }

    /// Samples `size` transitions uniformly with replacement.
    pub fn sample(&mut self, size: usize) -> Result<TransitionBatch<O, A>, ReplayBufferError>
    where
        O: Clone,
        A: Clone,
    {
        let len = self.store.len();
        if len == 0 {
            return Err(ReplayBufferError::DistributionNotReady {
                len,
                learning_starts: 1,
            });
        }
        let slots = (0..size)
            .map(|_| self.rng.gen_range(1..=len))
            .collect::<Vec<_>>();

        let mut batch = TransitionBatch::with_capacity(size);
        for tr in self.store.get_many(&slots)? {
            batch.push(tr);
        }
        batch.ix_sample = Some(slots);
        Ok(batch)
    }
}

impl<O, A> ExperienceBufferBase for SimpleReplayBuffer<O, A> {
    type Item = Transition<O, A>;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.add(tr)?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.store.len()
    }
}

impl<O, A> ReplayBufferBase for SimpleReplayBuffer<O, A>
where
    O: Clone,
    A: Clone,
{
    type Config = SimpleReplayBufferConfig;
    type Batch = TransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Result<Self> {
        Ok(Self::new(config)?)
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        Ok(self.sample(size)?)
    }

    fn can_sample(&self, size: usize) -> bool {
        self.store.len() >= size
    }
}
