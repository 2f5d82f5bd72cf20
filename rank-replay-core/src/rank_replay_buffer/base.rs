//! Rank-based prioritized replay buffer.
use super::{
    distribution::DistributionCache, iw_scheduler::IwScheduler, priority_queue::PriorityQueue,
    RankReplayBufferConfig,
};
use crate::{
    error::ReplayBufferError,
    store::{next_slot, TransitionStore},
    ExperienceBufferBase, OverwritePolicy, PrioritizedReplayBufferBase, ReplayBufferBase, Slot,
    Transition, TransitionBatch,
};
use anyhow::Result;
use log::{debug, info, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Replay buffer sampling transitions by the rank of their priorities.
///
/// The probability of sampling the transition of rank $i$ is
/// $P(i) = i^{-\alpha} / \sum_j j^{-\alpha}$, where rank 1 has the highest priority.
/// A batch is drawn by stratified sampling: the ranks are split into `batch_size` strata
/// of about equal probability mass and one rank is drawn uniformly from each stratum.
/// Sampled transitions come with importance sampling weights
/// $w_i = (N P(i))^{-\beta} / \max_j w_j$.
///
/// Priorities live in a binary max-heap and the heap array order is used as the rank
/// order. This is exact only right after [`RankReplayBuffer::rebalance`]; in between,
/// insertions and priority updates keep the heap property but not the full order, so
/// the sampled ranks drift from the true ones until the next rebalance. Rebalancing
/// once per `capacity` insertions is the usual cadence, see
/// [`RankReplayBufferConfig::rebalance_interval`].
///
/// Slots are 1-indexed and advance circularly. New transitions get the maximum priority
/// seen so far, so they are sampled soon after insertion.
///
/// # Examples
///
/// ```rust
/// use rank_replay_core::{RankReplayBuffer, RankReplayBufferConfig, Transition};
///
/// let config = RankReplayBufferConfig::default()
///     .capacity(8)
///     .alpha(0.7)
///     .batch_size(2)
///     .learning_starts(4);
/// let mut buffer = RankReplayBuffer::<f32, usize>::new(&config).unwrap();
/// for i in 0..8 {
///     buffer.add(Transition::new(i as f32, i, 0.0, i as f32 + 1.0, false)).unwrap();
/// }
/// buffer.rebalance();
///
/// let batch = buffer.sample(2, 0.5).unwrap();
/// let slots = batch.ix_sample.unwrap();
/// buffer.update_priorities(&slots, &[0.3, -0.9]).unwrap();
/// ```
pub struct RankReplayBuffer<O, A> {
    /// Maximum number of transitions.
    capacity: usize,

    /// Number of strata, which is the only accepted batch size.
    batch_size: usize,

    /// Behavior on insertion into a full buffer.
    overwrite: OverwritePolicy,

    /// The last slot written, `0` before the first insertion.
    i: Slot,

    /// Number of successful insertions.
    n_pushed: usize,

    /// Automatic rebalancing interval in insertions.
    rebalance_interval: Option<usize>,

    store: TransitionStore<O, A>,
    queue: PriorityQueue,
    distributions: DistributionCache,
    iw_scheduler: IwScheduler,
    rng: StdRng,
}

impl<O, A> RankReplayBuffer<O, A> {
    /// Constructs a buffer and precomputes its sampling distributions.
    pub fn new(config: &RankReplayBufferConfig) -> Result<Self, ReplayBufferError> {
        config.validate()?;
        let capacity = config.capacity;
        let distributions = DistributionCache::new(
            capacity,
            config.alpha,
            config.batch_size,
            config.learning_starts,
        )?;
        info!(
            "Construct rank-based replay buffer with capacity = {}, alpha = {}, batch_size = {}",
            capacity, config.alpha, config.batch_size
        );
        info!("Precomputed {} rank distributions", distributions.len());

        Ok(Self {
            capacity,
            batch_size: config.batch_size,
            overwrite: config.overwrite,
            i: 0,
            n_pushed: 0,
            rebalance_interval: config.rebalance_interval,
            store: TransitionStore::new(capacity),
            queue: PriorityQueue::new(capacity),
            distributions,
            iw_scheduler: IwScheduler::from(config),
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

    /// Returns the maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of successful insertions since construction.
    pub fn n_pushed(&self) -> usize {
        self.n_pushed
    }

    /// Returns the maximum priority, which is given to the next inserted transition.
    pub fn max_priority(&self) -> f32 {
        self.queue.max_priority()
    }

    /// Returns the priority of the transition at `slot`.
    pub fn priority(&self, slot: Slot) -> Option<f32> {
        self.queue.priority(slot)
    }

    /// Returns the transition at `slot`.
    pub fn get(&self, slot: Slot) -> Result<&Transition<O, A>, ReplayBufferError> {
        self.store.get(slot)
    }

    /// Maps ranks to slots. The mapping is exact only right after a rebalance.
    pub fn rank_to_slot(&self, ranks: &[usize]) -> Result<Vec<Slot>, ReplayBufferError> {
        self.queue.rank_to_slot(ranks)
    }

    /// Returns the current exponent of the importance weight schedule.
    pub fn beta(&self) -> f32 {
        self.iw_scheduler.beta()
    }

    /// Returns `true` if at least `batch_size` transitions are stored.
    pub fn can_sample(&self, batch_size: usize) -> bool {
        self.store.len() >= batch_size
    }

    /// Stores a transition in the next slot with the current maximum priority.
    ///
    /// Returns the slot. When the buffer is full, the transition in that slot is
    /// overwritten, or the call fails with [`ReplayBufferError::BufferFull`] under
    /// [`OverwritePolicy::RejectWhenFull`].
    pub fn add(&mut self, tr: Transition<O, A>) -> Result<Slot, ReplayBufferError> {
        if self.store.is_full() && self.overwrite == OverwritePolicy::RejectWhenFull {
            return Err(ReplayBufferError::BufferFull {
                capacity: self.capacity,
            });
        }

        let slot = next_slot(self.i, self.capacity);
        self.store.put(slot, tr)?;
        let p = self.queue.insert_max(slot)?;
        self.i = slot;
        self.n_pushed += 1;
        trace!("RankReplayBuffer::add(): slot = {}, priority = {}", slot, p);

        if let Some(interval) = self.rebalance_interval {
            if self.n_pushed % interval == 0 {
                self.rebalance();
            }
        }

        Ok(slot)
    }

    /// Sets the priorities of the transitions at `slots` to `|deltas|`.
    ///
    /// Pairs are applied in order and the first unknown slot or non-finite delta stops
    /// the update; pairs before it stay applied.
    pub fn update_priorities(
        &mut self,
        slots: &[Slot],
        deltas: &[f32],
    ) -> Result<(), ReplayBufferError> {
        if slots.len() != deltas.len() {
            return Err(ReplayBufferError::LengthMismatch {
                slots: slots.len(),
                deltas: deltas.len(),
            });
        }
        trace!("RankReplayBuffer::update_priorities(): {} slots", slots.len());
        for (&slot, &delta) in slots.iter().zip(deltas.iter()) {
            self.queue.update(slot, delta.abs())?;
        }
        Ok(())
    }

    /// Sorts the priority queue so that heap order equals rank order. O(n log n).
    pub fn rebalance(&mut self) {
        self.queue.rebalance();
        debug!("Rebalanced {} priorities", self.queue.len());
    }

    /// Draws one rank from each stratum of the distribution for the current fill level.
    fn sample_ranks(&mut self) -> Result<(Vec<usize>, usize), ReplayBufferError> {
        let len = self.store.len();
        let dist = self.distributions.get(len)?;
        // Ranks must be live and covered by the distribution
        let top = dist.n().min(len);
        let mut ranks = Vec::with_capacity(self.batch_size);

        for k in 0..dist.n_strata() {
            let (start, end) = dist.stratum(k).into_inner();
            let rank = if start >= end {
                start
            } else {
                // Ranks beyond the live count are rejected, which is the same as drawing
                // from the live part of the stratum.
                let end = end.min(top);
                if start < end {
                    self.rng.gen_range(start..=end)
                } else {
                    end
                }
            };
            ranks.push(rank.clamp(1, top));
        }

        Ok((ranks, dist.n()))
    }

    /// Samples a batch with one transition per stratum.
    ///
    /// The batch carries normalized importance sampling weights with exponent `beta` and
    /// the slots of the transitions, which are passed back to
    /// [`RankReplayBuffer::update_priorities`].
    pub fn sample(
        &mut self,
        batch_size: usize,
        beta: f32,
    ) -> Result<TransitionBatch<O, A>, ReplayBufferError>
    where
        O: Clone,
        A: Clone,
    {
        if batch_size != self.batch_size {
            return Err(ReplayBufferError::InvalidBatchSize {
                expected: self.batch_size,
                got: batch_size,
            });
        }

        let (ranks, n) = self.sample_ranks()?;
        let dist = self.distributions.get(self.store.len())?;
        let ws = ranks
            .iter()
            .map(|&rank| (n as f32 * dist.pdf(rank)).powf(-beta))
            .collect::<Vec<_>>();
        let w_max = ws.iter().fold(f32::MIN_POSITIVE, |m, &w| w.max(m));
        let ws = ws.iter().map(|w| w / w_max).collect::<Vec<_>>();

        let slots = self.queue.rank_to_slot(&ranks)?;
        trace!("RankReplayBuffer::sample(): ranks = {:?}, slots = {:?}", ranks, slots);

        let mut batch = TransitionBatch::with_capacity(batch_size);
        for tr in self.store.get_many(&slots)? {
            batch.push(tr);
        }
        batch.weight = Some(ws);
        batch.ix_sample = Some(slots);
        Ok(batch)
    }
}

impl<O, A> ExperienceBufferBase for RankReplayBuffer<O, A> {
    type Item = Transition<O, A>;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.add(tr)?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.store.len()
    }
}

impl<O, A> ReplayBufferBase for RankReplayBuffer<O, A>
where
    O: Clone,
    A: Clone,
{
    type Config = RankReplayBufferConfig;
    type Batch = TransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Result<Self> {
        Ok(Self::new(config)?)
    }

    /// Samples a batch with the scheduled exponent of importance weights.
    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        let beta = self.iw_scheduler.beta();
        Ok(self.sample(size, beta)?)
    }

    fn can_sample(&self, size: usize) -> bool {
        RankReplayBuffer::can_sample(self, size)
    }
}

impl<O, A> PrioritizedReplayBufferBase for RankReplayBuffer<O, A>
where
    O: Clone,
    A: Clone,
{
    /// Updates priorities with `|td_errs|` and advances the importance weight schedule.
    fn update_priority(&mut self, ixs: &[usize], td_errs: &[f32]) -> Result<()> {
        let result = self.update_priorities(ixs, td_errs);
        self.iw_scheduler.step();
        Ok(result?)
    }

    fn rebalance(&mut self) {
        RankReplayBuffer::rebalance(self)
    }
}
