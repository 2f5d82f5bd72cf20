//! Transitions and batches of transitions.

/// A transition `(o_t, a_t, r_t, o_t+1, is_done_t)`.
///
/// Observations and actions are opaque to the replay buffers; they are only cloned
/// into batches.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<O, A> {
    /// Observation `o_t`.
    pub obs: O,

    /// Action `a_t`.
    pub act: A,

    /// Reward `r_t`.
    pub reward: f32,

    /// Observation `o_t+1`.
    pub next_obs: O,

    /// Flag denoting the end of an episode, `1` if done.
    pub is_done: i8,
}

impl<O, A> Transition<O, A> {
    /// Constructs a transition.
    pub fn new(obs: O, act: A, reward: f32, next_obs: O, is_done: bool) -> Self {
        Self {
            obs,
            act,
            reward,
            next_obs,
            is_done: is_done as i8,
        }
    }
}

/// A batch of transitions sampled from a replay buffer.
pub struct TransitionBatch<O, A> {
    /// Observations.
    pub obs: Vec<O>,

    /// Actions.
    pub act: Vec<A>,

    /// Next observations.
    pub next_obs: Vec<O>,

    /// Rewards.
    pub reward: Vec<f32>,

    /// Episode termination flags.
    pub is_done: Vec<i8>,

    /// Importance sampling weights for prioritized experience replay.
    pub weight: Option<Vec<f32>>,

    /// Slots of the sampled transitions, used to update priorities.
    pub ix_sample: Option<Vec<usize>>,
}

impl<O, A> TransitionBatch<O, A> {
    /// Creates an empty batch with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            obs: Vec::with_capacity(capacity),
            act: Vec::with_capacity(capacity),
            next_obs: Vec::with_capacity(capacity),
            reward: Vec::with_capacity(capacity),
            is_done: Vec::with_capacity(capacity),
            weight: None,
            ix_sample: None,
        }
    }

    /// Appends a copy of a transition.
    pub fn push(&mut self, tr: &Transition<O, A>)
    where
        O: Clone,
        A: Clone,
    {
        self.obs.push(tr.obs.clone());
        self.act.push(tr.act.clone());
        self.next_obs.push(tr.next_obs.clone());
        self.reward.push(tr.reward);
        self.is_done.push(tr.is_done);
    }

    /// Returns the number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` if the batch has no transitions.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }

    /// Decomposes the batch into its components:
    ///
    /// 1. Observations
    /// 2. Actions
    /// 3. Next observations
    /// 4. Rewards
    /// 5. Termination flags
    /// 6. Sample indices
    /// 7. Weights
    #[allow(clippy::type_complexity)]
    pub fn unpack(
        self,
    ) -> (
        Vec<O>,
        Vec<A>,
        Vec<O>,
        Vec<f32>,
        Vec<i8>,
        Option<Vec<usize>>,
        Option<Vec<f32>>,
    ) {
        (
            self.obs,
            self.act,
            self.next_obs,
            self.reward,
            self.is_done,
            self.ix_sample,
            self.weight,
        )
    }
}
