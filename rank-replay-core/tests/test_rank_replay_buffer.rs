use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rank_replay_core::{
    Distribution, OverwritePolicy, PrioritizedReplayBufferBase, RankReplayBuffer,
    RankReplayBufferConfig, ReplayBufferBase, ReplayBufferError, Slot, Transition,
};
use std::collections::HashMap;

type Obs = Vec<f32>;
type Act = i64;

fn transition(x: usize) -> Transition<Obs, Act> {
    Transition::new(vec![x as f32; 3], x as i64, 0.1 * x as f32, vec![x as f32 + 1.0; 3], false)
}

fn config(capacity: usize, alpha: f32, batch_size: usize, learning_starts: usize) -> RankReplayBufferConfig {
    RankReplayBufferConfig::default()
        .capacity(capacity)
        .alpha(alpha)
        .batch_size(batch_size)
        .learning_starts(learning_starts)
        .seed(7)
}

/// Returns the rank of each slot, valid right after a rebalance.
fn ranks_of(buffer: &RankReplayBuffer<Obs, Act>) -> Result<HashMap<Slot, usize>> {
    let ranks = (1..=buffer.len()).collect::<Vec<_>>();
    let slots = buffer.rank_to_slot(&ranks)?;
    Ok(slots.into_iter().zip(ranks).collect())
}

#[test]
fn test_sample_and_update_scenario() -> Result<()> {
    let mut buffer = RankReplayBuffer::new(&config(8, 0.7, 2, 4))?;
    for x in 0..8 {
        buffer.add(transition(x))?;
    }
    assert_eq!(buffer.len(), 8);
    assert!(buffer.can_sample(2));
    buffer.rebalance();

    let batch = buffer.sample(2, 0.5)?;
    assert_eq!(batch.len(), 2);
    let weight = batch.weight.clone().unwrap_or_default();
    assert_eq!(weight.len(), 2);
    assert!(weight.iter().all(|&w| w > 0.0 && w <= 1.0));
    assert!(weight.iter().any(|&w| w == 1.0));

    let slots = batch.ix_sample.clone().unwrap_or_default();
    assert_eq!(slots.len(), 2);
    assert!(slots.iter().all(|s| (1..=8).contains(s)));
    assert_ne!(slots[0], slots[1]);

    buffer.update_priorities(&slots, &[0.3, -0.9])?;
    assert_eq!(buffer.priority(slots[0]), Some(0.3));
    assert_eq!(buffer.priority(slots[1]), Some(0.9));
    buffer.rebalance();
    let ranks = ranks_of(&buffer)?;
    assert!(ranks[&slots[1]] <= ranks[&slots[0]]);
    assert_eq!(ranks[&slots[1]], 7);
    assert_eq!(ranks[&slots[0]], 8);
    Ok(())
}

#[test]
fn test_reject_when_full_scenario() -> Result<()> {
    let config = config(4, 0.7, 2, 2).overwrite(OverwritePolicy::RejectWhenFull);
    let mut buffer = RankReplayBuffer::new(&config)?;
    for x in 0..4 {
        buffer.add(transition(x))?;
    }
    let err = buffer.add(transition(4));
    assert_eq!(err, Err(ReplayBufferError::BufferFull { capacity: 4 }));
    assert_eq!(buffer.len(), 4);
    Ok(())
}

#[test]
fn test_capacity_bound_and_can_sample() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0);
    for &capacity in &[1usize, 2, 7, 32] {
        let mut buffer = RankReplayBuffer::new(&config(capacity, 0.5, 1, 1))?;
        for x in 0..(3 * capacity + 1) {
            buffer.add(transition(x))?;
            assert!(buffer.len() <= capacity);
            assert_eq!(buffer.len(), (x + 1).min(capacity));
            let k = rng.gen_range(0..=capacity + 1);
            assert_eq!(buffer.can_sample(k), buffer.len() >= k);
        }
    }
    Ok(())
}

#[test]
fn test_new_items_get_max_priority() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(1);
    let mut buffer = RankReplayBuffer::new(&config(16, 0.7, 4, 4))?;
    for x in 0..64 {
        let max_p = buffer.max_priority();
        let slot = buffer.add(transition(x))?;
        assert_eq!(buffer.priority(slot), Some(max_p));

        let slots = (1..=buffer.len()).collect::<Vec<_>>();
        let deltas = slots.iter().map(|_| rng.gen_range(-2.0..2.0)).collect::<Vec<f32>>();
        buffer.update_priorities(&slots, &deltas)?;
    }
    Ok(())
}

#[test]
fn test_rebalance_gives_rank_order() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(2);
    let mut buffer = RankReplayBuffer::new(&config(50, 0.7, 5, 10))?;
    for x in 0..120 {
        buffer.add(transition(x))?;
        let slot = rng.gen_range(1..=buffer.len());
        buffer.update_priorities(&[slot], &[rng.gen_range(-5.0..5.0)])?;
    }
    buffer.rebalance();

    let ranks = (1..=buffer.len()).collect::<Vec<_>>();
    let slots = buffer.rank_to_slot(&ranks)?;
    let priorities = slots
        .iter()
        .map(|&slot| buffer.priority(slot).unwrap_or(f32::NAN))
        .collect::<Vec<_>>();
    for w in priorities.windows(2) {
        assert!(w[0] >= w[1]);
    }
    Ok(())
}

#[test]
fn test_weights_and_stratified_coverage() -> Result<()> {
    let (capacity, alpha, batch_size) = (64, 0.7, 8);
    let mut rng = StdRng::seed_from_u64(3);
    let mut buffer = RankReplayBuffer::new(&config(capacity, alpha, batch_size, 16))?;
    let mut written = HashMap::new();

    for x in 0..200 {
        let slot = buffer.add(transition(x))?;
        written.insert(slot, x);
        if buffer.len() < 16 {
            continue;
        }

        buffer.rebalance();
        let ranks = ranks_of(&buffer)?;
        let batch = buffer.sample(batch_size, rng.gen_range(0.0..=1.0))?;
        let slots = batch.ix_sample.clone().unwrap_or_default();
        let weight = batch.weight.clone().unwrap_or_default();
        assert_eq!(slots.len(), batch_size);

        // Weights are normalized by their maximum
        assert!(weight.iter().all(|&w| w > 0.0 && w <= 1.0));
        assert!(weight.iter().any(|&w| w == 1.0));

        // One rank from each stratum of the distribution for the fill level
        let n = (buffer.len() * batch_size / capacity).max(1) * (capacity / batch_size);
        let dist = Distribution::new(n, alpha, batch_size);
        for (k, slot) in slots.iter().enumerate() {
            let stratum = dist.stratum(k);
            let rank = ranks[slot];
            assert!(stratum.contains(&rank) || (stratum.is_empty() && rank <= *stratum.start()));
        }

        // Sampled slots hold the transitions last written to them
        for (i, slot) in slots.iter().enumerate() {
            let x = written[slot];
            assert_eq!(batch.obs[i], vec![x as f32; 3]);
            assert_eq!(batch.act[i], x as i64);
            assert_eq!(buffer.get(*slot)?, &transition(x));
        }

        let deltas = slots.iter().map(|_| rng.gen_range(-1.0..1.0)).collect::<Vec<f32>>();
        buffer.update_priorities(&slots, &deltas)?;
    }
    Ok(())
}

#[test]
fn test_alpha_zero_gives_unit_weights() -> Result<()> {
    let mut buffer = RankReplayBuffer::new(&config(16, 0.0, 4, 4))?;
    for x in 0..16 {
        buffer.add(transition(x))?;
    }
    let batch = buffer.sample(4, 1.0)?;
    assert_eq!(batch.weight, Some(vec![1.0; 4]));
    Ok(())
}

/// A learner step generic over prioritized buffers.
fn learn<R>(buffer: &mut R, batch_size: usize) -> Result<usize>
where
    R: PrioritizedReplayBufferBase<Batch = rank_replay_core::TransitionBatch<Obs, Act>>,
{
    let batch = buffer.batch(batch_size)?;
    let ixs = batch.ix_sample.unwrap_or_default();
    let td_errs = batch.reward.iter().map(|r| r - 0.5).collect::<Vec<_>>();
    buffer.update_priority(&ixs, &td_errs)?;
    Ok(ixs.len())
}

#[test]
fn test_prioritized_trait_bound() -> Result<()> {
    let config = config(32, 0.7, 4, 8).rebalance_interval(Some(32));
    let mut buffer = RankReplayBuffer::<Obs, Act>::build(&config)?;
    for x in 0..100 {
        buffer.add(transition(x))?;
        if ReplayBufferBase::can_sample(&buffer, 8) {
            assert_eq!(learn(&mut buffer, 4)?, 4);
        }
    }
    Ok(())
}
