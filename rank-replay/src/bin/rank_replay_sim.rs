//! Synthetic training loop driving a replay buffer.
//!
//! A random walk stands in for the environment and a running value estimate stands in
//! for the learner. Rewards are sparse, so a prioritized buffer should replay the
//! rewarding transitions more often than a uniform one.
use anyhow::Result;
use clap::Parser;
use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rank_replay::{
    ExperienceBufferBase, PrioritizedReplayBufferBase, RankReplayBuffer, RankReplayBufferConfig,
    ReplayBufferBase, ReplayBufferError, SimpleReplayBuffer, SimpleReplayBufferConfig, Transition,
    TransitionBatch,
};

const DIM_OBS: usize = 4;
const N_ACTIONS: i64 = 2;
const EPISODE_LEN: usize = 200;
const REWARD_PROB: f32 = 0.05;
const CAPACITY: usize = 8_192;
const BATCH_SIZE: usize = 32;
const WARMUP_PERIOD: usize = 1_024;
const LR: f32 = 0.01;
const RECORD_INTERVAL: usize = 1_000;

type Obs = Vec<f32>;
type Act = i64;
type Batch = TransitionBatch<Obs, Act>;

/// Random walk with sparse rewards.
struct RandomWalk {
    state: Obs,
    t: usize,
    rng: StdRng,
}

impl RandomWalk {
    fn new(seed: u64) -> Self {
        Self {
            state: vec![0.0; DIM_OBS],
            t: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn step(&mut self) -> Transition<Obs, Act> {
        let act = self.rng.gen_range(0..N_ACTIONS);
        let obs = self.state.clone();
        let sign = if act == 0 { -1.0 } else { 1.0 };
        for x in self.state.iter_mut() {
            *x += sign * self.rng.gen::<f32>();
        }
        let reward = if self.rng.gen::<f32>() < REWARD_PROB { 1.0 } else { 0.0 };

        self.t += 1;
        let is_done = self.t % EPISODE_LEN == 0;
        let next_obs = self.state.clone();
        if is_done {
            self.state = vec![0.0; DIM_OBS];
        }
        Transition::new(obs, act, reward, next_obs, is_done)
    }
}

/// Running value estimate producing TD errors for sampled batches.
#[derive(Default)]
struct Learner {
    value: f32,
    opt_steps: usize,
    sum_abs_td: f32,
    n_rewarding: usize,
    n_samples: usize,
}

impl Learner {
    fn opt(&mut self, batch: &Batch) -> Vec<f32> {
        let td_errs = batch
            .reward
            .iter()
            .map(|r| r - self.value)
            .collect::<Vec<_>>();
        let ws = batch.weight.clone().unwrap_or_else(|| vec![1.0; td_errs.len()]);
        let step = td_errs.iter().zip(ws.iter()).map(|(td, w)| td * w).sum::<f32>()
            / td_errs.len() as f32;
        self.value += LR * step;

        self.opt_steps += 1;
        self.sum_abs_td += td_errs.iter().map(|td| td.abs()).sum::<f32>();
        self.n_rewarding += batch.reward.iter().filter(|&&r| r > 0.0).count();
        self.n_samples += batch.len();
        td_errs
    }

    fn record(&mut self, env_steps: usize) {
        if self.n_samples > 0 {
            info!(
                "env_steps = {}, opt_steps = {}, value = {:.4}, mean |td| = {:.4}, rewarding = {:.3}",
                env_steps,
                self.opt_steps,
                self.value,
                self.sum_abs_td / self.n_samples as f32,
                self.n_rewarding as f32 / self.n_samples as f32,
            );
        }
        self.sum_abs_td = 0.0;
        self.n_rewarding = 0;
        self.n_samples = 0;
    }
}

/// Samples a batch, or returns `None` if the buffer has no distribution for its fill level yet.
fn try_batch<R: ReplayBufferBase>(buffer: &mut R, batch_size: usize) -> Result<Option<R::Batch>> {
    match buffer.batch(batch_size) {
        Ok(batch) => Ok(Some(batch)),
        Err(err) => match err.downcast_ref::<ReplayBufferError>() {
            Some(ReplayBufferError::DistributionNotReady { len, .. }) => {
                debug!("Skip optimization step, no distribution for {} transitions", len);
                Ok(None)
            }
            _ => Err(err),
        },
    }
}

/// Trains with a prioritized buffer, feeding TD errors back as priorities.
fn train_prioritized<R>(
    buffer: &mut R,
    max_steps: usize,
    batch_size: usize,
    learning_starts: usize,
    rebalance_interval: usize,
    seed: u64,
) -> Result<Learner>
where
    R: PrioritizedReplayBufferBase<Batch = Batch>
        + ExperienceBufferBase<Item = Transition<Obs, Act>>,
{
    let mut env = RandomWalk::new(seed);
    let mut learner = Learner::default();

    for env_steps in 1..=max_steps {
        buffer.push(env.step())?;
        if env_steps % rebalance_interval == 0 {
            buffer.rebalance();
        }
        if env_steps >= learning_starts && buffer.can_sample(batch_size) {
            if let Some(batch) = try_batch(buffer, batch_size)? {
                let td_errs = learner.opt(&batch);
                let ixs = batch.ix_sample.unwrap_or_default();
                buffer.update_priority(&ixs, &td_errs)?;
            }
        }
        if env_steps % RECORD_INTERVAL == 0 {
            learner.record(env_steps);
        }
    }

    Ok(learner)
}

/// Trains with a uniform buffer.
fn train_uniform<R>(
    buffer: &mut R,
    max_steps: usize,
    batch_size: usize,
    learning_starts: usize,
    seed: u64,
) -> Result<Learner>
where
    R: ReplayBufferBase<Batch = Batch> + ExperienceBufferBase<Item = Transition<Obs, Act>>,
{
    let mut env = RandomWalk::new(seed);
    let mut learner = Learner::default();

    for env_steps in 1..=max_steps {
        buffer.push(env.step())?;
        if env_steps >= learning_starts && buffer.can_sample(batch_size) {
            let batch = buffer.batch(batch_size)?;
            learner.opt(&batch);
        }
        if env_steps % RECORD_INTERVAL == 0 {
            learner.record(env_steps);
        }
    }

    Ok(learner)
}

/// Run a synthetic training loop with a rank-based or uniform replay buffer
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// YAML configuration of the rank-based replay buffer
    #[arg(short, long)]
    config: Option<String>,

    /// Save the configuration in use to this YAML file
    #[arg(long)]
    save_config: Option<String>,

    /// Number of environment steps
    #[arg(short, long, default_value_t = 20_000)]
    steps: usize,

    /// Sample uniformly instead of by rank
    #[arg(short, long, default_value_t = false)]
    uniform: bool,
}

fn create_config(args: &Args) -> Result<RankReplayBufferConfig> {
    let config = match &args.config {
        Some(path) => {
            info!("Load replay buffer configuration from {}", path);
            RankReplayBufferConfig::load(path)?
        }
        // The warmup period is a multiple of capacity / batch_size, so a distribution
        // is ready as soon as training starts
        None => RankReplayBufferConfig::default()
            .capacity(CAPACITY)
            .batch_size(BATCH_SIZE)
            .learning_starts(WARMUP_PERIOD),
    };
    if let Some(path) = &args.save_config {
        config.save(path)?;
        info!("Saved replay buffer configuration to {}", path);
    }
    Ok(config)
}

fn run(args: &Args) -> Result<Learner> {
    let config = create_config(args)?;

    if args.uniform {
        let (batch_size, learning_starts) = (config.batch_size, config.learning_starts);
        let config = SimpleReplayBufferConfig::default()
            .capacity(config.capacity)
            .overwrite(config.overwrite)
            .seed(config.seed);
        let mut buffer = SimpleReplayBuffer::build(&config)?;
        train_uniform(
            &mut buffer,
            args.steps,
            batch_size,
            learning_starts,
            config.seed,
        )
    } else {
        let mut buffer = RankReplayBuffer::build(&config)?;
        // Rebalance once per capacity insertions unless the buffer does it by itself
        let rebalance_interval = match config.rebalance_interval {
            Some(_) => usize::MAX,
            None => config.capacity,
        };
        train_prioritized(
            &mut buffer,
            args.steps,
            config.batch_size,
            config.learning_starts,
            rebalance_interval,
            config.seed,
        )
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let learner = run(&args)?;
    info!(
        "Finished {} optimization steps, value = {:.4}",
        learner.opt_steps, learner.value
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run, Args, WARMUP_PERIOD};
    use anyhow::Result;
    use rank_replay::RankReplayBufferConfig;
    use tempdir::TempDir;

    #[test]
    fn test_rank_replay_sim() -> Result<()> {
        let tmp_dir = TempDir::new("rank_replay_sim")?;
        let path = tmp_dir.path().join("config.yaml");
        let path = match path.to_str() {
            Some(s) => s.to_string(),
            None => panic!("Failed to get string of temporary file path"),
        };
        RankReplayBufferConfig::default()
            .capacity(2_000)
            .batch_size(8)
            .learning_starts(500)
            .save(&path)?;

        let args = Args {
            config: Some(path),
            save_config: None,
            steps: 3_000,
            uniform: false,
        };
        let learner = run(&args)?;
        assert_eq!(learner.opt_steps, 3_000 - 500 + 1);
        Ok(())
    }

    #[test]
    fn test_default_config_waits_for_distribution() -> Result<()> {
        let tmp_dir = TempDir::new("rank_replay_sim_default")?;
        let path = tmp_dir.path().join("config.yaml");
        let path = match path.to_str() {
            Some(s) => s.to_string(),
            None => panic!("Failed to get string of temporary file path"),
        };
        // capacity = 10000, batch_size = 32, learning_starts = 1000: 1000 transitions map
        // to a bucket of 936 ranks, which is not built. The first built bucket is reached
        // at 1250 transitions.
        RankReplayBufferConfig::default().save(&path)?;

        let args = Args {
            config: Some(path),
            save_config: None,
            steps: 2_000,
            uniform: false,
        };
        let learner = run(&args)?;
        assert_eq!(learner.opt_steps, 2_000 - 1_250 + 1);
        Ok(())
    }

    #[test]
    fn test_uniform_sim() -> Result<()> {
        let args = Args {
            config: None,
            save_config: None,
            steps: 1_500,
            uniform: true,
        };
        let learner = run(&args)?;
        assert_eq!(learner.opt_steps, 1_500 - WARMUP_PERIOD + 1);
        Ok(())
    }
}
