use std::{env, fs, sync::Arc};

use anyhow::Context;
use bin_packing::{
    BestFitPolicy, BinAction, BinPacking, MinWastePolicy, Observation, Packer, PackingWorker,
    config::{Baseline, TrainingConfig},
    evaluate,
};
use deep_rl::{
    arch::{SharedModel, write_weights},
    rl::{
        DeterministicPolicy, Policy, RandomPolicy, ReplayBuffer, StochasticPolicy, Worker, rollout,
    },
    tensor::random,
};
use log::{debug, info, warn};

type SharedPolicy = Arc<dyn Policy<BinAction, Observation>>;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => TrainingConfig::from_file(&path)
            .with_context(|| format!("failed to load the configuration at {path}"))?,
        None => TrainingConfig::default(),
    };

    let seed = random::master_seed(config.seed);
    info!(seed = seed; "starting run");

    match config.baseline {
        Some(baseline) => run_baseline(&config, baseline, seed),
        None => train(&config, seed),
    }
}

/// Evaluates `policy` on the random streams reserved for `round`.
fn evaluate_round(
    config: &TrainingConfig,
    policy: SharedPolicy,
    seed: u64,
    round: usize,
) -> anyhow::Result<f32> {
    let (env, worker) = config.eval_streams(round);
    let env_rng = random::seeded_rng(seed, env);
    // The evaluating worker is worker 0 of its own run.
    let worker_seed = seed.wrapping_add(worker as u64);

    Ok(evaluate(policy, config.eval_episodes, env_rng, worker_seed)?)
}

fn run_baseline(config: &TrainingConfig, baseline: Baseline, seed: u64) -> anyhow::Result<()> {
    let policy: SharedPolicy = match baseline {
        Baseline::BestFit => Arc::new(BestFitPolicy),
        Baseline::MinWaste => Arc::new(MinWastePolicy),
        Baseline::Random => Arc::new(RandomPolicy::<BinAction>::new()),
    };

    let average = evaluate_round(config, policy, seed, 0)?;
    info!(episodes = config.eval_episodes; "{baseline:?} average reward {average}");
    Ok(())
}

fn train(config: &TrainingConfig, seed: u64) -> anyhow::Result<()> {
    let mut rng = random::seeded_rng(seed, usize::MAX);

    let policy_model = config.policy_model.build(&mut rng)?.shared();
    let value_model = config.value_model.build(&mut rng)?.shared();

    let buffer = Arc::new(ReplayBuffer::new());
    let policy: SharedPolicy = Arc::new(StochasticPolicy::new(Arc::clone(&policy_model)));

    let mut workers: Vec<PackingWorker> = (0..config.workers)
        .map(|i| {
            Worker::new(
                i,
                BinPacking::new(random::seeded_rng(seed, config.env_stream(i))),
                Packer,
                Arc::clone(&policy),
                Arc::clone(&buffer),
                seed,
            )
        })
        .collect();

    let value = config
        .learner
        .kind
        .needs_value_model()
        .then(|| config.value_optimizer.bind(Arc::clone(&value_model)));
    let mut learner = config
        .learner
        .build(
            Arc::clone(&buffer),
            config.policy_optimizer.bind(Arc::clone(&policy_model)),
            value,
        )
        .context("the learner needs a value model")?;

    let mut dumps = 0;
    let mut round = 0;
    while config.rounds.is_none_or(|rounds| round < rounds) {
        rollout(&mut workers, config.steps_per_worker)?;
        let stats = learner.learn()?;
        buffer.forget();

        if stats.is_empty() {
            warn!(round = round; "nothing learned this round");
        }

        if config.eval_every > 0 && round % config.eval_every == 0 {
            let eval: SharedPolicy = Arc::new(DeterministicPolicy::new(Arc::clone(&policy_model)));
            let average = evaluate_round(config, eval, seed, round)?;
            info!(round = round, transitions = stats.transitions(); "average reward {average}");
            if let Some(beta) = stats.beta() {
                debug!(round = round, beta = beta; "kl penalty");
            }

            if average > config.dump_threshold {
                dump_weights(&policy_model, dumps)?;
                dumps += 1;
            }
        }

        round += 1;
    }

    Ok(())
}

fn dump_weights(model: &SharedModel, n: usize) -> anyhow::Result<()> {
    let path = format!("weights.{n}");
    let params = model.read().parameters();

    let mut file = fs::File::create(&path).with_context(|| format!("failed to create {path}"))?;
    write_weights(&mut file, params.as_slice())?;
    info!(params = params.len(); "dumped weights to {path}");
    Ok(())
}
