use std::{fs, path::Path};

use deep_rl::config::{LayerConfig, LearnerConfig, LearnerKind, ModelConfig, OptimizerConfig};
use serde::{Deserialize, Serialize};

use super::{BIN_FEATURES, NUM_BINS};

/// The policy played when no learning takes place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    BestFit,
    MinWaste,
    Random,
}

/// Everything a training run is made of.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    pub workers: usize,
    pub steps_per_worker: usize,
    /// Rollout rounds to run, unbounded when `None`.
    pub rounds: Option<usize>,
    pub eval_every: usize,
    pub eval_episodes: usize,
    /// The policy's weights are dumped whenever an evaluation averages more than this.
    pub dump_threshold: f32,
    pub seed: Option<u64>,
    /// Evaluate a heuristic instead of training.
    pub baseline: Option<Baseline>,
    pub policy_model: ModelConfig,
    pub policy_optimizer: OptimizerConfig,
    pub value_model: ModelConfig,
    pub value_optimizer: OptimizerConfig,
    pub learner: LearnerConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let observation = BIN_FEATURES * NUM_BINS;

        Self {
            workers: 16,
            steps_per_worker: 8,
            rounds: None,
            eval_every: 100,
            eval_episodes: 100,
            dump_threshold: 26.5,
            seed: None,
            baseline: None,
            policy_model: ModelConfig {
                layers: vec![
                    LayerConfig::Conv1d {
                        input_channels: BIN_FEATURES,
                        output_channels: 128,
                    },
                    LayerConfig::Relu,
                    LayerConfig::Conv1d {
                        input_channels: 128,
                        output_channels: 64,
                    },
                    LayerConfig::Relu,
                    LayerConfig::Conv1d {
                        input_channels: 64,
                        output_channels: 1,
                    },
                    LayerConfig::Softmax,
                ],
            },
            policy_optimizer: OptimizerConfig::GradientDescent {
                learning_rate: 1e-4,
                weight_decay: 1e-5,
            },
            value_model: ModelConfig {
                layers: vec![
                    LayerConfig::Full {
                        input: observation,
                        output: 64,
                    },
                    LayerConfig::Relu,
                    LayerConfig::Full {
                        input: 64,
                        output: 32,
                    },
                    LayerConfig::Relu,
                    LayerConfig::Full {
                        input: 32,
                        output: 1,
                    },
                ],
            },
            value_optimizer: OptimizerConfig::GradientDescent {
                learning_rate: 1e-5,
                weight_decay: 0.,
            },
            learner: LearnerConfig {
                kind: LearnerKind::Ppo,
                ..LearnerConfig::default()
            },
        }
    }
}

impl TrainingConfig {
    /// Reads the configuration from a JSON file, missing fields take their default value.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The random stream of worker `i`'s environment, worker `i` itself draws from stream `i`.
    pub fn env_stream(&self, i: usize) -> usize {
        self.workers + i
    }

    /// The environment and policy streams of the evaluation after `round`, past every stream
    /// the workers draw from.
    pub fn eval_streams(&self, round: usize) -> (usize, usize) {
        let base = 2 * self.workers + 2 * round;
        (base, base + 1)
    }
}
