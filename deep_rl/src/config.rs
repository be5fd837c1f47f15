use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    arch::{Model, SharedModel, layers::Layer},
    learner::{
        ActorCriticLearner, CLIP_EPSILON, D_TARG, EPOCHS, GAMMA, INITIAL_BETA, LAMBDA, Learner,
        Objective, PolicyGradientLearner,
    },
    optimization::{
        Adam, BETA1, BETA2, EPSILON, GradientDescent, GradientDescentWithMomentum, MOMENTUM,
        ModelOptimizer, Optimizer,
    },
    rl::{Action, ReplayBuffer, State},
};

/// The description of a single layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayerConfig {
    Full {
        input: usize,
        output: usize,
    },
    Conv1d {
        input_channels: usize,
        output_channels: usize,
    },
    Conv2d {
        rows: usize,
        cols: usize,
        filter_size: usize,
        input_channels: usize,
        output_channels: usize,
    },
    Relu,
    Softmax,
    SoftmaxCrossEntropy,
}

impl LayerConfig {
    pub fn build(&self) -> Layer {
        match *self {
            LayerConfig::Full { input, output } => Layer::full(input, output),
            LayerConfig::Conv1d {
                input_channels,
                output_channels,
            } => Layer::conv1d(input_channels, output_channels),
            LayerConfig::Conv2d {
                rows,
                cols,
                filter_size,
                input_channels,
                output_channels,
            } => Layer::conv2d(rows, cols, filter_size, input_channels, output_channels),
            LayerConfig::Relu => Layer::relu(),
            LayerConfig::Softmax => Layer::softmax(),
            LayerConfig::SoftmaxCrossEntropy => Layer::softmax_cross_entropy(),
        }
    }
}

/// The description of a model, its layers in evaluation order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub layers: Vec<LayerConfig>,
}

impl ModelConfig {
    /// Builds the model and draws its initial parameters.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Model> {
        let mut model = Model::new(self.layers.iter().map(LayerConfig::build));
        model.init(rng)?;
        Ok(model)
    }
}

/// The description of an update rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerConfig {
    GradientDescent {
        learning_rate: f32,
        #[serde(default)]
        weight_decay: f32,
    },
    GradientDescentWithMomentum {
        learning_rate: f32,
        #[serde(default = "default_momentum")]
        momentum: f32,
    },
    Adam {
        learning_rate: f32,
        #[serde(default = "default_beta1")]
        beta1: f32,
        #[serde(default = "default_beta2")]
        beta2: f32,
        #[serde(default = "default_epsilon")]
        epsilon: f32,
    },
}

fn default_momentum() -> f32 {
    MOMENTUM
}

fn default_beta1() -> f32 {
    BETA1
}

fn default_beta2() -> f32 {
    BETA2
}

fn default_epsilon() -> f32 {
    EPSILON
}

impl OptimizerConfig {
    pub fn build(&self) -> Box<dyn Optimizer> {
        match *self {
            OptimizerConfig::GradientDescent {
                learning_rate,
                weight_decay,
            } => Box::new(GradientDescent::new(learning_rate, weight_decay)),
            OptimizerConfig::GradientDescentWithMomentum {
                learning_rate,
                momentum,
            } => Box::new(GradientDescentWithMomentum::new(learning_rate, momentum)),
            OptimizerConfig::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => Box::new(Adam::new(learning_rate, beta1, beta2, epsilon)),
        }
    }

    /// Binds the update rule to `model`.
    pub fn bind(&self, model: SharedModel) -> ModelOptimizer {
        ModelOptimizer::boxed(model, self.build())
    }
}

/// The learner families.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LearnerKind {
    PolicyGradient,
    ActorCritic,
    #[default]
    Ppo,
    KlPpo,
}

impl LearnerKind {
    /// Whether the learner needs a value model.
    pub fn needs_value_model(&self) -> bool {
        !matches!(self, LearnerKind::PolicyGradient)
    }
}

/// The description of a learner and its hyperparameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LearnerConfig {
    pub kind: LearnerKind,
    pub gamma: f32,
    pub lambda: f32,
    pub epochs: usize,
    pub epsilon: f32,
    pub beta: f32,
    pub d_targ: f32,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            kind: LearnerKind::default(),
            gamma: GAMMA,
            lambda: LAMBDA,
            epochs: EPOCHS,
            epsilon: CLIP_EPSILON,
            beta: INITIAL_BETA,
            d_targ: D_TARG,
        }
    }
}

impl LearnerConfig {
    /// Builds the learner.
    ///
    /// # Arguments
    /// * `buffer` - Where the experience is read from.
    /// * `policy` - The policy model and its update rule.
    /// * `value` - The value model and its update rule, ignored by the policy gradient learner.
    ///
    /// # Returns
    /// The learner, or `None` if it needs a value model and none was given.
    pub fn build<A: Action, S: State>(
        &self,
        buffer: Arc<ReplayBuffer<A, S>>,
        policy: ModelOptimizer,
        value: Option<ModelOptimizer>,
    ) -> Option<Box<dyn Learner>> {
        if let LearnerKind::PolicyGradient = self.kind {
            let learner = PolicyGradientLearner::new(buffer, policy).with_gamma(self.gamma);
            return Some(Box::new(learner));
        }

        let objective = match self.kind {
            LearnerKind::Ppo => Objective::Clipped {
                epochs: self.epochs,
                epsilon: self.epsilon,
            },
            LearnerKind::KlPpo => Objective::KlPenalty {
                epochs: self.epochs,
                beta: self.beta,
                d_targ: self.d_targ,
            },
            _ => Objective::Advantage,
        };

        let learner = ActorCriticLearner::new(buffer, policy, value?)
            .with_objective(objective)
            .with_discount(self.gamma, self.lambda);
        Some(Box::new(learner))
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_model_config_from_json() {
        let json = r#"{
            "layers": [
                { "conv1d": { "input_channels": 4, "output_channels": 8 } },
                "relu",
                { "full": { "input": 8, "output": 1 } },
                "softmax"
            ]
        }"#;

        let config: ModelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.layers[1], LayerConfig::Relu);

        let model = config.build(&mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(model.layers().len(), 4);
        assert_eq!(model.size(), 4 * 8 + 8 + 8 + 1);
    }

    #[test]
    fn test_optimizer_defaults() {
        let json = r#"{ "adam": { "learning_rate": 0.001 } }"#;
        let config: OptimizerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config,
            OptimizerConfig::Adam {
                learning_rate: 0.001,
                beta1: BETA1,
                beta2: BETA2,
                epsilon: EPSILON,
            }
        );

        let json = r#"{ "gradient_descent": { "learning_rate": 0.1 } }"#;
        let config: OptimizerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.build().learning_rate(), 0.1);
    }

    #[test]
    fn test_learner_defaults() {
        let config: LearnerConfig = serde_json::from_str(r#"{ "kind": "kl_ppo" }"#).unwrap();
        assert_eq!(config.kind, LearnerKind::KlPpo);
        assert_eq!(config.epochs, 4);
        assert_eq!(config.epsilon, 0.2);
        assert_eq!(config.d_targ, 1e-9);
        assert!(config.kind.needs_value_model());
        assert!(!LearnerKind::PolicyGradient.needs_value_model());
    }
}
