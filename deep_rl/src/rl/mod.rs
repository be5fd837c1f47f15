mod action;
mod environment;
mod policy;
mod replay_buffer;
mod rollout;
mod state;
mod trajectory;
mod worker;

pub use action::{Action, DiscreteAction, clip_ratio};
pub use environment::{Agent, Environment};
pub use policy::{DeterministicPolicy, Policy, RandomPolicy, StochasticPolicy};
pub use replay_buffer::{ReplayBuffer, SampledTransition, Td, TrajectoryHandle, total_rewards};
pub use rollout::{rollout, rollout_episodes};
pub use state::{State, to_vector};
pub use trajectory::{StartState, Trajectory, Transition};
pub use worker::{EpisodeStats, Worker};
