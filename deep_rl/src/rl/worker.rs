use std::sync::Arc;

use log::debug;
use rand::rngs::StdRng;

use super::{
    action::Action,
    environment::{Agent, Environment},
    policy::Policy,
    replay_buffer::{ReplayBuffer, TrajectoryHandle},
    state::State,
};
use crate::{Result, tensor::random};

/// The outcome of a finished episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeStats {
    length: usize,
    total_reward: f32,
}

impl EpisodeStats {
    /// The amount of steps played before the one that ended the episode.
    pub fn length(&self) -> usize {
        self.length
    }

    /// The amount of transitions recorded for the episode, the terminal one included.
    pub fn transitions(&self) -> usize {
        self.length + 1
    }

    pub fn total_reward(&self) -> f32 {
        self.total_reward
    }
}

/// An agent stepping through its environment and recording what happens into a replay buffer.
pub struct Worker<A, S, E, G> {
    id: usize,
    env: E,
    agent: G,
    policy: Arc<dyn Policy<A, S>>,
    buffer: Arc<ReplayBuffer<A, S>>,
    rng: StdRng,
    trajectory: Option<TrajectoryHandle<A, S>>,
}

impl<A, S, E, G> Worker<A, S, E, G>
where
    A: Action,
    S: State,
    E: Environment<A, S>,
    G: Agent<S>,
{
    /// Creates a new `Worker`.
    ///
    /// # Arguments
    /// * `id` - The worker's position in the pool, also the agent id it plays the environment as.
    /// * `env` - The environment the worker plays.
    /// * `agent` - The rules of the game.
    /// * `policy` - How actions are picked.
    /// * `buffer` - Where the experience is recorded.
    /// * `master_seed` - The run's seed, the worker's generator derives from it and `id`.
    ///
    /// # Returns
    /// A new `Worker` instance.
    pub fn new(
        id: usize,
        env: E,
        agent: G,
        policy: Arc<dyn Policy<A, S>>,
        buffer: Arc<ReplayBuffer<A, S>>,
        master_seed: u64,
    ) -> Self {
        Self {
            id,
            env,
            agent,
            policy,
            buffer,
            rng: random::seeded_rng(master_seed, id),
            trajectory: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    /// Swaps the policy, the episode in progress carries on with the new one.
    pub fn set_policy(&mut self, policy: Arc<dyn Policy<A, S>>) {
        self.policy = policy;
    }

    /// Whether the worker is in the middle of an episode.
    pub fn is_playing(&self) -> bool {
        self.trajectory.is_some()
    }

    /// Plays a single step, opening a trajectory first if there is none.
    ///
    /// # Returns
    /// The transition's reward and whether it ended the episode.
    pub fn step(&mut self) -> Result<(f32, bool)> {
        let Self {
            id,
            ref mut env,
            ref agent,
            ref policy,
            ref buffer,
            ref mut rng,
            ref mut trajectory,
        } = *self;

        let handle = trajectory.get_or_insert_with(|| buffer.emplace_trajectory(env.view(id)));
        let mut current = handle.lock();

        let previous = current.last_state().clone();
        let action = policy.react(&previous, rng)?;
        env.apply(&action, id);

        let state = env.view(id);
        let reward = agent.get_reward(&previous, &state);
        let done = agent.game_over(&state);
        current.add_transition(action, reward, state)?;

        if done {
            env.reset(id);
            current.freeze();
            debug!(worker_id = id, steps = current.len(); "episode finished");
            drop(current);
            *trajectory = None;
        }

        Ok((reward, done))
    }

    /// Plays until the episode in progress, or a fresh one, ends.
    pub fn play_one_episode(&mut self) -> Result<EpisodeStats> {
        let mut stats = EpisodeStats {
            length: 0,
            total_reward: 0.,
        };

        loop {
            let (reward, done) = self.step()?;
            stats.total_reward += reward;

            if done {
                return Ok(stats);
            }
            stats.length += 1;
        }
    }

    /// Plays exactly `n` steps, regardless of where episodes start or end.
    pub fn play_steps(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.step()?;
        }

        Ok(())
    }
}
