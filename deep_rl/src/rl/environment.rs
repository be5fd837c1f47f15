/// The world workers act upon.
///
/// A single environment may be shared by several agents, each addressed by its id.
pub trait Environment<A, S>: Send {
    /// Carries out `action` on behalf of agent `agent_id`.
    fn apply(&mut self, action: &A, agent_id: usize);

    /// A snapshot of the environment as agent `agent_id` observes it.
    fn view(&self, agent_id: usize) -> S;

    /// Starts a new episode for agent `agent_id`.
    fn reset(&mut self, agent_id: usize);
}

/// The rules an agent plays an environment by.
pub trait Agent<S>: Send {
    /// Whether `state` ends the episode.
    fn game_over(&self, state: &S) -> bool;

    /// The reward for moving from `previous` to `current`.
    fn get_reward(&self, previous: &S, current: &S) -> f32;
}
