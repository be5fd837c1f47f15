use std::thread;

use log::debug;

use super::{
    action::Action,
    environment::{Agent, Environment},
    state::State,
    worker::{EpisodeStats, Worker},
};
use crate::{Result, RlErr};

/// Runs `task` on every worker in its own named thread and waits for all of them.
///
/// # Returns
/// Every worker's output in pool order, or the first error raised.
fn fork_join<A, S, E, G, T, F>(workers: &mut [Worker<A, S, E, G>], task: F) -> Result<Vec<T>>
where
    A: Action,
    S: State,
    E: Environment<A, S>,
    G: Agent<S>,
    T: Send,
    F: Fn(&mut Worker<A, S, E, G>) -> Result<T> + Sync,
{
    let task = &task;

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers.len());
        for worker in workers.iter_mut() {
            let id = worker.id();
            let handle = thread::Builder::new()
                .name(format!("worker{id}"))
                .spawn_scoped(scope, move || task(worker))?;
            handles.push((id, handle));
        }

        let mut outputs = Vec::with_capacity(handles.len());
        let mut first_err = None;
        for (worker_id, handle) in handles {
            let output = match handle.join() {
                Ok(output) => output,
                Err(_) => Err(RlErr::WorkerPanicked { worker_id }),
            };

            match output {
                Ok(output) => outputs.push(output),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    })
}

/// Plays a rollout round: every worker plays `steps` steps in parallel.
pub fn rollout<A, S, E, G>(workers: &mut [Worker<A, S, E, G>], steps: usize) -> Result<()>
where
    A: Action,
    S: State,
    E: Environment<A, S>,
    G: Agent<S>,
{
    fork_join(workers, |worker| worker.play_steps(steps))?;
    debug!(workers = workers.len(), steps = steps; "rollout finished");
    Ok(())
}

/// Every worker plays one episode in parallel.
///
/// # Returns
/// The stats of every episode, in pool order.
pub fn rollout_episodes<A, S, E, G>(
    workers: &mut [Worker<A, S, E, G>],
) -> Result<Vec<EpisodeStats>>
where
    A: Action,
    S: State,
    E: Environment<A, S>,
    G: Agent<S>,
{
    fork_join(workers, Worker::play_one_episode)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::RngCore;

    use super::*;
    use crate::rl::{DiscreteAction, Policy, ReplayBuffer};

    #[derive(Clone)]
    struct Counter(usize);

    impl State for Counter {
        fn length() -> usize {
            1
        }

        fn to_vector(&self, out: &mut [f32]) {
            out[0] = self.0 as f32;
        }
    }

    /// Counts the actions taken, the episode ends after `limit` of them.
    struct Countdown {
        count: usize,
    }

    impl Environment<DiscreteAction<2>, Counter> for Countdown {
        fn apply(&mut self, action: &DiscreteAction<2>, _agent_id: usize) {
            if action.choice() == 1 {
                panic!("forbidden action");
            }
            self.count += 1;
        }

        fn view(&self, _agent_id: usize) -> Counter {
            Counter(self.count)
        }

        fn reset(&mut self, _agent_id: usize) {
            self.count = 0;
        }
    }

    struct Limit(usize);

    impl Agent<Counter> for Limit {
        fn game_over(&self, state: &Counter) -> bool {
            state.0 >= self.0
        }

        fn get_reward(&self, _previous: &Counter, current: &Counter) -> f32 {
            if self.game_over(current) { 0. } else { 1. }
        }
    }

    struct Always(usize);

    impl Policy<DiscreteAction<2>, Counter> for Always {
        fn react(&self, _state: &Counter, _rng: &mut dyn RngCore) -> Result<DiscreteAction<2>> {
            DiscreteAction::new(self.0)
        }
    }

    type CountdownWorker = Worker<DiscreteAction<2>, Counter, Countdown, Limit>;

    fn workers(
        n: usize,
        limit: usize,
        choice: usize,
    ) -> (Vec<CountdownWorker>, Arc<ReplayBuffer<DiscreteAction<2>, Counter>>) {
        let buffer = Arc::new(ReplayBuffer::new());
        let policy: Arc<dyn Policy<_, _>> = Arc::new(Always(choice));
        let workers = (0..n)
            .map(|id| {
                Worker::new(
                    id,
                    Countdown { count: 0 },
                    Limit(limit),
                    Arc::clone(&policy),
                    Arc::clone(&buffer),
                    7,
                )
            })
            .collect();
        (workers, buffer)
    }

    #[test]
    fn test_episodes_span_rounds() {
        let (mut workers, buffer) = workers(3, 5, 0);

        rollout(&mut workers, 3).unwrap();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.num_transitions(), 9);
        assert!(workers.iter().all(Worker::is_playing));

        buffer.forget();
        rollout(&mut workers, 3).unwrap();
        let views = buffer.sample_td(None, None);
        assert_eq!(views.len(), 6);
        assert_eq!(views.iter().filter(|td| td.frozen()).count(), 3);
        assert!(views.iter().filter(|td| td.frozen()).all(|td| td.len() == 2));
    }

    #[test]
    fn test_episode_stats() {
        let (mut workers, _buffer) = workers(2, 4, 0);
        let stats = rollout_episodes(&mut workers).unwrap();

        assert_eq!(stats.len(), 2);
        for episode in stats {
            assert_eq!(episode.length(), 3);
            assert_eq!(episode.transitions(), 4);
            assert_eq!(episode.total_reward(), 3.);
        }
    }

    #[test]
    fn test_panicking_worker_is_reported() {
        let (mut workers, _buffer) = workers(2, 4, 1);
        let err = rollout(&mut workers, 1).unwrap_err();
        assert!(matches!(err, RlErr::WorkerPanicked { worker_id: 0 }));
    }
}
