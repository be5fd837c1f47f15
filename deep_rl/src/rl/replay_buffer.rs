use std::sync::Arc;

use log::trace;
use parking_lot::{Mutex, RawMutex, lock_api::ArcMutexGuard};
use rand::Rng;

use super::trajectory::{Trajectory, Transition};
use crate::{Result, RlErr};

/// A trajectory inserted in a [`ReplayBuffer`].
///
/// During a rollout round it is only ever locked by the worker that plays it, so the lock is
/// uncontended.
pub type TrajectoryHandle<A, S> = Arc<Mutex<Trajectory<A, S>>>;

/// A read only temporal difference view over a trajectory of the buffer.
///
/// The view keeps its trajectory locked, so every view must be dropped before the buffer is
/// written to again (for instance by [`ReplayBuffer::forget`]).
pub struct Td<A, S> {
    trajectory: ArcMutexGuard<RawMutex, Trajectory<A, S>>,
    len: usize,
}

impl<A, S> Td<A, S> {
    /// The amount of transitions visible through the view.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the view ends on a terminal state.
    pub fn frozen(&self) -> bool {
        self.trajectory.is_frozen() && self.len == self.trajectory.len()
    }

    pub fn transitions(&self) -> &[Transition<A, S>] {
        &self.trajectory.transitions()[..self.len]
    }

    /// Iterates over the transitions, each paired with the state it started from.
    pub fn steps(&self) -> impl Iterator<Item = Result<(&S, &Transition<A, S>)>> {
        self.transitions()
            .iter()
            .enumerate()
            .map(|(i, transition)| Ok((self.trajectory.start_state(i)?, transition)))
    }

    /// The last visible transition.
    pub fn back(&self) -> Option<&Transition<A, S>> {
        self.transitions().last()
    }

    /// The state the view ends on: the last visible end state, or the opening if empty.
    pub fn end_state(&self) -> &S {
        self.trajectory.state_after(self.len)
    }
}

/// A transition copied out of the buffer together with the state it started from.
#[derive(Debug, Clone)]
pub struct SampledTransition<A, S> {
    pub start_state: S,
    pub action: A,
    pub reward: f32,
    pub end_state: S,
}

/// The trajectories every worker writes into and learners read from.
#[derive(Debug)]
pub struct ReplayBuffer<A, S> {
    trajectories: Mutex<Vec<TrajectoryHandle<A, S>>>,
}

impl<A, S> Default for ReplayBuffer<A, S> {
    fn default() -> Self {
        Self {
            trajectories: Mutex::new(Vec::new()),
        }
    }
}

impl<A: Clone, S: Clone> ReplayBuffer<A, S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new open trajectory starting at `opening`.
    ///
    /// # Returns
    /// The handle the caller appends transitions through.
    pub fn emplace_trajectory(&self, opening: S) -> TrajectoryHandle<A, S> {
        let handle = Arc::new(Mutex::new(Trajectory::new(opening)));
        self.trajectories.lock().push(Arc::clone(&handle));
        handle
    }

    /// Returns the amount of trajectories held.
    pub fn len(&self) -> usize {
        self.trajectories.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the amount of transitions held across every trajectory.
    pub fn num_transitions(&self) -> usize {
        self.trajectories.lock().iter().map(|t| t.lock().len()).sum()
    }

    /// Produces one temporal difference view per trajectory, oldest first.
    ///
    /// Every view keeps its trajectory locked until dropped: workers stepping that trajectory,
    /// [`ReplayBuffer::num_transitions`], [`ReplayBuffer::forget`] and further samples block
    /// until then, so views must be dropped before any of those run on the same thread.
    ///
    /// # Arguments
    /// * `n` - The maximum amount of views, every trajectory when `None`.
    /// * `max_length` - The maximum amount of transitions per view, unbounded when `None`.
    pub fn sample_td(&self, n: Option<usize>, max_length: Option<usize>) -> Vec<Td<A, S>> {
        // The buffer is released before any trajectory is locked.
        let handles: Vec<_> = {
            let trajectories = self.trajectories.lock();
            let n = n.unwrap_or(trajectories.len());
            trajectories.iter().take(n).cloned().collect()
        };

        let views: Vec<_> = handles
            .iter()
            .map(|handle| {
                let mut trajectory = handle.lock_arc();
                trajectory.fill_reference();
                let len = max_length.map_or(trajectory.len(), |max| max.min(trajectory.len()));
                Td { trajectory, len }
            })
            .collect();

        trace!(views = views.len(); "sampled temporal differences");
        views
    }

    /// Draws `n` transitions uniformly over the concatenation of every trajectory, so longer
    /// trajectories are proportionally more likely to be picked.
    ///
    /// # Returns
    /// The sampled transitions, none if the buffer holds no transitions.
    pub fn sample_transitions<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<SampledTransition<A, S>>> {
        let trajectories = self.trajectories.lock();
        let mut guards: Vec<_> = trajectories.iter().map(|t| t.lock()).collect();
        guards.iter_mut().for_each(|t| t.fill_reference());

        let total: usize = guards.iter().map(|t| t.len()).sum();
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut result = Vec::with_capacity(n);
        for _ in 0..n {
            let mut index = rng.random_range(0..total);

            for trajectory in &guards {
                if index >= trajectory.len() {
                    index -= trajectory.len();
                    continue;
                }

                let transition = &trajectory.transitions()[index];
                result.push(SampledTransition {
                    start_state: trajectory.start_state(index)?.clone(),
                    action: transition.action.clone(),
                    reward: transition.reward,
                    end_state: transition.end_state.clone(),
                });
                break;
            }
        }

        if result.len() != n {
            return Err(RlErr::len_mismatch("sampled transitions", result.len(), n));
        }

        Ok(result)
    }

    /// Evicts every frozen trajectory and collapses every open one to its last state, so
    /// running episodes carry on without the transitions already learned from.
    pub fn forget(&self) {
        let mut trajectories = self.trajectories.lock();
        let before = trajectories.len();

        trajectories.retain(|handle| {
            let mut trajectory = handle.lock();
            if trajectory.is_frozen() {
                return false;
            }

            trajectory.collapse();
            true
        });

        let kept = trajectories.len();
        trace!(evicted = before - kept, kept = kept; "forgot experience");
    }
}

/// Adds up the rewards of every transition visible through `experience`.
pub fn total_rewards<A, S>(experience: &[Td<A, S>]) -> f32 {
    experience
        .iter()
        .flat_map(|td| td.transitions())
        .map(|t| t.reward)
        .sum()
}
