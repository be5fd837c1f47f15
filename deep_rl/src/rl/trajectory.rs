use crate::{Result, RlErr};

/// Where the state a transition started from is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartState {
    /// The trajectory's opening state.
    Opening,
    /// The end state of the transition at this index.
    After(usize),
}

/// A single environment step.
#[derive(Debug, Clone)]
pub struct Transition<A, S> {
    start: Option<StartState>,
    pub action: A,
    pub reward: f32,
    pub end_state: S,
}

impl<A, S> Transition<A, S> {
    /// The reference to the start state, `None` until the trajectory's references are filled.
    pub fn start(&self) -> Option<StartState> {
        self.start
    }
}

/// An opening state followed by the transitions of one episode.
///
/// An open trajectory is still being played, a frozen one reached a terminal state and no longer
/// accepts transitions.
#[derive(Debug, Clone)]
pub struct Trajectory<A, S> {
    opening: S,
    transitions: Vec<Transition<A, S>>,
    frozen: bool,
}

impl<A, S> Trajectory<A, S> {
    pub fn new(opening: S) -> Self {
        Self {
            opening,
            transitions: Vec::new(),
            frozen: false,
        }
    }

    pub fn opening(&self) -> &S {
        &self.opening
    }

    pub fn transitions(&self) -> &[Transition<A, S>] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Appends a transition that starts at the current last state.
    ///
    /// # Returns
    /// An error if the trajectory is frozen.
    pub fn add_transition(&mut self, action: A, reward: f32, end_state: S) -> Result<()> {
        if self.frozen {
            return Err(RlErr::FrozenTrajectory);
        }

        self.transitions.push(Transition {
            start: None,
            action,
            reward,
            end_state,
        });

        Ok(())
    }

    /// The state the next transition would start from.
    pub fn last_state(&self) -> &S {
        self.state_after(self.transitions.len())
    }

    /// Links every transition to the state it started from.
    pub fn fill_reference(&mut self) {
        for (i, transition) in self.transitions.iter_mut().enumerate() {
            transition.start = Some(match i {
                0 => StartState::Opening,
                i => StartState::After(i - 1),
            });
        }
    }

    /// Marks the episode as over.
    pub fn freeze(&mut self) {
        self.frozen = true;
        self.fill_reference();
    }

    /// Resolves the start state of the `i`th transition through its reference.
    pub fn start_state(&self, i: usize) -> Result<&S> {
        let transition = self.transitions.get(i).ok_or(RlErr::OutOfBounds {
            what: "trajectory",
            index: i,
            len: self.transitions.len(),
        })?;

        match transition.start {
            Some(StartState::Opening) => Ok(&self.opening),
            Some(StartState::After(j)) => Ok(&self.transitions[j].end_state),
            None => Err(RlErr::UnlinkedTransition { index: i }),
        }
    }

    /// The state reached after the first `n` transitions.
    pub(crate) fn state_after(&self, n: usize) -> &S {
        match n.checked_sub(1).and_then(|i| self.transitions.get(i)) {
            Some(transition) => &transition.end_state,
            None => &self.opening,
        }
    }

    /// Drops every transition, keeping the last state as the new opening.
    ///
    /// # Returns
    /// Whether there was anything to drop.
    pub(crate) fn collapse(&mut self) -> bool {
        let Some(last) = self.transitions.pop() else {
            return false;
        };

        self.opening = last.end_state;
        self.transitions.clear();
        true
    }
}
