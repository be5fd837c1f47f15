//! Online two dimensional bin packing: items arrive one at a time and are dropped into one of
//! [`NUM_BINS`] bins until a bin overflows.

pub mod config;
mod policies;

use std::sync::Arc;

use deep_rl::{
    Result,
    rl::{Agent, DiscreteAction, Environment, Policy, ReplayBuffer, State, Worker, total_rewards},
};
use rand::{Rng, rngs::StdRng};

pub use policies::{BestFitPolicy, MinWastePolicy};

pub const NUM_BINS: usize = 8;

/// The extent of an empty bin.
pub const CAPACITY: (i32, i32) = (8, 8);

pub const LARGE_ITEM: (i32, i32) = (4, 2);
pub const SMALL_ITEM: (i32, i32) = (1, 2);
pub const LARGE_ITEM_PROBABILITY: f64 = 0.4;

/// Features per bin in the observation vector.
pub const BIN_FEATURES: usize = 4;

/// Which bin the next item goes into.
pub type BinAction = DiscreteAction<NUM_BINS>;

/// The remaining extent of every bin and the item to place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub bins: [(i32, i32); NUM_BINS],
    pub item: (i32, i32),
}

impl Observation {
    fn empty() -> Self {
        Self {
            bins: [CAPACITY; NUM_BINS],
            item: (0, 0),
        }
    }

    /// Whether some bin holds more than its capacity.
    pub fn overflowed(&self) -> bool {
        self.bins.iter().any(|&(w, h)| w < 0 || h < 0)
    }

    /// Whether the current item fits in bin `i`.
    pub fn fits(&self, i: usize) -> bool {
        let (w, h) = self.bins[i];
        self.item.0 <= w && self.item.1 <= h
    }
}

impl State for Observation {
    fn length() -> usize {
        BIN_FEATURES * NUM_BINS
    }

    fn to_vector(&self, out: &mut [f32]) {
        let (cw, ch) = (CAPACITY.0 as f32, CAPACITY.1 as f32);
        let (iw, ih) = (self.item.0 as f32 / cw, self.item.1 as f32 / ch);

        for (features, &(w, h)) in out.chunks_exact_mut(BIN_FEATURES).zip(&self.bins) {
            features.copy_from_slice(&[w as f32 / cw, h as f32 / ch, iw, ih]);
        }
    }
}

/// The bins and the stream of incoming items.
pub struct BinPacking {
    state: Observation,
    rng: StdRng,
}

impl BinPacking {
    /// Creates an environment with empty bins, items are drawn from `rng`.
    pub fn new(rng: StdRng) -> Self {
        let mut env = Self {
            state: Observation::empty(),
            rng,
        };
        env.next_item();
        env
    }

    fn next_item(&mut self) {
        self.state.item = if self.rng.random_bool(LARGE_ITEM_PROBABILITY) {
            LARGE_ITEM
        } else {
            SMALL_ITEM
        };
    }
}

impl Environment<BinAction, Observation> for BinPacking {
    fn apply(&mut self, action: &BinAction, _agent_id: usize) {
        let item = self.state.item;
        let bin = &mut self.state.bins[action.choice()];
        bin.0 -= item.0;
        bin.1 -= item.1;

        if bin.0 < 0 || bin.1 < 0 {
            return;
        }

        self.next_item();
    }

    fn view(&self, _agent_id: usize) -> Observation {
        self.state.clone()
    }

    fn reset(&mut self, _agent_id: usize) {
        self.state = Observation::empty();
        self.next_item();
    }
}

/// Earns a point per item placed, the episode ends on the first overflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct Packer;

impl Agent<Observation> for Packer {
    fn game_over(&self, state: &Observation) -> bool {
        state.overflowed()
    }

    fn get_reward(&self, _previous: &Observation, current: &Observation) -> f32 {
        if self.game_over(current) { 0. } else { 1. }
    }
}

pub type PackingWorker = Worker<BinAction, Observation, BinPacking, Packer>;

/// Plays `episodes` full episodes with `policy` on a fresh environment.
///
/// # Returns
/// The average amount of items placed per episode.
pub fn evaluate(
    policy: Arc<dyn Policy<BinAction, Observation>>,
    episodes: usize,
    env_rng: StdRng,
    seed: u64,
) -> Result<f32> {
    if episodes == 0 {
        return Ok(0.);
    }

    let buffer = Arc::new(ReplayBuffer::new());
    let mut worker = Worker::new(
        0,
        BinPacking::new(env_rng),
        Packer,
        policy,
        Arc::clone(&buffer),
        seed,
    );

    let mut total = 0.;
    for _ in 0..episodes {
        worker.play_one_episode()?;
        total += total_rewards(&buffer.sample_td(None, None));
        buffer.forget();
    }

    Ok(total / episodes as f32)
}

#[cfg(test)]
mod tests {
    use deep_rl::tensor::random::seeded_rng;

    use super::*;

    #[test]
    fn test_observation_vector() {
        let mut ob = Observation::empty();
        ob.bins[1] = (4, 6);
        ob.item = LARGE_ITEM;

        let mut out = vec![0.; Observation::length()];
        ob.to_vector(&mut out);
        assert_eq!(out.len(), 32);
        assert_eq!(&out[..4], &[1., 1., 0.5, 0.25]);
        assert_eq!(&out[4..8], &[0.5, 0.75, 0.5, 0.25]);
    }

    #[test]
    fn test_overflow_keeps_the_item() {
        let mut env = BinPacking::new(seeded_rng(0, 0));
        let mut ob = env.view(0);
        let mut placed = 0;

        while !ob.overflowed() {
            let item = ob.item;
            env.apply(&BinAction::new(3).unwrap(), 0);
            let next = env.view(0);
            if next.overflowed() {
                assert_eq!(next.item, item);
            } else {
                placed += 1;
            }
            ob = next;
        }

        assert!(placed >= 2, "{placed}");
        assert!(ob.bins[3].0 < 0 || ob.bins[3].1 < 0);

        env.reset(0);
        assert!(env.view(0).bins.iter().all(|&bin| bin == CAPACITY));
    }

    #[test]
    fn test_reward_rules() {
        let mut ob = Observation::empty();
        assert_eq!(Packer.get_reward(&ob, &ob), 1.);

        ob.bins[7] = (2, -1);
        assert!(Packer.game_over(&ob));
        assert_eq!(Packer.get_reward(&ob, &ob), 0.);
    }
}
