use deep_rl::{
    Result,
    rl::{Action, Policy},
};
use rand::RngCore;

use super::{BinAction, CAPACITY, NUM_BINS, Observation};

/// Score given to bins the item does not fit in.
const NO_FIT: f32 = -1.;

/// Puts the item in the bin it fills the most, relative to the bin's remaining extent.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestFitPolicy;

impl Policy<BinAction, Observation> for BestFitPolicy {
    fn react(&self, state: &Observation, _rng: &mut dyn RngCore) -> Result<BinAction> {
        let (iw, ih) = (state.item.0 as f32, state.item.1 as f32);

        let mut scores = [NO_FIT; NUM_BINS];
        for (i, score) in scores.iter_mut().enumerate() {
            if state.fits(i) {
                let (w, h) = state.bins[i];
                *score = iw / w as f32 + ih / h as f32;
            }
        }

        BinAction::from_vector_deterministic(&scores)
    }
}

/// Takes any bin the item fits in, except those it would leave with half a bin along one side and
/// nothing along the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinWastePolicy;

impl Policy<BinAction, Observation> for MinWastePolicy {
    fn react(&self, state: &Observation, _rng: &mut dyn RngCore) -> Result<BinAction> {
        let mut scores = [NO_FIT; NUM_BINS];

        for (i, score) in scores.iter_mut().enumerate() {
            if !state.fits(i) {
                continue;
            }

            let (w, h) = state.bins[i];
            let residual = (w - state.item.0, h - state.item.1);
            let wasteful = residual == (CAPACITY.0 / 2, 0) || residual == (0, CAPACITY.1 / 2);
            *score = if wasteful { 0. } else { 1. };
        }

        BinAction::from_vector_deterministic(&scores)
    }
}

#[cfg(test)]
mod tests {
    use deep_rl::tensor::random::seeded_rng;

    use super::*;
    use crate::{LARGE_ITEM, SMALL_ITEM};

    fn observation(bins: [(i32, i32); NUM_BINS], item: (i32, i32)) -> Observation {
        Observation { bins, item }
    }

    #[test]
    fn test_best_fit_prefers_the_fullest_bin() {
        let mut bins = [CAPACITY; NUM_BINS];
        bins[2] = (4, 4);
        bins[5] = (3, 8);
        let mut rng = seeded_rng(0, 0);

        let action = BestFitPolicy
            .react(&observation(bins, LARGE_ITEM), &mut rng)
            .unwrap();
        assert_eq!(action.choice(), 2);

        let action = BestFitPolicy
            .react(&observation(bins, SMALL_ITEM), &mut rng)
            .unwrap();
        assert_eq!(action.choice(), 2);
    }

    #[test]
    fn test_min_waste_avoids_unfillable_residuals() {
        let mut bins = [(0, 0); NUM_BINS];
        bins[0] = (8, 2);
        bins[4] = (8, 4);
        let mut rng = seeded_rng(0, 0);

        // Bin 0 would keep a (4, 0) residual.
        let action = MinWastePolicy
            .react(&observation(bins, LARGE_ITEM), &mut rng)
            .unwrap();
        assert_eq!(action.choice(), 4);
    }
}
