use std::sync::Arc;

use bin_packing::{
    BestFitPolicy, BinAction, BinPacking, CAPACITY, Observation, Packer, PackingWorker, evaluate,
};
use deep_rl::{
    Result,
    rl::{Environment, Policy, RandomPolicy, ReplayBuffer, Worker},
    tensor::random::seeded_rng,
};
use rand::RngCore;

/// Drops every item into the first bin.
struct FirstBin;

impl Policy<BinAction, Observation> for FirstBin {
    fn react(&self, _state: &Observation, _rng: &mut dyn RngCore) -> Result<BinAction> {
        BinAction::new(0)
    }
}

fn worker(policy: Arc<dyn Policy<BinAction, Observation>>, seed: u64) -> PackingWorker {
    Worker::new(
        0,
        BinPacking::new(seeded_rng(seed, 1)),
        Packer,
        policy,
        Arc::new(ReplayBuffer::new()),
        seed,
    )
}

#[test]
fn test_first_bin_episodes() {
    let buffer = Arc::new(ReplayBuffer::new());
    let mut worker: PackingWorker = Worker::new(
        0,
        BinPacking::new(seeded_rng(11, 1)),
        Packer,
        Arc::new(FirstBin),
        Arc::clone(&buffer),
        11,
    );

    for _ in 0..20 {
        let stats = worker.play_one_episode().unwrap();
        assert!(!worker.is_playing());

        // Every step places an item except the one overflowing the bin.
        let placed = stats.total_reward();
        assert_eq!(stats.length() as f32, placed);
        // Two large items fill the width, four items of any kind fill the height.
        assert!((2. ..=4.).contains(&placed), "{placed}");

        let experience = buffer.sample_td(None, None);
        assert_eq!(experience.len(), 1);
        let td = &experience[0];
        assert!(td.frozen());
        assert_eq!(td.len(), stats.transitions());
        assert!(td.end_state().overflowed());
        assert!(td.transitions().iter().all(|t| t.action.choice() == 0));

        drop(experience);
        buffer.forget();
        assert!(buffer.is_empty());
    }
}

#[test]
fn test_episode_resets_the_bins() {
    let mut worker = worker(Arc::new(FirstBin), 2);
    worker.play_one_episode().unwrap();
    let ob = worker.env().view(0);
    assert!(!ob.overflowed());
    assert!(ob.bins.iter().all(|&bin| bin == CAPACITY));
}

#[test]
fn test_best_fit_beats_random() {
    let episodes = 50;
    let best_fit = evaluate(Arc::new(BestFitPolicy), episodes, seeded_rng(3, 1), 3).unwrap();
    let random = evaluate(
        Arc::new(RandomPolicy::<BinAction>::new()),
        episodes,
        seeded_rng(3, 1),
        3,
    )
    .unwrap();

    assert!(best_fit > random, "best fit {best_fit}, random {random}");
    assert!(best_fit > 20., "{best_fit}");
}
