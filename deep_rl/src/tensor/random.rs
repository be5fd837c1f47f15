use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng, distr::weighted::WeightedIndex, rngs::StdRng};
use rand_distr::{Distribution, Normal, Uniform};

use crate::{Result, RlErr};

/// Fills `out` with samples of a normal distribution.
///
/// # Returns
/// An error if `std_dev` is negative or not finite.
pub fn normal_fill<R: Rng + ?Sized>(
    rng: &mut R,
    out: &mut [f32],
    mean: f32,
    std_dev: f32,
) -> Result<()> {
    let normal =
        Normal::new(mean, std_dev).map_err(|e| RlErr::InvalidDistribution(e.to_string()))?;
    out.iter_mut().for_each(|x| *x = normal.sample(rng));
    Ok(())
}

/// Fills `out` with samples of the uniform distribution over `[low, high)`.
pub fn uniform_fill<R: Rng + ?Sized>(
    rng: &mut R,
    out: &mut [f32],
    low: f32,
    high: f32,
) -> Result<()> {
    let uniform = Uniform::new(low, high).map_err(|e| RlErr::InvalidDistribution(e.to_string()))?;
    out.iter_mut().for_each(|x| *x = uniform.sample(rng));
    Ok(())
}

/// Draws an index with probability proportional to its weight.
///
/// # Returns
/// An error if the weights are empty, negative or all zero.
pub fn discrete_sample<R: Rng + ?Sized>(rng: &mut R, weights: &[f32]) -> Result<usize> {
    let index = WeightedIndex::new(weights).map_err(|e| RlErr::InvalidDistribution(e.to_string()))?;
    Ok(index.sample(rng))
}

/// Creates the generator owned by a single worker.
///
/// # Arguments
/// * `master_seed` - The seed shared by the whole run.
/// * `worker_index` - The worker's position in the pool.
pub fn seeded_rng(master_seed: u64, worker_index: usize) -> StdRng {
    StdRng::seed_from_u64(master_seed.wrapping_add(worker_index as u64))
}

/// Resolves the run's master seed, falling back to the wall clock.
pub fn master_seed(configured: Option<u64>) -> u64 {
    configured.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discrete_sample_respects_zero_weights() {
        let mut rng = seeded_rng(3, 0);
        for _ in 0..100 {
            let i = discrete_sample(&mut rng, &[0., 1., 0., 3.]).unwrap();
            assert!(i == 1 || i == 3);
        }

        assert!(discrete_sample(&mut rng, &[0., 0.]).is_err());
        assert!(discrete_sample(&mut rng, &[]).is_err());
    }

    #[test]
    fn test_worker_generators_are_reproducible_and_distinct() {
        let mut a = seeded_rng(11, 2);
        let mut b = seeded_rng(11, 2);
        let mut c = seeded_rng(11, 3);

        let (x, y, z): (u64, u64, u64) = (a.random(), b.random(), c.random());
        assert_eq!(x, y);
        assert_ne!(x, z);
    }

    #[test]
    fn test_fills() {
        let mut rng = seeded_rng(5, 0);
        let mut buf = [0.; 256];

        uniform_fill(&mut rng, &mut buf, -0.5, 0.5).unwrap();
        assert!(buf.iter().all(|x| (-0.5..0.5).contains(x)));

        normal_fill(&mut rng, &mut buf, 0., 0.01).unwrap();
        assert!(buf.iter().all(|x| x.abs() < 0.1));
        assert!(normal_fill(&mut rng, &mut buf, 0., f32::NAN).is_err());
    }
}
