use rand::Rng;

use crate::{Result, tensor::random};

/// Standard deviation of the normal initialization.
pub const NORMAL_STD_DEV: f32 = 0.01;

/// Draws every weight from N(0, 0.01).
pub fn normal<R: Rng + ?Sized>(rng: &mut R, weights: &mut [f32]) -> Result<()> {
    random::normal_fill(rng, weights, 0., NORMAL_STD_DEV)
}

/// He (Kaiming) initialization: every weight is drawn from N(0, √(2 / fan_in)).
///
/// # Arguments
/// * `rng` - The generator to draw from.
/// * `weights` - The weights to overwrite.
/// * `fan_in` - The number of inputs feeding every unit.
pub fn he<R: Rng + ?Sized>(rng: &mut R, weights: &mut [f32], fan_in: usize) -> Result<()> {
    let std_dev = (2. / fan_in.max(1) as f32).sqrt();
    random::normal_fill(rng, weights, 0., std_dev)
}
