use super::storage::{LANES, is_aligned};
use crate::{Result, RlErr};

/// Computes the inner product of `a` and `b`.
///
/// When both slices start on a 32 byte boundary the product is accumulated eight lanes at a
/// time (with AVX if the CPU has it), otherwise the plain scalar loop is used.
///
/// # Returns
/// The inner product or a shape error if the lengths differ.
pub fn dot(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RlErr::len_mismatch("dot operand", b.len(), a.len()));
    }

    if is_aligned(a) && is_aligned(b) {
        return Ok(dot_lanes(a, b));
    }

    Ok(dot_scalar(a, b))
}

/// Sequential inner product, the reference the lane paths are checked against.
pub fn dot_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn dot_lanes(a: &[f32], b: &[f32]) -> f32 {
    #[cfg(target_arch = "x86_64")]
    if std::arch::is_x86_feature_detected!("avx") {
        // SAFETY: AVX is available and both slices are 32 byte aligned.
        return unsafe { dot_avx(a, b) };
    }

    dot_chunked(a, b)
}

fn dot_chunked(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = [0f32; LANES];
    let mut xs = a.chunks_exact(LANES);
    let mut ys = b.chunks_exact(LANES);

    for (x, y) in xs.by_ref().zip(ys.by_ref()) {
        acc.iter_mut()
            .zip(x.iter().zip(y))
            .for_each(|(acc, (x, y))| *acc += x * y);
    }

    acc.iter().sum::<f32>() + dot_scalar(xs.remainder(), ys.remainder())
}

/// # Safety
/// The CPU must support AVX, both slices must have the same length and be 32 byte aligned.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx")]
unsafe fn dot_avx(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::x86_64::{
        _mm256_add_ps, _mm256_load_ps, _mm256_mul_ps, _mm256_setzero_ps, _mm256_storeu_ps,
    };

    let chunks = a.len() / LANES;
    let mut lanes = [0f32; LANES];

    unsafe {
        let mut acc = _mm256_setzero_ps();
        for i in 0..chunks {
            let x = _mm256_load_ps(a.as_ptr().add(i * LANES));
            let y = _mm256_load_ps(b.as_ptr().add(i * LANES));
            acc = _mm256_add_ps(acc, _mm256_mul_ps(x, y));
        }
        _mm256_storeu_ps(lanes.as_mut_ptr(), acc);
    }

    let tail = chunks * LANES;
    lanes.iter().sum::<f32>() + dot_scalar(&a[tail..], &b[tail..])
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::tensor::Vector;

    fn random_vector(rng: &mut StdRng, len: usize) -> Vector {
        let data = (0..len).map(|_| rng.random_range(-1.0..1.0)).collect();
        Vector::from_vec(len, data).unwrap()
    }

    #[test]
    fn test_fast_and_scalar_paths_agree() {
        let mut rng = StdRng::seed_from_u64(7);

        for len in 1..=64 {
            let a = random_vector(&mut rng, len);
            let b = random_vector(&mut rng, len);
            assert!(is_aligned(a.as_slice()) && is_aligned(b.as_slice()));

            let fast = dot(a.as_slice(), b.as_slice()).unwrap();
            let scalar = dot_scalar(a.as_slice(), b.as_slice());
            let magnitude: f32 = a
                .as_slice()
                .iter()
                .zip(b.as_slice())
                .map(|(x, y)| (x * y).abs())
                .sum();
            let tolerance = 2. * len as f32 * f32::EPSILON * magnitude.max(1.);

            assert!(
                (fast - scalar).abs() <= tolerance,
                "len {len}: fast {fast} scalar {scalar}"
            );
            assert!((dot_chunked(a.as_slice(), b.as_slice()) - scalar).abs() <= tolerance);
        }
    }

    #[test]
    fn test_unaligned_slices_fall_back() {
        let a = Vector::from_vec(9, (0..9).map(|x| x as f32).collect()).unwrap();
        let b = Vector::from_vec(9, vec![1.; 9]).unwrap();

        let shifted = dot(&a.as_slice()[1..], &b.as_slice()[1..]).unwrap();
        assert_eq!(shifted, 36.);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(dot(&[1., 2.], &[1.]).is_err());
    }
}
