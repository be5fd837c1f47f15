mod base;
mod ops;
pub mod random;
mod reduce;
mod simd;
mod storage;

pub use base::{Matrix, Tensor, Vector};
pub use reduce::argmax;
pub use simd::{dot, dot_scalar};
pub use storage::{ALIGNMENT, LANES, Locality, is_aligned};
