pub mod arch;
pub mod config;
pub mod error;
pub mod learner;
pub mod optimization;
pub mod rl;
pub mod tensor;

pub use error::{Result, RlErr};
