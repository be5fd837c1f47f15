mod conv1d;
mod conv2d;
mod full;
mod layer;
mod relu;
mod softmax;

pub use conv1d::Conv1d;
pub use conv2d::Conv2d;
pub use full::Full;
pub use layer::{Layer, LayerKind};
pub use relu::Relu;
pub use softmax::{Softmax, SoftmaxCrossEntropy};
