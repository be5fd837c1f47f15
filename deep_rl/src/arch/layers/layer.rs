use rand::Rng;

use crate::{
    Result,
    tensor::{Matrix, Vector},
};

/// The differentiable operation a layer performs.
#[derive(Debug, Clone)]
pub enum LayerKind {
    Full(super::Full),
    Conv1d(super::Conv1d),
    Conv2d(super::Conv2d),
    Relu(super::Relu),
    Softmax(super::Softmax),
    SoftmaxCrossEntropy(super::SoftmaxCrossEntropy),
}
use LayerKind as K;

/// A layer of a model, optionally carrying a display name.
#[derive(Debug, Clone)]
pub struct Layer {
    kind: LayerKind,
    name: Option<String>,
}

impl From<LayerKind> for Layer {
    fn from(kind: LayerKind) -> Self {
        Self { kind, name: None }
    }
}

impl Layer {
    pub fn full(input_size: usize, output_size: usize) -> Self {
        K::Full(super::Full::new(input_size, output_size)).into()
    }

    pub fn conv1d(input_channels: usize, output_channels: usize) -> Self {
        K::Conv1d(super::Conv1d::new(input_channels, output_channels)).into()
    }

    pub fn conv2d(
        rows: usize,
        cols: usize,
        filter_size: usize,
        input_channels: usize,
        output_channels: usize,
    ) -> Self {
        let conv = super::Conv2d::new(rows, cols, filter_size, input_channels, output_channels);
        K::Conv2d(conv).into()
    }

    pub fn relu() -> Self {
        K::Relu(super::Relu).into()
    }

    pub fn softmax() -> Self {
        K::Softmax(super::Softmax).into()
    }

    pub fn softmax_cross_entropy() -> Self {
        K::SoftmaxCrossEntropy(super::SoftmaxCrossEntropy).into()
    }

    /// Attaches a display name to the layer.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.params().len()
    }

    pub fn params(&self) -> &[f32] {
        match &self.kind {
            K::Full(l) => l.params(),
            K::Conv1d(l) => l.params(),
            K::Conv2d(l) => l.params(),
            K::Relu(_) | K::Softmax(_) | K::SoftmaxCrossEntropy(_) => &[],
        }
    }

    pub fn params_mut(&mut self) -> &mut [f32] {
        match &mut self.kind {
            K::Full(l) => l.params_mut(),
            K::Conv1d(l) => l.params_mut(),
            K::Conv2d(l) => l.params_mut(),
            K::Relu(_) | K::Softmax(_) | K::SoftmaxCrossEntropy(_) => &mut [],
        }
    }

    /// Draws fresh parameters: normal for full layers, He for convolutions.
    pub fn init<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        match &mut self.kind {
            K::Full(l) => l.init(rng),
            K::Conv1d(l) => l.init(rng),
            K::Conv2d(l) => l.init(rng),
            K::Relu(_) | K::Softmax(_) | K::SoftmaxCrossEntropy(_) => Ok(()),
        }
    }

    /// Computes the output of the layer for a batch of rows.
    pub fn forward(&self, x: &Matrix) -> Result<Matrix> {
        match &self.kind {
            K::Full(l) => l.forward(x),
            K::Conv1d(l) => l.forward(x),
            K::Conv2d(l) => l.forward(x),
            K::Relu(l) => l.forward(x),
            K::Softmax(l) => l.forward(x),
            K::SoftmaxCrossEntropy(l) => l.forward(x),
        }
    }

    /// Computes the gradient with respect to the layer's input.
    ///
    /// # Arguments
    /// * `x` - The input the layer saw on the forward pass.
    /// * `grad` - The gradient with respect to the layer's output.
    pub fn backward(&self, x: &Matrix, grad: &Matrix) -> Result<Matrix> {
        match &self.kind {
            K::Full(l) => l.backward(x, grad),
            K::Conv1d(l) => l.backward(x, grad),
            K::Conv2d(l) => l.backward(x, grad),
            K::Relu(l) => l.backward(x, grad),
            K::Softmax(l) => l.backward(x, grad),
            K::SoftmaxCrossEntropy(l) => l.backward(x, grad),
        }
    }

    /// Computes the gradient with respect to the layer's own parameters, laid out like
    /// [`Layer::params`].
    pub fn gradient(&self, x: &Matrix, grad: &Matrix) -> Result<Vector> {
        match &self.kind {
            K::Full(l) => l.gradient(x, grad),
            K::Conv1d(l) => l.gradient(x, grad),
            K::Conv2d(l) => l.gradient(x, grad),
            K::Relu(_) | K::Softmax(_) | K::SoftmaxCrossEntropy(_) => Ok(Vector::zeros(0)),
        }
    }
}
