use crate::tensor::Vector;

/// An observation of the environment that can be fed to a model.
pub trait State: Clone + Send + Sync + 'static {
    /// The amount of features every state of this type produces.
    fn length() -> usize;

    /// Writes the features of the state, `out` holds exactly [`State::length`] elements.
    fn to_vector(&self, out: &mut [f32]);
}

/// Vectorizes a single state.
pub fn to_vector<S: State>(state: &S) -> Vector {
    let mut out = Vector::zeros(S::length());
    state.to_vector(out.as_mut_slice());
    out
}
