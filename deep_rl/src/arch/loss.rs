use crate::{
    Result, RlErr,
    tensor::{Matrix, Vector},
};

fn check_column(labels: &Vector, output: &Matrix) -> Result<()> {
    if output.num_cols() != 1 || output.num_rows() != labels.len() {
        return Err(RlErr::ShapeMismatch {
            what: "regression output",
            got: output.shape().to_vec(),
            expected: vec![labels.len(), 1],
        });
    }

    Ok(())
}

/// Mean squared error between a single column output and its labels.
pub fn square_loss(labels: &Vector, output: &Matrix) -> Result<f32> {
    check_column(labels, output)?;
    if labels.is_empty() {
        return Ok(0.);
    }

    let diff = output.to_owned().flatten().sub(labels)?;
    Ok(diff.dot(&diff)? / labels.len() as f32)
}

/// Gradient of the squared error, `output - labels`, shaped like `output`.
pub fn square_loss_grad(labels: &Vector, output: &Matrix) -> Result<Matrix> {
    check_column(labels, output)?;
    let column = labels.to_owned().fold((labels.len(), 1))?;
    output.sub(&column)
}

/// Cross entropy gradient with respect to the logits, `output - truth`.
pub fn softmax_cross_entropy_grad(truth: &Matrix, output: &Matrix) -> Result<Matrix> {
    output.sub(truth)
}

/// Cross entropy gradient with respect to the logits for integer labels.
pub fn softmax_cross_entropy_label_grad(labels: &[usize], output: &Matrix) -> Result<Matrix> {
    if labels.len() != output.num_rows() {
        return Err(RlErr::len_mismatch("labels", labels.len(), output.num_rows()));
    }

    let mut grad = output.to_owned();
    for (i, &label) in labels.iter().enumerate() {
        let row = grad.row_mut(i)?;
        let len = row.len();
        let slot = row.get_mut(label).ok_or(RlErr::OutOfBounds {
            what: "label",
            index: label,
            len,
        })?;
        *slot -= 1.;
    }

    Ok(grad)
}
