use crate::{
    Result, RlErr,
    arch::softmax_cross_entropy_grad,
    rl::Action,
    tensor::{Matrix, Vector},
};

/// Bounds the KL penalty coefficient is kept within.
pub const MIN_BETA: f32 = 1e-25;
pub const MAX_BETA: f32 = 0.1;

fn check_batch<A>(actions: &[A], advantages: &[f32], output: &Matrix) -> Result<()> {
    if actions.len() != advantages.len() {
        return Err(RlErr::len_mismatch(
            "advantages",
            advantages.len(),
            actions.len(),
        ));
    }

    if output.num_rows() != actions.len() {
        return Err(RlErr::len_mismatch(
            "policy output rows",
            output.num_rows(),
            actions.len(),
        ));
    }

    Ok(())
}

/// Builds the gradient of a per example objective, one row per action.
fn per_example<A, F>(actions: &[A], advantages: &[f32], output: &Matrix, f: F) -> Result<Matrix>
where
    F: Fn(&A, &[f32], &mut [f32], f32) -> Result<()>,
{
    check_batch(actions, advantages, output)?;

    let mut grad = Matrix::zeros(output.dim());
    for (i, (action, &advantage)) in actions.iter().zip(advantages).enumerate() {
        f(action, output.row(i)?, grad.row_mut(i)?, advantage)?;
    }

    Ok(grad)
}

/// The score function gradient of the policy, with respect to the logits of its softmax output.
pub fn policy_loss<A: Action>(
    actions: &[A],
    advantages: &[f32],
    output: &Matrix,
) -> Result<Matrix> {
    per_example(actions, advantages, output, |action, input, out, advantage| {
        action.softmax_gradient_log(input, out, advantage)
    })
}

/// The gradient of the clipped surrogate objective, with respect to the policy's probabilities.
pub fn surrogate_loss<A: Action>(
    actions: &[A],
    advantages: &[f32],
    epsilon: f32,
    output: &Matrix,
) -> Result<Matrix> {
    per_example(actions, advantages, output, |action, input, out, advantage| {
        action.clipped_gradient(input, out, advantage, epsilon)
    })
}

/// `D_KL(p || q)`.
///
/// Terms where `p` is zero contribute nothing.
pub fn kl_divergence(p: &[f32], q: &[f32]) -> Result<f32> {
    if p.len() != q.len() {
        return Err(RlErr::len_mismatch("distribution", q.len(), p.len()));
    }

    Ok(p.iter()
        .zip(q)
        .filter(|&(&p, _)| p > 0.)
        .map(|(p, q)| p * (p / q).ln())
        .sum())
}

/// Halves `beta` when the divergence undershoots the target and doubles it when it overshoots.
///
/// # Returns
/// The adapted coefficient, within `[MIN_BETA, MAX_BETA]`.
pub fn adapt_beta(beta: f32, divergence: f32, d_targ: f32) -> f32 {
    let divergence = divergence.abs();
    let beta = if divergence < d_targ / 1.5 {
        beta / 2.
    } else if divergence > d_targ * 1.5 {
        beta * 2.
    } else {
        beta
    };

    beta.clamp(MIN_BETA, MAX_BETA)
}

/// The score function gradient plus `beta` times the cross entropy gradient pulling the policy
/// back to the distributions the actions were sampled from.
///
/// `beta` is used as is, then adapted to the mean divergence of the batch.
///
/// # Returns
/// The gradient and the mean `D_KL(new || old)` over the batch.
pub fn kl_regulated_loss<A: Action>(
    actions: &[A],
    advantages: &[f32],
    beta: &mut f32,
    d_targ: f32,
    output: &Matrix,
) -> Result<(Matrix, f32)> {
    let mut grad = policy_loss(actions, advantages, output)?;

    let width = output.num_cols();
    let mut old = Vec::with_capacity(actions.len() * width);
    for action in actions {
        old.extend_from_slice(action.distribution().ok_or(RlErr::MissingDistribution)?);
    }
    let old = Matrix::from_vec(output.dim(), old)?;

    let regulation = softmax_cross_entropy_grad(&old, output)?.map(|x| x * *beta);
    grad.add_inplace(&regulation)?;

    let mut divergence = Vector::zeros(actions.len());
    for (i, d) in divergence.as_mut_slice().iter_mut().enumerate() {
        *d = kl_divergence(output.row(i)?, old.row(i)?)?;
    }
    let divergence = divergence.mean();

    *beta = adapt_beta(*beta, divergence, d_targ);
    Ok((grad, divergence))
}
