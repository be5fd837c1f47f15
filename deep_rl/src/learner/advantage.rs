//! Return and advantage estimators, computed one trajectory at a time.

/// Discounted return-to-go of every step, `R_t = r_t + gamma * R_{t+1}`, with nothing after the
/// last step.
pub fn discounted_returns(rewards: &[f32], gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.; rewards.len()];
    let mut acc = 0.;

    for (ret, reward) in returns.iter_mut().zip(rewards).rev() {
        acc = reward + gamma * acc;
        *ret = acc;
    }

    returns
}

/// Flattens the per trajectory returns, subtracting the mean return of the first steps.
///
/// Empty trajectories neither contribute rows nor count towards the baseline.
///
/// # Returns
/// The advantages and the baseline that was subtracted.
pub fn returns_with_baseline(returns: &[Vec<f32>]) -> (Vec<f32>, f32) {
    let firsts: Vec<f32> = returns.iter().filter_map(|r| r.first().copied()).collect();
    let baseline = match firsts.len() {
        0 => 0.,
        n => firsts.iter().sum::<f32>() / n as f32,
    };

    let advantages = returns.iter().flatten().map(|r| r - baseline).collect();
    (advantages, baseline)
}

/// One step temporal difference residuals, `delta_t = r_t + gamma * V_{t+1} - V_t`.
///
/// # Arguments
/// * `rewards` - The rewards of a trajectory's steps.
/// * `values` - The value estimates of every start state followed by the final state, so one
///   more than `rewards`.
/// * `gamma` - The discount factor.
/// * `frozen` - Whether the final state is terminal, its value is then taken as zero.
pub fn td_residuals(rewards: &[f32], values: &[f32], gamma: f32, frozen: bool) -> Vec<f32> {
    debug_assert_eq!(values.len(), rewards.len() + 1);

    rewards
        .iter()
        .enumerate()
        .map(|(t, reward)| {
            let next = if frozen && t + 1 == rewards.len() {
                0.
            } else {
                values[t + 1]
            };
            reward + gamma * next - values[t]
        })
        .collect()
}

/// Generalized advantage estimation, `A_t = sum_k (gamma * lambda)^k * delta_{t+k}` within the
/// trajectory.
pub fn gae(deltas: &[f32], gamma: f32, lambda: f32) -> Vec<f32> {
    let mut advantages = vec![0.; deltas.len()];
    let mut acc = 0.;

    for (adv, delta) in advantages.iter_mut().zip(deltas).rev() {
        acc = delta + gamma * lambda * acc;
        *adv = acc;
    }

    advantages
}

/// Regression targets for the value model: `r_t + gamma * V_{t+1}` for every step, followed by
/// the target of the final state, its current estimate or zero when it is terminal.
pub fn value_targets(rewards: &[f32], values: &[f32], gamma: f32, frozen: bool) -> Vec<f32> {
    debug_assert_eq!(values.len(), rewards.len() + 1);

    let last = if frozen { 0. } else { values[rewards.len()] };
    let mut next_values = values[1..].to_vec();
    if let Some(v) = next_values.last_mut() {
        *v = last;
    }

    let mut targets: Vec<f32> = rewards
        .iter()
        .zip(&next_values)
        .map(|(reward, next)| reward + gamma * next)
        .collect();
    targets.push(last);
    targets
}
