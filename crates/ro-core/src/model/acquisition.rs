//! Upper-confidence-bound acquisition.
//!
//! The exploration coefficient follows the GP-UCB-style schedule
//!
//! ```text
//! γ(t) = d · log(t + 1)
//! ℓ(t) = log(max(t / B, 1))
//! β(t) = 2B² + 300 · γ(t) · ℓ(t)³        B = 1.0
//! ```
//!
//! with d the combined arm + context dimension. The constants determine
//! the explore/exploit balance and are part of the external contract.

use crate::model::gp::{GpError, SlidingWindowGp};
use ro_common::{concat_input, Arm, Context};

/// Confidence-bound scale parameter B.
pub const UCB_B: f64 = 1.0;

/// Theoretical UCB confidence scaler β(t) for input dimension `d`.
///
/// Strictly positive and non-decreasing in `t`; β(1) = 2B² because the
/// log term clamps to zero.
pub fn ucb_beta(t: u64, d: usize, b: f64) -> f64 {
    let t = t as f64;
    let gamma_t = d as f64 * (t + 1.0).ln();
    let log_term = (t / b).max(1.0).ln();
    2.0 * b * b + 300.0 * gamma_t * log_term.powi(3)
}

/// UCB scores `μ + √β·σ` at a batch of inputs.
pub fn ucb_scores(
    gp: &SlidingWindowGp,
    inputs: &[Vec<f64>],
    beta: f64,
) -> Result<Vec<f64>, GpError> {
    let pred = gp.predict(inputs)?;
    Ok(pred
        .mean
        .iter()
        .zip(pred.std.iter())
        .map(|(m, s)| m + beta.sqrt() * s)
        .collect())
}

/// Outcome of a UCB arm selection.
#[derive(Debug, Clone, PartialEq)]
pub struct UcbChoice {
    /// Index into the evaluated arm sequence.
    pub index: usize,
    /// UCB score of the chosen arm.
    pub score: f64,
}

/// Pick the UCB-maximising arm for the given context.
///
/// Each arm is concatenated with the context, scored under β(t), and the
/// maximal score wins. Ties break toward the lowest index.
pub fn select_ucb_action(
    arms: &[Arm],
    context: &Context,
    gp: &SlidingWindowGp,
    t: u64,
) -> Result<UcbChoice, GpError> {
    debug_assert!(!arms.is_empty());
    let d = arms[0].dim() + context.dim();
    let beta = ucb_beta(t, d, UCB_B);
    let inputs: Vec<Vec<f64>> = arms.iter().map(|a| concat_input(a, context)).collect();
    let scores = ucb_scores(gp, &inputs, beta)?;

    let mut best = UcbChoice {
        index: 0,
        score: scores[0],
    };
    for (i, score) in scores.iter().enumerate().skip(1) {
        if *score > best.score {
            best = UcbChoice {
                index: i,
                score: *score,
            };
        }
    }
    Ok(best)
}
