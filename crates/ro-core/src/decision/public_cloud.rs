//! Unconstrained bandit for public-cloud mode.
//!
//! One GP over the scalarised reward `α·performance − β·cost`; arm
//! selection is plain UCB over the whole arm set, with no separate
//! exploration phase — the β(t) schedule is the explorer.

use crate::decision::BanditError;
use crate::model::gp::DEFAULT_WINDOW_SIZE;
use crate::model::{select_ucb_action, SlidingWindowGp};
use ro_common::{concat_input, Arm, Context};
use serde::Serialize;

/// Observation log kept alongside the GP.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublicHistory {
    pub actions: Vec<Arm>,
    pub contexts: Vec<Context>,
    pub rewards: Vec<f64>,
    pub performance: Vec<f64>,
    pub costs: Vec<f64>,
}

impl PublicHistory {
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

/// Contextual GP-UCB bandit maximising a weighted performance/cost scalar.
#[derive(Debug)]
pub struct PublicCloudBandit {
    action_space: Vec<Arm>,
    alpha: f64,
    beta: f64,
    t: u64,
    gp: SlidingWindowGp,
    history: PublicHistory,
}

impl PublicCloudBandit {
    /// Build a bandit over a frozen arm set with reward weights.
    ///
    /// The caller is expected to pass already-normalised weights (the
    /// objective enforcer scales them to sum to 1); negative weights are
    /// rejected here regardless.
    pub fn new(action_space: Vec<Arm>, alpha: f64, beta: f64) -> Result<Self, BanditError> {
        Self::with_window(action_space, alpha, beta, DEFAULT_WINDOW_SIZE)
    }

    pub fn with_window(
        action_space: Vec<Arm>,
        alpha: f64,
        beta: f64,
        window_size: usize,
    ) -> Result<Self, BanditError> {
        if action_space.is_empty() {
            return Err(BanditError::EmptyActionSpace);
        }
        if alpha < 0.0 || beta < 0.0 {
            return Err(BanditError::NegativeWeight { alpha, beta });
        }
        Ok(PublicCloudBandit {
            action_space,
            alpha,
            beta,
            t: 1,
            gp: SlidingWindowGp::new(window_size),
            history: PublicHistory::default(),
        })
    }

    /// Scalarised reward `α·performance − β·cost`.
    pub fn reward(&self, performance: f64, cost: f64) -> f64 {
        self.alpha * performance - self.beta * cost
    }

    /// UCB-maximising arm for the given context.
    pub fn select_action(&self, context: &Context) -> Result<Arm, BanditError> {
        let choice = select_ucb_action(&self.action_space, context, &self.gp, self.t)?;
        Ok(self.action_space[choice.index].clone())
    }

    /// Feed back an observation; returns the scalarised reward.
    pub fn update(
        &mut self,
        action: Arm,
        context: Context,
        performance: f64,
        cost: f64,
    ) -> Result<f64, BanditError> {
        let reward = self.reward(performance, cost);
        let x = concat_input(&action, &context);
        self.gp.update(&[x], &[reward])?;
        self.history.actions.push(action);
        self.history.contexts.push(context);
        self.history.rewards.push(reward);
        self.history.performance.push(performance);
        self.history.costs.push(cost);
        self.t += 1;
        Ok(reward)
    }

    /// Cumulative regret relative to the best observed reward so far.
    /// Reporting only; plays no part in selection.
    pub fn cumulative_regret(&self) -> f64 {
        let best = self
            .history
            .rewards
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if !best.is_finite() {
            return 0.0;
        }
        self.history.rewards.iter().map(|r| best - r).sum()
    }

    /// Clear the GP, the iteration counter, and the history.
    pub fn reset(&mut self) {
        self.gp.reset();
        self.t = 1;
        self.history = PublicHistory::default();
    }

    pub fn t(&self) -> u64 {
        self.t
    }

    pub fn weights(&self) -> (f64, f64) {
        (self.alpha, self.beta)
    }

    pub fn action_space(&self) -> &[Arm] {
        &self.action_space
    }

    pub fn history(&self) -> &PublicHistory {
        &self.history
    }

    pub fn gp(&self) -> &SlidingWindowGp {
        &self.gp
    }
}
