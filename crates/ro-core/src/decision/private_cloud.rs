//! Budget-constrained bandit for private-cloud mode.
//!
//! Two GPs: one over performance, one over resource consumption. A safe
//! set of arms is maintained by a lower-confidence-bound filter on the
//! resource GP; selection is UCB on the performance GP restricted to that
//! set. An opening exploration window samples uniformly from the seed set
//! to populate both GPs before the filter is trusted.

use crate::decision::BanditError;
use crate::model::acquisition::{ucb_beta, UCB_B};
use crate::model::gp::DEFAULT_WINDOW_SIZE;
use crate::model::{select_ucb_action, SlidingWindowGp};
use rand::Rng;
use ro_common::{concat_input, Arm, Context};
use serde::Serialize;
use tracing::warn;

/// Default length of the opening exploration window.
pub const DEFAULT_EXPLORATION_DURATION: u64 = 10;

/// Observation log, including the safe-set cardinality at each step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrivateHistory {
    pub actions: Vec<Arm>,
    pub contexts: Vec<Context>,
    pub performance: Vec<f64>,
    pub resource_usage: Vec<f64>,
    pub safe_set_size: Vec<usize>,
}

impl PrivateHistory {
    pub fn len(&self) -> usize {
        self.performance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.performance.is_empty()
    }
}

/// Safe-exploration contextual bandit under a hard resource budget.
#[derive(Debug)]
pub struct PrivateCloudBandit {
    action_space: Vec<Arm>,
    resource_limit: f64,
    exploration_duration: u64,
    /// Accepted and stored; the β(t) schedule does not consume it.
    confidence_level: f64,
    t: u64,
    exploration_phase: bool,
    performance_gp: SlidingWindowGp,
    resource_gp: SlidingWindowGp,
    safe_set: Vec<Arm>,
    history: PrivateHistory,
}

impl PrivateCloudBandit {
    /// Build a constrained bandit.
    ///
    /// When no initial safe set is supplied, the first ⌈25%⌉ of the arm
    /// set seeds it.
    pub fn new(
        action_space: Vec<Arm>,
        resource_limit: f64,
        initial_safe_set: Option<Vec<Arm>>,
    ) -> Result<Self, BanditError> {
        Self::with_options(
            action_space,
            resource_limit,
            initial_safe_set,
            DEFAULT_EXPLORATION_DURATION,
            0.1,
            DEFAULT_WINDOW_SIZE,
        )
    }

    pub fn with_options(
        action_space: Vec<Arm>,
        resource_limit: f64,
        initial_safe_set: Option<Vec<Arm>>,
        exploration_duration: u64,
        confidence_level: f64,
        window_size: usize,
    ) -> Result<Self, BanditError> {
        if action_space.is_empty() {
            return Err(BanditError::EmptyActionSpace);
        }
        if !resource_limit.is_finite() || resource_limit <= 0.0 {
            return Err(BanditError::InvalidResourceLimit(resource_limit));
        }
        let safe_set = match initial_safe_set {
            Some(seed) => {
                if seed.is_empty() {
                    return Err(BanditError::EmptySafeSet);
                }
                seed
            }
            None => {
                let seed_size = (action_space.len() + 3) / 4;
                action_space[..seed_size.max(1)].to_vec()
            }
        };
        Ok(PrivateCloudBandit {
            action_space,
            resource_limit,
            exploration_duration,
            confidence_level,
            t: 1,
            exploration_phase: true,
            performance_gp: SlidingWindowGp::new(window_size),
            resource_gp: SlidingWindowGp::new(window_size),
            safe_set,
            history: PrivateHistory::default(),
        })
    }

    /// Recompute the safe set by the LCB filter on the resource GP.
    ///
    /// An arm is admitted iff `μ_r − √β(t)·σ_r ≤ p_max` at the current
    /// context. The safe set is replaced, not unioned. If the filter would
    /// empty it, the previous safe set is retained and a warning emitted —
    /// the safe set is never empty.
    fn recompute_safe_set(&mut self, context: &Context) -> Result<(), BanditError> {
        let d = self.action_space[0].dim() + context.dim();
        let beta = ucb_beta(self.t, d, UCB_B);
        let inputs: Vec<Vec<f64>> = self
            .action_space
            .iter()
            .map(|a| concat_input(a, context))
            .collect();
        let pred = self.resource_gp.predict(&inputs)?;
        let admitted: Vec<Arm> = self
            .action_space
            .iter()
            .zip(pred.mean.iter().zip(pred.std.iter()))
            .filter(|(_, (m, s))| *m - beta.sqrt() * *s <= self.resource_limit)
            .map(|(a, _)| a.clone())
            .collect();
        if admitted.is_empty() {
            warn!(
                t = self.t,
                "no safe actions found, keeping current safe set"
            );
            return Ok(());
        }
        self.safe_set = admitted;
        Ok(())
    }

    /// Pick an arm for the given context.
    ///
    /// During the exploration window (`t ≤ T_expl`) the choice is uniform
    /// over the current safe set and the set is not recomputed; afterwards
    /// the safe set is refiltered and UCB on the performance GP picks
    /// within it.
    pub fn select_action(&mut self, context: &Context) -> Result<Arm, BanditError> {
        if self.t <= self.exploration_duration {
            self.exploration_phase = true;
            let mut rng = rand::rng();
            let idx = rng.random_range(0..self.safe_set.len());
            return Ok(self.safe_set[idx].clone());
        }
        self.exploration_phase = false;
        self.recompute_safe_set(context)?;
        let choice = select_ucb_action(&self.safe_set, context, &self.performance_gp, self.t)?;
        Ok(self.safe_set[choice.index].clone())
    }

    /// Feed back an observation pair.
    ///
    /// Returns `(performance, is_safe)` where `is_safe` compares the
    /// observed resource use against the budget — a diagnostic for the
    /// caller; an unsafe outcome is not penalised beyond its effect on
    /// the resource GP.
    pub fn update(
        &mut self,
        action: Arm,
        context: Context,
        performance: f64,
        resource_usage: f64,
    ) -> Result<(f64, bool), BanditError> {
        let is_safe = resource_usage <= self.resource_limit;
        let x = concat_input(&action, &context);
        self.performance_gp.update(&[x.clone()], &[performance])?;
        self.resource_gp.update(&[x], &[resource_usage])?;
        self.history.actions.push(action);
        self.history.contexts.push(context);
        self.history.performance.push(performance);
        self.history.resource_usage.push(resource_usage);
        self.history.safe_set_size.push(self.safe_set.len());
        self.t += 1;
        Ok((performance, is_safe))
    }

    /// Clear both GPs, the counter, the phase flag, and the history.
    ///
    /// The safe set deliberately survives a reset; it only ever changes
    /// through the LCB recomputation.
    pub fn reset(&mut self) {
        self.performance_gp.reset();
        self.resource_gp.reset();
        self.t = 1;
        self.exploration_phase = true;
        self.history = PrivateHistory::default();
    }

    pub fn t(&self) -> u64 {
        self.t
    }

    pub fn in_exploration_phase(&self) -> bool {
        self.exploration_phase
    }

    pub fn resource_limit(&self) -> f64 {
        self.resource_limit
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    pub fn safe_set(&self) -> &[Arm] {
        &self.safe_set
    }

    pub fn action_space(&self) -> &[Arm] {
        &self.action_space
    }

    pub fn history(&self) -> &PrivateHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm(v: f64) -> Arm {
        Arm::new(vec![v])
    }

    fn ctx() -> Context {
        Context::new(vec![0.0])
    }

    #[test]
    fn default_seed_is_first_quarter() {
        let arms: Vec<Arm> = (0..100).map(|i| arm(i as f64)).collect();
        let b = PrivateCloudBandit::new(arms, 10.0, None).unwrap();
        assert_eq!(b.safe_set().len(), 25);
        assert_eq!(b.safe_set()[0], arm(0.0));
    }

    #[test]
    fn seed_rounds_up() {
        let arms: Vec<Arm> = (0..5).map(|i| arm(i as f64)).collect();
        let b = PrivateCloudBandit::new(arms, 10.0, None).unwrap();
        assert_eq!(b.safe_set().len(), 2);
    }

    #[test]
    fn empty_seed_rejected() {
        let arms = vec![arm(1.0)];
        assert!(matches!(
            PrivateCloudBandit::new(arms, 10.0, Some(vec![])),
            Err(BanditError::EmptySafeSet)
        ));
    }

    #[test]
    fn non_positive_limit_rejected() {
        assert!(matches!(
            PrivateCloudBandit::new(vec![arm(1.0)], 0.0, None),
            Err(BanditError::InvalidResourceLimit(_))
        ));
    }

    #[test]
    fn exploration_draws_from_seed_only() {
        let arms: Vec<Arm> = (0..100).map(|i| arm(i as f64 / 10.0)).collect();
        let seed = vec![arm(0.1), arm(0.2)];
        let mut b = PrivateCloudBandit::new(arms, 10.0, Some(seed.clone())).unwrap();
        for _ in 0..10 {
            let a = b.select_action(&ctx()).unwrap();
            assert!(seed.contains(&a), "exploration left the seed set: {a:?}");
            assert!(b.in_exploration_phase());
            let (_, is_safe) = b.update(a, ctx(), 1.0, 1.0).unwrap();
            assert!(is_safe);
        }
        // Safe set untouched during exploration.
        assert_eq!(b.safe_set(), seed.as_slice());
        assert_eq!(b.t(), 11);
    }

    #[test]
    fn is_safe_mirrors_budget_comparison() {
        let mut b = PrivateCloudBandit::new(vec![arm(1.0)], 10.0, None).unwrap();
        let (_, safe) = b.update(arm(1.0), ctx(), 0.0, 9.5).unwrap();
        assert!(safe);
        let (_, unsafe_) = b.update(arm(1.0), ctx(), 0.0, 10.5).unwrap();
        assert!(!unsafe_);
        let (_, boundary) = b.update(arm(1.0), ctx(), 0.0, 10.0).unwrap();
        assert!(boundary);
    }

    #[test]
    fn history_records_safe_set_size() {
        let arms: Vec<Arm> = (0..8).map(|i| arm(i as f64)).collect();
        let mut b = PrivateCloudBandit::new(arms, 10.0, None).unwrap();
        b.update(arm(0.0), ctx(), 1.0, 1.0).unwrap();
        b.update(arm(1.0), ctx(), 1.0, 1.0).unwrap();
        assert_eq!(b.history().safe_set_size, vec![2, 2]);
    }

    #[test]
    fn lcb_filter_excludes_over_budget_arm() {
        let arms = vec![arm(0.5), arm(5.0)];
        let mut b = PrivateCloudBandit::with_options(
            arms.clone(),
            10.0,
            Some(arms.clone()),
            10,
            0.1,
            DEFAULT_WINDOW_SIZE,
        )
        .unwrap();
        // Six observations of each arm: cheap arm uses ~1 GiB, hungry arm ~50.
        for _ in 0..6 {
            b.update(arm(0.5), ctx(), -1.0, 1.0).unwrap();
            b.update(arm(5.0), ctx(), -5.0, 50.0).unwrap();
        }
        assert_eq!(b.t(), 13);
        let chosen = b.select_action(&ctx()).unwrap();
        assert!(!b.in_exploration_phase());
        assert_eq!(b.safe_set(), &[arm(0.5)]);
        assert_eq!(chosen, arm(0.5));
    }

    #[test]
    fn emptying_filter_keeps_previous_safe_set() {
        let arms = vec![arm(3.0), arm(4.0)];
        let mut b = PrivateCloudBandit::with_options(
            arms.clone(),
            1.0,
            Some(vec![arm(3.0)]),
            2,
            0.1,
            DEFAULT_WINDOW_SIZE,
        )
        .unwrap();
        // Every arm far above the budget with tight posteriors.
        for _ in 0..8 {
            b.update(arm(3.0), ctx(), -1.0, 60.0).unwrap();
            b.update(arm(4.0), ctx(), -1.0, 80.0).unwrap();
        }
        let before = b.safe_set().to_vec();
        let a = b.select_action(&ctx()).unwrap();
        assert_eq!(b.safe_set(), before.as_slice());
        assert_eq!(a, arm(3.0));
    }

    #[test]
    fn reset_preserves_safe_set() {
        let arms: Vec<Arm> = (0..4).map(|i| arm(i as f64)).collect();
        let seed = vec![arm(0.0), arm(1.0)];
        let mut b = PrivateCloudBandit::new(arms, 10.0, Some(seed.clone())).unwrap();
        b.update(arm(0.0), ctx(), 1.0, 1.0).unwrap();
        b.reset();
        assert_eq!(b.t(), 1);
        assert!(b.history().is_empty());
        assert!(b.in_exploration_phase());
        assert_eq!(b.safe_set(), seed.as_slice());
    }
}
