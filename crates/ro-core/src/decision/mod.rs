//! Bandit decision policies, one per operating mode.

pub mod private_cloud;
pub mod public_cloud;

pub use private_cloud::{PrivateCloudBandit, PrivateHistory};
pub use public_cloud::{PublicCloudBandit, PublicHistory};

use crate::model::GpError;
use thiserror::Error;

/// Errors from bandit construction and operation.
#[derive(Debug, Error)]
pub enum BanditError {
    #[error("action space is empty")]
    EmptyActionSpace,

    #[error("initial safe set is empty")]
    EmptySafeSet,

    #[error("reward weights must be non-negative: alpha={alpha}, beta={beta}")]
    NegativeWeight { alpha: f64, beta: f64 },

    #[error("resource limit must be positive and finite, got {0}")]
    InvalidResourceLimit(f64),

    #[error("surrogate failure: {0}")]
    Surrogate(#[from] GpError),
}

impl From<BanditError> for ro_common::Error {
    fn from(e: BanditError) -> Self {
        match e {
            BanditError::Surrogate(gp) => ro_common::Error::NumericalInstability(gp.to_string()),
            other => ro_common::Error::Decision(other.to_string()),
        }
    }
}

/// Mode-tagged bandit variant held by the orchestrator.
#[derive(Debug)]
pub enum Bandit {
    Public(PublicCloudBandit),
    Private(PrivateCloudBandit),
}
