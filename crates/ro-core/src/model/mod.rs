//! Surrogate model and acquisition functions.

pub mod acquisition;
pub mod gp;

pub use acquisition::{select_ucb_action, ucb_beta, ucb_scores, UcbChoice};
pub use gp::{GaussianProcess, GpError, MaternGp, MaternHyperparams, Prediction, SlidingWindowGp};
