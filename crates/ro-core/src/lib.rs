//! Resource Orchestrator core: contextual-bandit resource tuning for a
//! single containerised workload.
//!
//! Each orchestration decision is a pull of a contextual bandit arm. A
//! Gaussian-process surrogate with a sliding observation window scores
//! candidate resource configurations; an upper-confidence-bound rule
//! arbitrates exploration against exploitation. Two operating modes:
//!
//! - **public**: maximise a weighted performance/cost scalar
//! - **private**: maximise performance subject to a hard resource budget,
//!   with a lower-confidence-bound safe set guarding exploration
//!
//! The control loop stitches the bandit to a monitoring source and a
//! cluster mutation sink, both behind capability traits so backends can be
//! swapped (or faked in tests).

pub mod action_space;
pub mod classify;
pub mod cluster;
pub mod decision;
pub mod enforce;
pub mod model;
pub mod monitor;
pub mod orchestrator;

pub use action_space::ActionSpace;
pub use decision::{Bandit, PrivateCloudBandit, PublicCloudBandit};
pub use model::{GaussianProcess, MaternGp, SlidingWindowGp};
pub use orchestrator::{IterationRecord, Orchestrator, OrchestratorConfig};
