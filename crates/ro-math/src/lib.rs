//! Resource Orchestrator math utilities.

pub mod math;

pub use math::kernel::*;
pub use math::linalg::*;
pub use math::standardize::*;
