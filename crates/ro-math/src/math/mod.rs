//! Core math modules.

pub mod kernel;
pub mod linalg;
pub mod standardize;
