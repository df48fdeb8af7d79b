//! Domain layer for the Rolekeeper convergence engine
//!
//! This module contains core models, errors and the ports the engine consumes.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ActionError, ConvergenceError, ConvergenceResult};
