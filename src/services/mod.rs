//! Services coordinating convergence runs.

pub mod action_invoker;
pub mod convergence_engine;
pub mod convergence_run;
pub mod event_router;
pub mod registry;

pub use action_invoker::ActionInvoker;
pub use convergence_engine::{ConvergenceEngine, RunHandle};
pub use convergence_run::{ConvergenceRun, RunLimits};
pub use event_router::EventRouter;
pub use registry::RunRegistry;
