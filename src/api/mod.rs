//! Public API layer: stable entry points for running flows.
//!
//! [`FlowRunner`] launches runs, [`RunTracker`] holds the externally visible
//! run state and [`FlowRunHandle`] controls one launched run.

mod handle;
mod runner;
mod tracker;

pub use handle::FlowRunHandle;
pub use runner::{FlowRunner, FlowRunnerBuilder};
pub use tracker::{RunSnapshot, RunTracker};
