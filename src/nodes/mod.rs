//! Node executors, one per node kind.
//!
//! Executors do their own work and return a [`NodeOutcome`]; following
//! edges, loop iteration and parallel joins belong to the dispatcher.

pub mod context;
pub mod control_flow;
pub mod data_transform;
pub mod executor;
pub mod flow;
pub mod registry;

pub use context::{NodeContext, NodeServices, SharedContext};
pub use executor::*;
pub use registry::execute_node;
