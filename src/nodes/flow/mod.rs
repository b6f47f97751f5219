//! Container node executors: Loop and Parallel.
//!
//! Neither runs its downstream nodes itself; they return a [`Route`] and the
//! dispatcher drives the subgraph (sequentially per item for loops,
//! concurrently per edge for parallel nodes).
//!
//! [`Route`]: crate::nodes::Route

pub mod loop_node;
pub mod parallel;

pub use loop_node::LoopNodeExecutor;
pub use parallel::ParallelNodeExecutor;
