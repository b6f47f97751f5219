//! Graph construction and representation.
//!
//! The [`FlowGraph`] is built from a [`Flow`](crate::domain::model::Flow). It
//! indexes nodes and edges so the [`FlowDispatcher`](crate::core::FlowDispatcher)
//! can look up successors while traversing.

pub mod builder;
pub mod types;

pub use builder::*;
pub use types::*;
