//! Domain layer — pure domain model and shared types.
//!
//! This layer contains the flow document model and the run-scoped execution
//! state. It does not depend on any runtime implementation details.
//!
//! Submodules:
//! - [`execution`] — Execution context, run/node status and timeline types.
//! - [`model`] — Flow graph and request/response model.

pub mod execution;
pub mod model;
