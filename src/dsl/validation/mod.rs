//! Structural validation of flow documents.
//!
//! Codes:
//! - `E001` parse failure, `E002` no start node, `E003` duplicate node id,
//!   `E004` edge source unknown, `E005` edge target unknown
//! - `W001` multiple start nodes, `W101` condition edge without a branch
//!   handle, `W102` extra outgoing edges on a single-successor node,
//!   `W103` unreachable node, `W104` end node with outgoing edges
//!
//! The engine itself only refuses to run without a start node; everything
//! else here is advisory for editors and the CLI.

mod structure;
mod topology;
mod types;

use crate::domain::model::Flow;
use crate::dsl::parser::{parse_flow, FlowFormat};

pub use types::{Diagnostic, DiagnosticLevel, ValidationReport};

/// Parse and validate a flow document in one step.
pub fn validate_document(content: &str, format: FlowFormat) -> ValidationReport {
    match parse_flow(content, format) {
        Ok(flow) => validate_flow(&flow),
        Err(err) => ValidationReport::from_diagnostics(vec![Diagnostic::error(
            "E001",
            err.to_string(),
        )]),
    }
}

/// Validate a parsed flow.
pub fn validate_flow(flow: &Flow) -> ValidationReport {
    let mut diagnostics = structure::validate(flow);
    diagnostics.extend(topology::validate(flow));
    ValidationReport::from_diagnostics(diagnostics)
}
