//! Flow documents: parsing from JSON/YAML/TOML and structural validation.

pub mod parser;
pub mod validation;

pub use parser::{parse_flow, FlowFormat};
pub use validation::{
    validate_document, validate_flow, Diagnostic, DiagnosticLevel, ValidationReport,
};
