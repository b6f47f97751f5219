//! Variable Resolver: `{{name}}` substitution over flow and environment
//! variables.

pub mod variable_resolver;

pub use variable_resolver::{extract_placeholders, resolve_template};
