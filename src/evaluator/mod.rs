//! Path extraction and condition evaluation over JSON values.
//!
//! Coercions follow JavaScript semantics (`Number(x)`, `String(x)`, `==`)
//! so flows behave the same regardless of whether values arrived as text
//! or as typed JSON.

pub mod condition;
pub mod operators;
pub mod path;
pub mod type_coercion;

pub use crate::domain::model::ConditionOp;
pub use condition::{evaluate, parse_op};
pub use operators::{contains, greater_than, less_than, loose_equals};
pub use path::extract_path;
pub use type_coercion::{format_number, number_to_value, string_to_number, to_js_string, to_number};
