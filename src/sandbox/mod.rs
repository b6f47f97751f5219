//! Script Capability
//!
//! Executes user-authored map transforms, script nodes and request hooks in
//! an isolated JavaScript interpreter. The engine only depends on the
//! [`ScriptCapability`] trait; [`BoaScriptRunner`] is the bundled
//! implementation.

pub mod boa_runner;
pub mod error;
pub mod js_builtins;
pub mod types;

pub use boa_runner::BoaScriptRunner;
pub use error::SandboxError;
pub use types::*;
