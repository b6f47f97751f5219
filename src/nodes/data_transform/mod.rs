pub mod code;
pub mod extract;
pub mod http_request;
pub mod variable_assigner;

pub use code::{MapNodeExecutor, ScriptNodeExecutor};
pub use extract::ExtractNodeExecutor;
pub use http_request::HttpRequestNodeExecutor;
pub use variable_assigner::{LogNodeExecutor, SetVarNodeExecutor};
