pub mod condition;
pub mod delay;
pub mod end;
pub mod start;

pub use condition::ConditionNodeExecutor;
pub use delay::DelayNodeExecutor;
pub use end::EndNodeExecutor;
pub use start::{ErrorHandlerNodeExecutor, StartNodeExecutor};
