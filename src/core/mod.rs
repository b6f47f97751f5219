//! Engine core: traversal, cancellation, callbacks and the external
//! collaborators (HTTP execution, collection/environment lookup).

pub mod cancellation;
pub mod dispatcher;
pub mod event_bus;
pub mod http_client;
pub mod repository;
pub mod runtime_context;

pub use cancellation::{CancelReason, CancellationHandle};
pub use dispatcher::{EngineConfig, FlowDispatcher};
pub use event_bus::{
    create_event_channel, ChannelObserver, EventReceiver, EventSender, ExecutionCallbacks,
    FlowEvent, NoopCallbacks,
};
pub use http_client::{HttpExecutor, HttpPoolConfig, ReqwestHttpExecutor};
pub use repository::{FlowRepository, InMemoryRepository};
pub use runtime_context::{
    FakeIdGenerator, FakeTimeProvider, IdGenerator, RealIdGenerator, RealTimeProvider,
    RuntimeContext, TimeProvider,
};
