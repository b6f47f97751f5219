//! # reqflow: an API request flow engine
//!
//! `reqflow` executes flows: directed graphs of typed steps (HTTP requests,
//! extraction, branching, loops, parallel fan-out, scripted transforms,
//! variable assignment, logging, delays) run against a mutable run-scoped
//! context. A run produces a timeline of node events and a final status.
//!
//! - **Traversal**: recursive depth-first dispatch with condition branches,
//!   sequential loops and fail-fast parallel joins.
//! - **Templates**: `{{name}}` placeholders resolved from flow variables,
//!   then environment variables; misses are left verbatim.
//! - **Evaluation**: dot-path extraction and JavaScript-compatible
//!   comparisons (`equals`, `notEquals`, `contains`, `gt`, `lt`).
//! - **Scripts**: map/script nodes and request hooks run in an embedded
//!   JavaScript interpreter (Boa) with limits.
//! - **Cancellation**: one cooperative handle per run, observed by HTTP
//!   calls, delays and every loop/parallel step.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use reqflow::{parse_flow, FlowFormat, FlowRunner};
//!
//! #[tokio::main]
//! async fn main() {
//!     let json = std::fs::read_to_string("flow.json").unwrap();
//!     let flow = parse_flow(&json, FlowFormat::Json).unwrap();
//!     let runner = FlowRunner::builder().build().unwrap();
//!     let snapshot = runner.run(&flow).await.unwrap();
//!     println!("{:?}", snapshot.status);
//! }
//! ```

pub mod api;
pub mod core;
pub mod domain;
pub mod dsl;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod nodes;
pub mod sandbox;
pub mod template;

pub use crate::api::{FlowRunHandle, FlowRunner, FlowRunnerBuilder, RunSnapshot, RunTracker};
pub use crate::core::{
    create_event_channel, CancelReason, CancellationHandle, ChannelObserver, EngineConfig,
    EventReceiver, EventSender, ExecutionCallbacks, FakeIdGenerator, FakeTimeProvider,
    FlowDispatcher, FlowEvent, FlowRepository, HttpExecutor, HttpPoolConfig, IdGenerator,
    InMemoryRepository, NoopCallbacks, RealIdGenerator, RealTimeProvider, ReqwestHttpExecutor,
    RuntimeContext, TimeProvider,
};
pub use crate::domain::execution::{
    ExecutionContext, LogEntry, LogLevel, NodeExecutionResult, NodeStatus, RunStatus,
    TimelineEvent, TimelineEventType,
};
pub use crate::domain::model::{Flow, FlowEdge, FlowNode, HttpRequest, HttpResponse, NodeKind};
pub use crate::dsl::{
    parse_flow, validate_document, validate_flow, Diagnostic, DiagnosticLevel, FlowFormat,
    ValidationReport,
};
pub use crate::error::{FlowError, FlowResult, NodeError};
pub use crate::sandbox::{BoaScriptRunner, ScriptCapability, ScriptConfig};
