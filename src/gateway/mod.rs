//! Request-handling gateway core.
//!
//! # Data Flow
//! ```text
//! Routed request (operation name + RequestContext)
//!     → gate.rs (feature + visibility check; denial ends here with 403)
//!     → request.rs (method/content-type negotiation → typed DTO)
//!     → ServiceExecutor (external; immediate or deferred result)
//!     → completion.rs (drive to exactly one terminal outcome)
//!     → success: response writer · failure: pipeline.rs
//!
//! pipeline.rs guarantees finalization on every exit path and never
//! lets a secondary reporting failure mask the original fault.
//! ```

pub mod completion;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod gate;
pub mod pipeline;
pub mod request;

pub use completion::{handle_completion, CompletionKind, CompletionResult, DeferredCall, ServiceResult};
pub use dispatcher::{RequestDispatcher, ServiceExecutor};
pub use error::GatewayError;
pub use format::{FeatureSet, ResponseFormat};
pub use gate::{check_access, DenyReason, GateDecision};
pub use pipeline::{DefaultErrorHandler, ErrorPipeline, UncaughtErrorHandler};
pub use request::create_request;
