//! Service Gateway Library
//!
//! The request-handling core of an HTTP service host: everything between a
//! raw, already-routed request and the execution of application logic.
//!
//! ```text
//!  Routed request
//!      │
//!      ▼
//!  ┌─────────────┐   ┌──────────────────┐   ┌────────────────┐
//!  │ access gate │──▶│ deserialization  │──▶│ service        │
//!  │ (features,  │   │ selector         │   │ executor       │
//!  │  visibility)│   │ (method/content) │   │ (external)     │
//!  └─────────────┘   └──────────────────┘   └───────┬────────┘
//!      │ deny: 403                                  │ immediate | deferred
//!      ▼                                            ▼
//!  response writer ◀── success ── ┌─────────────────────┐
//!                                 │ completion unifier  │
//!  error pipeline ◀── fault ───── │ (exactly-once)      │
//!  (log, report, finalize)        └─────────────────────┘
//! ```
//!
//! Hosts register operations and content-type deserializers, implement
//! [`ServiceExecutor`], and hand requests to a [`RequestDispatcher`], either
//! directly or through the bundled axum host, [`GatewayServer`].

// Core subsystems
pub mod config;
pub mod gateway;
pub mod http;
pub mod net;
pub mod registry;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use gateway::completion::{
    handle_completion, CompletionKind, CompletionResult, DeferredCall, ServiceResult,
};
pub use gateway::dispatcher::{RequestDispatcher, ServiceExecutor};
pub use gateway::error::GatewayError;
pub use gateway::format::{FeatureSet, ResponseFormat};
pub use http::server::GatewayServer;
pub use lifecycle::Shutdown;
pub use net::attributes::RequestAttributes;
pub use net::identity::NetworkAddressTable;
pub use registry::codecs::BoxedDto;
pub use registry::content::DeserializerRegistry;
pub use registry::operations::{OperationRegistry, OperationRestriction};
