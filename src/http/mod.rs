//! HTTP host layer.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → server.rs (axum router, layers, body collection)
//!     → context.rs (RequestContext for the gateway core)
//!     → gateway dispatch
//!     → response.rs / context.rs (buffered response → wire)
//! ```

pub mod context;
pub mod request;
pub mod response;
pub mod server;

pub use context::{RequestContext, ResponseContext};
pub use request::{request_id_layer, MakeGatewayRequestId, X_REQUEST_ID};
pub use response::ResponseWriter;
pub use server::{AppState, GatewayServer};
