//! End-to-end request dispatch.
//!
//! # Responsibilities
//! - Compute request attributes from the cached address table
//! - Run the gate, the deserialization selector, the executor and the
//!   completion unifier in order
//! - Route faults through the error pipeline; write successes
//!
//! # Design Decisions
//! - Serialization failures and access denials are handled before any
//!   service logic runs and never reach the error pipeline
//! - Operation faults and cancellations always go through the pipeline,
//!   the single point that talks to the uncaught-error handler

use std::sync::Arc;
use std::time::Instant;

use axum::response::Response;
use serde_json::{json, Value};

use crate::gateway::completion::{handle_completion, ServiceResult};
use crate::gateway::error::GatewayError;
use crate::gateway::format::{FeatureSet, ResponseFormat};
use crate::gateway::gate::{self, GateDecision};
use crate::gateway::pipeline::{ErrorPipeline, UncaughtErrorHandler};
use crate::gateway::request;
use crate::http::context::{RequestContext, ResponseContext};
use crate::http::response::ResponseWriter;
use crate::net::attributes::{compute_request_attributes, RequestAttributes};
use crate::net::identity::NetworkAddressTable;
use crate::observability::metrics;
use crate::registry::codecs::BoxedDto;
use crate::registry::content::DeserializerRegistry;
use crate::registry::operations::OperationRegistry;

/// Runs one operation against its typed request DTO.
///
/// Routing a name to this executor is the host's concern; the gateway only
/// hands over the already-routed operation. The executor may answer with an
/// immediate value or a deferred computation.
pub trait ServiceExecutor: Send + Sync {
    fn execute(&self, operation: &str, request: BoxedDto, ctx: &RequestContext)
        -> ServiceResult<Value>;
}

/// The request-handling core: processes one already-routed request end to
/// end.
pub struct RequestDispatcher {
    operations: Arc<OperationRegistry>,
    deserializers: Arc<DeserializerRegistry>,
    executor: Arc<dyn ServiceExecutor>,
    pipeline: ErrorPipeline,
    writer: ResponseWriter,
    addresses: Arc<NetworkAddressTable>,
}

impl RequestDispatcher {
    pub fn new(
        operations: Arc<OperationRegistry>,
        deserializers: Arc<DeserializerRegistry>,
        executor: Arc<dyn ServiceExecutor>,
        addresses: Arc<NetworkAddressTable>,
    ) -> Self {
        Self {
            operations,
            deserializers,
            executor,
            pipeline: ErrorPipeline::default(),
            writer: ResponseWriter,
            addresses,
        }
    }

    /// Replace the uncaught-error handler.
    pub fn with_error_handler(mut self, handler: Arc<dyn UncaughtErrorHandler>) -> Self {
        self.pipeline = ErrorPipeline::new(handler);
        self
    }

    /// Compute the attribute set for a request.
    pub fn compute_request_attributes(&self, ctx: &RequestContext) -> RequestAttributes {
        compute_request_attributes(
            ctx.remote_addr(),
            ctx.method(),
            ctx.is_secure(),
            &self.addresses,
        )
    }

    /// Build the typed request DTO for an operation, running the full
    /// method/content-type negotiation.
    pub fn create_request(
        &self,
        ctx: &RequestContext,
        operation: &str,
    ) -> Result<BoxedDto, GatewayError> {
        let entry = self
            .operations
            .resolve(operation)
            .ok_or_else(|| GatewayError::UnknownOperation(operation.to_string()))?;
        request::create_request(ctx, entry, &self.deserializers)
    }

    /// Process one routed request end to end.
    pub async fn dispatch(
        &self,
        features: FeatureSet,
        operation: &str,
        ctx: RequestContext,
    ) -> Response {
        let start = Instant::now();
        let attrs = self.compute_request_attributes(&ctx);
        let format = ResponseFormat::negotiate(&ctx);

        tracing::debug!(
            operation = %operation,
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            attrs = ?attrs,
            format = format.as_str(),
            "Dispatching request"
        );

        match gate::check_access(features, format, attrs, &self.operations, operation) {
            Err(error) => {
                metrics::record_request(operation, error.status().as_u16(), "rejected", start);
                return client_error_response(operation, &error);
            }
            Ok(GateDecision::Denied(reason)) => {
                tracing::warn!(
                    operation = %operation,
                    request_id = %ctx.request_id(),
                    reason = ?reason,
                    "Access denied"
                );
                metrics::record_request(operation, 403, "denied", start);
                return gate::deny_response(&reason);
            }
            Ok(GateDecision::Allowed) => {}
        }

        let dto = match self.create_request(&ctx, operation) {
            Ok(dto) => dto,
            Err(error) => {
                tracing::warn!(
                    operation = %operation,
                    request_id = %ctx.request_id(),
                    kind = error.kind(),
                    error = %error,
                    "Request rejected before execution"
                );
                metrics::record_request(operation, error.status().as_u16(), "rejected", start);
                return client_error_response(operation, &error);
            }
        };

        let result = self.executor.execute(operation, dto, &ctx);

        let writer = &self.writer;
        let pipeline = &self.pipeline;
        let ctx_ref = &ctx;
        let (kind, response) = handle_completion(
            result,
            move |value| async move {
                let mut response = ResponseContext::new();
                match writer.write(&mut response, &value, format) {
                    Ok(()) => {
                        response.end_request(false);
                        response.into_response()
                    }
                    Err(error) => {
                        let mut response = ResponseContext::new();
                        let _original = pipeline.report(ctx_ref, &mut response, operation, error);
                        response.into_response()
                    }
                }
            },
            move |error| async move {
                let mut response = ResponseContext::new();
                let original = pipeline.report(ctx_ref, &mut response, operation, error);
                tracing::debug!(
                    operation = %operation,
                    error = %original,
                    "Request finalized with error"
                );
                response.into_response()
            },
        )
        .await;

        metrics::record_request(operation, response.status().as_u16(), kind.as_str(), start);
        response
    }
}

/// Structured error response for failures detected before execution.
fn client_error_response(operation: &str, error: &GatewayError) -> Response {
    let mut response = ResponseContext::new();
    response.write_json(
        error.status(),
        &json!({
            "error": {
                "code": error.kind(),
                "message": error.to_string(),
                "operation": operation,
            }
        }),
    );
    response.end_request(false);
    response.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default)]
    struct GetUser {
        #[serde(default)]
        id: i64,
    }

    struct EchoExecutor;

    impl ServiceExecutor for EchoExecutor {
        fn execute(
            &self,
            operation: &str,
            request: BoxedDto,
            _ctx: &RequestContext,
        ) -> ServiceResult<Value> {
            match operation {
                "GetUser" => {
                    let user = request.downcast::<GetUser>().expect("registered type");
                    ServiceResult::immediate(json!({ "id": user.id }))
                }
                "Slow" => ServiceResult::deferred(async { Ok(json!({"done": true})) }),
                "Broken" => ServiceResult::deferred(async { Err(GatewayError::fault("boom")) }),
                _ => ServiceResult::immediate(Value::Null),
            }
        }
    }

    fn dispatcher() -> RequestDispatcher {
        let mut operations = OperationRegistry::new();
        operations.register::<GetUser>("GetUser");
        operations.register::<GetUser>("Slow");
        operations.register::<GetUser>("Broken");
        RequestDispatcher::new(
            Arc::new(operations),
            Arc::new(DeserializerRegistry::with_defaults()),
            Arc::new(EchoExecutor),
            Arc::new(NetworkAddressTable::empty()),
        )
    }

    #[tokio::test]
    async fn dispatches_query_request_to_success() {
        let dispatcher = dispatcher();
        let ctx = RequestContext::new(Method::GET, "/GetUser").with_query("id=42");
        let response = dispatcher.dispatch(FeatureSet::all(), "GetUser", ctx).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_operation_is_not_found() {
        let dispatcher = dispatcher();
        let ctx = RequestContext::new(Method::GET, "/Nope");
        let response = dispatcher.dispatch(FeatureSet::all(), "Nope", ctx).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn disabled_feature_is_forbidden() {
        let dispatcher = dispatcher();
        let ctx = RequestContext::new(Method::GET, "/GetUser").with_query("id=1");
        let response = dispatcher
            .dispatch(FeatureSet::PLAIN_TEXT, "GetUser", ctx)
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn empty_operation_name_is_bad_request() {
        let dispatcher = dispatcher();
        let ctx = RequestContext::new(Method::GET, "/");
        let response = dispatcher.dispatch(FeatureSet::all(), "", ctx).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deferred_success_completes() {
        let dispatcher = dispatcher();
        let ctx = RequestContext::new(Method::POST, "/Slow");
        let response = dispatcher.dispatch(FeatureSet::all(), "Slow", ctx).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn deferred_fault_goes_through_pipeline() {
        let dispatcher = dispatcher();
        let ctx = RequestContext::new(Method::POST, "/Broken");
        let response = dispatcher.dispatch(FeatureSet::all(), "Broken", ctx).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn malformed_query_is_bad_request() {
        let dispatcher = dispatcher();
        let ctx = RequestContext::new(Method::GET, "/GetUser").with_query("id=abc");
        let response = dispatcher.dispatch(FeatureSet::all(), "GetUser", ctx).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
