//! Error pipeline.
//!
//! # Responsibilities
//! - Log every service fault with the operation name
//! - Delegate to the uncaught-error handler that writes the error response
//! - Guarantee the response is finalized exactly once, on every exit path
//!
//! # Design Decisions
//! - The handler runs in an isolated scope: its own failure is logged at
//!   info level and discarded, and the original fault is always the one
//!   reported upward
//! - Finalization runs from a drop guard, so it also holds if the handler
//!   panics

use std::sync::Arc;

use serde_json::json;

use crate::gateway::error::GatewayError;
use crate::http::context::{RequestContext, ResponseContext};

/// Secondary failure raised by the error-reporting path itself.
pub type ReportingError = Box<dyn std::error::Error + Send + Sync>;

/// Writes the error response for an uncaught service failure.
pub trait UncaughtErrorHandler: Send + Sync {
    fn handle(
        &self,
        ctx: &RequestContext,
        response: &mut ResponseContext,
        operation: &str,
        error: &GatewayError,
    ) -> Result<(), ReportingError>;
}

/// Default handler: structured JSON error body, status from the error kind.
pub struct DefaultErrorHandler;

impl UncaughtErrorHandler for DefaultErrorHandler {
    fn handle(
        &self,
        _ctx: &RequestContext,
        response: &mut ResponseContext,
        operation: &str,
        error: &GatewayError,
    ) -> Result<(), ReportingError> {
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
        Ok(())
    }
}

/// Catches, logs and reports failures without masking root causes.
#[derive(Clone)]
pub struct ErrorPipeline {
    handler: Arc<dyn UncaughtErrorHandler>,
}

impl ErrorPipeline {
    pub fn new(handler: Arc<dyn UncaughtErrorHandler>) -> Self {
        Self { handler }
    }

    /// Report a failure and finalize the response.
    ///
    /// Always returns the original error: a failure inside the handler is
    /// logged and suppressed, never propagated in its place.
    pub fn report(
        &self,
        ctx: &RequestContext,
        response: &mut ResponseContext,
        operation: &str,
        error: GatewayError,
    ) -> GatewayError {
        tracing::error!(
            operation = %operation,
            request_id = %ctx.request_id(),
            kind = error.kind(),
            error = %error,
            "Operation failed"
        );

        let mut guard = FinalizeGuard { response };
        if let Err(secondary) = self.handler.handle(ctx, guard.response, operation, &error) {
            tracing::info!(
                operation = %operation,
                error = %secondary,
                "Error handler failed; reporting original error"
            );
        }
        drop(guard);

        error
    }
}

impl Default for ErrorPipeline {
    fn default() -> Self {
        Self::new(Arc::new(DefaultErrorHandler))
    }
}

/// Finalizes the response when the reporting scope exits, on any path.
struct FinalizeGuard<'a> {
    response: &'a mut ResponseContext,
}

impl Drop for FinalizeGuard<'_> {
    fn drop(&mut self) {
        let skip_headers = self.response.headers_written();
        self.response.end_request(skip_headers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};

    struct FailingHandler;

    impl UncaughtErrorHandler for FailingHandler {
        fn handle(
            &self,
            _ctx: &RequestContext,
            _response: &mut ResponseContext,
            _operation: &str,
            _error: &GatewayError,
        ) -> Result<(), ReportingError> {
            Err("reporting sink unavailable".into())
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Method::POST, "/CreateUser")
    }

    #[test]
    fn writes_error_response_and_finalizes() {
        let pipeline = ErrorPipeline::default();
        let mut response = ResponseContext::new();
        let original = pipeline.report(&ctx(), &mut response, "CreateUser", GatewayError::fault("boom"));
        assert!(matches!(original, GatewayError::Fault { .. }));
        assert!(response.is_ended());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn failing_handler_does_not_mask_original_error() {
        let pipeline = ErrorPipeline::new(Arc::new(FailingHandler));
        let mut response = ResponseContext::new();
        let original = pipeline.report(&ctx(), &mut response, "CreateUser", GatewayError::Cancelled);
        // The secondary failure is suppressed; the original comes back.
        assert!(matches!(original, GatewayError::Cancelled));
        assert!(response.is_ended());
    }

    #[test]
    fn finalizes_when_headers_were_already_written() {
        let pipeline = ErrorPipeline::new(Arc::new(FailingHandler));
        let mut response = ResponseContext::new();
        response.write_body(b"partial");
        let _ = pipeline.report(&ctx(), &mut response, "CreateUser", GatewayError::fault("late"));
        assert!(response.is_ended());
    }

    #[test]
    fn finalization_happens_exactly_once_across_paths() {
        let pipeline = ErrorPipeline::default();
        let mut response = ResponseContext::new();
        let _ = pipeline.report(&ctx(), &mut response, "Op", GatewayError::fault("x"));
        // end_request from another exit path is a no-op.
        response.end_request(false);
        assert!(response.is_ended());
        assert_eq!(response.end_calls(), 2);
    }
}
