//! Request identification.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) as early as possible
//! - Propagate the ID to the response for tracing correlation

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId, SetRequestIdLayer};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a UUID v4 request ID for each incoming request.
#[derive(Clone, Copy, Default)]
pub struct MakeGatewayRequestId;

impl MakeRequestId for MakeGatewayRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Layer that stamps `x-request-id` onto requests that lack one.
pub fn request_id_layer() -> SetRequestIdLayer<MakeGatewayRequestId> {
    SetRequestIdLayer::x_request_id(MakeGatewayRequestId)
}
