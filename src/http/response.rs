//! Response writing.
//!
//! Serializes a service result value into the negotiated format. Used by
//! the success path; error responses come from the error pipeline's
//! handler.

use axum::http::{header, HeaderValue, StatusCode};
use serde_json::Value;

use crate::gateway::error::GatewayError;
use crate::gateway::format::ResponseFormat;
use crate::http::context::ResponseContext;

/// Writes success results into a response context.
#[derive(Clone, Copy, Default)]
pub struct ResponseWriter;

impl ResponseWriter {
    pub fn write(
        &self,
        response: &mut ResponseContext,
        value: &Value,
        format: ResponseFormat,
    ) -> Result<(), GatewayError> {
        response.set_status(StatusCode::OK);
        response.insert_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static(format.content_type()),
        );
        match format {
            ResponseFormat::Json => {
                let body = serde_json::to_vec(value).map_err(|e| GatewayError::fault(e))?;
                response.write_body(&body);
            }
            ResponseFormat::PlainText => {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                response.write_body(text.as_bytes());
            }
        }
        Ok(())
    }
}
