//! Deserialization selector.
//!
//! # Responsibilities
//! - Pick the deserialization strategy from HTTP method, content type
//!   and body presence
//! - Produce the operation's typed request DTO, or a classified
//!   serialization error
//!
//! # Decision Order
//! ```text
//! 1. Query-bearing method (GET/DELETE/OPTIONS)
//!        → query string only, body ignored
//! 2. Form content type (urlencoded/multipart)
//!        → form fields only, query ignored
//! 3. Declared content type + nonzero body
//!        → registered body deserializer
//!    Unregistered type or empty body
//!        → default DTO instance, never an error
//! ```
//!
//! Query-bearing verbs conventionally carry no meaningful body even when
//! one is sent; ignoring it avoids query-vs-body precedence ambiguity.

use axum::http::Method;

use crate::gateway::error::GatewayError;
use crate::http::context::RequestContext;
use crate::registry::codecs::{BoxedDto, DecodeError};
use crate::registry::content::DeserializerRegistry;
use crate::registry::operations::OperationEntry;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM: &str = "multipart/form-data";

/// Whether the verb carries its parameters in the URL query string.
pub fn is_query_bearing(method: &Method) -> bool {
    *method == Method::GET || *method == Method::DELETE || *method == Method::OPTIONS
}

/// Build the typed request DTO for one routed request.
pub fn create_request(
    ctx: &RequestContext,
    entry: &OperationEntry,
    deserializers: &DeserializerRegistry,
) -> Result<BoxedDto, GatewayError> {
    let codec = entry.codec();

    if is_query_bearing(ctx.method()) {
        return codec
            .from_urlencoded(ctx.raw_query())
            .map_err(|source| serialization_error(entry, "query-string", source));
    }

    if let Some(essence) = ctx.content_type_essence() {
        if essence == FORM_URLENCODED {
            let body = std::str::from_utf8(ctx.body())
                .map_err(|e| serialization_error(entry, &essence, e.into()))?;
            return codec
                .from_urlencoded(body)
                .map_err(|source| serialization_error(entry, &essence, source));
        }

        if essence == MULTIPART_FORM {
            let encoded: String = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(ctx.form_fields().iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .finish();
            return codec
                .from_urlencoded(&encoded)
                .map_err(|source| serialization_error(entry, &essence, source));
        }

        if ctx.content_length() > 0 {
            if let Some(deserializer) = deserializers.get(&essence) {
                return deserializer
                    .deserialize(codec, ctx.body())
                    .map_err(|source| serialization_error(entry, &essence, source));
            }
            // Compatibility: an unrecognized content type degrades to an
            // empty DTO instead of failing the request.
            tracing::debug!(
                operation = %entry.name(),
                content_type = %essence,
                "No body deserializer registered; using default request instance"
            );
        }
    }

    Ok(codec.default_instance())
}

fn serialization_error(
    entry: &OperationEntry,
    content_type: &str,
    source: DecodeError,
) -> GatewayError {
    GatewayError::Serialization {
        operation: entry.name().to_string(),
        target: entry.request_type(),
        content_type: content_type.to_string(),
        source,
    }
}
