//! Gateway error taxonomy.

use axum::http::StatusCode;
use thiserror::Error;

use crate::registry::codecs::DecodeError;

/// Errors that can occur while processing a routed request.
///
/// Serialization failures are detected before any service logic runs and
/// surface as client errors. Faults and cancellations always travel through
/// the error pipeline. Access denial is a gate decision, not an error.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Input could not be decoded into the operation's request type.
    #[error("failed to deserialize `{operation}` request into {target} from {content_type}: {source}")]
    Serialization {
        operation: String,
        target: &'static str,
        content_type: String,
        #[source]
        source: DecodeError,
    },

    /// The gate requires a non-empty operation name.
    #[error("operation name must not be empty")]
    EmptyOperationName,

    /// No operation with this name is registered.
    #[error("operation `{0}` is not registered")]
    UnknownOperation(String),

    /// The service logic itself failed.
    #[error("operation failed: {message}")]
    Fault { message: String },

    /// The deferred computation was cancelled before completion.
    #[error("operation was cancelled before completion")]
    Cancelled,
}

impl GatewayError {
    /// Build a fault from any displayable service error.
    pub fn fault(message: impl std::fmt::Display) -> Self {
        GatewayError::Fault {
            message: message.to_string(),
        }
    }

    /// Stable machine-readable kind, used in logs, metrics and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Serialization { .. } => "serialization",
            GatewayError::EmptyOperationName => "empty_operation_name",
            GatewayError::UnknownOperation(_) => "unknown_operation",
            GatewayError::Fault { .. } => "operation_fault",
            GatewayError::Cancelled => "operation_cancelled",
        }
    }

    /// HTTP status the error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Serialization { .. } | GatewayError::EmptyOperationName => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::UnknownOperation(_) => StatusCode::NOT_FOUND,
            GatewayError::Fault { .. } | GatewayError::Cancelled => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
