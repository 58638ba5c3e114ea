//! Access gate.
//!
//! Checks feature enablement and per-operation visibility before any
//! deserialization or execution. Denial is a decision, not an error: the
//! gate produces the Forbidden response itself and the request ends there.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::gateway::error::GatewayError;
use crate::gateway::format::{FeatureSet, ResponseFormat};
use crate::net::attributes::RequestAttributes;
use crate::registry::operations::OperationRegistry;

/// Outcome of the access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Denied(DenyReason),
}

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The feature gating the negotiated format is disabled.
    FeatureDisabled(ResponseFormat),
    /// The operation's restriction excludes this request.
    OperationRestricted(String),
}

/// Check whether a request may proceed to deserialization and execution.
///
/// An empty operation name is a contract violation and fails fast with an
/// explicit error; it never reaches the registry.
pub fn check_access(
    features: FeatureSet,
    format: ResponseFormat,
    attrs: RequestAttributes,
    registry: &OperationRegistry,
    operation: &str,
) -> Result<GateDecision, GatewayError> {
    if operation.is_empty() {
        return Err(GatewayError::EmptyOperationName);
    }

    if !features.contains(format.feature()) {
        return Ok(GateDecision::Denied(DenyReason::FeatureDisabled(format)));
    }

    if !registry.is_accessible(attrs, format, operation) {
        return Ok(GateDecision::Denied(DenyReason::OperationRestricted(
            operation.to_string(),
        )));
    }

    Ok(GateDecision::Allowed)
}

/// Forbidden response for a denial. Emitted by the gate itself so callers
/// cannot forget it.
pub fn deny_response(reason: &DenyReason) -> Response {
    let message = match reason {
        DenyReason::FeatureDisabled(format) => {
            format!("{} format is not enabled on this host", format.as_str())
        }
        DenyReason::OperationRestricted(operation) => {
            format!("operation `{}` is not accessible from this request", operation)
        }
    };
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": {
                "code": "forbidden",
                "message": message,
            }
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::operations::OperationRestriction;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default)]
    struct Ping {}

    fn registry() -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        registry.register::<Ping>("Ping");
        registry.register_restricted::<Ping>("Reload", OperationRestriction::loopback_only());
        registry
    }

    fn external_attrs() -> RequestAttributes {
        RequestAttributes::EXTERNAL | RequestAttributes::INSECURE | RequestAttributes::HTTP_GET
    }

    #[test]
    fn allows_enabled_feature_and_open_operation() {
        let decision = check_access(
            FeatureSet::all(),
            ResponseFormat::Json,
            external_attrs(),
            &registry(),
            "Ping",
        )
        .unwrap();
        assert_eq!(decision, GateDecision::Allowed);
    }

    #[test]
    fn denies_disabled_feature() {
        let decision = check_access(
            FeatureSet::PLAIN_TEXT,
            ResponseFormat::Json,
            external_attrs(),
            &registry(),
            "Ping",
        )
        .unwrap();
        assert_eq!(
            decision,
            GateDecision::Denied(DenyReason::FeatureDisabled(ResponseFormat::Json))
        );
    }

    #[test]
    fn denies_restricted_operation_for_external_caller() {
        let decision = check_access(
            FeatureSet::all(),
            ResponseFormat::Json,
            external_attrs(),
            &registry(),
            "Reload",
        )
        .unwrap();
        assert!(matches!(
            decision,
            GateDecision::Denied(DenyReason::OperationRestricted(_))
        ));
    }

    #[test]
    fn empty_operation_name_fails_fast() {
        let err = check_access(
            FeatureSet::all(),
            ResponseFormat::Json,
            external_attrs(),
            &registry(),
            "",
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::EmptyOperationName));
    }
}
