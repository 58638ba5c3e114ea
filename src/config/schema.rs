//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Feature enablement (response formats).
    pub features: FeatureConfig,

    /// Request limits.
    pub limits: LimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Togglable response-format features.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Allow JSON responses.
    pub json: bool,

    /// Allow plain-text responses.
    pub plain_text: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            json: true,
            plain_text: true,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Default tracing filter when RUST_LOG is unset.
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9100".to_string(),
            log_filter: "service_gateway=debug,tower_http=debug".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.features.json);
        assert_eq!(config.limits.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [features]
            plain_text = false

            [limits]
            request_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert!(config.features.json);
        assert!(!config.features.plain_text);
        assert_eq!(config.limits.request_timeout_secs, 5);
        assert_eq!(config.limits.max_body_bytes, 1024 * 1024);
    }
}
