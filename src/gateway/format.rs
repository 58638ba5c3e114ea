//! Response formats and the feature set gating them.

use bitflags::bitflags;

use crate::config::schema::FeatureConfig;
use crate::http::context::RequestContext;

bitflags! {
    /// Coarse-grained togglable capabilities of the host.
    ///
    /// Each response format is gated by a feature; disabling the feature
    /// forbids every operation invoked through that format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FeatureSet: u32 {
        const JSON       = 1 << 0;
        const PLAIN_TEXT = 1 << 1;
    }
}

impl FeatureSet {
    /// Derive the enabled feature set from configuration.
    pub fn from_config(config: &FeatureConfig) -> Self {
        let mut features = FeatureSet::empty();
        if config.json {
            features |= FeatureSet::JSON;
        }
        if config.plain_text {
            features |= FeatureSet::PLAIN_TEXT;
        }
        features
    }
}

/// Negotiated response format for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    PlainText,
}

impl ResponseFormat {
    /// The feature gating this format.
    pub fn feature(self) -> FeatureSet {
        match self {
            ResponseFormat::Json => FeatureSet::JSON,
            ResponseFormat::PlainText => FeatureSet::PLAIN_TEXT,
        }
    }

    /// Content type written for this format.
    pub fn content_type(self) -> &'static str {
        match self {
            ResponseFormat::Json => "application/json",
            ResponseFormat::PlainText => "text/plain; charset=utf-8",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::PlainText => "text",
        }
    }

    /// Negotiate the format for a request: an explicit `?format=` query
    /// parameter wins, then the Accept header, defaulting to JSON.
    pub fn negotiate(ctx: &RequestContext) -> Self {
        if let Some(format) = ctx.query_param("format") {
            return match format.as_str() {
                "text" | "txt" => ResponseFormat::PlainText,
                _ => ResponseFormat::Json,
            };
        }
        if let Some(accept) = ctx.header("accept") {
            if accept.contains("text/plain") && !accept.contains("application/json") {
                return ResponseFormat::PlainText;
            }
        }
        ResponseFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[test]
    fn feature_set_from_config() {
        let config = FeatureConfig {
            json: true,
            plain_text: false,
        };
        let features = FeatureSet::from_config(&config);
        assert!(features.contains(FeatureSet::JSON));
        assert!(!features.contains(FeatureSet::PLAIN_TEXT));
    }

    #[test]
    fn query_param_wins_over_accept() {
        let ctx = RequestContext::new(Method::GET, "/Ping")
            .with_query("format=text")
            .with_header("accept", "application/json");
        assert_eq!(ResponseFormat::negotiate(&ctx), ResponseFormat::PlainText);
    }

    #[test]
    fn defaults_to_json() {
        let ctx = RequestContext::new(Method::GET, "/Ping");
        assert_eq!(ResponseFormat::negotiate(&ctx), ResponseFormat::Json);
    }

    #[test]
    fn accept_header_selects_text() {
        let ctx = RequestContext::new(Method::GET, "/Ping").with_header("accept", "text/plain");
        assert_eq!(ResponseFormat::negotiate(&ctx), ResponseFormat::PlainText);
    }
}
