//! Request and response contexts.
//!
//! # Responsibilities
//! - Expose the request facts the gateway core negotiates on (method,
//!   query string, content type, body, form fields, remote address)
//! - Buffer the outgoing response until the request is finalized
//! - Track finalization so a request is ended exactly once
//!
//! # Design Decisions
//! - Contexts are request-local and never shared across requests
//! - `end_request` is idempotent; the error pipeline may reach it from
//!   several exit paths and only the first call takes effect

use std::net::{IpAddr, SocketAddr};

use axum::body::Bytes;
use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;
use serde_json::Value;

use crate::http::request::X_REQUEST_ID;
use crate::registry::content::content_type_essence;

/// Immutable view of one incoming request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    raw_query: String,
    headers: HeaderMap,
    body: Bytes,
    form_fields: Vec<(String, String)>,
    remote: Option<IpAddr>,
    secure: bool,
    request_id: String,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            raw_query: String::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            form_fields: Vec::new(),
            remote: None,
            secure: false,
            request_id: String::new(),
        }
    }

    /// Build a context from parsed request parts and a collected body.
    pub fn from_parts(parts: &Parts, remote: Option<SocketAddr>, body: Bytes) -> Self {
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            raw_query: parts.uri.query().unwrap_or("").to_string(),
            headers: parts.headers.clone(),
            body,
            form_fields: Vec::new(),
            remote: remote.map(|a| a.ip()),
            secure: parts.uri.scheme_str() == Some("https"),
            request_id,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.raw_query = query.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_form_fields(mut self, fields: Vec<(String, String)>) -> Self {
        self.form_fields = fields;
        self
    }

    pub fn with_remote(mut self, remote: IpAddr) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn set_form_fields(&mut self, fields: Vec<(String, String)>) {
        self.form_fields = fields;
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string, without the leading `?`.
    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    /// Decoded query key/value pairs.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.raw_query.as_bytes())
            .into_owned()
            .collect()
    }

    /// First value of a query parameter, decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        url::form_urlencoded::parse(self.raw_query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw Content-Type header value, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    /// Normalized content-type essence (`type/subtype`, lowercase).
    pub fn content_type_essence(&self) -> Option<String> {
        self.content_type().map(content_type_essence)
    }

    /// Length of the collected body in bytes.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Text fields extracted from a multipart body, if any.
    pub fn form_fields(&self) -> &[(String, String)] {
        &self.form_fields
    }

    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.remote
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

/// Buffered outgoing response with finalization tracking.
#[derive(Debug)]
pub struct ResponseContext {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    headers_written: bool,
    ended: bool,
    end_calls: u32,
}

impl ResponseContext {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            headers_written: false,
            ended: false,
            end_calls: 0,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        if !self.headers_written {
            self.status = status;
        }
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        if !self.headers_written {
            self.headers.insert(name, value);
        }
    }

    /// Append body bytes. The first write commits status and headers.
    pub fn write_body(&mut self, bytes: &[u8]) {
        if self.ended {
            tracing::debug!("Ignoring body write on an already-finalized response");
            return;
        }
        self.headers_written = true;
        self.body.extend_from_slice(bytes);
    }

    /// Write a complete JSON response in one step. Ignored once finalized.
    pub fn write_json(&mut self, status: StatusCode, value: &Value) {
        if self.ended {
            tracing::debug!("Ignoring JSON write on an already-finalized response");
            return;
        }
        self.set_status(status);
        self.insert_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.write_body(&body);
    }

    /// Whether status and headers are already committed.
    pub fn headers_written(&self) -> bool {
        self.headers_written
    }

    /// Finalize the response. Idempotent: only the first call takes effect.
    ///
    /// `skip_headers` signals that status and headers were already partially
    /// written and must not be touched during finalization.
    pub fn end_request(&mut self, skip_headers: bool) {
        self.end_calls += 1;
        if self.ended {
            return;
        }
        self.ended = true;
        if !skip_headers && !self.headers_written {
            self.headers_written = true;
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// How many times finalization was attempted. Only the first succeeds.
    pub fn end_calls(&self) -> u32 {
        self.end_calls
    }

    /// Convert the buffered response into a wire response.
    pub fn into_response(self) -> Response {
        let mut builder = Response::builder().status(self.status);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
        }
        builder
            .body(axum::body::Body::from(self.body))
            .unwrap_or_else(|_| Response::new(axum::body::Body::empty()))
    }
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new()
    }
}
