//! Content-type deserializer registry.
//!
//! Maps a normalized content-type essence (no parameters, lowercase) to a
//! body deserializer. Lookup of an unregistered type returns `None`; the
//! deserialization selector then falls back to a default DTO instance
//! rather than failing the request.

use std::collections::HashMap;
use std::sync::Arc;

use crate::registry::codecs::{BoxedDto, DecodeError, DtoCodec};

/// Deserializes a raw body into an operation's DTO via its codec.
pub trait BodyDeserializer: Send + Sync {
    fn deserialize(&self, codec: &dyn DtoCodec, body: &[u8]) -> Result<BoxedDto, DecodeError>;
}

/// Built-in deserializer for `application/json`.
pub struct JsonBodyDeserializer;

impl BodyDeserializer for JsonBodyDeserializer {
    fn deserialize(&self, codec: &dyn DtoCodec, body: &[u8]) -> Result<BoxedDto, DecodeError> {
        codec.from_json(body)
    }
}

/// Registry of body deserializers keyed by content-type essence.
#[derive(Default)]
pub struct DeserializerRegistry {
    by_type: HashMap<String, Arc<dyn BodyDeserializer>>,
}

impl DeserializerRegistry {
    /// An empty registry. Every content type falls back to default DTOs.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in JSON deserializer registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("application/json", Arc::new(JsonBodyDeserializer));
        registry
    }

    /// Register a deserializer for a content type. Parameters (e.g.
    /// `; charset=utf-8`) are stripped from the key.
    pub fn register(&mut self, content_type: &str, deserializer: Arc<dyn BodyDeserializer>) {
        self.by_type
            .insert(content_type_essence(content_type), deserializer);
    }

    /// Look up the deserializer for a content type, if one is registered.
    pub fn get(&self, content_type: &str) -> Option<&Arc<dyn BodyDeserializer>> {
        self.by_type.get(&content_type_essence(content_type))
    }
}

/// Normalize a content-type header value to its essence: the `type/subtype`
/// part, lowercased, with parameters stripped.
pub fn content_type_essence(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
