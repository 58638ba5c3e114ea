//! Operation and content-type registries.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     host registers operations (name → typed codec + restriction)
//!     host registers body deserializers (content type → decoder)
//!     → both registries immutable, shared via Arc
//!
//! Per request:
//!     operations.rs resolves the operation name
//!     content.rs looks up a body deserializer for the content type
//!     codecs.rs turns raw input into the operation's typed DTO
//! ```
//!
//! # Design Decisions
//! - Registries are populated before traffic and never mutated after;
//!   plain HashMap behind Arc, no locking
//! - DTOs cross the registry boundary as `Box<dyn Any + Send>`; the
//!   executor downcasts to the concrete type it registered

pub mod codecs;
pub mod content;
pub mod operations;

pub use codecs::{BoxedDto, DecodeError, DtoCodec, TypedCodec};
pub use content::{content_type_essence, BodyDeserializer, DeserializerRegistry, JsonBodyDeserializer};
pub use operations::{OperationEntry, OperationRegistry, OperationRestriction};
