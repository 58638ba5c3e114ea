//! Typed codecs bridging untyped wire input and operation DTOs.
//!
//! # Responsibilities
//! - Decode key/value input (query string, form fields) into a DTO
//! - Decode JSON bodies and pre-parsed JSON values into a DTO
//! - Produce a default DTO instance for bodyless requests
//!
//! # Design Decisions
//! - One object-safe trait per registered operation type; the registry
//!   stores trait objects so dispatch stays monomorphization-free
//! - Key/value decoding goes through serde_urlencoded, the same decoder
//!   axum's Query/Form extractors are built on

use std::any::Any;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// A request DTO with its concrete type erased.
///
/// The service executor downcasts back to the type it registered.
pub type BoxedDto = Box<dyn Any + Send>;

/// Failure while decoding wire input into a DTO.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Body was not valid JSON, or did not match the target type.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Key/value input did not match the target type.
    #[error("invalid key-value input: {0}")]
    KeyValue(#[from] serde_urlencoded::de::Error),

    /// Body bytes were not valid UTF-8 where text was required.
    #[error("body is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Failure raised by a custom body deserializer.
    #[error("{0}")]
    Other(String),
}

/// Object-safe decoding surface for one operation's request type.
pub trait DtoCodec: Send + Sync {
    /// Decode urlencoded key/value input (query string or form body).
    fn from_urlencoded(&self, input: &str) -> Result<BoxedDto, DecodeError>;

    /// Decode a JSON body.
    fn from_json(&self, body: &[u8]) -> Result<BoxedDto, DecodeError>;

    /// Decode a pre-parsed JSON value. Custom body deserializers parse
    /// their format into a `Value` and hand it here.
    fn from_value(&self, value: Value) -> Result<BoxedDto, DecodeError>;

    /// A default-constructed DTO, used when no negotiated content applies.
    fn default_instance(&self) -> BoxedDto;

    /// The DTO's type name, for error reporting.
    fn type_name(&self) -> &'static str;
}

/// Standard codec for any `Deserialize + Default` request type.
pub struct TypedCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DtoCodec for TypedCodec<T>
where
    T: DeserializeOwned + Default + Send + 'static,
{
    fn from_urlencoded(&self, input: &str) -> Result<BoxedDto, DecodeError> {
        let dto: T = serde_urlencoded::from_str(input)?;
        Ok(Box::new(dto))
    }

    fn from_json(&self, body: &[u8]) -> Result<BoxedDto, DecodeError> {
        let dto: T = serde_json::from_slice(body)?;
        Ok(Box::new(dto))
    }

    fn from_value(&self, value: Value) -> Result<BoxedDto, DecodeError> {
        let dto: T = serde_json::from_value(value)?;
        Ok(Box::new(dto))
    }

    fn default_instance(&self) -> BoxedDto {
        Box::new(T::default())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}
