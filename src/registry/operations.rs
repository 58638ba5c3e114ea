//! Operation metadata registry.
//!
//! # Responsibilities
//! - Resolve an operation name to its typed request codec
//! - Answer per-operation accessibility for a request's attributes
//!   and negotiated response format
//!
//! # Design Decisions
//! - Existence and accessibility are separate questions: `resolve`
//!   validates existence, `is_accessible` only constrains operations it
//!   knows about (unknown names surface as not-found, never forbidden)

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::gateway::format::{FeatureSet, ResponseFormat};
use crate::net::attributes::RequestAttributes;
use crate::registry::codecs::{DtoCodec, TypedCodec};

/// Limits who may invoke an operation and through which formats.
#[derive(Debug, Clone)]
pub struct OperationRestriction {
    /// Network origins allowed to call the operation.
    pub allowed_origins: RequestAttributes,
    /// Response formats the operation may be invoked through.
    pub allowed_formats: FeatureSet,
}

impl OperationRestriction {
    /// Restrict an operation to loopback callers only.
    pub fn loopback_only() -> Self {
        Self {
            allowed_origins: RequestAttributes::LOOPBACK,
            allowed_formats: FeatureSet::all(),
        }
    }
}

impl Default for OperationRestriction {
    fn default() -> Self {
        Self {
            allowed_origins: RequestAttributes::ANY_NETWORK,
            allowed_formats: FeatureSet::all(),
        }
    }
}

/// One registered operation: its name, request codec, and restriction.
pub struct OperationEntry {
    name: String,
    codec: Arc<dyn DtoCodec>,
    restriction: Option<OperationRestriction>,
}

impl OperationEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn codec(&self) -> &dyn DtoCodec {
        self.codec.as_ref()
    }

    /// Type name of the operation's request DTO.
    pub fn request_type(&self) -> &'static str {
        self.codec.type_name()
    }
}

/// Registry of all operations the host serves.
///
/// Populated at startup, immutable afterwards.
#[derive(Default)]
pub struct OperationRegistry {
    ops: HashMap<String, OperationEntry>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unrestricted operation with request type `T`.
    pub fn register<T>(&mut self, name: &str)
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        self.insert::<T>(name, None);
    }

    /// Register an operation with an access restriction.
    pub fn register_restricted<T>(&mut self, name: &str, restriction: OperationRestriction)
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        self.insert::<T>(name, Some(restriction));
    }

    fn insert<T>(&mut self, name: &str, restriction: Option<OperationRestriction>)
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        self.ops.insert(
            name.to_string(),
            OperationEntry {
                name: name.to_string(),
                codec: Arc::new(TypedCodec::<T>::new()),
                restriction,
            },
        );
    }

    /// Resolve an operation by name.
    pub fn resolve(&self, name: &str) -> Option<&OperationEntry> {
        self.ops.get(name)
    }

    /// Whether the operation may be invoked by a request with the given
    /// attributes, through the given format.
    ///
    /// Unknown operations report accessible; existence is `resolve`'s job.
    pub fn is_accessible(
        &self,
        attrs: RequestAttributes,
        format: ResponseFormat,
        name: &str,
    ) -> bool {
        match self.ops.get(name).and_then(|e| e.restriction.as_ref()) {
            None => true,
            Some(restriction) => {
                attrs.network().intersects(restriction.allowed_origins)
                    && restriction.allowed_formats.contains(format.feature())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
