//! Network identity subsystem.
//!
//! # Data Flow
//! ```text
//! Process startup:
//!     identity.rs enumerates local interfaces once
//!     → NetworkAddressTable (immutable, shared via Arc)
//!
//! Per request:
//!     remote address + method + transport
//!     → attributes.rs (classify against the table)
//!     → RequestAttributes (bitset, request-local)
//! ```
//!
//! # Design Decisions
//! - The address table is built exactly once; lookups are read-only and
//!   need no locking
//! - Enumeration failure degrades to an empty table with a warning;
//!   requests are never failed for missing interface data
//! - Unknown origins classify as external (conservative)

pub mod attributes;
pub mod identity;

pub use attributes::{compute_request_attributes, RequestAttributes};
pub use identity::{NetworkAddressTable, NetworkOrigin};
