//! Lifecycle management subsystem.
//!
//! # Design Decisions
//! - Graceful shutdown via a broadcast channel all long-running tasks
//!   subscribe to

pub mod shutdown;

pub use shutdown::Shutdown;
