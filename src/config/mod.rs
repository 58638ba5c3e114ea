//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via ArcSwap to the server
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap; subsystems observe the new config
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - A failed reload keeps the current configuration

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{FeatureConfig, GatewayConfig, LimitConfig, ListenerConfig, ObservabilityConfig};
