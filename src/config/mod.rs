//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env.local / .env (optional)
//!     → config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → env.rs (TIERLINE_* overrides)
//!     → validation.rs (semantic checks)
//!     → PipelineConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A missing signing secret is a startup error, never a silent downgrade

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, ListenerConfig, LogFormat, ObservabilityConfig, PipelineConfig, QueueConfig,
    RetryConfig, SignatureScheme, SigningConfig, TierAuthKind, TierConfig,
};
pub use validation::{validate_config, validate_retry, ValidationError};
