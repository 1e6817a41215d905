//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)            CLI flags
//!     → loader.rs (parse)           │
//!     → overrides applied ◀─────────┘
//!     → validation.rs (semantic checks)
//!     → LbConfig (validated, immutable)
//!     → consumed once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the backend set never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Any validation error is fatal before the listener binds

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{parse_config, read_config, ConfigError};
pub use schema::{
    AdminConfig, BackendConfig, HealthCheckConfig, LbConfig, LimitsConfig, ListenerConfig,
    ObservabilityConfig, RetryConfig, TimeoutConfig,
};
pub use validation::{parse_backend_url, validate_config, ValidationError};
