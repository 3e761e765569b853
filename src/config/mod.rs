//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs overlays flags / environment variables
//!     → validation.rs (semantic checks)
//!     → FixtureConfig (validated, immutable)
//!     → ServiceIdentity derived once, shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no reload
//! - All fields have defaults so the fixture starts with no input at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::FixtureConfig;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::RegistryConfig;
pub use schema::ServiceConfig;
pub use schema::TimeoutConfig;
pub use schema::TlsConfig;
