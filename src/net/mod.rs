//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Issued PEM files
//!     → tls.rs (parse, restrict cipher suites, build rustls ServerConfig)
//!     → axum-server TLS acceptor
//!     → Hand off to HTTP layer
//! ```

pub mod tls;
