//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, plaintext or rustls)
//!     → request.rs (request ID, accounting)
//!     → handlers.rs (/health, /hello, /info)
//!     → JSON response
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
