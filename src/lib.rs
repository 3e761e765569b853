//! Mesh test fixture library.
//!
//! A small HTTP service used to exercise service-mesh routing: it answers
//! `/health`, `/hello` and `/info`, registers itself with a Consul-style
//! registry agent, and can serve HTTPS with a self-signed certificate minted
//! at startup.

pub mod cli;
pub mod config;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pki;
pub mod registry;

pub use config::schema::FixtureConfig;
pub use http::HttpServer;
pub use identity::ServiceIdentity;
pub use lifecycle::Shutdown;
