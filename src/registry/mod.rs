//! Discovery registry integration.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     ServiceIdentity
//!     → types.rs (ServiceRegistration descriptor)
//!     → client.rs (PUT /v1/agent/service/register, bounded timeout)
//!     → registration.rs (log outcome, hold guard)
//!
//! Shutdown:
//!     Registration::release
//!     → client.rs (PUT /v1/agent/service/deregister/{ID}, bounded timeout)
//!     → log outcome
//! ```
//!
//! # Design Decisions
//! - Registry failures are logged, never fatal
//! - Exactly one attempt per lifecycle event, no retries
//! - Deregistration runs on every exit path once registration was attempted

pub mod client;
pub mod registration;
pub mod types;

pub use client::RegistryClient;
pub use registration::Registration;
pub use types::{RegistrationError, RegistrationResult, RegistryOperation, ServiceRegistration};
