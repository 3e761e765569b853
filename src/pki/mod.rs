//! Ephemeral PKI for the TLS listener.
//!
//! # Data Flow
//! ```text
//! CertificateIssuer::issue_to_temp_files
//!     → RSA key pair (2048-bit, e = 65537)
//!     → self-signed X.509, SHA-256, SAN {localhost, CN, 127.0.0.1}
//!     → PEM (unencrypted PKCS#8 key)
//!     → two temp files
//!     → net/tls.rs builds the rustls listener config
//! ```
//!
//! # Design Decisions
//! - One certificate per process start; nothing is reused across runs
//! - Every failure here is fatal when TLS is requested
//! - Key bytes are never logged, only file locations

pub mod issuer;

pub use issuer::{
    CertificateBundle, CertificateIssuer, IssuanceError, IssuanceStage, IssuerConfig,
    PersistedBundle, SubjectAltName,
};
