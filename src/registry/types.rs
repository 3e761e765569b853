//! Registry wire types and error definitions.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{RoutingMetadata, ServiceIdentity};

/// Body of `PUT /v1/agent/service/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRegistration {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub meta: RoutingMetadata,
}

impl From<&ServiceIdentity> for ServiceRegistration {
    fn from(identity: &ServiceIdentity) -> Self {
        Self {
            id: identity.service_id.clone(),
            name: identity.service_name.clone(),
            address: identity.address.clone(),
            port: identity.port,
            meta: identity.routing_metadata.clone(),
        }
    }
}

/// Which registry call an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryOperation {
    Register,
    Deregister,
}

impl RegistryOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryOperation::Register => "register",
            RegistryOperation::Deregister => "deregister",
        }
    }
}

impl std::fmt::Display for RegistryOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from registry calls. Never fatal to the fixture.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The registry could not be reached or did not answer in time.
    #[error("registry transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The registry answered with a non-success status.
    #[error("registry rejected request with {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    /// The configured registry address does not form a valid URL.
    #[error("invalid registry URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl RegistrationError {
    /// True when the failure was the bounded timeout elapsing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RegistrationError::Transport(e) if e.is_timeout())
    }
}

pub type RegistrationResult<T> = Result<T, RegistrationError>;
