//! Registry HTTP client with timeout and error handling.
//!
//! # Responsibilities
//! - Build the registration descriptor from the service identity
//! - Issue register/deregister calls against the agent HTTP API
//! - Bound every call by the configured timeout, never retry

use std::time::Duration;

use url::Url;

use crate::config::RegistryConfig;
use crate::identity::ServiceIdentity;
use crate::registry::types::{
    RegistrationError, RegistrationResult, RegistryOperation, ServiceRegistration,
};

/// Thin client over the registry agent API.
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl RegistryClient {
    /// Create a client for the configured registry agent.
    pub fn new(config: &RegistryConfig) -> RegistrationResult<Self> {
        Self::with_base_url(&config.base_url(), Duration::from_secs(config.timeout_secs))
    }

    /// Create a client against an explicit base URL (e.g. `http://127.0.0.1:8500`).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> RegistrationResult<Self> {
        let base_url = Url::parse(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(RegistrationError::Transport)?;

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    /// Announce the identity. Re-registering the same ID overwrites the entry.
    pub async fn register(&self, identity: &ServiceIdentity) -> RegistrationResult<()> {
        let url = self.endpoint(&["v1", "agent", "service", "register"])?;
        let descriptor = ServiceRegistration::from(identity);

        tracing::debug!(
            url = %url,
            service_id = %descriptor.id,
            meta_keys = descriptor.meta.len(),
            "Sending registration"
        );

        let response = self
            .http
            .put(url)
            .json(&descriptor)
            .send()
            .await
            .map_err(RegistrationError::Transport)?;

        Self::check(RegistryOperation::Register, response).await
    }

    /// Withdraw the identity's announcement.
    pub async fn deregister(&self, identity: &ServiceIdentity) -> RegistrationResult<()> {
        let url = self.endpoint(&[
            "v1",
            "agent",
            "service",
            "deregister",
            &identity.service_id,
        ])?;

        tracing::debug!(url = %url, service_id = %identity.service_id, "Sending deregistration");

        let response = self
            .http
            .put(url)
            .send()
            .await
            .map_err(RegistrationError::Transport)?;

        Self::check(RegistryOperation::Deregister, response).await
    }

    /// Upper bound applied to each call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Base URL of the registry agent.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> RegistrationResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check(
        operation: RegistryOperation,
        response: reqwest::Response,
    ) -> RegistrationResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(operation = %operation, error = %e, "Failed to read registry error body");
                String::new()
            }
        };
        Err(RegistrationError::Rejected { status, body })
    }
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}
