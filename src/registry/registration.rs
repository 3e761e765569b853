//! Scoped registry announcement.
//!
//! A [`Registration`] is acquired by registering the identity and released by
//! deregistering it. Both calls happen exactly once per guard, whatever the
//! outcome of the other. Errors never leave this module: they are logged and
//! counted, and the fixture keeps serving.

use std::sync::Arc;

use crate::identity::ServiceIdentity;
use crate::observability::metrics;
use crate::registry::client::RegistryClient;
use crate::registry::types::{RegistrationResult, RegistryOperation};

/// Guard for an announced service identity.
#[derive(Debug)]
pub struct Registration {
    client: RegistryClient,
    identity: Arc<ServiceIdentity>,
    registered: bool,
    released: bool,
}

impl Registration {
    /// Register the identity and return the guard, whatever the outcome.
    pub async fn acquire(client: RegistryClient, identity: Arc<ServiceIdentity>) -> Self {
        let result = client.register(&identity).await;
        let registered = report(RegistryOperation::Register, &client, &identity, result);

        Self {
            client,
            identity,
            registered,
            released: false,
        }
    }

    /// Whether the registry accepted the registration.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// The announced identity.
    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Deregister the identity. Returns whether the registry accepted it.
    ///
    /// Runs even when registration failed: the registry may have applied a
    /// request whose response was lost.
    pub async fn release(mut self) -> bool {
        self.released = true;
        let result = self.client.deregister(&self.identity).await;
        report(RegistryOperation::Deregister, &self.client, &self.identity, result)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        tracing::warn!(
            service_id = %self.identity.service_id,
            "Registration dropped without release, deregistering in background"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let client = self.client.clone();
                let identity = self.identity.clone();
                handle.spawn(async move {
                    let result = client.deregister(&identity).await;
                    report(RegistryOperation::Deregister, &client, &identity, result);
                });
            }
            Err(_) => {
                tracing::error!(
                    service_id = %self.identity.service_id,
                    "No runtime available, registry entry left behind"
                );
            }
        }
    }
}

/// Log and count the outcome of a registry call.
fn report(
    operation: RegistryOperation,
    client: &RegistryClient,
    identity: &ServiceIdentity,
    result: RegistrationResult<()>,
) -> bool {
    match result {
        Ok(()) => {
            tracing::info!(
                operation = %operation,
                registry = %client.base_url(),
                service = %identity.service_name,
                service_id = %identity.service_id,
                address = %identity.address,
                port = identity.port,
                "Registry call succeeded"
            );
            metrics::record_registry_operation(operation.as_str(), "success");
            true
        }
        Err(e) => {
            let outcome = if e.is_timeout() { "timeout" } else { "failure" };
            tracing::warn!(
                operation = %operation,
                registry = %client.base_url(),
                service_id = %identity.service_id,
                timeout = ?client.timeout(),
                error = %e,
                "Registry call failed, continuing without it"
            );
            metrics::record_registry_operation(operation.as_str(), outcome);
            false
        }
    }
}
