//! Startup orchestration.
//!
//! # Order
//! 1. Issue the certificate and build the TLS config (when TLS is enabled),
//!    abandoned if shutdown is requested meanwhile
//! 2. Bind the listener
//! 3. Register with the discovery registry (when enabled), awaited, non-fatal
//! 4. Serve until shutdown
//! 5. Deregister, bounded by the registry timeout
//!
//! # Design Decisions
//! - Fail fast on configuration, certificate and bind errors
//! - Registry errors are logged and never stop the fixture
//! - Deregistration runs on every exit path once registration was attempted

use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ConfigError, FixtureConfig};
use crate::http::HttpServer;
use crate::identity::ServiceIdentity;
use crate::lifecycle::Shutdown;
use crate::net::tls::{load_tls_config, TlsError};
use crate::pki::{CertificateIssuer, IssuanceError, IssuerConfig, PersistedBundle};
use crate::registry::{Registration, RegistryClient};

/// Fatal startup and serving errors.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("certificate issuance failed at stage {stage}: {0}", stage = .0.stage())]
    Certificate(#[from] IssuanceError),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("startup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StartupError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::Config(_) => 2,
            _ => 1,
        }
    }
}

/// Certificate files and the listener config built from them.
///
/// The files must outlive the server; dropping this removes them.
pub struct TlsMaterial {
    pub persisted: PersistedBundle,
    pub rustls: RustlsConfig,
}

/// Issue a certificate for the container name and load it for the listener.
pub async fn prepare_tls(config: &FixtureConfig) -> Result<Option<TlsMaterial>, StartupError> {
    if !config.tls.enabled {
        return Ok(None);
    }

    let issuer = CertificateIssuer::new(IssuerConfig {
        key_bits: config.tls.key_bits,
        temp_dir: None,
    });
    let common_name = config.service.container_name.clone();
    let extra_sans = config.tls.extra_sans.clone();

    // RSA key generation is CPU bound.
    let persisted = tokio::task::spawn_blocking(move || {
        issuer.issue_to_temp_files(&common_name, &extra_sans)
    })
    .await??;

    let rustls = load_tls_config(
        persisted.cert_path(),
        persisted.key_path(),
        &config.tls.cipher_suites,
    )?;

    Ok(Some(TlsMaterial { persisted, rustls }))
}

/// Outcome of the pre-bind phase.
enum Prepared {
    Ready(Option<TlsMaterial>),
    Stopped,
}

/// Prepare TLS material unless shutdown is requested first.
async fn prepare_or_stop(
    config: &FixtureConfig,
    shutdown: &Shutdown,
) -> Result<Prepared, StartupError> {
    let mut signal = shutdown.subscribe();
    tokio::select! {
        biased;
        _ = signal.recv() => {
            tracing::info!("Shutdown requested during startup, exiting before serving");
            Ok(Prepared::Stopped)
        }
        tls = prepare_tls(config) => Ok(Prepared::Ready(tls?)),
    }
}

/// Run the fixture: TLS material, bind, register, serve, deregister.
pub async fn run(config: FixtureConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let tls = match prepare_or_stop(&config, &shutdown).await? {
        Prepared::Ready(tls) => tls,
        Prepared::Stopped => return Ok(()),
    };

    let address = config.listener.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    serve_with(config, listener, tls, shutdown).await
}

/// Like [`run`], on a listener the caller already bound.
///
/// The announced port is the listener's actual port.
pub async fn serve(
    config: FixtureConfig,
    listener: TcpListener,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    match prepare_or_stop(&config, &shutdown).await? {
        Prepared::Ready(tls) => serve_with(config, listener, tls, shutdown).await,
        Prepared::Stopped => Ok(()),
    }
}

async fn serve_with(
    config: FixtureConfig,
    listener: TcpListener,
    tls: Option<TlsMaterial>,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    let server_shutdown = shutdown.subscribe();

    let local_addr = listener.local_addr().map_err(StartupError::Serve)?;
    let identity = Arc::new(ServiceIdentity::from_config(&config).with_port(local_addr.port()));

    tracing::info!(
        service = %identity.service_name,
        service_id = %identity.service_id,
        address = %identity.address,
        port = identity.port,
        tls = tls.is_some(),
        "Service identity resolved"
    );

    let (server, _material) = match tls {
        Some(material) => (
            HttpServer::with_tls(identity.clone(), &config.timeouts, material.rustls.clone()),
            Some(material.persisted),
        ),
        None => (HttpServer::new(identity.clone(), &config.timeouts), None),
    };

    if shutdown.is_triggered() {
        tracing::info!("Shutdown requested before serving, skipping registration");
        return Ok(());
    }

    let registration = if config.registry.enabled {
        match RegistryClient::new(&config.registry) {
            Ok(client) => Some(Registration::acquire(client, identity.clone()).await),
            Err(e) => {
                tracing::warn!(
                    registry = %config.registry.base_url(),
                    error = %e,
                    "Registry client unavailable, serving without registration"
                );
                None
            }
        }
    } else {
        tracing::info!("Registry integration disabled");
        None
    };

    let result = server.run(listener, server_shutdown).await;

    if let Some(registration) = registration {
        registration.release().await;
    }

    result.map_err(StartupError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tls_disabled_prepares_nothing() {
        assert!(prepare_tls(&FixtureConfig::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tls_material_for_container_name() {
        let mut config = FixtureConfig::default();
        config.tls.enabled = true;
        config.service.container_name = "fixture-1".into();

        let material = prepare_tls(&config).await.unwrap().unwrap();
        assert!(material.persisted.cert_path().exists());
        assert!(material
            .persisted
            .bundle
            .subject_alt_names
            .contains(&crate::pki::SubjectAltName::Dns("fixture-1".into())));
    }

    #[tokio::test]
    async fn test_certificate_failure_aborts_before_binding() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = FixtureConfig::default();
        config.tls.enabled = true;
        config.service.container_name = "bücher".into();
        config.listener.bind_host = "127.0.0.1".into();
        config.listener.port = taken.local_addr().unwrap().port();

        let err = run(config, Shutdown::new()).await.unwrap_err();
        assert!(matches!(err, StartupError::Certificate(IssuanceError::Signing(_))));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("certificate-signed"));
    }

    #[tokio::test]
    async fn test_shutdown_before_serve_returns_without_serving() {
        let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let registry_port = unused.local_addr().unwrap().port();
        drop(unused);

        let mut config = FixtureConfig::default();
        config.tls.enabled = true;
        config.registry.enabled = true;
        config.registry.host = "127.0.0.1".into();
        config.registry.port = registry_port;

        let shutdown = Shutdown::new();
        shutdown.trigger();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            serve(config, listener, shutdown),
        )
        .await
        .expect("fixture kept running after shutdown")
        .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_during_issuance_stops_run() {
        let free = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = FixtureConfig::default();
        config.tls.enabled = true;
        config.listener.bind_host = "127.0.0.1".into();
        config.listener.port = free.local_addr().unwrap().port();
        drop(free);

        let shutdown = Shutdown::new();
        let task = tokio::spawn(run(config, shutdown.clone()));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        shutdown.trigger();

        tokio::time::timeout(std::time::Duration::from_secs(20), task)
            .await
            .expect("fixture kept running after shutdown")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_is_fatal() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = FixtureConfig::default();
        config.listener.bind_host = "127.0.0.1".into();
        config.listener.port = taken.local_addr().unwrap().port();

        let err = run(config, Shutdown::new()).await.unwrap_err();
        assert!(matches!(err, StartupError::Bind { .. }));
    }
}
