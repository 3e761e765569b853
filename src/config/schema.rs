//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the fixture.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so an empty file (or no file at all) is valid.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::net::tls::CIPHER_SUITE_ALLOW_LIST;

/// Root configuration for the fixture.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FixtureConfig {
    /// Listener configuration (bind host, port).
    pub listener: ListenerConfig,

    /// Discovery registry integration.
    pub registry: RegistryConfig,

    /// Service identity inputs.
    pub service: ServiceConfig,

    /// Self-signed TLS settings.
    pub tls: TlsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// Port to bind. This is also the port announced to the registry.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Discovery registry (Consul agent) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Register on startup and deregister on shutdown.
    pub enabled: bool,

    /// Registry agent host.
    pub host: String,

    /// Registry agent HTTP port.
    pub port: u16,

    /// Upper bound for each register/deregister call, in seconds.
    pub timeout_secs: u64,
}

impl RegistryConfig {
    /// Base URL of the registry agent, e.g. `http://localhost:8500`.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 8500,
            timeout_secs: 5,
        }
    }
}

/// Inputs for the service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Logical service name.
    pub name: String,

    /// Container or host name; announced as the service address.
    pub container_name: String,

    /// Explicit instance ID. Defaults to `<container_name>:<port>`.
    pub id: Option<String>,

    /// Routing metadata forwarded verbatim to the registry.
    /// When empty, defaults are derived from the service name.
    pub meta: IndexMap<String, String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "rest-service".to_string(),
            container_name: "localhost".to_string(),
            id: None,
            meta: IndexMap::new(),
        }
    }
}

/// Self-signed TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Terminate TLS with a freshly issued certificate.
    pub enabled: bool,

    /// RSA modulus size for the generated key.
    pub key_bits: usize,

    /// Additional SAN entries. IP literals become IP SANs, the rest DNS SANs.
    pub extra_sans: Vec<String>,

    /// TLS 1.2 cipher suites (OpenSSL names) the listener accepts.
    pub cipher_suites: Vec<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            key_bits: 2048,
            extra_sans: Vec::new(),
            cipher_suites: CIPHER_SUITE_ALLOW_LIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout for the HTTP routes, in seconds.
    pub request_secs: u64,

    /// Time allowed for in-flight requests to finish after shutdown is signalled.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config: FixtureConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.registry.base_url(), "http://localhost:8500");
        assert_eq!(config.registry.timeout_secs, 5);
        assert!(!config.registry.enabled);
        assert!(!config.tls.enabled);
        assert_eq!(config.tls.cipher_suites.len(), 6);
        assert_eq!(config.observability.log_format, LogFormat::Text);
    }

    #[test]
    fn test_meta_table_keeps_file_order() {
        let config: FixtureConfig = toml::from_str(
            r#"
            [service]
            name = "hello-service"

            [service.meta]
            route_2_match_type = "header"
            route_1_match_type = "path"
            route_1_path_prefix = "/hello-service/"
            "#,
        )
        .unwrap();

        let keys: Vec<&str> = config.service.meta.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["route_2_match_type", "route_1_match_type", "route_1_path_prefix"]
        );
    }

    #[test]
    fn test_log_format_is_lowercase() {
        let config: FixtureConfig = toml::from_str(
            r#"
            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
