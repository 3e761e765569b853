//! Command line and environment overrides.
//!
//! Every flag has an environment variable counterpart so the fixture can be
//! configured from a container definition alone. Values given here win over
//! the config file, which wins over built-in defaults.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::Parser;

use crate::config::validation::validate_config;
use crate::config::{read_config, ConfigError, FixtureConfig, LogFormat};

#[derive(Debug, Default, Parser)]
#[command(name = "mesh-fixture")]
#[command(about = "HTTP test service that registers itself with a service registry", long_about = None)]
pub struct Cli {
    /// Optional TOML config file.
    #[arg(short, long, env = "FIXTURE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Registry agent host.
    #[arg(long, env = "CONSUL_HOST")]
    pub registry_host: Option<String>,

    /// Registry agent port.
    #[arg(long, env = "CONSUL_PORT")]
    pub registry_port: Option<u16>,

    /// Register with the registry on startup.
    #[arg(
        long,
        env = "REGISTER_WITH_CONSUL",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub register: Option<bool>,

    /// Logical service name.
    #[arg(long, env = "SERVICE_NAME")]
    pub service_name: Option<String>,

    /// Listen port, also the announced port.
    #[arg(short, long, env = "SERVICE_PORT")]
    pub port: Option<u16>,

    /// Announced address and certificate common name.
    #[arg(long, env = "CONTAINER_NAME")]
    pub container_name: Option<String>,

    /// Explicit instance id; defaults to `<container-name>:<port>`.
    #[arg(long, env = "SERVICE_ID")]
    pub service_id: Option<String>,

    /// Serve HTTPS with a freshly issued self-signed certificate.
    #[arg(
        long,
        env = "ENABLE_TLS",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub tls: Option<bool>,

    /// Interface to bind.
    #[arg(long)]
    pub bind_host: Option<String>,

    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    #[arg(long, env = "LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_address: Option<String>,
}

impl Cli {
    /// Overlay the values given on the command line or environment.
    pub fn apply(&self, config: &mut FixtureConfig) {
        if let Some(host) = &self.registry_host {
            config.registry.host = host.clone();
        }
        if let Some(port) = self.registry_port {
            config.registry.port = port;
        }
        if let Some(register) = self.register {
            config.registry.enabled = register;
        }
        if let Some(name) = &self.service_name {
            config.service.name = name.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(container) = &self.container_name {
            config.service.container_name = container.clone();
        }
        if let Some(id) = &self.service_id {
            config.service.id = Some(id.clone());
        }
        if let Some(tls) = self.tls {
            config.tls.enabled = tls;
        }
        if let Some(host) = &self.bind_host {
            config.listener.bind_host = host.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
        if let Some(address) = &self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = address.clone();
        }
    }

    /// Build the final configuration: defaults, then file, then overrides.
    pub fn resolve(&self) -> Result<FixtureConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => FixtureConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mesh-fixture").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--service-name",
            "hello-service",
            "--port",
            "9000",
            "--container-name",
            "hello-1",
            "--registry-host",
            "consul",
            "--register",
        ])
        .resolve()
        .unwrap();

        assert_eq!(config.service.name, "hello-service");
        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.service.container_name, "hello-1");
        assert_eq!(config.registry.host, "consul");
        assert!(config.registry.enabled);
    }

    #[test]
    fn test_boolish_values() {
        assert_eq!(parse(&["--tls", "yes"]).tls, Some(true));
        assert_eq!(parse(&["--tls=false"]).tls, Some(false));
        assert_eq!(parse(&["--register", "0"]).register, Some(false));
        assert!(Cli::try_parse_from(["mesh-fixture", "--tls", "maybe"]).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [service]
            name = "from-file"

            [listener]
            port = 7000
            "#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = parse(&["--config", &path, "--port", "7100"]).resolve().unwrap();
        assert_eq!(config.service.name, "from-file");
        assert_eq!(config.listener.port, 7100);
    }

    #[test]
    fn test_metrics_address_enables_metrics() {
        let config = parse(&["--metrics-address", "127.0.0.1:9100"]).resolve().unwrap();
        assert!(config.observability.metrics_enabled);
        assert_eq!(config.observability.metrics_address, "127.0.0.1:9100");
    }

    #[test]
    fn test_invalid_result_is_rejected() {
        let err = parse(&["--service-name", " "]).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_config_file() {
        let err = parse(&["--config", "/nonexistent/fixture.toml"]).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
