//! Service identity descriptor.
//!
//! Built once at startup from the validated configuration and shared
//! read-only by the registry client and the HTTP handlers.

use indexmap::IndexMap;

use crate::config::FixtureConfig;

/// Routing metadata as announced to the registry. Order is preserved.
pub type RoutingMetadata = IndexMap<String, String>;

/// Immutable discovery identity of this instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    /// Logical service name (registry `Name`).
    pub service_name: String,
    /// Instance identifier (registry `ID`).
    pub service_id: String,
    /// Address registry consumers use to reach this instance.
    pub address: String,
    /// Listener port.
    pub port: u16,
    /// Opaque routing annotations (registry `Meta`).
    pub routing_metadata: RoutingMetadata,
}

impl ServiceIdentity {
    /// Derive the identity from configuration.
    ///
    /// The instance ID falls back to `<container_name>:<port>` and the
    /// routing metadata to [`default_routing_metadata`] when not configured.
    pub fn from_config(config: &FixtureConfig) -> Self {
        let service = &config.service;
        let port = config.listener.port;

        let service_id = service
            .id
            .clone()
            .unwrap_or_else(|| format!("{}:{}", service.container_name, port));

        let routing_metadata = if service.meta.is_empty() {
            default_routing_metadata(&service.name)
        } else {
            service.meta.clone()
        };

        Self {
            service_name: service.name.clone(),
            service_id,
            address: service.container_name.clone(),
            port,
            routing_metadata,
        }
    }

    /// Same identity announced on a different port.
    ///
    /// Used when the listener binds an ephemeral port and the real port is
    /// only known after binding. A derived default ID follows the new port.
    pub fn with_port(mut self, port: u16) -> Self {
        let derived_id = format!("{}:{}", self.address, self.port);
        if self.service_id == derived_id {
            self.service_id = format!("{}:{}", self.address, port);
        }
        self.port = port;
        self
    }
}

/// Routing metadata the proxy's route parser understands, derived from the
/// service name: a path-prefix route stripping `/<name>/` and a header route
/// matching `X-Service: <name>`.
pub fn default_routing_metadata(service_name: &str) -> RoutingMetadata {
    let mut meta = IndexMap::new();
    meta.insert("route_1_match_type".to_string(), "path".to_string());
    meta.insert("route_1_path_prefix".to_string(), format!("/{}/", service_name));
    meta.insert("route_1_prefix_rewrite".to_string(), "/".to_string());
    meta.insert("route_2_match_type".to_string(), "header".to_string());
    meta.insert("route_2_header_name".to_string(), "X-Service".to_string());
    meta.insert("route_2_header_value".to_string(), service_name.to_string());
    meta.insert("route_2_path_prefix".to_string(), "/".to_string());
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, container: &str, port: u16) -> FixtureConfig {
        let mut config = FixtureConfig::default();
        config.service.name = name.into();
        config.service.container_name = container.into();
        config.listener.port = port;
        config
    }

    #[test]
    fn test_id_defaults_to_container_and_port() {
        let identity = ServiceIdentity::from_config(&config("hello-service", "host1", 8080));
        assert_eq!(identity.service_id, "host1:8080");
        assert_eq!(identity.address, "host1");
        assert_eq!(identity.port, 8080);
    }

    #[test]
    fn test_explicit_id_wins() {
        let mut cfg = config("hello-service", "host1", 8080);
        cfg.service.id = Some("hello-1".into());
        let identity = ServiceIdentity::from_config(&cfg);
        assert_eq!(identity.service_id, "hello-1");
    }

    #[test]
    fn test_default_metadata_uses_service_name() {
        let identity = ServiceIdentity::from_config(&config("hello-service", "host1", 8080));
        assert_eq!(
            identity.routing_metadata.get("route_1_path_prefix").map(String::as_str),
            Some("/hello-service/")
        );
        assert_eq!(
            identity.routing_metadata.get("route_2_header_value").map(String::as_str),
            Some("hello-service")
        );
        assert_eq!(identity.routing_metadata.len(), 7);
    }

    #[test]
    fn test_configured_metadata_is_forwarded_verbatim() {
        let mut cfg = config("hello-service", "host1", 8080);
        // Values are opaque; an uninterpolated placeholder stays as written.
        cfg.service
            .meta
            .insert("route_1_regex_rewrite".into(), "^/{service}/(.*)".into());
        let identity = ServiceIdentity::from_config(&cfg);
        assert_eq!(identity.routing_metadata, cfg.service.meta);
    }

    #[test]
    fn test_with_port_updates_derived_id_only() {
        let identity = ServiceIdentity::from_config(&config("svc", "host1", 8080)).with_port(40123);
        assert_eq!(identity.port, 40123);
        assert_eq!(identity.service_id, "host1:40123");

        let mut cfg = config("svc", "host1", 8080);
        cfg.service.id = Some("fixed".into());
        let identity = ServiceIdentity::from_config(&cfg).with_port(40123);
        assert_eq!(identity.service_id, "fixed");
    }
}
