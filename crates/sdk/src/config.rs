//! Target configuration.
//!
//! Two layers:
//! - [`TargetConfig`]: the validated, immutable per-target configuration built in code with
//!   [`TargetConfigBuilder`]
//! - [`TargetSettings`]: the serde shape read from configuration files, which also describes
//!   where the node list comes from
//!
//! ```no_run
//! # use shardgate_sdk::TargetConfig;
//! # fn example() -> shardgate_sdk::Result<()> {
//! let config = TargetConfig::builder()
//!     .with_service("billing")
//!     .with_environment("prod")
//!     .with_secure(true)
//!     .with_env_header("X-Env")
//!     .with_fallback_address("billing.internal:443")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use serde::Deserialize;
use snafu::ensure;

use crate::{
    error::{ConfigSnafu, Result},
    shard::{ServiceNode, ShardInfo},
    source::{DEFAULT_FILE_REFRESH_INTERVAL, FileSource, RegistrySource, StaticSource},
};

/// Validated configuration for one [`ServiceTarget`](crate::ServiceTarget).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    service: String,
    namespace: String,
    environment: String,
    secure: bool,
    fallback_address: Option<String>,
    default_environment: Option<String>,
    env_header: Option<String>,
}

impl TargetConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> TargetConfigBuilder {
        TargetConfigBuilder::default()
    }

    /// Returns the logical service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the registry namespace (empty when unset).
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the discovery client's environment criteria.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Returns whether resolved URLs use `https`.
    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Returns the static `host[:port]` used by `url()` when discovery finds nothing.
    #[must_use]
    pub fn fallback_address(&self) -> Option<&str> {
        self.fallback_address.as_deref()
    }

    /// Returns the explicitly configured default environment.
    #[must_use]
    pub fn default_environment(&self) -> Option<&str> {
        self.default_environment.as_deref()
    }

    /// Returns the environment used when a request carries no environment header.
    ///
    /// Falls back to [`environment`](Self::environment) when no default is configured.
    #[must_use]
    pub fn effective_default_environment(&self) -> &str {
        self.default_environment.as_deref().unwrap_or(&self.environment)
    }

    /// Returns the name of the request header that selects an environment.
    #[must_use]
    pub fn env_header(&self) -> Option<&str> {
        self.env_header.as_deref()
    }
}

/// Builder for [`TargetConfig`].
#[derive(Debug, Default)]
pub struct TargetConfigBuilder {
    service: Option<String>,
    namespace: String,
    environment: Option<String>,
    secure: bool,
    fallback_address: Option<String>,
    default_environment: Option<String>,
    env_header: Option<String>,
}

impl TargetConfigBuilder {
    /// Sets the logical service name. Required.
    #[must_use]
    pub fn with_service<S: Into<String>>(mut self, service: S) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the registry namespace.
    ///
    /// Default: empty.
    #[must_use]
    pub fn with_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the discovery client's environment criteria. Required.
    ///
    /// `"*"` makes unscoped lookups span every environment.
    #[must_use]
    pub fn with_environment<S: Into<String>>(mut self, environment: S) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Selects `https` (true) or `http` (false) for resolved URLs.
    ///
    /// Default: `http`.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the static `host[:port]` returned by `url()` when no node is found.
    ///
    /// An empty string leaves the fallback unset. The address must not carry a
    /// scheme; the scheme follows [`with_secure`](Self::with_secure).
    #[must_use]
    pub fn with_fallback_address<S: Into<String>>(mut self, address: S) -> Self {
        self.fallback_address = Some(address.into());
        self
    }

    /// Sets the environment used when a request carries no environment header
    /// or its environment has no nodes.
    ///
    /// Default: the [`with_environment`](Self::with_environment) value.
    #[must_use]
    pub fn with_default_environment<S: Into<String>>(mut self, environment: S) -> Self {
        self.default_environment = Some(environment.into());
        self
    }

    /// Sets the request header whose first value selects the environment.
    ///
    /// Without it, `apply` always uses the unscoped lookup.
    #[must_use]
    pub fn with_env_header<S: Into<String>>(mut self, header: S) -> Self {
        self.env_header = Some(header.into());
        self
    }

    /// Builds the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if:
    /// - The service name is missing or empty
    /// - The environment is missing or empty
    /// - The default environment is set but empty
    /// - The fallback address includes a scheme or whitespace
    /// - The environment header name is empty or not a valid header name
    pub fn build(self) -> Result<TargetConfig> {
        let service =
            self.service.ok_or_else(|| ConfigSnafu { message: "service is required" }.build())?;
        ensure!(!service.is_empty(), ConfigSnafu { message: "service cannot be empty" });

        let environment = self
            .environment
            .ok_or_else(|| ConfigSnafu { message: "environment is required" }.build())?;
        ensure!(!environment.is_empty(), ConfigSnafu { message: "environment cannot be empty" });

        if let Some(ref default) = self.default_environment {
            ensure!(
                !default.is_empty(),
                ConfigSnafu { message: "default_environment cannot be empty" }
            );
        }

        let fallback_address = self.fallback_address.filter(|address| !address.is_empty());
        if let Some(ref address) = fallback_address {
            validate_fallback_address(address)?;
        }

        if let Some(ref header) = self.env_header {
            ensure!(!header.is_empty(), ConfigSnafu { message: "env_header cannot be empty" });
            ensure!(
                http::HeaderName::from_bytes(header.as_bytes()).is_ok(),
                ConfigSnafu { message: format!("env_header '{header}' is not a valid header name") }
            );
        }

        Ok(TargetConfig {
            service,
            namespace: self.namespace,
            environment,
            secure: self.secure,
            fallback_address,
            default_environment: self.default_environment,
            env_header: self.env_header,
        })
    }
}

fn validate_fallback_address(address: &str) -> Result<()> {
    ensure!(
        !address.contains("://"),
        ConfigSnafu {
            message: format!("fallback_address '{address}' must not include a scheme"),
        }
    );
    ensure!(
        !address.contains(char::is_whitespace),
        ConfigSnafu {
            message: format!("fallback_address '{address}' must not contain whitespace"),
        }
    );
    Ok(())
}

/// File-level target settings.
///
/// ```toml
/// service = "billing"
/// environment = "prod"
/// secure = true
/// env_header = "X-Env"
/// fallback_address = "billing.internal:443"
///
/// [source]
/// type = "file"
/// path = "/etc/shardgate/nodes.json"
/// refresh_interval = "30s"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSettings {
    /// Logical service name.
    pub service: String,
    /// Registry namespace.
    #[serde(default)]
    pub namespace: String,
    /// Discovery client environment criteria.
    pub environment: String,
    /// Use `https` for resolved URLs.
    #[serde(default)]
    pub secure: bool,
    /// Static `host[:port]` used by `url()` when discovery finds nothing.
    #[serde(default)]
    pub fallback_address: Option<String>,
    /// Environment used when a request carries no environment header.
    #[serde(default)]
    pub default_environment: Option<String>,
    /// Request header that selects an environment.
    #[serde(default)]
    pub env_header: Option<String>,
    /// Where the node list comes from.
    pub source: SourceSettings,
}

/// Where a target's node list comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceSettings {
    /// A fixed node list.
    Static {
        /// The nodes.
        #[serde(default)]
        nodes: Vec<NodeSettings>,
    },
    /// A JSON node manifest re-read on an interval.
    File {
        /// Manifest path.
        path: PathBuf,
        /// How often to re-read the manifest.
        #[serde(default = "default_refresh_interval", with = "humantime_serde")]
        refresh_interval: Duration,
    },
}

/// One statically configured node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSettings {
    /// Host name or address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Environment the node belongs to.
    pub environment: String,
}

fn default_refresh_interval() -> Duration {
    DEFAULT_FILE_REFRESH_INTERVAL
}

impl TargetSettings {
    /// Validates the settings into a [`TargetConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) when validation fails.
    pub fn to_config(&self) -> Result<TargetConfig> {
        let mut builder = TargetConfig::builder()
            .with_service(&self.service)
            .with_namespace(&self.namespace)
            .with_environment(&self.environment)
            .with_secure(self.secure);
        if let Some(ref address) = self.fallback_address {
            builder = builder.with_fallback_address(address);
        }
        if let Some(ref environment) = self.default_environment {
            builder = builder.with_default_environment(environment);
        }
        if let Some(ref header) = self.env_header {
            builder = builder.with_env_header(header);
        }
        builder.build()
    }

    /// Creates the registry source described by [`source`](Self::source).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if a file source has a
    /// zero refresh interval.
    pub fn to_source(&self) -> Result<Arc<dyn RegistrySource>> {
        let source: Arc<dyn RegistrySource> = match &self.source {
            SourceSettings::Static { nodes } => Arc::new(StaticSource::new(nodes.iter().map(
                |node| {
                    ServiceNode::new(
                        node.host.clone(),
                        node.port,
                        ShardInfo::new(node.environment.clone()),
                    )
                },
            ))),
            SourceSettings::File { path, refresh_interval } => {
                ensure!(
                    !refresh_interval.is_zero(),
                    ConfigSnafu { message: "refresh_interval cannot be zero" }
                );
                Arc::new(
                    FileSource::builder()
                        .path(path.clone())
                        .refresh_interval(*refresh_interval)
                        .build(),
                )
            }
        };
        Ok(source)
    }
}

/// Duration deserialization using humantime format.
mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn minimal() -> TargetConfigBuilder {
        TargetConfig::builder().with_service("billing").with_environment("prod")
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = minimal().build().expect("valid config");

        assert_eq!(config.service(), "billing");
        assert_eq!(config.environment(), "prod");
        assert_eq!(config.namespace(), "");
        assert!(!config.secure());
        assert!(config.fallback_address().is_none());
        assert!(config.default_environment().is_none());
        assert!(config.env_header().is_none());
    }

    #[test]
    fn test_full_config() {
        let config = minimal()
            .with_namespace("payments")
            .with_secure(true)
            .with_fallback_address("backup.example.com")
            .with_default_environment("prod-eu")
            .with_env_header("X-Env")
            .build()
            .expect("valid config");

        assert_eq!(config.namespace(), "payments");
        assert!(config.secure());
        assert_eq!(config.fallback_address(), Some("backup.example.com"));
        assert_eq!(config.default_environment(), Some("prod-eu"));
        assert_eq!(config.effective_default_environment(), "prod-eu");
        assert_eq!(config.env_header(), Some("X-Env"));
    }

    #[test]
    fn test_effective_default_environment_uses_client_environment() {
        let config = minimal().build().unwrap();
        assert_eq!(config.effective_default_environment(), "prod");
    }

    #[test]
    fn test_missing_service() {
        let err = TargetConfig::builder().with_environment("prod").build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("service is required"));
    }

    #[test]
    fn test_empty_service() {
        let err = minimal().with_service("").build().unwrap_err();
        assert!(err.to_string().contains("service cannot be empty"));
    }

    #[test]
    fn test_missing_environment() {
        let err = TargetConfig::builder().with_service("billing").build().unwrap_err();
        assert!(err.to_string().contains("environment is required"));
    }

    #[test]
    fn test_empty_default_environment() {
        let err = minimal().with_default_environment("").build().unwrap_err();
        assert!(err.to_string().contains("default_environment cannot be empty"));
    }

    #[test]
    fn test_empty_fallback_is_unset() {
        let config = minimal().with_fallback_address("").build().unwrap();
        assert!(config.fallback_address().is_none());
    }

    #[test]
    fn test_fallback_with_scheme_rejected() {
        let err = minimal().with_fallback_address("https://backup.example.com").build().unwrap_err();
        assert!(err.to_string().contains("must not include a scheme"));
    }

    #[test]
    fn test_fallback_with_whitespace_rejected() {
        let err = minimal().with_fallback_address("backup example.com").build().unwrap_err();
        assert!(err.to_string().contains("whitespace"));
    }

    #[test]
    fn test_invalid_env_header() {
        assert!(minimal().with_env_header("").build().is_err());
        let err = minimal().with_env_header("X Env").build().unwrap_err();
        assert!(err.to_string().contains("not a valid header name"));
    }

    #[test]
    fn test_settings_from_json_static_source() {
        let settings: TargetSettings = serde_json::from_str(
            r#"{
                "service": "billing",
                "environment": "*",
                "secure": true,
                "env_header": "X-Env",
                "source": {
                    "type": "static",
                    "nodes": [{"host": "10.0.0.1", "port": 8443, "environment": "prod"}]
                }
            }"#,
        )
        .expect("parse settings");

        let config = settings.to_config().expect("valid settings");
        assert_eq!(config.environment(), "*");
        assert!(config.secure());
        assert_eq!(config.env_header(), Some("X-Env"));

        let source = settings.to_source().unwrap();
        assert_eq!(source.describe(), "static list of 1 nodes");
        assert!(source.refresh_interval().is_none());
    }

    #[test]
    fn test_settings_file_source_refresh_interval() {
        let settings: TargetSettings = serde_json::from_str(
            r#"{
                "service": "billing",
                "environment": "prod",
                "source": {"type": "file", "path": "/etc/nodes.json", "refresh_interval": "15s"}
            }"#,
        )
        .expect("parse settings");

        let source = settings.to_source().unwrap();
        assert_eq!(source.refresh_interval(), Some(Duration::from_secs(15)));
        assert_eq!(source.describe(), "file /etc/nodes.json");
    }

    #[test]
    fn test_settings_file_source_default_interval() {
        let settings: TargetSettings = serde_json::from_str(
            r#"{
                "service": "billing",
                "environment": "prod",
                "source": {"type": "file", "path": "/etc/nodes.json"}
            }"#,
        )
        .expect("parse settings");

        assert_eq!(
            settings.to_source().unwrap().refresh_interval(),
            Some(DEFAULT_FILE_REFRESH_INTERVAL)
        );
    }

    #[test]
    fn test_settings_invalid_interval() {
        let result: std::result::Result<TargetSettings, _> = serde_json::from_str(
            r#"{
                "service": "billing",
                "environment": "prod",
                "source": {"type": "file", "path": "/etc/nodes.json", "refresh_interval": "soon"}
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_zero_refresh_interval_rejected() {
        let settings: TargetSettings = serde_json::from_str(
            r#"{
                "service": "billing",
                "environment": "prod",
                "source": {"type": "file", "path": "/etc/nodes.json", "refresh_interval": "0s"}
            }"#,
        )
        .expect("parse settings");

        let err = settings.to_source().err().expect("zero interval rejected");
        assert!(matches!(
            err,
            Error::Config { ref message } if message == "refresh_interval cannot be zero"
        ));
    }

    #[test]
    fn test_settings_validation_errors_surface() {
        let settings: TargetSettings = serde_json::from_str(
            r#"{"service": "", "environment": "prod", "source": {"type": "static"}}"#,
        )
        .expect("parse settings");

        assert!(matches!(settings.to_config(), Err(Error::Config { .. })));
    }
}
