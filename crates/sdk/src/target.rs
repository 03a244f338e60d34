//! Target resolver: turns outgoing requests into requests addressed at a live node.
//!
//! # Resolution
//!
//! ```text
//!   apply(request)                              url()
//!        │                                        │
//!  env header configured? ── no ──► get_node()    get_node_in(default)
//!        │ yes                          │          │ miss
//!  header value or default              │          ▼
//!        │                              │        fallback address? ── no ──► NoNodesFound
//!  get_node_in(desired)                 │          │ yes
//!        │ miss, desired from header    │          ▼
//!        ▼                              │        {scheme}://{fallback}
//!  get_node_in(default)                 │
//!        │ miss ────────────────────────┴──► NoNodesFound
//!        ▼
//!  {scheme}://{host}:{port} spliced into the request
//! ```
//!
//! `apply` never consults the fallback address; `url()` never retries the
//! default environment.

use std::{fmt, marker::PhantomData, sync::Arc};

use snafu::ensure;
use tracing::{debug, info, warn};

use crate::{
    client::DiscoveryClient,
    config::{TargetConfig, TargetSettings},
    error::{ConfigSnafu, Error, Result},
    metrics::{ResolutionOutcome, ResolverMetrics, default_metrics},
    request::OutgoingRequest,
    shard::{ServiceNode, scheme},
    source::RegistrySource,
};

/// A service target bound to a started discovery client.
///
/// `T` identifies the client interface the target serves (for example a
/// generated API trait); it only affects [`type_name`](Self::type_name).
///
/// Dropping the target stops the discovery client's background refresh.
pub struct ServiceTarget<T: ?Sized> {
    config: TargetConfig,
    client: DiscoveryClient,
    metrics: Arc<dyn ResolverMetrics>,
    _target: PhantomData<fn(&T)>,
}

impl<T: ?Sized> fmt::Debug for ServiceTarget<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTarget")
            .field("type", &self.type_name())
            .field("config", &self.config)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized> ServiceTarget<T> {
    /// Starts `client` and binds it to `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the client serves a different service than
    /// `config`, or [`Error::DiscoveryStart`] if the first snapshot cannot be loaded.
    pub async fn new(config: TargetConfig, client: DiscoveryClient) -> Result<Self> {
        ensure!(
            client.service_name() == config.service(),
            ConfigSnafu {
                message: format!(
                    "discovery client serves '{}' but target is configured for '{}'",
                    client.service_name(),
                    config.service()
                ),
            }
        );

        info!(
            service = config.service(),
            namespace = config.namespace(),
            environment = config.environment(),
            "Starting service discovery client"
        );
        client.start().await?;
        info!(service = config.service(), "Started service discovery client");

        Ok(Self { config, client, metrics: default_metrics(), _target: PhantomData })
    }

    /// Builds a discovery client for `config` over `source`, then starts it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryStart`] if the first snapshot cannot be loaded.
    pub async fn connect(config: TargetConfig, source: Arc<dyn RegistrySource>) -> Result<Self> {
        let client = DiscoveryClient::builder()
            .service_name(config.service())
            .namespace(config.namespace())
            .environment(config.environment())
            .source(source)
            .build();
        Self::new(config, client).await
    }

    /// Validates `settings` and starts a target over the source they describe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid settings, or
    /// [`Error::DiscoveryStart`] if the first snapshot cannot be loaded.
    pub async fn from_settings(settings: &TargetSettings) -> Result<Self> {
        let config = settings.to_config()?;
        Self::connect(config, settings.to_source()?).await
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn ResolverMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Returns the name of the client interface type this target serves.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    /// Returns the logical service name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.config.service()
    }

    /// Returns the target configuration.
    #[must_use]
    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    /// Returns the discovery client.
    #[must_use]
    pub fn client(&self) -> &DiscoveryClient {
        &self.client
    }

    /// Addresses `request` at a node of this service.
    ///
    /// With an environment header configured, the header's first value picks
    /// the environment (the default environment when the header is absent). A
    /// header-selected environment without nodes falls back to the default
    /// environment once. Without an environment header, the client's unscoped
    /// lookup is used and a miss fails immediately.
    ///
    /// Only the request address changes; method, path, headers and body are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoNodesFound`] when no environment tried has a node,
    /// or [`Error::InvalidUrl`] if the request rejects the resolved base URL.
    pub fn apply<R: OutgoingRequest>(&self, mut request: R) -> Result<R::Output> {
        let node = self.resolve(&request)?;
        let base_url = node.endpoint(self.config.secure());
        debug!(service = self.name(), base_url = %base_url, "Resolved request target");

        request.insert_base_url(&base_url)?;
        Ok(request.finish())
    }

    /// Returns the base URL of a node in the default environment, or the
    /// fallback address when that environment has none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoNodesFound`] when no node is found and no fallback
    /// address is configured.
    pub fn url(&self) -> Result<String> {
        let environment = self.config.effective_default_environment();
        let secure = self.config.secure();

        if let Some(node) = self.client.get_node_in(environment) {
            self.record(ResolutionOutcome::Resolved);
            return Ok(node.endpoint(secure));
        }

        match self.config.fallback_address() {
            Some(address) => {
                debug!(
                    service = self.name(),
                    environment,
                    fallback = address,
                    "No nodes found, using fallback address"
                );
                self.record(ResolutionOutcome::FallbackAddress);
                Ok(format!("{}://{address}", scheme(secure)))
            },
            None => Err(self.no_nodes(environment)),
        }
    }

    /// Stops the discovery client. The last snapshot stays readable.
    pub fn shutdown(&self) {
        self.client.stop();
    }

    fn resolve<R: OutgoingRequest>(&self, request: &R) -> Result<ServiceNode> {
        let Some(header) = self.config.env_header() else {
            return match self.client.get_node() {
                Some(node) => {
                    self.record(ResolutionOutcome::Resolved);
                    Ok(node)
                },
                None => Err(self.no_nodes(self.client.environment())),
            };
        };

        let default = self.config.effective_default_environment();
        let requested = request.header(header);
        let desired = requested.unwrap_or(default);

        if let Some(node) = self.client.get_node_in(desired) {
            self.record(ResolutionOutcome::Resolved);
            return Ok(node);
        }

        if requested.is_none() {
            return Err(self.no_nodes(default));
        }

        warn!(
            service = self.name(),
            requested = desired,
            default,
            "No nodes in requested environment, retrying default environment"
        );
        match self.client.get_node_in(default) {
            Some(node) => {
                self.record(ResolutionOutcome::DefaultEnvironment);
                Ok(node)
            },
            None => Err(self.no_nodes(default)),
        }
    }

    fn no_nodes(&self, environment: &str) -> Error {
        self.record(ResolutionOutcome::NoNodes);
        debug!(service = self.name(), environment, "No service nodes found");
        Error::NoNodesFound {
            service: self.name().to_owned(),
            environment: Some(environment.to_owned()),
        }
    }

    fn record(&self, outcome: ResolutionOutcome) {
        self.metrics.record_resolution(self.name(), outcome);
    }
}

impl<T: ?Sized> Drop for ServiceTarget<T> {
    fn drop(&mut self) {
        self.client.stop();
    }
}
