//! Discovery client: the live registry plus a selection strategy.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DiscoveryClient                          │
//! │   start/stop │ get_node() │ get_node_in(environment)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │   ShardSelector (criteria → candidates) │ NodePicker (→ 1)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    ServiceRegistry                          │
//! │   Arc<RegistrySnapshot> swapped by the refresh task         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    RegistrySource                           │
//! │   Static list │ JSON manifest │ external watch adapters     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookups never block on I/O: they read whatever snapshot is current. Only
//! [`start()`](DiscoveryClient::start) waits for the source.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use snafu::{ResultExt, ensure};
use tokio::{
    sync::Notify,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

use crate::{
    error::{ConfigSnafu, DiscoveryStartSnafu, Result, SourceError},
    picker::{NodePicker, RoundRobinPicker},
    registry::ServiceRegistry,
    selector::{EnvironmentAwareShardSelector, ShardSelector},
    shard::{ServiceNode, ShardInfo},
    source::RegistrySource,
};

/// Client for discovering nodes of one service.
///
/// # Thread Safety
///
/// The client is cheap to clone. All clones share the registry, the picker
/// state and the background refresh task.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    /// Live registry for the service.
    registry: ServiceRegistry,

    /// Criteria used by the unscoped [`get_node`](Self::get_node) lookup.
    criteria: ShardInfo,

    /// Where snapshots come from.
    source: Arc<dyn RegistrySource>,

    /// Candidate selection.
    selector: Arc<dyn ShardSelector>,

    /// Reduces candidates to one node.
    picker: Arc<dyn NodePicker>,

    /// Overrides the source's own refresh interval.
    refresh_interval: Option<Duration>,

    /// Whether the first snapshot has been loaded.
    started: Arc<AtomicBool>,

    /// Signals the refresh task to exit.
    shutdown: Arc<Notify>,
}

#[bon::bon]
impl DiscoveryClient {
    /// Creates a client in the stopped state.
    ///
    /// `environment` is the criteria for the unscoped [`get_node`](Self::get_node)
    /// lookup; `"*"` matches every environment. The selector defaults to
    /// [`EnvironmentAwareShardSelector`], the picker to [`RoundRobinPicker`], and
    /// the refresh interval to the source's own.
    ///
    /// Until [`start()`](Self::start) succeeds the registry is empty and every
    /// lookup returns `None`.
    #[builder]
    pub fn new(
        #[builder(into)] service_name: String,
        #[builder(into, default)] namespace: String,
        #[builder(into)] environment: String,
        source: Arc<dyn RegistrySource>,
        selector: Option<Arc<dyn ShardSelector>>,
        picker: Option<Arc<dyn NodePicker>>,
        refresh_interval: Option<Duration>,
    ) -> Self {
        Self {
            registry: ServiceRegistry::new(namespace, service_name),
            criteria: ShardInfo::new(environment),
            source,
            selector: selector.unwrap_or_else(|| Arc::new(EnvironmentAwareShardSelector)),
            picker: picker.unwrap_or_else(|| Arc::new(RoundRobinPicker::new())),
            refresh_interval,
            started: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
        }
    }
}

impl DiscoveryClient {
    /// Returns the service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        self.registry.service_name()
    }

    /// Returns the environment used by the unscoped lookup.
    #[must_use]
    pub fn environment(&self) -> &str {
        self.criteria.environment()
    }

    /// Returns the live registry.
    #[must_use]
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Returns whether the client has loaded its first snapshot.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Loads the first snapshot and starts background refresh.
    ///
    /// Calling this on a started client is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the refresh interval
    /// is zero, or [`Error::DiscoveryStart`](crate::Error::DiscoveryStart) if
    /// the source cannot produce a snapshot. The client stays stopped.
    pub async fn start(&self) -> Result<()> {
        if self.is_started() {
            debug!(service = self.service_name(), "Discovery client already started");
            return Ok(());
        }

        let refresh_period = self.refresh_interval.or_else(|| self.source.refresh_interval());
        if let Some(period) = refresh_period {
            ensure!(
                !period.is_zero(),
                ConfigSnafu {
                    message: format!(
                        "refresh interval for {} cannot be zero",
                        self.source.describe()
                    ),
                }
            );
        }

        let snapshot = self
            .source
            .fetch()
            .await
            .context(DiscoveryStartSnafu { service: self.service_name() })?;
        let node_count = snapshot.node_count();
        self.registry.replace(snapshot);

        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(period) = refresh_period {
            self.spawn_refresh(period);
        }

        info!(
            service = self.service_name(),
            namespace = self.registry.namespace(),
            source = %self.source.describe(),
            nodes = node_count,
            "Discovery client started"
        );
        Ok(())
    }

    /// Stops background refresh. The last snapshot stays readable.
    pub fn stop(&self) {
        if self.started.swap(false, Ordering::SeqCst) {
            self.shutdown.notify_one();
            info!(service = self.service_name(), "Discovery client stopped");
        }
    }

    /// Re-fetches the snapshot from the source and swaps it in.
    ///
    /// On failure the previous snapshot is kept.
    ///
    /// # Errors
    ///
    /// Returns the source error if the fetch fails.
    pub async fn refresh(&self) -> std::result::Result<(), SourceError> {
        let snapshot = self.source.fetch().await?;
        debug!(
            service = self.service_name(),
            nodes = snapshot.node_count(),
            "Registry snapshot refreshed"
        );
        self.registry.replace(snapshot);
        Ok(())
    }

    /// Picks a node using the client's own environment.
    #[must_use]
    pub fn get_node(&self) -> Option<ServiceNode> {
        self.pick_for(&self.criteria)
    }

    /// Picks a node registered under `environment`.
    #[must_use]
    pub fn get_node_in(&self, environment: &str) -> Option<ServiceNode> {
        self.pick_for(&ShardInfo::new(environment))
    }

    /// Returns every candidate for `environment` without picking.
    #[must_use]
    pub fn nodes_in(&self, environment: &str) -> Vec<ServiceNode> {
        self.selector.nodes(&ShardInfo::new(environment), &self.registry)
    }

    fn pick_for(&self, criteria: &ShardInfo) -> Option<ServiceNode> {
        let candidates = self.selector.nodes(criteria, &self.registry);
        self.picker.pick(&candidates)
    }

    fn spawn_refresh(&self, period: Duration) {
        let client = self.clone();

        tokio::spawn(async move {
            debug!(service = client.service_name(), ?period, "Starting registry refresh task");

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await; // First tick is immediate; start() just fetched.

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = client.refresh().await {
                            warn!(
                                service = client.service_name(),
                                error = %e,
                                "Registry refresh failed, keeping previous snapshot"
                            );
                        }
                    }
                    _ = client.shutdown.notified() => {
                        debug!(service = client.service_name(), "Registry refresh task shutting down");
                        break;
                    }
                }
            }
        });
    }
}
