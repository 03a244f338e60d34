//! Shard keys and service nodes.

use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};

/// Environment value that matches every environment in a snapshot.
pub const ALL_ENVIRONMENTS: &str = "*";

/// Shard key identifying the environment a node or a request belongs to.
///
/// Used both as a lookup key into a [`RegistrySnapshot`](crate::RegistrySnapshot) and as
/// selection criteria. Equality is exact string equality on the environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardInfo {
    environment: String,
}

impl ShardInfo {
    /// Creates a shard key for an environment.
    #[must_use]
    pub fn new(environment: impl Into<String>) -> Self {
        Self { environment: environment.into() }
    }

    /// Creates the wildcard shard key that selects every environment.
    #[must_use]
    pub fn all_environments() -> Self {
        Self::new(ALL_ENVIRONMENTS)
    }

    /// Returns the environment name.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Returns whether this key is the `"*"` wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.environment == ALL_ENVIRONMENTS
    }
}

impl fmt::Display for ShardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.environment)
    }
}

/// A live, addressable instance of a service.
///
/// Nodes are owned by the registry and replaced wholesale when a new snapshot
/// arrives; they are never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceNode {
    host: String,
    port: u16,
    shard: ShardInfo,
    last_updated: Option<SystemTime>,
}

impl ServiceNode {
    /// Creates a node registered under `shard`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, shard: ShardInfo) -> Self {
        Self { host: host.into(), port, shard, last_updated: None }
    }

    /// Attaches the time the registry last saw this node.
    #[must_use]
    pub fn with_last_updated(mut self, at: SystemTime) -> Self {
        self.last_updated = Some(at);
        self
    }

    /// Returns the host name or IP address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the shard this node is registered under.
    #[must_use]
    pub fn shard(&self) -> &ShardInfo {
        &self.shard
    }

    /// Returns when the registry last saw this node, if known.
    #[must_use]
    pub fn last_updated(&self) -> Option<SystemTime> {
        self.last_updated
    }

    /// Returns the base URL for this node: `{scheme}://{host}:{port}`.
    #[must_use]
    pub fn endpoint(&self, secure: bool) -> String {
        format!("{}://{}:{}", scheme(secure), self.host, self.port)
    }
}

/// Returns the URL scheme for the secure flag.
pub(crate) fn scheme(secure: bool) -> &'static str {
    if secure { "https" } else { "http" }
}
