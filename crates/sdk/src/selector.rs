//! Environment-aware shard selection.
//!
//! Maps selection criteria onto the nodes of a registry snapshot. An exact
//! environment key returns that key's nodes; the `"*"` wildcard returns every
//! node in the snapshot. A missing or empty environment is not an error and
//! yields an empty list.

use std::fmt;

use tracing::debug;

use crate::{
    registry::{RegistrySnapshot, ServiceRegistry},
    shard::{ServiceNode, ShardInfo},
};

/// Strategy for choosing the candidate nodes that match some criteria.
///
/// Implementations must be pure with respect to the registry: they read one
/// snapshot and never write to it.
pub trait ShardSelector: Send + Sync + fmt::Debug {
    /// Returns the candidate nodes in `registry` matching `criteria`.
    fn nodes(&self, criteria: &ShardInfo, registry: &ServiceRegistry) -> Vec<ServiceNode>;
}

/// Selector that matches nodes by exact environment, with `"*"` matching all.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentAwareShardSelector;

impl ShardSelector for EnvironmentAwareShardSelector {
    fn nodes(&self, criteria: &ShardInfo, registry: &ServiceRegistry) -> Vec<ServiceNode> {
        let snapshot = registry.nodes();
        let nodes = select(criteria, &snapshot);

        if !criteria.is_wildcard() && !nodes.is_empty() {
            debug!(
                service = registry.service_name(),
                environment = criteria.environment(),
                "Effective environment for discovery"
            );
        }

        nodes
    }
}

/// Selects the nodes of `snapshot` matching `criteria`.
///
/// The returned list is an owned copy in snapshot order; mutating it never
/// affects the snapshot.
#[must_use]
pub fn select(criteria: &ShardInfo, snapshot: &RegistrySnapshot) -> Vec<ServiceNode> {
    if criteria.is_wildcard() {
        return snapshot.iter().flat_map(|(_, nodes)| nodes.iter().cloned()).collect();
    }

    match snapshot.get(criteria) {
        Some(nodes) if !nodes.is_empty() => nodes.to_vec(),
        _ => Vec::new(),
    }
}
