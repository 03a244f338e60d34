//! Registry snapshots and the swap-on-write registry holder.
//!
//! A [`RegistrySnapshot`] is an immutable multimap from [`ShardInfo`] to the nodes
//! registered under it. The [`ServiceRegistry`] holds the current snapshot behind
//! an `Arc` and replaces it atomically when a source produces a new one, so a
//! reader always sees one complete snapshot.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::shard::{ServiceNode, ShardInfo};

/// Point-in-time view of the environment to nodes mapping.
///
/// Keys iterate in first-insertion order and each key keeps its nodes in
/// insertion order. A snapshot may be empty or lack any given key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    order: Vec<ShardInfo>,
    entries: HashMap<ShardInfo, Vec<ServiceNode>>,
}

impl RegistrySnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot by grouping each node under its own shard.
    pub fn from_nodes(nodes: impl IntoIterator<Item = ServiceNode>) -> Self {
        let mut snapshot = Self::new();
        for node in nodes {
            let shard = node.shard().clone();
            snapshot.insert(shard, node);
        }
        snapshot
    }

    /// Appends a node under `shard`.
    pub fn insert(&mut self, shard: ShardInfo, node: ServiceNode) {
        match self.entries.get_mut(&shard) {
            Some(nodes) => nodes.push(node),
            None => {
                self.order.push(shard.clone());
                self.entries.insert(shard, vec![node]);
            },
        }
    }

    /// Returns the nodes registered under `shard`, if the key is present.
    #[must_use]
    pub fn get(&self, shard: &ShardInfo) -> Option<&[ServiceNode]> {
        self.entries.get(shard).map(Vec::as_slice)
    }

    /// Iterates over `(shard, nodes)` pairs in key insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ShardInfo, &[ServiceNode])> {
        self.order
            .iter()
            .filter_map(|shard| self.entries.get(shard).map(|nodes| (shard, nodes.as_slice())))
    }

    /// Returns the shard keys in insertion order.
    pub fn shards(&self) -> impl Iterator<Item = &ShardInfo> {
        self.order.iter()
    }

    /// Returns the total number of nodes across all keys.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Returns whether the snapshot holds no nodes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }
}

impl FromIterator<(ShardInfo, ServiceNode)> for RegistrySnapshot {
    fn from_iter<I: IntoIterator<Item = (ShardInfo, ServiceNode)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (shard, node) in iter {
            snapshot.insert(shard, node);
        }
        snapshot
    }
}

/// The live registry for one service.
///
/// Cloning shares the underlying snapshot slot. Readers take an `Arc` to the
/// current snapshot; writers swap in a new one.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    service_name: Arc<str>,
    namespace: Arc<str>,
    current: Arc<RwLock<Arc<RegistrySnapshot>>>,
}

impl ServiceRegistry {
    /// Creates a registry with an empty snapshot.
    #[must_use]
    pub fn new(namespace: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            service_name: Arc::from(service_name.into()),
            namespace: Arc::from(namespace.into()),
            current: Arc::new(RwLock::new(Arc::new(RegistrySnapshot::new()))),
        }
    }

    /// Returns the service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns the namespace the service is registered in.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn nodes(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&*self.current.read())
    }

    /// Replaces the current snapshot.
    pub fn replace(&self, snapshot: RegistrySnapshot) {
        *self.current.write() = Arc::new(snapshot);
    }
}
