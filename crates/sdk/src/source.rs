//! Registry sources: where snapshots come from.
//!
//! The watch protocol that keeps a production registry fresh lives outside this
//! crate. A [`RegistrySource`] is the narrow seam it plugs into: something that
//! can produce a complete [`RegistrySnapshot`] on demand and, optionally, says
//! how often it should be polled.
//!
//! Two sources ship with the crate:
//! - [`StaticSource`]: a fixed node list (tests, local development)
//! - [`FileSource`]: a JSON node manifest re-read on an interval

use std::{
    fmt,
    path::PathBuf,
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use serde::Deserialize;
use snafu::ResultExt;

use crate::{
    error::{FileParseSnafu, FileReadSnafu, SourceError},
    registry::RegistrySnapshot,
    shard::{ServiceNode, ShardInfo},
};

/// Default manifest refresh interval (60 seconds).
pub const DEFAULT_FILE_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// A producer of registry snapshots.
#[async_trait]
pub trait RegistrySource: Send + Sync + fmt::Debug {
    /// Loads a complete snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the backing store cannot be read or parsed.
    async fn fetch(&self) -> Result<RegistrySnapshot, SourceError>;

    /// Returns how often the snapshot should be re-fetched, or `None` if the
    /// source never changes.
    fn refresh_interval(&self) -> Option<Duration> {
        None
    }

    /// Human-readable description used in logs.
    fn describe(&self) -> String;
}

/// A source backed by a fixed list of nodes.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    nodes: Vec<ServiceNode>,
}

impl StaticSource {
    /// Creates a static source from nodes.
    pub fn new(nodes: impl IntoIterator<Item = ServiceNode>) -> Self {
        Self { nodes: nodes.into_iter().collect() }
    }

    /// Returns the configured nodes.
    #[must_use]
    pub fn nodes(&self) -> &[ServiceNode] {
        &self.nodes
    }
}

#[async_trait]
impl RegistrySource for StaticSource {
    async fn fetch(&self) -> Result<RegistrySnapshot, SourceError> {
        Ok(RegistrySnapshot::from_nodes(self.nodes.iter().cloned()))
    }

    fn describe(&self) -> String {
        format!("static list of {} nodes", self.nodes.len())
    }
}

/// Configuration for a manifest-file source.
#[derive(Debug, Clone, bon::Builder)]
#[builder(derive(Debug))]
pub struct FileSource {
    /// Path to the node manifest JSON file.
    #[builder(into)]
    path: PathBuf,

    /// How often to re-read the file.
    #[builder(default = DEFAULT_FILE_REFRESH_INTERVAL)]
    refresh_interval: Duration,
}

impl FileSource {
    /// Returns the manifest path.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// Node manifest JSON format.
///
/// ```json
/// {"nodes": [{"host": "10.0.0.1", "port": 8080, "environment": "prod"}]}
/// ```
#[derive(Debug, Deserialize)]
struct NodeManifest {
    #[serde(default)]
    nodes: Vec<ManifestEntry>,
}

/// A node entry in the manifest.
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    host: String,
    port: u16,
    environment: String,
}

impl From<ManifestEntry> for ServiceNode {
    fn from(entry: ManifestEntry) -> Self {
        ServiceNode::new(entry.host, entry.port, ShardInfo::new(entry.environment))
    }
}

#[async_trait]
impl RegistrySource for FileSource {
    async fn fetch(&self) -> Result<RegistrySnapshot, SourceError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .context(FileReadSnafu { path: self.path.clone() })?;

        let manifest: NodeManifest =
            serde_json::from_str(&content).context(FileParseSnafu { path: self.path.clone() })?;

        let fetched_at = SystemTime::now();
        Ok(RegistrySnapshot::from_nodes(
            manifest
                .nodes
                .into_iter()
                .map(|entry| ServiceNode::from(entry).with_last_updated(fetched_at)),
        ))
    }

    fn refresh_interval(&self) -> Option<Duration> {
        Some(self.refresh_interval)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
