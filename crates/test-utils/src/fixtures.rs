//! Node and configuration fixtures shared by integration tests.

// Fixture helpers are expected to panic on invalid input
#![allow(clippy::expect_used)]

use std::path::PathBuf;

use serde_json::json;
use shardgate_sdk::{ServiceNode, ShardInfo, TargetConfig};

use crate::TestDir;

/// Service name used by fixture configurations.
pub const TEST_SERVICE: &str = "billing";

/// Header used by [`header_routed_config`].
pub const TEST_ENV_HEADER: &str = "X-Env";

/// Creates a node in `environment`.
#[must_use]
pub fn node(host: &str, port: u16, environment: &str) -> ServiceNode {
    ServiceNode::new(host, port, ShardInfo::new(environment))
}

/// Two nodes on one host split across environments `y` (port 8888) and
/// `x` (port 9999), in that order.
#[must_use]
pub fn two_environment_nodes() -> Vec<ServiceNode> {
    vec![node("host1", 8888, "y"), node("host1", 9999, "x")]
}

/// Renders `nodes` in the JSON manifest format read by `FileSource`.
#[must_use]
pub fn manifest_json(nodes: &[ServiceNode]) -> String {
    let entries: Vec<_> = nodes
        .iter()
        .map(|node| {
            json!({
                "host": node.host(),
                "port": node.port(),
                "environment": node.shard().environment(),
            })
        })
        .collect();
    json!({ "nodes": entries }).to_string()
}

/// Writes `nodes` as `nodes.json` inside `dir` and returns the path.
pub fn write_manifest(dir: &TestDir, nodes: &[ServiceNode]) -> PathBuf {
    dir.write("nodes.json", manifest_json(nodes))
}

/// Configuration routed by the [`TEST_ENV_HEADER`] header, spanning all
/// environments and defaulting to `default_environment`.
///
/// # Panics
///
/// Panics if `default_environment` is empty.
#[must_use]
pub fn header_routed_config(default_environment: &str, secure: bool) -> TargetConfig {
    TargetConfig::builder()
        .with_service(TEST_SERVICE)
        .with_environment("*")
        .with_default_environment(default_environment)
        .with_env_header(TEST_ENV_HEADER)
        .with_secure(secure)
        .build()
        .expect("fixture config is valid")
}
