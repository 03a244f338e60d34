//! Shared test utilities for shardgate crates.
//!
//! - [`TestDir`] - Managed temporary directory with atomic file writes
//! - [`assert_eventually`] - Poll a condition until it's true or timeout
//! - [`wait_for_node_count`] - Wait for a registry refresh to land
//! - [`fixtures`] - Canned nodes, manifests and target configurations

#![deny(unsafe_code)]

mod test_dir;
pub use test_dir::TestDir;

mod assertions;
pub use assertions::{assert_eventually, wait_for_node_count};

pub mod fixtures;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use shardgate_sdk::{RegistrySnapshot, ServiceRegistry};

    use super::{fixtures::*, *};

    // ============================================
    // TestDir tests
    // ============================================

    #[test]
    fn test_dir_creates_temp_directory() {
        let dir = TestDir::new();
        assert!(dir.path().is_dir(), "should be a directory");
    }

    #[test]
    fn test_dir_write_replaces_contents() {
        let dir = TestDir::new();
        let first = dir.write("nodes.json", "one");
        let second = dir.write("nodes.json", "two");

        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "two");
        assert!(!dir.join("nodes.tmp").exists(), "staging file should be renamed away");
    }

    #[test]
    fn test_dir_cleanup_on_drop() {
        let path = {
            let dir = TestDir::new();
            dir.write("nodes.json", "{}");
            dir.path().to_path_buf()
        };
        assert!(!path.exists(), "temp directory should be cleaned up on drop");
    }

    // ============================================
    // assert_eventually tests
    // ============================================

    #[tokio::test]
    async fn test_assert_eventually_delayed_success() {
        let counter = AtomicUsize::new(0);
        let result = assert_eventually(Duration::from_millis(500), || {
            counter.fetch_add(1, Ordering::SeqCst) >= 3
        })
        .await;
        assert!(result, "condition should eventually become true");
        assert!(counter.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test]
    async fn test_assert_eventually_timeout() {
        let result = assert_eventually(Duration::from_millis(50), || false).await;
        assert!(!result, "never-true condition should time out");
    }

    #[tokio::test]
    async fn test_wait_for_node_count() {
        let registry = ServiceRegistry::new("", TEST_SERVICE);
        let writer = registry.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            writer.replace(RegistrySnapshot::from_nodes(two_environment_nodes()));
        });

        assert!(wait_for_node_count(&registry, 2, Duration::from_millis(500)).await);
    }

    // ============================================
    // Fixture tests
    // ============================================

    #[test]
    fn test_manifest_json_shape() {
        let value: serde_json::Value =
            serde_json::from_str(&manifest_json(&two_environment_nodes())).unwrap();

        assert_eq!(value["nodes"][0]["host"], "host1");
        assert_eq!(value["nodes"][0]["port"], 8888);
        assert_eq!(value["nodes"][1]["environment"], "x");
    }

    #[test]
    fn test_header_routed_config() {
        let config = header_routed_config("prod", true);
        assert_eq!(config.service(), TEST_SERVICE);
        assert_eq!(config.env_header(), Some(TEST_ENV_HEADER));
        assert_eq!(config.effective_default_environment(), "prod");
        assert!(config.secure());
    }
}
