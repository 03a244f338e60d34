//! Polling assertions for refresh-driven state.
//!
//! Registry snapshots change on a background interval, so tests wait for a
//! condition instead of sleeping for a fixed time.

use std::time::Duration;

use shardgate_sdk::ServiceRegistry;
use tokio::time::{Instant, sleep};

/// Interval between condition checks.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls `condition` until it returns true or `timeout` expires.
///
/// Returns `true` if the condition held before (or at) the deadline.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use shardgate_test_utils::assert_eventually;
///
/// # async fn example(client: shardgate_sdk::DiscoveryClient) {
/// // Wait for the next manifest refresh to surface the staging node.
/// let found = assert_eventually(Duration::from_secs(2), || {
///     client.get_node_in("staging").is_some()
/// })
/// .await;
///
/// assert!(found, "staging node should appear after refresh");
/// # }
/// ```
pub async fn assert_eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(POLL_INTERVAL).await;
    }

    condition()
}

/// Waits until `registry` holds exactly `count` nodes across all environments.
pub async fn wait_for_node_count(
    registry: &ServiceRegistry,
    count: usize,
    timeout: Duration,
) -> bool {
    assert_eventually(timeout, || registry.nodes().node_count() == count).await
}
