//! Resolution metrics.
//!
//! A pluggable [`ResolverMetrics`] trait with two implementations:
//!
//! - [`NoopResolverMetrics`]: discards everything (the default)
//! - [`MetricsResolverMetrics`]: forwards to the [`metrics`](https://docs.rs/metrics) facade
//!
//! # Metric Names
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `shardgate_resolutions_total` | Counter | `service`, `outcome` | Resolution attempts by outcome |

use std::{fmt, sync::Arc};

/// How a single resolution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// A node was found in the first environment tried.
    Resolved,
    /// The requested environment was empty; a node was found in the default environment.
    DefaultEnvironment,
    /// No node was found; the static fallback address was used.
    FallbackAddress,
    /// No node was found and nothing could stand in for one.
    NoNodes,
}

impl fmt::Display for ResolutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved => write!(f, "resolved"),
            Self::DefaultEnvironment => write!(f, "default_environment"),
            Self::FallbackAddress => write!(f, "fallback_address"),
            Self::NoNodes => write!(f, "no_nodes"),
        }
    }
}

/// Trait for resolution metrics collection.
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// clone of a target.
pub trait ResolverMetrics: Send + Sync + fmt::Debug {
    /// Records the outcome of one `apply` or `url` call.
    fn record_resolution(&self, service: &str, outcome: ResolutionOutcome) {
        let _ = (service, outcome);
    }
}

/// No-op metrics implementation.
#[derive(Debug, Clone, Copy)]
pub struct NoopResolverMetrics;

impl ResolverMetrics for NoopResolverMetrics {}

/// Metrics implementation using the `metrics` crate facade.
///
/// Forwards to whatever `metrics::Recorder` is installed in the process.
#[derive(Debug, Clone, Copy)]
pub struct MetricsResolverMetrics;

mod metric_names {
    /// Resolution attempts by outcome.
    pub const RESOLUTIONS_TOTAL: &str = "shardgate_resolutions_total";
}

impl ResolverMetrics for MetricsResolverMetrics {
    fn record_resolution(&self, service: &str, outcome: ResolutionOutcome) {
        metrics::counter!(
            metric_names::RESOLUTIONS_TOTAL,
            "service" => service.to_owned(),
            "outcome" => outcome.to_string(),
        )
        .increment(1);
    }
}

/// Creates the default metrics instance (no-op).
pub(crate) fn default_metrics() -> Arc<dyn ResolverMetrics> {
    Arc::new(NoopResolverMetrics)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(ResolutionOutcome::Resolved.to_string(), "resolved");
        assert_eq!(ResolutionOutcome::DefaultEnvironment.to_string(), "default_environment");
        assert_eq!(ResolutionOutcome::FallbackAddress.to_string(), "fallback_address");
        assert_eq!(ResolutionOutcome::NoNodes.to_string(), "no_nodes");
    }

    #[test]
    fn test_noop_is_default() {
        let metrics = default_metrics();
        metrics.record_resolution("billing", ResolutionOutcome::Resolved);
    }

    #[test]
    fn test_metrics_facade_does_not_panic_without_recorder() {
        let metrics = MetricsResolverMetrics;
        metrics.record_resolution("billing", ResolutionOutcome::NoNodes);
        metrics.record_resolution("billing", ResolutionOutcome::FallbackAddress);
    }

    #[test]
    fn test_metrics_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoopResolverMetrics>();
        assert_send_sync::<MetricsResolverMetrics>();
        assert_send_sync::<Arc<dyn ResolverMetrics>>();
    }
}
