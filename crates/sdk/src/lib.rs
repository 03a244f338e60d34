//! Environment-aware service target resolution.
//!
//! A caller holds a [`ServiceTarget`] per logical service. Each outgoing request
//! is addressed at a live node chosen from a registry of service instances
//! partitioned by deployment environment, with the environment selected by a
//! request header when one is configured.
//!
//! # Features
//!
//! - **Environment shards**: nodes are grouped by [`ShardInfo`]; `"*"` spans them all
//! - **Header routing**: a request header selects the environment, with a single
//!   retry against the default environment
//! - **Lock-free reads**: lookups clone the current snapshot and never wait on I/O
//! - **Pluggable seams**: [`RegistrySource`], [`ShardSelector`], [`NodePicker`],
//!   [`OutgoingRequest`] and [`ResolverMetrics`] are traits
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use http::Method;
//! use shardgate_sdk::{RequestTemplate, ServiceTarget, StaticSource, TargetConfig};
//!
//! trait BillingApi {}
//!
//! #[tokio::main]
//! async fn main() -> shardgate_sdk::Result<()> {
//!     let config = TargetConfig::builder()
//!         .with_service("billing")
//!         .with_environment("*")
//!         .with_default_environment("prod")
//!         .with_env_header("X-Env")
//!         .build()?;
//!
//!     let target: ServiceTarget<dyn BillingApi> =
//!         ServiceTarget::connect(config, Arc::new(StaticSource::new(nodes))).await?;
//!
//!     let request = RequestTemplate::new(Method::GET, "/invoices").with_header("X-Env", "staging");
//!     let prepared = target.apply(request)?;
//!     println!("{prepared}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ServiceTarget (Public API)                 │
//! │   .apply(request) │ .url() │ .shutdown()                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    DiscoveryClient                          │
//! │   .start() │ .get_node() │ .get_node_in(environment)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │          ShardSelector          │        NodePicker         │
//! │   exact environment │ wildcard  │   round robin │ random    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    ServiceRegistry                          │
//! │   ShardInfo → [ServiceNode] snapshot, swapped atomically    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    RegistrySource                           │
//! │   StaticSource │ FileSource │ external watch adapters       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod metrics;
mod picker;
mod registry;
mod request;
mod selector;
mod shard;
mod source;
mod target;

// Public API exports
pub use client::DiscoveryClient;
pub use config::{NodeSettings, SourceSettings, TargetConfig, TargetConfigBuilder, TargetSettings};
pub use error::{Error, Result, SourceError};
pub use metrics::{MetricsResolverMetrics, NoopResolverMetrics, ResolutionOutcome, ResolverMetrics};
pub use picker::{NodePicker, RandomPicker, RoundRobinPicker};
pub use registry::{RegistrySnapshot, ServiceRegistry};
pub use request::{OutgoingRequest, PreparedRequest, RequestTemplate};
pub use selector::{EnvironmentAwareShardSelector, ShardSelector, select};
pub use shard::{ALL_ENVIRONMENTS, ServiceNode, ShardInfo};
pub use source::{DEFAULT_FILE_REFRESH_INTERVAL, FileSource, RegistrySource, StaticSource};
pub use target::ServiceTarget;
