//! Error types for discovery and target resolution.
//!
//! Two tiers, mirroring where a failure originates:
//! - **Source errors** ([`SourceError`]): a registry source could not produce a snapshot
//! - **Resolution errors** ([`Error`]): discovery never started, configuration is invalid, or no
//!   node could be found for a request
//!
//! Nothing in this crate retries internally. [`Error::is_retryable`] tells the caller whether a
//! later attempt (against a fresher snapshot) can succeed.

use std::path::PathBuf;

use snafu::{Location, Snafu};

/// Result type alias for resolution operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while loading a registry snapshot from a source.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// Node manifest could not be read.
    #[snafu(display("Failed to read node manifest from {}: {source}", path.display()))]
    FileRead {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Node manifest is not valid JSON or does not match the manifest schema.
    #[snafu(display("Failed to parse node manifest from {}: {source}", path.display()))]
    FileParse {
        /// Manifest path.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
}

/// Errors surfaced by the discovery client and the target resolver.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// No candidate node exists for any attempted environment.
    #[snafu(display("No service nodes found for {service}{}", describe_environment(environment)))]
    NoNodesFound {
        /// Logical service name.
        service: String,
        /// Last environment that was queried, when known.
        environment: Option<String>,
    },

    /// The discovery client could not load its first registry snapshot.
    #[snafu(display("Failed to start service discovery for {service} at {location}: {source}"))]
    DiscoveryStart {
        /// Logical service name.
        service: String,
        /// Source failure.
        source: SourceError,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Configuration validation error.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// A resolved base URL could not be applied to a request.
    #[snafu(display("Invalid URL '{url}': {message}"))]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Description of the problem.
        message: String,
    },
}

fn describe_environment(environment: &Option<String>) -> String {
    match environment {
        Some(environment) => format!(" in environment '{environment}'"),
        None => String::new(),
    }
}

impl Error {
    /// Returns true if a later attempt may succeed without configuration changes.
    ///
    /// Retryable errors:
    /// - `NoNodesFound`: the registry may gain nodes before the next attempt
    /// - `DiscoveryStart`: the registry source may become reachable
    ///
    /// Non-retryable errors:
    /// - `Config`: the configuration must be fixed
    /// - `InvalidUrl`: the request or the node metadata is malformed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NoNodesFound { .. } => true,
            Self::DiscoveryStart { .. } => true,
            Self::Config { .. } => false,
            Self::InvalidUrl { .. } => false,
        }
    }

    /// Returns the service name attached to this error, if any.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::NoNodesFound { service, .. } | Self::DiscoveryStart { service, .. } => {
                Some(service)
            },
            Self::Config { .. } | Self::InvalidUrl { .. } => None,
        }
    }
}
