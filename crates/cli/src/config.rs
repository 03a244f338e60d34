//! Command-line arguments and settings loading.
//!
//! Settings come from a TOML file (`--config`, or `shardgate.toml` /
//! `/etc/shardgate/config.toml` when present) overlaid with `SHARDGATE__`
//! environment variables. Nested keys use `__`:
//!
//! ```bash
//! SHARDGATE__SERVICE=billing \
//! SHARDGATE__ENVIRONMENT=prod \
//! SHARDGATE__SOURCE__TYPE=file \
//! SHARDGATE__SOURCE__PATH=/etc/shardgate/nodes.json \
//! shardgate url
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use http::Method;
use shardgate_sdk::TargetSettings;
use snafu::{ResultExt, Snafu};

/// Errors raised while loading settings.
#[derive(Debug, Snafu)]
pub enum SettingsError {
    /// A configuration source could not be read.
    #[snafu(display("Failed to load configuration: {source}"))]
    Load {
        /// Underlying loader error.
        source: ::config::ConfigError,
    },

    /// The merged configuration does not describe a target.
    #[snafu(display("Invalid configuration: {source}"))]
    Parse {
        /// Underlying deserialization error.
        source: ::config::ConfigError,
    },
}

/// Resolve service targets from the command line.
#[derive(Debug, Parser)]
#[command(name = "shardgate")]
#[command(about = "Resolve environment-aware service targets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the target settings file
    #[arg(short, long, global = true, env = "SHARDGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "auto")]
    pub log_format: LogFormat,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the base URL of a node in the default environment
    Url,

    /// Address a request at a node and print the resulting URL
    Resolve {
        /// Request path and query
        #[arg(short, long)]
        path: String,

        /// Request method
        #[arg(short, long, default_value = "GET", value_parser = parse_method)]
        method: Method,

        /// Request header as NAME=VALUE (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },

    /// List the nodes selected for an environment
    Nodes {
        /// Environment to list ("*" for all); defaults to the configured environment
        #[arg(short, long)]
        environment: Option<String>,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// JSON when stderr is not a terminal, text otherwise
    Auto,
    /// Human-readable text
    Text,
    /// JSON structured logging
    Json,
}

fn parse_method(value: &str) -> Result<Method, String> {
    Method::from_bytes(value.to_ascii_uppercase().as_bytes())
        .map_err(|e| format!("invalid method '{value}': {e}"))
}

fn parse_header(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_owned(), value.trim().to_owned()))
        },
        _ => Err(format!("expected NAME=VALUE, got '{value}'")),
    }
}

/// Loads target settings from `path` (or the default locations) and the environment.
pub fn load_settings(path: Option<&Path>) -> Result<TargetSettings, SettingsError> {
    let builder = ::config::Config::builder();

    let builder = match path {
        Some(path) => builder.add_source(::config::File::from(path)),
        None => builder
            .add_source(::config::File::with_name("shardgate").required(false))
            .add_source(::config::File::with_name("/etc/shardgate/config").required(false)),
    };

    let builder = builder.add_source(
        ::config::Environment::with_prefix("SHARDGATE").separator("__").try_parsing(true),
    );

    builder.build().context(LoadSnafu)?.try_deserialize().context(ParseSnafu)
}
