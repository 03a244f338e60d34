//! shardgate command-line resolver.
//!
//! Starts a service target from settings, resolves once and exits.
//!
//! # Usage
//!
//! ```bash
//! # Base URL in the default environment (falls back to the static address)
//! shardgate --config billing.toml url
//!
//! # Address a request the way a client would
//! shardgate --config billing.toml resolve --path /invoices -H X-Env=staging
//!
//! # Inspect the registry
//! shardgate --config billing.toml nodes --environment '*'
//! ```

mod config;

use std::{
    io::{IsTerminal, Write},
    process::ExitCode,
};

use clap::Parser;
use shardgate_sdk::{RequestTemplate, ServiceTarget};
use snafu::{ResultExt, Snafu};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Cli, Command, LogFormat, SettingsError};

/// Marker for targets driven from the command line.
enum Remote {}

/// Top-level error type for the CLI.
#[derive(Debug, Snafu)]
enum CliError {
    #[snafu(display("{source}"))]
    Settings { source: SettingsError },

    #[snafu(display("{source}"))]
    Target { source: shardgate_sdk::Error },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    report(run(cli).await, &mut std::io::stderr())
}

/// Writes a failure to `err` once and maps the outcome to an exit code.
fn report(result: Result<(), CliError>, err: &mut impl Write) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = writeln!(err, "error: {e}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = config::load_settings(cli.config.as_deref()).context(SettingsSnafu)?;
    let target = ServiceTarget::<Remote>::from_settings(&settings).await.context(TargetSnafu)?;

    let result = execute(&target, cli.command);
    target.shutdown();
    result.context(TargetSnafu)
}

fn execute(target: &ServiceTarget<Remote>, command: Command) -> shardgate_sdk::Result<()> {
    match command {
        Command::Url => {
            println!("{}", target.url()?);
        },
        Command::Resolve { path, method, headers } => {
            let request = headers
                .into_iter()
                .fold(RequestTemplate::new(method, path), |request, (name, value)| {
                    request.with_header(name, value)
                });
            let prepared = target.apply(request)?;
            tracing::debug!(request = %prepared, "Resolved request");
            println!("{}", prepared.url);
        },
        Command::Nodes { environment } => {
            let environment =
                environment.unwrap_or_else(|| target.config().environment().to_owned());
            let secure = target.config().secure();
            for node in target.client().nodes_in(&environment) {
                println!("{}\t{}", node.shard(), node.endpoint(secure));
            }
        },
    }
    Ok(())
}

/// Initializes logging on stderr so stdout carries only results.
///
/// - `Text`: Human-readable format
/// - `Json`: JSON structured logging
/// - `Auto`: JSON for non-TTY stderr, text otherwise
fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stderr().is_terminal(),
    };

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_report_success_writes_nothing() {
        let mut err = Vec::new();

        assert_eq!(report(Ok(()), &mut err), ExitCode::SUCCESS);
        assert!(err.is_empty());
    }

    #[test]
    fn test_report_failure_writes_single_line() {
        let failure = shardgate_sdk::Error::NoNodesFound {
            service: "billing".to_owned(),
            environment: Some("prod".to_owned()),
        };
        let mut err = Vec::new();

        let code = report(Err(CliError::Target { source: failure }), &mut err);

        assert_eq!(code, ExitCode::FAILURE);
        let written = String::from_utf8(err).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert_eq!(
            written,
            "error: No service nodes found for billing in environment 'prod'\n"
        );
    }
}
