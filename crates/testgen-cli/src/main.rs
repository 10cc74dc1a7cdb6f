//! testgen - capability-driven provider test matrices from the command line
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

use anyhow::{Context as _, Result};
use clap::Parser as _;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use cli::{Cli, Commands};
use testgen_core::TestgenConfig;

mod cli;
mod handlers;

/// Filter used when neither `RUST_LOG` nor the configuration sets one.
const DEFAULT_LOG_FILTER: &str = "testgen_core=info,testgen=info";

/// Installs the stderr subscriber; `RUST_LOG` wins over the configured filter.
fn init_logging(config: &TestgenConfig) {
    let fallback = config
        .log_filter
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config =
        TestgenConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config);

    match cli.command {
        Commands::Matrix(args) => handlers::handle_matrix(&args, &config),
        Commands::Collect(args) => handlers::handle_collect(&args, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use clap::CommandFactory as _;
    use clap::error::ErrorKind;
    use testgen_core::{FixtureScope, ProviderCategory};

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_matrix_flags() {
        let cli = Cli::try_parse_from([
            "testgen",
            "matrix",
            "-i",
            "inventory.toml",
            "-r",
            "iso_datastore",
            "-r",
            "provisioning.host",
            "--category",
            "infra",
            "--scope",
            "module",
            "--format",
            "text",
        ])
        .unwrap();

        let Commands::Matrix(args) = cli.command else {
            panic!("expected matrix subcommand");
        };
        assert_eq!(args.requires.len(), 2);
        assert_eq!(args.requires[1].segments(), ["provisioning", "host"]);
        assert_eq!(args.categories, [ProviderCategory::Infra]);
        assert_eq!(args.scope, Some(FixtureScope::Module));
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.test, "test");
    }

    #[test]
    fn test_rejects_unknown_category() {
        let error = Cli::try_parse_from(["testgen", "matrix", "--category", "mainframe"])
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_rejects_empty_requirement_segment() {
        let error = Cli::try_parse_from(["testgen", "matrix", "-r", "provisioning..host"])
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ValueValidation);
    }
}
