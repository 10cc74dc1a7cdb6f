//! Command-line arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use testgen_core::{FixtureScope, ProviderCategory, RequirementPath};

/// Generate provider test matrices from capability requirements
#[derive(Debug, Parser)]
#[command(name = "testgen", version)]
pub struct Cli {
    /// Configuration file (defaults to ./testgen.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Bind one test to every provider that satisfies the requirements
    Matrix(MatrixArgs),
    /// Collect every module of a suite document
    Collect(CollectArgs),
}

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// One case per line
    Text,
}

/// Arguments of `testgen matrix`.
#[derive(Debug, Args)]
pub struct MatrixArgs {
    /// Provider inventory (JSON or TOML)
    #[arg(short, long, value_name = "FILE")]
    pub inventory: Option<PathBuf>,

    /// Required capability path, dotted for nested keys (repeatable)
    #[arg(short = 'r', long = "require", value_name = "PATH")]
    pub requires: Vec<RequirementPath>,

    /// Provider category to select (repeatable)
    #[arg(long = "category", value_name = "CATEGORY")]
    pub categories: Vec<ProviderCategory>,

    /// Provider type to select (repeatable)
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<String>,

    /// Keep only providers whose template at this path is registered
    #[arg(long, value_name = "PATH")]
    pub template_path: Option<RequirementPath>,

    /// Inventory table holding the template registry
    #[arg(long, value_name = "TABLE")]
    pub template_table: Option<String>,

    /// Provider name to drop from the matrix (repeatable)
    #[arg(long = "exclude", value_name = "NAME")]
    pub excludes: Vec<String>,

    /// Test function name used in case identifiers
    #[arg(long, default_value = "test")]
    pub test: String,

    /// Extra parameter bound from a top-level capability (repeatable)
    #[arg(long = "param", value_name = "NAME")]
    pub params: Vec<String>,

    /// Fixture scope of the parameters
    #[arg(long)]
    pub scope: Option<FixtureScope>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// Arguments of `testgen collect`.
#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Provider inventory (JSON or TOML)
    #[arg(short, long, value_name = "FILE")]
    pub inventory: Option<PathBuf>,

    /// Suite document listing test modules
    #[arg(short, long, value_name = "FILE")]
    pub suite: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}
