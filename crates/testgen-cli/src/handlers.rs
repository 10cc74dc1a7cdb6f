//! Subcommand handlers.

use anyhow::{Context as _, Result, anyhow};
use core::ptr;
use serde::Serialize;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use testgen_core::{
    CollectionStatus, HarnessTriple, Inventory, Matrix, MatrixGenerator, ParametrizedCases,
    ProviderSelector, SecondaryFilter, SuiteDocument, TestBinder, TestgenConfig, collect_suite,
    load_inventory, load_suite,
};

use crate::cli::{CollectArgs, MatrixArgs, OutputFormat};

/// Exit code when at least one module could not be collected.
const EXIT_COLLECTION_FAILED: u8 = 2;

/// A provider left out of the matrix and why.
#[derive(Debug, Serialize)]
struct ExcludedProvider<'inv> {
    provider: &'inv str,
    reason: String,
}

/// JSON shape of `testgen matrix`.
#[derive(Debug, Serialize)]
struct MatrixReport<'rep, 'inv> {
    #[serde(flatten)]
    triple: HarnessTriple<'rep, 'inv>,
    excluded: &'rep [ExcludedProvider<'inv>],
}

/// Picks the command-line path, falling back to the configured one.
fn resolve_path(
    flag: Option<&PathBuf>,
    configured: Option<&PathBuf>,
    what: &str,
) -> Result<PathBuf> {
    flag.or(configured)
        .cloned()
        .ok_or_else(|| anyhow!("No {what} given; pass --{what} or set it in testgen.toml"))
}

fn read_inventory(path: &Path) -> Result<Inventory> {
    load_inventory(path).with_context(|| format!("Failed to load inventory {}", path.display()))
}

fn read_suite(path: &Path) -> Result<SuiteDocument> {
    load_suite(path).with_context(|| format!("Failed to load suite {}", path.display()))
}

/// Applies `filter`, recording every provider it drops in `excluded`.
fn apply_filter<'inv>(
    filter: &SecondaryFilter,
    matrix: Matrix<'inv>,
    inventory: &Inventory,
    excluded: &mut Vec<ExcludedProvider<'inv>>,
) -> Matrix<'inv> {
    let kept = filter.apply(matrix.clone(), inventory);
    let reason = filter.to_string();
    excluded.extend(
        matrix
            .eligible()
            .providers()
            .iter()
            .copied()
            .filter(|provider| {
                !kept
                    .eligible()
                    .providers()
                    .iter()
                    .any(|survivor| ptr::eq(*survivor, *provider))
            })
            .map(|provider| ExcludedProvider {
                provider: &provider.name,
                reason: reason.clone(),
            }),
    );
    kept
}

fn write_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("Failed to write JSON output")?;
    writeln!(stdout)?;
    Ok(())
}

/// Runs `testgen matrix`.
///
/// # Errors
/// Returns an error if the inventory cannot be loaded or output fails.
pub fn handle_matrix(args: &MatrixArgs, config: &TestgenConfig) -> Result<ExitCode> {
    let inventory_path =
        resolve_path(args.inventory.as_ref(), config.inventory.as_ref(), "inventory")?;
    let inventory = read_inventory(&inventory_path)?;

    let selector = ProviderSelector::any()
        .with_categories(args.categories.iter().copied())
        .with_types(args.types.iter().cloned());
    let generator =
        MatrixGenerator::new(args.requires.iter().cloned().collect()).with_selector(selector);
    let candidates = generator.candidates(&inventory);
    let mut matrix = Matrix::from_eligible(candidates.eligible());
    let mut excluded: Vec<ExcludedProvider<'_>> = candidates
        .excluded()
        .filter_map(|candidate| {
            candidate.exclusion.as_ref().map(|exclusion| ExcludedProvider {
                provider: &candidate.provider.name,
                reason: exclusion.to_string(),
            })
        })
        .collect();

    if let Some(path) = &args.template_path {
        let table = args
            .template_table
            .clone()
            .unwrap_or_else(|| config.template_table.clone());
        let filter = SecondaryFilter::TemplateRegistered {
            path: path.clone(),
            table,
        };
        matrix = apply_filter(&filter, matrix, &inventory, &mut excluded);
    }
    if !args.excludes.is_empty() {
        let filter = SecondaryFilter::ExcludeNames {
            names: args.excludes.clone(),
        };
        matrix = apply_filter(&filter, matrix, &inventory, &mut excluded);
    }

    let cases = TestBinder::new(args.scope.unwrap_or(config.default_scope))
        .with_params(args.params.iter().cloned())
        .bind(&args.test, &matrix);
    tracing::info!(
        test = %args.test,
        cases = cases.len(),
        excluded = excluded.len(),
        "generated matrix"
    );

    match args.format {
        OutputFormat::Json => write_json(&MatrixReport {
            triple: cases.triple(),
            excluded: &excluded,
        })?,
        OutputFormat::Text => {
            let mut stdout = io::stdout().lock();
            for binding in cases.bindings() {
                writeln!(stdout, "{}", binding.case_name())?;
            }
            for provider in &excluded {
                writeln!(stdout, "excluded {}: {}", provider.provider, provider.reason)?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Runs `testgen collect`.
///
/// # Errors
/// Returns an error if an input cannot be loaded or output fails. Modules
/// that fail to collect are reported and turn into exit code 2.
pub fn handle_collect(args: &CollectArgs, config: &TestgenConfig) -> Result<ExitCode> {
    let inventory_path =
        resolve_path(args.inventory.as_ref(), config.inventory.as_ref(), "inventory")?;
    let suite_path = resolve_path(args.suite.as_ref(), config.suite.as_ref(), "suite")?;
    let inventory = read_inventory(&inventory_path)?;
    let suite = read_suite(&suite_path)?;

    let collection = collect_suite(&suite, &inventory);

    match args.format {
        OutputFormat::Json => write_json(&collection.summaries())?,
        OutputFormat::Text => {
            let mut stdout = io::stdout().lock();
            for module in &collection.modules {
                match &module.status {
                    CollectionStatus::Collected { cases } => {
                        writeln!(stdout, "{}: {cases} cases", module.module)?;
                    }
                    CollectionStatus::Empty => writeln!(stdout, "{}: empty", module.module)?,
                    CollectionStatus::Failed { reason } => {
                        writeln!(stdout, "{}: FAILED ({reason})", module.module)?;
                    }
                }
                for binding in module.cases.iter().flat_map(ParametrizedCases::bindings) {
                    writeln!(stdout, "  {}", binding.case_name())?;
                }
            }
        }
    }

    if collection.has_failures() {
        tracing::error!("one or more modules failed to collect");
        return Ok(ExitCode::from(EXIT_COLLECTION_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}
