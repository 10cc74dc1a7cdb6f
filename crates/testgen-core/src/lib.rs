//! Capability-driven test matrix generation.
//!
//! Given an ordered inventory of provider records and a set of capability
//! paths a test module needs, this crate computes which providers the
//! module can run against and binds each test function to them:
//! - [`MatrixGenerator`] selects providers and excludes those missing a capability
//! - [`SecondaryFilter`] and [`ProviderPredicate`] narrow a matrix further
//! - [`TestBinder`] produces the argnames/argvalues/ids triple with unique ids
//! - [`collect_module`] runs the whole pipeline for a declared test module
//! - [`Harness`] executes bound cases with function- or module-scoped fixtures

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

/// Test binding and identifier allocation.
pub mod binding;
/// Capability values and path resolution.
pub mod capability;
/// Per-module collection of parametrized cases.
pub mod collection;
/// Tool configuration.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Secondary filters applied after matrix generation.
pub mod filter;
/// Fixture lifecycle and finalizers.
pub mod fixture;
/// Execution of bound cases.
pub mod harness;
/// Requirement filtering and matrix generation.
pub mod matrix;
/// Provider records and inventories.
pub mod provider;
/// Requirement paths.
pub mod requirement;
/// Provider class selection.
pub mod selector;
/// Loading documents from disk.
pub mod source;

pub use binding::{HarnessTriple, ParamValue, ParametrizedCases, TestBinder, TestBinding};
pub use capability::{CapabilityMap, CapabilityValue, Resolution};
pub use collection::{
    CollectionStatus, ModuleCollection, SuiteCollection, SuiteDocument, TestModuleSpec,
    collect_module, collect_suite,
};
pub use config::TestgenConfig;
pub use error::{Error, Result};
pub use filter::{ProviderPredicate, SecondaryFilter, TemplateRegistry, apply_secondary_filter};
pub use fixture::{Finalizers, Fixture, FixtureScope, ModuleContext, ScopedResource};
pub use harness::{CaseContext, CaseOutcome, CaseReport, Harness, RunReport};
pub use matrix::{
    Candidate, CandidateSet, EligibleSet, Exclusion, Matrix, MatrixGenerator, generate_matrix,
};
pub use provider::{Inventory, ProviderCategory, ProviderRecord};
pub use requirement::{RequirementPath, RequirementSet};
pub use selector::ProviderSelector;
pub use source::{DocumentFormat, load_document, load_inventory, load_suite};
