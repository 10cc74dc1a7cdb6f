//! Matrix fixture runner.
//!
//! Collects the fixture's module against its inventory and verifies the
//! result against the fixture's expectations and the matrix invariants.

use anyhow::Result;
use core::ptr;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use testgen_core::{
    CandidateSet, CollectionStatus, MatrixGenerator, ModuleCollection, ParametrizedCases,
    ProviderRecord, collect_module,
};

use super::fixture::MatrixFixture;
use super::fixture_loader;
use super::verification_result::VerificationResult;

/// Runs one matrix fixture.
pub struct FixtureRunner {
    fixture: MatrixFixture,
}

impl FixtureRunner {
    /// Create a runner for a loaded fixture
    #[must_use]
    pub const fn new(fixture: MatrixFixture) -> Self {
        Self { fixture }
    }

    /// Load a fixture from disk
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load_fixture(path: &Path) -> Result<MatrixFixture> {
        fixture_loader::load_fixture(path)
    }

    /// Discover every fixture below `dir`
    ///
    /// # Errors
    /// Returns error if directory reading fails
    pub fn discover_fixtures(dir: &Path) -> Result<Vec<PathBuf>> {
        fixture_loader::discover_fixtures(dir)
    }

    /// The fixture being run
    pub const fn fixture(&self) -> &MatrixFixture {
        &self.fixture
    }

    /// Collect the module and verify everything the fixture states.
    pub fn run(&self) -> VerificationResult {
        let fixture = &self.fixture;
        tracing::debug!(fixture = %fixture.name, "running matrix fixture");

        let collection = collect_module(&fixture.module, &fixture.inventory);
        let mut result = self.verify_status(&collection);
        for cases in &collection.cases {
            result.merge(self.verify_cases(cases));
        }
        if !collection.status.is_failure() {
            result.merge(self.verify_exclusions(&collection));
        }
        result.merge(self.verify_idempotent(&collection));
        result
    }

    fn candidates(&self) -> CandidateSet<'_> {
        let module = &self.fixture.module;
        MatrixGenerator::new(module.required_fields.clone())
            .with_selector(module.selector.clone())
            .candidates(&self.fixture.inventory)
    }

    fn inventory_position(&self, provider: &ProviderRecord) -> Option<usize> {
        self.fixture
            .inventory
            .iter()
            .position(|candidate| ptr::eq(candidate, provider))
    }

    fn verify_status(&self, collection: &ModuleCollection<'_>) -> VerificationResult {
        let expect = &self.fixture.expect;
        let mut result = VerificationResult::new();

        result.check(
            expect.status.matches(&collection.status),
            format!("status is {:?} (got {:?})", expect.status, collection.status),
        );

        if let Some(fragment) = &expect.reason_contains {
            match &collection.status {
                CollectionStatus::Failed { reason } => result.check(
                    reason.contains(fragment.as_str()),
                    format!("failure reason '{reason}' contains '{fragment}'"),
                ),
                other => result.add_failure(format!("expected a failure, got {other:?}")),
            }
        }

        if !collection.status.is_failure() {
            result.expect_eq(
                "one parametrization per test",
                &self.fixture.module.tests.len(),
                &collection.cases.len(),
            );
        }
        result
    }

    fn verify_cases(&self, cases: &ParametrizedCases<'_>) -> VerificationResult {
        let module = &self.fixture.module;
        let expect = &self.fixture.expect;
        let test = cases.test();
        let mut result = VerificationResult::new();

        let names: Vec<&str> = cases
            .bindings()
            .iter()
            .map(|binding| binding.provider.name.as_str())
            .collect();
        let ids = cases.ids();

        if let Some(eligible) = &expect.eligible {
            let expected: Vec<&str> = eligible.iter().map(String::as_str).collect();
            result.expect_eq(&format!("{test} eligible"), &expected, &names);
        }
        if let Some(expected_ids) = &expect.ids {
            let expected: Vec<&str> = expected_ids.iter().map(String::as_str).collect();
            result.expect_eq(&format!("{test} ids"), &expected, &ids);
        }
        if let Some(argnames) = &expect.argnames {
            result.expect_eq(&format!("{test} argnames"), argnames.as_slice(), cases.argnames());
        }
        if let Some(scope) = &expect.scope {
            result.expect_eq(&format!("{test} scope"), scope, &cases.scope());
        }

        let unique: HashSet<&str> = ids.iter().copied().collect();
        result.check(
            unique.len() == ids.len(),
            format!("{test} ids are unique: {ids:?}"),
        );

        let positions: Vec<Option<usize>> = cases
            .bindings()
            .iter()
            .map(|binding| self.inventory_position(binding.provider))
            .collect();
        result.check(
            positions.iter().all(Option::is_some)
                && positions.windows(2).all(|pair| pair[0] < pair[1]),
            format!("{test} keeps inventory order: {positions:?}"),
        );

        for binding in cases.bindings() {
            let provider = binding.provider;
            let unmet = module.required_fields.first_unmet(provider);
            result.check(
                unmet.is_none(),
                format!("{} satisfies every required path", binding.case_name()),
            );
            result.check(
                module.selector.matches(provider),
                format!("{} matches {}", binding.case_name(), module.selector.description()),
            );
        }
        result
    }

    fn verify_exclusions(&self, collection: &ModuleCollection<'_>) -> VerificationResult {
        let expect = &self.fixture.expect;
        let candidates = self.candidates();
        let mut result = VerificationResult::new();

        let excluded: Vec<&str> = candidates
            .excluded()
            .map(|candidate| candidate.provider.name.as_str())
            .collect();
        if let Some(expected_excluded) = &expect.excluded {
            let expected: Vec<&str> = expected_excluded.iter().map(String::as_str).collect();
            result.expect_eq("excluded", &expected, &excluded);
        }

        if self.fixture.module.filter.is_none() {
            let eligible = candidates.len() - excluded.len();
            for cases in &collection.cases {
                result.expect_eq(
                    &format!("{} binds every eligible provider", cases.test()),
                    &eligible,
                    &cases.len(),
                );
            }
        }
        result
    }

    fn verify_idempotent(&self, first: &ModuleCollection<'_>) -> VerificationResult {
        let second = collect_module(&self.fixture.module, &self.fixture.inventory);
        let mut result = VerificationResult::new();
        result.expect_eq("repeat status", &first.status, &second.status);

        let first_ids: Vec<Vec<&str>> = first.cases.iter().map(ParametrizedCases::ids).collect();
        let second_ids: Vec<Vec<&str>> = second.cases.iter().map(ParametrizedCases::ids).collect();
        result.expect_eq("repeat ids", &first_ids, &second_ids);
        result
    }
}
