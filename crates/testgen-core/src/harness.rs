//! Execution harness for bound test matrices.
//!
//! The harness walks the bindings of a test module, prepares the fixture for
//! each provider at the declared scope and runs the test body once per
//! binding. Outcomes are reported per case identifier; a failing setup only
//! affects the cases that needed it.

use core::fmt::Display;
use core::ptr;
use serde::Serialize;

use crate::binding::{ParametrizedCases, TestBinding};
use crate::fixture::{Finalizers, Fixture, FixtureScope, ModuleContext, ScopedResource};
use crate::provider::ProviderRecord;

/// Result of one test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum CaseOutcome {
    /// Body and finalizers succeeded
    Passed,
    /// Body or a finalizer failed
    Failed(String),
    /// The fixture could not be set up for this provider
    SetupFailed(String),
}

/// Outcome of one case together with its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    /// Test function name
    pub test: String,
    /// Case identifier within the test's matrix
    pub id: String,
    /// What happened
    pub outcome: CaseOutcome,
}

/// Outcomes of a harness run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Case outcomes in execution order
    pub cases: Vec<CaseReport>,
    /// Teardown failures, which do not change case outcomes
    pub teardown_errors: Vec<String>,
}

impl RunReport {
    /// Cases that passed.
    pub fn passed(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases
            .iter()
            .filter(|case| case.outcome == CaseOutcome::Passed)
    }

    /// Cases that failed, including setup failures.
    pub fn failed(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases
            .iter()
            .filter(|case| case.outcome != CaseOutcome::Passed)
    }

    /// Whether every case passed and every teardown succeeded.
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none() && self.teardown_errors.is_empty()
    }

    /// Outcome of a specific case.
    pub fn outcome(&self, test: &str, id: &str) -> Option<&CaseOutcome> {
        self.cases
            .iter()
            .find(|case| case.test == test && case.id == id)
            .map(|case| &case.outcome)
    }
}

/// What the test body sees for one case.
pub struct CaseContext<'ctx, 'inv, R> {
    /// The binding being executed
    pub binding: &'ctx TestBinding<'inv>,
    /// Fixture resource for the bound provider
    pub resource: &'ctx mut R,
    /// Cleanup registered by the body, run after it returns
    pub finalizers: &'ctx mut Finalizers,
}

impl<'inv, R> CaseContext<'_, 'inv, R> {
    /// The bound provider.
    pub fn provider(&self) -> &'inv ProviderRecord {
        self.binding.provider
    }
}

/// Runs bound cases inside their fixtures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Harness;

/// Bindings of every test that share one provider.
type ProviderGroup<'cases, 'inv> = (&'inv ProviderRecord, Vec<&'cases TestBinding<'inv>>);

impl Harness {
    /// Runs every binding of every test in `module`.
    ///
    /// Each test runs at its own fixture scope. Module-scoped tests run
    /// first: their fixture is set up once per provider, in order of the
    /// provider's first appearance, and shared by all of them. Function-scoped
    /// tests follow, with the fixture set up around each case.
    pub fn run<'inv, F, B, E>(
        module: &[ParametrizedCases<'inv>],
        fixture: &mut F,
        mut body: B,
    ) -> RunReport
    where
        F: Fixture,
        B: FnMut(&mut CaseContext<'_, 'inv, F::Resource>) -> Result<(), E>,
        E: Display,
    {
        let (shared, per_case): (Vec<_>, Vec<_>) = module
            .iter()
            .partition(|cases| cases.scope() == FixtureScope::Module);
        let mut report = RunReport::default();

        for (provider, bindings) in group_by_provider(&shared) {
            Self::run_module_scoped(provider, &bindings, fixture, &mut body, &mut report);
        }
        for (_, bindings) in group_by_provider(&per_case) {
            for binding in bindings {
                Self::run_function_scoped(binding, fixture, &mut body, &mut report);
            }
        }

        tracing::info!(
            passed = report.passed().count(),
            failed = report.failed().count(),
            "harness run finished"
        );
        report
    }

    /// One provider, one shared resource, many cases.
    fn run_module_scoped<'inv, F, B, E>(
        provider: &'inv ProviderRecord,
        bindings: &[&TestBinding<'inv>],
        fixture: &mut F,
        body: &mut B,
        report: &mut RunReport,
    ) where
        F: Fixture,
        B: FnMut(&mut CaseContext<'_, 'inv, F::Resource>) -> Result<(), E>,
        E: Display,
    {
        let mut context = match ModuleContext::open(fixture, provider) {
            Ok(context) => context,
            Err(error) => {
                tracing::warn!(provider = %provider.name, "module setup failed: {error}");
                for binding in bindings {
                    report.cases.push(setup_failed(binding, &error));
                }
                return;
            }
        };

        for binding in bindings {
            let outcome = run_case(binding, context.resource_mut(), body);
            report.cases.push(case_report(binding, outcome));
        }

        if let Err(error) = context.close() {
            report.teardown_errors.push(error.to_string());
        }
    }

    /// One case with its own resource.
    fn run_function_scoped<'inv, F, B, E>(
        binding: &TestBinding<'inv>,
        fixture: &mut F,
        body: &mut B,
        report: &mut RunReport,
    ) where
        F: Fixture,
        B: FnMut(&mut CaseContext<'_, 'inv, F::Resource>) -> Result<(), E>,
        E: Display,
    {
        let mut resource = match ScopedResource::acquire(fixture, binding.provider) {
            Ok(resource) => resource,
            Err(error) => {
                report.cases.push(setup_failed(binding, &error));
                return;
            }
        };
        let outcome = run_case(binding, &mut *resource, body);
        report.cases.push(case_report(binding, outcome));
        if let Err(error) = resource.release() {
            report.teardown_errors.push(error.to_string());
        }
    }
}

/// Groups bindings by provider identity, keeping first-appearance order.
fn group_by_provider<'cases, 'inv>(
    tests: &[&'cases ParametrizedCases<'inv>],
) -> Vec<ProviderGroup<'cases, 'inv>> {
    let mut groups: Vec<ProviderGroup<'cases, 'inv>> = Vec::new();
    for binding in tests.iter().copied().flat_map(ParametrizedCases::bindings) {
        if let Some((_, bindings)) = groups
            .iter_mut()
            .find(|(provider, _)| ptr::eq(*provider, binding.provider))
        {
            bindings.push(binding);
        } else {
            groups.push((binding.provider, vec![binding]));
        }
    }
    groups
}

/// Runs the body and its finalizers for one binding.
fn run_case<'inv, R, B, E>(
    binding: &TestBinding<'inv>,
    resource: &mut R,
    body: &mut B,
) -> CaseOutcome
where
    B: FnMut(&mut CaseContext<'_, 'inv, R>) -> Result<(), E>,
    E: Display,
{
    tracing::info!(case = %binding.case_name(), "running case");
    let mut finalizers = Finalizers::new();
    let result = body(&mut CaseContext {
        binding,
        resource,
        finalizers: &mut finalizers,
    });
    let cleanup_failures = finalizers.run();

    match result {
        Err(error) => CaseOutcome::Failed(error.to_string()),
        Ok(()) if cleanup_failures.is_empty() => CaseOutcome::Passed,
        Ok(()) => CaseOutcome::Failed(
            cleanup_failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        ),
    }
}

fn case_report(binding: &TestBinding<'_>, outcome: CaseOutcome) -> CaseReport {
    CaseReport {
        test: binding.test.clone(),
        id: binding.id.clone(),
        outcome,
    }
}

fn setup_failed(binding: &TestBinding<'_>, error: &impl Display) -> CaseReport {
    case_report(binding, CaseOutcome::SetupFailed(error.to_string()))
}
