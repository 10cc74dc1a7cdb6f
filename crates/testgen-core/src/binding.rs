//! Test binding: pairing a test function with each eligible provider.
//!
//! The output is the classic parametrization triple (argument names, one
//! row of values per case, one identifier per case) plus the fixture scope
//! the harness should use for the parameters.

use serde::Serialize;
use std::collections::HashSet;

use crate::capability::CapabilityValue;
use crate::fixture::FixtureScope;
use crate::matrix::Matrix;
use crate::provider::ProviderRecord;

/// Name of the parameter that carries the provider itself.
pub const PROVIDER_ARGNAME: &str = "provider";

/// Identifier used for providers with an empty name.
const UNNAMED_ID: &str = "unnamed";

/// Hands out identifiers that are unique within one test's matrix.
///
/// The first use of a name gets the name itself; later uses get `name-1`,
/// `name-2`, ... skipping any suffix that is already taken.
#[derive(Debug, Default)]
pub struct IdAllocator {
    used: HashSet<String>,
}

impl IdAllocator {
    /// Creates an allocator with no identifiers taken.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an identifier derived from `base`.
    pub fn allocate(&mut self, base: &str) -> String {
        let base = if base.is_empty() { UNNAMED_ID } else { base };
        if self.used.insert(base.to_owned()) {
            return base.to_owned();
        }

        let mut counter = 1_usize;
        loop {
            let candidate = format!("{base}-{counter}");
            if self.used.insert(candidate.clone()) {
                tracing::debug!(base, id = %candidate, "disambiguated duplicate test id");
                return candidate;
            }
            counter += 1;
        }
    }
}

/// One parameter value in a case row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue<'inv> {
    /// The provider record
    Provider(&'inv ProviderRecord),
    /// A top-level capability of the provider, `None` when absent
    Capability(Option<&'inv CapabilityValue>),
}

/// A single (test, provider) pair with its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct TestBinding<'inv> {
    /// Test function name
    pub test: String,
    /// Unique identifier within the test's matrix
    pub id: String,
    /// Bound provider
    pub provider: &'inv ProviderRecord,
    /// Parameter values, parallel to the argnames
    pub values: Vec<ParamValue<'inv>>,
}

impl TestBinding<'_> {
    /// Fully qualified case name, `test[id]`.
    pub fn case_name(&self) -> String {
        format!("{}[{}]", self.test, self.id)
    }
}

/// Every binding generated for one test function.
#[derive(Debug, Clone, PartialEq)]
pub struct ParametrizedCases<'inv> {
    test: String,
    argnames: Vec<String>,
    bindings: Vec<TestBinding<'inv>>,
    scope: FixtureScope,
}

/// Serializable harness view of [`ParametrizedCases`].
#[derive(Debug, Serialize)]
pub struct HarnessTriple<'cases, 'inv> {
    /// Test function name
    pub test: &'cases str,
    /// Parameter names
    pub argnames: &'cases [String],
    /// One row of values per case
    pub argvalues: Vec<&'cases [ParamValue<'inv>]>,
    /// One identifier per case
    pub ids: Vec<&'cases str>,
    /// Fixture scope of the parameters
    pub scope: FixtureScope,
}

impl<'inv> ParametrizedCases<'inv> {
    /// Test function name.
    pub fn test(&self) -> &str {
        &self.test
    }

    /// Parameter names; the first is always `provider`.
    pub fn argnames(&self) -> &[String] {
        &self.argnames
    }

    /// Bindings in matrix order.
    pub fn bindings(&self) -> &[TestBinding<'inv>] {
        &self.bindings
    }

    /// Identifiers in matrix order.
    pub fn ids(&self) -> Vec<&str> {
        self.bindings.iter().map(|binding| binding.id.as_str()).collect()
    }

    /// Fixture scope.
    pub fn scope(&self) -> FixtureScope {
        self.scope
    }

    /// Number of cases.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no case was generated.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The (argnames, argvalues, ids) triple for a parametrizing harness.
    pub fn triple(&self) -> HarnessTriple<'_, 'inv> {
        HarnessTriple {
            test: &self.test,
            argnames: &self.argnames,
            argvalues: self
                .bindings
                .iter()
                .map(|binding| binding.values.as_slice())
                .collect(),
            ids: self.ids(),
            scope: self.scope,
        }
    }
}

/// Binds tests to matrices.
#[derive(Debug, Clone, Default)]
pub struct TestBinder {
    params: Vec<String>,
    scope: FixtureScope,
}

impl TestBinder {
    /// Creates a binder with only the `provider` parameter.
    pub fn new(scope: FixtureScope) -> Self {
        Self {
            params: Vec::new(),
            scope,
        }
    }

    /// Adds extra parameters taken from the provider's top-level
    /// capabilities (e.g. `provisioning`).
    #[must_use]
    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(
            params
                .into_iter()
                .map(Into::into)
                .filter(|param: &String| param != PROVIDER_ARGNAME),
        );
        self
    }

    /// Pairs `test` with every row of `matrix`.
    pub fn bind<'inv>(&self, test: &str, matrix: &Matrix<'inv>) -> ParametrizedCases<'inv> {
        let mut allocator = IdAllocator::new();
        let bindings = matrix
            .rows()
            .map(|(provider, base_id)| {
                let mut values = Vec::with_capacity(self.params.len() + 1);
                values.push(ParamValue::Provider(provider));
                values.extend(
                    self.params
                        .iter()
                        .map(|param| ParamValue::Capability(provider.capability(param))),
                );
                TestBinding {
                    test: test.to_owned(),
                    id: allocator.allocate(base_id),
                    provider,
                    values,
                }
            })
            .collect();

        let mut argnames = Vec::with_capacity(self.params.len() + 1);
        argnames.push(PROVIDER_ARGNAME.to_owned());
        argnames.extend(self.params.iter().cloned());

        ParametrizedCases {
            test: test.to_owned(),
            argnames,
            bindings,
            scope: self.scope,
        }
    }
}
