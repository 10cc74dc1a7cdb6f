//! Matrix fixture format.
//!
//! A fixture pairs a provider inventory with one test module declaration and
//! states what collecting the module must produce. Fields of `expect` that
//! are left out are not checked; the structural invariants (unique ids,
//! inventory order, every bound provider satisfying every path) are checked
//! for every fixture.

use serde::{Deserialize, Serialize};
use testgen_core::{CollectionStatus, FixtureScope, Inventory, TestModuleSpec};

/// Complete matrix fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixFixture {
    /// Fixture name
    pub name: String,
    /// What the fixture demonstrates
    pub description: String,
    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,
    /// Provider inventory
    pub inventory: Inventory,
    /// Module under collection
    pub module: TestModuleSpec,
    /// Expected outcome
    pub expect: Expectations,
}

/// Expected collection status, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedStatus {
    /// Cases were generated
    Collected,
    /// No provider was eligible
    Empty,
    /// The module could not be collected
    Failed,
}

impl ExpectedStatus {
    /// Whether `status` has this kind.
    pub const fn matches(self, status: &CollectionStatus) -> bool {
        matches!(
            (self, status),
            (Self::Collected, CollectionStatus::Collected { .. })
                | (Self::Empty, CollectionStatus::Empty)
                | (Self::Failed, CollectionStatus::Failed { .. })
        )
    }
}

/// What collecting the module must produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectations {
    /// Collection status
    pub status: ExpectedStatus,
    /// Names of bound providers, in order, for every test
    #[serde(default)]
    pub eligible: Option<Vec<String>>,
    /// Case identifiers, in order, for every test
    #[serde(default)]
    pub ids: Option<Vec<String>>,
    /// Names of providers excluded by class or requirements
    #[serde(default)]
    pub excluded: Option<Vec<String>>,
    /// Parameter names
    #[serde(default)]
    pub argnames: Option<Vec<String>>,
    /// Fixture scope of the parameters
    #[serde(default)]
    pub scope: Option<FixtureScope>,
    /// Substring of the failure reason
    #[serde(default)]
    pub reason_contains: Option<String>,
}
