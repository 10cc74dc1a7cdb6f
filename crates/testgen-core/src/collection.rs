//! Module-level collection: the whole pipeline for one test module.
//!
//! A [`TestModuleSpec`] declares what a test module needs; collecting it
//! against an inventory runs selection, requirement filtering, the optional
//! secondary filter and test binding, and reports whether cases were
//! collected, none were eligible, or the module could not be collected.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::binding::{HarnessTriple, ParametrizedCases, TestBinder};
use crate::filter::SecondaryFilter;
use crate::fixture::FixtureScope;
use crate::matrix::MatrixGenerator;
use crate::provider::Inventory;
use crate::requirement::RequirementSet;
use crate::selector::ProviderSelector;

/// Declarative description of a parametrized test module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestModuleSpec {
    /// Module name
    pub name: String,
    /// Test functions in the module
    pub tests: Vec<String>,
    /// Capability paths every provider must have
    #[serde(default)]
    pub required_fields: RequirementSet,
    /// Provider classes the module runs against
    #[serde(default)]
    pub selector: ProviderSelector,
    /// Optional test-specific filter applied after requirements
    #[serde(default)]
    pub filter: Option<SecondaryFilter>,
    /// Extra parameters bound from top-level capabilities
    #[serde(default)]
    pub params: Vec<String>,
    /// Fixture scope of the parameters
    #[serde(default)]
    pub scope: FixtureScope,
}

impl TestModuleSpec {
    /// Creates a module spec with no requirements.
    pub fn new<I, S>(name: impl Into<String>, tests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tests: tests.into_iter().map(Into::into).collect(),
            required_fields: RequirementSet::new(),
            selector: ProviderSelector::any(),
            filter: None,
            params: Vec::new(),
            scope: FixtureScope::default(),
        }
    }

    /// Checks the spec before anything is generated.
    fn validate(&self) -> Result<(), String> {
        if self.tests.is_empty() {
            return Err("module declares no tests".to_owned());
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = self.tests.iter().find(|test| !seen.insert(test.as_str())) {
            return Err(format!("test '{duplicate}' is declared twice"));
        }
        Ok(())
    }
}

/// A set of test modules, as loaded from a suite document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteDocument {
    /// Modules in declaration order
    #[serde(default)]
    pub modules: Vec<TestModuleSpec>,
}

/// How collection of a module ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CollectionStatus {
    /// At least one case was generated
    Collected {
        /// Total cases across the module's tests
        cases: usize,
    },
    /// Collection succeeded but no provider was eligible
    Empty,
    /// The module could not be collected
    Failed {
        /// What went wrong
        reason: String,
    },
}

impl CollectionStatus {
    /// Whether collection failed, as opposed to collecting zero cases.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Cases generated for one module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleCollection<'inv> {
    /// Module name
    pub module: String,
    /// Collection outcome
    pub status: CollectionStatus,
    /// One entry per test function (empty when collection failed)
    pub cases: Vec<ParametrizedCases<'inv>>,
}

/// Serializable summary of a [`ModuleCollection`].
#[derive(Debug, Serialize)]
pub struct ModuleSummary<'col, 'inv> {
    /// Module name
    pub module: &'col str,
    /// Collection outcome
    #[serde(flatten)]
    pub status: &'col CollectionStatus,
    /// Harness triples per test
    pub tests: Vec<HarnessTriple<'col, 'inv>>,
}

impl<'inv> ModuleCollection<'inv> {
    fn failed(module: &str, reason: String) -> Self {
        tracing::warn!(module, "collection failed: {reason}");
        Self {
            module: module.to_owned(),
            status: CollectionStatus::Failed { reason },
            cases: Vec::new(),
        }
    }

    /// Total number of cases across tests.
    pub fn total_cases(&self) -> usize {
        self.cases.iter().map(ParametrizedCases::len).sum()
    }

    /// The parametrization for a named test.
    pub fn test(&self, name: &str) -> Option<&ParametrizedCases<'inv>> {
        self.cases.iter().find(|cases| cases.test() == name)
    }

    /// Summary suitable for JSON output.
    pub fn summary(&self) -> ModuleSummary<'_, 'inv> {
        ModuleSummary {
            module: &self.module,
            status: &self.status,
            tests: self.cases.iter().map(ParametrizedCases::triple).collect(),
        }
    }
}

/// Runs the full pipeline for one module.
pub fn collect_module<'inv>(
    spec: &TestModuleSpec,
    inventory: &'inv Inventory,
) -> ModuleCollection<'inv> {
    if let Err(reason) = spec.validate() {
        return ModuleCollection::failed(&spec.name, reason);
    }

    let generator =
        MatrixGenerator::new(spec.required_fields.clone()).with_selector(spec.selector.clone());
    let mut matrix = generator.generate(inventory);
    if let Some(filter) = &spec.filter {
        matrix = filter.apply(matrix, inventory);
    }

    let binder = TestBinder::new(spec.scope).with_params(spec.params.iter().cloned());
    let cases: Vec<ParametrizedCases<'inv>> = spec
        .tests
        .iter()
        .map(|test| binder.bind(test, &matrix))
        .collect();

    let total: usize = cases.iter().map(ParametrizedCases::len).sum();
    let status = if total == 0 {
        CollectionStatus::Empty
    } else {
        CollectionStatus::Collected { cases: total }
    };
    tracing::info!(module = %spec.name, cases = total, "collected module");

    ModuleCollection {
        module: spec.name.clone(),
        status,
        cases,
    }
}

/// Collection results for a whole suite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteCollection<'inv> {
    /// One entry per module, in suite order
    pub modules: Vec<ModuleCollection<'inv>>,
}

impl<'inv> SuiteCollection<'inv> {
    /// Whether any module failed to collect.
    pub fn has_failures(&self) -> bool {
        self.modules.iter().any(|module| module.status.is_failure())
    }

    /// Total cases across all modules.
    pub fn total_cases(&self) -> usize {
        self.modules.iter().map(ModuleCollection::total_cases).sum()
    }

    /// A module by name.
    pub fn module(&self, name: &str) -> Option<&ModuleCollection<'inv>> {
        self.modules.iter().find(|module| module.module == name)
    }

    /// Summaries of every module.
    pub fn summaries(&self) -> Vec<ModuleSummary<'_, 'inv>> {
        self.modules.iter().map(ModuleCollection::summary).collect()
    }
}

/// Collects every module of a suite; a failing module does not stop the rest.
pub fn collect_suite<'inv>(
    suite: &SuiteDocument,
    inventory: &'inv Inventory,
) -> SuiteCollection<'inv> {
    SuiteCollection {
        modules: suite
            .modules
            .iter()
            .map(|spec| collect_module(spec, inventory))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityMap;
    use crate::provider::{ProviderCategory, ProviderRecord};

    fn inventory() -> Inventory {
        Inventory::new(vec![
            ProviderRecord::new("rhv43")
                .with_kind("rhevm")
                .with_category(ProviderCategory::Infra)
                .with_capability("iso_datastore", true)
                .with_capability(
                    "provisioning",
                    CapabilityMap::new()
                        .with("host", "rhv-host")
                        .with("iso_kickstart", "rhel7-ks"),
                ),
            ProviderRecord::new("ec2-east")
                .with_kind("ec2")
                .with_category(ProviderCategory::Cloud),
            ProviderRecord::new("gce-central")
                .with_kind("gce")
                .with_category(ProviderCategory::Cloud),
        ])
        .with_table(
            "customization_templates",
            CapabilityMap::new().with("rhel7-ks", CapabilityMap::new().with("type", "kickstart")),
        )
    }

    #[test]
    fn test_collects_selected_providers_for_every_test() {
        let inventory = inventory();
        let mut spec = TestModuleSpec::new("test_sdn_crud", ["test_sdn_crud", "test_sdn_delete"]);
        spec.selector = ProviderSelector::any().with_types(["ec2", "azure", "openstack", "gce"]);
        spec.scope = FixtureScope::Module;

        let collection = collect_module(&spec, &inventory);
        assert_eq!(collection.status, CollectionStatus::Collected { cases: 4 });
        let crud = collection.test("test_sdn_crud").unwrap();
        assert_eq!(crud.ids(), ["ec2-east", "gce-central"]);
        assert_eq!(crud.scope(), FixtureScope::Module);
    }

    #[test]
    fn test_template_filter_and_params() {
        let inventory = inventory();
        let spec: TestModuleSpec = serde_json::from_str(
            r#"{
                "name": "test_iso_service_catalogs",
                "tests": ["test_rhev_iso_servicecatalog"],
                "required_fields": ["iso_datastore", ["provisioning", "host"]],
                "selector": {"categories": ["infra"]},
                "filter": {"kind": "template_registered", "path": ["provisioning", "iso_kickstart"]},
                "params": ["provisioning"],
                "scope": "module"
            }"#,
        )
        .unwrap();

        let collection = collect_module(&spec, &inventory);
        let cases = collection.test("test_rhev_iso_servicecatalog").unwrap();
        assert_eq!(cases.ids(), ["rhv43"]);
        assert_eq!(cases.argnames(), ["provider", "provisioning"]);
    }

    #[test]
    fn test_empty_is_not_failure() {
        let inventory = inventory();
        let mut spec = TestModuleSpec::new("test_pxe", ["test_pxe_servicecatalog"]);
        spec.required_fields = RequirementSet::new().with("pxe_server".parse().unwrap());

        let collection = collect_module(&spec, &inventory);
        assert_eq!(collection.status, CollectionStatus::Empty);
        assert!(!collection.status.is_failure());
        assert_eq!(collection.cases.len(), 1);
        assert_eq!(collection.total_cases(), 0);
    }

    #[test]
    fn test_missing_template_table_is_empty_registry() {
        let inventory = Inventory::new(vec![ProviderRecord::new("rhv43").with_capability(
            "provisioning",
            CapabilityMap::new().with("iso_kickstart", "rhel7-ks"),
        )]);
        let mut spec = TestModuleSpec::new("test_iso", ["test_iso"]);
        spec.filter = Some(SecondaryFilter::TemplateRegistered {
            path: "provisioning.iso_kickstart".parse().unwrap(),
            table: "customization_templates".to_owned(),
        });

        let collection = collect_module(&spec, &inventory);
        assert_eq!(collection.status, CollectionStatus::Empty);
        assert_eq!(collection.cases.len(), 1);
        assert!(collection.cases[0].is_empty());

        let matrix = MatrixGenerator::default().generate(&inventory);
        let filter = spec.filter.as_ref().unwrap();
        assert!(filter.apply(matrix, &inventory).is_empty());
    }

    #[test]
    fn test_suite_keeps_going_after_failure() {
        let inventory = inventory();
        let suite = SuiteDocument {
            modules: vec![
                TestModuleSpec::new("broken", Vec::<String>::new()),
                TestModuleSpec::new("dupes", ["t", "t"]),
                TestModuleSpec::new("all", ["test_all"]),
            ],
        };

        let collection = collect_suite(&suite, &inventory);
        assert!(collection.has_failures());
        assert_eq!(collection.total_cases(), 3);
        assert!(matches!(
            &collection.module("dupes").unwrap().status,
            CollectionStatus::Failed { reason } if reason.contains("declared twice")
        ));
        assert_eq!(collection.summaries().len(), 3);
    }

    #[test]
    fn test_summary_json_shape() {
        let inventory = Inventory::new(vec![ProviderRecord::new("p1")]);
        let collection = collect_module(&TestModuleSpec::new("m", ["t"]), &inventory);
        let json = serde_json::to_value(collection.summary()).unwrap();
        assert_eq!(json["module"], "m");
        assert_eq!(json["status"], "collected");
        assert_eq!(json["cases"], 1);
        assert_eq!(json["tests"][0]["ids"][0], "p1");
    }
}
