//! Secondary filtering of a generated matrix.
//!
//! Structural requirements only say a value is present. Some tests also need
//! the value to mean something elsewhere, e.g. the kickstart template a
//! provider names must exist in the customization template registry. Such
//! checks are expressed as a [`ProviderPredicate`] applied after matrix
//! generation.

use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::capability::{CapabilityMap, CapabilityValue};
use crate::matrix::Matrix;
use crate::provider::{Inventory, ProviderRecord};
use crate::requirement::RequirementPath;

/// Default name of the inventory table holding customization templates.
pub const DEFAULT_TEMPLATE_TABLE: &str = "customization_templates";

/// Test-specific provider check applied after matrix generation.
///
/// Implementations receive shared references only and must not rely on
/// being called in any particular order or number of times.
pub trait ProviderPredicate {
    /// Whether the provider stays in the matrix.
    fn accepts(&self, provider: &ProviderRecord) -> bool;

    /// Short description for logging.
    fn describe(&self) -> String {
        "custom predicate".to_owned()
    }
}

impl<F> ProviderPredicate for F
where
    F: Fn(&ProviderRecord) -> bool,
{
    fn accepts(&self, provider: &ProviderRecord) -> bool {
        self(provider)
    }
}

/// Reduces `matrix` to rows whose provider satisfies `predicate`.
///
/// Relative order and the id/provider pairing are preserved.
pub fn apply_secondary_filter<'inv, P>(matrix: Matrix<'inv>, predicate: &P) -> Matrix<'inv>
where
    P: ProviderPredicate + ?Sized,
{
    let before = matrix.len();
    let filtered = matrix.retain(|provider| {
        let accepted = predicate.accepts(provider);
        if !accepted {
            tracing::debug!(
                provider = %provider.name,
                predicate = %predicate.describe(),
                "secondary filter rejected provider"
            );
        }
        accepted
    });
    tracing::debug!(before, after = filtered.len(), "applied secondary filter");
    filtered
}

/// Names of customization templates known to the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateRegistry {
    names: BTreeSet<String>,
}

impl TemplateRegistry {
    /// Builds a registry from template names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a registry from the keys of a capability table.
    pub fn from_table(table: &CapabilityMap) -> Self {
        Self::new(table.iter().map(|(name, _)| name.clone()))
    }

    /// Reads the named table from an inventory; a missing table yields an
    /// empty registry.
    pub fn from_inventory(inventory: &Inventory, table: &str) -> Self {
        inventory
            .table(table)
            .map(Self::from_table)
            .unwrap_or_default()
    }

    /// Whether a template with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Accepts providers whose capability at `path` names a registered template.
#[derive(Debug, Clone)]
pub struct TemplateRegistered<'reg> {
    /// Where the template name lives in the provider's capabilities
    pub path: RequirementPath,
    /// Known templates
    pub registry: &'reg TemplateRegistry,
}

impl ProviderPredicate for TemplateRegistered<'_> {
    fn accepts(&self, provider: &ProviderRecord) -> bool {
        provider
            .capabilities
            .lookup(self.path.segments())
            .and_then(CapabilityValue::as_str)
            .is_some_and(|name| self.registry.contains(name))
    }

    fn describe(&self) -> String {
        format!("template at {} is registered", self.path)
    }
}

/// Rejects providers by name.
#[derive(Debug, Clone, Default)]
pub struct ExcludeNames {
    /// Provider names to drop
    pub names: BTreeSet<String>,
}

impl ProviderPredicate for ExcludeNames {
    fn accepts(&self, provider: &ProviderRecord) -> bool {
        !self.names.contains(&provider.name)
    }

    fn describe(&self) -> String {
        let names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        format!("name not in [{}]", names.join(", "))
    }
}

/// Declarative secondary filter, as written in suite documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecondaryFilter {
    /// Keep providers whose template reference is registered
    TemplateRegistered {
        /// Path of the template name inside the provider's capabilities
        path: RequirementPath,
        /// Inventory table to read templates from
        #[serde(default = "default_template_table")]
        table: String,
    },
    /// Drop providers with these names
    ExcludeNames {
        /// Names to drop
        names: Vec<String>,
    },
}

fn default_template_table() -> String {
    DEFAULT_TEMPLATE_TABLE.to_owned()
}

impl SecondaryFilter {
    /// Applies this filter to `matrix`, reading any registry from `inventory`.
    pub fn apply<'inv>(&self, matrix: Matrix<'inv>, inventory: &Inventory) -> Matrix<'inv> {
        match self {
            Self::TemplateRegistered { path, table } => {
                let registry = TemplateRegistry::from_inventory(inventory, table);
                if registry.is_empty() {
                    tracing::warn!(table = %table, "template registry is empty or missing");
                }
                let predicate = TemplateRegistered {
                    path: path.clone(),
                    registry: &registry,
                };
                apply_secondary_filter(matrix, &predicate)
            }
            Self::ExcludeNames { names } => {
                let predicate = ExcludeNames {
                    names: names.iter().cloned().collect(),
                };
                apply_secondary_filter(matrix, &predicate)
            }
        }
    }
}

impl fmt::Display for SecondaryFilter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemplateRegistered { path, table } => {
                write!(formatter, "template at {path} is not registered in '{table}'")
            }
            Self::ExcludeNames { .. } => formatter.write_str("excluded by name"),
        }
    }
}
