//! Provider class selection.
//!
//! Narrows an inventory to provider categories and/or concrete provider
//! types before requirement paths are checked.

use serde::{Deserialize, Serialize};

use crate::provider::{ProviderCategory, ProviderRecord};

/// Which provider classes a test module runs against.
///
/// Empty lists match anything. When both lists are set a provider must
/// match both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSelector {
    /// Accepted categories (empty matches any)
    #[serde(default)]
    pub categories: Vec<ProviderCategory>,
    /// Accepted provider types, case-insensitive (empty matches any)
    #[serde(default)]
    pub types: Vec<String>,
}

impl ProviderSelector {
    /// A selector that accepts every provider.
    pub fn any() -> Self {
        Self::default()
    }

    /// Restricts to the given categories.
    #[must_use]
    pub fn with_categories(
        mut self,
        categories: impl IntoIterator<Item = ProviderCategory>,
    ) -> Self {
        self.categories.extend(categories);
        self
    }

    /// Restricts to the given provider types.
    #[must_use]
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Whether the selector places no restriction.
    pub fn is_any(&self) -> bool {
        self.categories.is_empty() && self.types.is_empty()
    }

    /// Whether `provider` belongs to a selected class.
    pub fn matches(&self, provider: &ProviderRecord) -> bool {
        let category_ok = self.categories.is_empty()
            || provider
                .category
                .is_some_and(|category| self.categories.contains(&category));
        let type_ok =
            self.types.is_empty() || self.types.iter().any(|kind| provider.is_kind(kind));
        category_ok && type_ok
    }

    /// Get description of this selector for diagnostics.
    pub fn description(&self) -> String {
        let mut parts = Vec::new();

        if !self.categories.is_empty() {
            let categories: Vec<&str> = self
                .categories
                .iter()
                .map(|category| category.as_str())
                .collect();
            parts.push(format!("categories=[{}]", categories.join(", ")));
        }

        if !self.types.is_empty() {
            parts.push(format!("types=[{}]", self.types.join(", ")));
        }

        if parts.is_empty() {
            "matches any".to_owned()
        } else {
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ec2() -> ProviderRecord {
        ProviderRecord::new("ec2-east")
            .with_kind("ec2")
            .with_category(ProviderCategory::Cloud)
    }

    fn rhv() -> ProviderRecord {
        ProviderRecord::new("rhv43")
            .with_kind("rhevm")
            .with_category(ProviderCategory::Infra)
    }

    #[test]
    fn test_any_matches_everything() {
        let selector = ProviderSelector::any();
        assert!(selector.is_any());
        assert!(selector.matches(&ec2()));
        assert!(selector.matches(&ProviderRecord::new("bare")));
        assert_eq!(selector.description(), "matches any");
    }

    #[test]
    fn test_category_filter() {
        let selector = ProviderSelector::any().with_categories([ProviderCategory::Infra]);
        assert!(selector.matches(&rhv()));
        assert!(!selector.matches(&ec2()));
        assert!(!selector.matches(&ProviderRecord::new("uncategorised")));
    }

    #[test]
    fn test_type_filter_is_case_insensitive() {
        let selector = ProviderSelector::any().with_types(["EC2", "azure", "openstack", "gce"]);
        assert!(selector.matches(&ec2()));
        assert!(!selector.matches(&rhv()));
        assert_eq!(selector.description(), "types=[EC2, azure, openstack, gce]");
    }

    #[test]
    fn test_category_and_type_must_both_match() {
        let selector = ProviderSelector::any()
            .with_categories([ProviderCategory::Infra])
            .with_types(["ec2"]);
        assert!(!selector.matches(&ec2()));
        assert!(!selector.matches(&rhv()));
        assert_eq!(selector.description(), "categories=[infra], types=[ec2]");
    }
}
