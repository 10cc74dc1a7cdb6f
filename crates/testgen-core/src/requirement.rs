//! Requirement paths: which capability values a test needs.

use core::fmt;
use core::slice;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::capability::{CapabilityMap, Resolution};
use crate::provider::ProviderRecord;
use crate::{Error, Result};

/// A required capability value, addressed by key or by nested key path.
///
/// Deserializes from either a string (`"iso_datastore"`) or a non-empty
/// array of strings (`["provisioning", "host"]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRequirement", into = "RawRequirement")]
pub enum RequirementPath {
    /// A single top-level key
    Field(String),
    /// A path through nested maps (two or more keys)
    Nested(Vec<String>),
}

/// Wire form of a requirement before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawRequirement {
    /// `"key"`
    Field(String),
    /// `["outer", "inner"]`
    Nested(Vec<String>),
}

impl TryFrom<RawRequirement> for RequirementPath {
    type Error = Error;

    fn try_from(raw: RawRequirement) -> Result<Self> {
        match raw {
            RawRequirement::Field(key) => Self::field(key),
            RawRequirement::Nested(keys) => Self::nested(keys),
        }
    }
}

impl From<RequirementPath> for RawRequirement {
    fn from(path: RequirementPath) -> Self {
        match path {
            RequirementPath::Field(key) => Self::Field(key),
            RequirementPath::Nested(keys) => Self::Nested(keys),
        }
    }
}

impl RequirementPath {
    /// Requires a top-level key.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRequirement`] if `key` is empty.
    pub fn field(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::InvalidRequirement("empty field name".to_owned()));
        }
        Ok(Self::Field(key))
    }

    /// Requires a nested key path.
    ///
    /// A one-element path collapses to [`RequirementPath::Field`].
    ///
    /// # Errors
    /// Returns [`Error::InvalidRequirement`] if the path or any segment is empty.
    pub fn nested<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(Error::InvalidRequirement("empty key path".to_owned()));
        }
        if let Some(position) = keys.iter().position(String::is_empty) {
            return Err(Error::InvalidRequirement(format!(
                "empty segment at position {position} in {}",
                keys.join(".")
            )));
        }
        if keys.len() == 1 {
            return Ok(Self::Field(keys.remove(0)));
        }
        Ok(Self::Nested(keys))
    }

    /// The key sequence this path walks.
    pub fn segments(&self) -> &[String] {
        match self {
            Self::Field(key) => slice::from_ref(key),
            Self::Nested(keys) => keys,
        }
    }

    /// Resolves this path against a capability map.
    pub fn resolve<'map>(&self, capabilities: &'map CapabilityMap) -> Resolution<'map> {
        capabilities.resolve(self.segments())
    }

    /// Whether the path resolves to a truthy value.
    pub fn is_satisfied_by(&self, capabilities: &CapabilityMap) -> bool {
        self.resolve(capabilities).is_satisfied()
    }
}

impl fmt::Display for RequirementPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.segments().join("."))
    }
}

impl FromStr for RequirementPath {
    type Err = Error;

    /// Parses dotted notation: `provisioning.host`.
    fn from_str(text: &str) -> Result<Self> {
        Self::nested(text.split('.'))
    }
}

/// Ordered list of requirement paths that must all be satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementSet(Vec<RequirementPath>);

impl RequirementSet {
    /// Creates an empty set; every provider satisfies it.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a path.
    #[must_use]
    pub fn with(mut self, path: RequirementPath) -> Self {
        self.0.push(path);
        self
    }

    /// All paths in declaration order.
    pub fn paths(&self) -> &[RequirementPath] {
        &self.0
    }

    /// Whether no paths are required.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the first path the provider fails to satisfy.
    pub fn first_unmet<'set>(
        &'set self,
        provider: &ProviderRecord,
    ) -> Option<&'set RequirementPath> {
        self.0.iter().find(|path| !provider.satisfies(path))
    }
}

impl From<Vec<RequirementPath>> for RequirementSet {
    fn from(paths: Vec<RequirementPath>) -> Self {
        Self(paths)
    }
}

impl FromIterator<RequirementPath> for RequirementSet {
    fn from_iter<I: IntoIterator<Item = RequirementPath>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, to_string};

    #[test]
    fn test_parse_dotted() {
        let path: RequirementPath = "provisioning.host".parse().unwrap();
        assert_eq!(
            path,
            RequirementPath::Nested(vec!["provisioning".to_owned(), "host".to_owned()])
        );
        assert_eq!(path.to_string(), "provisioning.host");

        let field: RequirementPath = "iso_datastore".parse().unwrap();
        assert_eq!(field, RequirementPath::Field("iso_datastore".to_owned()));
    }

    #[test]
    fn test_rejects_empty_segments() {
        assert!(matches!(
            "".parse::<RequirementPath>(),
            Err(Error::InvalidRequirement(_))
        ));
        assert!(matches!(
            "provisioning..host".parse::<RequirementPath>(),
            Err(Error::InvalidRequirement(_))
        ));
        assert!(matches!(
            RequirementPath::nested(Vec::<String>::new()),
            Err(Error::InvalidRequirement(_))
        ));
        assert!(matches!(RequirementPath::field(""), Err(Error::InvalidRequirement(_))));
    }

    #[test]
    fn test_deserialize_mixed_list() {
        let set: RequirementSet =
            from_str(r#"["iso_datastore", ["provisioning", "host"], ["vlan"]]"#).unwrap();
        assert_eq!(set.paths().len(), 3);
        assert_eq!(set.paths()[0].segments(), ["iso_datastore"]);
        assert_eq!(set.paths()[1].segments(), ["provisioning", "host"]);
        assert_eq!(set.paths()[2], RequirementPath::Field("vlan".to_owned()));

        let json = to_string(&set).unwrap();
        assert_eq!(json, r#"["iso_datastore",["provisioning","host"],"vlan"]"#);
    }

    #[test]
    fn test_deserialize_rejects_empty_array() {
        let error = from_str::<RequirementSet>(r#"[[]]"#).unwrap_err();
        assert!(error.to_string().contains("empty"));
    }

    #[test]
    fn test_first_unmet() {
        let provider = ProviderRecord::new("rhv")
            .with_kind("rhevm")
            .with_capability("iso_datastore", true)
            .with_capability("provisioning", CapabilityMap::new().with("host", "h1"));
        let set = RequirementSet::new()
            .with("type".parse().unwrap())
            .with("iso_datastore".parse().unwrap())
            .with("provisioning.host".parse().unwrap())
            .with("provisioning.vlan".parse().unwrap());

        assert_eq!(
            set.first_unmet(&provider).map(ToString::to_string),
            Some("provisioning.vlan".to_owned())
        );
        assert_eq!(RequirementSet::new().first_unmet(&provider), None);
    }
}
