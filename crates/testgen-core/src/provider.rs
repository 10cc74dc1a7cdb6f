//! Provider records and the inventory they are loaded from.

use core::fmt;
use core::result::Result as CoreResult;
use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};

use crate::capability::{CapabilityMap, CapabilityValue, Resolution};
use crate::requirement::RequirementPath;
use crate::{Error, Result};

/// Broad family a provider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCategory {
    /// Virtualization managers (RHEV, vSphere, SCVMM)
    Infra,
    /// Public and private clouds (EC2, Azure, GCE, OpenStack)
    Cloud,
    /// Network managers attached to a cloud provider
    Network,
    /// Container platforms
    Container,
    /// Physical infrastructure
    Physical,
}

impl ProviderCategory {
    /// Canonical lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Infra => "infra",
            Self::Cloud => "cloud",
            Self::Network => "network",
            Self::Container => "container",
            Self::Physical => "physical",
        }
    }
}

impl fmt::Display for ProviderCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ProviderCategory {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        match text.to_ascii_lowercase().as_str() {
            "infra" => Ok(Self::Infra),
            "cloud" => Ok(Self::Cloud),
            "network" => Ok(Self::Network),
            "container" => Ok(Self::Container),
            "physical" => Ok(Self::Physical),
            other => Err(Error::Config(format!("unknown provider category: {other}"))),
        }
    }
}

/// One infrastructure backend under test.
///
/// `name`, `type` and `category` are identity fields; every other key of
/// the inventory entry lands in `capabilities`. Requirement paths still see
/// the identity fields, see [`ProviderRecord::unmet`].
///
/// An unknown `category` leaves the provider uncategorised. A missing or
/// non-string `name` makes the entry invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CapabilityMap")]
pub struct ProviderRecord {
    /// Display name, also the default test identifier
    pub name: String,
    /// Concrete provider type (`rhevm`, `ec2`, ...)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Provider family
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ProviderCategory>,
    /// Everything else in the entry
    #[serde(flatten)]
    pub capabilities: CapabilityMap,
}

impl ProviderRecord {
    /// Creates a record with no type, category or capabilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            category: None,
            capabilities: CapabilityMap::new(),
        }
    }

    /// Sets the provider type.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the provider category.
    #[must_use]
    pub fn with_category(mut self, category: ProviderCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Adds a top-level capability.
    #[must_use]
    pub fn with_capability(
        mut self,
        key: impl Into<String>,
        value: impl Into<CapabilityValue>,
    ) -> Self {
        self.capabilities.insert(key, value);
        self
    }

    /// Top-level capability by key.
    pub fn capability(&self, key: &str) -> Option<&CapabilityValue> {
        self.capabilities.get(key)
    }

    /// Whether the provider is of the given type (case-insensitive).
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(kind))
    }

    /// Identity field by its inventory key: `name`, `type` or `category`.
    pub fn identity(&self, key: &str) -> Option<&str> {
        match key {
            "name" => Some(self.name.as_str()),
            "type" => self.kind.as_deref(),
            "category" => self.category.map(ProviderCategory::as_str),
            _ => None,
        }
    }

    /// Why `path` is not satisfied by this provider, `None` if it is.
    ///
    /// Capabilities are consulted first. A path whose first key is an
    /// identity field resolves against that field: a one-key path is
    /// satisfied by a non-empty value, a longer one walks into a string.
    pub fn unmet(&self, path: &RequirementPath) -> Option<Resolution<'_>> {
        let resolution = path.resolve(&self.capabilities);
        if resolution.is_satisfied() {
            return None;
        }
        let segments = path.segments();
        if let Resolution::Missing { depth: 0 } = resolution
            && let Some(value) = segments.first().and_then(|key| self.identity(key))
        {
            return match segments.len() {
                1 if !value.is_empty() => None,
                1 => Some(Resolution::Missing { depth: 0 }),
                _ => Some(Resolution::NotAMap {
                    depth: 0,
                    found: "string",
                }),
            };
        }
        Some(resolution)
    }

    /// Whether the provider satisfies `path`.
    pub fn satisfies(&self, path: &RequirementPath) -> bool {
        self.unmet(path).is_none()
    }
}

impl TryFrom<CapabilityMap> for ProviderRecord {
    type Error = Error;

    fn try_from(mut entry: CapabilityMap) -> Result<Self> {
        let name = match entry.remove("name") {
            Some(CapabilityValue::String(name)) => name,
            Some(other) => {
                return Err(Error::InvalidProvider(format!(
                    "'name' is a {}, not a string",
                    other.kind()
                )));
            }
            None => return Err(Error::InvalidProvider("entry has no 'name'".to_owned())),
        };

        let kind = match entry.remove("type") {
            Some(CapabilityValue::String(kind)) => Some(kind),
            None | Some(CapabilityValue::Null) => None,
            Some(other) => {
                tracing::warn!(provider = %name, "ignoring non-string type ({})", other.kind());
                None
            }
        };

        let category = match entry.remove("category") {
            Some(CapabilityValue::String(text)) => match text.parse::<ProviderCategory>() {
                Ok(category) => Some(category),
                Err(error) => {
                    tracing::warn!(provider = %name, "leaving provider uncategorised: {error}");
                    None
                }
            },
            None | Some(CapabilityValue::Null) => None,
            Some(other) => {
                tracing::warn!(provider = %name, "ignoring non-string category ({})", other.kind());
                None
            }
        };

        Ok(Self {
            name,
            kind,
            category,
            capabilities: entry,
        })
    }
}

/// Reads provider entries one by one; invalid entries are skipped.
fn deserialize_providers<'de, D>(deserializer: D) -> CoreResult<Vec<ProviderRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<CapabilityValue>::deserialize(deserializer)?;
    let providers = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let parsed = match entry {
                CapabilityValue::Map(map) => ProviderRecord::try_from(map),
                other => Err(Error::InvalidProvider(format!(
                    "expected a table, found a {}",
                    other.kind()
                ))),
            };
            match parsed {
                Ok(provider) => Some(provider),
                Err(error) => {
                    tracing::warn!(index, "skipping provider entry: {error}");
                    None
                }
            }
        })
        .collect();
    Ok(providers)
}

/// Ordered provider inventory plus any auxiliary top-level tables.
///
/// Iteration order is the document order and is preserved by every stage
/// of matrix generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// Provider entries in document order
    #[serde(default, deserialize_with = "deserialize_providers")]
    pub providers: Vec<ProviderRecord>,
    /// Other top-level tables (e.g. `customization_templates`)
    #[serde(flatten)]
    pub tables: CapabilityMap,
}

impl Inventory {
    /// Creates an inventory from provider records.
    pub fn new(providers: Vec<ProviderRecord>) -> Self {
        Self {
            providers,
            tables: CapabilityMap::new(),
        }
    }

    /// Attaches a named top-level table.
    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, table: CapabilityMap) -> Self {
        self.tables.insert(name, table);
        self
    }

    /// A named top-level table, if present and a map.
    pub fn table(&self, name: &str) -> Option<&CapabilityMap> {
        self.tables.get(name).and_then(CapabilityValue::as_map)
    }

    /// Number of providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the inventory has no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Iterates providers in document order.
    pub fn iter(&self) -> impl Iterator<Item = &ProviderRecord> {
        self.providers.iter()
    }

    /// Finds the first provider with the given name.
    pub fn find(&self, name: &str) -> Option<&ProviderRecord> {
        self.providers.iter().find(|provider| provider.name == name)
    }
}
