//! Loading inventories and suites from disk.
//!
//! Documents are JSON or TOML, chosen by file extension.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use crate::collection::SuiteDocument;
use crate::provider::Inventory;
use crate::{Error, Result};

/// Serialization format of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.json`
    Json,
    /// `.toml`
    Toml,
}

impl DocumentFormat {
    /// Picks the format from a path's extension (case-insensitive).
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Parses `text` in this format.
    ///
    /// # Errors
    /// Returns the underlying parse error.
    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T> {
        Ok(match self {
            Self::Json => serde_json::from_str(text)?,
            Self::Toml => toml::from_str(text)?,
        })
    }
}

/// Reads and parses a document, using its extension to pick the format.
///
/// # Errors
/// Returns an error if the extension is unknown, the file cannot be read,
/// or its contents do not parse.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = DocumentFormat::from_path(path)?;
    let text = fs::read_to_string(path)?;
    let document = format.parse(&text)?;
    tracing::debug!(path = %path.display(), ?format, "loaded document");
    Ok(document)
}

/// Loads a provider inventory.
///
/// # Errors
/// See [`load_document`].
pub fn load_inventory(path: &Path) -> Result<Inventory> {
    let inventory: Inventory = load_document(path)?;
    tracing::info!(
        path = %path.display(),
        providers = inventory.len(),
        "loaded provider inventory"
    );
    Ok(inventory)
}

/// Loads a suite of test module specs.
///
/// # Errors
/// See [`load_document`].
pub fn load_suite(path: &Path) -> Result<SuiteDocument> {
    let suite: SuiteDocument = load_document(path)?;
    tracing::info!(
        path = %path.display(),
        modules = suite.modules.len(),
        "loaded test suite"
    );
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirement::RequirementPath;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("inv.JSON")).unwrap(),
            DocumentFormat::Json
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("inv.toml")).unwrap(),
            DocumentFormat::Toml
        );
        let error = DocumentFormat::from_path(Path::new("inv.yaml")).unwrap_err();
        assert_eq!(error.to_string(), "Unsupported document format: inv.yaml");
    }

    #[test]
    fn test_load_toml_inventory() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "inventory.toml",
            r#"
[[providers]]
name = "rhv43"
type = "rhevm"
category = "infra"
iso_datastore = true

[providers.provisioning]
host = "rhv-host"

[customization_templates.rhel7-ks]
type = "kickstart"
"#,
        );

        let inventory = load_inventory(&path).unwrap();
        assert_eq!(inventory.len(), 1);
        assert!(inventory.table("customization_templates").is_some());
        let requirement: RequirementPath = "provisioning.host".parse().unwrap();
        assert!(requirement.is_satisfied_by(&inventory.providers[0].capabilities));
    }

    #[test]
    fn test_load_json_suite() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "suite.json",
            r#"{"modules": [{"name": "m", "tests": ["t1"], "required_fields": ["a", ["b", "c"]]}]}"#,
        );

        let suite = load_suite(&path).unwrap();
        assert_eq!(suite.modules.len(), 1);
        assert_eq!(suite.modules[0].required_fields.paths().len(), 2);
    }

    #[test]
    fn test_load_errors_are_classified() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(load_inventory(&missing), Err(Error::Io(_))));

        let broken = write(&dir, "broken.json", "{ not json");
        assert!(matches!(load_inventory(&broken), Err(Error::Json(_))));

        let bad_path = write(
            &dir,
            "bad.json",
            r#"{"modules": [{"name": "m", "tests": [], "required_fields": [[]]}]}"#,
        );
        let error = load_suite(&bad_path).unwrap_err();
        assert!(error.is_load_error());
    }
}
