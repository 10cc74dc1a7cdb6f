//! Tool configuration read from `testgen.toml`.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::filter::DEFAULT_TEMPLATE_TABLE;
use crate::fixture::FixtureScope;
use crate::{Error, Result};

/// File name looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "testgen.toml";

/// Environment variable overriding [`TestgenConfig::inventory`].
pub const ENV_INVENTORY: &str = "TESTGEN_INVENTORY";
/// Environment variable overriding [`TestgenConfig::suite`].
pub const ENV_SUITE: &str = "TESTGEN_SUITE";
/// Environment variable overriding [`TestgenConfig::log_filter`].
pub const ENV_LOG: &str = "TESTGEN_LOG";

/// Defaults shared by every `testgen` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestgenConfig {
    /// Provider inventory document
    pub inventory: Option<PathBuf>,
    /// Suite document listing test modules
    pub suite: Option<PathBuf>,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
    /// Fixture scope for ad-hoc matrices
    pub default_scope: FixtureScope,
    /// Inventory table holding customization templates
    pub template_table: String,
}

impl Default for TestgenConfig {
    fn default() -> Self {
        Self {
            inventory: None,
            suite: None,
            log_filter: None,
            default_scope: FixtureScope::Function,
            template_table: DEFAULT_TEMPLATE_TABLE.to_owned(),
        }
    }
}

impl TestgenConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|error| {
            Error::Config(format!("Failed to read {}: {error}", path.display()))
        })?;
        let config = toml::from_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Loads `explicit` if given, else `./testgen.toml` when it exists, else
    /// defaults; environment overrides are applied last.
    ///
    /// # Errors
    /// Returns an error if an explicit file is missing or any file fails to
    /// parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let local = Path::new(CONFIG_FILE_NAME);
                if local.is_file() {
                    Self::load_from_file(local)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides from a variable lookup (normally the process
    /// environment). Empty values are ignored.
    pub fn apply_overrides<L>(&mut self, lookup: L)
    where
        L: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());
        if let Some(inventory) = lookup(ENV_INVENTORY) {
            self.inventory = Some(PathBuf::from(inventory));
        }
        if let Some(suite) = lookup(ENV_SUITE) {
            self.suite = Some(PathBuf::from(suite));
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = Some(filter);
        }
    }

    /// Writes the configuration as TOML with a short header.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|error| {
                Error::Config(format!("Failed to create config directory: {error}"))
            })?;
        }

        let contents = toml::to_string_pretty(self)?;
        let header = "# testgen configuration\n\
                      # Paths are relative to the working directory\n\n";
        fs::write(path, format!("{header}{contents}"))
            .map_err(|error| Error::Config(format!("Failed to write config: {error}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = TestgenConfig::default();
        assert_eq!(config.template_table, "customization_templates");
        assert_eq!(config.default_scope, FixtureScope::Function);
        assert!(config.inventory.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("testgen.toml");
        let config = TestgenConfig {
            inventory: Some(PathBuf::from("cfme_data.toml")),
            default_scope: FixtureScope::Module,
            ..TestgenConfig::default()
        };

        config.save_to_file(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# testgen configuration"));
        assert_eq!(TestgenConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("testgen.toml");
        fs::write(&path, "suite = \"suite.json\"\n").unwrap();

        let config = TestgenConfig::load(Some(&path)).unwrap();
        assert_eq!(config.suite.as_deref(), Some(Path::new("suite.json")));
        assert_eq!(config.template_table, DEFAULT_TEMPLATE_TABLE);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = TestgenConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_INVENTORY, "other.json"),
            (ENV_SUITE, ""),
            (ENV_LOG, "testgen_core=debug"),
        ]
        .into_iter()
        .collect();
        let mut config = TestgenConfig {
            suite: Some(PathBuf::from("suite.toml")),
            ..TestgenConfig::default()
        };

        config.apply_overrides(|key| vars.get(key).map(|value| (*value).to_owned()));
        assert_eq!(config.inventory.as_deref(), Some(Path::new("other.json")));
        assert_eq!(config.suite.as_deref(), Some(Path::new("suite.toml")));
        assert_eq!(config.log_filter.as_deref(), Some("testgen_core=debug"));
    }
}
