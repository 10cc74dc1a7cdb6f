//! Fixture loading and discovery utilities

use anyhow::{Context as _, Result};
use serde_json::from_str;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::fixture::MatrixFixture;

/// Load a matrix fixture from a JSON file
///
/// # Errors
/// Returns error if file reading or parsing fails
pub fn load_fixture(path: &Path) -> Result<MatrixFixture> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    from_str(&content).with_context(|| format!("Failed to parse fixture {}", path.display()))
}

/// Discover all fixtures below `dir`, sorted by path
///
/// # Errors
/// Returns error if directory reading fails
pub fn discover_fixtures(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut fixtures = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.context("Failed to read fixture directory")?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            fixtures.push(path.to_path_buf());
        }
    }
    fixtures.sort();
    Ok(fixtures)
}
