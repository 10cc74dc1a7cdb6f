use core::result::Result as CoreResult;
use std::io::Error as IoError;
use std::path::PathBuf;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;
use toml::ser::Error as TomlSerError;

/// Result type for matrix generation and collection.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur while loading inputs or running fixtures.
///
/// Unsatisfied requirements are never errors; providers that fail to
/// resolve a path are excluded from the matrix instead.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// TOML serialization failed.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] TomlSerError),

    /// A requirement path was empty or contained an empty segment.
    #[error("Invalid requirement path: {0}")]
    InvalidRequirement(String),

    /// An inventory entry could not be read as a provider.
    #[error("Invalid provider entry: {0}")]
    InvalidProvider(String),

    /// A document had an extension that is neither JSON nor TOML.
    #[error("Unsupported document format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A fixture failed during setup or teardown.
    #[error("Fixture '{fixture}' failed: {message}")]
    Fixture {
        /// Name of the failing fixture
        fixture: String,
        /// Failure description
        message: String,
    },

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a fixture error.
    pub fn fixture(fixture: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fixture {
            fixture: fixture.into(),
            message: message.into(),
        }
    }

    /// Whether the error came from loading input documents rather than from
    /// running fixtures.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Json(_) | Self::Toml(_) | Self::UnsupportedFormat(_)
        )
    }
}
