//! Error types for the datasources crate.

use std::path::PathBuf;

use aa_common::AaError;
use grid_processor::GridError;
use thiserror::Error;

/// Errors that can occur while acquiring or processing a dataset.
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error(transparent)]
    Validation(#[from] AaError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(
        "Existing table columns [{found}] do not match requested columns [{expected}]; \
         reprocess with overwrite to replace the table"
    )]
    SchemaMismatch { expected: String, found: String },

    #[error("Cannot open {}. {hint}", path.display())]
    ArtifactNotFound { path: PathBuf, hint: String },

    #[error("No data available upstream for {0}")]
    RemoteFetchGap(String),

    #[error("Remote request failed: {0}")]
    Remote(String),

    #[error("Failed to read or write file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DataSourceError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Validation(AaError::configuration(msg))
    }

    pub fn not_found(path: impl Into<PathBuf>, hint: impl Into<String>) -> Self {
        Self::ArtifactNotFound {
            path: path.into(),
            hint: hint.into(),
        }
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Upstream has nothing for this period; the period is skipped, not failed.
    pub fn is_period_gap(&self) -> bool {
        matches!(self, Self::RemoteFetchGap(_))
    }
}

/// Result type for datasource operations.
pub type Result<T> = std::result::Result<T, DataSourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_keep_typed_causes() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(DataSourceError::from(io), DataSourceError::Io(_)));

        let yaml = serde_yaml::from_str::<u32>("[").unwrap_err();
        assert!(matches!(DataSourceError::from(yaml), DataSourceError::Yaml(_)));

        let json = serde_json::from_str::<u32>("{").unwrap_err();
        assert!(matches!(DataSourceError::from(json), DataSourceError::Json(_)));
    }

    #[test]
    fn test_only_fetch_gaps_are_period_gaps() {
        assert!(DataSourceError::RemoteFetchGap("2020-d01".into()).is_period_gap());
        assert!(!DataSourceError::remote("timeout").is_period_gap());
        assert!(!DataSourceError::not_found("/tmp/x.tif", "run download() first").is_period_gap());
    }
}
