//! Error type for chart rendering.
//!
//! Nothing that merely filters an object out of the chart is an error: a
//! planet without samples, a line outside the band, a point past the rim are
//! all dropped silently. What remains is catalog failure, unusable
//! coordinates, and static data that cannot be loaded.

use starchart_catalog::CatalogError;
use starchart_core::CoordError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Coordinate(#[from] CoordError),

    #[error("Transient body table {path}: {message}")]
    TransientTable { path: PathBuf, message: String },

    #[error("Constellation lines {path}: {message}")]
    Lines { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type ChartResult<T> = Result<T, ChartError>;

impl ChartError {
    pub fn transient_table(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::TransientTable {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn lines(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Lines {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True when the tier files could not be used.
    pub fn is_catalog_unavailable(&self) -> bool {
        matches!(self, Self::Catalog(CatalogError::CatalogUnavailable { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_unavailable_passes_through() {
        let err: ChartError = CatalogError::unavailable("/x/hp48.cat", "bad magic").into();
        assert!(err.is_catalog_unavailable());
        assert!(err.to_string().starts_with("Catalog unavailable at /x/hp48.cat"));

        let err: ChartError = CatalogError::invalid_build("empty").into();
        assert!(!err.is_catalog_unavailable());
    }

    #[test]
    fn test_coordinate_error_conversion() {
        let err: ChartError = CoordError::invalid_coordinate("abc", "not an angle").into();
        assert!(matches!(err, ChartError::Coordinate(_)));
        assert_eq!(err.to_string(), "Invalid coordinate 'abc': not an angle");
    }

    #[test]
    fn test_messages() {
        let err = ChartError::lines("lines.csv", "record 3: expected 4 fields");
        assert_eq!(
            err.to_string(),
            "Constellation lines lines.csv: record 3: expected 4 fields"
        );
        let err = ChartError::config("latitude 91 out of range");
        assert_eq!(err.to_string(), "Configuration error: latitude 91 out of range");
    }
}
