//! Error type for catalog ingestion and catalog access.
//!
//! Two families share one enum. Ingestion errors ([`CatalogError::is_ingestion`])
//! are scoped to a single source file: the builder logs them and moves on.
//! [`CatalogError::Output`] covers the builder's own files and stops the build.
//! Store errors mean a tier file cannot be trusted, and reach the caller as
//! [`CatalogError::CatalogUnavailable`] so an unreadable catalog never looks
//! like an empty patch of sky.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the staging area or the tier files failed. Aborts a build.
    #[error("Cannot write build output {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source catalog header cannot be parsed.
    #[error("Malformed header in {source_name}: {message}")]
    MalformedHeader { source_name: String, message: String },

    /// Source catalog ends partway through a 12-byte record.
    #[error("Truncated record in {source_name}: {trailing} trailing bytes after {records} records")]
    TruncatedRecord {
        source_name: String,
        records: u64,
        trailing: usize,
    },

    /// A tier file is missing, unreadable, or fails validation.
    #[error("Catalog unavailable at {path}: {message}")]
    CatalogUnavailable { path: PathBuf, message: String },

    /// Build request that cannot produce any catalog.
    #[error("Invalid build: {0}")]
    InvalidBuild(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn output(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn malformed_header(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedHeader {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn truncated_record(source_name: impl Into<String>, records: u64, trailing: usize) -> Self {
        Self::TruncatedRecord {
            source_name: source_name.into(),
            records,
            trailing,
        }
    }

    pub fn unavailable(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::CatalogUnavailable {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn invalid_build(message: impl Into<String>) -> Self {
        Self::InvalidBuild(message.into())
    }

    /// True for errors that only invalidate one source file.
    pub fn is_ingestion(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::MalformedHeader { .. } | Self::TruncatedRecord { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingestion_classification() {
        assert!(CatalogError::malformed_header("a.GSC", "short").is_ingestion());
        assert!(CatalogError::truncated_record("a.GSC", 3, 5).is_ingestion());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(CatalogError::io("a.GSC", io).is_ingestion());

        assert!(!CatalogError::unavailable("hp48.cat", "bad magic").is_ingestion());
        let full = std::io::Error::new(std::io::ErrorKind::Other, "no space left on device");
        assert!(!CatalogError::output("part_000001.bin.tmp", full).is_ingestion());
        assert!(!CatalogError::invalid_build("no files").is_ingestion());
    }

    #[test]
    fn test_messages() {
        let err = CatalogError::truncated_record("0001.GSC", 10, 7);
        assert_eq!(
            err.to_string(),
            "Truncated record in 0001.GSC: 7 trailing bytes after 10 records"
        );

        let err = CatalogError::unavailable("/data/hp48.cat", "Invalid catalog magic");
        assert!(err.to_string().starts_with("Catalog unavailable at /data/hp48.cat"));
    }

    #[test]
    fn test_send_sync() {
        fn _assert_send<T: Send>() {}
        fn _assert_sync<T: Sync>() {}
        _assert_send::<CatalogError>();
        _assert_sync::<CatalogError>();
    }
}
