//! Storage error taxonomy
//!
//! Parsing never fails; reading and writing files is the only hard-failure
//! boundary. Every variant that touches the filesystem carries the path.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is not valid UTF-8: {}", path.display())]
    InvalidUtf8 { path: PathBuf },

    #[error("SQLite error in {}: {source}", path.display())]
    Database {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Invalid settings file {}: {message}", path.display())]
    Settings { path: PathBuf, message: String },

    #[error("No configuration file is loaded")]
    NoConfigLoaded,
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn database(path: &Path, source: rusqlite::Error) -> Self {
        Self::Database {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Path the failed operation was working on, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            StoreError::Io { path, .. }
            | StoreError::InvalidUtf8 { path }
            | StoreError::Database { path, .. }
            | StoreError::Settings { path, .. } => Some(path),
            StoreError::NoConfigLoaded => None,
        }
    }

    /// True when the underlying cause is a missing file
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
