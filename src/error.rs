// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for the depot
#[derive(Error, Debug)]
pub enum Error {
    /// The named parcel or recipient does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The parcel exists but nobody is queued to collect it
    #[error("No recipient queued for package {0}")]
    NoRecipient(String),

    /// The parcel has already been collected
    #[error("Package {0} has already been collected")]
    AlreadyCollected(String),

    /// A record with the same key already exists
    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// Removal attempted before the parcel was collected
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// A caller-supplied field value was rejected
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// A stored record could not be decoded
    #[error("Invalid record at {file}:{line}: {reason}")]
    InvalidRecord {
        file: String,
        line: usize,
        reason: String,
    },

    /// I/O errors against a backing file
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing file missing at bootstrap
    #[error("Depot file not found at path: {0}")]
    StoreNotFound(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn package_not_found(package_id: &str) -> Self {
        Error::NotFound(format!("Package {}", package_id))
    }

    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// True for the I/O failure class; everything else is a validation failure
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io { .. } | Error::StoreNotFound(_))
    }
}

/// Result type alias using the depot's Error type
pub type Result<T> = std::result::Result<T, Error>;
