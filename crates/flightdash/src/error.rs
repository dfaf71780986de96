//! Error types for flightdash.
//!
//! This module defines all error types used throughout the flightdash crate.
//! Only loading and malformed queries fail; empty filter results and missing
//! comparison periods are ordinary values, not errors.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flightdash operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Dataset Errors ===
    /// A dataset file could not be read.
    #[error("failed to read dataset at {path}: {source}")]
    DatasetRead {
        /// Path to the dataset file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A remote dataset could not be fetched.
    #[error("failed to fetch dataset from {url}: {source}")]
    DatasetFetch {
        /// URL of the dataset.
        url: String,
        /// The underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// A dataset row could not be decoded.
    #[error("invalid row {row} in {source_name}: {message}")]
    DatasetRow {
        /// Display name of the source (path or URL).
        source_name: String,
        /// 1-based data row number (header excluded).
        row: u64,
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Query Errors ===
    /// A dimension name was not recognised.
    #[error("unknown dimension '{0}'")]
    UnknownDimension(String),

    /// A measure name was not recognised.
    #[error("unknown measure '{0}'")]
    UnknownMeasure(String),

    /// A filter value cannot belong to the dimension's domain.
    #[error("invalid value '{value}' for dimension {dimension}")]
    InvalidFilterValue {
        /// The dimension being constrained.
        dimension: &'static str,
        /// The rejected value.
        value: String,
    },

    /// An aggregation was requested without any group key.
    #[error("group key must name at least one dimension")]
    EmptyGroupKey,
}

/// A specialized Result type for flightdash operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a row decoding error.
    #[must_use]
    pub fn dataset_row(
        source_name: impl Into<String>,
        row: u64,
        message: impl Into<String>,
    ) -> Self {
        Self::DatasetRow {
            source_name: source_name.into(),
            row,
            message: message.into(),
        }
    }

    /// Create an invalid filter value error.
    #[must_use]
    pub fn invalid_filter_value(dimension: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidFilterValue {
            dimension,
            value: value.into(),
        }
    }

    /// Check if this error was caused by the dataset rather than the query.
    #[must_use]
    pub fn is_dataset_error(&self) -> bool {
        matches!(
            self,
            Self::DatasetRead { .. } | Self::DatasetFetch { .. } | Self::DatasetRow { .. }
        )
    }

    /// Check if this error is a malformed query.
    #[must_use]
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownDimension(_)
                | Self::UnknownMeasure(_)
                | Self::InvalidFilterValue { .. }
                | Self::EmptyGroupKey
        )
    }

    /// A short hint on how to recover, for dataset and query errors.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        if self.is_query_error() {
            Some("run `flightdash options` to list the accepted filter values")
        } else if self.is_dataset_error() {
            Some("check the --cancellations/--routes sources or `flightdash config show`")
        } else {
            None
        }
    }
}
