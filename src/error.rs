//! Error handling.

use std::error::Error;
use thiserror::Error;
use tracing::{event, Level};

/// Binning error type
///
/// This type encapsulates the various errors that may occur while configuring or running a
/// binning job. Variants fall into three families: configuration errors which abort the job
/// before any partition runs, partition I/O errors which fail a single partition task, and codec
/// errors which indicate corrupted spill or shuffle data.
#[derive(Debug, Error)]
pub enum BinningError {
    /// Invalid grid definition
    #[error("invalid grid: {reason}")]
    InvalidGrid { reason: String },

    /// Aggregator type not present in the registry
    #[error("unknown aggregator type {type_name} (aggregator {index})")]
    UnknownAggregator { index: usize, type_name: String },

    /// Aggregator parameter missing or not parseable
    #[error("invalid parameter {parameter}={value:?} for aggregator {type_name}: {reason}")]
    InvalidAggregatorParameter {
        type_name: String,
        parameter: String,
        value: String,
        reason: String,
    },

    /// Aggregator refers to a variable that is not configured
    #[error("aggregator {type_name} refers to unknown variable {variable}")]
    UnknownVariable { type_name: String, variable: String },

    /// No regions configured
    #[error("region list must not be empty")]
    EmptyRegionList,

    /// Region geometry could not be used
    #[error("invalid geometry for region {name}: {reason}")]
    InvalidRegion { name: String, reason: String },

    /// Error validating job configuration (single error)
    #[error("job configuration is not valid")]
    ConfigValidationSingle(#[from] validator::ValidationError),

    /// Error validating job configuration (multiple errors)
    #[error("job configuration is not valid")]
    ConfigValidation(#[from] validator::ValidationErrors),

    /// Job configuration is not well formed JSON or does not match the schema
    #[error("failed to parse job configuration")]
    ConfigParse(#[source] serde_json::Error),

    /// Error (de)serialising JSON
    #[error("failed to parse JSON")]
    Json(#[from] serde_json::Error),

    /// Partition could not be opened or read
    #[error("failed to read partition {partition}")]
    PartitionIo {
        partition: String,
        #[source]
        source: std::io::Error,
    },

    /// Observation record could not be parsed
    #[error("invalid observation in partition {partition} at line {line}")]
    ObservationParse {
        partition: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Encoded bin feature count does not match the job's aggregators
    #[error("feature count mismatch decoding bin: expected {expected}, found {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    /// Encoded bin data ended prematurely
    #[error("truncated bin data: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// Error writing region output
    #[error("failed to write output for region {region}")]
    Output {
        region: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O error
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Error converting between integer types
    #[error(transparent)]
    TryFromInt(#[from] std::num::TryFromIntError),
}

impl BinningError {
    /// Whether this error is a configuration error, i.e. fatal at job setup.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            BinningError::InvalidGrid { .. }
                | BinningError::UnknownAggregator { .. }
                | BinningError::InvalidAggregatorParameter { .. }
                | BinningError::UnknownVariable { .. }
                | BinningError::EmptyRegionList
                | BinningError::InvalidRegion { .. }
                | BinningError::ConfigParse(_)
                | BinningError::ConfigValidationSingle(_)
                | BinningError::ConfigValidation(_)
        )
    }

    /// Whether this error is a codec error.
    pub fn is_codec_error(&self) -> bool {
        matches!(
            self,
            BinningError::FeatureCountMismatch { .. } | BinningError::Truncated { .. }
        )
    }
}

/// Log an error followed by each error in its source chain.
pub fn log_error_chain(error: &BinningError) {
    event!(Level::ERROR, "{}", error.to_string());
    let mut current = error.source();
    while let Some(source) = current {
        event!(Level::ERROR, "Caused by: {}", source.to_string());
        current = source.source();
    }
}

/// Collect the messages of an error and its causes, removing consecutive duplicates.
pub fn error_messages(error: &BinningError) -> Vec<String> {
    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(source) = current {
        messages.push(source.to_string());
        current = source.source();
    }
    messages.dedup();
    messages
}
