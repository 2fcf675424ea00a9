//! Error types for the iggy enrichment crates.
//!
//! This crate provides:
//! - [`IggyError`] - Top-level error enum shared by all crates
//! - Domain-specific errors ([`PackageError`], [`SchemaError`], [`ValidationError`])
//!
//! A row that falls outside boundary coverage is not an error: lookups that
//! miss produce null feature values and the row is kept. Errors are reserved
//! for absent data, malformed schemas, and invalid requests.

use thiserror::Error;

/// Top-level error type for iggy enrichment.
#[derive(Error, Debug)]
pub enum IggyError {
    /// Package access errors (layout, listing, storage)
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// Schema errors (missing columns, decode failures, wrong types)
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Validation errors (bad selections, unusable inputs)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Package access errors.
#[derive(Error, Debug)]
pub enum PackageError {
    /// Package root, dataset directory, or partition files not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object store operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// URI could not be parsed
    #[error("Invalid URI: {0}")]
    InvalidUri(String),
}

/// Dataset schema errors.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A required column is absent from a dataset
    #[error("Column '{column}' not found in {dataset}")]
    MissingColumn { column: String, dataset: String },

    /// Parquet or Arrow decode failed
    #[error("Decode failed: {0}")]
    Decode(String),

    /// A column has an unusable type
    #[error("Column '{column}' has type {actual}, expected {expected}")]
    Type {
        column: String,
        expected: String,
        actual: String,
    },
}

/// Request validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Boundary name is not recognized or not present in the package
    #[error("Unknown or unavailable boundary: {0}")]
    UnknownBoundary(String),

    /// Feature name matches no catalog entry
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// Requested boundary has no loaded feature table
    #[error("Boundary not loaded: {0}")]
    BoundaryNotLoaded(String),

    /// None of the configured identifier columns exist in the input
    #[error("No identifier columns found in input (configured: {0})")]
    NoIdentifier(String),

    /// A configured identifier column is absent from the input
    #[error("Identifier column '{column}' not found in input")]
    MissingColumn { column: String },

    /// An enrichment output column would shadow an existing input column
    #[error("Output column '{column}' already exists in input")]
    ColumnCollision { column: String },
}

/// Result type alias using IggyError.
pub type Result<T> = std::result::Result<T, IggyError>;
