//! Error types for the conversion and code-synthesis engine.
//!
//! This module defines one error type per layer:
//!
//! - [`GridError`] - unsupported operations on tabular data views
//! - [`ConvertError`] - structurally invalid conversion requests
//! - [`SynthError`] - table synthesis with an unusable key configuration
//! - [`ProviderError`] - reading delimited files and value grids
//! - [`ConfigError`] - loading conversion settings
//! - [`StoreError`] - persisting generated records
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Ordinary bad cell data is never an error here: it is reported through
//! the diagnostics bitmask of a conversion run.

use thiserror::Error;

// =============================================================================
// Grid Errors
// =============================================================================

/// Errors raised by tabular data views.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// The view cannot perform this mutation.
    #[error("Unsupported operation on read-only view: {0}")]
    UnsupportedOperation(&'static str),
}

// =============================================================================
// Conversion Errors
// =============================================================================

/// Errors from the enum-specific conversion API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    /// No registered type carries this name.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// The type exists but is not an enumeration.
    #[error("Type '{0}' is not an enum")]
    NotAnEnum(String),

    /// A member name did not resolve on the enumeration.
    #[error("'{member}' is not a member of enum '{type_name}'")]
    UnknownMember { type_name: String, member: String },
}

// =============================================================================
// Synthesis Errors
// =============================================================================

/// Hard errors of table-class synthesis.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SynthError {
    /// A dictionary table was requested without a key.
    #[error("Dictionary table '{0}' needs exactly one key field present in the sheet")]
    MissingKey(String),

    /// A dictionary table was requested with a composite key.
    #[error("Dictionary table '{table}' needs exactly one key field, got {count}")]
    TooManyKeys { table: String, count: usize },
}

// =============================================================================
// Provider Errors
// =============================================================================

/// Errors while reading raw tabular data.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Failed to read the source.
    #[error("Failed to read source: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed delimited content.
    #[error("Invalid delimited content at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Malformed value grid.
    #[error("Invalid value grid: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading or querying the converter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration is not valid JSON for the settings model.
    #[error("Invalid configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// No setting with this class name.
    #[error("Setting not found: {0}")]
    UnknownSetting(String),

    /// A setting has no data source to read from.
    #[error("Setting '{0}' has no source")]
    MissingSource(String),
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Asset not found.
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("Store IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Store JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// Wraps every lower-level error so `?` works across layer boundaries.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Grid error.
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    /// Conversion error.
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// Synthesis error.
    #[error("Synthesis error: {0}")]
    Synth(#[from] SynthError),

    /// Provider error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The sheet has no name row or no type row.
    #[error("Sheet for '{0}' has no header and type rows")]
    MissingHeader(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for grid operations.
pub type GridResult<T> = Result<T, GridError>;

/// Result type for enum conversion.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Result type for synthesis.
pub type SynthResult<T> = Result<T, SynthError>;

/// Result type for providers.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for the record store.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let synth_err = SynthError::TooManyKeys {
            table: "ItemTable".into(),
            count: 2,
        };
        let pipeline_err: PipelineError = synth_err.into();
        assert!(pipeline_err.to_string().contains("ItemTable"));

        let grid_err = GridError::UnsupportedOperation("set_from_list");
        let pipeline_err: PipelineError = grid_err.into();
        assert!(pipeline_err.to_string().contains("set_from_list"));
    }

    #[test]
    fn test_unknown_member_format() {
        let err = ConvertError::UnknownMember {
            type_name: "Element".into(),
            member: "Plasma".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Plasma"));
        assert!(msg.contains("Element"));
    }
}
