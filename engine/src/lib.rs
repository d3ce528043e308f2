//! # Sheetforge - spreadsheet to typed records and generated sources
//!
//! Sheetforge reads tabular sheets (delimited files or fetched value grids)
//! whose first two rows declare field names and types, converts every cell to
//! a typed value, links records across sheets and synthesizes record, table
//! and enum source files from templates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  Provider   │────▶│  GridView   │────▶│ Materializer │────▶│   Records   │
//! │ (file/JSON) │     │ (zero-copy) │     │  + Joins     │     │  + Store    │
//! └─────────────┘     └─────────────┘     └──────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │   Schema    │────▶│ Synthesizer │──▶ generated sources
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sheetforge::{ConverterConfig, Pipeline};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut pipeline = Pipeline::new(ConverterConfig::from_file("sheetforge.json")?);
//!     for output in pipeline.convert_all()? {
//!         println!("{}", output.summary());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`grid`] - Tabular data and zero-copy views
//! - [`parser`] - Delimited text with encoding detection
//! - [`provider`] - Where sheets come from
//! - [`convert`] - Cell text to typed values
//! - [`schema`] - Field schema from the header rows
//! - [`models`] - Values, record types and records
//! - [`codegen`] - Template-driven source synthesis
//! - [`transform`] - Materialization, joins, diagnostics and pipeline
//! - [`store`] - Persisted record assets

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Tabular data
pub mod grid;
pub mod parser;
pub mod provider;

// Typing
pub mod convert;
pub mod schema;
pub mod settings;

// Generation
pub mod codegen;

// Transformation
pub mod transform;

// Persistence
pub mod store;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ConvertError, GridError, PipelineError, PipelineResult, ProviderError,
    StoreError, SynthError,
};

// =============================================================================
// Re-exports - Grid
// =============================================================================

pub use grid::{Grid, GridView, OwnedGrid};

pub use parser::{from_delimited_string, parse_bytes_auto, parse_file_auto, ParsedSheet};

pub use provider::{provider_for, DataProvider, FileProvider, SheetValuesProvider};

// =============================================================================
// Re-exports - Types and models
// =============================================================================

pub use convert::{CompositeKind, EnumDef, EnumMember, TypeRegistry, ValueType};

pub use models::{Record, RecordType, Value};

pub use schema::{derive_schema, FieldSchema};

// =============================================================================
// Re-exports - Settings
// =============================================================================

pub use settings::{
    example_config, ConversionSetting, ConverterConfig, JoinSetting, OutputKind, SourceSpec,
    TableKind,
};

// =============================================================================
// Re-exports - Code generation
// =============================================================================

pub use codegen::{Synthesizer, TableStrategy, TemplateLocator};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    ConversionOutput, Diagnostics, DiagnosticsReport, GeneratedSource, MaterializedTable,
    Pipeline, RunState,
};

pub use logs::{LogEntry, LogLevel, RunLog};

pub use store::{AssetKind, JsonRecordStore, RecordStore, StoredAsset};
