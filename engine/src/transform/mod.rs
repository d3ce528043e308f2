//! Transformation module.
//!
//! This module turns sheets into typed records:
//! - Materializer: data rows to records
//! - Join: link records into another table's list field
//! - Diagnostics: flags and per-row issues of a run
//! - Pipeline: per-run state machine and code generation

pub mod diagnostics;
pub mod join;
pub mod materializer;
pub mod pipeline;

pub use diagnostics::{Diagnostics, DiagnosticsReport, Issue};
pub use join::{resolve_joins, JoinOutcome};
pub use materializer::{asset_name, materialize, Finder, MaterializeOutput, MaterializedTable};
pub use pipeline::*;
