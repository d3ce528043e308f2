//! High-level pipeline API for sheet conversion and code generation.
//!
//! A [`Pipeline`] owns the configuration, the type registry built from it
//! and the catalog of tables materialized so far. Each conversion run walks
//! one setting through a small state machine:
//!
//! ```text
//! Idle -> Materializing -> Joining (join settings only) -> Aggregating -> Done
//! ```
//!
//! Per-row problems become diagnostics; only configuration, I/O and the
//! dictionary key errors stop a run.
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetforge::{ConverterConfig, JsonRecordStore, Pipeline};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConverterConfig::from_file("sheetforge.json")?;
//!     let mut pipeline = Pipeline::new(config);
//!
//!     let outputs = pipeline.convert_all()?;
//!     let mut store = JsonRecordStore::new();
//!     pipeline.persist(&outputs, &mut store)?;
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::diagnostics::{Diagnostics, DiagnosticsReport};
use super::join::{resolve_joins, JoinOutcome};
use super::materializer::{materialize, MaterializedTable};
use crate::codegen::{members_from_grid, Synthesizer, TableStrategy, TemplateLocator};
use crate::convert::{EnumDef, TypeRegistry};
use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::grid::Grid;
use crate::logs::RunLog;
use crate::models::{Record, RecordType};
use crate::provider::provider_for;
use crate::schema::{derive_schema, key_fields, DATA_START_ROW};
use crate::settings::{ConversionSetting, ConverterConfig, OutputKind};
use crate::store::RecordStore;

/// Step of one conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Materializing,
    Joining,
    Aggregating,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Materializing => "materializing",
            RunState::Joining => "joining",
            RunState::Aggregating => "aggregating",
            RunState::Done => "done",
        };
        f.write_str(name)
    }
}

fn advance(state: &mut RunState, next: RunState, class_name: &str) {
    tracing::debug!(class = class_name, from = %state, to = %next, "run state");
    *state = next;
}

/// Result of converting one setting.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub class_name: String,
    pub state: RunState,
    pub record_type: Option<RecordType>,
    /// Records as materialized, before any later join appended to them.
    pub records: Vec<Record>,
    /// Set for enum settings.
    pub enum_def: Option<EnumDef>,
    pub join: Option<JoinOutcome>,
    /// Materialization and join diagnostics combined.
    pub report: DiagnosticsReport,
    pub log: RunLog,
}

impl ConversionOutput {
    fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            state: RunState::Idle,
            record_type: None,
            records: Vec::new(),
            enum_def: None,
            join: None,
            report: DiagnosticsReport::new(),
            log: RunLog::new(),
        }
    }

    /// Get summary statistics
    pub fn summary(&self) -> String {
        match &self.enum_def {
            Some(def) => format!("{}: enum with {} members", self.class_name, def.members.len()),
            None => format!(
                "{}: {} records, {}",
                self.class_name,
                self.records.len(),
                self.report.summary()
            ),
        }
    }
}

/// One generated source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSource {
    pub file_name: String,
    pub text: String,
}

/// Tables materialized so far, by record class name.
#[derive(Debug, Default)]
pub struct TableCatalog {
    tables: BTreeMap<String, MaterializedTable>,
}

impl TableCatalog {
    pub fn insert(&mut self, class_name: impl Into<String>, table: MaterializedTable) {
        self.tables.insert(class_name.into(), table);
    }

    pub fn get(&self, class_name: &str) -> Option<&MaterializedTable> {
        self.tables.get(class_name)
    }

    pub fn get_mut(&mut self, class_name: &str) -> Option<&mut MaterializedTable> {
        self.tables.get_mut(class_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MaterializedTable)> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Conversion and code generation over a configuration.
pub struct Pipeline {
    config: ConverterConfig,
    registry: TypeRegistry,
    synthesizer: Synthesizer,
    catalog: TableCatalog,
}

impl Pipeline {
    pub fn new(config: ConverterConfig) -> Self {
        let registry = config.type_registry();
        let synthesizer = Synthesizer::new(TemplateLocator::new(config.template_dir.as_deref()));
        Self {
            config,
            registry,
            synthesizer,
            catalog: TableCatalog::default(),
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Synthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut TableCatalog {
        &mut self.catalog
    }

    /// Settings in run order: enums, then plain sheets, then joins, each
    /// group in configuration order.
    fn ordered_settings(&self) -> Vec<ConversionSetting> {
        let rank = |s: &ConversionSetting| match (s.output, s.is_join()) {
            (OutputKind::Enum, _) => 0,
            (_, false) => 1,
            (_, true) => 2,
        };
        let mut settings = self.config.settings.clone();
        settings.sort_by_key(rank);
        settings
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Read a setting's source and convert it.
    pub fn convert_setting(&mut self, setting: &ConversionSetting) -> PipelineResult<ConversionOutput> {
        let source = setting
            .source
            .as_ref()
            .ok_or_else(|| ConfigError::MissingSource(setting.class_name.clone()))?;
        let provider = provider_for(source)?;
        let view = provider.data();
        self.convert_grid(setting, &view)
    }

    /// Convert every configured setting in run order.
    pub fn convert_all(&mut self) -> PipelineResult<Vec<ConversionOutput>> {
        let mut outputs = Vec::new();
        for setting in self.ordered_settings() {
            outputs.push(self.convert_setting(&setting)?);
        }
        Ok(outputs)
    }

    /// Convert one sheet.
    ///
    /// Enum settings register their enumeration. Table settings add their
    /// table to the catalog, where later join settings can find it.
    pub fn convert_grid(&mut self, setting: &ConversionSetting, grid: &dyn Grid) -> PipelineResult<ConversionOutput> {
        let mut output = ConversionOutput::new(&setting.class_name);
        let class_name = setting.class_name.as_str();

        if setting.output == OutputKind::Enum {
            advance(&mut output.state, RunState::Materializing, class_name);
            let def = self.register_enum_sheet(setting, grid);
            output.log.success(format!("{}: {} enum members", class_name, def.members.len()));
            output.enum_def = Some(def);
            advance(&mut output.state, RunState::Done, class_name);
            return Ok(output);
        }

        if grid.row_count() < DATA_START_ROW {
            return Err(PipelineError::MissingHeader(setting.class_name.clone()));
        }

        advance(&mut output.state, RunState::Materializing, class_name);
        output.log.info(format!("Converting {} ({} rows)", class_name, grid.row_count()));
        let schema = derive_schema(grid, &self.registry);
        let record_type = RecordType::from_schema(class_name, &schema, &self.registry, setting.is_pure_class());
        let materialized = materialize(grid, &schema, &record_type, setting, &self.registry, &mut output.log);
        output.report.merge(materialized.report);
        output.records = materialized.records;

        if let Some(join) = &setting.join {
            advance(&mut output.state, RunState::Joining, class_name);
            match self.catalog.get_mut(&join.target_table) {
                Some(target) => {
                    let outcome = resolve_joins(join, &record_type, &output.records, target);
                    output.log.info(format!(
                        "Joined {} of {} {} records into {}",
                        outcome.resolved, outcome.processed, class_name, target.name
                    ));
                    output.report.merge(outcome.report.clone());
                    output.join = Some(outcome);
                }
                None => {
                    output.log.error(format!(
                        "Join target '{}' has not been converted",
                        join.target_table
                    ));
                    output.report.flag_run(
                        Diagnostics::JOIN_NO_REFERENCE_ROW,
                        format!("join target table '{}' not available", join.target_table),
                    );
                }
            }
        }

        if setting.output == OutputKind::Table {
            let keys = setting.keys();
            let strategy = TableStrategy::select(setting, &key_fields(&schema, &keys))?;
            let table = MaterializedTable::new(
                setting.table_asset_name(),
                record_type.clone(),
                strategy,
                keys,
                output.records.clone(),
            );
            self.catalog.insert(setting.class_name.clone(), table);
        }

        advance(&mut output.state, RunState::Aggregating, class_name);
        if output.report.flags.any() {
            output
                .log
                .warning(format!("{}: {}", class_name, output.report.summary()));
        } else {
            output.log.success(format!("{}: {} records", class_name, output.records.len()));
        }
        output.record_type = Some(record_type);
        advance(&mut output.state, RunState::Done, class_name);
        Ok(output)
    }

    /// Register the enumeration an enum sheet defines.
    pub fn register_enum_sheet(&mut self, setting: &ConversionSetting, grid: &dyn Grid) -> EnumDef {
        let members = members_from_grid(grid);
        let def = if setting.enum_flags {
            EnumDef::flags(setting.class_name.clone(), members)
        } else {
            EnumDef::new(setting.class_name.clone(), members)
        };
        self.registry.register_enum(def.clone());
        def
    }

    /// Read and register every enum sheet. Returns how many were loaded.
    pub fn load_enum_sheets(&mut self) -> PipelineResult<usize> {
        let enums: Vec<ConversionSetting> = self
            .config
            .settings
            .iter()
            .filter(|s| s.output == OutputKind::Enum)
            .cloned()
            .collect();
        for setting in &enums {
            self.convert_setting(setting)?;
        }
        Ok(enums.len())
    }

    /// Hand records and tables to the store.
    ///
    /// Persisted records are saved one asset each; tables are saved whole,
    /// joined rows included. Returns the number of assets written.
    pub fn persist(&self, outputs: &[ConversionOutput], store: &mut dyn RecordStore) -> PipelineResult<usize> {
        let mut saved = 0;
        for output in outputs {
            let Some(setting) = self.config.settings.iter().find(|s| s.class_name == output.class_name) else {
                continue;
            };
            if output.enum_def.is_some() || setting.is_pure_class() {
                continue;
            }
            for record in &output.records {
                store.save_record(record)?;
                saved += 1;
            }
        }

        for setting in self.config.settings.iter().filter(|s| s.output == OutputKind::Table && !s.is_join()) {
            if let Some(table) = self.catalog.get(&setting.class_name) {
                store.save_table(&setting.table_asset_name(), table)?;
                saved += 1;
            }
        }
        Ok(saved)
    }

    // =========================================================================
    // Code generation
    // =========================================================================

    /// Source files for one sheet.
    pub fn generate_sources(&self, setting: &ConversionSetting, grid: &dyn Grid) -> PipelineResult<Vec<GeneratedSource>> {
        let class_name = setting.class_name.as_str();

        if setting.output == OutputKind::Enum {
            let def = match self.registry.lookup_enum(class_name) {
                Some(def) if def.name == class_name => def.clone(),
                _ => EnumDef::new(class_name, members_from_grid(grid)),
            };
            return Ok(vec![GeneratedSource {
                file_name: format!("{}.cs", class_name),
                text: self.synthesizer.generate_enum(class_name, &def.members, setting.enum_flags),
            }]);
        }

        if grid.row_count() < DATA_START_ROW {
            return Err(PipelineError::MissingHeader(setting.class_name.clone()));
        }

        let schema = derive_schema(grid, &self.registry);
        let mut sources = vec![GeneratedSource {
            file_name: format!("{}.cs", class_name),
            text: self
                .synthesizer
                .generate_record_class(class_name, &schema, setting.is_pure_class()),
        }];

        if setting.output == OutputKind::Table {
            let table_class_name = setting.table_class_name();
            let keys = key_fields(&schema, &setting.keys());
            sources.push(GeneratedSource {
                file_name: format!("{}.cs", table_class_name),
                text: self
                    .synthesizer
                    .generate_table_class(setting, &table_class_name, &keys)?,
            });
        }
        Ok(sources)
    }

    /// Source files for every configured setting, enum sheets first.
    pub fn generate_all(&mut self) -> PipelineResult<Vec<GeneratedSource>> {
        self.load_enum_sheets()?;

        let mut sources = Vec::new();
        for setting in self.ordered_settings() {
            let source = setting
                .source
                .as_ref()
                .ok_or_else(|| ConfigError::MissingSource(setting.class_name.clone()))?;
            let provider = provider_for(source)?;
            let view = provider.data();
            sources.extend(self.generate_sources(&setting, &view)?);
        }
        Ok(sources)
    }
}
