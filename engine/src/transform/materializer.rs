//! Row materialization.
//!
//! Walks the data rows of a sheet, converts every cell of every valid field
//! and assigns it onto a fresh [`Record`] through the [`RecordType`]
//! descriptor table. Indexed `base[i]` columns grow one array field.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::diagnostics::{Diagnostics, DiagnosticsReport};
use crate::codegen::TableStrategy;
use crate::convert::{TypeRegistry, ValueType};
use crate::grid::Grid;
use crate::logs::RunLog;
use crate::models::{Record, RecordType, Value};
use crate::schema::{FieldSchema, DATA_START_ROW};
use crate::settings::ConversionSetting;

/// Looks up a record by argument values. Returns its index.
pub type Finder = Arc<dyn Fn(&[Record], &[Value]) -> Option<usize> + Send + Sync>;

/// Records of one table plus the named finders its shape provides.
#[derive(Clone)]
pub struct MaterializedTable {
    pub name: String,
    pub class_name: String,
    pub strategy: TableStrategy,
    pub record_type: RecordType,
    pub key_fields: Vec<String>,
    pub records: Vec<Record>,
    finders: BTreeMap<String, Finder>,
}

impl MaterializedTable {
    /// Dictionary tables get `Get` and `Find` on their key, searchable lists
    /// get `Find` over all keys, plain lists get nothing.
    pub fn new(
        name: impl Into<String>,
        record_type: RecordType,
        strategy: TableStrategy,
        key_fields: Vec<String>,
        records: Vec<Record>,
    ) -> Self {
        let mut table = Self {
            name: name.into(),
            class_name: record_type.name.clone(),
            strategy,
            record_type,
            key_fields,
            records,
            finders: BTreeMap::new(),
        };

        match strategy {
            TableStrategy::Dictionary => {
                let finder = key_finder(table.key_fields.iter().take(1).cloned().collect());
                table.finders.insert("Get".to_string(), finder.clone());
                table.finders.insert("Find".to_string(), finder);
            }
            TableStrategy::SearchableList => {
                let finder = key_finder(table.key_fields.clone());
                table.finders.insert("Find".to_string(), finder);
            }
            TableStrategy::PlainList => {}
        }
        table
    }

    pub fn register_finder(&mut self, name: impl Into<String>, finder: Finder) {
        self.finders.insert(name.into(), finder);
    }

    pub fn finder(&self, name: &str) -> Option<Finder> {
        self.finders.get(name).cloned()
    }

    pub fn finder_names(&self) -> Vec<&str> {
        self.finders.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for MaterializedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializedTable")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("strategy", &self.strategy)
            .field("key_fields", &self.key_fields)
            .field("records", &self.records.len())
            .field("finders", &self.finder_names())
            .finish()
    }
}

/// Finder matching every key field against the arguments in order.
fn key_finder(keys: Vec<String>) -> Finder {
    Arc::new(move |records: &[Record], args: &[Value]| {
        if args.len() != keys.len() {
            return None;
        }
        records.iter().position(|record| {
            keys.iter()
                .zip(args)
                .all(|(key, arg)| record.get(key).is_some_and(|v| v.key_eq(arg)))
        })
    })
}

/// Result of materializing one sheet.
#[derive(Debug, Clone, Default)]
pub struct MaterializeOutput {
    pub records: Vec<Record>,
    pub report: DiagnosticsReport,
    /// Data rows read, skipped ones included.
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// A schema column bound to its record field.
struct Binding<'s> {
    schema: &'s FieldSchema,
    element_type: ValueType,
}

/// Fields filled by join resolution rather than cell text.
fn is_join_filled(ty: &ValueType) -> bool {
    match ty {
        ValueType::Record(_) => true,
        ValueType::Array(inner) => is_join_filled(inner),
        _ => false,
    }
}

/// Bind valid schema columns to record fields, flagging the ones the record
/// type lacks or types differently.
fn bind_fields<'s>(
    schema: &'s [FieldSchema],
    record_type: &RecordType,
    registry: &TypeRegistry,
    report: &mut DiagnosticsReport,
) -> Vec<Binding<'s>> {
    let mut bindings = Vec::new();
    for field in schema.iter().filter(|f| f.is_valid) {
        let Some(element_type) = registry.resolve(&field.declared_type) else {
            continue;
        };
        let expected = if field.is_array_element {
            ValueType::Array(Box::new(element_type.clone()))
        } else {
            element_type.clone()
        };

        match record_type.field(&field.base_name) {
            Some(descriptor) if descriptor.value_type == expected => {
                if !is_join_filled(&expected) {
                    bindings.push(Binding {
                        schema: field,
                        element_type,
                    });
                }
            }
            Some(descriptor) => report.flag_run(
                Diagnostics::VERSION_MISMATCH,
                format!(
                    "field '{}' is {} in the sheet but {} in {}",
                    field.name, expected, descriptor.value_type, record_type.name
                ),
            ),
            None => report.flag_run(
                Diagnostics::VERSION_MISMATCH,
                format!("field '{}' does not exist on {}", field.name, record_type.name),
            ),
        }
    }
    bindings
}

/// Convert one cell. Enum fields also take a member's integer value, re-boxed
/// as the enum.
fn convert_cell(registry: &TypeRegistry, ty: &ValueType, raw: &str) -> Option<Value> {
    if let Some(value) = registry.convert(ty, raw) {
        return Some(value);
    }
    let ValueType::Enum(name) = ty else {
        return None;
    };
    let number = raw.trim().parse::<i64>().ok()?;
    let def = registry.lookup_enum(name)?;
    def.accepts_value(number).then(|| ty.rebox(Value::Int(number)))
}

/// Columns holding the configured keys, in key order. Unknown keys are
/// logged and ignored.
pub fn key_columns(schema: &[FieldSchema], keys: &[String], log: &mut RunLog) -> Vec<usize> {
    let mut columns = Vec::new();
    for key in keys {
        match schema.iter().find(|f| f.is_valid && f.base_name == *key) {
            Some(field) => columns.push(field.column),
            None => log.warning(format!("Key field '{}' not found in sheet", key)),
        }
    }
    columns
}

/// Materialize every data row of `grid`.
///
/// Never fails: rows without key values are skipped, empty or unparsable
/// cells leave the field at its zero value, and each case is recorded in
/// the returned report.
pub fn materialize(
    grid: &dyn Grid,
    schema: &[FieldSchema],
    record_type: &RecordType,
    setting: &ConversionSetting,
    registry: &TypeRegistry,
    log: &mut RunLog,
) -> MaterializeOutput {
    let mut output = MaterializeOutput::default();
    let bindings = bind_fields(schema, record_type, registry, &mut output.report);
    let keys = setting.keys();
    let key_cols = key_columns(schema, &keys, log);
    let mut asset_names: HashSet<String> = HashSet::new();

    let data = grid.row_slice(DATA_START_ROW as isize, None);
    for i in 0..data.row_count() {
        let row = DATA_START_ROW + i;
        output.rows_read += 1;

        if !key_cols.is_empty() && key_cols.iter().all(|&c| data.cell(i, c).trim().is_empty()) {
            output
                .report
                .flag_row(row, None, Diagnostics::NO_KEY_SKIP, "all key cells are empty");
            output.rows_skipped += 1;
            continue;
        }

        let mut record = record_type.instantiate();
        record.row = Some(row);
        for binding in &bindings {
            let field = binding.schema;
            let raw = data.cell(i, field.column);
            if raw.trim().is_empty() {
                output
                    .report
                    .flag_row(row, Some(field.name.as_str()), Diagnostics::EMPTY_CELL, "empty cell");
                continue;
            }

            let Some(value) = convert_cell(registry, &binding.element_type, &raw) else {
                output.report.flag_row(
                    row,
                    Some(field.name.as_str()),
                    Diagnostics::CONVERT_FAILED,
                    format!("cannot convert '{}' to {}", raw, binding.element_type),
                );
                continue;
            };
            if field.is_array_element {
                record.append(&field.base_name, value);
            } else {
                record.set(&field.base_name, value);
            }
        }

        if !record_type.pure {
            let name = asset_name(&setting.class_name, &record, &keys, row);
            if !asset_names.insert(name.clone()) {
                log.warning(format!("Duplicate asset name '{}' at row {}", name, row));
            }
            record.asset_name = Some(name);
        }
        output.records.push(record);
    }

    log.info(format!(
        "{}: {} rows read, {} records, {} skipped",
        setting.class_name,
        output.rows_read,
        output.records.len(),
        output.rows_skipped
    ));
    output
}

/// `{ClassName}_{key1}_{key2}...`, or `{ClassName}_{row}` without keys.
pub fn asset_name(class_name: &str, record: &Record, keys: &[String], row: usize) -> String {
    let mut parts = vec![class_name.to_string()];
    if keys.is_empty() {
        parts.push(row.to_string());
    } else {
        for key in keys {
            parts.push(record.get(key).map(Value::key_text).unwrap_or_default());
        }
    }
    slug(&parts.join("_"))
}

/// Keep letters, digits, `_` and `-`; collapse other runs into one `-`.
fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
