//! Join resolution.
//!
//! Links each local record into a list field of a row in an already
//! materialized target table. The target row is found through one of the
//! table's named finders.

use serde::{Deserialize, Serialize};

use super::diagnostics::{Diagnostics, DiagnosticsReport};
use super::materializer::MaterializedTable;
use crate::models::{Record, RecordType, Value};
use crate::settings::JoinSetting;

/// Counts and diagnostics of one join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    /// Local records a lookup was attempted for.
    pub processed: usize,
    /// Local records appended to a target row.
    pub resolved: usize,
    pub report: DiagnosticsReport,
}

/// Append every local record to the target row its key finds.
///
/// The target table is the only thing mutated. Problems are flagged and the
/// join carries on with the next record.
pub fn resolve_joins(
    join: &JoinSetting,
    local_type: &RecordType,
    local: &[Record],
    target: &mut MaterializedTable,
) -> JoinOutcome {
    let mut outcome = JoinOutcome::default();

    let missing: Vec<String> = [
        (&target.record_type, &join.target_key_field),
        (&target.record_type, &join.target_list_field),
        (local_type, &join.local_key_field),
    ]
    .iter()
    .filter(|(ty, field)| ty.field(field).is_none())
    .map(|(ty, field)| format!("{}.{}", ty.name, field))
    .collect();
    if !missing.is_empty() {
        outcome.report.flag_run(
            Diagnostics::VERSION_MISMATCH,
            format!("join fields missing: {}", missing.join(", ")),
        );
        return outcome;
    }

    let finder = target.finder(&join.target_find_method);
    for record in local {
        let Some(finder) = &finder else {
            outcome.report.flag_record(
                record.row,
                Some(join.local_key_field.as_str()),
                Diagnostics::JOIN_NO_FIND_METHOD,
                format!(
                    "{} has no finder '{}'",
                    target.name, join.target_find_method
                ),
            );
            continue;
        };

        outcome.processed += 1;
        let key = record.get(&join.local_key_field).cloned().unwrap_or(Value::Null);
        let found = if key.is_null() {
            None
        } else {
            finder(&target.records, std::slice::from_ref(&key))
        };

        match found {
            Some(row) => {
                target.records[row].append(&join.target_list_field, Value::Record(Box::new(record.clone())));
                outcome.resolved += 1;
            }
            None => outcome.report.flag_record(
                record.row,
                Some(join.local_key_field.as_str()),
                Diagnostics::JOIN_NO_REFERENCE_ROW,
                format!("no {} row for key '{}'", target.name, key.key_text()),
            ),
        }
    }

    if outcome.processed != outcome.resolved {
        outcome.report.flag_run(
            Diagnostics::JOIN_INDEX_MISMATCH,
            format!(
                "{} of {} references resolved into {}",
                outcome.resolved, outcome.processed, target.name
            ),
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::TableStrategy;
    use crate::convert::ValueType;
    use std::sync::Arc;

    const DATA_ROW: usize = 2;

    fn drop_type() -> RecordType {
        RecordType::new("ItemDrop", true)
            .with_field("item_id", ValueType::Int)
            .with_field("chance", ValueType::Float)
    }

    fn item_table() -> MaterializedTable {
        let item_type = RecordType::new("Item", false)
            .with_field("id", ValueType::Int)
            .with_field(
                "drops",
                ValueType::Array(Box::new(ValueType::Record("ItemDrop".into()))),
            );
        let records = (1..=2)
            .map(|id| {
                let mut r = item_type.instantiate();
                r.set("id", Value::Int(id));
                r
            })
            .collect();
        MaterializedTable::new("ItemTable", item_type, TableStrategy::Dictionary, vec!["id".into()], records)
    }

    fn drops(ids: &[i64]) -> Vec<Record> {
        ids.iter()
            .enumerate()
            .map(|(i, &id)| {
                let mut r = drop_type().instantiate();
                r.set("item_id", Value::Int(id));
                r.set("chance", Value::Float(0.5));
                r.row = Some(DATA_ROW + i);
                r
            })
            .collect()
    }

    fn join(method: &str) -> JoinSetting {
        JoinSetting {
            target_table: "Item".into(),
            target_key_field: "id".into(),
            local_key_field: "item_id".into(),
            target_list_field: "drops".into(),
            target_find_method: method.into(),
        }
    }

    fn drop_count(table: &MaterializedTable, row: usize) -> usize {
        match table.records[row].get("drops") {
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        }
    }

    #[test]
    fn test_records_appended_in_order() {
        let mut table = item_table();
        let outcome = resolve_joins(&join("Find"), &drop_type(), &drops(&[2, 1, 2]), &mut table);

        assert_eq!(outcome.processed, 3);
        assert_eq!(outcome.resolved, 3);
        assert!(!outcome.report.flags.any());
        assert_eq!(drop_count(&table, 0), 1);
        assert_eq!(drop_count(&table, 1), 2);
    }

    #[test]
    fn test_unknown_finder() {
        let mut table = item_table();
        let outcome = resolve_joins(&join("FindByName"), &drop_type(), &drops(&[1, 2]), &mut table);

        assert!(outcome.report.flags.contains(Diagnostics::JOIN_NO_FIND_METHOD));
        assert_eq!(outcome.report.count(Diagnostics::JOIN_NO_FIND_METHOD), 2);
        let rows: Vec<Option<usize>> = outcome.report.issues.iter().map(|i| i.row).collect();
        assert_eq!(rows, vec![Some(DATA_ROW), Some(DATA_ROW + 1)]);
        assert_eq!(outcome.resolved, 0);
        assert_eq!(drop_count(&table, 0), 0);
    }

    #[test]
    fn test_missing_reference_row() {
        let mut table = item_table();
        let outcome = resolve_joins(&join("Get"), &drop_type(), &drops(&[1, 7]), &mut table);

        assert_eq!(outcome.resolved, 1);
        assert!(outcome.report.flags.contains(Diagnostics::JOIN_NO_REFERENCE_ROW));
        assert!(outcome.report.flags.contains(Diagnostics::JOIN_INDEX_MISMATCH));

        // The unmatched drop sits on the second data row of its sheet.
        let missing = &outcome.report.issues[0];
        assert_eq!(missing.flag, Diagnostics::JOIN_NO_REFERENCE_ROW);
        assert_eq!(missing.row, Some(DATA_ROW + 1));
    }

    #[test]
    fn test_missing_list_field() {
        let mut table = item_table();
        let mut setting = join("Find");
        setting.target_list_field = "loot".into();
        let outcome = resolve_joins(&setting, &drop_type(), &drops(&[1]), &mut table);

        assert_eq!(outcome.report.flags, Diagnostics::VERSION_MISMATCH);
        assert_eq!(outcome.processed, 0);
    }

    #[test]
    fn test_registered_finder() {
        let mut table = item_table();
        table.register_finder(
            "Last",
            Arc::new(|records: &[Record], _args: &[Value]| records.len().checked_sub(1)),
        );
        let outcome = resolve_joins(&join("Last"), &drop_type(), &drops(&[1]), &mut table);
        assert_eq!(outcome.resolved, 1);
        assert_eq!(drop_count(&table, 1), 1);
    }
}
