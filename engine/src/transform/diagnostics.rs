//! Diagnostics of one conversion run.
//!
//! Per-row problems never abort a run. Each one sets a bit in
//! [`Diagnostics`] and is kept as an [`Issue`] in the run's
//! [`DiagnosticsReport`], in the order rows were processed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// OR-combined condition flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(u32);

impl Diagnostics {
    pub const NONE: Diagnostics = Diagnostics(0);
    /// Row skipped because every key cell was empty.
    pub const NO_KEY_SKIP: Diagnostics = Diagnostics(1 << 0);
    pub const EMPTY_CELL: Diagnostics = Diagnostics(1 << 1);
    pub const CONVERT_FAILED: Diagnostics = Diagnostics(1 << 2);
    /// Resolved references differ from local records processed.
    pub const JOIN_INDEX_MISMATCH: Diagnostics = Diagnostics(1 << 3);
    pub const JOIN_NO_REFERENCE_ROW: Diagnostics = Diagnostics(1 << 4);
    pub const JOIN_NO_FIND_METHOD: Diagnostics = Diagnostics(1 << 5);
    /// Schema and record type disagree.
    pub const VERSION_MISMATCH: Diagnostics = Diagnostics(1 << 6);

    const NAMED: [(Diagnostics, &'static str); 7] = [
        (Self::NO_KEY_SKIP, "NO_KEY_SKIP"),
        (Self::EMPTY_CELL, "EMPTY_CELL"),
        (Self::CONVERT_FAILED, "CONVERT_FAILED"),
        (Self::JOIN_INDEX_MISMATCH, "JOIN_INDEX_MISMATCH"),
        (Self::JOIN_NO_REFERENCE_ROW, "JOIN_NO_REFERENCE_ROW"),
        (Self::JOIN_NO_FIND_METHOD, "JOIN_NO_FIND_METHOD"),
        (Self::VERSION_MISMATCH, "VERSION_MISMATCH"),
    ];

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Diagnostics) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// Whether any condition was recorded.
    pub fn any(self) -> bool {
        self.0 != 0
    }

    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for Diagnostics {
    type Output = Diagnostics;

    fn bitor(self, rhs: Diagnostics) -> Diagnostics {
        Diagnostics(self.0 | rhs.0)
    }
}

impl BitOrAssign for Diagnostics {
    fn bitor_assign(&mut self, rhs: Diagnostics) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.any() {
            f.write_str(&self.names().join(" | "))
        } else {
            f.write_str("NONE")
        }
    }
}

/// One recorded condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Grid row of the record concerned, `None` for run-level conditions.
    pub row: Option<usize>,
    pub field: Option<String>,
    pub flag: Diagnostics,
    pub message: String,
}

/// Accumulated diagnostics of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub flags: Diagnostics,
    pub issues: Vec<Issue>,
}

impl DiagnosticsReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag_row(&mut self, row: usize, field: Option<&str>, flag: Diagnostics, message: impl Into<String>) {
        self.flag_record(Some(row), field, flag, message);
    }

    /// Flag a condition on a record whose grid row may be unknown.
    pub fn flag_record(
        &mut self,
        row: Option<usize>,
        field: Option<&str>,
        flag: Diagnostics,
        message: impl Into<String>,
    ) {
        self.push(Issue {
            row,
            field: field.map(str::to_string),
            flag,
            message: message.into(),
        });
    }

    pub fn flag_run(&mut self, flag: Diagnostics, message: impl Into<String>) {
        self.push(Issue {
            row: None,
            field: None,
            flag,
            message: message.into(),
        });
    }

    fn push(&mut self, issue: Issue) {
        tracing::debug!(row = ?issue.row, field = ?issue.field, flag = %issue.flag, "{}", issue.message);
        self.flags |= issue.flag;
        self.issues.push(issue);
    }

    pub fn merge(&mut self, other: DiagnosticsReport) {
        self.flags |= other.flags;
        self.issues.extend(other.issues);
    }

    pub fn count(&self, flag: Diagnostics) -> usize {
        self.issues.iter().filter(|i| i.flag.contains(flag)).count()
    }

    /// One line per flag with its occurrence count.
    pub fn summary(&self) -> String {
        if !self.flags.any() {
            return "no issues".to_string();
        }
        Diagnostics::NAMED
            .iter()
            .filter(|(flag, _)| self.flags.contains(*flag))
            .map(|(flag, name)| format!("{}: {}", name, self.count(*flag)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_combine() {
        let mut flags = Diagnostics::NONE;
        assert!(!flags.any());

        flags |= Diagnostics::EMPTY_CELL;
        flags |= Diagnostics::EMPTY_CELL | Diagnostics::JOIN_NO_FIND_METHOD;

        assert!(flags.any());
        assert!(flags.contains(Diagnostics::EMPTY_CELL));
        assert!(!flags.contains(Diagnostics::NO_KEY_SKIP));
        assert!(!flags.contains(Diagnostics::NONE));
        assert_eq!(flags.names(), vec!["EMPTY_CELL", "JOIN_NO_FIND_METHOD"]);
        assert_eq!(flags.to_string(), "EMPTY_CELL | JOIN_NO_FIND_METHOD");
    }

    #[test]
    fn test_report_keeps_order_and_counts() {
        let mut report = DiagnosticsReport::new();
        report.flag_row(3, Some("name"), Diagnostics::EMPTY_CELL, "empty");
        report.flag_row(4, None, Diagnostics::NO_KEY_SKIP, "no key");
        report.flag_row(5, Some("name"), Diagnostics::EMPTY_CELL, "empty");

        assert_eq!(report.issues.iter().map(|i| i.row).collect::<Vec<_>>(), vec![Some(3), Some(4), Some(5)]);
        assert_eq!(report.count(Diagnostics::EMPTY_CELL), 2);
        assert_eq!(report.summary(), "NO_KEY_SKIP: 1, EMPTY_CELL: 2");
    }

    #[test]
    fn test_serializes_as_bits() {
        let flags = Diagnostics::NO_KEY_SKIP | Diagnostics::VERSION_MISMATCH;
        assert_eq!(serde_json::to_string(&flags).unwrap(), "65");
    }
}
