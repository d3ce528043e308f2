//! Tabular data views.
//!
//! A [`Grid`] is a 2-D table of string cells. Two variants implement it:
//!
//! - [`OwnedGrid`] - owned, mutable, row-major storage
//! - [`GridView`] - offsets and extents over storage owned elsewhere
//!
//! Slicing never copies: both variants return a [`GridView`] borrowing the
//! same storage.
//!
//! ```text
//!  source (5 x 4)            row_slice(1, -1)         column_slice(2, None)
//!  ┌──┬──┬──┬──┐             ┌──┬──┬──┬──┐            ┌──┬──┐
//!  │a0│b0│c0│d0│             │a1│b1│c1│d1│            │c1│d1│
//!  │a1│b1│c1│d1│     ──▶     │a2│b2│c2│d2│    ──▶     │c2│d2│
//!  │..│..│..│..│             │a3│b3│c3│d3│            │c3│d3│
//!  └──┴──┴──┴──┘             └──┴──┴──┴──┘            └──┴──┘
//! ```

mod owned;
mod view;

pub use owned::OwnedGrid;
pub use view::GridView;

use std::borrow::Cow;

use crate::error::GridResult;

// =============================================================================
// Raw storage
// =============================================================================

/// Read access to storage a [`GridView`] can sit on.
///
/// Ragged sources report the widest row as their column count and read
/// missing cells as empty.
pub trait CellSource {
    fn source_rows(&self) -> usize;
    fn source_columns(&self) -> usize;
    fn source_cell(&self, row: usize, col: usize) -> Cow<'_, str>;
}

/// Storage a [`GridView`] can write through to.
pub trait CellSink: CellSource {
    /// Write a cell. Callers guarantee the position is in bounds.
    fn put_cell(&mut self, row: usize, col: usize, value: &str);

    fn as_source(&self) -> &dyn CellSource;
}

impl CellSource for Vec<Vec<String>> {
    fn source_rows(&self) -> usize {
        self.len()
    }

    fn source_columns(&self) -> usize {
        self.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn source_cell(&self, row: usize, col: usize) -> Cow<'_, str> {
        self.get(row)
            .and_then(|r| r.get(col))
            .map(|s| Cow::Borrowed(s.as_str()))
            .unwrap_or(Cow::Borrowed(""))
    }
}

impl CellSink for Vec<Vec<String>> {
    fn put_cell(&mut self, row: usize, col: usize, value: &str) {
        if let Some(r) = self.get_mut(row) {
            if r.len() <= col {
                r.resize(col + 1, String::new());
            }
            r[col] = value.to_string();
        }
    }

    fn as_source(&self) -> &dyn CellSource {
        self
    }
}

/// Sheet APIs hand back JSON values: numbers, booleans and null are
/// stringified on read.
impl CellSource for Vec<Vec<serde_json::Value>> {
    fn source_rows(&self) -> usize {
        self.len()
    }

    fn source_columns(&self) -> usize {
        self.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn source_cell(&self, row: usize, col: usize) -> Cow<'_, str> {
        use serde_json::Value;

        match self.get(row).and_then(|r| r.get(col)) {
            Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
            Some(Value::Null) | None => Cow::Borrowed(""),
            Some(Value::Number(n)) => Cow::Owned(n.to_string()),
            Some(Value::Bool(b)) => Cow::Owned(b.to_string()),
            Some(other) => Cow::Owned(other.to_string()),
        }
    }
}

impl CellSink for Vec<Vec<serde_json::Value>> {
    fn put_cell(&mut self, row: usize, col: usize, value: &str) {
        if let Some(r) = self.get_mut(row) {
            if r.len() <= col {
                r.resize(col + 1, serde_json::Value::Null);
            }
            r[col] = serde_json::Value::String(value.to_string());
        }
    }

    fn as_source(&self) -> &dyn CellSource {
        self
    }
}

// =============================================================================
// Grid contract
// =============================================================================

/// The tabular data contract shared by owned grids and views.
pub trait Grid {
    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize;

    /// Cell text, or the empty string when out of range.
    fn cell(&self, row: usize, col: usize) -> Cow<'_, str>;

    /// Write a cell. Out-of-range writes are ignored.
    fn set_cell(&mut self, row: usize, col: usize, value: &str) -> GridResult<()>;

    /// Replace the whole contents.
    fn set_from_list(&mut self, rows: Vec<Vec<String>>) -> GridResult<()>;

    /// Rows `start..end`, `end = None` meaning to the last row.
    fn row_slice(&self, start: isize, end: Option<isize>) -> GridView<'_>;

    /// Columns `start..end`, `end = None` meaning to the last column.
    fn column_slice(&self, start: isize, end: Option<isize>) -> GridView<'_>;

    fn is_empty(&self) -> bool {
        self.row_count() == 0 || self.column_count() == 0
    }

    fn row(&self, i: usize) -> Vec<String> {
        if i >= self.row_count() {
            return Vec::new();
        }
        (0..self.column_count())
            .map(|j| self.cell(i, j).into_owned())
            .collect()
    }

    fn column(&self, j: usize) -> Vec<String> {
        if j >= self.column_count() {
            return Vec::new();
        }
        (0..self.row_count())
            .map(|i| self.cell(i, j).into_owned())
            .collect()
    }

    /// Every cell quoted, cells joined by `", "`, rows by newline.
    fn to_delimited_string(&self) -> String {
        (0..self.row_count())
            .map(|i| {
                (0..self.column_count())
                    .map(|j| format!("\"{}\"", escape_cell(&self.cell(i, j))))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Copy the visible cells into a new owned grid.
    fn to_owned_grid(&self) -> OwnedGrid {
        let rows = (0..self.row_count()).map(|i| self.row(i)).collect();
        OwnedGrid::from_rows(rows)
    }
}

/// Escape one cell for [`Grid::to_delimited_string`].
///
/// Quotes are doubled, CRLF becomes LF, then LF becomes the two characters
/// `\n`.
pub fn escape_cell(cell: &str) -> String {
    cell.replace('"', "\"\"")
        .replace("\r\n", "\n")
        .replace('\n', "\\n")
}

/// Resolve a slice request against a dimension of `size`.
///
/// Negative indices wrap modulo `size`, positive ones clamp to `size`.
/// A range with `start >= end` comes back empty, positioned at `start`.
pub fn normalize_range(start: isize, end: Option<isize>, size: usize) -> (usize, usize) {
    let start = normalize_index(start, size);
    let end = end.map_or(size, |e| normalize_index(e, size));
    if start >= end {
        (start, start)
    } else {
        (start, end)
    }
}

fn normalize_index(index: isize, size: usize) -> usize {
    if index >= 0 {
        (index as usize).min(size)
    } else if size == 0 {
        0
    } else {
        index.rem_euclid(size as isize) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_positive() {
        assert_eq!(normalize_range(1, Some(3), 5), (1, 3));
        assert_eq!(normalize_range(0, None, 5), (0, 5));
        assert_eq!(normalize_range(2, Some(99), 5), (2, 5));
    }

    #[test]
    fn test_normalize_negative_end_wraps() {
        assert_eq!(normalize_range(0, Some(-1), 5), (0, 4));
        assert_eq!(normalize_range(1, Some(-2), 5), (1, 3));
        assert_eq!(normalize_range(-2, None, 5), (3, 5));
    }

    #[test]
    fn test_normalize_empty_ranges() {
        assert_eq!(normalize_range(3, Some(3), 5), (3, 3));
        assert_eq!(normalize_range(4, Some(2), 5), (4, 4));
        assert_eq!(normalize_range(0, Some(-1), 0), (0, 0));
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("say \"hi\""), "say \"\"hi\"\"");
        assert_eq!(escape_cell("a\r\nb\nc"), "a\\nb\\nc");
    }

    #[test]
    fn test_json_source_stringifies() {
        let values = vec![vec![
            serde_json::json!("name"),
            serde_json::json!(42),
            serde_json::json!(true),
            serde_json::Value::Null,
        ]];
        assert_eq!(values.source_cell(0, 0), "name");
        assert_eq!(values.source_cell(0, 1), "42");
        assert_eq!(values.source_cell(0, 2), "true");
        assert_eq!(values.source_cell(0, 3), "");
        assert_eq!(values.source_cell(5, 0), "");
    }

    #[test]
    fn test_ragged_source_columns() {
        let rows = vec![vec!["a".to_string()], vec!["b".to_string(), "c".to_string()]];
        assert_eq!(rows.source_columns(), 2);
        assert_eq!(rows.source_cell(0, 1), "");
    }
}
