use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::{normalize_range, CellSink, CellSource, Grid, GridView};
use crate::error::GridResult;

/// Owned, mutable grid in row-major storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedGrid {
    rows: usize,
    cols: usize,
    cells: Vec<String>,
}

impl OwnedGrid {
    /// A grid of empty cells.
    pub fn with_size(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![String::new(); rows * cols],
        }
    }

    /// Copy rows into a grid; ragged rows are padded to the widest row.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let mut grid = Self::default();
        grid.fill(rows);
        grid
    }

    fn fill(&mut self, rows: Vec<Vec<String>>) {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let row_count = rows.len();
        let mut cells = Vec::with_capacity(row_count * cols);
        for mut row in rows {
            row.resize(cols, String::new());
            cells.extend(row);
        }
        self.rows = row_count;
        self.cols = cols;
        self.cells = cells;
    }

    /// Write-through view over the whole grid.
    pub fn view_mut(&mut self) -> GridView<'_> {
        GridView::new_mut(self)
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }
}

impl CellSource for OwnedGrid {
    fn source_rows(&self) -> usize {
        self.rows
    }

    fn source_columns(&self) -> usize {
        self.cols
    }

    fn source_cell(&self, row: usize, col: usize) -> Cow<'_, str> {
        self.cell(row, col)
    }
}

impl CellSink for OwnedGrid {
    fn put_cell(&mut self, row: usize, col: usize, value: &str) {
        if let Some(i) = self.index(row, col) {
            self.cells[i] = value.to_string();
        }
    }

    fn as_source(&self) -> &dyn CellSource {
        self
    }
}

impl Grid for OwnedGrid {
    fn row_count(&self) -> usize {
        self.rows
    }

    fn column_count(&self) -> usize {
        self.cols
    }

    fn cell(&self, row: usize, col: usize) -> Cow<'_, str> {
        match self.index(row, col) {
            Some(i) => Cow::Borrowed(self.cells[i].as_str()),
            None => Cow::Borrowed(""),
        }
    }

    fn set_cell(&mut self, row: usize, col: usize, value: &str) -> GridResult<()> {
        match self.index(row, col) {
            Some(i) => self.cells[i] = value.to_string(),
            None => tracing::debug!(row, col, "ignoring out-of-range write"),
        }
        Ok(())
    }

    fn set_from_list(&mut self, rows: Vec<Vec<String>>) -> GridResult<()> {
        self.fill(rows);
        Ok(())
    }

    fn row_slice(&self, start: isize, end: Option<isize>) -> GridView<'_> {
        let (start, end) = normalize_range(start, end, self.rows);
        GridView::window(self, (start, 0), (end - start, self.cols))
    }

    fn column_slice(&self, start: isize, end: Option<isize>) -> GridView<'_> {
        let (start, end) = normalize_range(start, end, self.cols);
        GridView::window(self, (0, start), (self.rows, end - start))
    }
}
