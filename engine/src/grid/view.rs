use std::borrow::Cow;
use std::fmt;

use super::{normalize_range, CellSink, CellSource, Grid};
use crate::error::{GridError, GridResult};

enum Backing<'a> {
    Shared(&'a dyn CellSource),
    Exclusive(&'a mut dyn CellSink),
}

/// A window over storage owned elsewhere.
///
/// Holds only offsets and extents. A view built with [`GridView::new`] is
/// read-only; one built with [`GridView::new_mut`] writes through to the
/// owner.
pub struct GridView<'a> {
    backing: Backing<'a>,
    row_offset: usize,
    col_offset: usize,
    rows: usize,
    cols: usize,
}

impl<'a> GridView<'a> {
    /// Read-only view over the whole source.
    pub fn new(source: &'a dyn CellSource) -> Self {
        let rows = source.source_rows();
        let cols = source.source_columns();
        Self {
            backing: Backing::Shared(source),
            row_offset: 0,
            col_offset: 0,
            rows,
            cols,
        }
    }

    /// Write-through view over the whole source.
    pub fn new_mut(source: &'a mut dyn CellSink) -> Self {
        let rows = source.source_rows();
        let cols = source.source_columns();
        Self {
            backing: Backing::Exclusive(source),
            row_offset: 0,
            col_offset: 0,
            rows,
            cols,
        }
    }

    /// Read-only window of `extent` (rows, columns) starting at `origin`.
    pub(crate) fn window(
        source: &'a dyn CellSource,
        origin: (usize, usize),
        extent: (usize, usize),
    ) -> Self {
        Self {
            backing: Backing::Shared(source),
            row_offset: origin.0,
            col_offset: origin.1,
            rows: extent.0,
            cols: extent.1,
        }
    }

    /// Whether [`Grid::set_cell`] writes through.
    pub fn is_writable(&self) -> bool {
        matches!(self.backing, Backing::Exclusive(_))
    }

    /// Position of this view's first cell in the underlying source.
    pub fn origin(&self) -> (usize, usize) {
        (self.row_offset, self.col_offset)
    }

    fn source(&self) -> &dyn CellSource {
        match &self.backing {
            Backing::Shared(source) => *source,
            Backing::Exclusive(sink) => sink.as_source(),
        }
    }

    fn shared_window(&self, rows: (usize, usize), cols: (usize, usize)) -> GridView<'_> {
        GridView::window(
            self.source(),
            (self.row_offset + rows.0, self.col_offset + cols.0),
            (rows.1 - rows.0, cols.1 - cols.0),
        )
    }

    fn window_mut(&mut self, rows: (usize, usize), cols: (usize, usize)) -> GridView<'_> {
        let row_offset = self.row_offset + rows.0;
        let col_offset = self.col_offset + cols.0;
        let backing = match &mut self.backing {
            Backing::Shared(source) => Backing::Shared(*source),
            Backing::Exclusive(sink) => Backing::Exclusive(&mut **sink),
        };
        GridView {
            backing,
            row_offset,
            col_offset,
            rows: rows.1 - rows.0,
            cols: cols.1 - cols.0,
        }
    }

    /// Like [`Grid::row_slice`], keeping write-through access.
    pub fn row_slice_mut(&mut self, start: isize, end: Option<isize>) -> GridView<'_> {
        let rows = normalize_range(start, end, self.rows);
        let cols = (0, self.cols);
        self.window_mut(rows, cols)
    }

    /// Like [`Grid::column_slice`], keeping write-through access.
    pub fn column_slice_mut(&mut self, start: isize, end: Option<isize>) -> GridView<'_> {
        let rows = (0, self.rows);
        let cols = normalize_range(start, end, self.cols);
        self.window_mut(rows, cols)
    }
}

impl Grid for GridView<'_> {
    fn row_count(&self) -> usize {
        self.rows
    }

    fn column_count(&self) -> usize {
        self.cols
    }

    fn cell(&self, row: usize, col: usize) -> Cow<'_, str> {
        if row >= self.rows || col >= self.cols {
            return Cow::Borrowed("");
        }
        self.source()
            .source_cell(self.row_offset + row, self.col_offset + col)
    }

    fn set_cell(&mut self, row: usize, col: usize, value: &str) -> GridResult<()> {
        let (row_offset, col_offset, rows, cols) =
            (self.row_offset, self.col_offset, self.rows, self.cols);
        match &mut self.backing {
            Backing::Shared(_) => Err(GridError::UnsupportedOperation("set_cell")),
            Backing::Exclusive(sink) => {
                if row < rows && col < cols {
                    sink.put_cell(row_offset + row, col_offset + col, value);
                } else {
                    tracing::debug!(row, col, "ignoring out-of-range write through view");
                }
                Ok(())
            }
        }
    }

    fn set_from_list(&mut self, _rows: Vec<Vec<String>>) -> GridResult<()> {
        Err(GridError::UnsupportedOperation("set_from_list"))
    }

    fn row_slice(&self, start: isize, end: Option<isize>) -> GridView<'_> {
        let rows = normalize_range(start, end, self.rows);
        self.shared_window(rows, (0, self.cols))
    }

    fn column_slice(&self, start: isize, end: Option<isize>) -> GridView<'_> {
        let cols = normalize_range(start, end, self.cols);
        self.shared_window((0, self.rows), cols)
    }
}

impl fmt::Debug for GridView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridView")
            .field("row_offset", &self.row_offset)
            .field("col_offset", &self.col_offset)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("writable", &self.is_writable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Vec<String>> {
        (0..5)
            .map(|i| (0..4).map(|j| format!("r{}c{}", i, j)).collect())
            .collect()
    }

    #[test]
    fn test_slice_reads_through() {
        let data = sample();
        let view = GridView::new(&data);
        let middle = view.row_slice(1, Some(-1));
        let inner = middle.column_slice(2, None);

        assert_eq!(inner.row_count(), 3);
        assert_eq!(inner.column_count(), 2);
        assert_eq!(inner.cell(0, 0), "r1c2");
        assert_eq!(inner.cell(2, 1), "r3c3");
        assert_eq!(inner.origin(), (1, 2));
    }

    #[test]
    fn test_empty_slice() {
        let data = sample();
        let view = GridView::new(&data);
        assert_eq!(view.row_slice(3, Some(3)).row_count(), 0);
        assert_eq!(view.column_slice(3, Some(1)).column_count(), 0);
        assert!(view.row_slice(4, Some(2)).is_empty());
    }

    #[test]
    fn test_out_of_range_read_is_empty() {
        let data = sample();
        let view = GridView::new(&data);
        let top = view.row_slice(0, Some(2));
        assert_eq!(top.cell(2, 0), "");
    }

    #[test]
    fn test_shared_view_rejects_writes() {
        let data = sample();
        let mut view = GridView::new(&data);
        assert_eq!(
            view.set_cell(0, 0, "x"),
            Err(GridError::UnsupportedOperation("set_cell"))
        );
        assert_eq!(
            view.set_from_list(vec![]),
            Err(GridError::UnsupportedOperation("set_from_list"))
        );
    }

    #[test]
    fn test_exclusive_view_writes_through() {
        let mut data = sample();
        {
            let mut view = GridView::new_mut(&mut data);
            let mut inner = view.row_slice_mut(2, None);
            let mut corner = inner.column_slice_mut(-1, None);
            corner.set_cell(0, 0, "changed").unwrap();
            // out of range: ignored
            corner.set_cell(9, 9, "lost").unwrap();
            assert!(corner.set_from_list(vec![]).is_err());
        }
        assert_eq!(data[2][3], "changed");
        assert_eq!(data.len(), 5);
    }

    #[test]
    fn test_row_and_column_accessors() {
        let data = sample();
        let view = GridView::new(&data);
        let middle = view.row_slice(1, Some(3));
        assert_eq!(middle.row(0), vec!["r1c0", "r1c1", "r1c2", "r1c3"]);
        assert_eq!(middle.column(1), vec!["r1c1", "r2c1"]);
        assert!(middle.row(7).is_empty());
    }
}
