//! Data providers.
//!
//! A provider hands the pipeline a [`GridView`] over data it owns. Reading
//! happens before a run; the view borrows the provider for the run's length.

use once_cell::unsync::OnceCell;
use std::path::{Path, PathBuf};

use crate::error::{ProviderError, ProviderResult};
use crate::grid::{GridView, OwnedGrid};
use crate::parser;
use crate::settings::SourceSpec;

/// Source of a sheet's raw grid.
pub trait DataProvider {
    fn is_available(&self) -> bool;

    /// View over the whole grid. Empty when the data could not be read.
    fn data(&self) -> GridView<'_>;
}

/// Local delimited file, read and parsed on first access.
#[derive(Debug)]
pub struct FileProvider {
    path: PathBuf,
    grid: OnceCell<OwnedGrid>,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            grid: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> OwnedGrid {
        if !self.path.is_file() {
            tracing::error!(path = %self.path.display(), "data file not found");
            return OwnedGrid::default();
        }
        match parser::parse_file_auto(&self.path) {
            Ok(sheet) => {
                tracing::debug!(
                    path = %self.path.display(),
                    encoding = %sheet.encoding,
                    delimiter = ?sheet.delimiter,
                    "parsed data file"
                );
                sheet.grid
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "failed to parse data file");
                OwnedGrid::default()
            }
        }
    }
}

impl DataProvider for FileProvider {
    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn data(&self) -> GridView<'_> {
        GridView::new(self.grid.get_or_init(|| self.load()))
    }
}

/// Already fetched 2-D value grid, as returned by a sheet API.
///
/// Cells are not copied: numbers, booleans and null are stringified on read.
#[derive(Debug, Clone, Default)]
pub struct SheetValuesProvider {
    values: Vec<Vec<serde_json::Value>>,
}

impl SheetValuesProvider {
    pub fn new(values: Vec<Vec<serde_json::Value>>) -> Self {
        Self { values }
    }

    /// Accepts either a bare 2-D array or an object with a `values` array.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let parsed: serde_json::Value = serde_json::from_str(json)?;
        let grid = match parsed {
            serde_json::Value::Object(mut map) => map.remove("values").unwrap_or_default(),
            other => other,
        };
        if grid.is_null() {
            return Ok(Self::default());
        }
        Ok(Self::new(serde_json::from_value(grid)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }
}

impl DataProvider for SheetValuesProvider {
    fn is_available(&self) -> bool {
        !self.values.is_empty()
    }

    fn data(&self) -> GridView<'_> {
        GridView::new(&self.values)
    }
}

/// Provider for a configured source.
pub fn provider_for(source: &SourceSpec) -> ProviderResult<Box<dyn DataProvider>> {
    match source {
        SourceSpec::File { path } => Ok(Box::new(FileProvider::new(path.clone()))),
        SourceSpec::Values { path } => {
            if !path.is_file() {
                return Err(ProviderError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("value grid not found: {}", path.display()),
                )));
            }
            Ok(Box::new(SheetValuesProvider::from_file(path)?))
        }
    }
}
