//! Field schema derived from a sheet's name and type rows.
//!
//! Row 0 holds field names and row 1 declared type names. Repeated columns
//! named `base[index]` form one array-valued field; columns whose name starts
//! with `#` are comments.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::convert::TypeRegistry;
use crate::grid::Grid;

/// Row holding field names.
pub const NAME_ROW: usize = 0;
/// Row holding declared type names.
pub const TYPE_ROW: usize = 1;
/// First data row.
pub const DATA_START_ROW: usize = 2;

static INDEXED_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\[(\d+)\]$").expect("indexed column pattern is valid"));

/// One output field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Column name as written, index suffix included.
    pub name: String,
    pub declared_type: String,
    /// Column is one element of an indexed `base[i]` group.
    pub is_array_element: bool,
    /// Name without the index suffix.
    pub base_name: String,
    pub is_valid: bool,
    /// Source column in the grid.
    pub column: usize,
}

impl FieldSchema {
    /// Describe one column. Validity needs a name and a resolvable type.
    pub fn new(
        name: &str,
        declared_type: &str,
        column: usize,
        registry: &TypeRegistry,
    ) -> Self {
        let name = name.trim();
        let declared_type = declared_type.trim();

        let (base_name, is_array_element) = match INDEXED_COLUMN.captures(name) {
            Some(caps) => (caps[1].trim().to_string(), true),
            None => (name.to_string(), false),
        };

        let is_comment = name.starts_with('#');
        let is_valid = !name.is_empty()
            && !base_name.is_empty()
            && !is_comment
            && registry.resolve(declared_type).is_some();

        Self {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            is_array_element,
            base_name,
            is_valid,
            column,
        }
    }

    /// Whether two fields sharing a base name can merge into one field.
    pub fn is_compatible_with(&self, other: &FieldSchema, registry: &TypeRegistry) -> bool {
        if self.is_array_element != other.is_array_element {
            return false;
        }
        match (
            registry.resolve(&self.declared_type),
            registry.resolve(&other.declared_type),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => self.declared_type == other.declared_type,
        }
    }
}

/// Derive the schema from the name and type rows of `grid`.
///
/// A later column whose type clashes with an earlier column of the same base
/// name is marked invalid and a warning is logged.
pub fn derive_schema(grid: &dyn Grid, registry: &TypeRegistry) -> Vec<FieldSchema> {
    if grid.row_count() <= TYPE_ROW {
        return Vec::new();
    }

    let mut schema: Vec<FieldSchema> = Vec::with_capacity(grid.column_count());
    for col in 0..grid.column_count() {
        let name = grid.cell(NAME_ROW, col);
        let declared = grid.cell(TYPE_ROW, col);
        let mut field = FieldSchema::new(&name, &declared, col, registry);

        if field.is_valid {
            let clash = schema.iter().find(|f| {
                f.is_valid && f.base_name == field.base_name && !f.is_compatible_with(&field, registry)
            });
            if let Some(earlier) = clash {
                tracing::warn!(
                    field = %field.name,
                    declared = %field.declared_type,
                    earlier = %earlier.name,
                    earlier_declared = %earlier.declared_type,
                    "incompatible column for shared base name, ignoring"
                );
                field.is_valid = false;
            }
        } else if !field.name.is_empty() && !field.name.starts_with('#') {
            tracing::debug!(field = %field.name, declared = %field.declared_type, "unresolvable field type");
        }

        schema.push(field);
    }
    schema
}

/// Valid fields, one per base name, first occurrence first.
pub fn distinct_fields(schema: &[FieldSchema]) -> Vec<&FieldSchema> {
    let mut seen: Vec<&FieldSchema> = Vec::new();
    for field in schema.iter().filter(|f| f.is_valid) {
        if !seen.iter().any(|f| f.base_name == field.base_name) {
            seen.push(field);
        }
    }
    seen
}

/// Schema fields for the configured keys, in key order. A key the sheet
/// does not have appears as an invalid field.
pub fn key_fields(schema: &[FieldSchema], keys: &[String]) -> Vec<FieldSchema> {
    keys.iter()
        .map(|key| {
            schema
                .iter()
                .find(|f| f.is_valid && f.base_name == *key)
                .cloned()
                .unwrap_or_else(|| FieldSchema {
                    name: key.clone(),
                    declared_type: String::new(),
                    is_array_element: false,
                    base_name: key.clone(),
                    is_valid: false,
                    column: usize::MAX,
                })
        })
        .collect()
}
