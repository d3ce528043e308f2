//! Typed values and records.
//!
//! Generated record classes are described at runtime by a [`RecordType`]:
//! an explicit table of field descriptors built once from the sheet schema.
//! Values are assigned onto [`Record`]s by field name through that table.
//!
//! - [`Value`] - a converted cell value
//! - [`FieldDescriptor`] - name and declared type of one record field
//! - [`RecordType`] - descriptor table for one generated class
//! - [`Record`] - one materialized row

use serde::{Deserialize, Serialize};

use crate::convert::{TypeRegistry, ValueType};
use crate::schema::FieldSchema;

// =============================================================================
// Values
// =============================================================================

/// A strongly-typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Enum { type_name: String, value: i64 },
    Vector(Vec<f64>),
    Array(Vec<Value>),
    Reference { type_name: String, key: String },
    Record(Box<Record>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Enum { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Text used in asset names and lookups.
    pub fn key_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
            Value::Enum { value, .. } => value.to_string(),
            Value::Vector(v) => v
                .iter()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join("_"),
            Value::Array(items) => items
                .iter()
                .map(Value::key_text)
                .collect::<Vec<_>>()
                .join("_"),
            Value::Reference { key, .. } => key.clone(),
            Value::Record(record) => record.asset_name.clone().unwrap_or_default(),
        }
    }

    /// Key equality: enums match plain integers of the same value.
    pub fn key_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Enum { value: a, .. }, Value::Int(b))
            | (Value::Int(a), Value::Enum { value: b, .. }) => a == b,
            _ => self == other,
        }
    }
}

impl ValueType {
    /// Value a field holds before anything is assigned.
    pub fn zero_value(&self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Byte | ValueType::Short | ValueType::Int | ValueType::Long => Value::Int(0),
            ValueType::Float | ValueType::Double => Value::Float(0.0),
            ValueType::String | ValueType::Reference(_) | ValueType::Record(_) => Value::Null,
            ValueType::Composite(kind) => Value::Vector(vec![0.0; kind.arity()]),
            ValueType::Enum(name) => Value::Enum {
                type_name: name.clone(),
                value: 0,
            },
            ValueType::Array(_) => Value::Null,
        }
    }

    /// Whether a value can be stored in a field of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ValueType::Bool, Value::Bool(_)) => true,
            (t, Value::Int(_)) if t.is_integer() => true,
            (ValueType::Float | ValueType::Double, Value::Float(_) | Value::Int(_)) => true,
            (ValueType::String, Value::Str(_)) => true,
            (ValueType::Composite(kind), Value::Vector(v)) => v.len() == kind.arity(),
            (ValueType::Enum(name), Value::Enum { type_name, .. }) => name == type_name,
            (ValueType::Reference(name), Value::Reference { type_name, .. }) => name == type_name,
            (ValueType::Record(name), Value::Record(record)) => *name == record.type_name,
            (ValueType::Array(inner), Value::Array(items)) => items.iter().all(|i| inner.accepts(i)),
            _ => false,
        }
    }

    /// Re-box a plain integer as this enum type.
    pub fn rebox(&self, value: Value) -> Value {
        match (self, value) {
            (ValueType::Enum(name), Value::Int(v)) => Value::Enum {
                type_name: name.clone(),
                value: v,
            },
            (ValueType::Array(inner), Value::Array(items)) => {
                Value::Array(items.into_iter().map(|i| inner.rebox(i)).collect())
            }
            (_, other) => other,
        }
    }
}

// =============================================================================
// Record types
// =============================================================================

/// Name and declared type of one record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub value_type: ValueType,
}

/// Descriptor table for a generated record class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordType {
    pub name: String,
    /// Transient data type rather than a persisted asset.
    pub pure: bool,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordType {
    pub fn new(name: impl Into<String>, pure: bool) -> Self {
        Self {
            name: name.into(),
            pure,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            value_type,
        });
        self
    }

    /// Build the descriptor table from a sheet schema.
    ///
    /// One field per distinct base name, first occurrence wins; indexed
    /// columns become array fields of their element type.
    pub fn from_schema(
        name: impl Into<String>,
        schema: &[FieldSchema],
        registry: &TypeRegistry,
        pure: bool,
    ) -> Self {
        let mut record_type = Self::new(name, pure);
        for field in schema.iter().filter(|f| f.is_valid) {
            if record_type.field(&field.base_name).is_some() {
                continue;
            }
            let Some(declared) = registry.resolve(&field.declared_type) else {
                continue;
            };
            let value_type = if field.is_array_element {
                ValueType::Array(Box::new(declared))
            } else {
                declared
            };
            record_type.fields.push(FieldDescriptor {
                name: field.base_name.clone(),
                value_type,
            });
        }
        record_type
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// A record with every field at its zero value.
    pub fn instantiate(&self) -> Record {
        Record {
            type_name: self.name.clone(),
            asset_name: None,
            row: None,
            fields: self
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.value_type.zero_value()))
                .collect(),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// One materialized row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub type_name: String,
    /// Store name for persisted records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_name: Option<String>,
    /// Grid row the record was read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    pub fields: Vec<(String, Value)>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Overwrite a field. Returns false when the record has no such field.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.slot_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Grow an accumulating field by one element.
    ///
    /// The list starts from whatever the field already holds: an array is
    /// extended, a single non-null value becomes the first element, null
    /// starts empty. Shared by array columns and join resolution.
    pub fn append(&mut self, name: &str, value: Value) -> bool {
        let Some(slot) = self.slot_mut(name) else {
            return false;
        };
        let mut items = match std::mem::replace(slot, Value::Null) {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            single => vec![single],
        };
        items.push(value);
        *slot = Value::Array(items);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::CompositeKind;

    fn item_type() -> RecordType {
        RecordType::new("Item", false)
            .with_field("id", ValueType::Int)
            .with_field("name", ValueType::String)
            .with_field("drops", ValueType::Array(Box::new(ValueType::Int)))
            .with_field("offset", ValueType::Composite(CompositeKind::Vector2))
    }

    #[test]
    fn test_instantiate_zero_values() {
        let record = item_type().instantiate();
        assert_eq!(record.get("id"), Some(&Value::Int(0)));
        assert_eq!(record.get("name"), Some(&Value::Null));
        assert_eq!(record.get("offset"), Some(&Value::Vector(vec![0.0, 0.0])));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_append_grows_in_order() {
        let mut record = item_type().instantiate();
        assert!(record.append("drops", Value::Int(3)));
        assert!(record.append("drops", Value::Int(5)));
        assert_eq!(
            record.get("drops"),
            Some(&Value::Array(vec![Value::Int(3), Value::Int(5)]))
        );
        assert!(!record.append("nope", Value::Int(1)));
    }

    #[test]
    fn test_append_keeps_existing_single_value() {
        let mut record = item_type().instantiate();
        record.set("drops", Value::Int(1));
        record.append("drops", Value::Int(2));
        assert_eq!(
            record.get("drops"),
            Some(&Value::Array(vec![Value::Int(1), Value::Int(2)]))
        );
    }

    #[test]
    fn test_rebox_enum() {
        let ty = ValueType::Enum("Element".into());
        assert_eq!(
            ty.rebox(Value::Int(2)),
            Value::Enum {
                type_name: "Element".into(),
                value: 2
            }
        );
        assert_eq!(ValueType::Int.rebox(Value::Int(2)), Value::Int(2));
    }

    #[test]
    fn test_key_eq_across_enum_and_int() {
        let e = Value::Enum {
            type_name: "Element".into(),
            value: 4,
        };
        assert!(e.key_eq(&Value::Int(4)));
        assert!(!e.key_eq(&Value::Int(5)));
        assert!(Value::Str("a".into()).key_eq(&Value::Str("a".into())));
    }

    #[test]
    fn test_accepts() {
        assert!(ValueType::Float.accepts(&Value::Int(1)));
        assert!(!ValueType::Int.accepts(&Value::Str("1".into())));
        assert!(ValueType::Composite(CompositeKind::Vector2).accepts(&Value::Vector(vec![1.0, 2.0])));
        assert!(!ValueType::Composite(CompositeKind::Vector2).accepts(&Value::Vector(vec![1.0])));
    }
}
