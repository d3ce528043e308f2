//! Declared types and enumeration definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Composite kinds
// =============================================================================

/// Fixed-arity vector-like types written as `(a, b, ...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompositeKind {
    Vector2,
    Vector3,
    Vector4,
    Vector2Int,
    Vector3Int,
    Color,
    Rect,
}

impl CompositeKind {
    pub const ALL: [CompositeKind; 7] = [
        CompositeKind::Vector2,
        CompositeKind::Vector3,
        CompositeKind::Vector4,
        CompositeKind::Vector2Int,
        CompositeKind::Vector3Int,
        CompositeKind::Color,
        CompositeKind::Rect,
    ];

    pub fn arity(self) -> usize {
        match self {
            CompositeKind::Vector2 | CompositeKind::Vector2Int => 2,
            CompositeKind::Vector3 | CompositeKind::Vector3Int => 3,
            CompositeKind::Vector4 | CompositeKind::Color | CompositeKind::Rect => 4,
        }
    }

    /// Components must be whole numbers.
    pub fn is_integral(self) -> bool {
        matches!(self, CompositeKind::Vector2Int | CompositeKind::Vector3Int)
    }

    pub fn name(self) -> &'static str {
        match self {
            CompositeKind::Vector2 => "Vector2",
            CompositeKind::Vector3 => "Vector3",
            CompositeKind::Vector4 => "Vector4",
            CompositeKind::Vector2Int => "Vector2Int",
            CompositeKind::Vector3Int => "Vector3Int",
            CompositeKind::Color => "Color",
            CompositeKind::Rect => "Rect",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

// =============================================================================
// Value types
// =============================================================================

/// A resolved declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Composite(CompositeKind),
    /// Registered enumeration, by its full name.
    Enum(String),
    /// Allow-listed external reference type.
    Reference(String),
    /// Pure record class filled in by join resolution.
    Record(String),
    Array(Box<ValueType>),
}

impl ValueType {
    /// Primitive type for a keyword, accepting the common aliases.
    pub fn primitive(keyword: &str) -> Option<Self> {
        let ty = match keyword {
            "bool" | "boolean" | "Boolean" => ValueType::Bool,
            "byte" | "Byte" => ValueType::Byte,
            "short" | "Int16" => ValueType::Short,
            "int" | "Int32" => ValueType::Int,
            "long" | "Int64" => ValueType::Long,
            "float" | "Single" => ValueType::Float,
            "double" | "Double" => ValueType::Double,
            "string" | "String" => ValueType::String,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ValueType::Byte | ValueType::Short | ValueType::Int | ValueType::Long
        )
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, ValueType::Enum(_))
    }

    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::Array(inner) => Some(inner),
            _ => None,
        }
    }

    /// Name as written in generated declarations.
    pub fn type_name(&self) -> String {
        match self {
            ValueType::Bool => "bool".to_string(),
            ValueType::Byte => "byte".to_string(),
            ValueType::Short => "short".to_string(),
            ValueType::Int => "int".to_string(),
            ValueType::Long => "long".to_string(),
            ValueType::Float => "float".to_string(),
            ValueType::Double => "double".to_string(),
            ValueType::String => "string".to_string(),
            ValueType::Composite(kind) => kind.name().to_string(),
            ValueType::Enum(name) | ValueType::Reference(name) | ValueType::Record(name) => {
                name.clone()
            }
            ValueType::Array(inner) => format!("{}[]", inner.type_name()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// One member of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    /// Explicit value; assigned on registration when absent.
    #[serde(default)]
    pub value: Option<i64>,
}

impl EnumMember {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
        }
    }

    pub fn auto(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// An enumeration known to the type registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    /// Full name; dotted prefixes act as namespaces.
    pub name: String,
    /// Bit-flag enumeration.
    #[serde(default)]
    pub flags: bool,
    pub members: Vec<EnumMember>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>, members: Vec<EnumMember>) -> Self {
        Self {
            name: name.into(),
            flags: false,
            members,
        }
        .normalized()
    }

    pub fn flags(name: impl Into<String>, members: Vec<EnumMember>) -> Self {
        Self {
            name: name.into(),
            flags: true,
            members,
        }
        .normalized()
    }

    /// Assign values to members declared without one.
    ///
    /// Plain enums count up from the previous value; flag enums take the next
    /// unused power of two. Once the next value would leave the `i64` range,
    /// later auto members stay unassigned.
    pub fn normalized(mut self) -> Self {
        let mut next: Option<i64> = Some(if self.flags { 1 } else { 0 });
        for member in &mut self.members {
            match member.value {
                Some(v) => {
                    next = if self.flags {
                        next_power_of_two_above(v)
                    } else {
                        v.checked_add(1)
                    };
                }
                None => match next {
                    Some(value) => {
                        member.value = Some(value);
                        next = if self.flags {
                            value.checked_mul(2)
                        } else {
                            value.checked_add(1)
                        };
                    }
                    None => tracing::warn!(
                        enum_name = %self.name,
                        member = %member.name,
                        "no value left for enum member, leaving it unassigned"
                    ),
                },
            }
        }
        self
    }

    /// Last dotted segment of the name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Whether `name` refers to this enum, by full or short name.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.short_name() == name
    }

    /// Whether an integer is a value of this enum: a member's value, or for
    /// flag enums any combination of member bits.
    pub fn accepts_value(&self, value: i64) -> bool {
        if self.flags {
            let mask = self.members.iter().filter_map(|m| m.value).fold(0, |acc, v| acc | v);
            value >= 0 && value & !mask == 0
        } else {
            self.members.iter().any(|m| m.value == Some(value))
        }
    }

    /// Value of a member. Unassigned members have none.
    pub fn member_value(&self, member: &str) -> Option<i64> {
        self.members
            .iter()
            .find(|m| m.name == member)
            .and_then(|m| m.value)
    }

    pub fn member_name(&self, value: i64) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.value == Some(value))
            .map(|m| m.name.as_str())
    }
}

fn next_power_of_two_above(v: i64) -> Option<i64> {
    if v <= 0 {
        return Some(1);
    }
    let mut p: i64 = 1;
    while p <= v {
        p = p.checked_mul(2)?;
    }
    Some(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_enum_auto_values() {
        let def = EnumDef::new(
            "Element",
            vec![
                EnumMember::auto("None"),
                EnumMember::new("Fire", 10),
                EnumMember::auto("Water"),
            ],
        );
        assert_eq!(def.member_value("None"), Some(0));
        assert_eq!(def.member_value("Fire"), Some(10));
        assert_eq!(def.member_value("Water"), Some(11));
        assert_eq!(def.member_name(11), Some("Water"));
    }

    #[test]
    fn test_flag_enum_auto_values() {
        let def = EnumDef::flags(
            "Game.Tags",
            vec![
                EnumMember::auto("Rare"),
                EnumMember::auto("Cursed"),
                EnumMember::new("Quest", 16),
                EnumMember::auto("Bound"),
            ],
        );
        assert_eq!(def.member_value("Rare"), Some(1));
        assert_eq!(def.member_value("Cursed"), Some(2));
        assert_eq!(def.member_value("Bound"), Some(32));
        assert_eq!(def.short_name(), "Tags");
        assert!(def.answers_to("Tags"));
        assert!(def.answers_to("Game.Tags"));
        assert!(!def.answers_to("Game"));
    }

    #[test]
    fn test_auto_values_stop_at_i64_range() {
        let def = EnumDef::new(
            "Limits",
            vec![EnumMember::new("Max", i64::MAX), EnumMember::auto("After")],
        );
        assert_eq!(def.member_value("Max"), Some(i64::MAX));
        assert_eq!(def.members[1].value, None);
        assert_eq!(def.member_value("After"), None);

        let flags = EnumDef::flags(
            "Bits",
            vec![EnumMember::new("High", 1 << 62), EnumMember::auto("Next")],
        );
        assert_eq!(flags.members[1].value, None);

        let top = EnumDef::flags("Top", vec![EnumMember::new("Max", i64::MAX), EnumMember::auto("Next")]);
        assert_eq!(top.members[1].value, None);
    }

    #[test]
    fn test_accepts_value() {
        let plain = EnumDef::new("Element", vec![EnumMember::auto("Fire"), EnumMember::new("Water", 4)]);
        assert!(plain.accepts_value(4));
        assert!(!plain.accepts_value(1));

        let flags = EnumDef::flags("Tags", vec![EnumMember::auto("Rare"), EnumMember::auto("Cursed")]);
        assert!(flags.accepts_value(0));
        assert!(flags.accepts_value(3));
        assert!(!flags.accepts_value(4));
        assert!(!flags.accepts_value(-1));
    }

    #[test]
    fn test_type_names() {
        let ty = ValueType::Array(Box::new(ValueType::Composite(CompositeKind::Vector3)));
        assert_eq!(ty.type_name(), "Vector3[]");
        assert_eq!(ValueType::primitive("Int32"), Some(ValueType::Int));
        assert_eq!(ValueType::primitive("Vector3"), None);
        assert_eq!(CompositeKind::from_name("Rect"), Some(CompositeKind::Rect));
    }
}
