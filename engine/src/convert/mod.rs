//! Typed value conversion.
//!
//! Turns one cell's text into a [`Value`] for a declared [`ValueType`].
//! Types are looked up in an explicit [`TypeRegistry`], filled at startup
//! with the enumerations, reference types and record classes the converter
//! is configured to know about.
//!
//! ## Rules, in order
//!
//! 1. Blank input is absent, never an error.
//! 2. Strings are quoted before parsing so one quote-stripping path applies.
//! 3. Enums parse by member name; `Type.Member` text is also accepted by
//!    integer targets, with the type looked up by name.
//! 4. Flag enums accept `A | B`, OR-ing the members.
//! 5. Primitives use their standard grammar.
//! 6. Composites parse from `(a, b, ...)`.
//! 7. Arrays parse from `[a, b, ...]`, element by element.
//! 8. References only for allow-listed type names.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sheetforge::{EnumDef, EnumMember, TypeRegistry, Value, ValueType};
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_enum(EnumDef::flags("Tags", vec![
//!     EnumMember::auto("Rare"),
//!     EnumMember::auto("Cursed"),
//! ]));
//!
//! let tags = registry.resolve("Tags").unwrap();
//! assert_eq!(registry.convert(&tags, "Rare | Cursed").unwrap().as_i64(), Some(3));
//! ```

pub mod literal;
pub mod types;

pub use types::{CompositeKind, EnumDef, EnumMember, ValueType};

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::error::{ConvertError, ConvertResult};
use crate::models::Value;

/// `TypeName.Member`, where the type name may itself be dotted.
static ENUM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<type>[A-Za-z_][\w.]*)\.(?P<member>[A-Za-z_]\w*(?:\s*\|\s*[A-Za-z_]\w*)*)\s*$")
        .expect("enum pattern is valid")
});

/// Closed set of types known to the converter.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    enums: Vec<EnumDef>,
    reference_types: BTreeSet<String>,
    record_types: BTreeSet<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enumeration. Registration order decides ambiguous
    /// short-name lookups.
    pub fn register_enum(&mut self, def: EnumDef) {
        let def = def.normalized();
        if let Some(existing) = self.enums.iter_mut().find(|e| e.name == def.name) {
            tracing::debug!(name = %def.name, "replacing enum definition");
            *existing = def;
        } else {
            self.enums.push(def);
        }
    }

    pub fn with_enum(mut self, def: EnumDef) -> Self {
        self.register_enum(def);
        self
    }

    /// Allow conversion to an external reference type.
    pub fn register_reference(&mut self, name: impl Into<String>) {
        self.reference_types.insert(name.into());
    }

    /// Declare a pure record class usable as a field type.
    pub fn register_record(&mut self, name: impl Into<String>) {
        self.record_types.insert(name.into());
    }

    pub fn enums(&self) -> &[EnumDef] {
        &self.enums
    }

    pub fn is_reference(&self, name: &str) -> bool {
        self.reference_types.contains(name)
    }

    /// Enumerations answering to `name`, by full or short name.
    pub fn find_enums(&self, name: &str) -> Vec<&EnumDef> {
        self.enums.iter().filter(|e| e.answers_to(name)).collect()
    }

    /// The one enumeration for `name`.
    ///
    /// An exact full-name match wins. Otherwise several short-name
    /// candidates resolve to the first registered one, with a warning.
    pub fn lookup_enum(&self, name: &str) -> Option<&EnumDef> {
        if let Some(exact) = self.enums.iter().find(|e| e.name == name) {
            return Some(exact);
        }
        let candidates = self.find_enums(name);
        if candidates.len() > 1 {
            let names: Vec<&str> = candidates.iter().map(|e| e.name.as_str()).collect();
            tracing::warn!(
                name,
                candidates = ?names,
                "ambiguous enum name, using first registered"
            );
        }
        candidates.into_iter().next()
    }

    /// Resolve a declared type name from a sheet's type row.
    pub fn resolve(&self, declared: &str) -> Option<ValueType> {
        let declared = declared.trim();
        if declared.is_empty() {
            return None;
        }
        if let Some(element) = declared.strip_suffix("[]") {
            return self
                .resolve(element)
                .map(|inner| ValueType::Array(Box::new(inner)));
        }
        if let Some(primitive) = ValueType::primitive(declared) {
            return Some(primitive);
        }
        if let Some(kind) = CompositeKind::from_name(declared) {
            return Some(ValueType::Composite(kind));
        }
        if let Some(def) = self.lookup_enum(declared) {
            return Some(ValueType::Enum(def.name.clone()));
        }
        if self.reference_types.contains(declared) {
            return Some(ValueType::Reference(declared.to_string()));
        }
        if self.record_types.contains(declared) {
            return Some(ValueType::Record(declared.to_string()));
        }
        None
    }

    // =========================================================================
    // Enum API
    // =========================================================================

    /// Parse member text for an enumeration.
    ///
    /// Flag enums split on `|`, ignore blank segments and OR the members.
    /// Any unknown member is an error, as is a type that is not an enum.
    pub fn parse_enum(&self, type_name: &str, text: &str) -> ConvertResult<i64> {
        let def = match self.lookup_enum(type_name) {
            Some(def) => def,
            None if self.resolve(type_name).is_some() => {
                return Err(ConvertError::NotAnEnum(type_name.to_string()))
            }
            None => return Err(ConvertError::UnknownType(type_name.to_string())),
        };

        let unknown = |member: &str| ConvertError::UnknownMember {
            type_name: def.name.clone(),
            member: member.to_string(),
        };

        if def.flags {
            let mut bits = 0;
            for segment in text.split('|').map(str::trim).filter(|s| !s.is_empty()) {
                bits |= def.member_value(segment).ok_or_else(|| unknown(segment))?;
            }
            Ok(bits)
        } else {
            let member = text.trim();
            def.member_value(member).ok_or_else(|| unknown(member))
        }
    }

    /// Resolve `Type.Member` text when no enum type is declared.
    ///
    /// Absent when the pattern does not match, no type has the name, or the
    /// member is unknown.
    pub fn parse_qualified_enum(&self, text: &str) -> Option<(String, i64)> {
        let caps = ENUM_PATTERN.captures(text)?;
        let type_name = &caps["type"];
        let def = self.lookup_enum(type_name)?;
        let member = &caps["member"];
        if !def.flags && member.contains('|') {
            return None;
        }
        self.parse_enum(&def.name, member)
            .ok()
            .map(|v| (def.name.clone(), v))
    }

    // =========================================================================
    // Generic conversion
    // =========================================================================

    /// Convert a cell for `target`. Absent for blank or unparsable input.
    pub fn convert(&self, target: &ValueType, raw: &str) -> Option<Value> {
        let text = raw.replace("\r\n", "\n");
        if text.trim().is_empty() {
            return None;
        }

        match target {
            ValueType::String => Some(literal::parse_string(&format!("\"{}\"", text))),
            ValueType::Enum(name) => {
                let member = strip_type_prefix(&text, self.lookup_enum(name));
                self.parse_enum(name, member)
                    .ok()
                    .map(|value| Value::Enum {
                        type_name: name.clone(),
                        value,
                    })
            }
            t if t.is_integer() => literal::parse_integer(t, &text).or_else(|| {
                let (_, value) = self.parse_qualified_enum(&text)?;
                Some(Value::Int(value))
            }),
            ValueType::Bool => literal::parse_bool(&text),
            ValueType::Float | ValueType::Double => literal::parse_float(target, &text),
            ValueType::Composite(kind) => literal::parse_composite(*kind, &text),
            ValueType::Array(element) => {
                let mut items = Vec::new();
                for part in literal::array_elements(&text) {
                    items.push(self.convert_element(element, part)?);
                }
                Some(Value::Array(items))
            }
            ValueType::Reference(name) => {
                if self.is_reference(name) {
                    Some(Value::Reference {
                        type_name: name.clone(),
                        key: text.trim().to_string(),
                    })
                } else {
                    None
                }
            }
            // filled by joins, never from cell text
            ValueType::Record(_) => None,
            _ => None,
        }
    }

    /// Array elements may be quoted strings; blank elements are an error.
    fn convert_element(&self, element: &ValueType, text: &str) -> Option<Value> {
        match element {
            ValueType::String => Some(literal::parse_string(text.trim())),
            _ => self.convert(element, text),
        }
    }

    /// Convert against a declared type name.
    pub fn convert_declared(&self, declared: &str, raw: &str) -> Option<Value> {
        let target = self.resolve(declared)?;
        self.convert(&target, raw)
    }

    /// Convert with no declared type: `Type.Member` text becomes an enum
    /// value, anything else stays text.
    pub fn convert_untyped(&self, raw: &str) -> Option<Value> {
        if raw.trim().is_empty() {
            return None;
        }
        if ENUM_PATTERN.is_match(raw) {
            return self
                .parse_qualified_enum(raw)
                .map(|(type_name, value)| Value::Enum { type_name, value });
        }
        Some(literal::parse_string(&format!("\"{}\"", raw)))
    }
}

/// Accept `Element.Fire` as well as `Fire` for a declared `Element`.
fn strip_type_prefix<'t>(text: &'t str, def: Option<&EnumDef>) -> &'t str {
    let Some(def) = def else {
        return text;
    };
    let trimmed = text.trim();
    [def.name.as_str(), def.short_name()]
        .iter()
        .find_map(|prefix| {
            trimmed
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('.'))
        })
        .unwrap_or(text)
}
