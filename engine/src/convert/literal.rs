//! Cell literal grammar.
//!
//! ```text
//! string     "text"            quotes stripped
//! bool       true | FALSE      case-insensitive
//! integer    -12               range-checked for the declared width
//! composite  (1, 2.5, 3)       parentheses optional, exact arity
//! array      [a, (1,2), "x"]   brackets optional, nesting respected
//! ```

use super::types::{CompositeKind, ValueType};
use crate::models::Value;

/// Strip one pair of surrounding double quotes.
pub fn parse_string(text: &str) -> Value {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    Value::Str(inner.to_string())
}

pub fn parse_bool(text: &str) -> Option<Value> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => None,
    }
}

/// Parse an integer that must fit the declared width.
pub fn parse_integer(ty: &ValueType, text: &str) -> Option<Value> {
    let text = text.trim();
    let v = match ty {
        ValueType::Byte => text.parse::<u8>().ok().map(i64::from),
        ValueType::Short => text.parse::<i16>().ok().map(i64::from),
        ValueType::Int => text.parse::<i32>().ok().map(i64::from),
        ValueType::Long => text.parse::<i64>().ok(),
        _ => None,
    }?;
    Some(Value::Int(v))
}

pub fn parse_float(ty: &ValueType, text: &str) -> Option<Value> {
    let text = text.trim();
    let v = match ty {
        ValueType::Float => text.parse::<f32>().ok().map(f64::from),
        ValueType::Double => text.parse::<f64>().ok(),
        _ => None,
    }?;
    v.is_finite().then_some(Value::Float(v))
}

/// Parse `(a, b, ...)` with exactly the arity of `kind`.
pub fn parse_composite(kind: CompositeKind, text: &str) -> Option<Value> {
    let inner = strip_delimiters(text.trim(), '(', ')');
    let parts = split_elements(inner);
    if parts.len() != kind.arity() {
        return None;
    }

    let mut components = Vec::with_capacity(parts.len());
    for part in parts {
        let part = part.trim();
        let component = if kind.is_integral() {
            part.parse::<i32>().ok().map(f64::from)?
        } else {
            part.parse::<f32>().ok().map(f64::from)?
        };
        components.push(component);
    }
    Some(Value::Vector(components))
}

/// Contents of a bracketed array literal, split into element texts.
///
/// `[]` and the empty string give no elements.
pub fn array_elements(text: &str) -> Vec<&str> {
    let inner = strip_delimiters(text.trim(), '[', ']');
    if inner.trim().is_empty() {
        return Vec::new();
    }
    split_elements(inner)
}

fn strip_delimiters(text: &str, open: char, close: char) -> &str {
    text.strip_prefix(open)
        .and_then(|t| t.strip_suffix(close))
        .unwrap_or(text)
}

/// Split on top-level commas, keeping nested `()`, `[]` and quoted text
/// together.
pub fn split_elements(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' | '[' if !in_quotes => depth += 1,
            ')' | ']' if !in_quotes => depth -= 1,
            ',' if !in_quotes && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_strips_one_pair() {
        assert_eq!(parse_string("\"hello\""), Value::Str("hello".into()));
        assert_eq!(parse_string("\"\"quoted\"\""), Value::Str("\"quoted\"".into()));
        assert_eq!(parse_string("bare"), Value::Str("bare".into()));
    }

    #[test]
    fn test_integer_widths() {
        assert_eq!(parse_integer(&ValueType::Byte, "255"), Some(Value::Int(255)));
        assert_eq!(parse_integer(&ValueType::Byte, "256"), None);
        assert_eq!(parse_integer(&ValueType::Short, "-32768"), Some(Value::Int(-32768)));
        assert_eq!(parse_integer(&ValueType::Int, "3000000000"), None);
        assert_eq!(parse_integer(&ValueType::Long, "3000000000"), Some(Value::Int(3_000_000_000)));
        assert_eq!(parse_integer(&ValueType::Int, "1.5"), None);
    }

    #[test]
    fn test_bool_case_insensitive() {
        assert_eq!(parse_bool("TRUE"), Some(Value::Bool(true)));
        assert_eq!(parse_bool(" false "), Some(Value::Bool(false)));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn test_composite_arity() {
        assert_eq!(
            parse_composite(CompositeKind::Vector3, "(1, 2.5, -3)"),
            Some(Value::Vector(vec![1.0, 2.5, -3.0]))
        );
        assert_eq!(
            parse_composite(CompositeKind::Vector2, "4,5"),
            Some(Value::Vector(vec![4.0, 5.0]))
        );
        assert_eq!(parse_composite(CompositeKind::Vector3, "(1, 2)"), None);
        assert_eq!(parse_composite(CompositeKind::Vector2Int, "(1.5, 2)"), None);
    }

    #[test]
    fn test_split_respects_nesting() {
        assert_eq!(
            split_elements("(1, 2), [3, 4], \"a, b\", 5"),
            vec!["(1, 2)", "[3, 4]", "\"a, b\"", "5"]
        );
        assert_eq!(array_elements("[]"), Vec::<&str>::new());
        assert_eq!(array_elements("[1,2]"), vec!["1", "2"]);
        assert_eq!(array_elements("7"), vec!["7"]);
    }
}
