//! Typed values carried by a rendering context.
//!
//! A missing value ("nil") is represented as `None` at every call site that
//! accepts an optional value, never as a variant of [`Value`]. During
//! execution values travel as [`FuncValue`]s; [`Value::into_func_value`] and
//! [`Value::from_func_value`] convert at that boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use gtmpl::Value as FuncValue;

use crate::error::ValueError;

/// A context value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<String>),
}

impl Value {
    /// Name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The execution-time form of this value.
    pub fn into_func_value(self) -> FuncValue {
        match self {
            Value::String(s) => FuncValue::String(s),
            Value::Int(n) => FuncValue::from(n),
            Value::Bool(b) => FuncValue::Bool(b),
            Value::List(items) => FuncValue::Array(items.into_iter().map(FuncValue::String).collect()),
        }
    }

    /// Convert an execution-time value back. Missing values and nil map to
    /// `None`; maps and functions are carried as their printed form.
    pub fn from_func_value(value: &FuncValue) -> Option<Value> {
        match value {
            FuncValue::NoValue | FuncValue::Nil => None,
            FuncValue::Bool(b) => Some(Value::Bool(*b)),
            FuncValue::String(s) => Some(Value::String(s.clone())),
            FuncValue::Number(n) => Some(
                n.as_i64()
                    .map(Value::Int)
                    .unwrap_or_else(|| Value::String(value.to_string())),
            ),
            FuncValue::Array(items) => Some(Value::List(
                items
                    .iter()
                    .map(|item| match item {
                        FuncValue::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            )),
            other => Some(Value::String(other.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => write!(f, "[{}]", items.join(" ")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(String::from).collect())
    }
}

/// Render any value, nil included, as text.
pub fn to_string(value: Option<&Value>) -> String {
    value.map(Value::to_string).unwrap_or_default()
}

/// Coerce to an integer. Strings must hold a decimal integer.
pub fn to_int(value: Option<&Value>) -> Result<i64, ValueError> {
    match value {
        Some(Value::Int(n)) => Ok(*n),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ValueError::NotAnInteger(s.clone())),
        Some(other) => Err(ValueError::Unrepresentable {
            from: other.kind(),
            to: "int",
        }),
        None => Err(ValueError::Unrepresentable {
            from: "nil",
            to: "int",
        }),
    }
}

/// Coerce to a boolean. Total: anything not recognisably true is false.
pub fn to_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.as_str(), "true" | "1" | "yes"),
        Some(Value::Int(n)) => *n != 0,
        Some(Value::List(_)) | None => false,
    }
}

/// Nil, the empty string and the empty list are empty.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::List(items)) => items.is_empty(),
        Some(Value::Int(_)) | Some(Value::Bool(_)) => false,
    }
}

/// Template truthiness: empty values, `0` and `false` are false.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Int(n)) => *n != 0,
        other => !is_empty(other),
    }
}

/// `value` unless it is empty, otherwise `fallback`.
pub fn default_value(fallback: Option<Value>, value: Option<Value>) -> Option<Value> {
    if is_empty(value.as_ref()) {
        fallback
    } else {
        value
    }
}

/// First non-empty value.
pub fn coalesce(values: impl IntoIterator<Item = Option<Value>>) -> Option<Value> {
    values.into_iter().find(|v| !is_empty(v.as_ref())).flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::from("a").to_string(), "a");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "[a b]");
        assert_eq!(to_string(None), "");
    }

    #[test]
    fn test_to_int() {
        assert_eq!(to_int(Some(&Value::Int(3))).unwrap(), 3);
        assert_eq!(to_int(Some(&Value::from(" 12 "))).unwrap(), 12);
        assert!(matches!(
            to_int(Some(&Value::from("not-a-number"))),
            Err(ValueError::NotAnInteger(_))
        ));
        assert!(matches!(
            to_int(Some(&Value::Bool(true))),
            Err(ValueError::Unrepresentable { from: "bool", .. })
        ));
        assert!(to_int(None).is_err());
    }

    #[test]
    fn test_to_bool() {
        assert!(to_bool(Some(&Value::from("yes"))));
        assert!(to_bool(Some(&Value::from("1"))));
        assert!(!to_bool(Some(&Value::from("no"))));
        assert!(to_bool(Some(&Value::Int(7))));
        assert!(!to_bool(None));
    }

    #[test]
    fn test_empty_default_coalesce() {
        assert!(is_empty(None));
        assert!(is_empty(Some(&Value::from(""))));
        assert!(is_empty(Some(&Value::List(vec![]))));
        assert!(!is_empty(Some(&Value::Int(0))));

        assert_eq!(
            default_value(Some(Value::from("x")), None),
            Some(Value::from("x"))
        );
        assert_eq!(
            default_value(Some(Value::from("x")), Some(Value::from("y"))),
            Some(Value::from("y"))
        );
        assert_eq!(
            coalesce(vec![None, Some(Value::from("")), Some(Value::Int(1))]),
            Some(Value::Int(1))
        );
        assert_eq!(coalesce(vec![None, Some(Value::from(""))]), None);
    }

    #[test]
    fn test_func_value_conversion() {
        for value in [
            Value::from("api"),
            Value::Int(8080),
            Value::Bool(true),
            Value::from(vec!["auth", "db"]),
        ] {
            let back = Value::from_func_value(&value.clone().into_func_value());
            assert_eq!(back, Some(value));
        }
        assert_eq!(Value::from_func_value(&FuncValue::NoValue), None);
        assert_eq!(Value::from_func_value(&FuncValue::Nil), None);
    }

    #[test]
    fn test_deserialize_untagged() {
        let v: Value = serde_json::from_str("[\"a\", \"b\"]").unwrap();
        assert_eq!(v, Value::from(vec!["a", "b"]));
        let v: Value = serde_json::from_str("8080").unwrap();
        assert_eq!(v, Value::Int(8080));
        let v: Value = serde_json::from_str("true").unwrap();
        assert_eq!(v, Value::Bool(true));
    }
}
