//! Rendering context: resolved variable values keyed by name.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::LangResult;
use crate::value::{FuncValue, Value};

/// Resolved variables consumed by the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    variables: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Parse a JSON object of scalars and string arrays.
    pub fn from_json(json: &str) -> LangResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Merge `other` into this context; values from `other` win.
    pub fn merge(&mut self, other: &Context) {
        for (k, v) in &other.variables {
            self.variables.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// The map a template executes against, with `.` bound to it.
    pub(crate) fn to_exec_context(&self) -> gtmpl::Context {
        let data: HashMap<String, FuncValue> = self
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone().into_func_value()))
            .collect();
        gtmpl::Context::from(FuncValue::from(data))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Context::new();
        for (k, v) in iter {
            ctx.set(k, v);
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_other_wins() {
        let mut base = Context::new().with("a", "1").with("b", "2");
        let other = Context::new().with("b", "override").with("c", true);
        base.merge(&other);

        assert_eq!(base.get("a"), Some(&Value::from("1")));
        assert_eq!(base.get("b"), Some(&Value::from("override")));
        assert_eq!(base.get("c"), Some(&Value::Bool(true)));
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn test_from_json() {
        let ctx = Context::from_json(
            r#"{"project_name": "demo", "port": 8080, "tls": false, "features": ["auth"]}"#,
        )
        .unwrap();

        assert_eq!(ctx.get("project_name"), Some(&Value::from("demo")));
        assert_eq!(ctx.get("port"), Some(&Value::Int(8080)));
        assert_eq!(ctx.get("tls"), Some(&Value::Bool(false)));
        assert_eq!(ctx.get("features"), Some(&Value::from(vec!["auth"])));
    }

    #[test]
    fn test_from_json_rejects_nested_objects() {
        assert!(Context::from_json(r#"{"a": {"b": 1}}"#).is_err());
    }
}
