//! Evaluation context: the flat identifier → value mapping an expression sees.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::value::Value;

/// Name under which the invocation instant is bound
pub const NOW: &str = "now";

/// Read-only bindings for one render or evaluation.
///
/// Keys are flattened: a record is bound field by field
/// (`filter.name`, `filter.status`, ...) so lookups never traverse
/// into host objects.
#[derive(Debug, Clone)]
pub struct Context {
    variables: BTreeMap<String, Value>,
    now: DateTime<Utc>,
}

impl Context {
    /// Context with only `now` bound
    pub fn new(now: DateTime<Utc>) -> Self {
        let mut variables = BTreeMap::new();
        variables.insert(NOW.to_string(), Value::DateTime(now));
        Self { variables, now }
    }

    /// Bind a variable, builder style
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Bind every field of a record under `prefix.`
    pub fn with_record<I, K, V>(mut self, prefix: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (field, value) in fields {
            self.set(format!("{}.{}", prefix, field.as_ref()), value);
        }
        self
    }

    /// Bind a variable; `now` cannot be rebound
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        if name == NOW {
            tracing::warn!("Ignoring attempt to rebind '{}'", NOW);
            return;
        }
        self.variables.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// The instant every reference to `now` resolves to
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Bound variable names, sorted
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }
}
