//! Converter registry for named value conversions.
//!
//! Declarative pipelines refer to converters by name. This module holds the
//! lookup table and the builtin converters every registry starts with.

use std::collections::HashMap;
use std::sync::Arc;

use convert_case::{Case, Casing};
use serde_json::Value;

use crate::error::{kind_of, ConverterError};

/// A shareable value conversion.
pub type ValueConverter = Arc<dyn Fn(Value) -> Result<Value, ConverterError> + Send + Sync>;

/// Registry for storing and looking up converters by name
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<String, ValueConverter>,
}

impl ConverterRegistry {
    /// Create a new empty converter registry
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Create a registry preloaded with the builtin converters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register("identity", Ok);
        registry.register("uppercase", |v| map_str("uppercase", v, |s| s.to_uppercase()));
        registry.register("lowercase", |v| map_str("lowercase", v, |s| s.to_lowercase()));
        registry.register("trim", |v| map_str("trim", v, |s| s.trim().to_string()));
        registry.register("snake_case", |v| map_str("snake_case", v, |s| s.to_case(Case::Snake)));
        registry.register("camel_case", |v| map_str("camel_case", v, |s| s.to_case(Case::Camel)));
        registry.register("kebab_case", |v| map_str("kebab_case", v, |s| s.to_case(Case::Kebab)));
        registry.register("title_case", |v| map_str("title_case", v, |s| s.to_case(Case::Title)));
        registry.register("to_string", to_string);
        registry.register("parse_number", parse_number);
        registry.register("length", length);

        registry
    }

    /// Register a converter, replacing any converter with the same name
    ///
    /// # Example
    ///
    /// ```ignore
    /// use reshape::ConverterRegistry;
    /// use serde_json::Value;
    ///
    /// let mut registry = ConverterRegistry::new();
    /// registry.register("negate", |v: Value| {
    ///     Ok(v.as_bool().map(|b| Value::Bool(!b)).unwrap_or(Value::Null))
    /// });
    /// ```
    pub fn register<F>(&mut self, name: impl Into<String>, converter: F)
    where
        F: Fn(Value) -> Result<Value, ConverterError> + Send + Sync + 'static,
    {
        self.converters.insert(name.into(), Arc::new(converter));
    }

    /// Look up a converter by name
    pub fn get(&self, name: &str) -> Option<ValueConverter> {
        self.converters.get(name).cloned()
    }

    /// Check if a converter is registered
    pub fn has_converter(&self, name: &str) -> bool {
        self.converters.contains_key(name)
    }

    /// Sorted list of all registered converter names
    pub fn converter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.converters.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn count(&self) -> usize {
        self.converters.len()
    }
}

fn map_str<F>(converter: &str, value: Value, f: F) -> Result<Value, ConverterError>
where
    F: FnOnce(&str) -> String,
{
    match value {
        Value::String(s) => Ok(Value::String(f(&s))),
        other => Err(ConverterError::UnexpectedKind {
            converter: converter.to_string(),
            expected: "a string",
            actual: kind_of(&other),
        }),
    }
}

fn to_string(value: Value) -> Result<Value, ConverterError> {
    Ok(match value {
        Value::String(s) => Value::String(s),
        Value::Null => Value::Null,
        other => Value::String(other.to_string()),
    })
}

fn parse_number(value: Value) -> Result<Value, ConverterError> {
    match value {
        Value::Number(n) => Ok(Value::Number(n)),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Value::from(i));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| ConverterError::InvalidValue(format!("'{}' is not a number", s)))
        }
        other => Err(ConverterError::UnexpectedKind {
            converter: "parse_number".to_string(),
            expected: "a string or number",
            actual: kind_of(&other),
        }),
    }
}

fn length(value: Value) -> Result<Value, ConverterError> {
    match value {
        Value::String(s) => Ok(Value::from(s.chars().count())),
        Value::Array(items) => Ok(Value::from(items.len())),
        Value::Object(map) => Ok(Value::from(map.len())),
        other => Err(ConverterError::UnexpectedKind {
            converter: "length".to_string(),
            expected: "a string, array or object",
            actual: kind_of(&other),
        }),
    }
}
