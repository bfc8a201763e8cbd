//! Error types for transform invocation and converter execution.

use std::fmt;

/// Boxed error returned by caller-supplied fallible converters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error raised when an invoked [`Transform`](crate::Transform) cannot produce output.
#[derive(Debug)]
pub enum TransformError {
    /// A `map_array` step found something other than an array in its field.
    InvalidFieldType {
        field: String,
        actual: &'static str,
    },
    /// A caller-supplied converter failed. The converter's error is kept as `source`.
    Conversion {
        field: String,
        source: BoxError,
    },
    /// The input did not serialize to a JSON object.
    NotARecord {
        actual: &'static str,
    },
    Serialization(serde_json::Error),
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::InvalidFieldType { field, actual } => write!(
                f,
                "expected field `{}` to be an array but it was {}",
                field, actual
            ),
            TransformError::Conversion { field, source } => {
                write!(f, "Failed to convert field '{}': {}", field, source)
            }
            TransformError::NotARecord { actual } => {
                write!(f, "Expected a record (JSON object) but got {}", actual)
            }
            TransformError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for TransformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransformError::Conversion { source, .. } => Some(source.as_ref()),
            TransformError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TransformError {
    fn from(err: serde_json::Error) -> Self {
        TransformError::Serialization(err)
    }
}

/// Error returned by builtin and declarative converters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConverterError {
    UnexpectedKind {
        converter: String,
        expected: &'static str,
        actual: &'static str,
    },
    InvalidValue(String),
}

impl fmt::Display for ConverterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConverterError::UnexpectedKind {
                converter,
                expected,
                actual,
            } => write!(
                f,
                "Converter '{}' expected {} but got {}",
                converter, expected, actual
            ),
            ConverterError::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
        }
    }
}

impl std::error::Error for ConverterError {}

/// Human-readable name of a JSON value's kind, used in error messages.
pub fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
