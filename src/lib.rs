//! # Reshape: Composable Record Transforms
//!
//! Reshape builds reusable, pure transforms over structured records. A
//! [`Transform`] is both a function and a builder: every builder method returns
//! a new transform, leaving the original untouched.
//!
//! ## Features
//!
//! - **Chain-builder**: `pick`, `map_property` and `map_array`, chained without limit
//! - **Serde bridging**: start from any `Serialize` type, finish in any `Deserialize` type
//! - **Converter registry**: named value converters, with builtins for common string work
//! - **Declarative pipelines**: describe a chain in YAML and build it at runtime
//!
//! ## Example: Chain-builder
//!
//! ```ignore
//! use reshape::transform;
//! use serde_json::{json, Value};
//!
//! let summary = transform()
//!     .pick(["a", "b", "e"])
//!     .map_property("b", |b| json!(b.as_i64().unwrap_or(0) + 42))
//!     .map_array("e", |e| e["name"].clone());
//!
//! let output = summary.apply_value(json!({
//!     "a": "A",
//!     "b": 1,
//!     "e": [{"name": "X"}, {"name": "Y"}]
//! }))?;
//! assert_eq!(Value::Object(output), json!({"a": "A", "b": 43, "e": ["X", "Y"]}));
//! ```
//!
//! ## Example: YAML pipeline
//!
//! ```yaml
//! pipeline:
//!   name: summary
//!   steps:
//!     - op: pick
//!       fields: [a, b, e]
//!     - op: map_property
//!       field: b
//!       converter: { kind: add, value: 42 }
//!     - op: map_array
//!       field: e
//!       converter: { kind: get, field: name }
//! ```

// Core modules
pub mod error;
pub mod record;
pub mod transform;

pub mod converters;
pub mod pipeline;
pub mod serialization;

// Re-export key types
pub use error::{BoxError, ConverterError, TransformError};
pub use record::Record;
pub use transform::{compose, transform, Transform};

pub use converters::{ConverterRegistry, ValueConverter};
pub use pipeline::{run_records, PipelineCatalog, PipelineDef, PipelineError, RunError, RunSummary};
pub use serialization::{NdjsonReader, OutputFormat, RecordWriter, SerializationError};
