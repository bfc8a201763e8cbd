//! The chain-builder.
//!
//! A [`Transform`] is a function from an input value to a [`Record`] that can also
//! derive new, more specialised transforms from itself:
//!
//! ```ignore
//! use reshape::transform;
//! use serde_json::{json, Value};
//!
//! let t = transform()
//!     .pick(["a", "b", "e"])
//!     .map_property("b", |b| json!(b.as_i64().unwrap_or(0) + 42))
//!     .map_array("e", |e| e.get("name").cloned().unwrap_or(Value::Null));
//!
//! let output = t.apply_value(json!({"a": "A", "b": 1, "e": [{"name": "X"}]}))?;
//! assert_eq!(Value::Object(output), json!({"a": "A", "b": 43, "e": ["X"]}));
//! ```
//!
//! Deriving never changes the parent. Every transform can be invoked any number of
//! times, from any thread.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{kind_of, BoxError, TransformError};
use crate::record::{self, Record};

type StepFn<I> = Arc<dyn Fn(I) -> Result<Record, TransformError> + Send + Sync>;

/// Compose `first` and `then` into a single function.
///
/// Neither function is called until the result is.
pub fn compose<I, F, G>(first: F, then: G) -> impl Fn(I) -> Result<Record, TransformError>
where
    F: Fn(I) -> Result<Record, TransformError>,
    G: Fn(Record) -> Result<Record, TransformError>,
{
    move |input| then(first(input)?)
}

/// Start a chain from the identity transform over records.
pub fn transform() -> Transform<Record> {
    Transform::from_fn(|record: Record| Ok(record))
}

/// An immutable, reusable record transform that doubles as a builder.
pub struct Transform<I = Record> {
    func: StepFn<I>,
    steps: usize,
}

impl<I> Clone for Transform<I> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            steps: self.steps,
        }
    }
}

impl<I> fmt::Debug for Transform<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl<I: 'static> Transform<I> {
    /// Wrap an arbitrary function so it can be chained.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(I) -> Result<Record, TransformError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            steps: 0,
        }
    }

    /// Run the transform.
    pub fn apply(&self, input: I) -> Result<Record, TransformError> {
        (self.func)(input)
    }

    /// Run the transform and deserialize the output record into `U`.
    pub fn apply_into<U: DeserializeOwned>(&self, input: I) -> Result<U, TransformError> {
        let output = self.apply(input)?;
        Ok(serde_json::from_value(Value::Object(output))?)
    }

    /// Turn the transform into a plain closure.
    pub fn into_fn(self) -> impl Fn(I) -> Result<Record, TransformError> + Send + Sync + Clone {
        let func = self.func;
        move |input| func(input)
    }

    /// Number of steps chained onto the starting transform.
    pub fn step_count(&self) -> usize {
        self.steps
    }

    /// Derive a transform that runs `step` on this transform's output.
    pub fn then<G>(&self, step: G) -> Transform<I>
    where
        G: Fn(Record) -> Result<Record, TransformError> + Send + Sync + 'static,
    {
        let parent = Arc::clone(&self.func);
        Transform {
            func: Arc::new(compose(move |input| parent(input), step)),
            steps: self.steps + 1,
        }
    }

    /// Keep only the named fields.
    ///
    /// Fields that are absent from a record at invocation time are skipped, and
    /// duplicate names count once. An empty list produces empty records.
    pub fn pick<It, S>(&self, fields: It) -> Transform<I>
    where
        It: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: IndexSet<String> = fields.into_iter().map(Into::into).collect();
        self.then(move |record| Ok(record::pick(record, &fields)))
    }

    /// Replace a field's value with `converter(value)`.
    pub fn map_property<F>(&self, field: impl Into<String>, converter: F) -> Transform<I>
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let field = field.into();
        self.then(move |record| record::map_property(record, &field, |value| Ok(converter(value))))
    }

    /// Like [`map_property`](Self::map_property), with a converter that can fail.
    ///
    /// The converter's error is returned as [`TransformError::Conversion`] with the
    /// original error as its source.
    pub fn try_map_property<F, E>(&self, field: impl Into<String>, converter: F) -> Transform<I>
    where
        F: Fn(Value) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let field = field.into();
        self.then(move |record| {
            record::map_property(record, &field, |value| {
                converter(value).map_err(|e| conversion_error(&field, e))
            })
        })
    }

    /// Convert every element of the array stored in `field`.
    ///
    /// The field is checked when the transform runs: anything but an array fails
    /// with [`TransformError::InvalidFieldType`].
    pub fn map_array<F>(&self, field: impl Into<String>, converter: F) -> Transform<I>
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let field = field.into();
        self.then(move |record| record::map_array(record, &field, |item| Ok(converter(item))))
    }

    /// Like [`map_array`](Self::map_array), with an element converter that can fail.
    pub fn try_map_array<F, E>(&self, field: impl Into<String>, converter: F) -> Transform<I>
    where
        F: Fn(Value) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let field = field.into();
        self.then(move |record| {
            record::map_array(record, &field, |item| {
                converter(item).map_err(|e| conversion_error(&field, e))
            })
        })
    }
}

impl Transform<Record> {
    /// Run the transform against a borrowed record, leaving it untouched.
    pub fn apply_ref(&self, input: &Record) -> Result<Record, TransformError> {
        self.apply(input.clone())
    }

    /// Run the transform against a dynamic value, which must be a JSON object.
    pub fn apply_value(&self, input: Value) -> Result<Record, TransformError> {
        self.apply(into_record(input)?)
    }
}

impl<T: Serialize + 'static> Transform<T> {
    /// Identity transform for a typed input: the value is serialized into a record.
    pub fn serialized() -> Self {
        Transform::from_fn(|input: T| into_record(serde_json::to_value(&input)?))
    }
}

fn into_record(value: Value) -> Result<Record, TransformError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(TransformError::NotARecord {
            actual: kind_of(&other),
        }),
    }
}

fn conversion_error<E: Into<BoxError>>(field: &str, err: E) -> TransformError {
    TransformError::Conversion {
        field: field.to_string(),
        source: err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn foo() -> Value {
        json!({
            "a": "A",
            "b": 1,
            "c": {"d": "D"},
            "e": [{"id": "ID1", "name": "NAME1"}, {"id": "ID2", "name": "NAME2"}],
            "f": ["FOO"]
        })
    }

    #[test]
    fn test_compose_is_lazy() {
        let composed = compose(
            |_: Record| -> Result<Record, TransformError> { panic!("called too early") },
            |record: Record| Ok(record),
        );
        drop(composed);
    }

    #[test]
    fn test_compose_applies_in_order() {
        let first = |mut r: Record| {
            r.insert("trail".to_string(), json!("1"));
            Ok(r)
        };
        let second = |r: Record| record::map_property(r, "trail", |v| {
            Ok(json!(format!("{}2", v.as_str().unwrap())))
        });

        let composed = compose(first, second);
        let output = composed(Record::new()).unwrap();

        assert_eq!(output["trail"], json!("12"));
    }

    fn append(mark: &'static str) -> impl Fn(Record) -> Result<Record, TransformError> {
        move |r: Record| {
            record::map_property(r, "trail", |v| {
                Ok(json!(format!("{}{}", v.as_str().unwrap_or_default(), mark)))
            })
        }
    }

    #[test]
    fn test_compose_is_associative() {
        let left = compose(compose(append("f"), append("g")), append("h"));
        let right = compose(append("f"), compose(append("g"), append("h")));

        let input = match json!({"trail": ">", "other": 1}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let left_output = left(input.clone()).unwrap();
        assert_eq!(left_output, right(input).unwrap());
        assert_eq!(left_output["trail"], json!(">fgh"));
    }

    #[test]
    fn test_step_count() {
        let t = transform().pick(["a"]).map_property("a", |v| v);

        assert_eq!(transform().step_count(), 0);
        assert_eq!(t.step_count(), 2);
    }

    #[test]
    fn test_try_map_property_error_source() {
        let t = transform().try_map_property("a", |_| Err::<Value, _>("boom"));

        let err = t.apply_value(foo()).unwrap_err();

        match err {
            TransformError::Conversion { field, source } => {
                assert_eq!(field, "a");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_try_map_array() {
        let t = transform().try_map_array("f", |v| match v {
            Value::String(s) => Ok(json!(s.len())),
            _ => Err("not a string"),
        });

        let output = t.apply_value(foo()).unwrap();

        assert_eq!(output["f"], json!([3]));
    }

    #[test]
    fn test_apply_value_rejects_non_object() {
        let err = transform().apply_value(json!([1, 2])).unwrap_err();

        assert!(matches!(err, TransformError::NotARecord { actual: "an array" }));
    }

    #[derive(Serialize)]
    struct Order {
        id: u32,
        total: f64,
        notes: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Summary {
        id: u32,
        total: String,
    }

    #[test]
    fn test_serialized_bridges_typed_values() {
        let t = Transform::<Order>::serialized()
            .pick(["id", "total"])
            .map_property("total", |v| json!(format!("{:.2}", v.as_f64().unwrap_or(0.0))));

        let summary: Summary = t
            .apply_into(Order {
                id: 7,
                total: 12.5,
                notes: "fragile".to_string(),
            })
            .unwrap();

        assert_eq!(
            summary,
            Summary {
                id: 7,
                total: "12.50".to_string()
            }
        );
    }

    #[test]
    fn test_serialized_rejects_scalars() {
        let t = Transform::<u32>::serialized();

        assert!(matches!(
            t.apply(3),
            Err(TransformError::NotARecord { actual: "a number" })
        ));
    }

    #[test]
    fn test_into_fn() {
        let f = transform().pick(["a"]).into_fn();
        let record = match foo() {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let output = f(record).unwrap();

        assert_eq!(Value::Object(output), json!({"a": "A"}));
    }
}
