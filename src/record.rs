//! Primitive record operations.
//!
//! Each function consumes a record and returns a new one. The caller's copy is
//! never touched; callers that need to keep their input pass a clone.

use indexmap::IndexSet;
use serde_json::{Map, Value};

use crate::error::{kind_of, TransformError};

/// An ordered mapping from field name to JSON value.
pub type Record = Map<String, Value>;

/// Keep only the fields named in `fields`, in source record order.
///
/// Names that are not present in the record are skipped.
pub fn pick(record: Record, fields: &IndexSet<String>) -> Record {
    if tracing::enabled!(tracing::Level::TRACE) {
        for missing in fields.iter().filter(|f| !record.contains_key(f.as_str())) {
            tracing::trace!("pick: field '{}' not present in record", missing);
        }
    }

    record
        .into_iter()
        .filter(|(key, _)| fields.contains(key))
        .collect()
}

/// Replace the value of `field` with `converter(value)`.
///
/// The field keeps its position. A missing field is handed to the converter as
/// `null` and the result is appended.
pub fn map_property<F>(mut record: Record, field: &str, converter: F) -> Result<Record, TransformError>
where
    F: FnOnce(Value) -> Result<Value, TransformError>,
{
    match record.get_mut(field) {
        Some(slot) => {
            let original = slot.take();
            *slot = converter(original)?;
        }
        None => {
            let converted = converter(Value::Null)?;
            record.insert(field.to_string(), converted);
        }
    }
    Ok(record)
}

/// Replace the array stored in `field` with a new array of converted elements.
///
/// Fails with [`TransformError::InvalidFieldType`] when the field is absent or
/// holds anything but an array.
pub fn map_array<F>(record: Record, field: &str, mut converter: F) -> Result<Record, TransformError>
where
    F: FnMut(Value) -> Result<Value, TransformError>,
{
    match record.get(field) {
        Some(Value::Array(_)) => {}
        Some(other) => {
            return Err(TransformError::InvalidFieldType {
                field: field.to_string(),
                actual: kind_of(other),
            })
        }
        None => {
            return Err(TransformError::InvalidFieldType {
                field: field.to_string(),
                actual: "missing",
            })
        }
    }

    map_property(record, field, |value| match value {
        Value::Array(items) => {
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                mapped.push(converter(item)?);
            }
            Ok(Value::Array(mapped))
        }
        // checked above
        other => Ok(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn fields(names: &[&str]) -> IndexSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pick_keeps_source_order() {
        let input = record(json!({"a": 1, "b": 2, "c": 3}));

        let output = pick(input, &fields(&["c", "a"]));

        let keys: Vec<&String> = output.keys().collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_pick_ignores_missing_fields() {
        let input = record(json!({"a": 1}));

        let output = pick(input, &fields(&["a", "zzz"]));

        assert_eq!(Value::Object(output), json!({"a": 1}));
    }

    #[test]
    fn test_pick_nothing() {
        let input = record(json!({"a": 1, "b": 2}));

        let output = pick(input, &IndexSet::new());

        assert!(output.is_empty());
    }

    #[test]
    fn test_map_property_preserves_position() {
        let input = record(json!({"a": 1, "b": 2, "c": 3}));

        let output = map_property(input, "b", |v| Ok(json!(v.as_i64().unwrap() * 10))).unwrap();

        let keys: Vec<&String> = output.keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(output["b"], json!(20));
    }

    #[test]
    fn test_map_property_missing_field_sees_null() {
        let input = record(json!({"a": 1}));

        let output = map_property(input, "b", |v| {
            assert!(v.is_null());
            Ok(json!("filled"))
        })
        .unwrap();

        assert_eq!(Value::Object(output), json!({"a": 1, "b": "filled"}));
    }

    #[test]
    fn test_map_array_converts_each_element() {
        let input = record(json!({"e": [1, 2, 3]}));

        let output = map_array(input, "e", |v| Ok(json!(v.as_i64().unwrap() + 1))).unwrap();

        assert_eq!(output["e"], json!([2, 3, 4]));
    }

    #[test]
    fn test_map_array_rejects_non_array() {
        let input = record(json!({"e": {"not": "an array"}}));

        let err = map_array(input, "e", Ok).unwrap_err();

        assert!(matches!(
            err,
            TransformError::InvalidFieldType { ref field, actual: "an object" } if field == "e"
        ));
    }

    #[test]
    fn test_map_array_rejects_missing_field() {
        let input = record(json!({"a": 1}));

        let err = map_array(input, "e", Ok).unwrap_err();

        assert!(matches!(err, TransformError::InvalidFieldType { actual: "missing", .. }));
    }

    #[test]
    fn test_map_array_stops_on_first_failure() {
        let input = record(json!({"e": [1, "two", 3]}));
        let mut seen = 0;

        let result = map_array(input, "e", |v| {
            seen += 1;
            v.as_i64().map(Value::from).ok_or_else(|| TransformError::Conversion {
                field: "e".to_string(),
                source: "not a number".into(),
            })
        });

        assert!(matches!(result, Err(TransformError::Conversion { .. })));
        assert_eq!(seen, 2);
    }
}
