//! Pipeline YAML definitions and builder.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::PipelineError;
use crate::converters::{ConverterRegistry, ValueConverter};
use crate::error::{kind_of, ConverterError};
use crate::transform::{transform, Transform};

/// Pipeline definition from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDef {
    /// Pipeline name (unique identifier)
    pub name: String,

    /// Documentation string
    #[serde(default)]
    pub description: Option<String>,

    /// Steps, applied in order
    pub steps: Vec<StepDef>,

    /// Optional example records checked by `run_tests`
    #[serde(default)]
    pub tests: Vec<PipelineTest>,
}

/// A single chain-builder operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StepDef {
    Pick {
        #[serde(default)]
        fields: Vec<String>,
    },
    MapProperty {
        field: String,
        converter: ConverterRef,
    },
    MapArray {
        field: String,
        converter: ConverterRef,
    },
}

/// Either the name of a registered converter or an inline one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConverterRef {
    Named(String),
    Inline(InlineConverter),
}

/// Converters that can be written directly in a pipeline file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InlineConverter {
    /// Read a field of an object value; `null` if absent
    Get { field: String },
    /// Add a number
    Add { value: Number },
    /// Replace `null` with a value
    Default { value: Value },
    /// Replace anything with a value
    Constant { value: Value },
    /// Apply converters in order
    Chain { steps: Vec<ConverterRef> },
}

/// Example record for a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineTest {
    /// Test name
    pub name: String,

    /// Input record
    pub input: Value,

    /// Expected output record
    pub expected: Value,
}

/// Outcome of a single pipeline test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub name: String,
    pub result: TestResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TestResult {
    Passed,
    Mismatch { actual: Value },
    Failed(String),
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        self.result == TestResult::Passed
    }
}

impl PipelineDef {
    /// Parse a pipeline from YAML text with a top-level `pipeline` key.
    pub fn from_yaml_str(contents: &str) -> Result<Self, PipelineError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(contents)?;

        let pipeline_yaml = yaml.get("pipeline").ok_or(PipelineError::MissingRoot)?;

        let pipeline: PipelineDef = serde_yaml::from_value(pipeline_yaml.clone())?;
        if pipeline.name.is_empty() {
            return Err(PipelineError::EmptyName);
        }

        Ok(pipeline)
    }

    /// Load a pipeline from a YAML file.
    ///
    /// # Errors
    /// Returns error if the file can't be read or has an invalid format
    ///
    /// # Example
    /// ```ignore
    /// use reshape::{ConverterRegistry, PipelineDef};
    ///
    /// let pipeline = PipelineDef::load_from_file("pipelines/orders.yaml")?;
    /// let transform = pipeline.build(&ConverterRegistry::with_builtins())?;
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let pipeline = Self::from_yaml_str(&contents)?;
        tracing::debug!(
            "Loaded pipeline '{}' ({} steps) from {}",
            pipeline.name,
            pipeline.steps.len(),
            path.display()
        );
        Ok(pipeline)
    }

    /// Build the pipeline into a transform, resolving converter names against
    /// `registry`.
    pub fn build(&self, registry: &ConverterRegistry) -> Result<Transform, PipelineError> {
        if self.name.is_empty() {
            return Err(PipelineError::EmptyName);
        }

        tracing::debug!("Building pipeline '{}' with {} steps", self.name, self.steps.len());

        let mut built = transform();
        for (index, step) in self.steps.iter().enumerate() {
            built = match step {
                StepDef::Pick { fields } => built.pick(fields.iter().cloned()),
                StepDef::MapProperty { field, converter } => {
                    let converter = converter.resolve(registry, index)?;
                    built.try_map_property(field.clone(), move |v| converter(v))
                }
                StepDef::MapArray { field, converter } => {
                    let converter = converter.resolve(registry, index)?;
                    built.try_map_array(field.clone(), move |v| converter(v))
                }
            };
        }

        Ok(built)
    }

    /// Run every embedded test against `transform`.
    pub fn run_tests(&self, transform: &Transform) -> Vec<TestOutcome> {
        self.tests
            .iter()
            .map(|test| {
                let result = match transform.apply_value(test.input.clone()) {
                    Ok(output) => {
                        let actual = Value::Object(output);
                        if actual == test.expected {
                            TestResult::Passed
                        } else {
                            TestResult::Mismatch { actual }
                        }
                    }
                    Err(e) => TestResult::Failed(e.to_string()),
                };
                TestOutcome {
                    name: test.name.clone(),
                    result,
                }
            })
            .collect()
    }
}

impl ConverterRef {
    /// Resolve to a callable converter. `step` is used for error reporting.
    pub fn resolve(
        &self,
        registry: &ConverterRegistry,
        step: usize,
    ) -> Result<ValueConverter, PipelineError> {
        match self {
            ConverterRef::Named(name) => {
                registry
                    .get(name)
                    .ok_or_else(|| PipelineError::UnknownConverter {
                        step,
                        name: name.clone(),
                    })
            }
            ConverterRef::Inline(inline) => inline.resolve(registry, step),
        }
    }
}

impl InlineConverter {
    fn resolve(
        &self,
        registry: &ConverterRegistry,
        step: usize,
    ) -> Result<ValueConverter, PipelineError> {
        let converter: ValueConverter = match self {
            InlineConverter::Get { field } => {
                let field = field.clone();
                Arc::new(move |value: Value| match value {
                    Value::Object(mut map) => Ok(map.remove(&field).unwrap_or(Value::Null)),
                    other => Err(ConverterError::UnexpectedKind {
                        converter: "get".to_string(),
                        expected: "an object",
                        actual: kind_of(&other),
                    }),
                })
            }
            InlineConverter::Add { value } => {
                let addend = value.clone();
                Arc::new(move |value: Value| add_number(value, &addend))
            }
            InlineConverter::Default { value } => {
                let fallback = value.clone();
                Arc::new(move |value: Value| -> Result<Value, ConverterError> {
                    match value {
                        Value::Null => Ok(fallback.clone()),
                        other => Ok(other),
                    }
                })
            }
            InlineConverter::Constant { value } => {
                let constant = value.clone();
                Arc::new(move |_: Value| -> Result<Value, ConverterError> { Ok(constant.clone()) })
            }
            InlineConverter::Chain { steps } => {
                if steps.is_empty() {
                    return Err(PipelineError::EmptyChain { step });
                }
                let chain = steps
                    .iter()
                    .map(|c| c.resolve(registry, step))
                    .collect::<Result<Vec<_>, _>>()?;
                Arc::new(move |value: Value| {
                    chain.iter().try_fold(value, |acc, converter| converter(acc))
                })
            }
        };
        Ok(converter)
    }
}

fn add_number(value: Value, addend: &Number) -> Result<Value, ConverterError> {
    let n = match &value {
        Value::Number(n) => n,
        other => {
            return Err(ConverterError::UnexpectedKind {
                converter: "add".to_string(),
                expected: "a number",
                actual: kind_of(other),
            })
        }
    };

    if let (Some(a), Some(b)) = (n.as_i64(), addend.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::from(sum));
        }
    }
    if let (Some(a), Some(b)) = (n.as_u64(), addend.as_u64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::from(sum));
        }
    }

    let sum = n.as_f64().unwrap_or(f64::NAN) + addend.as_f64().unwrap_or(f64::NAN);
    Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| ConverterError::InvalidValue(format!("{} + {} is not finite", n, addend)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ORDER_PIPELINE: &str = r#"
pipeline:
  name: order_summary
  description: Keep the order header and flatten line item names
  steps:
    - op: pick
      fields: [a, b, e]
    - op: map_property
      field: b
      converter: { kind: add, value: 42 }
    - op: map_array
      field: e
      converter: { kind: get, field: name }
  tests:
    - name: scenario
      input: { a: A, b: 1, c: { d: D }, e: [{ name: X }, { name: Y }] }
      expected: { a: A, b: 43, e: [X, Y] }
"#;

    #[test]
    fn test_parse_pipeline() {
        let pipeline = PipelineDef::from_yaml_str(ORDER_PIPELINE).unwrap();

        assert_eq!(pipeline.name, "order_summary");
        assert_eq!(pipeline.steps.len(), 3);
        assert!(matches!(pipeline.steps[0], StepDef::Pick { ref fields } if fields.len() == 3));
        assert!(matches!(
            pipeline.steps[2],
            StepDef::MapArray {
                converter: ConverterRef::Inline(InlineConverter::Get { .. }),
                ..
            }
        ));
        assert_eq!(pipeline.tests.len(), 1);
    }

    #[test]
    fn test_build_and_run_embedded_tests() {
        let pipeline = PipelineDef::from_yaml_str(ORDER_PIPELINE).unwrap();
        let built = pipeline.build(&ConverterRegistry::with_builtins()).unwrap();

        let outcomes = pipeline.run_tests(&built);

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].passed(), "{:?}", outcomes[0]);
    }

    #[test]
    fn test_missing_root() {
        let result = PipelineDef::from_yaml_str("steps: []");

        assert!(matches!(result, Err(PipelineError::MissingRoot)));
    }

    #[test]
    fn test_empty_name() {
        let result = PipelineDef::from_yaml_str("pipeline:\n  name: ''\n  steps: []\n");

        assert!(matches!(result, Err(PipelineError::EmptyName)));
    }

    #[test]
    fn test_unknown_converter() {
        let yaml = r#"
pipeline:
  name: broken
  steps:
    - op: pick
      fields: [a]
    - op: map_property
      field: a
      converter: shout
"#;
        let pipeline = PipelineDef::from_yaml_str(yaml).unwrap();

        let err = pipeline.build(&ConverterRegistry::with_builtins()).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::UnknownConverter { step: 1, ref name } if name == "shout"
        ));
    }

    #[test]
    fn test_empty_chain_rejected() {
        let yaml = r#"
pipeline:
  name: broken
  steps:
    - op: map_property
      field: a
      converter: { kind: chain, steps: [] }
"#;
        let pipeline = PipelineDef::from_yaml_str(yaml).unwrap();

        let err = pipeline.build(&ConverterRegistry::new()).unwrap_err();

        assert!(matches!(err, PipelineError::EmptyChain { step: 0 }));
    }

    #[test]
    fn test_chain_and_default_converters() {
        let yaml = r#"
pipeline:
  name: names
  steps:
    - op: map_property
      field: name
      converter:
        kind: chain
        steps:
          - { kind: default, value: "  unknown " }
          - trim
          - uppercase
"#;
        let pipeline = PipelineDef::from_yaml_str(yaml).unwrap();
        let built = pipeline.build(&ConverterRegistry::with_builtins()).unwrap();

        let present = built.apply_value(json!({"name": " ada "})).unwrap();
        let missing = built.apply_value(json!({"id": 1})).unwrap();

        assert_eq!(present["name"], json!("ADA"));
        assert_eq!(Value::Object(missing), json!({"id": 1, "name": "UNKNOWN"}));
    }

    #[test]
    fn test_mismatch_reported() {
        let yaml = r#"
pipeline:
  name: constant
  steps:
    - op: map_property
      field: a
      converter: { kind: constant, value: 1 }
  tests:
    - name: wrong
      input: { a: 5 }
      expected: { a: 2 }
    - name: not_a_record
      input: [1, 2]
      expected: {}
"#;
        let pipeline = PipelineDef::from_yaml_str(yaml).unwrap();
        let built = pipeline.build(&ConverterRegistry::new()).unwrap();

        let outcomes = pipeline.run_tests(&built);

        assert_eq!(
            outcomes[0].result,
            TestResult::Mismatch {
                actual: json!({"a": 1})
            }
        );
        assert!(matches!(outcomes[1].result, TestResult::Failed(_)));
    }

    #[test]
    fn test_add_number() {
        assert_eq!(add_number(json!(1), &Number::from(42)).unwrap(), json!(43));
        assert_eq!(
            add_number(json!(1.5), &Number::from(1)).unwrap(),
            json!(2.5)
        );
        assert!(add_number(json!("1"), &Number::from(1)).is_err());
    }

    #[test]
    fn test_add_number_above_i64_max_is_exact() {
        assert_eq!(
            add_number(json!(u64::MAX - 1), &Number::from(1u64)).unwrap(),
            json!(u64::MAX)
        );
        assert_eq!(
            add_number(json!(i64::MAX), &Number::from(1)).unwrap(),
            json!(i64::MAX as u64 + 1)
        );
    }

    #[test]
    fn test_converter_failure_surfaces_as_conversion_error() {
        let yaml = r#"
pipeline:
  name: strict
  steps:
    - op: map_array
      field: tags
      converter: uppercase
"#;
        let pipeline = PipelineDef::from_yaml_str(yaml).unwrap();
        let built = pipeline.build(&ConverterRegistry::with_builtins()).unwrap();

        let err = built.apply_value(json!({"tags": ["ok", 3]})).unwrap_err();

        match err {
            crate::TransformError::Conversion { field, source } => {
                assert_eq!(field, "tags");
                assert!(source.downcast_ref::<ConverterError>().is_some());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
