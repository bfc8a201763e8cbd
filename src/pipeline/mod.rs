//! Declarative pipelines.
//!
//! A pipeline is a YAML description of a chain of `pick`, `map_property` and
//! `map_array` steps, built into a [`Transform`](crate::Transform) against a
//! [`ConverterRegistry`](crate::ConverterRegistry).

pub mod catalog;
pub mod definition;
pub mod runner;

use std::fmt;
use std::path::PathBuf;

pub use catalog::PipelineCatalog;
pub use definition::{
    ConverterRef, InlineConverter, PipelineDef, PipelineTest, StepDef, TestOutcome, TestResult,
};
pub use runner::{run_records, RunError, RunSummary};

/// Error type for loading and building pipelines
#[derive(Debug)]
pub enum PipelineError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Yaml(serde_yaml::Error),
    MissingRoot,
    EmptyName,
    UnknownConverter {
        step: usize,
        name: String,
    },
    EmptyChain {
        step: usize,
    },
    NotADirectory(PathBuf),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Io { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            PipelineError::Yaml(e) => write!(f, "Failed to parse YAML: {}", e),
            PipelineError::MissingRoot => write!(f, "Pipeline YAML missing 'pipeline' field"),
            PipelineError::EmptyName => write!(f, "Pipeline name cannot be empty"),
            PipelineError::UnknownConverter { step, name } => {
                write!(f, "Step {} references undefined converter '{}'", step, name)
            }
            PipelineError::EmptyChain { step } => {
                write!(f, "Step {} has a converter chain with no steps", step)
            }
            PipelineError::NotADirectory(path) => {
                write!(f, "Path is not a directory: {}", path.display())
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Io { source, .. } => Some(source),
            PipelineError::Yaml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        PipelineError::Yaml(err)
    }
}
