//! Loading a directory of pipeline definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::{PipelineDef, PipelineError};
use crate::converters::ConverterRegistry;
use crate::transform::Transform;

/// Pipelines loaded from YAML files, keyed by pipeline name.
#[derive(Debug, Clone, Default)]
pub struct PipelineCatalog {
    pipelines: BTreeMap<String, PipelineDef>,
}

impl PipelineCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all pipelines from a directory.
    ///
    /// Only `.yaml` and `.yml` files are read. Files that fail to parse are
    /// logged and skipped; a later file with the same pipeline name replaces an
    /// earlier one.
    pub fn load_from_dir<P: AsRef<Path>>(dir_path: P) -> Result<Self, PipelineError> {
        let dir_path = dir_path.as_ref();

        if !dir_path.is_dir() {
            return Err(PipelineError::NotADirectory(dir_path.to_path_buf()));
        }

        let io_error = |source: std::io::Error| PipelineError::Io {
            path: dir_path.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir_path).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yaml") | Some("yml")
            ) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut catalog = Self::new();
        for path in paths {
            match PipelineDef::load_from_file(&path) {
                Ok(pipeline) => catalog.insert(pipeline),
                Err(e) => {
                    tracing::warn!("Failed to load pipeline from {}: {}", path.display(), e);
                }
            }
        }

        tracing::debug!(
            "Loaded {} pipelines from {}",
            catalog.count(),
            dir_path.display()
        );
        Ok(catalog)
    }

    /// Add a pipeline, replacing any pipeline with the same name.
    pub fn insert(&mut self, pipeline: PipelineDef) {
        if let Some(previous) = self.pipelines.insert(pipeline.name.clone(), pipeline) {
            tracing::warn!("Pipeline '{}' defined more than once; keeping the last", previous.name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&PipelineDef> {
        self.pipelines.get(name)
    }

    /// Build the named pipeline, or `None` if it isn't in the catalog.
    pub fn build(
        &self,
        name: &str,
        registry: &ConverterRegistry,
    ) -> Option<Result<Transform, PipelineError>> {
        self.get(name).map(|pipeline| pipeline.build(registry))
    }

    /// Sorted pipeline names.
    pub fn names(&self) -> Vec<&str> {
        self.pipelines.keys().map(String::as_str).collect()
    }

    pub fn count(&self) -> usize {
        self.pipelines.len()
    }
}
