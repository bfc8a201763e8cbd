//! Streaming NDJSON records through a built pipeline.

use std::fmt;
use std::io::{BufRead, Write};

use crate::error::TransformError;
use crate::serialization::{NdjsonReader, RecordWriter, SerializationError};
use crate::transform::Transform;

/// Counts from a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Why a run stopped early.
#[derive(Debug)]
pub enum RunError {
    /// An input line could not be read as a record
    Input(SerializationError),
    /// A record was read but the transform rejected it
    Transform {
        line: usize,
        source: TransformError,
    },
    /// Writing output failed
    Output(SerializationError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Input(e) => write!(f, "Failed to read input: {}", e),
            RunError::Transform { line, source } => write!(f, "Line {}: {}", line, source),
            RunError::Output(e) => write!(f, "Failed to write output: {}", e),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Input(e) | RunError::Output(e) => Some(e),
            RunError::Transform { source, .. } => Some(source),
        }
    }
}

/// Apply `transform` to every record of `input`, writing results to `writer`.
///
/// With `keep_going`, records that can't be parsed or transformed are logged and
/// skipped. Without it, the first such record stops the run. The writer is
/// finished either way, so whatever was written before a failure is still a
/// complete NDJSON stream or JSON array. IO errors on input or output always
/// stop the run.
pub fn run_records<R, W>(
    input: R,
    transform: &Transform,
    mut writer: RecordWriter<W>,
    keep_going: bool,
) -> Result<RunSummary, RunError>
where
    R: BufRead,
    W: Write,
{
    let mut records = NdjsonReader::new(input);
    let mut skipped = 0;

    let stopped = loop {
        let Some(next) = records.next() else {
            break None;
        };
        let line = records.line_number();

        let failure = match next {
            Ok(record) => match transform.apply(record) {
                Ok(output) => match writer.write(&output) {
                    Ok(()) => continue,
                    Err(e) => break Some(RunError::Output(e)),
                },
                Err(source) => RunError::Transform { line, source },
            },
            Err(SerializationError::IoError(e)) => {
                break Some(RunError::Input(SerializationError::IoError(e)))
            }
            Err(e) => RunError::Input(e),
        };

        if !keep_going {
            break Some(failure);
        }
        tracing::warn!("Skipping record: {}", failure);
        skipped += 1;
    };

    let written = writer.count();
    match stopped {
        Some(err) => {
            if let Err(e) = writer.finish() {
                tracing::warn!("Failed to close output after error: {}", e);
            }
            Err(err)
        }
        None => {
            writer.finish().map_err(RunError::Output)?;
            Ok(RunSummary { written, skipped })
        }
    }
}
