//! Reading and writing records as NDJSON or JSON arrays.

use std::io::{BufRead, ErrorKind, Write};

use serde_json::Value;

use crate::error::kind_of;
use crate::record::Record;

/// Error type for serialization operations
#[derive(Debug)]
pub enum SerializationError {
    JsonError(serde_json::Error),
    IoError(std::io::Error),
    /// Line `line` (1-based) could not be read as a record
    InvalidLine { line: usize, reason: String },
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        SerializationError::JsonError(err)
    }
}

impl From<std::io::Error> for SerializationError {
    fn from(err: std::io::Error) -> Self {
        SerializationError::IoError(err)
    }
}

impl std::fmt::Display for SerializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationError::JsonError(e) => write!(f, "JSON error: {}", e),
            SerializationError::IoError(e) => write!(f, "IO error: {}", e),
            SerializationError::InvalidLine { line, reason } => {
                write!(f, "Line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for SerializationError {}

/// NDJSON (Newline Delimited JSON) reader
///
/// Yields one record per non-blank line. Each line must hold a JSON object.
pub struct NdjsonReader<R: BufRead> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> NdjsonReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    /// 1-based number of the last line read
    pub fn line_number(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for NdjsonReader<R> {
    type Item = Result<Record, SerializationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                // The line's bytes are consumed even though they were rejected.
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    self.line += 1;
                    return Some(Err(SerializationError::InvalidLine {
                        line: self.line,
                        reason: e.to_string(),
                    }));
                }
                Err(e) => return Some(Err(e.into())),
            }

            let trimmed = self.buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            let line = self.line;
            return Some(match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Object(record)) => Ok(record),
                Ok(other) => Err(SerializationError::InvalidLine {
                    line,
                    reason: format!("expected a JSON object, got {}", kind_of(&other)),
                }),
                Err(e) => Err(SerializationError::InvalidLine {
                    line,
                    reason: e.to_string(),
                }),
            });
        }
    }
}

/// Layout of written records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON object per line
    Ndjson,
    /// A single JSON array holding every record
    JsonArray,
}

/// Writes a stream of records in one [`OutputFormat`].
///
/// Call [`finish`](Self::finish) once done; for `JsonArray` the closing bracket
/// is only written there.
pub struct RecordWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    count: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            count: 0,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Number of records written so far
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn write(&mut self, record: &Record) -> Result<(), SerializationError> {
        match self.format {
            OutputFormat::Ndjson => {
                serde_json::to_writer(&mut self.writer, record)?;
                self.writer.write_all(b"\n")?;
            }
            OutputFormat::JsonArray => {
                self.writer
                    .write_all(if self.count == 0 { b"[" } else { b"," })?;
                serde_json::to_writer(&mut self.writer, record)?;
            }
        }
        self.count += 1;
        Ok(())
    }

    /// Close the output and flush it. Returns the number of records written.
    pub fn finish(mut self) -> Result<usize, SerializationError> {
        if self.format == OutputFormat::JsonArray {
            if self.count == 0 {
                self.writer.write_all(b"[")?;
            }
            self.writer.write_all(b"]\n")?;
        }
        self.writer.flush()?;
        Ok(self.count)
    }
}
