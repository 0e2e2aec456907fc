//! JSON-lines writer for recordings and cloud dumps

use crate::error::{ReconError, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Appends one JSON document per line
#[derive(Debug)]
pub struct SessionRecorder<W: Write> {
    writer: W,
    written: usize,
}

impl SessionRecorder<BufWriter<File>> {
    /// Create (or truncate) a session file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path).map_err(|e| {
            ReconError::Io(e).with_context(format!("Failed to create {:?}", path))
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> SessionRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Write one entry
    pub fn record<T: Serialize>(&mut self, entry: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of entries written so far
    pub fn len(&self) -> usize {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
