//! Streaming reader for JSON-lines recordings

use crate::error::{ReconError, Result, ResultExt};
use crate::types::ScanlineRecord;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::marker::PhantomData;
use std::path::Path;

/// Iterator over the entries of a JSON-lines session.
///
/// Blank lines are skipped. A malformed line yields an error naming its line
/// number; iteration can continue past it.
pub struct SessionPlayer<R, T = ScanlineRecord> {
    lines: Lines<R>,
    line_no: usize,
    _entry: PhantomData<T>,
}

impl<T: DeserializeOwned> SessionPlayer<BufReader<File>, T> {
    /// Open a session file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ReconError::Io(e).with_context(format!("Failed to open {:?}", path))
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead, T: DeserializeOwned> SessionPlayer<R, T> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            _entry: PhantomData,
        }
    }
}

impl<R: BufRead, T: DeserializeOwned> Iterator for SessionPlayer<R, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line_no = self.line_no;

            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(ReconError::Io(e).with_context(format!("line {}", line_no)))),
            };
            if line.trim().is_empty() {
                continue;
            }

            return Some(
                serde_json::from_str(&line)
                    .map_err(ReconError::from)
                    .with_context(|| format!("line {}", line_no)),
            );
        }
    }
}

/// Read a whole scanline recording, failing on the first bad line
pub fn read_recording(path: impl AsRef<Path>) -> Result<Vec<ScanlineRecord>> {
    SessionPlayer::<_, ScanlineRecord>::open(path)?.collect()
}
