use std::io::BufRead;
use std::path::Path;

use eyre::{Result, WrapErr};

use super::record::{is_header, AlignmentRecord};
use crate::{compression, ReadRecord};

/// Reader for SAM text streams. Header lines are collected on the fly and are available via
/// [`Reader::header`]; lines with an empty read name are skipped.
pub struct Reader<R> {
    reader: R,
    header: Vec<String>,
    buffer: String,
    line: usize,
}

impl Reader<()> {
    pub fn from_path(
        path: impl AsRef<Path>,
    ) -> Result<Reader<Box<dyn BufRead + Send + Sync + 'static>>> {
        Ok(Reader::new(compression::open(path)?))
    }
}

impl<R: BufRead> Reader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            header: Vec::new(),
            buffer: String::new(),
            line: 0,
        }
    }

    /// Header lines seen so far.
    pub fn header(&self) -> &[String] {
        &self.header
    }
}

impl<R: BufRead> ReadRecord for Reader<R> {
    type Record = AlignmentRecord;

    fn read_record(&mut self, into: &mut Self::Record) -> Result<bool> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(false);
            }
            self.line += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if is_header(line) {
                self.header.push(line.to_owned());
                continue;
            }
            if line.split('\t').next().is_none_or(str::is_empty) {
                continue;
            }

            into.parse_into(line)
                .wrap_err_with(|| format!("Failed to parse SAM line {}", self.line))?;
            return Ok(true);
        }
    }
}
