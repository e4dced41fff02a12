use std::io::BufRead;
use std::path::Path;

use eyre::{bail, ensure, eyre, Result, WrapErr};
use itertools::Itertools;

use crate::{compression, ReadRecord};

/// Column names of a tab-delimited table.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column, failing for tables that don't have it.
    pub fn index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|x| x == column)
            .ok_or_else(|| eyre!("Table has no '{column}' column (found: {:?})", self.columns))
    }
}

/// Reader for tab-delimited tables with a mandatory header row. Rows are read as vectors of
/// owned fields and must have exactly as many fields as the header.
pub struct Reader<R> {
    reader: R,
    header: Header,
    buffer: String,
    line: usize,
}

impl Reader<()> {
    pub fn from_path(
        path: impl AsRef<Path>,
    ) -> Result<Reader<Box<dyn BufRead + Send + Sync + 'static>>> {
        let path = path.as_ref();
        Reader::new(compression::open(path)?)
            .wrap_err_with(|| format!("Failed to read table header from {}", path.display()))
    }
}

impl<R: BufRead> Reader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let mut buffer = String::new();
        if reader.read_line(&mut buffer)? == 0 {
            bail!("Table is empty, expected a header row");
        }
        let columns: Vec<String> = buffer
            .trim_end_matches(['\n', '\r'])
            .split('\t')
            .map(str::to_owned)
            .collect();
        ensure!(
            columns.iter().all(|x| !x.is_empty()),
            "Table header contains empty column names"
        );
        let duplicated = columns.iter().duplicates().join(", ");
        ensure!(
            duplicated.is_empty(),
            "Table header contains duplicated columns: {duplicated}"
        );

        Ok(Self {
            reader,
            header: Header { columns },
            buffer,
            line: 1,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }
}

impl<R: BufRead> ReadRecord for Reader<R> {
    type Record = Vec<String>;

    fn read_record(&mut self, into: &mut Self::Record) -> Result<bool> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(false);
            }
            self.line += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }

            into.clear();
            into.extend(line.split('\t').map(str::to_owned));
            ensure!(
                into.len() == self.header.columns.len(),
                "Table line {} has {} fields, expected {}",
                self.line,
                into.len(),
                self.header.columns.len()
            );
            return Ok(true);
        }
    }
}
