use std::io::BufRead;
use std::path::Path;

use eyre::{bail, ensure, OptionExt, Result, WrapErr};

use rnakit_core_rs::loc::GenomicInterval;

use super::record::GffRecord;
use crate::{compression, ReadRecord};

pub mod parse {
    use super::*;

    pub fn column<'a>(parts: &mut impl Iterator<Item = &'a str>, name: &str) -> Result<&'a str> {
        parts
            .next()
            .ok_or_else(|| eyre::eyre!("Missing GFF {name} column"))
    }

    pub fn coordinate<'a>(parts: &mut impl Iterator<Item = &'a str>, name: &str) -> Result<u64> {
        let value = column(parts, name)?;
        value
            .parse::<u64>()
            .wrap_err_with(|| format!("Invalid GFF {name}: {value}"))
    }

    pub fn strand<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<char> {
        let strand = column(parts, "strand")?;
        match strand {
            "+" | "-" | "." | "?" => Ok(strand.chars().next().ok_or_eyre("Empty GFF strand")?),
            _ => bail!("Invalid GFF strand: {strand}"),
        }
    }

    pub fn attributes(field: &str) -> Result<Vec<(String, String)>> {
        let mut attributes = Vec::new();
        if field == "." {
            return Ok(attributes);
        }

        for pair in field.split(';').map(str::trim).filter(|x| !x.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| eyre::eyre!("Invalid GFF attribute: {pair}"))?;
            attributes.push((key.to_owned(), value.to_owned()));
        }
        Ok(attributes)
    }

    pub fn record(line: &str) -> Result<GffRecord> {
        let mut parts = line.split('\t');
        let seqid = column(&mut parts, "seqid")?;
        let source = column(&mut parts, "source")?;
        let kind = column(&mut parts, "type")?;
        let start = coordinate(&mut parts, "start")?;
        let end = coordinate(&mut parts, "end")?;
        column(&mut parts, "score")?;
        let strand = strand(&mut parts)?;
        column(&mut parts, "phase")?;
        let attributes = attributes(column(&mut parts, "attributes")?)?;
        ensure!(parts.next().is_none(), "GFF line has more than 9 columns");

        let interval = GenomicInterval::new(seqid, start, end, source)?;
        Ok(GffRecord::new(interval, kind.to_owned(), strand, attributes))
    }
}

/// Reader for GFF3 feature lines. Comments, directives and blank lines are skipped; the
/// embedded FASTA section (`##FASTA`) terminates the feature stream.
pub struct Reader<R> {
    reader: R,
    buffer: String,
    line: usize,
    finished: bool,
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
            buffer: String::new(),
            line: 0,
            finished: false,
        }
    }
}

impl<R: BufRead> ReadRecord for Reader<R> {
    type Record = Option<GffRecord>;

    fn read_record(&mut self, into: &mut Self::Record) -> Result<bool> {
        while !self.finished {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                self.finished = true;
                break;
            }
            self.line += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if line.starts_with("##FASTA") {
                self.finished = true;
                break;
            }
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let record = parse::record(line)
                .wrap_err_with(|| format!("Failed to parse GFF line {}", self.line))?;
            *into = Some(record);
            return Ok(true);
        }
        Ok(false)
    }
}

/// Read every feature of a GFF file.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<GffRecord>> {
    let path = path.as_ref();
    let mut reader = Reader::from_path(path)?;
    let mut records = Vec::new();
    let mut record = None;
    while reader
        .read_record(&mut record)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?
    {
        records.extend(record.take());
    }
    Ok(records)
}
