use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use derive_getters::{Dissolve, Getters};
use eyre::{eyre, Result, WrapErr};

use rnakit_io_rs::{table, ReadRecord, WriteRecord};

use crate::exons::NOT_AVAILABLE;
use crate::staging::staging_file;
use crate::GeneRpkmRecord;

/// Columns of the gene-level RPKM table, in order.
pub const COLUMNS: [&str; 4] = ["gene_id", "rpkm", "counts", "exons"];

/// File extension of RPKM tables.
pub const EXTENSION: &str = "rpkm";

/// Location of the RPKM table computed for a constitutive-exon table.
pub fn table_path(rpkm_dir: &Path, table_name: &str) -> PathBuf {
    rpkm_dir.join(format!("{table_name}.{EXTENSION}"))
}

/// Tab-separated writer of [`GeneRpkmRecord`]s. The header is written on construction.
pub struct Writer<W: Write> {
    writer: W,
}

impl<W: Write> Writer<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{}", COLUMNS.join("\t"))?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> WriteRecord for Writer<W> {
    type Record = GeneRpkmRecord;

    fn write_record(&mut self, record: &Self::Record) -> Result<()> {
        write!(self.writer, "{}\t", record.gene_id())?;
        match record.rpkm() {
            // Debug formatting is the shortest representation that round-trips (5.0, 0.25, 1e-7)
            Some(rpkm) => write!(self.writer, "{rpkm:?}")?,
            None => self.writer.write_all(NOT_AVAILABLE.as_bytes())?,
        }
        writeln!(self.writer, "\t{}\t{}", record.counts(), record.exons())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Write a complete RPKM table. The table is staged next to `path` and only moved in place once
/// fully written, so a table that exists is always complete.
pub fn write_table(path: impl AsRef<Path>, records: &[GeneRpkmRecord]) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let staging = staging_file(parent, OsStr::new(".rpkm"))
        .wrap_err_with(|| format!("Failed to create a staging file in {}", parent.display()))?;

    let mut writer = Writer::new(BufWriter::new(staging.as_file()))?;
    writer.write_records(records)?;
    writer.flush()?;
    drop(writer);

    staging
        .persist(path)
        .wrap_err_with(|| format!("Failed to move the RPKM table to {}", path.display()))?;
    log::info!("Wrote {} genes to {}", records.len(), path.display());
    Ok(())
}

/// A row of an RPKM table read back from disk. Exon lengths are not part of the table.
#[derive(Clone, PartialEq, Debug, Dissolve, Getters)]
pub struct RpkmTableRow {
    gene_id: String,
    rpkm: Option<f64>,
    counts: u64,
    exons: String,
}

impl From<GeneRpkmRecord> for RpkmTableRow {
    fn from(record: GeneRpkmRecord) -> Self {
        let (gene_id, counts, _, rpkm, exons) = record.dissolve();
        Self {
            gene_id,
            rpkm,
            counts,
            exons,
        }
    }
}

pub fn read_rows(reader: impl BufRead) -> Result<Vec<RpkmTableRow>> {
    let mut reader = table::Reader::new(reader)?;
    let [gene_id, rpkm, counts, exons] = COLUMNS.map(|col| reader.header().index(col));
    let (gene_id, rpkm, counts, exons) = (gene_id?, rpkm?, counts?, exons?);

    let mut rows = Vec::new();
    let mut fields = Vec::new();
    while reader.read_record(&mut fields)? {
        let value = match fields[rpkm].as_str() {
            NOT_AVAILABLE => None,
            x => Some(
                x.parse::<f64>()
                    .wrap_err_with(|| format!("Invalid RPKM value: {x}"))?,
            ),
        };
        let count = fields[counts]
            .parse::<u64>()
            .wrap_err_with(|| format!("Invalid read count: {}", fields[counts]))?;

        rows.push(RpkmTableRow {
            gene_id: std::mem::take(&mut fields[gene_id]),
            rpkm: value,
            counts: count,
            exons: std::mem::take(&mut fields[exons]),
        });
    }
    Ok(rows)
}

pub fn read_table(path: impl AsRef<Path>) -> Result<Vec<RpkmTableRow>> {
    let path = path.as_ref();
    let file = File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;
    read_rows(std::io::BufReader::new(file))
        .wrap_err_with(|| format!("Failed to read RPKM table {}", path.display()))
}

/// Load the RPKM tables of a sample. Tables that were never computed are reported and yield
/// None, so that samples with partial results can still be compared.
pub fn load_sample_rpkms(
    rpkm_dir: impl AsRef<Path>,
    table_names: impl IntoIterator<Item = impl AsRef<str>>,
) -> Result<Vec<(String, Option<Vec<RpkmTableRow>>)>> {
    let rpkm_dir = rpkm_dir.as_ref();
    if !rpkm_dir.is_dir() {
        return Err(eyre!("RPKM directory {} does not exist", rpkm_dir.display()));
    }

    let mut tables = Vec::new();
    for name in table_names {
        let name = name.as_ref();
        let path = table_path(rpkm_dir, name);
        if !path.is_file() {
            log::warn!("Cannot find RPKM file {}", path.display());
            tables.push((name.to_owned(), None));
            continue;
        }
        tables.push((name.to_owned(), Some(read_table(&path)?)));
    }
    Ok(tables)
}
