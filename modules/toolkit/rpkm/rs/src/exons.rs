use std::io::BufRead;
use std::path::Path;

use ahash::AHashMap;
use derive_getters::{Dissolve, Getters};
use eyre::{ensure, Result, WrapErr};

use rnakit_io_rs::gff::{self, GffRecord};
use rnakit_io_rs::{table, ReadRecord};

/// Marker used in exon tables for genes without constitutive exons.
pub const NOT_AVAILABLE: &str = "NA";

/// Length of the strand suffix of exon identifiers (`:+`, `:-`, `_+`, ...).
const STRAND_SUFFIX: usize = 2;

/// Separator between a contig-disambiguation prefix and the exon coordinates.
const PREFIX_SEPARATOR: char = '.';

/// Strip an exon identifier down to the region key used for counting: the strand suffix is
/// dropped, then anything up to the first `.` (a prefix that disambiguates exons named after
/// several contigs).
///
/// `chr1:100-200:+` becomes `chr1:100-200`, `chr1.exon5_+` becomes `exon5`.
pub fn normalize_exon_id(exon: &str) -> &str {
    let cut = exon
        .char_indices()
        .rev()
        .nth(STRAND_SUFFIX - 1)
        .map(|(ind, _)| ind)
        .unwrap_or(0);
    let strandless = &exon[..cut];

    match strandless.split_once(PREFIX_SEPARATOR) {
        Some((_, rest)) => rest,
        None => strandless,
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ExonList {
    Available(Vec<String>),
    NotAvailable,
}

impl ExonList {
    /// Parse a comma-separated list of exon identifiers or the `NA` marker.
    pub fn parse(field: &str) -> Self {
        let field = field.trim();
        if field == NOT_AVAILABLE || field.is_empty() {
            return ExonList::NotAvailable;
        }
        ExonList::Available(
            field
                .split(',')
                .filter(|x| !x.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }
}

/// Constitutive exons of a single gene.
#[derive(Clone, PartialEq, Eq, Debug, Dissolve, Getters)]
pub struct GeneExonGroup {
    gene_id: String,
    exons: ExonList,
    // Exon field exactly as it appears in the source table, reported in the RPKM output
    raw: String,
}

impl GeneExonGroup {
    pub fn new(gene_id: impl Into<String>, exons: impl Into<String>) -> Self {
        let raw = exons.into();
        Self {
            gene_id: gene_id.into(),
            exons: ExonList::parse(&raw),
            raw,
        }
    }

    /// Read genes from a table with `gene_id` and `exons` columns.
    pub fn from_reader(reader: impl BufRead) -> Result<Vec<Self>> {
        let mut reader = table::Reader::new(reader)?;
        let gene_col = reader.header().index("gene_id")?;
        let exons_col = reader.header().index("exons")?;

        let mut genes = Vec::new();
        let mut row = Vec::new();
        while reader.read_record(&mut row)? {
            genes.push(GeneExonGroup::new(
                std::mem::take(&mut row[gene_col]),
                std::mem::take(&mut row[exons_col]),
            ));
        }
        Ok(genes)
    }

    pub fn read_table(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let path = path.as_ref();
        Self::from_reader(rnakit_io_rs::compression::open(path)?)
            .wrap_err_with(|| format!("Failed to load genes from {}", path.display()))
    }
}

/// Lengths (bp) of exons, keyed by their raw identifiers.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ExonLengthTable {
    lengths: AHashMap<String, u64>,
}

impl ExonLengthTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, exon: impl Into<String>, length: u64) -> Option<u64> {
        self.lengths.insert(exon.into(), length)
    }

    pub fn get(&self, exon: &str) -> Option<u64> {
        self.lengths.get(exon).copied()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Exon lengths from GFF features, keyed by their `ID` attribute. Features without an ID
    /// can't be referenced by genes and are ignored.
    pub fn from_gff_records<'a>(records: impl IntoIterator<Item = &'a GffRecord>) -> Self {
        let mut table = Self::new();
        let (mut anonymous, mut duplicated) = (0usize, 0usize);
        for record in records {
            match record.id() {
                Some(id) => {
                    if table.lengths.contains_key(id) {
                        duplicated += 1;
                        continue;
                    }
                    table.insert(id, record.interval().len());
                }
                None => anonymous += 1,
            }
        }

        if anonymous > 0 {
            log::debug!("Ignored {anonymous} GFF features without an ID attribute");
        }
        if duplicated > 0 {
            log::warn!("Found {duplicated} GFF features with duplicated IDs, kept the first ones");
        }
        table
    }

    pub fn read_gff(path: impl AsRef<Path>) -> Result<Self> {
        let records = gff::read_all(path)?;
        Ok(Self::from_gff_records(&records))
    }

    /// Read lengths from a table with `exon_id` and `length` columns.
    pub fn read_table(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = table::Reader::from_path(path)?;
        let exon_col = reader.header().index("exon_id")?;
        let length_col = reader.header().index("length")?;

        let mut table = Self::new();
        let mut row = Vec::new();
        while reader.read_record(&mut row)? {
            let length = row[length_col]
                .parse::<u64>()
                .wrap_err_with(|| format!("Invalid exon length in {}", path.display()))?;
            let exon = std::mem::take(&mut row[exon_col]);
            ensure!(
                table.insert(exon.clone(), length).is_none(),
                "Exon {exon} is listed more than once in {}",
                path.display()
            );
        }
        Ok(table)
    }
}

impl FromIterator<(String, u64)> for ExonLengthTable {
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self {
        Self {
            lengths: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rnakit_core_rs::loc::GenomicInterval;

    use super::*;

    #[test]
    fn test_normalize_exon_id() {
        assert_eq!(normalize_exon_id("chr1.exon5_+"), "exon5");
        assert_eq!(normalize_exon_id("chr1:100-200:+"), "chr1:100-200");
        assert_eq!(normalize_exon_id("chrX.chrX:5-10:-"), "chrX:5-10");
        assert_eq!(normalize_exon_id("+"), "");
        assert_eq!(normalize_exon_id(""), "");
    }

    #[test]
    fn test_exon_list() {
        assert_eq!(ExonList::parse("NA"), ExonList::NotAvailable);
        assert_eq!(
            ExonList::parse("a:+,b:-"),
            ExonList::Available(vec!["a:+".into(), "b:-".into()])
        );
    }

    #[test]
    fn test_genes_from_reader() -> Result<()> {
        let table = "gene_id\tsymbol\texons\nG1\tABC\tchr1:1-10:+,chr1:20-30:+\nG2\tDEF\tNA\n";
        let genes = GeneExonGroup::from_reader(Cursor::new(table))?;
        assert_eq!(genes.len(), 2);
        assert_eq!(genes[0].gene_id(), "G1");
        assert_eq!(genes[0].raw(), "chr1:1-10:+,chr1:20-30:+");
        assert!(matches!(genes[0].exons(), ExonList::Available(x) if x.len() == 2));
        assert_eq!(genes[1].exons(), &ExonList::NotAvailable);

        assert!(GeneExonGroup::from_reader(Cursor::new("gene\texons\n")).is_err());
        Ok(())
    }

    #[test]
    fn test_lengths_from_gff() -> Result<()> {
        let exon = |id: Option<&str>, start, end| -> Result<GffRecord> {
            Ok(GffRecord::new(
                GenomicInterval::new("chr1", start, end, "const")?,
                "exon".into(),
                '+',
                id.map(|x| ("ID".to_string(), x.to_string())).into_iter().collect(),
            ))
        };
        let records = vec![
            exon(Some("chr1:1-10:+"), 1, 10)?,
            exon(Some("chr1:20-30:+"), 20, 30)?,
            exon(None, 40, 50)?,
            exon(Some("chr1:1-10:+"), 1, 100)?,
        ];

        let lengths = ExonLengthTable::from_gff_records(&records);
        assert_eq!(lengths.len(), 2);
        assert_eq!(lengths.get("chr1:1-10:+"), Some(10));
        assert_eq!(lengths.get("chr1:20-30:+"), Some(11));
        assert_eq!(lengths.get("chr1:40-50:+"), None);
        Ok(())
    }
}
