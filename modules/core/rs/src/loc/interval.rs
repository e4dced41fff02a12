use derive_getters::Dissolve;
use derive_more::Display;
use eyre::{ensure, Result};

use super::RegionKey;

/// Closed genomic interval [start, end] in 1-based coordinates, as it appears in GFF files.
/// The label is the name of the interval source (GFF source column or a user-supplied tag).
/// Empty intervals can't be represented: a single base interval has start == end.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Dissolve, Display)]
#[display("{contig}:{start}-{end}")]
pub struct GenomicInterval {
    contig: String,
    start: u64,
    end: u64,
    label: String,
}

impl GenomicInterval {
    pub fn new(
        contig: impl Into<String>,
        start: u64,
        end: u64,
        label: impl Into<String>,
    ) -> Result<Self> {
        let contig = contig.into();
        ensure!(!contig.is_empty(), "Genomic interval must have a contig name");
        ensure!(
            start >= 1,
            "Genomic interval start must be 1-based, got {start} for {contig}"
        );
        ensure!(
            start <= end,
            "Invalid genomic interval {contig}:{start}-{end}: start > end"
        );

        Ok(Self {
            contig,
            start,
            end,
            label: label.into(),
        })
    }

    /// Build an interval from 0-based half-open coordinates [start, end).
    pub fn from_zero_based(
        contig: impl Into<String>,
        start: u64,
        end: u64,
        label: impl Into<String>,
    ) -> Result<Self> {
        Self::new(contig, start + 1, end, label)
    }

    pub fn contig(&self) -> &str {
        &self.contig
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of bases covered by the interval (both ends included).
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn region_key(&self) -> RegionKey {
        RegionKey::new(&self.contig, self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        assert!(GenomicInterval::new("chr1", 1, 1, "gff").is_ok());
        assert!(GenomicInterval::new("chr1", 10, 100, "gff").is_ok());
        assert!(GenomicInterval::new("chr1", 0, 100, "gff").is_err());
        assert!(GenomicInterval::new("chr1", 101, 100, "gff").is_err());
        assert!(GenomicInterval::new("", 1, 100, "gff").is_err());
    }

    #[test]
    fn test_from_zero_based() -> Result<()> {
        let interval = GenomicInterval::from_zero_based("chr2", 99, 200, "gff")?;
        assert_eq!(interval.start(), 100);
        assert_eq!(interval.end(), 200);
        assert_eq!(interval.len(), 101);
        assert_eq!(interval.label(), "gff");
        Ok(())
    }

    #[test]
    fn test_region_key() -> Result<()> {
        let interval = GenomicInterval::new("chrX", 5, 15, "exons")?;
        assert_eq!(interval.region_key().as_str(), "chrX:5-15");
        assert_eq!(interval.to_string(), "chrX:5-15");
        Ok(())
    }
}
