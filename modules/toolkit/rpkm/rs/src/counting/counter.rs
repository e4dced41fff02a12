use std::io::BufRead;
use std::path::Path;

use derive_getters::Dissolve;
use eyre::{Result, WrapErr};

use rnakit_io_rs::compression::{self, Compression};
use rnakit_io_rs::sam::{AlignmentRecord, Tag};
use rnakit_io_rs::{bam, sam, ReadRecord};

use super::overlaps::{parse_overlaps, Overlap};
use super::table::RegionCountTable;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Dissolve)]
pub struct CountingStats {
    records: u64,
    // Records carrying the overlap annotation
    tagged: u64,
    // Tagged records whose annotation couldn't be parsed
    malformed: u64,
    // Counted (record, region) pairs
    overlaps: u64,
}

impl CountingStats {
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn tagged(&self) -> u64 {
        self.tagged
    }

    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    pub fn overlaps(&self) -> u64 {
        self.overlaps
    }
}

/// Accumulates per-region read counts from interval-tagged alignments.
///
/// The counter never owns the counts: the table is passed in by the caller, so the same counter
/// can feed several tables and a table can be filled from several inputs.
#[derive(Clone, Debug)]
pub struct RegionCounter {
    tag: Tag,
    label: String,
    overlaps: Vec<Overlap>,
    stats: CountingStats,
}

impl RegionCounter {
    /// Optional field written by the tagger in interval mode.
    pub const DEFAULT_TAG: Tag = *b"YB";

    pub fn new(label: impl Into<String>) -> Self {
        Self {
            tag: Self::DEFAULT_TAG,
            label: label.into(),
            overlaps: Vec::new(),
            stats: CountingStats::default(),
        }
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = tag;
        self
    }

    pub fn stats(&self) -> &CountingStats {
        &self.stats
    }

    /// Count a single record. Records without the annotation are skipped silently, records
    /// with a malformed annotation are skipped as a whole and reported in the stats.
    pub fn process(&mut self, record: &AlignmentRecord, table: &mut RegionCountTable) {
        self.stats.records += 1;
        let payload = match record.tag(&self.tag) {
            Some(payload) => payload,
            None => return,
        };
        self.stats.tagged += 1;

        if let Err(err) = parse_overlaps(payload, &self.label, &mut self.overlaps) {
            log::debug!("Skipping read {}: {err:#}", record.name());
            self.stats.malformed += 1;
            return;
        }

        for overlap in &self.overlaps {
            table.increment(overlap.region_key());
        }
        self.stats.overlaps += self.overlaps.len() as u64;
    }

    /// Count every record of a reader.
    pub fn count<R>(&mut self, reader: &mut R, table: &mut RegionCountTable) -> Result<()>
    where
        R: ReadRecord<Record = AlignmentRecord>,
    {
        let malformed = self.stats.malformed;
        let mut record = AlignmentRecord::default();
        while reader.read_record(&mut record)? {
            self.process(&record, table);
        }

        let malformed = self.stats.malformed - malformed;
        if malformed > 0 {
            log::warn!("Skipped {malformed} reads with malformed interval annotations");
        }
        Ok(())
    }

    /// Count the reads of a tagged alignment file. Compressed files are decoded as BAM, anything
    /// else is read as SAM text. An empty file or an empty BGZF container, which the encoder may
    /// leave behind when no read overlapped the intervals, yields no counts.
    pub fn count_path(&mut self, path: impl AsRef<Path>) -> Result<RegionCountTable> {
        let path = path.as_ref();
        let mut table = RegionCountTable::new();

        let size = std::fs::metadata(path)
            .wrap_err_with(|| format!("Failed to access {}", path.display()))?
            .len();
        if size == 0 {
            log::warn!("{} is empty, no reads to count", path.display());
            return Ok(table);
        }

        log::info!("Counting interval overlaps in {}", path.display());
        let counted = match Compression::detect(path)? {
            Compression::Gzip => {
                // A BAM without any content, not even a header, is just the BGZF EOF marker
                if compression::open(path)?.fill_buf()?.is_empty() {
                    log::warn!("{} holds no alignments, no reads to count", path.display());
                    return Ok(table);
                }
                self.count(&mut bam::Reader::from_path(path)?, &mut table)
            }
            Compression::None => self.count(&mut sam::Reader::from_path(path)?, &mut table),
        };
        counted.wrap_err_with(|| format!("Failed to count reads in {}", path.display()))?;

        log::info!(
            "Counted {} overlaps in {} regions ({} of {} reads annotated)",
            self.stats.overlaps,
            table.len(),
            self.stats.tagged,
            self.stats.records
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, annotation: Option<&str>) -> AlignmentRecord {
        AlignmentRecord::new(
            name,
            "chr1",
            annotation.map(|x| (*b"YB", x.to_owned())),
        )
    }

    #[test]
    fn test_process() {
        let mut counter = RegionCounter::new("gff");
        let mut table = RegionCountTable::new();

        counter.process(&record("r1", Some("gff:chr1:99-200")), &mut table);
        counter.process(&record("r2", Some("gff:chr1:99-200,gff:chr1:299-400")), &mut table);
        counter.process(&record("r3", None), &mut table);
        counter.process(&record("r4", Some("gff:chr1:oops")), &mut table);

        assert_eq!(table.get("chr1:100-200"), 2);
        assert_eq!(table.get("chr1:300-400"), 1);
        assert_eq!(table.total(), 3);

        let stats = counter.stats();
        assert_eq!(stats.records(), 4);
        assert_eq!(stats.tagged(), 3);
        assert_eq!(stats.malformed(), 1);
        assert_eq!(stats.overlaps(), 3);
    }

    #[test]
    fn test_order_independence() {
        let records = [
            record("r1", Some("gff:chr1:0-10")),
            record("r2", Some("gff:chr1:0-10,gff:chr2:5-15")),
            record("r3", Some("gff:chr3:1-2")),
            record("r4", None),
        ];

        let mut forward = RegionCountTable::new();
        let mut counter = RegionCounter::new("gff");
        for r in &records {
            counter.process(r, &mut forward);
        }

        let mut backward = RegionCountTable::new();
        let mut counter = RegionCounter::new("gff");
        for r in records.iter().rev() {
            counter.process(r, &mut backward);
        }

        assert_eq!(forward, backward);
        assert_eq!(forward.total(), 4);
    }

    #[test]
    fn test_empty_containers() -> Result<()> {
        // BGZF end-of-file marker block
        const BGZF_EOF: [u8; 28] = [
            0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x06, 0x00, 0x42, 0x43,
            0x02, 0x00, 0x1b, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let dir = tempfile::tempdir()?;
        let eof = dir.path().join("eof.bam");
        std::fs::write(&eof, BGZF_EOF)?;
        let empty = dir.path().join("empty.bam");
        std::fs::write(&empty, b"")?;

        for path in [eof, empty] {
            let mut counter = RegionCounter::new("gff");
            assert!(counter.count_path(&path)?.is_empty());
            assert_eq!(counter.stats().records(), 0);
        }
        Ok(())
    }

    #[test]
    fn test_malformed_optional_fields_are_skipped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tagged.sam");
        std::fs::write(
            &path,
            "@HD\tVN:1.6\n\
             r1\t0\tchr1\t100\t60\t4M\t*\t0\t0\t*\t*\tYB:Z:gff:chr1:99-200\n\
             r2\t0\tchr1\t100\t60\t4M\t*\t0\t0\t*\t*\tXY\tYB:Z:gff:chr1:99-200\n\
             r3\t0\tchr1\t100\t60\t4M\t*\t0\t0\t*\t*\tYB:Z:gff:chr1:99-200\n",
        )?;

        let mut counter = RegionCounter::new("gff");
        let table = counter.count_path(&path)?;
        assert_eq!(table.get("chr1:100-200"), 3);
        assert_eq!(counter.stats().records(), 3);
        Ok(())
    }

    #[test]
    fn test_custom_label_and_tag() {
        let mut counter = RegionCounter::new("exons").with_tag(*b"XI");
        let mut table = RegionCountTable::new();

        let tagged = AlignmentRecord::new("r1", "chr1", [(*b"XI", "exons:chr1:9-20".to_owned())]);
        counter.process(&tagged, &mut table);
        counter.process(&record("r2", Some("gff:chr1:9-20")), &mut table);

        assert_eq!(table.get("chr1:10-20"), 1);
        assert_eq!(table.len(), 1);
    }
}
