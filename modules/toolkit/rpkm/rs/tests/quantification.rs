use std::fs;

use eyre::{eyre, Result};
use tempfile::TempDir;

use rnakit_rpkm_rs::table::{read_table, write_table};
use rnakit_rpkm_rs::{
    ExonAggregator, ExonTable, GeneRpkmRecord, MappedReads, PipelineError, RegionCounter,
};

mod common;

const EPSILON: f64 = 1e-9;

#[test]
fn counts_from_tagged_alignments() -> Result<()> {
    let dir = TempDir::new()?;
    let tagged = dir.path().join("sample.bam");
    fs::write(&tagged, common::tagged_sam(true))?;

    let mut counter = RegionCounter::new("gff");
    let counts = counter.count_path(&tagged)?;

    let sorted: Vec<_> = counts
        .sorted()
        .into_iter()
        .map(|(key, count)| (key.to_string(), count))
        .collect();
    assert_eq!(
        sorted,
        vec![
            ("chr1:100-200".to_owned(), 2),
            ("chr1:300-400".to_owned(), 1),
            ("chr2:1-50".to_owned(), 1),
            ("chr2:150-300".to_owned(), 1),
        ]
    );
    assert_eq!(counts.total(), 5);

    let stats = counter.stats();
    assert_eq!(stats.records(), 7);
    assert_eq!(stats.tagged(), 5);
    assert_eq!(stats.malformed(), 0);
    Ok(())
}

#[test]
fn empty_tagged_file_has_no_counts() -> Result<()> {
    let dir = TempDir::new()?;
    let tagged = dir.path().join("sample.bam");
    fs::write(&tagged, "")?;

    let counts = RegionCounter::new("gff").count_path(&tagged)?;
    assert!(counts.is_empty());
    Ok(())
}

#[test]
fn gene_rpkm_table() -> Result<()> {
    let dir = TempDir::new()?;
    let tagged = dir.path().join("sample.bam");
    fs::write(&tagged, common::tagged_sam(true))?;
    let gff = common::write_gff(dir.path())?;
    let genes = common::write_genes(dir.path())?;

    let table = ExonTable::load("const_exons", &gff, &genes)?;
    assert_eq!(table.genes().len(), 4);
    assert_eq!(table.lengths().len(), 5);

    let counts = RegionCounter::new("gff").count_path(&tagged)?;
    let aggregated = ExonAggregator::new(&counts, table.lengths()).aggregate(table.genes())?;

    let summary: Vec<_> = aggregated
        .iter()
        .map(|(gene, aggregate)| (gene.gene_id().as_str(), *aggregate.counts(), *aggregate.length()))
        .collect();
    assert_eq!(
        summary,
        vec![("G1", 3, 202), ("G2", 2, 201), ("G4", 0, 1000)]
    );

    let mapped = MappedReads::new("sample", 1_000_000)?;
    let records: Vec<_> = aggregated
        .into_iter()
        .map(|(gene, aggregate)| {
            GeneRpkmRecord::from_aggregate(gene.gene_id(), aggregate, mapped, gene.raw())
        })
        .collect();

    let output = dir.path().join("const_exons.rpkm");
    write_table(&output, &records)?;

    let rows = read_table(&output)?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].gene_id(), "G1");
    assert_eq!(rows[0].exons(), "chr1:100-200:+,chr1:300-400:+");
    assert_eq!(*rows[0].counts(), 3);

    let rpkm = rows[0].rpkm().ok_or_else(|| eyre!("G1 has no RPKM"))?;
    assert!((rpkm - 3.0 / 0.202).abs() < EPSILON);
    assert_eq!(*rows[2].rpkm(), Some(0.0));

    let content = fs::read_to_string(&output)?;
    assert!(content.starts_with("gene_id\trpkm\tcounts\texons\n"));
    assert!(content.contains("\nG4\t0.0\t0\tchr3:1-1000:+\n"));
    Ok(())
}

#[test]
fn zero_mapped_reads_is_fatal() {
    let err = MappedReads::new("sample", 0).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::ZeroMappedReads { .. })
    ));
}
