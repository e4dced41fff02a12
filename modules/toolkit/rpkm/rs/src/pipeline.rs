use std::fs;
use std::path::{Path, PathBuf};

use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use eyre::{ensure, Result, WrapErr};
use itertools::Itertools;
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::aggregate::ExonAggregator;
use crate::counting::RegionCounter;
use crate::exons::{ExonLengthTable, GeneExonGroup};
use crate::record::GeneRpkmRecord;
use crate::rpkm::MappedReads;
use crate::table::{table_path, write_table};
use crate::tagger::IntervalTagger;

/// Subdirectory of the output directory that receives the tagged alignments.
pub const TAGGED_SUBDIR: &str = "bam2gff_const_exons";

/// A set of constitutive exons: the GFF with their intervals, the genes they belong to and
/// their lengths.
#[derive(Clone, Debug, Constructor, Dissolve, Getters)]
pub struct ExonTable {
    name: String,
    gff: PathBuf,
    genes: Vec<GeneExonGroup>,
    lengths: ExonLengthTable,
}

impl ExonTable {
    /// Load genes from `genes_table` and exon lengths from the `ID`s of the `gff` features.
    pub fn load(
        name: impl Into<String>,
        gff: impl Into<PathBuf>,
        genes_table: &Path,
    ) -> Result<Self> {
        let (name, gff) = (name.into(), gff.into());
        let genes = GeneExonGroup::read_table(genes_table)?;
        let lengths = ExonLengthTable::read_gff(&gff)?;
        log::info!(
            "Loaded table {name}: {} genes, {} constitutive exons",
            genes.len(),
            lengths.len()
        );
        Ok(Self::new(name, gff, genes, lengths))
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Constructor, Dissolve, Getters)]
pub struct Sample {
    label: String,
    alignment: PathBuf,
    mapped_reads: u64,
}

pub struct RpkmPipelineBuilder {
    output_dir: PathBuf,
    tagger: Option<IntervalTagger>,
    // Pool used to process independent tables. If not provided, tables are processed on the
    // global rayon pool.
    pool: Option<ThreadPool>,
}

impl RpkmPipelineBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            tagger: None,
            pool: None,
        }
    }

    pub fn set_tagger(mut self, tagger: IntervalTagger) -> Self {
        self.tagger = Some(tagger);
        self
    }

    pub fn set_thread_pool(mut self, pool: ThreadPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn build(self) -> Result<RpkmPipeline> {
        let tagger = match self.tagger {
            Some(tagger) => tagger,
            None => IntervalTagger::builder().build()?,
        };
        Ok(RpkmPipeline {
            output_dir: self.output_dir,
            tagger,
            pool: self.pool,
        })
    }
}

/// Computes gene-level RPKM tables of a sample for every constitutive-exon table.
pub struct RpkmPipeline {
    output_dir: PathBuf,
    tagger: IntervalTagger,
    pool: Option<ThreadPool>,
}

impl RpkmPipeline {
    pub fn builder(output_dir: impl Into<PathBuf>) -> RpkmPipelineBuilder {
        RpkmPipelineBuilder::new(output_dir)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn tagger(&self) -> &IntervalTagger {
        &self.tagger
    }

    /// Gene RPKMs from alignments already tagged with the intervals of `table`.
    pub fn quantify(
        &self,
        tagged: &Path,
        mapped: MappedReads,
        table: &ExonTable,
    ) -> Result<Vec<GeneRpkmRecord>> {
        let counts = RegionCounter::new(self.tagger.label()).count_path(tagged)?;
        let aggregated = ExonAggregator::new(&counts, table.lengths()).aggregate(table.genes())?;

        Ok(aggregated
            .into_iter()
            .map(|(gene, aggregate)| {
                GeneRpkmRecord::from_aggregate(gene.gene_id(), aggregate, mapped, gene.raw())
            })
            .collect())
    }

    /// Compute (or reuse) the RPKM table of `sample` for every exon table. Returns the location
    /// of each table, in the input order.
    pub fn run(&self, sample: &Sample, tables: &[ExonTable]) -> Result<Vec<(String, PathBuf)>> {
        let mapped = MappedReads::new(sample.label(), *sample.mapped_reads())?;
        log::info!("Sample {} has {} mapped reads", sample.label(), mapped);
        log::info!("Outputting RPKM for: {}", sample.label());

        // Tables are written concurrently, their outputs must not collide
        let duplicated = tables.iter().map(|x| x.name()).duplicates().join(", ");
        ensure!(
            duplicated.is_empty(),
            "Exon tables must have unique names, found duplicates: {duplicated}"
        );

        fs::create_dir_all(&self.output_dir)
            .wrap_err_with(|| format!("Failed to create {}", self.output_dir.display()))?;

        let result = match &self.pool {
            Some(pool) => pool.install(|| self._run(sample, mapped, tables)),
            None => self._run(sample, mapped, tables),
        }?;
        log::info!(
            "Finished outputting RPKM for {} to {}",
            sample.label(),
            self.output_dir.display()
        );
        Ok(result)
    }

    fn _run(
        &self,
        sample: &Sample,
        mapped: MappedReads,
        tables: &[ExonTable],
    ) -> Result<Vec<(String, PathBuf)>> {
        tables
            .par_iter()
            .map(|table| -> Result<(String, PathBuf)> {
                let path = self.process_table(sample, mapped, table).wrap_err_with(|| {
                    format!("Failed to compute RPKMs of {} for {}", sample.label(), table.name())
                })?;
                Ok((table.name().clone(), path))
            })
            .collect()
    }

    fn process_table(
        &self,
        sample: &Sample,
        mapped: MappedReads,
        table: &ExonTable,
    ) -> Result<PathBuf> {
        let output = table_path(&self.output_dir, table.name());
        if output.is_file() {
            log::info!("  - Skipping RPKM output, found {}", output.display());
            return Ok(output);
        }

        log::info!("Mapping alignments to GFF {}", table.gff().display());
        let tagged_dir = self.output_dir.join(TAGGED_SUBDIR);
        let tagged = self
            .tagger
            .tag(sample.alignment(), table.gff(), &tagged_dir)?;

        log::info!("Outputting RPKM from GFF aligned alignments (table {})", table.name());
        let records = self.quantify(tagged.path(), mapped, table)?;
        write_table(&output, &records)?;
        Ok(output)
    }
}
