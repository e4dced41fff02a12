use derive_getters::{Dissolve, Getters};

use crate::aggregate::GeneAggregate;
use crate::rpkm::{rpkm, MappedReads};

/// A single row of the gene-level RPKM table.
#[derive(Clone, PartialEq, Debug, Dissolve, Getters)]
pub struct GeneRpkmRecord {
    gene_id: String,
    counts: u64,
    length: u64,
    rpkm: Option<f64>,
    exons: String,
}

impl GeneRpkmRecord {
    pub fn new(
        gene_id: impl Into<String>,
        counts: u64,
        length: u64,
        rpkm: Option<f64>,
        exons: impl Into<String>,
    ) -> Self {
        Self {
            gene_id: gene_id.into(),
            counts,
            length,
            rpkm,
            exons: exons.into(),
        }
    }

    /// Normalize the aggregated counts of a gene by its length and the library size.
    pub fn from_aggregate(
        gene_id: impl Into<String>,
        aggregate: GeneAggregate,
        mapped: MappedReads,
        exons: impl Into<String>,
    ) -> Self {
        let (counts, length) = aggregate.dissolve();
        Self::new(
            gene_id,
            counts,
            length,
            rpkm(counts, length, mapped),
            exons,
        )
    }
}
