use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use eyre::Result;

use crate::counting::RegionCountTable;
use crate::exons::{normalize_exon_id, ExonLengthTable, ExonList, GeneExonGroup};
use crate::PipelineError;

/// Read counts and total length of the constitutive exons of a gene.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Constructor, Dissolve, Getters)]
pub struct GeneAggregate {
    counts: u64,
    length: u64,
}

/// Sum per-exon lookups. Every exon must be looked up in both tables, so the two slices are
/// expected to have the same size.
pub fn sum_lookups(gene_id: &str, counts: &[u64], lengths: &[u64]) -> Result<GeneAggregate> {
    if counts.len() != lengths.len() {
        return Err(PipelineError::CountLengthMismatch {
            gene_id: gene_id.to_owned(),
            counts: counts.len(),
            lengths: lengths.len(),
        }
        .into());
    }
    Ok(GeneAggregate::new(
        counts.iter().sum(),
        lengths.iter().sum(),
    ))
}

/// Collapses per-region counts into per-gene totals over constitutive exons.
///
/// Counts are looked up by the normalized exon id (the region key the tagger reports), lengths
/// by the exon id as it is listed in the gene table.
#[derive(Clone, Copy, Debug)]
pub struct ExonAggregator<'a> {
    counts: &'a RegionCountTable,
    lengths: &'a ExonLengthTable,
}

impl<'a> ExonAggregator<'a> {
    pub fn new(counts: &'a RegionCountTable, lengths: &'a ExonLengthTable) -> Self {
        Self { counts, lengths }
    }

    /// Aggregate a single gene. Genes without constitutive exons yield None.
    pub fn aggregate_gene(&self, gene: &GeneExonGroup) -> Result<Option<GeneAggregate>> {
        let exons = match gene.exons() {
            ExonList::Available(exons) => exons,
            ExonList::NotAvailable => return Ok(None),
        };

        let mut counts = Vec::with_capacity(exons.len());
        let mut lengths = Vec::with_capacity(exons.len());
        for exon in exons {
            counts.push(self.counts.get(normalize_exon_id(exon)));

            let length = self
                .lengths
                .get(exon)
                .ok_or_else(|| PipelineError::MissingExonLength {
                    gene_id: gene.gene_id().clone(),
                    exon: exon.clone(),
                })?;
            lengths.push(length);
        }

        sum_lookups(gene.gene_id(), &counts, &lengths).map(Some)
    }

    /// Aggregate all genes with constitutive exons, preserving their order.
    pub fn aggregate<'g>(
        &self,
        genes: impl IntoIterator<Item = &'g GeneExonGroup>,
    ) -> Result<Vec<(&'g GeneExonGroup, GeneAggregate)>> {
        let mut result = Vec::new();
        for gene in genes {
            if let Some(aggregate) = self.aggregate_gene(gene)? {
                result.push((gene, aggregate));
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use rnakit_core_rs::loc::RegionKey;

    use super::*;

    fn counts() -> Result<RegionCountTable> {
        Ok([
            ("chr1:100-200".parse::<RegionKey>()?, 2),
            ("chr1:300-400".parse::<RegionKey>()?, 1),
        ]
        .into_iter()
        .collect())
    }

    fn lengths() -> ExonLengthTable {
        [
            ("chr1:100-200:+".to_owned(), 101),
            ("chr1:300-400:+".to_owned(), 101),
            ("chr1:500-600:+".to_owned(), 101),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_sum_lookups() -> Result<()> {
        assert_eq!(sum_lookups("G", &[1, 2], &[10, 20])?, GeneAggregate::new(3, 30));
        assert_eq!(sum_lookups("G", &[], &[])?, GeneAggregate::default());

        let err = sum_lookups("G", &[1, 2], &[10]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::CountLengthMismatch { counts: 2, lengths: 1, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_aggregate() -> Result<()> {
        let (counts, lengths) = (counts()?, lengths());
        let aggregator = ExonAggregator::new(&counts, &lengths);
        let genes = [
            GeneExonGroup::new("G1", "chr1:100-200:+,chr1:300-400:+"),
            GeneExonGroup::new("G2", "NA"),
            GeneExonGroup::new("G3", "chr1:500-600:+"),
        ];

        let aggregated = aggregator.aggregate(&genes)?;
        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated[0].0.gene_id(), "G1");
        assert_eq!(aggregated[0].1, GeneAggregate::new(3, 202));
        assert_eq!(aggregated[1].0.gene_id(), "G3");
        assert_eq!(aggregated[1].1, GeneAggregate::new(0, 101));
        Ok(())
    }

    #[test]
    fn test_prefixed_exon_ids() -> Result<()> {
        let counts: RegionCountTable = [(RegionKey::new("chr1", 100, 200), 4)].into_iter().collect();
        let lengths: ExonLengthTable = [("chr1.chr1:100-200_+".to_owned(), 101)]
            .into_iter()
            .collect();

        let gene = GeneExonGroup::new("G1", "chr1.chr1:100-200_+");
        let aggregate = ExonAggregator::new(&counts, &lengths).aggregate_gene(&gene)?;
        assert_eq!(aggregate, Some(GeneAggregate::new(4, 101)));
        Ok(())
    }

    #[test]
    fn test_missing_length() -> Result<()> {
        let (counts, lengths) = (counts()?, lengths());
        let gene = GeneExonGroup::new("G1", "chr1:100-200:+,chr9:1-2:+");
        let err = ExonAggregator::new(&counts, &lengths)
            .aggregate_gene(&gene)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingExonLength { exon, .. }) if exon == "chr9:1-2:+"
        ));
        Ok(())
    }
}
