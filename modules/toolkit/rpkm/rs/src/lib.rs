pub use aggregate::{ExonAggregator, GeneAggregate};
pub use counting::{CountingStats, Overlap, RegionCountTable, RegionCounter};
pub use error::PipelineError;
pub use exons::{normalize_exon_id, ExonLengthTable, ExonList, GeneExonGroup};
pub use pipeline::{ExonTable, RpkmPipeline, RpkmPipelineBuilder, Sample};
pub use record::GeneRpkmRecord;
pub use rpkm::{rpkm, MappedReads};
pub use tagger::{IntervalTagger, RelayStats, TagOutcome, TaggerBuilder};

pub mod aggregate;
pub mod counting;
mod error;
pub mod exons;
pub mod loess;
pub mod pipeline;
mod record;
pub mod rpkm;
mod staging;
pub mod table;
pub mod tagger;
pub mod threads;
mod tool;
