use thiserror::Error;

/// Conditions that abort the quantification of a sample. They are raised inside
/// `eyre::Report`s and can be recovered with `Report::downcast_ref::<PipelineError>()`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Aborting operation: {tool} not found")]
    MissingTool { tool: String },

    #[error("{tool} call failed: no header lines were produced (exit status: {status}). Output: {output}")]
    NoHeaders {
        tool: String,
        status: String,
        output: String,
    },

    #[error("Conversion of tagged alignments with {tool} failed (exit status: {status}). Output: {output}")]
    EncoderFailed {
        tool: String,
        status: String,
        output: String,
    },

    #[error("Gene {gene_id}: {counts} count lookups do not match {lengths} length lookups")]
    CountLengthMismatch {
        gene_id: String,
        counts: usize,
        lengths: usize,
    },

    #[error("Gene {gene_id}: exon {exon} has no known length")]
    MissingExonLength { gene_id: String, exon: String },

    #[error("Cannot compute RPKMs since sample {sample} has 0 mapped reads")]
    ZeroMappedReads { sample: String },
}
