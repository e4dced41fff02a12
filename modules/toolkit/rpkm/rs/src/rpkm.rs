use std::num::NonZeroU64;

use derive_more::{Display, Into};
use eyre::Result;

use crate::PipelineError;

/// Total number of mapped reads of a sample, the library size RPKMs are normalized by.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display, Into)]
pub struct MappedReads(NonZeroU64);

impl MappedReads {
    /// RPKMs are undefined for empty libraries, a zero count is a fatal error.
    pub fn new(sample: &str, reads: u64) -> Result<Self> {
        match NonZeroU64::new(reads) {
            Some(reads) => Ok(Self(reads)),
            None => Err(PipelineError::ZeroMappedReads {
                sample: sample.to_owned(),
            }
            .into()),
        }
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

/// Reads per kilobase of exon per million mapped reads. Undefined (None) for zero-length
/// features.
pub fn rpkm(count: u64, length_bp: u64, mapped: MappedReads) -> Option<f64> {
    if length_bp == 0 {
        return None;
    }
    let per_kb = count as f64 / (length_bp as f64 / 1e3);
    Some(per_kb / (mapped.get() as f64 / 1e6))
}
