pub mod bam;
pub mod compression;
pub mod gff;
pub mod sam;
pub mod table;
mod traits;

pub use traits::{ReadRecord, WriteRecord};
