// Format specification: https://samtools.github.io/hts-specs/SAMv1.pdf
// Only the fields needed for interval tagging are materialized:
// 1. QNAME, 3. RNAME, 12+. optional TAG:TYPE:VALUE fields

mod reader;
mod record;

pub use reader::Reader;
pub use record::{is_header, AlignmentRecord, Tag};
