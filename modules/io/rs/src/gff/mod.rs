// Format specification: https://github.com/The-Sequence-Ontology/Specifications/blob/master/gff3.md

// Columns:
// 1. seqid
// 2. source
// 3. type
// 4. start (1-based)
// 5. end (1-based, inclusive)
// 6. score
// 7. strand: [+|-|.|?]
// 8. phase
// 9. attributes: tag=value pairs separated by ';'

mod reader;
mod record;

pub use reader::{read_all, Reader};
pub use record::GffRecord;
