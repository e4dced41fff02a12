pub use counter::{CountingStats, RegionCounter};
pub use overlaps::{parse_overlaps, Overlap};
pub use table::RegionCountTable;

mod counter;
mod overlaps;
mod table;
