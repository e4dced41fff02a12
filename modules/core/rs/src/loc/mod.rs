pub use interval::GenomicInterval;
pub use region::RegionKey;

mod interval;
mod region;
