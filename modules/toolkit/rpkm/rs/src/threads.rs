use std::cmp::Ordering;
use std::thread::available_parallelism;

use eyre::{Result, WrapErr};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Number of worker threads for a request: positive values are capped by the available
/// parallelism, negative ones mean "all but N" and 0 falls back to a single thread.
fn normalize(requested: isize, max: isize) -> usize {
    match requested.cmp(&0) {
        Ordering::Less => (max + requested + 1).max(1) as usize,
        Ordering::Equal => 1,
        Ordering::Greater => requested.min(max) as usize,
    }
}

pub fn available(requested: isize) -> Result<usize> {
    let max = available_parallelism()
        .wrap_err("Failed to query the available parallelism")?
        .get() as isize;
    Ok(normalize(requested, max))
}

/// Dedicated pool for processing independent tables of a sample.
pub fn thread_pool(requested: isize) -> Result<ThreadPool> {
    let threads = available(requested)?;
    log::debug!("Starting a pool with {threads} threads");
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|ind| format!("rpkm-worker-{ind}"))
        .build()
        .wrap_err("Failed to start the worker pool")
}
