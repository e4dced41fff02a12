use ahash::AHashMap;

use rnakit_core_rs::loc::RegionKey;

/// Number of reads overlapping each counted region.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct RegionCountTable {
    counts: AHashMap<RegionKey, u64>,
}

impl RegionCountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: RegionKey) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// Count for a region, 0 for regions that no read overlapped.
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct regions with at least one read.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total number of (read, region) overlaps.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionKey, u64)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }

    /// Entries ordered by region key.
    pub fn sorted(&self) -> Vec<(&RegionKey, u64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl FromIterator<(RegionKey, u64)> for RegionCountTable {
    fn from_iter<T: IntoIterator<Item = (RegionKey, u64)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (key, count) in iter {
            *table.counts.entry(key).or_insert(0) += count;
        }
        table
    }
}
