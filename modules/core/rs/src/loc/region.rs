use std::borrow::Borrow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use eyre::{eyre, Report, Result, WrapErr};

/// Canonical name of a counted region: `contig:start-end` in 1-based closed coordinates.
///
/// Keys are compared and hashed as plain strings, which lets count tables be queried with
/// exon identifiers (`&str`) without allocating a key for every lookup.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RegionKey(String);

impl RegionKey {
    pub fn new(contig: &str, start: u64, end: u64) -> Self {
        Self(format!("{contig}:{start}-{end}"))
    }

    /// Key for a region reported in 0-based half-open coordinates [start, end).
    pub fn from_zero_based(contig: &str, start: u64, end: u64) -> Self {
        Self::new(contig, start + 1, end)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the key back into (contig, start, end).
    pub fn parts(&self) -> Result<(&str, u64, u64)> {
        parse_parts(&self.0)
    }
}

fn parse_parts(key: &str) -> Result<(&str, u64, u64)> {
    let (contig, coords) = key
        .rsplit_once(':')
        .ok_or_else(|| eyre!("Region key must be contig:start-end, got {key}"))?;
    let (start, end) = coords
        .split_once('-')
        .ok_or_else(|| eyre!("Region key must be contig:start-end, got {key}"))?;

    let start = start
        .parse::<u64>()
        .wrap_err_with(|| format!("Invalid region start in {key}"))?;
    let end = end
        .parse::<u64>()
        .wrap_err_with(|| format!("Invalid region end in {key}"))?;

    if contig.is_empty() || start == 0 || start > end {
        return Err(eyre!("Invalid region key {key}"));
    }
    Ok((contig, start, end))
}

impl FromStr for RegionKey {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self> {
        parse_parts(s)?;
        Ok(Self(s.to_owned()))
    }
}

impl Borrow<str> for RegionKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RegionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for RegionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
