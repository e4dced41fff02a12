use derive_more::Constructor;
use eyre::{ensure, eyre, OptionExt, Result, WrapErr};

use rnakit_core_rs::loc::RegionKey;

/// A single interval overlap reported by the tagger, in its 0-based half-open coordinates.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Constructor)]
pub struct Overlap {
    contig: String,
    start: u64,
    end: u64,
}

impl Overlap {
    pub fn contig(&self) -> &str {
        &self.contig
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Counting key in 1-based closed coordinates.
    pub fn region_key(&self) -> RegionKey {
        RegionKey::from_zero_based(&self.contig, self.start, self.end)
    }
}

fn parse_segment(segment: &str) -> Result<Overlap> {
    // contig:start-end[:strand][,...]
    let region = segment.split(',').next().unwrap_or(segment);
    let mut parts = region.split(':');
    let contig = parts.next().filter(|x| !x.is_empty()).ok_or_eyre("Missing contig")?;
    let coords = parts.next().ok_or_eyre("Missing coordinates")?;

    let (start, end) = coords
        .split_once('-')
        .ok_or_else(|| eyre!("Coordinates must be start-end, got {coords}"))?;
    let start = start.parse::<u64>().wrap_err("Invalid start")?;
    let end = end.parse::<u64>().wrap_err("Invalid end")?;
    ensure!(start < end, "Empty or inverted interval {start}-{end}");

    Ok(Overlap::new(contig.to_owned(), start, end))
}

/// Parse an interval-overlap annotation into `into` (cleared first).
///
/// The annotation lists every overlapped interval introduced by `<label>:`; anything before the
/// first marker is tagger preamble and is ignored.
pub fn parse_overlaps(payload: &str, label: &str, into: &mut Vec<Overlap>) -> Result<()> {
    into.clear();
    let marker = format!("{label}:");
    for segment in payload.split(marker.as_str()).skip(1) {
        let overlap = parse_segment(segment)
            .wrap_err_with(|| format!("Malformed interval annotation: {payload}"))?;
        into.push(overlap);
    }
    Ok(())
}
