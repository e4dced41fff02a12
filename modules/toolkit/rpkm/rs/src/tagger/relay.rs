use std::io::{BufRead, Write};

use derive_getters::Dissolve;
use eyre::{Result, WrapErr};
use memchr::memmem;

/// Index (0-based) of the tab that precedes the first optional SAM field.
const LAST_MANDATORY_TAB: usize = 10;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Dissolve)]
pub struct RelayStats {
    // Header lines forwarded to the encoder
    headers: u64,
    // Alignments whose annotation carries the requested label
    hits: u64,
    // Lines without a read name
    skipped: u64,
    // Alignments dropped because they don't overlap any labeled interval
    filtered: u64,
}

impl RelayStats {
    pub fn headers(&self) -> u64 {
        self.headers
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn filtered(&self) -> u64 {
        self.filtered
    }
}

/// Line filter between the tagging tool and the encoder: headers always pass, alignments pass
/// only if their optional fields mention `:<label>:`.
#[derive(Clone, Debug)]
pub struct Relay {
    marker: Vec<u8>,
    progress_every: u64,
}

impl Relay {
    pub const DEFAULT_PROGRESS_EVERY: u64 = 1_000_000;

    pub fn new(label: &str) -> Self {
        Self {
            marker: format!(":{label}:").into_bytes(),
            progress_every: Self::DEFAULT_PROGRESS_EVERY,
        }
    }

    pub fn with_progress_every(mut self, progress_every: u64) -> Self {
        self.progress_every = progress_every.max(1);
        self
    }

    fn is_hit(&self, line: &[u8]) -> bool {
        let payload = memchr::memchr_iter(b'\t', line)
            .nth(LAST_MANDATORY_TAB)
            .map(|pos| &line[pos + 1..]);
        match payload {
            Some(payload) => memmem::find(payload, &self.marker).is_some(),
            None => false,
        }
    }

    /// Stream `input` into `output` line by line. Nothing but the current line is buffered.
    pub fn run(&self, mut input: impl BufRead, output: &mut impl Write) -> Result<RelayStats> {
        let mut stats = RelayStats::default();
        let mut line = Vec::with_capacity(1024);

        loop {
            line.clear();
            if input
                .read_until(b'\n', &mut line)
                .wrap_err("Failed to read the tagged alignment stream")?
                == 0
            {
                break;
            }
            if line.last() != Some(&b'\n') {
                line.push(b'\n');
            }
            let content = &line[..line.len() - 1];

            if content.first() == Some(&b'@') {
                output
                    .write_all(&line)
                    .wrap_err("Failed to forward a header line to the encoder")?;
                stats.headers += 1;
                continue;
            }

            let name_len = memchr::memchr(b'\t', content).unwrap_or(content.len());
            if name_len == 0 {
                stats.skipped += 1;
                continue;
            }

            if self.is_hit(content) {
                output
                    .write_all(&line)
                    .wrap_err("Failed to forward an alignment to the encoder")?;
                stats.hits += 1;
                if stats.hits % self.progress_every == 0 {
                    log::info!("Through {} hits", stats.hits);
                }
            } else {
                stats.filtered += 1;
            }
        }

        if stats.skipped > 0 {
            log::info!("Skipped total of {} reads.", stats.skipped);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn alignment(name: &str, tags: &str) -> String {
        let mut line = format!("{name}\t0\tchr1\t100\t60\t4M\t*\t0\t0\tACGT\tIIII");
        if !tags.is_empty() {
            line.push('\t');
            line.push_str(tags);
        }
        line.push('\n');
        line
    }

    #[test]
    fn test_relay_filters_by_label() -> Result<()> {
        let input = [
            "@HD\tVN:1.6\n".to_string(),
            "@SQ\tSN:chr1\tLN:1000\n".to_string(),
            alignment("r1", "YB:Z:gff:chr1:99-200"),
            alignment("r2", "YB:Z:other:chr1:99-200"),
            alignment("r3", ""),
            "\t0\tchr1\n".to_string(),
            "\n".to_string(),
            alignment("r4", "NM:i:0\tYB:Z:gff:chr1:0-10,gff:chr1:20-30"),
        ]
        .concat();

        let mut output = Vec::new();
        let stats = Relay::new("gff").run(Cursor::new(input), &mut output)?;

        assert_eq!(stats.headers(), 2);
        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.skipped(), 2);
        assert_eq!(stats.filtered(), 2);

        let expected = [
            "@HD\tVN:1.6\n".to_string(),
            "@SQ\tSN:chr1\tLN:1000\n".to_string(),
            alignment("r1", "YB:Z:gff:chr1:99-200"),
            alignment("r4", "NM:i:0\tYB:Z:gff:chr1:0-10,gff:chr1:20-30"),
        ]
        .concat();
        assert_eq!(String::from_utf8(output)?, expected);
        Ok(())
    }

    #[test]
    fn test_label_in_mandatory_fields_is_ignored() -> Result<()> {
        // The read name mentions the label, but no optional field does
        let input = alignment("x:gff:y", "NM:i:0");
        let mut output = Vec::new();
        let stats = Relay::new("gff").run(Cursor::new(input), &mut output)?;
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.filtered(), 1);
        assert!(output.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_final_newline() -> Result<()> {
        let input = "@HD\tVN:1.6\nr1\t0\tchr1\t1\t60\t4M\t*\t0\t0\tACGT\tIIII\tYB:Z:gff:chr1:0-4";
        let mut output = Vec::new();
        let stats = Relay::new("gff").run(Cursor::new(input), &mut output)?;
        assert_eq!(stats.hits(), 1);
        assert!(output.ends_with(b"gff:chr1:0-4\n"));
        Ok(())
    }

    #[test]
    fn test_empty_stream() -> Result<()> {
        let mut output = Vec::new();
        let stats = Relay::new("gff").run(Cursor::new(""), &mut output)?;
        assert_eq!(stats, RelayStats::default());
        Ok(())
    }
}
