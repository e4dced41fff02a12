use std::ffi::OsString;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use eyre::{eyre, Result, WrapErr};

use super::process::Stage;
use super::relay::{Relay, RelayStats};
use crate::staging::staging_file;
use crate::tool::ExternalTool;
use crate::PipelineError;

/// Result of tagging an alignment file.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TagOutcome {
    /// The output was already present and has been reused as is.
    Existing(PathBuf),
    /// The output was produced by running the tagging pipeline.
    Created { path: PathBuf, stats: RelayStats },
}

impl TagOutcome {
    pub fn path(&self) -> &Path {
        match self {
            TagOutcome::Existing(path) => path,
            TagOutcome::Created { path, .. } => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            TagOutcome::Existing(path) => path,
            TagOutcome::Created { path, .. } => path,
        }
    }
}

pub struct TaggerBuilder {
    tagger: OsString,
    samtools: OsString,
    label: String,
    min_overlap: f64,
    progress_every: u64,
}

impl Default for TaggerBuilder {
    fn default() -> Self {
        Self {
            tagger: OsString::from(IntervalTagger::DEFAULT_TAGGER),
            samtools: OsString::from(IntervalTagger::DEFAULT_SAMTOOLS),
            label: IntervalTagger::DEFAULT_LABEL.to_owned(),
            min_overlap: 1.0,
            progress_every: Relay::DEFAULT_PROGRESS_EVERY,
        }
    }
}

impl TaggerBuilder {
    /// Program that annotates alignments with the intervals they overlap (`tagBam`).
    pub fn set_tagger(mut self, program: impl Into<OsString>) -> Self {
        self.tagger = program.into();
        self
    }

    /// Program used to decode the tagged BAM into SAM text and to encode the filtered stream.
    pub fn set_samtools(mut self, program: impl Into<OsString>) -> Self {
        self.samtools = program.into();
        self
    }

    pub fn set_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Minimum overlap required by the tagger, as a fraction of the alignment.
    pub fn set_min_overlap(mut self, fraction: f64) -> Self {
        self.min_overlap = fraction;
        self
    }

    pub fn set_progress_every(mut self, hits: u64) -> Self {
        self.progress_every = hits;
        self
    }

    /// Resolve the external tools. A missing tool is reported here, before anything is launched.
    pub fn build(self) -> Result<IntervalTagger> {
        eyre::ensure!(!self.label.is_empty(), "Interval label must not be empty");
        eyre::ensure!(
            self.min_overlap > 0.0 && self.min_overlap <= 1.0,
            "Minimum overlap must be in (0, 1], got {}",
            self.min_overlap
        );

        Ok(IntervalTagger {
            tagger: ExternalTool::resolve(&self.tagger)?,
            samtools: ExternalTool::resolve(&self.samtools)?,
            relay: Relay::new(&self.label).with_progress_every(self.progress_every),
            label: self.label,
            min_overlap: self.min_overlap,
        })
    }
}

/// Annotates alignments with overlapping intervals and keeps only those that overlap the
/// intervals with the requested label:
///
/// `tagBam | samtools view -h -` → [`Relay`] → `samtools view -Shb -o <output> -`
#[derive(Clone, Debug)]
pub struct IntervalTagger {
    tagger: ExternalTool,
    samtools: ExternalTool,
    relay: Relay,
    label: String,
    min_overlap: f64,
}

fn basename(path: &Path) -> Result<&std::ffi::OsStr> {
    path.file_name()
        .ok_or_else(|| eyre!("Path {} has no file name", path.display()))
}

impl IntervalTagger {
    pub const DEFAULT_TAGGER: &'static str = "tagBam";
    pub const DEFAULT_SAMTOOLS: &'static str = "samtools";
    pub const DEFAULT_LABEL: &'static str = "gff";

    pub fn builder() -> TaggerBuilder {
        TaggerBuilder::default()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Location of the tagged alignments: `<output_dir>/bam2gff_<intervals>/<alignment>`.
    pub fn output_path(
        &self,
        alignment: &Path,
        intervals: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let mut subdir = OsString::from("bam2gff_");
        subdir.push(basename(intervals)?);
        Ok(output_dir.join(subdir).join(basename(alignment)?))
    }

    /// Tag `alignment` with the intervals from `intervals`, storing the filtered alignments under
    /// `output_dir`. Existing outputs are never recomputed.
    pub fn tag(&self, alignment: &Path, intervals: &Path, output_dir: &Path) -> Result<TagOutcome> {
        let output = self.output_path(alignment, intervals, output_dir)?;
        let subdir = output
            .parent()
            .ok_or_else(|| eyre!("Invalid output path {}", output.display()))?;
        fs::create_dir_all(subdir)
            .wrap_err_with(|| format!("Failed to create {}", subdir.display()))?;

        log::info!("Mapping alignments to intervals...");
        log::info!("  - Alignments: {}", alignment.display());
        log::info!("  - Intervals: {}", intervals.display());
        log::info!("  - Output file: {}", output.display());
        if output.exists() {
            log::warn!("{} exists. Skipping..", output.display());
            return Ok(TagOutcome::Existing(output));
        }

        // The encoder writes next to the final output, the file is moved in place only once
        // the whole pipeline succeeded. Dropping the staging file removes it.
        let mut prefix = OsString::from(".");
        prefix.push(basename(&output)?);
        prefix.push(".");
        let staging = staging_file(subdir, &prefix)
            .wrap_err_with(|| format!("Failed to create a staging file in {}", subdir.display()))?;

        let stats = self.run(alignment, intervals, staging.path())?;

        staging
            .persist(&output)
            .wrap_err_with(|| format!("Failed to move tagged alignments to {}", output.display()))?;
        Ok(TagOutcome::Created {
            path: output,
            stats,
        })
    }

    fn run(&self, alignment: &Path, intervals: &Path, saveto: &Path) -> Result<RelayStats> {
        let mut tagger = Stage::spawn(
            self.tagger.name(),
            self.tagger
                .command()
                .arg("-i")
                .arg(alignment)
                .arg("-files")
                .arg(intervals)
                .arg("-labels")
                .arg(&self.label)
                .arg("-intervals")
                .arg("-f")
                .arg(self.min_overlap.to_string())
                .stdin(Stdio::null()),
            false,
        )?;

        let tagged = tagger.take_stdout()?;
        let mut decoder = Stage::spawn(
            &format!("{} (decoder)", self.samtools.name()),
            self.samtools
                .command()
                .args(["view", "-h", "-"])
                .stdin(Stdio::from(tagged)),
            false,
        )?;

        let mut encoder = Stage::spawn(
            &format!("{} (encoder)", self.samtools.name()),
            self.samtools
                .command()
                .args(["view", "-Shb", "-o"])
                .arg(saveto)
                .arg("-")
                .stdin(Stdio::piped()),
            true,
        )?;

        let relayed = {
            let decoded = BufReader::new(decoder.take_stdout()?);
            let mut sink = BufWriter::new(encoder.take_stdin()?);
            let relayed = self.relay.run(decoded, &mut sink).and_then(|stats| {
                sink.flush().wrap_err("Failed to flush the encoder input")?;
                Ok(stats)
            });
            // The encoder's stdin is closed here, signaling the end of the stream
            drop(sink);
            relayed
        };

        let stats = match relayed {
            Ok(stats) => stats,
            Err(err) => {
                // A dead encoder closes its stdin, its own report is the most useful one
                let encoder = encoder.wait()?;
                if !encoder.status.success() {
                    return Err(PipelineError::EncoderFailed {
                        tool: self.samtools.name().to_owned(),
                        status: encoder.status.to_string(),
                        output: encoder.output,
                    }
                    .into());
                }
                return Err(err);
            }
        };

        let tagger_status = tagger.wait()?;
        let decoder_status = decoder.wait()?;

        if stats.headers() == 0 {
            // Nothing downstream can be trusted, don't wait for the encoder to give up
            encoder.kill();
            log::error!("{} call failed.", self.tagger.name());
            return Err(PipelineError::NoHeaders {
                tool: self.tagger.name().to_owned(),
                status: tagger_status.status.to_string(),
                output: format!("{}{}", tagger_status.output, decoder_status.output),
            }
            .into());
        }
        for stage in [&tagger_status, &decoder_status] {
            if !stage.status.success() {
                log::warn!(
                    "Interval tagging exited with {} after producing {} headers. Output: {}",
                    stage.status,
                    stats.headers(),
                    stage.output.trim()
                );
            }
        }

        if stats.hits() == 0 {
            log::warn!(
                "{} did not yield hits in {} intervals. Found {} headers in the alignment file. \
                 Do the contig names in the interval file match the alignment headers?",
                self.tagger.name(),
                self.label,
                stats.headers()
            );
        }

        let encoder = encoder.wait()?;
        if !encoder.status.success() {
            if stats.hits() == 0 && encoder.output.contains("truncated") {
                log::warn!(
                    "Truncated alignment file produced by {}. This occurs if the output is \
                     empty because no read matched the intervals.",
                    self.samtools.name()
                );
            } else {
                log::error!("Conversion of tagged hits to BAM failed.");
                return Err(PipelineError::EncoderFailed {
                    tool: self.samtools.name().to_owned(),
                    status: encoder.status.to_string(),
                    output: encoder.output,
                }
                .into());
            }
        }

        Ok(stats)
    }
}
