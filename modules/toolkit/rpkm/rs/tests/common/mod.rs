#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use eyre::Result;

pub const HEADERS: &[&str] = &[
    "@HD\tVN:1.6\tSO:coordinate",
    "@SQ\tSN:chr1\tLN:10000",
    "@SQ\tSN:chr2\tLN:10000",
];

/// (read name, interval annotation). Reads without an annotation don't overlap any exon.
pub const READS: &[(&str, Option<&str>)] = &[
    ("r1", Some("gff:chr1:99-200")),
    ("r2", None),
    ("r3", Some("gff:chr1:99-200")),
    ("r4", Some("gff:chr2:0-50")),
    ("r5", None),
    ("r6", Some("gff:chr2:149-300")),
    ("r7", Some("gff:chr1:299-400")),
];

pub fn alignment(name: &str, annotation: Option<&str>) -> String {
    let mut line = format!("{name}\t0\tchr1\t100\t60\t50M\t*\t0\t0\t*\t*\tNM:i:0");
    if let Some(annotation) = annotation {
        line.push_str("\tYB:Z:");
        line.push_str(annotation);
    }
    line
}

/// SAM stream with 3 headers, 5 annotated reads and 2 reads without annotations.
pub fn tagged_sam(with_headers: bool) -> String {
    let mut lines: Vec<String> = Vec::new();
    if with_headers {
        lines.extend(HEADERS.iter().map(|x| x.to_string()));
    }
    lines.extend(READS.iter().map(|(name, tag)| alignment(name, *tag)));
    lines.push(String::new());
    lines.join("\n")
}

pub fn write_gff(dir: &Path) -> Result<PathBuf> {
    let exons = [
        ("chr1", 100, 200, '+'),
        ("chr1", 300, 400, '+'),
        ("chr2", 1, 50, '-'),
        ("chr2", 150, 300, '-'),
        ("chr3", 1, 1000, '+'),
    ];

    let mut gff = String::from("##gff-version 3\n");
    for (contig, start, end, strand) in exons {
        gff.push_str(&format!(
            "{contig}\tconst\texon\t{start}\t{end}\t.\t{strand}\t.\tID={contig}:{start}-{end}:{strand}\n"
        ));
    }

    let path = dir.join("const_exons.gff");
    fs::write(&path, gff)?;
    Ok(path)
}

pub fn write_genes(dir: &Path) -> Result<PathBuf> {
    let genes = "gene_id\texons\n\
                 G1\tchr1:100-200:+,chr1:300-400:+\n\
                 G2\tchr2:1-50:-,chr2:150-300:-\n\
                 G3\tNA\n\
                 G4\tchr3:1-1000:+\n";
    let path = dir.join("genes.tsv");
    fs::write(&path, genes)?;
    Ok(path)
}

#[cfg(unix)]
pub mod tools {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, MutexGuard};

    use eyre::Result;
    use tempfile::TempDir;

    // Executing a script while a concurrently forked child still holds its write handle fails
    // with ETXTBSY, tests that launch fake tools run one at a time.
    static SERIAL: Mutex<()> = Mutex::new(());

    pub fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub enum Encoder {
        /// Stores the incoming SAM text as is.
        Store,
        /// Consumes the stream and fails the way samtools does on an empty input.
        Truncated,
    }

    /// Stand-ins for `tagBam` and `samtools` that log their invocations.
    pub struct FakeTools {
        dir: TempDir,
        log: PathBuf,
        tagger: PathBuf,
        samtools: PathBuf,
    }

    fn write_script(path: &Path, body: &str) -> Result<()> {
        fs::write(path, format!("#!/bin/sh\n{body}"))?;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    impl FakeTools {
        /// `tagged` is what the fake tagger emits, `tagger_exit` its exit code.
        pub fn new(tagged: &str, tagger_exit: i32, encoder: Encoder) -> Result<Self> {
            let dir = TempDir::new()?;
            let log = dir.path().join("invocations.log");

            let stream = dir.path().join("tagged.sam");
            fs::write(&stream, tagged)?;

            let tagger = dir.path().join("tagBam");
            write_script(
                &tagger,
                &format!(
                    "echo \"tagBam $*\" >> '{log}'\n\
                     cat '{stream}'\n\
                     if [ {tagger_exit} -ne 0 ]; then echo 'tagBam: unable to open the alignments' >&2; fi\n\
                     exit {tagger_exit}\n",
                    log = log.display(),
                    stream = stream.display(),
                ),
            )?;

            let encode = match encoder {
                Encoder::Store => "cat > \"$4\"\n",
                Encoder::Truncated => {
                    "cat > /dev/null\necho '[main_samview] truncated file.' >&2\nexit 1\n"
                }
            };
            let samtools = dir.path().join("samtools");
            write_script(
                &samtools,
                &format!(
                    "echo \"samtools $*\" >> '{log}'\n\
                     if [ \"$2\" = \"-h\" ]; then exec cat; fi\n\
                     {encode}",
                    log = log.display(),
                ),
            )?;

            Ok(Self {
                dir,
                log,
                tagger,
                samtools,
            })
        }

        pub fn tagger(&self) -> &Path {
            &self.tagger
        }

        pub fn samtools(&self) -> &Path {
            &self.samtools
        }

        pub fn workdir(&self) -> &Path {
            self.dir.path()
        }

        /// Logged command lines, one per invocation.
        pub fn invocations(&self) -> Result<Vec<String>> {
            if !self.log.exists() {
                return Ok(Vec::new());
            }
            Ok(fs::read_to_string(&self.log)?
                .lines()
                .map(str::to_owned)
                .collect())
        }

        pub fn count(&self, tool: &str) -> Result<usize> {
            Ok(self
                .invocations()?
                .iter()
                .filter(|x| x.split(' ').next() == Some(tool))
                .count())
        }
    }
}
