use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use flate2::read::MultiGzDecoder;

/// Compression of a file on disk, as detected from its magic bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Compression {
    None,
    /// Plain gzip or BGZF (a series of gzip members).
    Gzip,
}

impl Compression {
    pub fn detect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure!(path.exists(), "File {} does not exist", path.display());

        let kind = infer::get_from_path(path)
            .wrap_err_with(|| format!("Failed to inspect {}", path.display()))?;
        let compression = match kind.map(|x| (x.extension(), x.mime_type())) {
            Some(("gz", "application/gzip")) => Compression::Gzip,
            // Anything else is treated as plain text
            _ => Compression::None,
        };
        Ok(compression)
    }
}

/// Open a text file for buffered reading, transparently decompressing gzip/BGZF input.
pub fn open(path: impl AsRef<Path>) -> Result<Box<dyn BufRead + Send + Sync + 'static>> {
    let path = path.as_ref();
    let compression = Compression::detect(path)?;
    let file = File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;

    let stream: Box<dyn BufRead + Send + Sync + 'static> = match compression {
        Compression::None => Box::new(BufReader::new(file)),
        Compression::Gzip => {
            log::debug!("Decompressing {} on the fly", path.display());
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        }
    };
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::{Read, Write};

    const CONTENT: &str = "gene_id\texons\nENSG01\tchr1:1-10:+\n";

    #[test]
    fn test_open_plain_and_gzip() -> Result<()> {
        let dir = tempfile::tempdir()?;

        let plain = dir.path().join("table.txt");
        std::fs::write(&plain, CONTENT)?;

        let gzipped = dir.path().join("table.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&gzipped)?, flate2::Compression::default());
        encoder.write_all(CONTENT.as_bytes())?;
        encoder.finish()?;

        assert_eq!(Compression::detect(&plain)?, Compression::None);
        assert_eq!(Compression::detect(&gzipped)?, Compression::Gzip);

        for path in [plain, gzipped] {
            let mut decoded = String::new();
            open(&path)?.read_to_string(&mut decoded)?;
            assert_eq!(decoded, CONTENT);
        }
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        assert!(open("/definitely/not/here.tsv").is_err());
    }
}
