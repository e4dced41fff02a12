use std::fs::File;
use std::io;
use std::path::Path;

use eyre::{Result, WrapErr};
use noodles::sam::alignment::record::data::field::Value;
use noodles::{bam, bgzf, sam};

use crate::sam::AlignmentRecord;
use crate::ReadRecord;

/// Unmapped reads and unknown references are reported with the SAM placeholder.
const MISSING: &str = "*";

/// Sequential (non-indexed) BAM reader yielding [`AlignmentRecord`]s.
pub struct Reader<R> {
    inner: bam::io::Reader<R>,
    header: sam::Header,
    buffer: bam::Record,
}

impl Reader<bgzf::Reader<File>> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;
        let mut inner = bam::io::Reader::new(file);
        let header = inner
            .read_header()
            .wrap_err_with(|| format!("Failed to read BAM header from {}", path.display()))?;

        Ok(Self {
            inner,
            header,
            buffer: bam::Record::default(),
        })
    }
}

impl<R> Reader<R> {
    pub fn header(&self) -> &sam::Header {
        &self.header
    }
}

fn convert(
    header: &sam::Header,
    record: &bam::Record,
    into: &mut AlignmentRecord,
) -> io::Result<()> {
    into.clear();

    if let Some(name) = record.name() {
        into.set_name(&name.to_string());
    }

    match record.reference_sequence_id().transpose()? {
        Some(id) => match header.reference_sequences().get_index(id) {
            Some((name, _)) => into.set_reference(&name.to_string()),
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Reference sequence {id} is missing from the BAM header"),
                ))
            }
        },
        None => into.set_reference(MISSING),
    }

    for field in record.data().iter() {
        let (tag, value) = field?;
        let value = match value {
            Value::String(x) | Value::Hex(x) => x.to_string(),
            Value::Character(x) => char::from(x).to_string(),
            Value::Float(x) => x.to_string(),
            // Integers of any width; arrays are never used for interval annotations
            other => match other.as_int() {
                Some(x) => x.to_string(),
                None => continue,
            },
        };
        into.set_tag(<[u8; 2]>::from(tag), value);
    }
    Ok(())
}

impl<R: io::Read> ReadRecord for Reader<bgzf::Reader<R>> {
    type Record = AlignmentRecord;

    fn read_record(&mut self, into: &mut Self::Record) -> Result<bool> {
        if self.inner.read_record(&mut self.buffer)? == 0 {
            return Ok(false);
        }
        convert(&self.header, &self.buffer, into).wrap_err("Malformed BAM record")?;
        Ok(true)
    }
}
