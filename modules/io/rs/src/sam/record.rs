use ahash::AHashMap;
use eyre::{bail, ensure, OptionExt, Result};

/// Two-letter tag of an optional alignment field, e.g. `YB`.
pub type Tag = [u8; 2];

/// Index of the first optional field in a SAM line.
const OPTIONAL_FIELDS_START: usize = 11;

/// Returns true for SAM header lines (`@HD`, `@SQ`, `@PG`, ...).
pub fn is_header(line: &str) -> bool {
    line.starts_with('@')
}

/// A single alignment with the subset of fields used by the quantification pipeline.
/// Values of optional fields are kept in their textual form regardless of the SAM type code.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct AlignmentRecord {
    name: String,
    reference: String,
    tags: AHashMap<Tag, String>,
    // Original SAM line without the line terminator. Empty for records decoded from BAM.
    raw: String,
}

impl AlignmentRecord {
    pub fn new(
        name: impl Into<String>,
        reference: impl Into<String>,
        tags: impl IntoIterator<Item = (Tag, String)>,
    ) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
            tags: tags.into_iter().collect(),
            raw: String::new(),
        }
    }

    /// Parse a SAM alignment line. Malformed optional fields are dropped.
    pub fn parse(line: &str) -> Result<Self> {
        let mut record = Self::default();
        record.parse_into(line)?;
        Ok(record)
    }

    /// Parse a SAM alignment line into an existing record, reusing its allocations.
    pub fn parse_into(&mut self, line: &str) -> Result<()> {
        let line = line.trim_end_matches(['\n', '\r']);
        ensure!(!is_header(line), "Expected a SAM alignment line, got a header");

        let mut fields = line.split('\t');
        let name = fields.next().ok_or_eyre("Missing SAM QNAME")?;
        ensure!(!name.is_empty(), "Empty SAM QNAME");
        fields.next().ok_or_eyre("Missing SAM FLAG")?;
        let reference = fields.next().ok_or_eyre("Missing SAM RNAME")?;

        self.name.clear();
        self.name.push_str(name);
        self.reference.clear();
        self.reference.push_str(reference);

        self.tags.clear();
        for field in fields.skip(OPTIONAL_FIELDS_START - 3) {
            // A broken optional field doesn't invalidate the alignment itself
            match parse_optional_field(field) {
                Ok((tag, value)) => {
                    self.tags.insert(tag, value.to_owned());
                }
                Err(err) => log::debug!("Ignoring optional field of {name}: {err}"),
            }
        }

        self.raw.clear();
        self.raw.push_str(line);
        Ok(())
    }

    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        self.name.push_str(name);
    }

    pub fn set_reference(&mut self, reference: &str) {
        self.reference.clear();
        self.reference.push_str(reference);
    }

    pub fn set_tag(&mut self, tag: Tag, value: String) {
        self.tags.insert(tag, value);
    }

    /// Drop every field, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.name.clear();
        self.reference.clear();
        self.tags.clear();
        self.raw.clear();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn tag(&self, tag: &Tag) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    pub fn tags(&self) -> &AHashMap<Tag, String> {
        &self.tags
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn parse_optional_field(field: &str) -> Result<(Tag, &str)> {
    let mut parts = field.splitn(3, ':');
    let (tag, kind, value) = match (parts.next(), parts.next(), parts.next()) {
        (Some(tag), Some(kind), Some(value)) => (tag, kind, value),
        _ => bail!("Invalid SAM optional field: {field}"),
    };

    let tag: Tag = match tag.as_bytes() {
        [a, b] if a.is_ascii_alphabetic() && b.is_ascii_alphanumeric() => [*a, *b],
        _ => bail!("Invalid SAM tag in optional field: {field}"),
    };
    ensure!(
        matches!(kind, "A" | "i" | "f" | "Z" | "H" | "B"),
        "Invalid SAM type code in optional field: {field}"
    );
    Ok((tag, value))
}
