use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;

use rnakit_core_rs::loc::GenomicInterval;

/// A single GFF3 feature. The interval label is the GFF source column.
#[derive(Clone, PartialEq, Eq, Debug, Constructor, Dissolve, Getters)]
pub struct GffRecord {
    interval: GenomicInterval,
    kind: String,
    strand: char,
    attributes: Vec<(String, String)>,
}

impl GffRecord {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of the `ID` attribute.
    pub fn id(&self) -> Option<&str> {
        self.attribute("ID")
    }
}
