pub use relay::{Relay, RelayStats};
pub use tagger::{IntervalTagger, TagOutcome, TaggerBuilder};

mod process;
mod relay;
#[allow(clippy::module_inception)]
mod tagger;
