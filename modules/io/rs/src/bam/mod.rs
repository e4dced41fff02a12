pub use reader::Reader;

mod reader;
