//! Loading tables and the in-memory table model.

mod parser;
mod source;

pub(crate) use parser::read_all_sheets;
pub use parser::{FileKind, Parser, ParserConfig};
pub use source::{Dataset, KEY_COLUMN, Row, SourceMetadata};
