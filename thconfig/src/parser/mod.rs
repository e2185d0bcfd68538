pub mod error;
mod code_block;
mod lines;
mod tree;

pub use error::{ParseError, ParseErrorKind};

use crate::dialect::Dialect;
use crate::document::Document;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
    dialect: Dialect,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser {
            source,
            file_id,
            dialect: Dialect::default(),
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Parse the source into a complete Document. The first error aborts.
    pub fn parse(&self) -> Result<Document, ParseError> {
        let physical = lines::split_physical(&self.source);
        log::debug!("parsing {} physical line(s)", physical.len());
        tree::build(&physical, &self.dialect, self.file_id)
    }
}
