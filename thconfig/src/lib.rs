pub mod dialect;
pub mod document;
pub mod parser;
pub mod render;

pub use dialect::{Dialect, DialectError};
pub use document::{Children, Document, Node};
pub use parser::{ParseError, ParseErrorKind, Parser};
pub use render::Renderer;

/// Parse `source` with the default dialect.
pub fn parse(source: &str) -> Result<Document, ParseError> {
    Parser::new(source.to_string(), 0).parse()
}

/// Render `document` with the default dialect.
pub fn render(document: &Document) -> String {
    document.to_string()
}
