use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

/// What went wrong while parsing. Any of these aborts the whole parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("malformed indentation: expected a multiple of {width} spaces")]
    MalformedIndentation { width: usize },

    #[error("line is nested at depth {depth} but only {open} block(s) are open")]
    Structural { depth: usize, open: usize },

    #[error("unterminated `{keyword}` block: reached end of input before `{terminator}`")]
    UnterminatedBlock { keyword: String, terminator: String },

    #[error("statement has no key")]
    EmptyKey,
}

/// A parse failure pinned to the offending source line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {kind}: `{text}`")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based line number of the first physical line involved.
    pub line: usize,
    /// The offending line, as written.
    pub text: String,
    pub span: Range<usize>,
    pub file_id: usize,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        line: usize,
        text: impl Into<String>,
        span: Range<usize>,
        file_id: usize,
    ) -> Self {
        ParseError {
            kind,
            line,
            text: text.into(),
            span,
            file_id,
        }
    }

    fn note(&self) -> Option<String> {
        match &self.kind {
            ParseErrorKind::MalformedIndentation { width } => Some(format!(
                "indent with spaces only, {} per nesting level",
                width
            )),
            ParseErrorKind::Structural { open, .. } => Some(format!(
                "a nested line may be at most depth {}; an indentation level was skipped",
                open
            )),
            ParseErrorKind::UnterminatedBlock { terminator, .. } => Some(format!(
                "add a `{}` line at the block's indentation",
                terminator
            )),
            ParseErrorKind::EmptyKey => None,
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let label = match &self.kind {
            ParseErrorKind::UnterminatedBlock { .. } => "block opened here",
            ParseErrorKind::Structural { .. } => "indented too deep",
            _ => "",
        };
        Diagnostic::error()
            .with_message(self.kind.to_string())
            .with_labels(vec![
                Label::primary(self.file_id, self.span.clone()).with_message(label),
            ])
            .with_notes(self.note().into_iter().collect())
    }
}
