use crate::dialect::Dialect;
use crate::document::{Document, NodeArena};
use crate::parser::code_block;
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::lines::{LogicalLines, PhysicalLine};

/// Build a document from physical lines.
///
/// `open` holds the arena handle of the node open at each depth. A line at
/// depth `d` truncates it to `d`, which is how a dedent closes blocks; the
/// closing `end<word>` lines themselves never reach this loop.
pub(crate) fn build(
    lines: &[PhysicalLine<'_>],
    dialect: &Dialect,
    file_id: usize,
) -> Result<Document, ParseError> {
    let mut arena = NodeArena::default();
    let mut open: Vec<usize> = Vec::new();
    let mut logical = LogicalLines::new(lines, dialect, file_id);

    while let Some(line) = logical.next() {
        let line = line?;
        let fail = |kind: ParseErrorKind| ParseError::new(kind, line.line, line.raw, line.span.clone(), file_id);

        let (key, value) = split_statement(&line.text).ok_or_else(|| fail(ParseErrorKind::EmptyKey))?;

        if line.depth > open.len() {
            return Err(fail(ParseErrorKind::Structural {
                depth: line.depth,
                open: open.len(),
            }));
        }
        if open.len() > line.depth {
            log::debug!(
                "line {}: closing {} block(s) on dedent",
                line.line,
                open.len() - line.depth
            );
            open.truncate(line.depth);
        }
        let parent = open.last().copied();

        if dialect.is_code_block(key) {
            let block = code_block::extract(value, logical.remaining(), line.depth, dialect)
                .ok_or_else(|| {
                    fail(ParseErrorKind::UnterminatedBlock {
                        keyword: key.to_string(),
                        terminator: dialect.code_block_terminator.clone(),
                    })
                })?;
            log::debug!(
                "line {}: captured `{}` block of {} line(s)",
                line.line,
                key,
                block.consumed
            );
            logical.advance(block.consumed);
            arena.insert(parent, key, block.text);
            continue;
        }

        log::trace!("line {}: `{}` at depth {}", line.line, key, line.depth);
        let id = arena.insert(parent, key, value.to_string());
        open.push(id);
    }

    Ok(arena.into_document())
}

/// Split a logical line into its key and the (possibly empty) rest.
fn split_statement(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(match text.split_once(char::is_whitespace) {
        Some((key, value)) => (key, value.trim_start()),
        None => (text, ""),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_at_first_whitespace() {
        assert_eq!(split_statement("data normal from to"), Some(("data", "normal from to")));
        assert_eq!(split_statement("centerline"), Some(("centerline", "")));
        assert_eq!(split_statement("title\t\"A  B\""), Some(("title", "\"A  B\"")));
        assert_eq!(split_statement("   "), None);
    }
}
