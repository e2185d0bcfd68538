use std::ops::Range;

use crate::dialect::Dialect;
use crate::parser::error::{ParseError, ParseErrorKind};

/// One line of the source file as written, minus its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PhysicalLine<'a> {
    pub text: &'a str,
    /// 1-based.
    pub number: usize,
    pub span: Range<usize>,
}

/// Split `source` into physical lines, tracking byte spans for diagnostics.
/// A leading byte-order mark is skipped.
pub(crate) fn split_physical(source: &str) -> Vec<PhysicalLine<'_>> {
    let mut offset = if source.starts_with('\u{feff}') { '\u{feff}'.len_utf8() } else { 0 };
    let mut lines = Vec::new();
    for (i, raw) in source[offset..].split_inclusive('\n').enumerate() {
        let text = raw.strip_suffix('\n').unwrap_or(raw);
        let text = text.strip_suffix('\r').unwrap_or(text);
        lines.push(PhysicalLine {
            text,
            number: i + 1,
            span: offset..offset + text.len(),
        });
        offset += raw.len();
    }
    lines
}

/// One statement after comment removal and continuation joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogicalLine<'a> {
    pub text: String,
    pub depth: usize,
    /// Line number of the first physical line of the statement.
    pub line: usize,
    /// That first physical line, as written.
    pub raw: &'a str,
    pub span: Range<usize>,
}

/// Lazily turns physical lines into logical lines.
///
/// The cursor is shared with the code block extractor: [`remaining`] hands
/// out the physical lines not yet consumed and [`advance`] skips past the
/// ones a code block swallowed.
///
/// [`remaining`]: LogicalLines::remaining
/// [`advance`]: LogicalLines::advance
pub(crate) struct LogicalLines<'a> {
    lines: &'a [PhysicalLine<'a>],
    pos: usize,
    dialect: &'a Dialect,
    file_id: usize,
}

impl<'a> LogicalLines<'a> {
    pub fn new(lines: &'a [PhysicalLine<'a>], dialect: &'a Dialect, file_id: usize) -> Self {
        LogicalLines {
            lines,
            pos: 0,
            dialect,
            file_id,
        }
    }

    pub fn remaining(&self) -> &'a [PhysicalLine<'a>] {
        &self.lines[self.pos.min(self.lines.len())..]
    }

    pub fn advance(&mut self, count: usize) {
        self.pos = (self.pos + count).min(self.lines.len());
    }

    fn is_skipped(&self, trimmed: &str) -> bool {
        trimmed.is_empty() || trimmed.starts_with(self.dialect.comment_marker.as_str())
    }

    /// Next physical line that is neither blank nor a comment.
    fn next_statement_line(&mut self) -> Option<&'a PhysicalLine<'a>> {
        while let Some(line) = self.lines.get(self.pos) {
            self.pos += 1;
            if !self.is_skipped(line.text.trim()) {
                return Some(line);
            }
        }
        None
    }

    fn join_continuations(&mut self, first: &'a PhysicalLine<'a>) -> (String, usize) {
        let marker = self.dialect.continuation_marker.as_str();
        let mut text = String::new();
        let mut end = first.span.end;
        let mut current = first.text.trim();
        loop {
            let Some(head) = current.strip_suffix(marker) else {
                append_piece(&mut text, current);
                break;
            };
            append_piece(&mut text, head.trim_end());
            match self.next_statement_line() {
                Some(next) => {
                    end = next.span.end;
                    current = next.text.trim();
                }
                None => {
                    // Continued into end of input: no marker may be left on
                    // the tail, or rendering would continue the line.
                    while !marker.is_empty() {
                        let Some(head) = text.strip_suffix(marker) else {
                            break;
                        };
                        let keep = head.trim_end().len();
                        text.truncate(keep);
                    }
                    break;
                }
            }
        }
        (text, end)
    }
}

impl<'a> Iterator for LogicalLines<'a> {
    type Item = Result<LogicalLine<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let first = self.next_statement_line()?;
            let (text, end) = self.join_continuations(first);
            if is_end_marker(&text) {
                log::trace!("line {}: dropping `{}`", first.number, text);
                continue;
            }

            let Some(depth) = indent_depth(first.text, self.dialect.indent_width) else {
                return Some(Err(ParseError::new(
                    ParseErrorKind::MalformedIndentation {
                        width: self.dialect.indent_width,
                    },
                    first.number,
                    first.text,
                    first.span.clone(),
                    self.file_id,
                )));
            };

            return Some(Ok(LogicalLine {
                text,
                depth,
                line: first.number,
                raw: first.text,
                span: first.span.start..end,
            }));
        }
    }
}

fn append_piece(text: &mut String, piece: &str) {
    if piece.is_empty() {
        return;
    }
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(piece);
}

/// Depth of `line` in units of `width` spaces, or `None` when the leading
/// whitespace is not an exact run of such units.
pub(crate) fn indent_depth(line: &str, width: usize) -> Option<usize> {
    let mut spaces = 0;
    for ch in line.chars() {
        match ch {
            ' ' => spaces += 1,
            c if c.is_whitespace() => return None,
            _ => break,
        }
    }
    if spaces % width == 0 {
        Some(spaces / width)
    } else {
        None
    }
}

/// `end` followed by a purely alphabetic word, e.g. `endsurvey`.
pub(crate) fn is_end_marker(text: &str) -> bool {
    text.strip_prefix("end")
        .is_some_and(|word| !word.is_empty() && word.chars().all(char::is_alphabetic))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logical(source: &str) -> Vec<(String, usize, usize)> {
        let dialect = Dialect::default();
        let physical = split_physical(source);
        LogicalLines::new(&physical, &dialect, 0)
            .map(|l| l.map(|l| (l.text, l.depth, l.line)))
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn drops_comments_and_blank_lines() {
        let lines = logical("# header\n\nencoding utf-8\n  # indented comment\nsource main.th\n");
        assert_eq!(
            lines,
            vec![
                ("encoding utf-8".to_string(), 0, 3),
                ("source main.th".to_string(), 0, 5),
            ]
        );
    }

    #[test]
    fn joins_continuations_with_first_line_depth() {
        let lines = logical("layout l\n  scale 1 \\\n      200 \\\n# note\n  500\n");
        assert_eq!(lines[1], ("scale 1 200 500".to_string(), 1, 2));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn continuation_at_end_of_input_flushes() {
        let lines = logical("export map \\\n");
        assert_eq!(lines, vec![("export map".to_string(), 0, 1)]);
    }

    #[test]
    fn trailing_markers_stripped_at_end_of_input() {
        assert_eq!(logical("k a\\\\\n"), vec![("k a".to_string(), 0, 1)]);
        assert_eq!(logical("k a \\\n\\\n"), vec![("k a".to_string(), 0, 1)]);
    }

    #[test]
    fn drops_end_lines() {
        let lines = logical("survey a\n  team x\n endsurvey\nend\nenddef;\n");
        let texts: Vec<&str> = lines.iter().map(|(t, _, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["survey a", "team x", "end", "enddef;"]);
    }

    #[test]
    fn depth_counts_pairs_of_spaces() {
        assert_eq!(indent_depth("key", 2), Some(0));
        assert_eq!(indent_depth("    key", 2), Some(2));
        assert_eq!(indent_depth("   key", 2), None);
        assert_eq!(indent_depth("\tkey", 2), None);
        assert_eq!(indent_depth("  \u{a0}key", 2), None);
    }

    #[test]
    fn malformed_indentation_reports_line() {
        let dialect = Dialect::default();
        let physical = split_physical("survey a\n   team x\n");
        let err = LogicalLines::new(&physical, &dialect, 0)
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MalformedIndentation { width: 2 });
        assert_eq!(err.line, 2);
        assert_eq!(err.text, "   team x");
    }

    #[test]
    fn physical_spans_skip_bom_and_crlf() {
        let source = "\u{feff}a b\r\ncd\n";
        let lines = split_physical(source);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "a b");
        assert_eq!(&source[lines[0].span.clone()], "a b");
        assert_eq!(&source[lines[1].span.clone()], "cd");
    }

    #[test]
    fn end_marker_requires_alphabetic_word() {
        assert!(is_end_marker("endlayout"));
        assert!(!is_end_marker("end"));
        assert!(!is_end_marker("enddef;"));
        assert!(!is_end_marker("end survey"));
    }
}
