use crate::dialect::Dialect;
use crate::parser::lines::PhysicalLine;

/// Text captured for one embedded code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CapturedBlock {
    /// Introducer value, body lines and terminator joined with `\n`.
    pub text: String,
    /// Physical lines consumed, terminator included.
    pub consumed: usize,
}

/// Capture a code block opened at `depth` whose body starts at `lines[0]`.
///
/// Body lines are opaque: comments, blank lines and continuation markers are
/// kept as written. Up to one level beyond the introducer's indentation is
/// stripped from each body line. The terminator line must match exactly once
/// the introducer's indentation is removed. Returns `None` when input ends
/// before the terminator.
pub(crate) fn extract(
    intro_value: &str,
    lines: &[PhysicalLine<'_>],
    depth: usize,
    dialect: &Dialect,
) -> Option<CapturedBlock> {
    let block_indent = depth * dialect.indent_width;
    let body_indent = block_indent + dialect.indent_width;

    let mut text = intro_value.to_string();
    for (i, line) in lines.iter().enumerate() {
        let candidate = strip_spaces(line.text, block_indent);
        text.push('\n');
        if candidate == dialect.code_block_terminator {
            text.push_str(candidate);
            return Some(CapturedBlock {
                text,
                consumed: i + 1,
            });
        }
        text.push_str(strip_spaces(line.text, body_indent));
    }
    None
}

/// Remove at most `max` leading spaces.
fn strip_spaces(line: &str, max: usize) -> &str {
    let count = line.bytes().take(max).take_while(|b| *b == b' ').count();
    &line[count..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lines::split_physical;

    fn capture(body: &str, depth: usize) -> Option<CapturedBlock> {
        let physical = split_physical(body);
        extract("foo", &physical, depth, &Dialect::default())
    }

    #[test]
    fn captures_through_terminator() {
        let block = capture("  line1\n  line2\nenddef;\nafter\n", 0).unwrap();
        assert_eq!(block.text, "foo\nline1\nline2\nenddef;");
        assert_eq!(block.consumed, 3);
    }

    #[test]
    fn body_is_opaque() {
        let block = capture("  # not a comment\n\n  a \\\n    b\nenddef;\n", 0).unwrap();
        assert_eq!(block.text, "foo\n# not a comment\n\na \\\n  b\nenddef;");
    }

    #[test]
    fn terminator_must_sit_at_block_depth() {
        let block = capture("    x\n      enddef;\n  enddef;\n", 1).unwrap();
        assert_eq!(block.text, "foo\nx\n  enddef;\nenddef;");
        assert_eq!(block.consumed, 3);
    }

    #[test]
    fn terminator_with_trailing_whitespace_is_body() {
        let block = capture("  x\nenddef; \nenddef;\t\nenddef;\n", 0).unwrap();
        assert_eq!(block.text, "foo\nx\nenddef; \nenddef;\t\nenddef;");
        assert_eq!(block.consumed, 4);
        assert!(capture("  x\nenddef;  \n", 0).is_none());
    }

    #[test]
    fn deeper_terminator_is_body() {
        assert!(capture("  enddef;\n", 0).is_none());
    }

    #[test]
    fn unterminated_block() {
        assert!(capture("  line1\n", 0).is_none());
        assert!(capture("", 0).is_none());
    }
}
