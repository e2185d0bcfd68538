use std::fmt;

use crate::dialect::Dialect;
use crate::document::{Children, Document, Node};

/// Writes a document back out as config source.
///
/// Output is normalized: comments and original spacing are gone, each
/// statement sits on one line, and blocks listed in
/// [`Dialect::closing_keywords`] get an `end<key>` line.
pub struct Renderer<'d> {
    dialect: &'d Dialect,
}

impl<'d> Renderer<'d> {
    pub fn new(dialect: &'d Dialect) -> Self {
        Renderer { dialect }
    }

    pub fn render(&self, document: &Document) -> String {
        let mut out = String::new();
        self.write_children(&mut out, &document.root, 0);
        out
    }

    fn indent(&self, level: usize) -> String {
        " ".repeat(level * self.dialect.indent_width)
    }

    fn write_children(&self, out: &mut String, children: &Children, level: usize) {
        let indent = self.indent(level);
        for (key, nodes) in children.iter() {
            for node in nodes {
                if self.dialect.is_code_block(key) {
                    self.write_code_block(out, key, node, level);
                    continue;
                }
                // Only code blocks may span lines.
                let value = node.value.replace('\n', " ");
                write_statement(out, &indent, key, &value);

                if node.children.is_empty() {
                    continue;
                }
                self.write_children(out, &node.children, level + 1);
                if self.dialect.closes_with_end(key) {
                    out.push_str(&indent);
                    out.push_str("end");
                    out.push_str(key);
                    out.push('\n');
                }
            }
        }
    }

    /// Body lines go one level in from the introducer, the terminator at the
    /// introducer's level, so re-parsing recovers the same value.
    fn write_code_block(&self, out: &mut String, key: &str, node: &Node, level: usize) {
        let indent = self.indent(level);
        let body_indent = self.indent(level + 1);
        let terminator = self.dialect.code_block_terminator.as_str();

        let mut lines = node.value_lines();
        write_statement(out, &indent, key, lines.next().unwrap_or(""));

        let mut body: Vec<&str> = lines.collect();
        if body.last() == Some(&terminator) {
            body.pop();
        }
        for line in body {
            if !line.is_empty() {
                out.push_str(&body_indent);
                out.push_str(line);
            }
            out.push('\n');
        }
        out.push_str(&indent);
        out.push_str(terminator);
        out.push('\n');
    }
}

fn write_statement(out: &mut String, indent: &str, key: &str, value: &str) {
    out.push_str(indent);
    out.push_str(key);
    if !value.is_empty() {
        out.push(' ');
        out.push_str(value);
    }
    out.push('\n');
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dialect = Dialect::default();
        f.write_str(&Renderer::new(&dialect).render(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_only_designated_blocks_with_children() {
        let mut data = Node::new("");
        data.children.push("data", Node::new("normal from to"));
        let mut survey = Node::new("cave1");
        survey.children.push("centerline", data);
        let mut grade = Node::new("custom");
        grade.children.push("length", Node::new("0.1"));
        let mut root = Children::new();
        root.push("survey", survey);
        root.push("grade", grade);
        root.push("map", Node::new("m1"));

        assert_eq!(
            Document::new(root).to_string(),
            "survey cave1\n  centerline\n    data normal from to\n  endcenterline\nendsurvey\n\
             grade custom\n  length 0.1\nmap m1\n"
        );
    }

    #[test]
    fn code_block_body_indented_under_introducer() {
        let mut layout = Node::new("l1");
        layout
            .children
            .push("def", Node::new("foo\nline1\n\n  inner\nenddef;"));
        let mut root = Children::new();
        root.push("layout", layout);

        assert_eq!(
            Document::new(root).to_string(),
            "layout l1\n  def foo\n    line1\n\n      inner\n  enddef;\nendlayout\n"
        );
    }

    #[test]
    fn missing_terminator_is_supplied() {
        let mut root = Children::new();
        root.push("def", Node::new("bar\nx"));
        assert_eq!(Document::new(root).to_string(), "def bar\n  x\nenddef;\n");
    }

    #[test]
    fn empty_document_renders_nothing() {
        assert_eq!(Document::default().to_string(), "");
    }
}
