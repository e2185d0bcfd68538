use std::path::Path;

use serde::Deserialize;

/// Reserved words and markers of the config dialect.
///
/// The defaults describe the survey/layout dialect. Every field can be
/// overridden from a TOML file; fields left out keep their default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Dialect {
    /// Lines whose trimmed text starts with this are comments.
    pub comment_marker: String,
    /// A trimmed line ending with this is continued on the next line.
    pub continuation_marker: String,
    /// Spaces per indentation level.
    pub indent_width: usize,
    /// Key that opens an embedded code block.
    pub code_block_keyword: String,
    /// Line that closes an embedded code block.
    pub code_block_terminator: String,
    /// Block keys that get a synthetic `end<key>` line when rendered.
    pub closing_keywords: Vec<String>,
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect {
            comment_marker: "#".to_string(),
            continuation_marker: "\\".to_string(),
            indent_width: 2,
            code_block_keyword: "def".to_string(),
            code_block_terminator: "enddef;".to_string(),
            closing_keywords: ["survey", "centerline", "layout", "map"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DialectError {
    #[error("cannot read dialect file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid dialect TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid dialect: {0}")]
    Invalid(String),
}

impl Dialect {
    pub fn from_toml_str(s: &str) -> Result<Self, DialectError> {
        let dialect: Dialect = toml::from_str(s)?;
        dialect.validate()?;
        Ok(dialect)
    }

    pub fn from_file(path: &Path) -> Result<Self, DialectError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), DialectError> {
        if self.indent_width == 0 {
            return Err(DialectError::Invalid("indent_width must be at least 1".into()));
        }
        let required = [
            ("comment_marker", &self.comment_marker),
            ("continuation_marker", &self.continuation_marker),
            ("code_block_keyword", &self.code_block_keyword),
            ("code_block_terminator", &self.code_block_terminator),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(DialectError::Invalid(format!("{} must not be empty", name)));
            }
        }
        if self.code_block_keyword.contains(char::is_whitespace) {
            return Err(DialectError::Invalid(
                "code_block_keyword must be a single word".into(),
            ));
        }
        if self.code_block_terminator.trim() != self.code_block_terminator {
            return Err(DialectError::Invalid(
                "code_block_terminator must not start or end with whitespace".into(),
            ));
        }
        // Rendered `end<key>` lines are only dropped on re-parse when the
        // word after `end` is purely alphabetic.
        for keyword in &self.closing_keywords {
            if keyword.is_empty() || !keyword.chars().all(char::is_alphabetic) {
                return Err(DialectError::Invalid(format!(
                    "closing keyword `{}` must be a non-empty alphabetic word",
                    keyword
                )));
            }
        }
        Ok(())
    }

    pub fn is_code_block(&self, key: &str) -> bool {
        key == self.code_block_keyword
    }

    pub fn closes_with_end(&self, key: &str) -> bool {
        self.closing_keywords.iter().any(|k| k == key)
    }
}
